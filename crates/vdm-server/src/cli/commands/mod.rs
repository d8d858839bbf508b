//! CLI command handlers, one per file.

mod clear_history;
mod history;
mod info;
mod serve;
mod status;

pub use clear_history::run_clear_history;
pub use history::run_history;
pub use info::run_info;
pub use serve::run_serve;
pub use status::run_status;
