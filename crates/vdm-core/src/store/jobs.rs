//! Job row queries.

mod read;
mod write;

pub use write::INTERRUPTED_MESSAGE;
