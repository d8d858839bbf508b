use vdm_core::logging;

mod api;
mod cli;

use crate::cli::Cli;

#[tokio::main]
async fn main() {
    // Initialize logging as early as possible; a read-only state dir still gets stderr.
    if let Err(err) = logging::init_logging() {
        logging::init_logging_stderr();
        tracing::warn!("file logging unavailable, using stderr: {:#}", err);
    }

    if let Err(err) = Cli::run_from_args().await {
        eprintln!("vdm error: {:#}", err);
        std::process::exit(1);
    }
}
