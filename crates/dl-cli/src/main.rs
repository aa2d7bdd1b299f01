use clap::Parser;
use dl_core::logging;

mod cli;

use crate::cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging as early as possible.
    let verbose = cli.verbose();
    if let Err(err) = logging::init_logging(verbose) {
        logging::init_logging_stderr(verbose);
        tracing::warn!("file logging unavailable, using stderr: {:#}", err);
    }

    let code = match cli.run().await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("dl error: {:#}", err);
            cli::EXIT_FAILURE
        }
    };
    // Exit without joining in-flight blocking workers.
    std::process::exit(code);
}
