use std::process::ExitCode;

use clap::Parser;

use iopaint::cli::CliArgs;
use iopaint::logger;

fn main() -> ExitCode {
    // Initialize session log (overwrites previous session log)
    logger::init();

    let args = CliArgs::parse();
    iopaint::cli::run(args)
}
