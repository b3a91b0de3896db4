use clap::Parser;
use std::process::ExitCode;
use yearsort::cli::{Cli, run_cli};
use yearsort::output::OutputFormatter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run_cli(&cli) {
        Ok(stats) if stats.has_errors() => ExitCode::FAILURE,
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            OutputFormatter::error(&format!("Error: {}", e));
            ExitCode::FAILURE
        }
    }
}
