//! Binary entrypoint for the `tfdrift` CLI.

use std::process::ExitCode;

fn main() -> ExitCode {
    match tfdrift::run(std::env::args()) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
