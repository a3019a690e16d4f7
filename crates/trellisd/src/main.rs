//! `trellisd`: serves the demonstration namespace until terminated.

use std::process::ExitCode;

use trellisd::{SystemConfigLoader, bootstrap_with, demo};

fn main() -> ExitCode {
    match bootstrap_with(&SystemConfigLoader, demo::namespace).and_then(trellisd::Daemon::join) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            report(&error);
            ExitCode::FAILURE
        }
    }
}

#[expect(
    clippy::print_stderr,
    reason = "telemetry may not be installed when bootstrap fails"
)]
fn report(error: &trellisd::BootstrapError) {
    eprintln!("trellisd: {error}");
}
