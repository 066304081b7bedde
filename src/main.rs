//! # vr-optimizer CLI
//!
//! Command-line interface for the VR content optimizer.
//!
//! ## Usage
//! ```bash
//! vr-optimizer run
//! vr-optimizer optimize --source /srv/vr --cache /var/cache/vr --output json
//! vr-optimizer status
//! ```

mod cli;

use std::process::ExitCode;

fn main() -> ExitCode {
    match cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", console::style("error:").red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
