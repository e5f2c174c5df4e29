pub mod opdom;
pub mod simulate;
pub mod temperature;

use crate::utils::progress::CliProgressHandler;

fn progress_handler(quiet: bool) -> CliProgressHandler {
    if quiet {
        CliProgressHandler::hidden()
    } else {
        CliProgressHandler::new()
    }
}
