pub mod scenarios;
pub mod valuation;

use serde::de::DeserializeOwned;
use tracing::warn;

use crate::input;

/// Resolve a command's input document: `--input` file first, then piped stdin.
pub(crate) fn load_input<T: DeserializeOwned>(
    path: Option<&str>,
) -> Result<Option<T>, Box<dyn std::error::Error>> {
    match path {
        Some(p) => Ok(Some(input::file::read_input(p)?)),
        None => input::stdin::read_stdin(),
    }
}

/// Surface calculator warnings on stderr as well as in the output envelope.
pub(crate) fn log_warnings(warnings: &[String]) {
    for w in warnings {
        warn!("{w}");
    }
}
