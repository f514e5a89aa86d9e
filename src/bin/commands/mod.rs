pub mod config;
pub mod tables;

use anyhow::Result;
use paper::OutputFormat;
use serde::Serialize;

/// Print serializable records as JSON, returning `false` for non-JSON formats
pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T, format: OutputFormat) -> Result<bool> {
    match format.to_json(value)? {
        Some(text) => {
            println!("{}", text);
            Ok(true)
        }
        None => Ok(false),
    }
}
