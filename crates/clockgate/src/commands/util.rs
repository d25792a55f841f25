//! Shared helpers for command handlers.

use std::path::Path;

use crate::cli::PayloadArgs;
use crate::error::CliError;

/// Read and parse a JSON file.
pub fn read_json_file(path: &Path) -> Result<serde_json::Value, CliError> {
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents).map_err(|e| CliError::Validation {
        field: "from-file".into(),
        reason: format!("invalid JSON: {e}"),
    })
}

/// The mutation body from `--data` or `--from-file`.
pub fn read_payload(args: &PayloadArgs) -> Result<serde_json::Value, CliError> {
    match (&args.data, &args.from_file) {
        (Some(data), _) => serde_json::from_str(data).map_err(|e| CliError::Validation {
            field: "data".into(),
            reason: format!("invalid JSON: {e}"),
        }),
        (None, Some(path)) => read_json_file(path),
        (None, None) => Err(CliError::Validation {
            field: "data".into(),
            reason: "pass --data or --from-file".into(),
        }),
    }
}
