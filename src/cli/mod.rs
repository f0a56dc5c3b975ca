//! CLI layer.

pub mod commands;
pub mod display;
pub mod types;

pub use types::{Cli, Commands};

use crate::application::validation::ValidationError;
use crate::domain::errors::DomainError;

/// Print an error and return the process exit code.
///
/// Validation failures (including resume policy drift) carry a structured
/// payload in JSON mode; everything exits with code 2.
pub fn handle_error(err: &anyhow::Error, json: bool) -> i32 {
    if json {
        let payload = if let Some(validation) = err.downcast_ref::<ValidationError>() {
            serde_json::to_value(validation)
                .unwrap_or_else(|_| serde_json::json!({ "error": validation.to_string() }))
        } else if let Some(DomainError::PolicyDrift {
            session,
            field,
            persisted,
            requested,
        }) = err.downcast_ref::<DomainError>()
        {
            serde_json::json!({
                "error": "policy_drift",
                "session": session,
                "field": field,
                "persisted": persisted,
                "requested": requested,
            })
        } else {
            serde_json::json!({ "error": format!("{err:#}") })
        };
        eprintln!("{payload}");
    } else {
        eprintln!("Error: {err:#}");
    }
    2
}
