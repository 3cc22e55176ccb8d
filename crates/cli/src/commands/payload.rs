use std::path::Path;

use spendgate_core::rules::payload::PolicyPayload;

use crate::commands::{load_inputs, CommandResult, EXIT_VALIDATION};

pub fn run(draft: &Path) -> CommandResult {
    let (rule, _) = match load_inputs("payload", draft, None) {
        Ok(inputs) => inputs,
        Err(result) => return result,
    };

    let payload = match PolicyPayload::from_rule(&rule) {
        Ok(payload) => payload,
        Err(error) => {
            return CommandResult::failure(
                "payload",
                "incomplete",
                error.to_string(),
                EXIT_VALIDATION,
            );
        }
    };

    match serde_json::to_string_pretty(&payload) {
        Ok(json) => CommandResult::success("payload", json),
        Err(error) => CommandResult::failure(
            "payload",
            "serialization",
            format!("failed to serialize payload: {error}"),
            EXIT_VALIDATION,
        ),
    }
}
