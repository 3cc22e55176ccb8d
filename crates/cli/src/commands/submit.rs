use std::path::Path;

use spendgate_client::HttpPolicyBackend;
use spendgate_core::errors::ApplicationError;
use spendgate_core::session::EditSession;
use tracing::info;

use crate::commands::validate::render_issues;
use crate::commands::{
    backend_failure, build_runtime, load_config, load_inputs, CommandResult, EXIT_VALIDATION,
};

pub fn run(draft: &Path, directory: Option<&Path>) -> CommandResult {
    let config = match load_config("submit") {
        Ok(config) => config,
        Err(result) => return result,
    };
    let (rule, directory) = match load_inputs("submit", draft, directory) {
        Ok(inputs) => inputs,
        Err(result) => return result,
    };

    let mut session = EditSession::from_rule(rule, directory);
    let report = session.validate();
    if !report.is_valid() {
        return CommandResult::failure(
            "submit",
            "validation",
            render_issues(&report),
            EXIT_VALIDATION,
        );
    }

    let backend = match HttpPolicyBackend::new(&config.backend) {
        Ok(backend) => backend,
        Err(error) => return backend_failure("submit", ApplicationError::Backend(error)),
    };
    let runtime = match build_runtime("submit") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    match runtime.block_on(session.submit(&backend)) {
        Ok(created) => {
            let policy_id = created.id.unwrap_or_else(|| "<unassigned>".to_string());
            info!(event_name = "cli.submit.created", policy_id = %policy_id, "policy submitted");
            let mut message = format!(
                "policy `{}` created at {} (id: {policy_id})",
                session.rule().name.trim(),
                backend.base_url()
            );
            if let Some(server_message) = created.message.filter(|text| !text.trim().is_empty()) {
                message.push_str(&format!("\n{server_message}"));
            }
            CommandResult::success("submit", message)
        }
        Err(error) => backend_failure("submit", error),
    }
}
