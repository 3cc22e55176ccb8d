use std::path::Path;

use spendgate_client::HttpPolicyBackend;
use spendgate_core::config::AppConfig;
use spendgate_core::errors::ApplicationError;
use spendgate_core::rules::payload::PolicyRecord;
use spendgate_core::session::{EditSession, PolicyBackend};

use crate::commands::{
    backend_failure, build_runtime, input_failure, load_config, read_directory, CommandResult,
};

pub fn list() -> CommandResult {
    let (config, backend) = match connect("list") {
        Ok(connected) => connected,
        Err(result) => return result,
    };
    let runtime = match build_runtime("list") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    match runtime.block_on(backend.list_policies()) {
        Ok(records) => CommandResult::success("list", render_list(&records, &config)),
        Err(error) => backend_failure("list", ApplicationError::Backend(error)),
    }
}

pub fn show(policy_id: &str, directory: Option<&Path>) -> CommandResult {
    let directory = match read_directory(directory) {
        Ok(directory) => directory,
        Err(error) => return input_failure("show", error),
    };
    let (config, backend) = match connect("show") {
        Ok(connected) => connected,
        Err(result) => return result,
    };
    let runtime = match build_runtime("show") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    match runtime.block_on(backend.policy_details(policy_id)) {
        Ok(record) => {
            let session = EditSession::load_existing(&record, directory);
            let summary = session.summary(&config.display.summary_options()).to_string();
            CommandResult::success("show", format!("id: {}\n{}", record.id, summary.trim_end()))
        }
        Err(error) => backend_failure("show", ApplicationError::Backend(error)),
    }
}

fn connect(command: &str) -> Result<(AppConfig, HttpPolicyBackend), CommandResult> {
    let config = load_config(command)?;
    let backend = HttpPolicyBackend::new(&config.backend)
        .map_err(|error| backend_failure(command, ApplicationError::Backend(error)))?;
    Ok((config, backend))
}

fn render_list(records: &[PolicyRecord], config: &AppConfig) -> String {
    if records.is_empty() {
        return format!("no policies found at {}", config.backend.base_url);
    }

    let mut lines = vec![format!("{} policies:", records.len())];
    lines.extend(records.iter().map(|record| {
        let updated = record
            .updated_at
            .or(record.created_at)
            .map(|at| at.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string());
        format!(
            "- {} | {} | {} rule(s) | updated {updated}",
            record.id,
            record.name.trim(),
            record.rules.len()
        )
    }));
    lines.join("\n")
}
