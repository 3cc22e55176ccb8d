pub mod config;
pub mod payload;
pub mod policies;
pub mod preview;
pub mod submit;
pub mod validate;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use spendgate_core::config::{AppConfig, LoadOptions};
use spendgate_core::domain::directory::Directory;
use spendgate_core::domain::rule::ApprovalRule;
use spendgate_core::errors::{ApplicationError, InterfaceError};
use spendgate_core::rules::draft::DraftDocument;
use tokio::runtime::Runtime;
use tracing::warn;
use uuid::Uuid;

pub(crate) const EXIT_CONFIG: u8 = 2;
pub(crate) const EXIT_RUNTIME: u8 = 3;
pub(crate) const EXIT_INPUT: u8 = 4;
pub(crate) const EXIT_VALIDATION: u8 = 5;
pub(crate) const EXIT_BACKEND: u8 = 6;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

pub(crate) fn load_config(command: &str) -> Result<AppConfig, CommandResult> {
    AppConfig::load(LoadOptions::default()).map_err(|error| {
        CommandResult::failure(
            command,
            "config_validation",
            format!("configuration issue: {error}"),
            EXIT_CONFIG,
        )
    })
}

pub(crate) fn build_runtime(command: &str) -> Result<Runtime, CommandResult> {
    tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
        CommandResult::failure(
            command,
            "runtime_init",
            format!("failed to initialize async runtime: {error}"),
            EXIT_RUNTIME,
        )
    })
}

/// Reads the optional directory document; no path means an empty directory.
pub fn read_directory(path: Option<&Path>) -> Result<Directory> {
    let Some(path) = path else {
        return Ok(Directory::default());
    };
    let raw = fs::read_to_string(path)
        .with_context(|| format!("could not read directory file `{}`", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("could not parse directory file `{}`", path.display()))
}

/// Reads a draft document and normalizes it into a rule.
pub fn read_draft(path: &Path, directory: &Directory) -> Result<ApprovalRule> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("could not read draft file `{}`", path.display()))?;
    let draft: DraftDocument = serde_json::from_str(&raw)
        .with_context(|| format!("could not parse draft file `{}`", path.display()))?;
    draft
        .into_rule(directory)
        .with_context(|| format!("draft file `{}` is not a valid policy", path.display()))
}

pub(crate) fn input_failure(command: &str, error: anyhow::Error) -> CommandResult {
    CommandResult::failure(command, "input", format!("{error:#}"), EXIT_INPUT)
}

pub(crate) fn load_inputs(
    command: &str,
    draft: &Path,
    directory: Option<&Path>,
) -> Result<(ApprovalRule, Directory), CommandResult> {
    let directory = read_directory(directory).map_err(|error| input_failure(command, error))?;
    let rule = read_draft(draft, &directory).map_err(|error| input_failure(command, error))?;
    Ok((rule, directory))
}

/// Maps an application failure to the user-safe message, tagging it with a fresh correlation id
/// that also appears in the log line.
pub(crate) fn backend_failure(command: &str, error: ApplicationError) -> CommandResult {
    let correlation_id = Uuid::new_v4().to_string();
    warn!(
        event_name = "cli.backend.failed",
        command,
        correlation_id = %correlation_id,
        error = %error,
        "policy backend call failed"
    );

    let interface = error.into_interface(correlation_id);
    let error_class = match &interface {
        InterfaceError::BadRequest { .. } => "bad_request",
        InterfaceError::Rejected { .. } => "rejected",
        InterfaceError::ServiceUnavailable { .. } => "backend_unavailable",
        InterfaceError::Internal { .. } => "internal",
    };
    CommandResult::failure(
        command,
        error_class,
        format!("{} (correlation id: {})", interface.user_message(), interface.correlation_id()),
        EXIT_BACKEND,
    )
}
