use thiserror::Error;

use crate::domain::rule::{ConditionField, Operator};
use crate::session::SessionState;

pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong. Please try again.";

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid session transition from {from} to {to}")]
    InvalidSessionTransition { from: SessionState, to: SessionState },
    #[error("unknown condition field `{value}`")]
    UnknownField { value: String },
    #[error("unknown operator `{value}`")]
    UnknownOperator { value: String },
    #[error("operator `{operator}` is not available for field `{field}`")]
    IncompatibleOperator { field: ConditionField, operator: Operator },
    #[error("condition {condition} in rule group {group} is missing a field or operator")]
    IncompleteCondition { group: usize, condition: usize },
}

/// Addressing and compatibility failures raised by the edit reducer.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EditError {
    #[error("rule group {group} does not exist")]
    GroupNotFound { group: usize },
    #[error("condition {condition} does not exist in rule group {group}")]
    ConditionNotFound { group: usize, condition: usize },
    #[error("action {action} does not exist in rule group {group}")]
    ActionNotFound { group: usize, action: usize },
    #[error("condition {condition} in rule group {group} has no field selected")]
    FieldNotSelected { group: usize, condition: usize },
    #[error("operator `{operator}` is not available for field `{field}`")]
    IncompatibleOperator { field: ConditionField, operator: Operator },
    #[error("a submitted policy can no longer be edited")]
    SessionClosed,
}

/// Failure talking to the policy backend.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BackendError {
    #[error("network failure: {message}")]
    Network { message: String },
    #[error("backend responded with status {status}")]
    Status { status: u16, message: Option<String> },
    #[error("could not decode backend response: {message}")]
    Decode { message: String },
}

impl BackendError {
    /// Toast text: the server's own message when it sent one, otherwise a generic string.
    pub fn user_message(&self) -> &str {
        match self {
            Self::Status { message: Some(message), .. } if !message.trim().is_empty() => message,
            _ => GENERIC_FAILURE_MESSAGE,
        }
    }

    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Status { status, .. } if (400..500).contains(status))
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Edit(#[from] EditError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("rule failed validation with {issues} issue(s)")]
    Validation { issues: usize },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("rejected by backend: {message}")]
    Rejected { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &str {
        match self {
            Self::BadRequest { .. } => "The rule could not be saved. Check the highlighted fields.",
            Self::Rejected { message, .. } | Self::ServiceUnavailable { message, .. } => message,
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::Rejected { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::Rejected { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let correlation_id = "unassigned".to_owned();
        match value {
            ApplicationError::Domain(error) => {
                Self::BadRequest { message: error.to_string(), correlation_id }
            }
            ApplicationError::Edit(error) => {
                Self::BadRequest { message: error.to_string(), correlation_id }
            }
            ApplicationError::Validation { issues } => Self::BadRequest {
                message: format!("{issues} validation issue(s)"),
                correlation_id,
            },
            ApplicationError::Backend(error) if error.is_client_error() => {
                Self::Rejected { message: error.user_message().to_owned(), correlation_id }
            }
            ApplicationError::Backend(error) => Self::ServiceUnavailable {
                message: error.user_message().to_owned(),
                correlation_id,
            },
        }
    }
}
