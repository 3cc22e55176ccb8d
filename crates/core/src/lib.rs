pub mod config;
pub mod domain;
pub mod errors;
pub mod rules;
pub mod session;

pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use domain::directory::Directory;
pub use domain::entity::{EntityRef, UserRef};
pub use domain::rule::{
    ActionType, ApprovalMode, ApprovalRule, ConditionAction, ConditionDetail, ConditionField,
    ConditionValue, Operator, RequirementFlag, RequirementFlags, RuleGroup,
};
pub use errors::{ApplicationError, BackendError, DomainError, EditError, InterfaceError};
pub use rules::{
    apply_edit, summarize, validate_rule, CreatedPolicy, DraftDocument, PolicyPayload,
    PolicyRecord, RuleEdit, RuleSummary, SummaryOptions, ValidationReport,
};
pub use session::{EditSession, PolicyBackend, SessionState};
