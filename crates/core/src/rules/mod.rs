pub mod draft;
pub mod edits;
pub mod normalize;
pub mod operators;
pub mod payload;
pub mod summary;
pub mod users;
pub mod validation;

pub use draft::{DraftAction, DraftCondition, DraftDocument, DraftGroup};
pub use edits::{apply_edit, RuleEdit};
pub use normalize::{convert_multiplicity, hydrate_entity_names, normalize_value, reshape_value};
pub use operators::{change_field, change_operator, clear_field, OperatorChangeError};
pub use payload::{
    wire_value, ActionPayload, ApproverType, ConditionPayload, CreatedPolicy, PolicyPayload,
    PolicyRecord, RuleGroupPayload,
};
pub use summary::{summarize, truncate_id, GroupSummary, RuleSummary, SummaryOptions};
pub use users::{reconcile_rule, reconcile_users, users_in_sync};
pub use validation::{
    validate_rule, IssueLocation, ValidationFailure, ValidationIssue, ValidationReport,
};
