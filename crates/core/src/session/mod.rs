pub mod backend;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use backend::PolicyBackend;

use crate::domain::directory::Directory;
use crate::domain::rule::ApprovalRule;
use crate::errors::{ApplicationError, DomainError, EditError};
use crate::rules::edits::{apply_edit, RuleEdit};
use crate::rules::payload::{CreatedPolicy, PolicyPayload, PolicyRecord};
use crate::rules::summary::{summarize, RuleSummary, SummaryOptions};
use crate::rules::users::reconcile_rule;
use crate::rules::validation::{validate_rule, ValidationReport};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Draft,
    Validated,
    Submitted,
}

impl SessionState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Validated => "validated",
            Self::Submitted => "submitted",
        }
    }

    pub fn can_transition_to(self, next: SessionState) -> bool {
        matches!(
            (self, next),
            (SessionState::Draft, SessionState::Draft)
                | (SessionState::Draft, SessionState::Validated)
                | (SessionState::Validated, SessionState::Draft)
                | (SessionState::Validated, SessionState::Validated)
                | (SessionState::Validated, SessionState::Submitted)
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Single-owner editing session for one policy form. Dropping it cancels the edit.
#[derive(Clone, Debug)]
pub struct EditSession {
    rule: ApprovalRule,
    directory: Directory,
    state: SessionState,
    policy_id: Option<String>,
}

impl EditSession {
    pub fn new(name: impl Into<String>, directory: Directory) -> Self {
        Self::from_rule(ApprovalRule::new(name), directory)
    }

    pub fn from_rule(rule: ApprovalRule, directory: Directory) -> Self {
        let rule = reconcile_rule(&rule, &directory);
        Self { rule, directory, state: SessionState::Draft, policy_id: None }
    }

    /// Opens a stored policy for editing; UI ids are regenerated and names come from `directory`.
    pub fn load_existing(record: &PolicyRecord, directory: Directory) -> Self {
        let rule = record.to_rule(&directory);
        Self { rule, directory, state: SessionState::Draft, policy_id: Some(record.id.clone()) }
    }

    pub fn rule(&self) -> &ApprovalRule {
        &self.rule
    }

    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn policy_id(&self) -> Option<&str> {
        self.policy_id.as_deref()
    }

    pub fn apply(&mut self, edit: RuleEdit) -> Result<(), EditError> {
        if self.state == SessionState::Submitted {
            return Err(EditError::SessionClosed);
        }
        self.rule = apply_edit(&self.rule, edit, &self.directory)?;
        self.state = SessionState::Draft;
        Ok(())
    }

    /// Replaces the lookup lists (e.g. after the user list finishes loading) and re-derives
    /// action users against them.
    pub fn set_directory(&mut self, directory: Directory) {
        self.rule = reconcile_rule(&self.rule, &directory);
        self.directory = directory;
    }

    pub fn validate(&mut self) -> ValidationReport {
        let report = validate_rule(&self.rule);
        if self.state != SessionState::Submitted {
            self.state =
                if report.is_valid() { SessionState::Validated } else { SessionState::Draft };
        }
        report
    }

    pub fn summary(&self, options: &SummaryOptions) -> RuleSummary {
        summarize(&self.rule, &self.directory, options)
    }

    pub fn payload(&self) -> Result<PolicyPayload, DomainError> {
        PolicyPayload::from_rule(&reconcile_rule(&self.rule, &self.directory))
    }

    /// Sends the validated draft. On failure the session stays `Validated` so the user can
    /// retry or keep editing.
    pub async fn submit<B>(&mut self, backend: &B) -> Result<CreatedPolicy, ApplicationError>
    where
        B: PolicyBackend + ?Sized,
    {
        if self.state == SessionState::Draft {
            let report = validate_rule(&self.rule);
            if !report.is_valid() {
                return Err(ApplicationError::Validation { issues: report.issues.len() });
            }
        }
        self.transition_guard(SessionState::Submitted)?;

        self.rule = reconcile_rule(&self.rule, &self.directory);
        let payload = PolicyPayload::from_rule(&self.rule)?;
        let created = backend.create_policy(&payload).await?;

        self.state = SessionState::Submitted;
        if let Some(id) = created.id.clone() {
            self.policy_id = Some(id);
        }
        Ok(created)
    }

    fn transition_guard(&self, next: SessionState) -> Result<(), DomainError> {
        if self.state.can_transition_to(next) {
            return Ok(());
        }
        Err(DomainError::InvalidSessionTransition { from: self.state, to: next })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;

    use super::{EditSession, PolicyBackend, SessionState};
    use crate::domain::directory::Directory;
    use crate::domain::entity::UserRef;
    use crate::domain::rule::{ConditionField, Operator};
    use crate::errors::{ApplicationError, BackendError, DomainError, EditError};
    use crate::rules::edits::RuleEdit;
    use crate::rules::payload::{CreatedPolicy, PolicyPayload, PolicyRecord};

    #[derive(Default)]
    struct InMemoryBackend {
        created: Mutex<Vec<PolicyPayload>>,
        reject_with: Option<BackendError>,
    }

    #[async_trait]
    impl PolicyBackend for InMemoryBackend {
        async fn create_policy(
            &self,
            payload: &PolicyPayload,
        ) -> Result<CreatedPolicy, BackendError> {
            if let Some(error) = &self.reject_with {
                return Err(error.clone());
            }
            let mut created = self.created.lock().expect("lock");
            created.push(payload.clone());
            Ok(CreatedPolicy { id: Some(format!("pol-{}", created.len())), message: None })
        }

        async fn list_policies(&self) -> Result<Vec<PolicyRecord>, BackendError> {
            Ok(Vec::new())
        }

        async fn policy_details(&self, policy_id: &str) -> Result<PolicyRecord, BackendError> {
            Err(BackendError::Status {
                status: 404,
                message: Some(format!("policy {policy_id} not found")),
            })
        }
    }

    fn directory() -> Directory {
        Directory { users: vec![UserRef::new("u1", "Dana Ortiz")], ..Directory::default() }
    }

    fn filled_session() -> EditSession {
        let mut session = EditSession::new("R1", directory());
        for edit in [
            RuleEdit::SetField { group: 0, condition: 0, field: Some(ConditionField::Amount) },
            RuleEdit::SetOperator { group: 0, condition: 0, operator: Operator::GreaterThan },
            RuleEdit::SetValue { group: 0, condition: 0, value: json!(1000) },
            RuleEdit::SetActionUsers { group: 0, action: 0, user_ids: vec!["u1".to_string()] },
        ] {
            session.apply(edit).expect("edit applies");
        }
        session
    }

    #[test]
    fn session_state_transitions_are_guarded() {
        assert!(SessionState::Draft.can_transition_to(SessionState::Validated));
        assert!(SessionState::Validated.can_transition_to(SessionState::Submitted));
        assert!(SessionState::Validated.can_transition_to(SessionState::Draft));
        assert!(!SessionState::Draft.can_transition_to(SessionState::Submitted));
        assert!(!SessionState::Submitted.can_transition_to(SessionState::Draft));
    }

    #[test]
    fn validate_moves_to_validated_and_edits_move_back() {
        let mut session = filled_session();
        assert!(session.validate().is_valid());
        assert_eq!(session.state(), SessionState::Validated);

        session.apply(RuleEdit::SetName("R".to_string())).expect("edit applies");
        assert_eq!(session.state(), SessionState::Draft);
        assert!(!session.validate().is_valid());
        assert_eq!(session.state(), SessionState::Draft);
    }

    #[tokio::test]
    async fn submit_requires_validation() {
        let backend = InMemoryBackend::default();
        let mut session = filled_session();

        let error = session.submit(&backend).await.expect_err("draft cannot be submitted");
        assert_eq!(
            error,
            ApplicationError::Domain(DomainError::InvalidSessionTransition {
                from: SessionState::Draft,
                to: SessionState::Submitted,
            })
        );
        assert!(backend.created.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn submitting_an_invalid_draft_reports_issue_count() {
        let backend = InMemoryBackend::default();
        let mut session = filled_session();
        session.apply(RuleEdit::SetName("R".to_string())).expect("edit applies");
        session
            .apply(RuleEdit::SetActionUsers { group: 0, action: 0, user_ids: Vec::new() })
            .expect("edit applies");

        let error = session.submit(&backend).await.expect_err("invalid draft is refused");
        assert_eq!(error, ApplicationError::Validation { issues: 2 });
        assert_eq!(session.state(), SessionState::Draft);
        assert!(backend.created.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn submit_sends_wire_payload_and_closes_session() {
        let backend = InMemoryBackend::default();
        let mut session = filled_session();
        session.validate();

        let created = session.submit(&backend).await.expect("submit succeeds");
        assert_eq!(created.id.as_deref(), Some("pol-1"));
        assert_eq!(session.state(), SessionState::Submitted);
        assert_eq!(session.policy_id(), Some("pol-1"));

        let sent = backend.created.lock().expect("lock");
        let json = serde_json::to_value(&sent[0]).expect("payload serializes");
        assert_eq!(
            json["rules"][0]["conditions"][0],
            json!({"field": "amount", "operator": "greater than", "value": 1000})
        );
        drop(sent);

        assert_eq!(
            session.apply(RuleEdit::SetName("Later".to_string())),
            Err(EditError::SessionClosed)
        );
    }

    #[tokio::test]
    async fn failed_submit_keeps_session_editable() {
        let backend = InMemoryBackend {
            reject_with: Some(BackendError::Status {
                status: 409,
                message: Some("A policy with this name already exists".to_string()),
            }),
            ..InMemoryBackend::default()
        };
        let mut session = filled_session();
        session.validate();

        let error = session.submit(&backend).await.expect_err("backend rejects");
        let ApplicationError::Backend(backend_error) = &error else {
            panic!("expected backend error, got {error:?}");
        };
        assert_eq!(backend_error.user_message(), "A policy with this name already exists");
        assert_eq!(session.state(), SessionState::Validated);
        session.apply(RuleEdit::SetName("R1 renamed".to_string())).expect("still editable");
    }

    #[test]
    fn load_existing_rehydrates_names_and_keeps_policy_id() {
        let record: PolicyRecord = serde_json::from_value(json!({
            "_id": "pol-7",
            "name": "Stored",
            "rules": [{
                "conditions": [{"field": "amount", "operator": "less than", "value": 50}],
                "actions": [{"actionType": "approval", "approvalMode": "any",
                             "selectedUserIds": ["u1"], "approverType": "user"}]
            }]
        }))
        .expect("record parses");

        let mut session = EditSession::load_existing(&record, directory());
        assert_eq!(session.policy_id(), Some("pol-7"));
        assert_eq!(
            session.rule().rules[0].actions[0].users,
            vec![UserRef::new("u1", "Dana Ortiz")]
        );
        assert!(session.validate().is_valid());
    }

    #[test]
    fn replacing_directory_reconciles_unknown_users() {
        let mut session = EditSession::new("Late users", Directory::default());
        session
            .apply(RuleEdit::SetActionUsers {
                group: 0,
                action: 0,
                user_ids: vec!["u1".to_string()],
            })
            .expect("edit applies");
        assert_eq!(session.rule().rules[0].actions[0].users, vec![UserRef::unknown("u1")]);

        session.set_directory(directory());
        assert_eq!(
            session.rule().rules[0].actions[0].users,
            vec![UserRef::new("u1", "Dana Ortiz")]
        );
    }
}
