use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::rule::{
    ActionType, ApprovalRule, ConditionDetail, ConditionField, ConditionValue, FieldKind,
    Operator, RuleGroup, MIN_RULE_NAME_LEN,
};
use crate::rules::users::users_in_sync;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum IssueLocation {
    Rule,
    Group { group: usize },
    Condition { group: usize, condition: usize },
    Action { group: usize, action: usize },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationFailure {
    NameRequired,
    NameTooShort { min_len: usize },
    NoRuleGroups,
    NoConditions,
    NoActions,
    FieldRequired,
    OperatorRequired,
    OperatorNotAllowed { field: ConditionField, operator: Operator },
    ValueRequired,
    ValueShapeMismatch { operator: Operator },
    NumericValueRequired { field: ConditionField },
    DuplicateField { field: ConditionField, first_condition: usize },
    ApproverRequired,
    UsersOutOfSync { user_ids: usize, users: usize },
}

impl ValidationFailure {
    fn message(&self) -> String {
        match self {
            Self::NameRequired => "Policy name is required".to_string(),
            Self::NameTooShort { min_len } => {
                format!("Policy name must be at least {min_len} characters")
            }
            Self::NoRuleGroups => "Add at least one rule".to_string(),
            Self::NoConditions => "Add at least one condition".to_string(),
            Self::NoActions => "Add at least one action".to_string(),
            Self::FieldRequired => "Select a field".to_string(),
            Self::OperatorRequired => "Select an operator".to_string(),
            Self::OperatorNotAllowed { field, operator } => {
                format!("\"{operator}\" is not available for {}", field.label())
            }
            Self::ValueRequired => "Enter a value".to_string(),
            Self::ValueShapeMismatch { operator } if operator.is_multi() => {
                format!("\"{operator}\" expects a list of values")
            }
            Self::ValueShapeMismatch { operator } => {
                format!("\"{operator}\" expects a single value")
            }
            Self::NumericValueRequired { field } => {
                format!("{} must be a number", field.label())
            }
            Self::DuplicateField { field, first_condition } => format!(
                "{} is already used by condition {} in this rule",
                field.label(),
                first_condition + 1
            ),
            Self::ApproverRequired => "Select at least one approver".to_string(),
            Self::UsersOutOfSync { user_ids, users } => {
                format!("Selected approvers are out of sync ({user_ids} ids, {users} users)")
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub location: IssueLocation,
    pub failure: ValidationFailure,
    pub message: String,
}

impl ValidationIssue {
    fn new(location: IssueLocation, failure: ValidationFailure) -> Self {
        Self { location, message: failure.message(), failure }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn issues_at(&self, location: IssueLocation) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(move |issue| issue.location == location)
    }

    pub fn has_duplicate_fields(&self) -> bool {
        self.issues
            .iter()
            .any(|issue| matches!(issue.failure, ValidationFailure::DuplicateField { .. }))
    }
}

pub fn validate_rule(rule: &ApprovalRule) -> ValidationReport {
    let mut issues = Vec::new();

    let name = rule.name.trim();
    if name.is_empty() {
        issues.push(ValidationIssue::new(IssueLocation::Rule, ValidationFailure::NameRequired));
    } else if name.chars().count() < MIN_RULE_NAME_LEN {
        issues.push(ValidationIssue::new(
            IssueLocation::Rule,
            ValidationFailure::NameTooShort { min_len: MIN_RULE_NAME_LEN },
        ));
    }

    if rule.rules.is_empty() {
        issues.push(ValidationIssue::new(IssueLocation::Rule, ValidationFailure::NoRuleGroups));
    }

    for (group_index, group) in rule.rules.iter().enumerate() {
        validate_group(group_index, group, &mut issues);
    }

    ValidationReport { issues }
}

fn validate_group(group_index: usize, group: &RuleGroup, issues: &mut Vec<ValidationIssue>) {
    let group_location = IssueLocation::Group { group: group_index };
    if group.conditions.is_empty() {
        issues.push(ValidationIssue::new(group_location, ValidationFailure::NoConditions));
    }
    if group.actions.is_empty() {
        issues.push(ValidationIssue::new(group_location, ValidationFailure::NoActions));
    }

    let mut first_use: HashMap<ConditionField, usize> = HashMap::new();
    for (condition_index, condition) in group.conditions.iter().enumerate() {
        let location = IssueLocation::Condition { group: group_index, condition: condition_index };
        if let Some(failure) = condition_failure(condition) {
            issues.push(ValidationIssue::new(location, failure));
        }

        if let Some(field) = condition.field {
            if let Some(first_condition) = first_use.get(&field) {
                issues.push(ValidationIssue::new(
                    location,
                    ValidationFailure::DuplicateField { field, first_condition: *first_condition },
                ));
            } else {
                first_use.insert(field, condition_index);
            }
        }
    }

    for (action_index, action) in group.actions.iter().enumerate() {
        let location = IssueLocation::Action { group: group_index, action: action_index };
        let has_approver = action.user_ids.iter().any(|id| !id.trim().is_empty());
        if action.action_type == ActionType::Approval && !has_approver {
            issues.push(ValidationIssue::new(location, ValidationFailure::ApproverRequired));
        }
        if !action.users.is_empty() && !users_in_sync(action) {
            issues.push(ValidationIssue::new(
                location,
                ValidationFailure::UsersOutOfSync {
                    user_ids: action.user_ids.len(),
                    users: action.users.len(),
                },
            ));
        }
    }
}

fn condition_failure(condition: &ConditionDetail) -> Option<ValidationFailure> {
    let Some(field) = condition.field else {
        return Some(ValidationFailure::FieldRequired);
    };
    let Some(operator) = condition.operator else {
        return Some(ValidationFailure::OperatorRequired);
    };
    if !field.supports(operator) {
        return Some(ValidationFailure::OperatorNotAllowed { field, operator });
    }
    if condition.value.is_empty() {
        return Some(ValidationFailure::ValueRequired);
    }
    if !condition.value.fits(field, Some(operator)) {
        return Some(ValidationFailure::ValueShapeMismatch { operator });
    }
    if field.kind() == FieldKind::Numeric && !matches!(condition.value, ConditionValue::Number(_))
    {
        return Some(ValidationFailure::NumericValueRequired { field });
    }
    None
}
