use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::directory::Directory;
use crate::domain::rule::{
    ActionType, ApprovalMode, ApprovalRule, ConditionAction, ConditionDetail, ConditionField,
    ConditionValue, GroupId, Operator, RequirementFlags, RuleGroup,
};
use crate::errors::DomainError;
use crate::rules::normalize::{hydrate_entity_names, normalize_value};
use crate::rules::operators::change_field;
use crate::rules::users::{clean_user_ids, reconcile_users};

/// Body of `POST /policies/create`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PolicyPayload {
    pub name: String,
    pub rules: Vec<RuleGroupPayload>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RuleGroupPayload {
    #[serde(default)]
    pub conditions: Vec<ConditionPayload>,
    #[serde(default)]
    pub actions: Vec<ActionPayload>,
    #[serde(default)]
    pub requirements: RequirementFlags,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConditionPayload {
    pub field: ConditionField,
    pub operator: Operator,
    #[serde(default)]
    pub value: Value,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApproverType {
    #[default]
    User,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionPayload {
    pub action_type: ActionType,
    #[serde(default)]
    pub approval_mode: ApprovalMode,
    #[serde(default)]
    pub selected_user_ids: Vec<String>,
    #[serde(default)]
    pub approver_type: ApproverType,
}

impl PolicyPayload {
    /// Builds the wire DTO. UI correlation ids are dropped and entity values are flattened to
    /// bare ids; the rule itself is left untouched.
    pub fn from_rule(rule: &ApprovalRule) -> Result<Self, DomainError> {
        let rules = rule
            .rules
            .iter()
            .enumerate()
            .map(|(group_index, group)| group_payload(group_index, group))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { name: rule.name.trim().to_string(), rules })
    }
}

fn group_payload(group_index: usize, group: &RuleGroup) -> Result<RuleGroupPayload, DomainError> {
    let conditions = group
        .conditions
        .iter()
        .enumerate()
        .map(|(condition_index, condition)| {
            condition_payload(condition).ok_or(DomainError::IncompleteCondition {
                group: group_index,
                condition: condition_index,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(RuleGroupPayload {
        conditions,
        actions: group.actions.iter().map(action_payload).collect(),
        requirements: group.requirements,
    })
}

fn condition_payload(condition: &ConditionDetail) -> Option<ConditionPayload> {
    Some(ConditionPayload {
        field: condition.field?,
        operator: condition.operator?,
        value: wire_value(&condition.value),
    })
}

fn action_payload(action: &ConditionAction) -> ActionPayload {
    ActionPayload {
        action_type: action.action_type,
        approval_mode: action.mode,
        selected_user_ids: clean_user_ids(&action.user_ids),
        approver_type: ApproverType::User,
    }
}

pub fn wire_value(value: &ConditionValue) -> Value {
    match value {
        ConditionValue::Empty => Value::Null,
        ConditionValue::Number(number) => decimal_to_json(*number),
        ConditionValue::Text(text) => Value::String(text.clone()),
        ConditionValue::TextList(items) => {
            Value::Array(items.iter().cloned().map(Value::String).collect())
        }
        ConditionValue::Entity(entity) => Value::String(entity.id.clone()),
        ConditionValue::EntityList(items) => {
            Value::Array(items.iter().map(|entity| Value::String(entity.id.clone())).collect())
        }
    }
}

fn decimal_to_json(number: Decimal) -> Value {
    let normalized = number.normalize();
    if normalized.scale() == 0 {
        if let Some(integer) = normalized.to_i64() {
            return Value::from(integer);
        }
    }
    normalized
        .to_f64()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(normalized.to_string()))
}

/// Policy as returned by `GET /policies/all` and `GET /policies/details/{id}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyRecord {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub rules: Vec<RuleGroupPayload>,
    #[serde(default, alias = "created_at")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "updated_at")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl PolicyRecord {
    /// Rehydrates a stored policy into an editable draft with fresh UI ids.
    pub fn to_rule(&self, directory: &Directory) -> ApprovalRule {
        let rules = self
            .rules
            .iter()
            .map(|group| RuleGroup {
                id: GroupId::generate(),
                conditions: group
                    .conditions
                    .iter()
                    .map(|condition| condition_from_payload(condition, directory))
                    .collect(),
                actions: group
                    .actions
                    .iter()
                    .map(|action| action_from_payload(action, directory))
                    .collect(),
                requirements: group.requirements,
            })
            .collect();

        ApprovalRule { name: self.name.clone(), rules }
    }
}

/// An operator the field does not offer is dropped, leaving the condition as a fresh field pick.
fn condition_from_payload(condition: &ConditionPayload, directory: &Directory) -> ConditionDetail {
    if !condition.field.supports(condition.operator) {
        return change_field(&ConditionDetail::blank(), condition.field);
    }
    let value = normalize_value(condition.field, Some(condition.operator), &condition.value);
    ConditionDetail::new(
        condition.field,
        condition.operator,
        hydrate_entity_names(condition.field, &value, directory),
    )
}

fn action_from_payload(action: &ActionPayload, directory: &Directory) -> ConditionAction {
    let draft = ConditionAction::new(action.action_type)
        .with_mode(action.approval_mode)
        .with_users(action.selected_user_ids.clone());
    reconcile_users(&draft, directory)
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedPolicy {
    #[serde(default, alias = "_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}
