use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::directory::Directory;
use crate::domain::entity::UserRef;
use crate::domain::rule::{
    ActionType, ApprovalMode, ApprovalRule, ConditionAction, ConditionDetail, ConditionField,
    ConditionValue, Operator, RequirementFlags, RuleGroup,
};
use crate::errors::DomainError;
use crate::rules::normalize::{hydrate_entity_names, normalize_value};
use crate::rules::users::reconcile_users;

/// Builder-shaped rule as it comes out of a form or a hand-written JSON file. Values are raw;
/// `into_rule` normalizes them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DraftDocument {
    pub name: String,
    pub rules: Vec<DraftGroup>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DraftGroup {
    pub conditions: Vec<DraftCondition>,
    pub actions: Vec<DraftAction>,
    pub requirements: RequirementFlags,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DraftCondition {
    pub field: Option<String>,
    pub operator: Option<String>,
    pub value: Value,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftAction {
    #[serde(rename = "type", alias = "actionType")]
    pub action_type: ActionType,
    #[serde(default, alias = "approvalMode")]
    pub mode: ApprovalMode,
    #[serde(default, alias = "selectedUserIds")]
    pub user_ids: Vec<String>,
    #[serde(default)]
    pub users: Vec<UserRef>,
}

impl DraftDocument {
    /// Parses field and operator names, normalizes every value to the shape its operator calls
    /// for and reconciles action users against `directory`.
    pub fn into_rule(self, directory: &Directory) -> Result<ApprovalRule, DomainError> {
        let rules = self
            .rules
            .into_iter()
            .map(|group| group.into_group(directory))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ApprovalRule { name: self.name, rules })
    }
}

impl DraftGroup {
    fn into_group(self, directory: &Directory) -> Result<RuleGroup, DomainError> {
        let conditions = self
            .conditions
            .into_iter()
            .map(|condition| condition.into_condition(directory))
            .collect::<Result<Vec<_>, _>>()?;
        let actions =
            self.actions.into_iter().map(|action| action.into_action(directory)).collect();

        Ok(RuleGroup { conditions, actions, requirements: self.requirements, ..RuleGroup::empty() })
    }
}

impl DraftCondition {
    fn into_condition(self, directory: &Directory) -> Result<ConditionDetail, DomainError> {
        let Some(field) = parse_optional::<ConditionField>(self.field.as_deref())? else {
            return Ok(ConditionDetail::blank());
        };
        let operator = parse_optional::<Operator>(self.operator.as_deref())?;
        if let Some(operator) = operator {
            if !field.supports(operator) {
                return Err(DomainError::IncompatibleOperator { field, operator });
            }
        }

        let value = match self.value {
            Value::Null => ConditionValue::empty_for(Some(field), operator),
            raw => hydrate_entity_names(field, &normalize_value(field, operator, &raw), directory),
        };

        Ok(ConditionDetail { field: Some(field), operator, value, ..ConditionDetail::blank() })
    }
}

impl DraftAction {
    fn into_action(self, directory: &Directory) -> ConditionAction {
        let mut action =
            ConditionAction::new(self.action_type).with_mode(self.mode).with_users(self.user_ids);
        action.users = self.users;
        reconcile_users(&action, directory)
    }
}

fn parse_optional<T>(raw: Option<&str>) -> Result<Option<T>, DomainError>
where
    T: FromStr<Err = DomainError>,
{
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some),
    }
}
