use serde_json::Value;

use crate::domain::directory::Directory;
use crate::domain::rule::{
    ActionType, ApprovalMode, ApprovalRule, ConditionAction, ConditionDetail, ConditionField,
    Operator, RequirementFlag, RuleGroup,
};
use crate::errors::EditError;
use crate::rules::normalize::{hydrate_entity_names, normalize_value};
use crate::rules::operators::{change_field, change_operator, clear_field, OperatorChangeError};
use crate::rules::users::{clean_user_ids, reconcile_users};

/// One user interaction with the policy builder.
#[derive(Clone, Debug, PartialEq)]
pub enum RuleEdit {
    SetName(String),
    AddGroup,
    RemoveGroup { group: usize },
    AddCondition { group: usize },
    RemoveCondition { group: usize, condition: usize },
    SetField { group: usize, condition: usize, field: Option<ConditionField> },
    SetOperator { group: usize, condition: usize, operator: Operator },
    SetValue { group: usize, condition: usize, value: Value },
    AddAction { group: usize, action_type: ActionType },
    RemoveAction { group: usize, action: usize },
    SetActionType { group: usize, action: usize, action_type: ActionType },
    SetActionMode { group: usize, action: usize, mode: ApprovalMode },
    SetActionUsers { group: usize, action: usize, user_ids: Vec<String> },
    SetRequirement { group: usize, flag: RequirementFlag, enabled: bool },
}

/// Applies `edit` to a copy of `rule`; the input draft is never mutated.
pub fn apply_edit(
    rule: &ApprovalRule,
    edit: RuleEdit,
    directory: &Directory,
) -> Result<ApprovalRule, EditError> {
    let mut next = rule.clone();

    match edit {
        RuleEdit::SetName(name) => next.name = name,
        RuleEdit::AddGroup => next.rules.push(RuleGroup::blank()),
        RuleEdit::RemoveGroup { group } => {
            group_mut(&mut next, group)?;
            next.rules.remove(group);
        }
        RuleEdit::AddCondition { group } => {
            group_mut(&mut next, group)?.conditions.push(ConditionDetail::blank());
        }
        RuleEdit::RemoveCondition { group, condition } => {
            condition_mut(&mut next, group, condition)?;
            group_mut(&mut next, group)?.conditions.remove(condition);
        }
        RuleEdit::SetField { group, condition, field } => {
            let slot = condition_mut(&mut next, group, condition)?;
            *slot = match field {
                Some(field) => change_field(slot, field),
                None => clear_field(slot),
            };
        }
        RuleEdit::SetOperator { group, condition, operator } => {
            let slot = condition_mut(&mut next, group, condition)?;
            *slot = change_operator(slot, operator).map_err(|error| match error {
                OperatorChangeError::FieldNotSelected => {
                    EditError::FieldNotSelected { group, condition }
                }
                OperatorChangeError::Incompatible { field, operator } => {
                    EditError::IncompatibleOperator { field, operator }
                }
            })?;
        }
        RuleEdit::SetValue { group, condition, value } => {
            let slot = condition_mut(&mut next, group, condition)?;
            let field = slot.field.ok_or(EditError::FieldNotSelected { group, condition })?;
            let normalized = normalize_value(field, slot.operator, &value);
            slot.value = hydrate_entity_names(field, &normalized, directory);
        }
        RuleEdit::AddAction { group, action_type } => {
            group_mut(&mut next, group)?.actions.push(ConditionAction::new(action_type));
        }
        RuleEdit::RemoveAction { group, action } => {
            action_mut(&mut next, group, action)?;
            group_mut(&mut next, group)?.actions.remove(action);
        }
        RuleEdit::SetActionType { group, action, action_type } => {
            action_mut(&mut next, group, action)?.action_type = action_type;
        }
        RuleEdit::SetActionMode { group, action, mode } => {
            action_mut(&mut next, group, action)?.mode = mode;
        }
        RuleEdit::SetActionUsers { group, action, user_ids } => {
            let slot = action_mut(&mut next, group, action)?;
            let user_ids = clean_user_ids(&user_ids);
            slot.users.retain(|user| user_ids.iter().any(|id| id == user.id.trim()));
            slot.user_ids = user_ids;
            *slot = reconcile_users(slot, directory);
        }
        RuleEdit::SetRequirement { group, flag, enabled } => {
            group_mut(&mut next, group)?.requirements.set(flag, enabled);
        }
    }

    Ok(next)
}

fn group_mut(rule: &mut ApprovalRule, group: usize) -> Result<&mut RuleGroup, EditError> {
    rule.rules.get_mut(group).ok_or(EditError::GroupNotFound { group })
}

fn condition_mut(
    rule: &mut ApprovalRule,
    group: usize,
    condition: usize,
) -> Result<&mut ConditionDetail, EditError> {
    group_mut(rule, group)?
        .conditions
        .get_mut(condition)
        .ok_or(EditError::ConditionNotFound { group, condition })
}

fn action_mut(
    rule: &mut ApprovalRule,
    group: usize,
    action: usize,
) -> Result<&mut ConditionAction, EditError> {
    group_mut(rule, group)?
        .actions
        .get_mut(action)
        .ok_or(EditError::ActionNotFound { group, action })
}
