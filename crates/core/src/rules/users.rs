use crate::domain::directory::Directory;
use crate::domain::entity::UserRef;
use crate::domain::rule::{ApprovalRule, ConditionAction};

pub fn users_in_sync(action: &ConditionAction) -> bool {
    action.user_ids.len() == action.users.len()
        && action.user_ids.iter().zip(&action.users).all(|(id, user)| *id == user.id)
}

/// Trims ids and drops blank ones, keeping the original order.
pub fn clean_user_ids(user_ids: &[String]) -> Vec<String> {
    user_ids.iter().map(|id| id.trim()).filter(|id| !id.is_empty()).map(str::to_string).collect()
}

/// Rebuilds whichever of `user_ids` / `users` has drifted. `user_ids` wins unless it is
/// empty while `users` is not. Placeholder names are upgraded from the directory either way.
pub fn reconcile_users(action: &ConditionAction, directory: &Directory) -> ConditionAction {
    let action = &clean_action_users(action);
    let mut reconciled = action.clone();
    if users_in_sync(action) {
        reconciled.users = action.users.iter().map(|user| resolve_user(user, directory)).collect();
        return reconciled;
    }

    if action.user_ids.is_empty() {
        reconciled.user_ids = action.users.iter().map(|user| user.id.clone()).collect();
        reconciled.users = action.users.iter().map(|user| resolve_user(user, directory)).collect();
        return reconciled;
    }

    reconciled.users = action
        .user_ids
        .iter()
        .map(|user_id| {
            let previous = action.users.iter().find(|user| user.id == *user_id);
            match (directory.user(user_id), previous) {
                (Some(known), _) => known.clone(),
                (None, Some(previous)) => previous.clone(),
                (None, None) => UserRef::unknown(user_id.clone()),
            }
        })
        .collect();
    reconciled
}

pub fn reconcile_rule(rule: &ApprovalRule, directory: &Directory) -> ApprovalRule {
    let mut reconciled = rule.clone();
    for group in &mut reconciled.rules {
        for action in &mut group.actions {
            *action = reconcile_users(action, directory);
        }
    }
    reconciled
}

fn clean_action_users(action: &ConditionAction) -> ConditionAction {
    let mut cleaned = action.clone();
    cleaned.user_ids = clean_user_ids(&action.user_ids);
    cleaned.users = action
        .users
        .iter()
        .filter(|user| !user.id.trim().is_empty())
        .map(|user| UserRef { id: user.id.trim().to_string(), name: user.name.clone() })
        .collect();
    cleaned
}

fn resolve_user(user: &UserRef, directory: &Directory) -> UserRef {
    if !user.name.trim().is_empty() && !user.is_unknown() {
        return user.clone();
    }
    directory.user(&user.id).cloned().unwrap_or_else(|| UserRef::unknown(user.id.clone()))
}
