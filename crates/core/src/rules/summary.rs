use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::directory::Directory;
use crate::domain::entity::EntityRef;
use crate::domain::rule::{
    ActionType, ApprovalMode, ApprovalRule, ConditionAction, ConditionDetail, ConditionField,
    ConditionValue, RuleGroup,
};

pub const INCOMPLETE_CONDITION: &str = "Incomplete condition";
pub const NO_CONDITIONS: &str = "No conditions defined";
pub const NO_ACTIONS: &str = "No actions defined";
pub const UNTITLED_RULE: &str = "Untitled policy";
pub const DEFAULT_ID_PREVIEW_LEN: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SummaryOptions {
    pub id_preview_len: usize,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self { id_preview_len: DEFAULT_ID_PREVIEW_LEN }
    }
}

/// Read-only display tree for a rule. Built fresh for every render; never stored on the rule.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSummary {
    pub name: String,
    pub groups: Vec<GroupSummary>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub title: String,
    pub conditions: Vec<String>,
    pub actions: Vec<String>,
    pub requirements: Vec<String>,
}

pub fn summarize(
    rule: &ApprovalRule,
    directory: &Directory,
    options: &SummaryOptions,
) -> RuleSummary {
    let name = rule.name.trim();
    RuleSummary {
        name: if name.is_empty() { UNTITLED_RULE.to_string() } else { name.to_string() },
        groups: rule
            .rules
            .iter()
            .enumerate()
            .map(|(index, group)| summarize_group(index, group, directory, options))
            .collect(),
    }
}

fn summarize_group(
    index: usize,
    group: &RuleGroup,
    directory: &Directory,
    options: &SummaryOptions,
) -> GroupSummary {
    let mut conditions: Vec<String> = group
        .conditions
        .iter()
        .map(|condition| describe_condition(condition, directory, options))
        .collect();
    if conditions.is_empty() {
        conditions.push(NO_CONDITIONS.to_string());
    }

    let mut actions: Vec<String> =
        group.actions.iter().map(|action| describe_action(action, directory, options)).collect();
    if actions.is_empty() {
        actions.push(NO_ACTIONS.to_string());
    }

    GroupSummary {
        title: format!("Rule {}", index + 1),
        conditions,
        actions,
        requirements: group
            .requirements
            .enabled()
            .into_iter()
            .map(|flag| flag.label().to_string())
            .collect(),
    }
}

fn describe_condition(
    condition: &ConditionDetail,
    directory: &Directory,
    options: &SummaryOptions,
) -> String {
    let (Some(field), Some(operator)) = (condition.field, condition.operator) else {
        return INCOMPLETE_CONDITION.to_string();
    };
    if condition.value.is_empty() {
        return INCOMPLETE_CONDITION.to_string();
    }

    let value = describe_value(field, &condition.value, directory, options);
    format!("{} {} {}", field.label(), operator, value)
}

fn describe_value(
    field: ConditionField,
    value: &ConditionValue,
    directory: &Directory,
    options: &SummaryOptions,
) -> String {
    match value {
        ConditionValue::Empty => String::new(),
        ConditionValue::Number(number) => number.normalize().to_string(),
        ConditionValue::Text(text) => text.trim().to_string(),
        ConditionValue::TextList(items) => {
            join_labels(items.iter().map(|item| item.trim().to_string()))
        }
        ConditionValue::Entity(entity) => entity_label(field, entity, directory, options),
        ConditionValue::EntityList(items) => join_labels(
            items.iter().map(|entity| entity_label(field, entity, directory, options)),
        ),
    }
}

fn describe_action(
    action: &ConditionAction,
    directory: &Directory,
    options: &SummaryOptions,
) -> String {
    let people = join_labels(
        action.user_ids.iter().map(|user_id| user_label(user_id, action, directory, options)),
    );

    match (action.action_type, action.user_ids.is_empty()) {
        (ActionType::Approval, true) => "Approval (no approvers selected)".to_string(),
        (ActionType::Notification, true) => "Notification (no recipients selected)".to_string(),
        (ActionType::Approval, false) => match action.mode {
            ApprovalMode::All => format!("Approval from all of: {people}"),
            ApprovalMode::Any => format!("Approval from any of: {people}"),
        },
        (ActionType::Notification, false) => format!("Notify: {people}"),
    }
}

fn entity_label(
    field: ConditionField,
    entity: &EntityRef,
    directory: &Directory,
    options: &SummaryOptions,
) -> String {
    if entity.has_resolved_name() {
        return entity.name.trim().to_string();
    }
    directory
        .entity_name(field, &entity.id)
        .map(str::to_string)
        .unwrap_or_else(|| truncate_id(&entity.id, options.id_preview_len))
}

fn user_label(
    user_id: &str,
    action: &ConditionAction,
    directory: &Directory,
    options: &SummaryOptions,
) -> String {
    if let Some(name) = directory.user_name(user_id) {
        return name.to_string();
    }
    action
        .users
        .iter()
        .find(|user| user.id == user_id && !user.is_unknown() && !user.name.trim().is_empty())
        .map(|user| user.name.clone())
        .unwrap_or_else(|| truncate_id(user_id, options.id_preview_len))
}

pub fn truncate_id(id: &str, max_len: usize) -> String {
    let id = id.trim();
    if id.chars().count() <= max_len {
        return id.to_string();
    }
    let prefix: String = id.chars().take(max_len).collect();
    format!("{prefix}…")
}

fn join_labels(labels: impl Iterator<Item = String>) -> String {
    labels.collect::<Vec<_>>().join(", ")
}

impl fmt::Display for RuleSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.name)?;
        for group in &self.groups {
            writeln!(f, "  {}", group.title)?;
            for (index, condition) in group.conditions.iter().enumerate() {
                let keyword = if index == 0 { "IF" } else { "AND" };
                writeln!(f, "    {keyword} {condition}")?;
            }
            for action in &group.actions {
                writeln!(f, "    THEN {action}")?;
            }
            if !group.requirements.is_empty() {
                writeln!(f, "    REQUIRES {}", group.requirements.join(", "))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{summarize, truncate_id, SummaryOptions, INCOMPLETE_CONDITION, NO_ACTIONS};
    use crate::domain::directory::Directory;
    use crate::domain::entity::{EntityRef, UserRef};
    use crate::domain::rule::{
        ActionType, ApprovalMode, ApprovalRule, ConditionAction, ConditionDetail, ConditionField,
        ConditionValue, Operator, RequirementFlag, RuleGroup,
    };

    fn directory() -> Directory {
        Directory {
            users: vec![UserRef::new("u-1", "Dana Ortiz"), UserRef::new("u-2", "Sam Lee")],
            vendors: vec![EntityRef::new("v-1", "Acme Supply")],
            ..Directory::default()
        }
    }

    #[test]
    fn resolves_ids_to_labels() {
        let mut group = RuleGroup::empty();
        group.conditions = vec![
            ConditionDetail::new(
                ConditionField::Amount,
                Operator::GreaterThan,
                ConditionValue::Number(Decimal::new(100_000, 2)),
            ),
            ConditionDetail::new(
                ConditionField::Vendor,
                Operator::IsOneOf,
                ConditionValue::EntityList(vec![
                    EntityRef::placeholder("v-1"),
                    EntityRef::new("v-2", "Globex"),
                    EntityRef::placeholder("3f2a9c1e-7b44-4d1a-9e0f-12ab34cd56ef"),
                ]),
            ),
        ];
        group.actions = vec![ConditionAction::new(ActionType::Approval)
            .with_mode(ApprovalMode::Any)
            .with_users(vec!["u-1".to_string(), "u-2".to_string()])];
        group.requirements.set(RequirementFlag::RequireReceipt, true);
        let rule = ApprovalRule { name: "Vendor spend".to_string(), rules: vec![group] };

        let summary = summarize(&rule, &directory(), &SummaryOptions::default());
        let group = &summary.groups[0];
        assert_eq!(group.title, "Rule 1");
        assert_eq!(group.conditions[0], "Amount greater than 1000");
        assert_eq!(group.conditions[1], "Vendor is one of Acme Supply, Globex, 3f2a9c1e…");
        assert_eq!(group.actions, vec!["Approval from any of: Dana Ortiz, Sam Lee".to_string()]);
        assert_eq!(group.requirements, vec!["Receipt".to_string()]);
    }

    #[test]
    fn tolerates_partially_filled_rules() {
        let mut group = RuleGroup::empty();
        group.conditions = vec![
            ConditionDetail::blank(),
            ConditionDetail::new(
                ConditionField::Customer,
                Operator::IsOneOf,
                ConditionValue::EntityList(Vec::new()),
            ),
        ];
        let rule = ApprovalRule { name: " ".to_string(), rules: vec![group] };

        let summary = summarize(&rule, &Directory::default(), &SummaryOptions::default());
        assert_eq!(summary.name, "Untitled policy");
        assert_eq!(summary.groups[0].conditions, vec![INCOMPLETE_CONDITION, INCOMPLETE_CONDITION]);
        assert_eq!(summary.groups[0].actions, vec![NO_ACTIONS]);
    }

    #[test]
    fn unknown_users_fall_back_to_local_name_then_truncated_id() {
        let mut action = ConditionAction::new(ActionType::Notification)
            .with_users(vec!["u-77".to_string(), "user-000000001234".to_string()]);
        action.users =
            vec![UserRef::new("u-77", "Kim Park"), UserRef::unknown("user-000000001234")];
        let mut group = RuleGroup::empty();
        group.actions = vec![action];
        let rule = ApprovalRule { name: "Notify".to_string(), rules: vec![group] };

        let summary =
            summarize(&rule, &Directory::default(), &SummaryOptions { id_preview_len: 6 });
        assert_eq!(summary.groups[0].actions, vec!["Notify: Kim Park, user-0…".to_string()]);
    }

    #[test]
    fn summarizing_leaves_rule_untouched() {
        let rule = ApprovalRule::new("Draft");
        let before = rule.clone();
        let _ = summarize(&rule, &directory(), &SummaryOptions::default());
        assert_eq!(rule, before);
    }

    #[test]
    fn display_renders_if_then_tree() {
        let mut group = RuleGroup::empty();
        group.conditions = vec![ConditionDetail::new(
            ConditionField::Category,
            Operator::Is,
            ConditionValue::Text("travel".to_string()),
        )];
        group.actions =
            vec![ConditionAction::new(ActionType::Approval).with_users(vec!["u-1".to_string()])];
        group.requirements.set(RequirementFlag::BusinessPurpose, true);
        let rule = ApprovalRule { name: "Travel".to_string(), rules: vec![group] };

        let rendered = summarize(&rule, &directory(), &SummaryOptions::default()).to_string();
        assert_eq!(
            rendered,
            "Travel\n  Rule 1\n    IF Category is travel\n    THEN Approval from all of: Dana Ortiz\n    REQUIRES Business purpose\n"
        );
    }

    #[test]
    fn truncate_id_respects_char_boundaries() {
        assert_eq!(truncate_id("short", 8), "short");
        assert_eq!(truncate_id("ééééééééé", 3), "ééé…");
    }
}
