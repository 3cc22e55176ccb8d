use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entity::{EntityRef, UserRef};
use crate::errors::DomainError;

pub const MIN_RULE_NAME_LEN: usize = 2;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConditionId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionId(pub String);

impl GroupId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl ConditionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl ActionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionField {
    Amount,
    Vendor,
    Customer,
    InventoryItem,
    Category,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Numeric,
    Entity,
    Text,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Multiplicity {
    Single,
    Multi,
}

const NUMERIC_OPERATORS: &[Operator] = &[
    Operator::GreaterThan,
    Operator::GreaterThanOrEqual,
    Operator::LessThan,
    Operator::LessThanOrEqual,
    Operator::EqualTo,
];

const SET_OPERATORS: &[Operator] =
    &[Operator::Is, Operator::IsNot, Operator::IsOneOf, Operator::IsNotOneOf];

impl ConditionField {
    pub fn kind(self) -> FieldKind {
        match self {
            Self::Amount => FieldKind::Numeric,
            Self::Vendor | Self::Customer | Self::InventoryItem => FieldKind::Entity,
            Self::Category => FieldKind::Text,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Amount => "amount",
            Self::Vendor => "vendor",
            Self::Customer => "customer",
            Self::InventoryItem => "inventory_item",
            Self::Category => "category",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Amount => "Amount",
            Self::Vendor => "Vendor",
            Self::Customer => "Customer",
            Self::InventoryItem => "Inventory item",
            Self::Category => "Category",
        }
    }

    /// Operators the condition builder offers for this field.
    pub fn operators(self) -> &'static [Operator] {
        match self.kind() {
            FieldKind::Numeric => NUMERIC_OPERATORS,
            FieldKind::Entity | FieldKind::Text => SET_OPERATORS,
        }
    }

    pub fn supports(self, operator: Operator) -> bool {
        self.operators().contains(&operator)
    }

    /// Shape a value takes for this field when `operator` is selected. Entity fields
    /// default to multi-select until an operator narrows them.
    pub fn value_multiplicity(self, operator: Option<Operator>) -> Multiplicity {
        match (self.kind(), operator) {
            (FieldKind::Numeric, _) => Multiplicity::Single,
            (FieldKind::Entity, None) => Multiplicity::Multi,
            (FieldKind::Text, None) => Multiplicity::Single,
            (_, Some(operator)) => operator.multiplicity(),
        }
    }
}

impl fmt::Display for ConditionField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConditionField {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let key: String = value
            .trim()
            .chars()
            .filter(|ch| !matches!(ch, '_' | ' ' | '-'))
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "amount" => Ok(Self::Amount),
            "vendor" => Ok(Self::Vendor),
            "customer" => Ok(Self::Customer),
            "inventoryitem" | "item" => Ok(Self::InventoryItem),
            "category" => Ok(Self::Category),
            _ => Err(DomainError::UnknownField { value: value.to_string() }),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "greater than")]
    GreaterThan,
    #[serde(rename = "greater than or equal to")]
    GreaterThanOrEqual,
    #[serde(rename = "less than")]
    LessThan,
    #[serde(rename = "less than or equal to")]
    LessThanOrEqual,
    #[serde(rename = "equal to")]
    EqualTo,
    #[serde(rename = "is")]
    Is,
    #[serde(rename = "is not")]
    IsNot,
    #[serde(rename = "is one of")]
    IsOneOf,
    #[serde(rename = "is not one of")]
    IsNotOneOf,
}

impl Operator {
    pub const ALL: [Operator; 9] = [
        Operator::GreaterThan,
        Operator::GreaterThanOrEqual,
        Operator::LessThan,
        Operator::LessThanOrEqual,
        Operator::EqualTo,
        Operator::Is,
        Operator::IsNot,
        Operator::IsOneOf,
        Operator::IsNotOneOf,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::GreaterThan => "greater than",
            Self::GreaterThanOrEqual => "greater than or equal to",
            Self::LessThan => "less than",
            Self::LessThanOrEqual => "less than or equal to",
            Self::EqualTo => "equal to",
            Self::Is => "is",
            Self::IsNot => "is not",
            Self::IsOneOf => "is one of",
            Self::IsNotOneOf => "is not one of",
        }
    }

    pub fn multiplicity(self) -> Multiplicity {
        match self {
            Self::IsOneOf | Self::IsNotOneOf => Multiplicity::Multi,
            _ => Multiplicity::Single,
        }
    }

    pub fn is_multi(self) -> bool {
        self.multiplicity() == Multiplicity::Multi
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = DomainError;

    /// Accepts both wire names (`is one of`) and constant-style names (`IS_ONE_OF`).
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let key = value.trim().replace(['_', '-'], " ").to_ascii_lowercase();
        let key = key.split_whitespace().collect::<Vec<_>>().join(" ");
        Self::ALL
            .into_iter()
            .find(|operator| operator.as_str() == key)
            .ok_or_else(|| DomainError::UnknownOperator { value: value.to_string() })
    }
}

/// Condition value, discriminated by the owning field's kind and the operator's multiplicity.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ConditionValue {
    #[default]
    Empty,
    Number(Decimal),
    Text(String),
    TextList(Vec<String>),
    Entity(EntityRef),
    EntityList(Vec<EntityRef>),
}

impl ConditionValue {
    /// The value a condition resets to when its field or operator is (re)selected.
    pub fn empty_for(field: Option<ConditionField>, operator: Option<Operator>) -> Self {
        let Some(field) = field else {
            return Self::Empty;
        };

        match (field.kind(), field.value_multiplicity(operator)) {
            (FieldKind::Entity, Multiplicity::Multi) => Self::EntityList(Vec::new()),
            (FieldKind::Text, Multiplicity::Multi) => Self::TextList(Vec::new()),
            _ => Self::Empty,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Number(_) => false,
            Self::Text(text) => text.trim().is_empty(),
            Self::TextList(items) => items.iter().all(|item| item.trim().is_empty()),
            Self::Entity(entity) => entity.id.trim().is_empty(),
            Self::EntityList(items) => items.iter().all(|item| item.id.trim().is_empty()),
        }
    }

    pub fn multiplicity(&self) -> Option<Multiplicity> {
        match self {
            Self::Empty => None,
            Self::Number(_) | Self::Text(_) | Self::Entity(_) => Some(Multiplicity::Single),
            Self::TextList(_) | Self::EntityList(_) => Some(Multiplicity::Multi),
        }
    }

    /// Whether the value's shape fits `field` with `operator` selected.
    pub fn fits(&self, field: ConditionField, operator: Option<Operator>) -> bool {
        let multiplicity = field.value_multiplicity(operator);
        match (field.kind(), self) {
            (_, Self::Empty) => multiplicity == Multiplicity::Single,
            (FieldKind::Numeric, Self::Number(_) | Self::Text(_)) => true,
            (FieldKind::Entity, Self::Entity(_)) | (FieldKind::Text, Self::Text(_)) => {
                multiplicity == Multiplicity::Single
            }
            (FieldKind::Entity, Self::EntityList(_)) | (FieldKind::Text, Self::TextList(_)) => {
                multiplicity == Multiplicity::Multi
            }
            _ => false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionDetail {
    pub id: ConditionId,
    pub field: Option<ConditionField>,
    pub operator: Option<Operator>,
    pub value: ConditionValue,
}

impl ConditionDetail {
    pub fn blank() -> Self {
        Self {
            id: ConditionId::generate(),
            field: None,
            operator: None,
            value: ConditionValue::Empty,
        }
    }

    pub fn new(field: ConditionField, operator: Operator, value: ConditionValue) -> Self {
        Self { id: ConditionId::generate(), field: Some(field), operator: Some(operator), value }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    #[serde(alias = "APPROVAL", alias = "Approval")]
    Approval,
    #[serde(alias = "NOTIFICATION", alias = "Notification")]
    Notification,
}

impl ActionType {
    pub fn label(self) -> &'static str {
        match self {
            Self::Approval => "Approval",
            Self::Notification => "Notification",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalMode {
    #[default]
    #[serde(alias = "ALL", alias = "All")]
    All,
    #[serde(alias = "ANY", alias = "Any")]
    Any,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionAction {
    pub id: ActionId,
    pub action_type: ActionType,
    pub mode: ApprovalMode,
    pub user_ids: Vec<String>,
    pub users: Vec<UserRef>,
}

impl ConditionAction {
    pub fn new(action_type: ActionType) -> Self {
        Self {
            id: ActionId::generate(),
            action_type,
            mode: ApprovalMode::All,
            user_ids: Vec::new(),
            users: Vec::new(),
        }
    }

    pub fn with_users(mut self, user_ids: Vec<String>) -> Self {
        self.user_ids = user_ids;
        self
    }

    pub fn with_mode(mut self, mode: ApprovalMode) -> Self {
        self.mode = mode;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RequirementFlag {
    RequireReceipt,
    RequireMemo,
    RequireScreenshots,
    RequireNetSuiteCustomerJob,
    RequireGpsCoordinates,
    BusinessPurpose,
    RequireBeforeAfterScreenshots,
}

impl RequirementFlag {
    pub const ALL: [RequirementFlag; 7] = [
        RequirementFlag::RequireReceipt,
        RequirementFlag::RequireMemo,
        RequirementFlag::RequireScreenshots,
        RequirementFlag::RequireNetSuiteCustomerJob,
        RequirementFlag::RequireGpsCoordinates,
        RequirementFlag::BusinessPurpose,
        RequirementFlag::RequireBeforeAfterScreenshots,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::RequireReceipt => "Receipt",
            Self::RequireMemo => "Memo",
            Self::RequireScreenshots => "Screenshots",
            Self::RequireNetSuiteCustomerJob => "NetSuite customer/job",
            Self::RequireGpsCoordinates => "GPS coordinates",
            Self::BusinessPurpose => "Business purpose",
            Self::RequireBeforeAfterScreenshots => "Before/after screenshots",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RequirementFlags {
    pub require_receipt: bool,
    pub require_memo: bool,
    pub require_screenshots: bool,
    pub require_net_suite_customer_job: bool,
    pub require_gps_coordinates: bool,
    pub business_purpose: bool,
    pub require_before_after_screenshots: bool,
}

impl RequirementFlags {
    pub fn get(&self, flag: RequirementFlag) -> bool {
        match flag {
            RequirementFlag::RequireReceipt => self.require_receipt,
            RequirementFlag::RequireMemo => self.require_memo,
            RequirementFlag::RequireScreenshots => self.require_screenshots,
            RequirementFlag::RequireNetSuiteCustomerJob => self.require_net_suite_customer_job,
            RequirementFlag::RequireGpsCoordinates => self.require_gps_coordinates,
            RequirementFlag::BusinessPurpose => self.business_purpose,
            RequirementFlag::RequireBeforeAfterScreenshots => {
                self.require_before_after_screenshots
            }
        }
    }

    pub fn set(&mut self, flag: RequirementFlag, enabled: bool) {
        let slot = match flag {
            RequirementFlag::RequireReceipt => &mut self.require_receipt,
            RequirementFlag::RequireMemo => &mut self.require_memo,
            RequirementFlag::RequireScreenshots => &mut self.require_screenshots,
            RequirementFlag::RequireNetSuiteCustomerJob => &mut self.require_net_suite_customer_job,
            RequirementFlag::RequireGpsCoordinates => &mut self.require_gps_coordinates,
            RequirementFlag::BusinessPurpose => &mut self.business_purpose,
            RequirementFlag::RequireBeforeAfterScreenshots => {
                &mut self.require_before_after_screenshots
            }
        };
        *slot = enabled;
    }

    pub fn enabled(&self) -> Vec<RequirementFlag> {
        RequirementFlag::ALL.into_iter().filter(|flag| self.get(*flag)).collect()
    }
}

/// One IF/THEN block: conditions are AND-ed, sibling groups are OR-ed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleGroup {
    pub id: GroupId,
    pub conditions: Vec<ConditionDetail>,
    pub actions: Vec<ConditionAction>,
    pub requirements: RequirementFlags,
}

impl RuleGroup {
    pub fn empty() -> Self {
        Self {
            id: GroupId::generate(),
            conditions: Vec::new(),
            actions: Vec::new(),
            requirements: RequirementFlags::default(),
        }
    }

    /// The shape the builder opens with: one blank condition and one approval step.
    pub fn blank() -> Self {
        Self {
            conditions: vec![ConditionDetail::blank()],
            actions: vec![ConditionAction::new(ActionType::Approval)],
            ..Self::empty()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRule {
    pub name: String,
    pub rules: Vec<RuleGroup>,
}

impl ApprovalRule {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), rules: vec![RuleGroup::blank()] }
    }
}
