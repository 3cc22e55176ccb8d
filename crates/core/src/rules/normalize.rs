use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::{Map, Value};

use crate::domain::directory::Directory;
use crate::domain::entity::EntityRef;
use crate::domain::rule::{ConditionField, ConditionValue, FieldKind, Multiplicity, Operator};

const ID_KEYS: [&str; 3] = ["id", "value", "_id"];
const NAME_KEYS: [&str; 3] = ["name", "label", "displayName"];

/// Normalizes a raw UI value (string, `{id,name}` / `{value,label}` object, or arrays
/// of those) into the shape `field` and `operator` call for.
pub fn normalize_value(
    field: ConditionField,
    operator: Option<Operator>,
    raw: &Value,
) -> ConditionValue {
    reshape_value(field, operator, &loose_value(raw))
}

/// Coerces an existing value into the shape `field` and `operator` call for. Applying it to
/// a value that already fits returns the value unchanged.
pub fn reshape_value(
    field: ConditionField,
    operator: Option<Operator>,
    value: &ConditionValue,
) -> ConditionValue {
    let multiplicity = field.value_multiplicity(operator);
    match field.kind() {
        FieldKind::Entity => shape_entities(entities_of(value), multiplicity),
        FieldKind::Text => shape_texts(texts_of(value), multiplicity),
        FieldKind::Numeric => numeric_of(value),
    }
}

/// Converts between single and multi shapes: single values are wrapped into a one-element
/// list, lists are truncated to their first element.
pub fn convert_multiplicity(value: &ConditionValue, target: Multiplicity) -> ConditionValue {
    match (value, target) {
        (ConditionValue::Entity(entity), Multiplicity::Multi) => {
            ConditionValue::EntityList(vec![entity.clone()])
        }
        (ConditionValue::Text(text), Multiplicity::Multi) => {
            if text.trim().is_empty() {
                ConditionValue::TextList(Vec::new())
            } else {
                ConditionValue::TextList(vec![text.clone()])
            }
        }
        (ConditionValue::EntityList(items), Multiplicity::Single) => {
            items.first().cloned().map(ConditionValue::Entity).unwrap_or_default()
        }
        (ConditionValue::TextList(items), Multiplicity::Single) => {
            items.first().cloned().map(ConditionValue::Text).unwrap_or_default()
        }
        _ => value.clone(),
    }
}

/// Fills placeholder entity names from the directory; names already resolved are kept.
pub fn hydrate_entity_names(
    field: ConditionField,
    value: &ConditionValue,
    directory: &Directory,
) -> ConditionValue {
    let hydrate = |entity: &EntityRef| {
        if entity.has_resolved_name() {
            return entity.clone();
        }
        match directory.entity_name(field, &entity.id) {
            Some(name) => EntityRef::new(entity.id.clone(), name),
            None => entity.clone(),
        }
    };

    match value {
        ConditionValue::Entity(entity) => ConditionValue::Entity(hydrate(entity)),
        ConditionValue::EntityList(items) => {
            ConditionValue::EntityList(items.iter().map(hydrate).collect())
        }
        other => other.clone(),
    }
}

fn loose_value(raw: &Value) -> ConditionValue {
    match raw {
        Value::Null => ConditionValue::Empty,
        Value::Bool(flag) => ConditionValue::Text(flag.to_string()),
        Value::Number(number) => decimal_from_json(number)
            .map(ConditionValue::Number)
            .unwrap_or_else(|| ConditionValue::Text(number.to_string())),
        Value::String(text) => ConditionValue::Text(text.clone()),
        Value::Object(map) => {
            entity_from_object(map).map(ConditionValue::Entity).unwrap_or_default()
        }
        Value::Array(items) => {
            if items.iter().any(Value::is_object) {
                ConditionValue::EntityList(items.iter().filter_map(entity_from_item).collect())
            } else {
                ConditionValue::TextList(items.iter().filter_map(scalar_text).collect())
            }
        }
    }
}

fn entity_from_item(item: &Value) -> Option<EntityRef> {
    match item {
        Value::Object(map) => entity_from_object(map),
        other => scalar_text(other).map(EntityRef::placeholder),
    }
}

fn entity_from_object(map: &Map<String, Value>) -> Option<EntityRef> {
    let id = ID_KEYS.iter().find_map(|key| map.get(*key).and_then(scalar_text))?;
    let name = NAME_KEYS
        .iter()
        .find_map(|key| map.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| id.clone());
    Some(EntityRef { id, name })
}

fn scalar_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(text) => text.trim().to_string(),
        Value::Number(number) => number.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn entities_of(value: &ConditionValue) -> Vec<EntityRef> {
    match value {
        ConditionValue::Empty => Vec::new(),
        ConditionValue::Number(number) => {
            vec![EntityRef::placeholder(number.normalize().to_string())]
        }
        ConditionValue::Text(text) => {
            non_blank(text).map(EntityRef::placeholder).into_iter().collect()
        }
        ConditionValue::TextList(items) => {
            items.iter().filter_map(|item| non_blank(item)).map(EntityRef::placeholder).collect()
        }
        ConditionValue::Entity(entity) => vec![entity.canonical()],
        ConditionValue::EntityList(items) => items.iter().map(EntityRef::canonical).collect(),
    }
}

fn texts_of(value: &ConditionValue) -> Vec<String> {
    match value {
        ConditionValue::Empty => Vec::new(),
        ConditionValue::Number(number) => vec![number.normalize().to_string()],
        ConditionValue::Text(text) => non_blank(text).into_iter().collect(),
        ConditionValue::TextList(items) => {
            items.iter().filter_map(|item| non_blank(item)).collect()
        }
        ConditionValue::Entity(entity) => non_blank(&entity.id).into_iter().collect(),
        ConditionValue::EntityList(items) => {
            items.iter().filter_map(|item| non_blank(&item.id)).collect()
        }
    }
}

fn numeric_of(value: &ConditionValue) -> ConditionValue {
    let text = match value {
        ConditionValue::Number(number) => return ConditionValue::Number(*number),
        ConditionValue::Empty => return ConditionValue::Empty,
        ConditionValue::Text(text) => text.clone(),
        ConditionValue::TextList(items) => items.first().cloned().unwrap_or_default(),
        ConditionValue::Entity(entity) => entity.id.clone(),
        ConditionValue::EntityList(items) => {
            items.first().map(|item| item.id.clone()).unwrap_or_default()
        }
    };

    let Some(text) = non_blank(&text) else {
        return ConditionValue::Empty;
    };
    // Unparsable input stays as text so validation can point at it.
    parse_decimal(&text.replace(',', ""))
        .map(ConditionValue::Number)
        .unwrap_or(ConditionValue::Text(text))
}

fn shape_entities(entities: Vec<EntityRef>, multiplicity: Multiplicity) -> ConditionValue {
    // Colliding ids keep the first position but prefer a resolved name.
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut unique: Vec<EntityRef> = Vec::new();
    for entity in entities.into_iter().filter(|entity| !entity.id.is_empty()) {
        match positions.get(&entity.id) {
            Some(&index) => {
                if !unique[index].has_resolved_name() && entity.has_resolved_name() {
                    unique[index] = entity;
                }
            }
            None => {
                positions.insert(entity.id.clone(), unique.len());
                unique.push(entity);
            }
        }
    }
    let entities = unique;

    match multiplicity {
        Multiplicity::Multi => ConditionValue::EntityList(entities),
        Multiplicity::Single => convert_multiplicity(
            &ConditionValue::EntityList(entities),
            Multiplicity::Single,
        ),
    }
}

fn shape_texts(texts: Vec<String>, multiplicity: Multiplicity) -> ConditionValue {
    let mut seen = HashSet::new();
    let texts: Vec<String> = texts.into_iter().filter(|text| seen.insert(text.clone())).collect();

    match multiplicity {
        Multiplicity::Multi => ConditionValue::TextList(texts),
        Multiplicity::Single => {
            convert_multiplicity(&ConditionValue::TextList(texts), Multiplicity::Single)
        }
    }
}

fn non_blank(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

pub(crate) fn decimal_from_json(number: &serde_json::Number) -> Option<Decimal> {
    if let Some(value) = number.as_i64() {
        return Some(Decimal::from(value));
    }
    if let Some(value) = number.as_u64() {
        return Some(Decimal::from(value));
    }
    parse_decimal(&number.to_string())
}

fn parse_decimal(text: &str) -> Option<Decimal> {
    Decimal::from_str(text).ok().or_else(|| Decimal::from_scientific(text).ok())
}
