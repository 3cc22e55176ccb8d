use crate::domain::rule::{ConditionDetail, ConditionField, ConditionValue, Operator};
use crate::rules::normalize::reshape_value;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OperatorChangeError {
    FieldNotSelected,
    Incompatible { field: ConditionField, operator: Operator },
}

/// Selecting a field always clears the operator and resets the value to the field's
/// empty shape.
pub fn change_field(condition: &ConditionDetail, field: ConditionField) -> ConditionDetail {
    ConditionDetail {
        id: condition.id.clone(),
        field: Some(field),
        operator: None,
        value: ConditionValue::empty_for(Some(field), None),
    }
}

/// Selecting an operator keeps the value, converting it when the operator's multiplicity
/// differs from the current shape. Multi to single keeps only the first element.
pub fn change_operator(
    condition: &ConditionDetail,
    operator: Operator,
) -> Result<ConditionDetail, OperatorChangeError> {
    let field = condition.field.ok_or(OperatorChangeError::FieldNotSelected)?;
    if !field.supports(operator) {
        return Err(OperatorChangeError::Incompatible { field, operator });
    }

    Ok(ConditionDetail {
        id: condition.id.clone(),
        field: Some(field),
        operator: Some(operator),
        value: reshape_value(field, Some(operator), &condition.value),
    })
}

pub fn clear_field(condition: &ConditionDetail) -> ConditionDetail {
    ConditionDetail {
        id: condition.id.clone(),
        field: None,
        operator: None,
        value: ConditionValue::Empty,
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{change_field, change_operator, OperatorChangeError};
    use crate::domain::entity::EntityRef;
    use crate::domain::rule::{ConditionDetail, ConditionField, ConditionValue, Operator};

    fn vendor_condition(operator: Operator, value: ConditionValue) -> ConditionDetail {
        ConditionDetail::new(ConditionField::Vendor, operator, value)
    }

    #[test]
    fn field_change_clears_operator_and_resets_entity_value_to_list() {
        let condition = ConditionDetail::new(
            ConditionField::Amount,
            Operator::GreaterThan,
            ConditionValue::Number(Decimal::new(1000, 0)),
        );

        let changed = change_field(&condition, ConditionField::Vendor);
        assert_eq!(changed.id, condition.id);
        assert_eq!(changed.operator, None);
        assert_eq!(changed.value, ConditionValue::EntityList(Vec::new()));
    }

    #[test]
    fn field_change_to_scalar_field_resets_to_empty() {
        let condition = vendor_condition(
            Operator::IsOneOf,
            ConditionValue::EntityList(vec![EntityRef::new("v-1", "Acme")]),
        );

        for field in [ConditionField::Amount, ConditionField::Category] {
            let changed = change_field(&condition, field);
            assert_eq!(changed.operator, None);
            assert_eq!(changed.value, ConditionValue::Empty);
        }
    }

    #[test]
    fn single_to_multi_wraps_existing_value() {
        let acme = EntityRef::new("v-1", "Acme");
        let condition = vendor_condition(Operator::Is, ConditionValue::Entity(acme.clone()));

        let changed = change_operator(&condition, Operator::IsOneOf).expect("compatible operator");
        assert_eq!(changed.value, ConditionValue::EntityList(vec![acme]));
    }

    #[test]
    fn multi_to_single_keeps_first_element() {
        let condition = vendor_condition(
            Operator::IsOneOf,
            ConditionValue::EntityList(vec![
                EntityRef::new("v-1", "Acme"),
                EntityRef::new("v-2", "Globex"),
            ]),
        );

        let changed = change_operator(&condition, Operator::IsNot).expect("compatible operator");
        assert_eq!(changed.value, ConditionValue::Entity(EntityRef::new("v-1", "Acme")));
    }

    #[test]
    fn same_multiplicity_keeps_value_untouched() {
        let value = ConditionValue::EntityList(vec![
            EntityRef::new("v-1", "Acme"),
            EntityRef::new("v-2", "Globex"),
        ]);
        let condition = vendor_condition(Operator::IsOneOf, value.clone());

        let changed =
            change_operator(&condition, Operator::IsNotOneOf).expect("compatible operator");
        assert_eq!(changed.value, value);
    }

    #[test]
    fn text_values_unwrap_to_plain_first_element() {
        let condition = ConditionDetail::new(
            ConditionField::Category,
            Operator::IsOneOf,
            ConditionValue::TextList(vec!["travel".to_string(), "meals".to_string()]),
        );

        let changed = change_operator(&condition, Operator::Is).expect("compatible operator");
        assert_eq!(changed.value, ConditionValue::Text("travel".to_string()));
    }

    #[test]
    fn incompatible_operator_is_rejected() {
        let condition = vendor_condition(Operator::Is, ConditionValue::Empty);
        assert_eq!(
            change_operator(&condition, Operator::GreaterThan),
            Err(OperatorChangeError::Incompatible {
                field: ConditionField::Vendor,
                operator: Operator::GreaterThan,
            })
        );

        assert_eq!(
            change_operator(&ConditionDetail::blank(), Operator::Is),
            Err(OperatorChangeError::FieldNotSelected)
        );
    }
}
