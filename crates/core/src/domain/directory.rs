use serde::{Deserialize, Serialize};

use crate::domain::entity::{EntityRef, UserRef};
use crate::domain::rule::ConditionField;

/// Known users and entities used to resolve ids into labels. Snapshot of backend
/// lookups taken when the builder opens; never mutated by rule edits.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Directory {
    pub users: Vec<UserRef>,
    pub vendors: Vec<EntityRef>,
    pub customers: Vec<EntityRef>,
    pub inventory_items: Vec<EntityRef>,
}

impl Directory {
    pub fn user(&self, user_id: &str) -> Option<&UserRef> {
        let user_id = user_id.trim();
        self.users.iter().find(|user| user.id == user_id)
    }

    pub fn user_name(&self, user_id: &str) -> Option<&str> {
        self.user(user_id).map(|user| user.name.as_str()).filter(|name| !name.trim().is_empty())
    }

    pub fn entities(&self, field: ConditionField) -> &[EntityRef] {
        match field {
            ConditionField::Vendor => &self.vendors,
            ConditionField::Customer => &self.customers,
            ConditionField::InventoryItem => &self.inventory_items,
            ConditionField::Amount | ConditionField::Category => &[],
        }
    }

    pub fn entity_name(&self, field: ConditionField, entity_id: &str) -> Option<&str> {
        let entity_id = entity_id.trim();
        self.entities(field)
            .iter()
            .find(|entity| entity.id == entity_id)
            .map(|entity| entity.name.as_str())
            .filter(|name| !name.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::Directory;
    use crate::domain::entity::{EntityRef, UserRef};
    use crate::domain::rule::ConditionField;

    #[test]
    fn lookups_are_scoped_by_field() {
        let directory = Directory {
            users: vec![UserRef::new("u-1", "Dana Ortiz")],
            vendors: vec![EntityRef::new("e-1", "Acme Supply")],
            customers: vec![EntityRef::new("e-1", "Northwind")],
            inventory_items: Vec::new(),
        };

        assert_eq!(directory.user_name(" u-1 "), Some("Dana Ortiz"));
        assert_eq!(directory.entity_name(ConditionField::Vendor, "e-1"), Some("Acme Supply"));
        assert_eq!(directory.entity_name(ConditionField::Customer, "e-1"), Some("Northwind"));
        assert_eq!(directory.entity_name(ConditionField::InventoryItem, "e-1"), None);
        assert_eq!(directory.entity_name(ConditionField::Amount, "e-1"), None);
    }

    #[test]
    fn directory_document_uses_camel_case_keys() {
        let directory: Directory = serde_json::from_str(
            r#"{"users":[{"id":"u-1","name":"Dana"}],"inventoryItems":[{"id":"i-1","name":"Drill"}]}"#,
        )
        .expect("directory should parse");

        assert_eq!(directory.entity_name(ConditionField::InventoryItem, "i-1"), Some("Drill"));
        assert!(directory.vendors.is_empty());
    }
}
