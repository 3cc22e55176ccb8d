use serde::{Deserialize, Serialize};

pub const UNKNOWN_USER_NAME: &str = "Unknown User";

/// Lightweight by-value reference to a backend record (vendor, customer, inventory item).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub id: String,
    pub name: String,
}

impl EntityRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self { id: id.into(), name: name.into() }
    }

    /// A reference whose name is not known yet; the id stands in for the label.
    pub fn placeholder(id: impl Into<String>) -> Self {
        let id = id.into();
        Self { name: id.clone(), id }
    }

    pub fn has_resolved_name(&self) -> bool {
        let name = self.name.trim();
        !name.is_empty() && name != self.id
    }

    pub(crate) fn canonical(&self) -> Self {
        let id = self.id.trim().to_string();
        let name = self.name.trim();
        if name.is_empty() {
            return Self::placeholder(id);
        }
        Self { id, name: name.to_string() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserRef {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

impl UserRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self { id: id.into(), name: name.into() }
    }

    pub fn unknown(id: impl Into<String>) -> Self {
        Self { id: id.into(), name: UNKNOWN_USER_NAME.to_string() }
    }

    pub fn is_unknown(&self) -> bool {
        self.name == UNKNOWN_USER_NAME
    }
}

#[cfg(test)]
mod tests {
    use super::{EntityRef, UserRef};

    #[test]
    fn placeholder_uses_id_as_name() {
        let entity = EntityRef::placeholder("v-100");
        assert_eq!(entity.name, "v-100");
        assert!(!entity.has_resolved_name());
    }

    #[test]
    fn canonical_fills_blank_name_and_trims() {
        let entity = EntityRef::new(" v-1 ", "  ").canonical();
        assert_eq!(entity, EntityRef::new("v-1", "v-1"));

        let named = EntityRef::new("v-2", " Acme Supply ").canonical();
        assert_eq!(named.name, "Acme Supply");
        assert!(named.has_resolved_name());
    }

    #[test]
    fn unknown_user_is_flagged() {
        assert!(UserRef::unknown("u-9").is_unknown());
        assert!(!UserRef::new("u-1", "Dana Ortiz").is_unknown());
    }
}
