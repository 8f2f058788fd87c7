use serde::{Deserialize, Serialize};

/// Store-assigned contact identifier.
///
/// The relational store hands out its serial key; the session store uses the
/// contact's current position in the session list.
pub type ContactId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: ContactId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub category: String,
}

impl Contact {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn fields(&self) -> ContactInput {
        ContactInput {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            category: self.category.clone(),
        }
    }
}

/// The five contact fields as submitted by the new/edit forms.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInput {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub category: String,
}

impl ContactInput {
    /// Persisted form of the fields: names trimmed, phone hyphens turned into spaces.
    pub fn normalized(&self) -> Self {
        Self {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: self.email.clone(),
            phone: self.phone.replace('-', " "),
            category: self.category.clone(),
        }
    }

    pub(crate) fn into_contact(self, id: ContactId) -> Contact {
        Contact {
            id,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            phone: self.phone,
            category: self.category,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ContactInput;

    #[test]
    fn normalized_trims_names_and_spaces_out_phone_hyphens() {
        let input = ContactInput {
            first_name: "  Jo ".to_string(),
            last_name: "Lee\t".to_string(),
            email: "jo@lee.com".to_string(),
            phone: "555-123-4567".to_string(),
            category: "work".to_string(),
        };

        let normalized = input.normalized();
        assert_eq!(normalized.first_name, "Jo");
        assert_eq!(normalized.last_name, "Lee");
        assert_eq!(normalized.email, "jo@lee.com");
        assert_eq!(normalized.phone, "555 123 4567");
        assert_eq!(normalized.category, "work");
    }

    #[test]
    fn into_contact_keeps_fields_and_assigns_id() {
        let contact = ContactInput {
            first_name: "Ada".to_string(),
            last_name: "King".to_string(),
            email: "ada@king.org".to_string(),
            phone: "5550001111".to_string(),
            category: String::new(),
        }
        .into_contact(7);

        assert_eq!(contact.id, 7);
        assert_eq!(contact.full_name(), "Ada King");
        assert_eq!(contact.fields().phone, "5550001111");
    }
}
