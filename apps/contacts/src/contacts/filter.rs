use crate::contacts::types::Contact;

/// Category value meaning "show everything". Distinct from no selection.
pub const CLEAR_SENTINEL: &str = "clear";

/// The session's selected category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryFilter {
    selected: Option<String>,
}

impl CategoryFilter {
    pub fn set(&mut self, category: impl Into<String>) {
        self.selected = Some(category.into());
    }

    pub fn get(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn clear(&mut self) {
        self.selected = None;
    }

    /// Keeps contacts in the selected category.
    ///
    /// With no selection, or with the `clear` sentinel selected, every contact
    /// is returned. Seeing the sentinel also drops the selection.
    pub fn apply(&mut self, contacts: Vec<Contact>) -> Vec<Contact> {
        if self.is_checked(CLEAR_SENTINEL) {
            self.clear();
            return contacts;
        }

        match &self.selected {
            Some(category) => contacts
                .into_iter()
                .filter(|contact| &contact.category == category)
                .collect(),
            None => contacts,
        }
    }

    pub fn is_checked(&self, value: &str) -> bool {
        self.selected.as_deref() == Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::{CLEAR_SENTINEL, CategoryFilter};
    use crate::contacts::types::Contact;

    fn contact(id: i64, category: &str) -> Contact {
        Contact {
            id,
            first_name: "Jo".to_string(),
            last_name: "Lee".to_string(),
            email: "jo@lee.com".to_string(),
            phone: "5551234567".to_string(),
            category: category.to_string(),
        }
    }

    fn sample() -> Vec<Contact> {
        vec![contact(0, "work"), contact(1, "family"), contact(2, "work")]
    }

    #[test]
    fn unset_filter_returns_everything() {
        let mut filter = CategoryFilter::default();
        assert_eq!(filter.get(), None);
        assert_eq!(filter.apply(sample()).len(), 3);
    }

    #[test]
    fn selected_category_keeps_matching_contacts() {
        let mut filter = CategoryFilter::default();
        filter.set("work");

        let ids: Vec<i64> = filter.apply(sample()).iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![0, 2]);
        assert_eq!(filter.get(), Some("work"));
        assert!(filter.is_checked("work"));
        assert!(!filter.is_checked("family"));
    }

    #[test]
    fn unknown_category_yields_nothing() {
        let mut filter = CategoryFilter::default();
        filter.set("golf");
        assert!(filter.apply(sample()).is_empty());
    }

    #[test]
    fn sentinel_is_stored_then_cleared_on_apply() {
        let mut filter = CategoryFilter::default();
        filter.set(CLEAR_SENTINEL);
        assert_eq!(filter.get(), Some(CLEAR_SENTINEL));

        assert_eq!(filter.apply(sample()).len(), 3);
        assert_eq!(filter.get(), None);

        assert_eq!(filter.apply(sample()).len(), 3);
        assert_eq!(filter.get(), None);
    }

    #[test]
    fn clear_removes_selection() {
        let mut filter = CategoryFilter::default();
        filter.set("family");
        filter.clear();
        assert_eq!(filter.get(), None);
        assert_eq!(filter.apply(sample()).len(), 3);
    }
}
