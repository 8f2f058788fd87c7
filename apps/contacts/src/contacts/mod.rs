pub mod filter;
pub mod store;
pub mod types;
pub mod validation;

pub use filter::{CLEAR_SENTINEL, CategoryFilter};
pub use store::{ContactBackend, ContactStore, ContactStoreError};
pub use types::{Contact, ContactId, ContactInput};
pub use validation::ValidationError;
