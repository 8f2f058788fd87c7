use std::sync::Arc;

use async_trait::async_trait;
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

use crate::contacts::types::{Contact, ContactId, ContactInput};
use crate::db::ContactsDb;
use crate::session::SessionHandle;

#[derive(Debug, thiserror::Error)]
pub enum ContactStoreError {
    #[error("db error: {0}")]
    Db(String),
}

/// Storage for contacts. Both backends return the same `Contact` shape, so
/// handlers never care which one is active.
#[async_trait]
pub trait ContactStore: Send + Sync {
    /// Every contact, in insertion order.
    async fn all_contacts(&self) -> Result<Vec<Contact>, ContactStoreError>;

    async fn single_contact(&self, id: ContactId) -> Result<Option<Contact>, ContactStoreError>;

    async fn add_contact(&self, input: ContactInput) -> Result<ContactId, ContactStoreError>;

    /// Replaces all five fields. `Ok(false)` when `id` does not exist.
    async fn update_single_contact(
        &self,
        id: ContactId,
        input: ContactInput,
    ) -> Result<bool, ContactStoreError>;

    /// `Ok(false)` when `id` does not exist.
    async fn delete_contact(&self, id: ContactId) -> Result<bool, ContactStoreError>;
}

pub fn session(handle: SessionHandle) -> Arc<dyn ContactStore> {
    Arc::new(SessionContactStore { session: handle })
}

pub async fn postgres(db: Arc<ContactsDb>) -> Result<Arc<PostgresContactStore>, ContactStoreError> {
    let store = PostgresContactStore { db };
    store.ensure_schema().await?;
    Ok(Arc::new(store))
}

/// Backend picked once at startup.
#[derive(Clone)]
pub enum ContactBackend {
    Session,
    Postgres(Arc<PostgresContactStore>),
}

impl ContactBackend {
    /// The store a request in `session` should read and write.
    pub fn store_for(&self, session: &SessionHandle) -> Arc<dyn ContactStore> {
        match self {
            Self::Session => self::session(session.clone()),
            Self::Postgres(store) => store.clone(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Session => "session",
            Self::Postgres(_) => "postgres",
        }
    }

    /// False once the postgres connection has dropped. The session store is
    /// always available.
    pub async fn is_available(&self) -> bool {
        match self {
            Self::Session => true,
            Self::Postgres(store) => !store.is_disconnected().await,
        }
    }
}

/// Contacts kept in the browser session, addressed by list position.
///
/// Deleting position `k` renumbers every later contact down by one.
struct SessionContactStore {
    session: SessionHandle,
}

fn position(id: ContactId) -> Option<usize> {
    usize::try_from(id).ok()
}

fn contact_id(index: usize) -> ContactId {
    ContactId::try_from(index).unwrap_or(ContactId::MAX)
}

#[async_trait]
impl ContactStore for SessionContactStore {
    async fn all_contacts(&self) -> Result<Vec<Contact>, ContactStoreError> {
        let session = self.session.lock().await;
        Ok(session
            .contacts
            .iter()
            .enumerate()
            .map(|(index, input)| input.clone().into_contact(contact_id(index)))
            .collect())
    }

    async fn single_contact(&self, id: ContactId) -> Result<Option<Contact>, ContactStoreError> {
        let session = self.session.lock().await;
        Ok(position(id)
            .and_then(|index| session.contacts.get(index))
            .map(|input| input.clone().into_contact(id)))
    }

    async fn add_contact(&self, input: ContactInput) -> Result<ContactId, ContactStoreError> {
        let mut session = self.session.lock().await;
        session.contacts.push(input);
        Ok(contact_id(session.contacts.len() - 1))
    }

    async fn update_single_contact(
        &self,
        id: ContactId,
        input: ContactInput,
    ) -> Result<bool, ContactStoreError> {
        let mut session = self.session.lock().await;
        let Some(slot) = position(id).and_then(|index| session.contacts.get_mut(index)) else {
            return Ok(false);
        };
        *slot = input;
        Ok(true)
    }

    async fn delete_contact(&self, id: ContactId) -> Result<bool, ContactStoreError> {
        let mut session = self.session.lock().await;
        match position(id) {
            Some(index) if index < session.contacts.len() => {
                session.contacts.remove(index);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

const SELECT_ALL_SQL: &str =
    "SELECT id, first_name, last_name, email, phone, category FROM contacts ORDER BY id";
const SELECT_ONE_SQL: &str =
    "SELECT id, first_name, last_name, email, phone, category FROM contacts WHERE id = $1";
const INSERT_SQL: &str = "INSERT INTO contacts (first_name, last_name, email, phone, category) VALUES ($1, $2, $3, $4, $5) RETURNING id";
const UPDATE_SQL: &str = "UPDATE contacts SET first_name = $1, last_name = $2, email = $3, phone = $4, category = $5 WHERE id = $6";
const DELETE_SQL: &str = "DELETE FROM contacts WHERE id = $1";

/// Contacts in the postgres `contacts` table, keyed by its serial id.
pub struct PostgresContactStore {
    db: Arc<ContactsDb>,
}

impl PostgresContactStore {
    async fn ensure_schema(&self) -> Result<(), ContactStoreError> {
        if self.db.ensure_contacts_table().await.map_err(db_error)? {
            tracing::info!(target_db = %self.db.target(), "contacts table created");
        }
        Ok(())
    }

    /// Whether the shared connection has dropped.
    pub async fn is_disconnected(&self) -> bool {
        self.db.is_closed().await
    }
}

fn log_query(statement: &str, params: &[&(dyn ToSql + Sync)]) {
    tracing::info!(statement = %statement.trim(), params = ?params, "contacts query");
}

fn db_error(error: tokio_postgres::Error) -> ContactStoreError {
    ContactStoreError::Db(error.to_string())
}

/// Ids that do not fit the `serial` column cannot name a row.
fn row_key(id: ContactId) -> Option<i32> {
    i32::try_from(id).ok()
}

fn stored_category(category: &str) -> Option<&str> {
    if category.is_empty() {
        None
    } else {
        Some(category)
    }
}

fn map_contact_row(row: &Row) -> Result<Contact, ContactStoreError> {
    let id: i32 = row.try_get("id").map_err(db_error)?;
    let category: Option<String> = row.try_get("category").map_err(db_error)?;
    Ok(Contact {
        id: ContactId::from(id),
        first_name: row.try_get("first_name").map_err(db_error)?,
        last_name: row.try_get("last_name").map_err(db_error)?,
        email: row.try_get("email").map_err(db_error)?,
        phone: row.try_get("phone").map_err(db_error)?,
        category: category.unwrap_or_default(),
    })
}

#[async_trait]
impl ContactStore for PostgresContactStore {
    async fn all_contacts(&self) -> Result<Vec<Contact>, ContactStoreError> {
        let client = self.db.client();
        let client = client.lock().await;

        log_query(SELECT_ALL_SQL, &[]);
        let rows = client.query(SELECT_ALL_SQL, &[]).await.map_err(db_error)?;
        rows.iter().map(map_contact_row).collect()
    }

    async fn single_contact(&self, id: ContactId) -> Result<Option<Contact>, ContactStoreError> {
        let Some(key) = row_key(id) else {
            return Ok(None);
        };
        let client = self.db.client();
        let client = client.lock().await;

        let params: [&(dyn ToSql + Sync); 1] = [&key];
        log_query(SELECT_ONE_SQL, &params);
        let row = client
            .query_opt(SELECT_ONE_SQL, &params)
            .await
            .map_err(db_error)?;
        row.as_ref().map(map_contact_row).transpose()
    }

    async fn add_contact(&self, input: ContactInput) -> Result<ContactId, ContactStoreError> {
        let client = self.db.client();
        let client = client.lock().await;

        let category = stored_category(&input.category);
        let params: [&(dyn ToSql + Sync); 5] = [
            &input.first_name,
            &input.last_name,
            &input.email,
            &input.phone,
            &category,
        ];
        log_query(INSERT_SQL, &params);
        let row = client
            .query_one(INSERT_SQL, &params)
            .await
            .map_err(db_error)?;
        let id: i32 = row.try_get("id").map_err(db_error)?;
        Ok(ContactId::from(id))
    }

    async fn update_single_contact(
        &self,
        id: ContactId,
        input: ContactInput,
    ) -> Result<bool, ContactStoreError> {
        let Some(key) = row_key(id) else {
            return Ok(false);
        };
        let client = self.db.client();
        let client = client.lock().await;

        let category = stored_category(&input.category);
        let params: [&(dyn ToSql + Sync); 6] = [
            &input.first_name,
            &input.last_name,
            &input.email,
            &input.phone,
            &category,
            &key,
        ];
        log_query(UPDATE_SQL, &params);
        let updated = client
            .execute(UPDATE_SQL, &params)
            .await
            .map_err(db_error)?;
        Ok(updated > 0)
    }

    async fn delete_contact(&self, id: ContactId) -> Result<bool, ContactStoreError> {
        let Some(key) = row_key(id) else {
            return Ok(false);
        };
        let client = self.db.client();
        let client = client.lock().await;

        let params: [&(dyn ToSql + Sync); 1] = [&key];
        log_query(DELETE_SQL, &params);
        let deleted = client
            .execute(DELETE_SQL, &params)
            .await
            .map_err(db_error)?;
        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use anyhow::Result;

    use super::{ContactBackend, ContactStore, postgres, session};
    use crate::contacts::types::ContactInput;
    use crate::db::ContactsDb;
    use crate::session::SessionHandle;

    fn input(first_name: &str, category: &str) -> ContactInput {
        ContactInput {
            first_name: first_name.to_string(),
            last_name: "Lee".to_string(),
            email: format!("{}@lee.com", first_name.to_lowercase()),
            phone: "555 123 4567".to_string(),
            category: category.to_string(),
        }
    }

    #[tokio::test]
    async fn session_store_round_trips_added_contact() -> Result<()> {
        let store = session(SessionHandle::default());
        let id = store.add_contact(input("Jo", "work")).await?;
        assert_eq!(id, 0);

        let contact = store.single_contact(id).await?;
        let contact = contact.ok_or_else(|| anyhow::anyhow!("contact missing"))?;
        assert_eq!(contact.fields(), input("Jo", "work"));
        assert_eq!(contact.id, 0);
        Ok(())
    }

    #[tokio::test]
    async fn session_store_keeps_insertion_order() -> Result<()> {
        let store = session(SessionHandle::default());
        for name in ["Ann", "Bob", "Cy"] {
            store.add_contact(input(name, "")).await?;
        }

        let contacts = store.all_contacts().await?;
        let names: Vec<&str> = contacts.iter().map(|c| c.first_name.as_str()).collect();
        let ids: Vec<i64> = contacts.iter().map(|c| c.id).collect();
        assert_eq!(names, vec!["Ann", "Bob", "Cy"]);
        assert_eq!(ids, vec![0, 1, 2]);
        Ok(())
    }

    #[tokio::test]
    async fn session_store_delete_shifts_later_ids_down() -> Result<()> {
        let store = session(SessionHandle::default());
        for name in ["Ann", "Bob", "Cy"] {
            store.add_contact(input(name, "")).await?;
        }

        assert!(store.delete_contact(1).await?);
        let shifted = store.single_contact(1).await?;
        assert_eq!(shifted.map(|c| c.first_name), Some("Cy".to_string()));
        assert_eq!(store.single_contact(2).await?, None);
        assert_eq!(store.all_contacts().await?.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn session_store_out_of_range_ids_are_absent() -> Result<()> {
        let store = session(SessionHandle::default());
        store.add_contact(input("Ann", "")).await?;

        assert_eq!(store.single_contact(5).await?, None);
        assert_eq!(store.single_contact(-1).await?, None);
        assert!(!store.update_single_contact(5, input("Bob", "")).await?);
        assert!(!store.delete_contact(-1).await?);
        assert!(!store.delete_contact(1).await?);
        assert_eq!(store.all_contacts().await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn session_store_update_replaces_every_field() -> Result<()> {
        let store = session(SessionHandle::default());
        let id = store.add_contact(input("Ann", "work")).await?;

        let replacement = input("Bea", "family");
        assert!(store.update_single_contact(id, replacement.clone()).await?);
        let stored = store.single_contact(id).await?.map(|c| c.fields());
        assert_eq!(stored, Some(replacement));
        Ok(())
    }

    #[tokio::test]
    async fn session_backend_scopes_contacts_to_each_session() -> Result<()> {
        let backend = ContactBackend::Session;
        let alice = SessionHandle::default();
        let bob = SessionHandle::default();

        backend.store_for(&alice).add_contact(input("Ann", "")).await?;

        assert_eq!(backend.store_for(&alice).all_contacts().await?.len(), 1);
        assert!(backend.store_for(&bob).all_contacts().await?.is_empty());
        assert_eq!(backend.as_str(), "session");
        assert!(backend.is_available().await);
        Ok(())
    }

    // Needs a scratch database; skipped unless CONTACTS_TEST_DATABASE_URL is set.
    #[tokio::test]
    async fn postgres_store_round_trip() -> Result<()> {
        let Ok(url) = std::env::var("CONTACTS_TEST_DATABASE_URL") else {
            return Ok(());
        };
        let db = Arc::new(ContactsDb::connect(&url).await?);
        let store = postgres(db.clone()).await?;
        // Bootstrap again to confirm it is idempotent.
        postgres(db).await?;
        assert!(ContactBackend::Postgres(store.clone()).is_available().await);

        let id = store.add_contact(input("Jo", "")).await?;
        let stored = store.single_contact(id).await?.map(|c| c.fields());
        assert_eq!(stored, Some(input("Jo", "")));

        assert!(store.update_single_contact(id, input("Kim", "work")).await?);
        let updated = store.single_contact(id).await?;
        assert_eq!(updated.map(|c| c.category), Some("work".to_string()));

        let ids: Vec<i64> = store.all_contacts().await?.iter().map(|c| c.id).collect();
        assert!(ids.contains(&id));
        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));

        assert!(store.delete_contact(id).await?);
        assert!(!store.delete_contact(id).await?);
        assert!(!store.update_single_contact(id, input("Kim", "")).await?);
        assert_eq!(store.single_contact(id).await?, None);
        Ok(())
    }
}
