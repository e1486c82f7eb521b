use std::collections::BTreeMap;
use std::sync::Mutex;

use shared_types::{Contact, IdentifyRequest, IdentifyResponse};

use super::error::{StoreError, StoreResult};
use super::store::{ContactStore, LinkUpdate, NewContact};
use super::IdentityBackend;
use crate::identity::{self, IdentityError, Observation};

/// In-memory contact table keyed by id.
#[derive(Debug, Clone)]
pub struct MemoryContactStore {
    contacts: BTreeMap<i64, Contact>,
    next_id: i64,
}

impl MemoryContactStore {
    pub fn new() -> Self {
        Self {
            contacts: BTreeMap::new(),
            next_id: 1,
        }
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    /// Every stored contact, ascending by id.
    pub fn contacts(&self) -> impl Iterator<Item = &Contact> {
        self.contacts.values()
    }

    /// Stores a record verbatim, bypassing id and timestamp assignment.
    #[cfg(test)]
    pub(crate) fn put(&mut self, contact: Contact) {
        self.next_id = self.next_id.max(contact.id + 1);
        self.contacts.insert(contact.id, contact);
    }
}

impl Default for MemoryContactStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ContactStore for MemoryContactStore {
    fn find_by_email_or_phone(
        &mut self,
        email: Option<&str>,
        phone_number: Option<&str>,
    ) -> StoreResult<Vec<Contact>> {
        Ok(self
            .contacts
            .values()
            .filter(|c| {
                let email_match = email.is_some() && c.email.as_deref() == email;
                let phone_match = phone_number.is_some() && c.phone_number.as_deref() == phone_number;
                email_match || phone_match
            })
            .cloned()
            .collect())
    }

    fn get_by_id(&mut self, id: i64) -> StoreResult<Option<Contact>> {
        Ok(self.contacts.get(&id).cloned())
    }

    fn get_children(&mut self, parent_id: i64) -> StoreResult<Vec<Contact>> {
        Ok(self
            .contacts
            .values()
            .filter(|c| c.linked_id == Some(parent_id))
            .cloned()
            .collect())
    }

    fn insert(&mut self, contact: NewContact) -> StoreResult<Contact> {
        let now = chrono::Utc::now().timestamp_millis();
        let id = self.next_id;
        self.next_id += 1;

        let contact = Contact {
            id,
            email: contact.email,
            phone_number: contact.phone_number,
            linked_id: contact.linked_id,
            link_precedence: contact.link_precedence,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.contacts.insert(id, contact.clone());

        Ok(contact)
    }

    fn update_link(&mut self, id: i64, update: LinkUpdate) -> StoreResult<Contact> {
        let contact = self.contacts.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        contact.link_precedence = update.link_precedence;
        contact.linked_id = update.linked_id;
        contact.updated_at = chrono::Utc::now().timestamp_millis();

        Ok(contact.clone())
    }
}

/// One write made inside a `MemoryTransaction`, with what undoes it.
#[derive(Debug)]
enum Undo {
    Inserted { id: i64, next_id: i64 },
    Relinked(Contact),
}

/// Write-tracking view over a `MemoryContactStore`.
///
/// Reads and writes go straight to the table; each write is logged so
/// `rollback` can restore the table in reverse order.
#[derive(Debug)]
pub struct MemoryTransaction<'a> {
    store: &'a mut MemoryContactStore,
    undo: Vec<Undo>,
}

impl<'a> MemoryTransaction<'a> {
    pub fn begin(store: &'a mut MemoryContactStore) -> Self {
        Self {
            store,
            undo: Vec::new(),
        }
    }

    pub fn commit(self) {}

    pub fn rollback(self) {
        let MemoryTransaction { store, undo } = self;
        for entry in undo.into_iter().rev() {
            match entry {
                Undo::Inserted { id, next_id } => {
                    store.contacts.remove(&id);
                    store.next_id = next_id;
                }
                Undo::Relinked(previous) => {
                    store.contacts.insert(previous.id, previous);
                }
            }
        }
    }
}

impl ContactStore for MemoryTransaction<'_> {
    fn find_by_email_or_phone(
        &mut self,
        email: Option<&str>,
        phone_number: Option<&str>,
    ) -> StoreResult<Vec<Contact>> {
        self.store.find_by_email_or_phone(email, phone_number)
    }

    fn get_by_id(&mut self, id: i64) -> StoreResult<Option<Contact>> {
        self.store.get_by_id(id)
    }

    fn get_children(&mut self, parent_id: i64) -> StoreResult<Vec<Contact>> {
        self.store.get_children(parent_id)
    }

    fn insert(&mut self, contact: NewContact) -> StoreResult<Contact> {
        let next_id = self.store.next_id;
        let contact = self.store.insert(contact)?;
        self.undo.push(Undo::Inserted {
            id: contact.id,
            next_id,
        });
        Ok(contact)
    }

    fn update_link(&mut self, id: i64, update: LinkUpdate) -> StoreResult<Contact> {
        let previous = self
            .store
            .contacts
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))?;
        let contact = self.store.update_link(id, update)?;
        self.undo.push(Undo::Relinked(previous));
        Ok(contact)
    }
}

/// Identity backend over a process-local `MemoryContactStore`.
///
/// The mutex is held for a whole resolution. Writes are undone if the
/// resolution fails.
#[derive(Debug, Default)]
pub struct MemoryDatabase {
    store: Mutex<MemoryContactStore>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_store(store: MemoryContactStore) -> Self {
        Self {
            store: Mutex::new(store),
        }
    }

    /// Snapshot of the current table.
    pub fn snapshot(&self) -> StoreResult<MemoryContactStore> {
        let guard = self.store.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(guard.clone())
    }

    /// Run `f` under the table lock, committing its writes on `Ok` and
    /// rolling them back on `Err`.
    pub fn transaction<T>(
        &self,
        f: impl FnOnce(&mut MemoryTransaction<'_>) -> Result<T, IdentityError>,
    ) -> Result<T, IdentityError> {
        let mut guard = self.store.lock().map_err(|_| StoreError::LockPoisoned)?;
        let mut tx = MemoryTransaction::begin(&mut guard);

        match f(&mut tx) {
            Ok(value) => {
                tx.commit();
                Ok(value)
            }
            Err(e) => {
                tx.rollback();
                Err(e)
            }
        }
    }
}

impl IdentityBackend for MemoryDatabase {
    fn identify(&self, request: &IdentifyRequest) -> Result<IdentifyResponse, IdentityError> {
        let observation = Observation::from_request(request)?;
        let resolution = self.transaction(|tx| identity::resolve(tx, &observation))?;

        Ok(resolution.into_response())
    }

    fn ping(&self) -> Result<(), StoreError> {
        self.store
            .lock()
            .map(|_| ())
            .map_err(|_| StoreError::LockPoisoned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::LinkPrecedence;

    #[test]
    fn test_store_assigns_increasing_ids() {
        let mut store = MemoryContactStore::new();
        let first = store.insert(NewContact::primary(Some("a@x.com"), None)).unwrap();
        let second = store.insert(NewContact::secondary(None, Some("1"), first.id)).unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get_children(first.id).unwrap(), vec![second]);
    }

    #[test]
    fn test_absent_values_match_nothing() {
        let mut store = MemoryContactStore::new();
        store.insert(NewContact::primary(Some("a@x.com"), None)).unwrap();

        assert!(store.find_by_email_or_phone(None, None).unwrap().is_empty());
        assert!(store.find_by_email_or_phone(None, Some("1")).unwrap().is_empty());
        assert_eq!(store.find_by_email_or_phone(Some("a@x.com"), Some("1")).unwrap().len(), 1);
    }

    #[test]
    fn test_update_link_unknown_id() {
        let mut store = MemoryContactStore::new();
        let result = store.update_link(3, LinkUpdate::secondary_of(1));
        assert!(matches!(result, Err(StoreError::NotFound(3))));
    }

    #[test]
    fn test_failed_resolution_leaves_table_untouched() {
        let mut store = MemoryContactStore::new();
        // Two secondaries pointing at each other: gathering succeeds but the
        // group is rejected before any write.
        for (id, linked_id) in [(1, 2), (2, 1)] {
            store.put(Contact {
                id,
                email: Some("loop@x.com".to_string()),
                phone_number: None,
                linked_id: Some(linked_id),
                link_precedence: LinkPrecedence::Secondary,
                created_at: id,
                updated_at: id,
                deleted_at: None,
            });
        }
        let db = MemoryDatabase::with_store(store);

        let request = IdentifyRequest::new(Some("loop@x.com"), Some("555"));
        let result = db.identify(&request);

        assert!(matches!(result, Err(IdentityError::InvariantViolation(_))));
        assert_eq!(db.snapshot().unwrap().len(), 2);
    }

    #[test]
    fn test_successful_resolution_is_committed() {
        let db = MemoryDatabase::new();
        let response = db
            .identify(&IdentifyRequest::new(Some("a@x.com"), Some("1")))
            .unwrap();

        assert_eq!(response.contact.primary_contact_id, 1);
        assert_eq!(db.snapshot().unwrap().len(), 1);
        assert!(db.ping().is_ok());
    }

    /// Delegates to a transaction but refuses to relink one contact.
    struct RefuseRelink<'t, 'a> {
        tx: &'t mut MemoryTransaction<'a>,
        refused_id: i64,
    }

    impl ContactStore for RefuseRelink<'_, '_> {
        fn find_by_email_or_phone(
            &mut self,
            email: Option<&str>,
            phone_number: Option<&str>,
        ) -> StoreResult<Vec<Contact>> {
            self.tx.find_by_email_or_phone(email, phone_number)
        }

        fn get_by_id(&mut self, id: i64) -> StoreResult<Option<Contact>> {
            self.tx.get_by_id(id)
        }

        fn get_children(&mut self, parent_id: i64) -> StoreResult<Vec<Contact>> {
            self.tx.get_children(parent_id)
        }

        fn insert(&mut self, contact: NewContact) -> StoreResult<Contact> {
            self.tx.insert(contact)
        }

        fn update_link(&mut self, id: i64, update: LinkUpdate) -> StoreResult<Contact> {
            if id == self.refused_id {
                return Err(StoreError::Corrupt {
                    id,
                    reason: "relink refused".to_string(),
                });
            }
            self.tx.update_link(id, update)
        }
    }

    #[test]
    fn test_failure_after_demotion_rolls_back() {
        let db = MemoryDatabase::new();
        db.identify(&IdentifyRequest::new(Some("a@x.com"), None)).unwrap();
        db.identify(&IdentifyRequest::new(None, Some("1"))).unwrap();
        db.identify(&IdentifyRequest::new(Some("b@x.com"), Some("1"))).unwrap();
        let before: Vec<Contact> = db.snapshot().unwrap().contacts().cloned().collect();

        // Merging a@x.com with 1 demotes contact 2, then relinks its
        // secondary 3; the second write fails.
        let observation = Observation::new(Some("a@x.com"), Some("1")).unwrap();
        let result = db.transaction(|tx| {
            let mut store = RefuseRelink { tx, refused_id: 3 };
            identity::resolve(&mut store, &observation)
        });

        assert!(matches!(result, Err(IdentityError::Store(StoreError::Corrupt { id: 3, .. }))));
        let after: Vec<Contact> = db.snapshot().unwrap().contacts().cloned().collect();
        assert_eq!(after, before);
        assert_eq!(after[1].link_precedence, LinkPrecedence::Primary);
    }

    #[test]
    fn test_rollback_restores_ids_and_links() {
        let mut store = MemoryContactStore::new();
        let primary = store.insert(NewContact::primary(Some("a@x.com"), None)).unwrap();
        let other = store.insert(NewContact::primary(None, Some("1"))).unwrap();

        let mut tx = MemoryTransaction::begin(&mut store);
        tx.update_link(other.id, LinkUpdate::secondary_of(primary.id)).unwrap();
        tx.insert(NewContact::secondary(Some("c@x.com"), None, primary.id)).unwrap();
        tx.rollback();

        assert_eq!(store.len(), 2);
        assert_eq!(store.get_by_id(other.id).unwrap(), Some(other));
        let next = store.insert(NewContact::primary(Some("d@x.com"), None)).unwrap();
        assert_eq!(next.id, 3);
    }
}
