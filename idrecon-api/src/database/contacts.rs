use rusqlite::{params, Connection, OptionalExtension, Row};
use shared_types::{Contact, LinkPrecedence};

use super::error::{StoreError, StoreResult};
use super::store::{ContactStore, LinkUpdate, NewContact};

const CONTACT_COLUMNS: &str =
    "id, email, phone_number, linked_id, link_precedence, created_at, updated_at, deleted_at";

/// Contact store over a SQLite connection, usually an open transaction.
pub struct SqliteContactStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteContactStore<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn query_contacts<P: rusqlite::Params>(&self, sql: &str, params: P) -> StoreResult<Vec<Contact>> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let rows = stmt
            .query_map(params, ContactRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(Contact::try_from).collect()
    }
}

/// Raw row, before `link_precedence` is checked.
struct ContactRow {
    id: i64,
    email: Option<String>,
    phone_number: Option<String>,
    linked_id: Option<i64>,
    link_precedence: String,
    created_at: i64,
    updated_at: i64,
    deleted_at: Option<i64>,
}

impl ContactRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            email: row.get(1)?,
            phone_number: row.get(2)?,
            linked_id: row.get(3)?,
            link_precedence: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
            deleted_at: row.get(7)?,
        })
    }
}

impl TryFrom<ContactRow> for Contact {
    type Error = StoreError;

    fn try_from(row: ContactRow) -> Result<Self, Self::Error> {
        let link_precedence: LinkPrecedence =
            row.link_precedence.parse().map_err(|e| StoreError::Corrupt {
                id: row.id,
                reason: format!("{}", e),
            })?;

        Ok(Contact {
            id: row.id,
            email: row.email,
            phone_number: row.phone_number,
            linked_id: row.linked_id,
            link_precedence,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        })
    }
}

impl ContactStore for SqliteContactStore<'_> {
    fn find_by_email_or_phone(
        &mut self,
        email: Option<&str>,
        phone_number: Option<&str>,
    ) -> StoreResult<Vec<Contact>> {
        let mut conditions = Vec::new();
        let mut values = Vec::new();

        if let Some(email) = email {
            conditions.push("email = ?");
            values.push(email);
        }
        if let Some(phone_number) = phone_number {
            conditions.push("phone_number = ?");
            values.push(phone_number);
        }

        if conditions.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT {} FROM contacts WHERE {} ORDER BY id",
            CONTACT_COLUMNS,
            conditions.join(" OR ")
        );
        self.query_contacts(&sql, rusqlite::params_from_iter(values))
    }

    fn get_by_id(&mut self, id: i64) -> StoreResult<Option<Contact>> {
        let sql = format!("SELECT {} FROM contacts WHERE id = ?", CONTACT_COLUMNS);
        let row = self
            .conn
            .prepare_cached(&sql)?
            .query_row([id], ContactRow::from_row)
            .optional()?;

        row.map(Contact::try_from).transpose()
    }

    fn get_children(&mut self, parent_id: i64) -> StoreResult<Vec<Contact>> {
        let sql = format!(
            "SELECT {} FROM contacts WHERE linked_id = ? ORDER BY id",
            CONTACT_COLUMNS
        );
        self.query_contacts(&sql, [parent_id])
    }

    fn insert(&mut self, contact: NewContact) -> StoreResult<Contact> {
        let now = chrono::Utc::now().timestamp_millis();

        let id: i64 = self.conn.query_row(
            "INSERT INTO contacts
             (email, phone_number, linked_id, link_precedence, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)
             RETURNING id",
            params![
                contact.email.as_deref(),
                contact.phone_number.as_deref(),
                contact.linked_id,
                contact.link_precedence.as_str(),
                now,
            ],
            |row| row.get(0),
        )?;

        Ok(Contact {
            id,
            email: contact.email,
            phone_number: contact.phone_number,
            linked_id: contact.linked_id,
            link_precedence: contact.link_precedence,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        })
    }

    fn update_link(&mut self, id: i64, update: LinkUpdate) -> StoreResult<Contact> {
        let now = chrono::Utc::now().timestamp_millis();

        let changed = self.conn.execute(
            "UPDATE contacts SET link_precedence = ?1, linked_id = ?2, updated_at = ?3
             WHERE id = ?4",
            params![update.link_precedence.as_str(), update.linked_id, now, id],
        )?;

        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }

        self.get_by_id(id)?.ok_or(StoreError::NotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::migrations;

    fn open() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        migrations::run_migrations(&conn).unwrap();
        conn
    }

    #[test]
    fn test_insert_and_lookup() {
        let conn = open();
        let mut store = SqliteContactStore::new(&conn);

        let primary = store
            .insert(NewContact::primary(Some("lorraine@hillvalley.edu"), Some("123456")))
            .unwrap();
        let secondary = store
            .insert(NewContact::secondary(Some("mcfly@hillvalley.edu"), Some("123456"), primary.id))
            .unwrap();

        assert!(primary.is_primary());
        assert_eq!(secondary.linked_id, Some(primary.id));
        assert_eq!(store.get_by_id(primary.id).unwrap(), Some(primary.clone()));
        assert_eq!(store.get_by_id(9999).unwrap(), None);

        let by_phone = store.find_by_email_or_phone(None, Some("123456")).unwrap();
        assert_eq!(by_phone.len(), 2);

        let by_email = store
            .find_by_email_or_phone(Some("mcfly@hillvalley.edu"), Some("000"))
            .unwrap();
        assert_eq!(by_email, vec![secondary.clone()]);

        assert!(store.find_by_email_or_phone(None, None).unwrap().is_empty());
        assert_eq!(store.get_children(primary.id).unwrap(), vec![secondary]);
    }

    #[test]
    fn test_email_match_is_case_sensitive() {
        let conn = open();
        let mut store = SqliteContactStore::new(&conn);
        store
            .insert(NewContact::primary(Some("Doc@HillValley.edu"), None))
            .unwrap();

        assert!(store
            .find_by_email_or_phone(Some("doc@hillvalley.edu"), None)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_update_link() {
        let conn = open();
        let mut store = SqliteContactStore::new(&conn);
        let older = store.insert(NewContact::primary(Some("george@hillvalley.edu"), None)).unwrap();
        let newer = store.insert(NewContact::primary(None, Some("717171"))).unwrap();

        let demoted = store
            .update_link(newer.id, LinkUpdate::secondary_of(older.id))
            .unwrap();
        assert_eq!(demoted.link_precedence, LinkPrecedence::Secondary);
        assert_eq!(demoted.linked_id, Some(older.id));
        assert_eq!(demoted.created_at, newer.created_at);

        let missing = store.update_link(4242, LinkUpdate::secondary_of(older.id));
        assert!(matches!(missing, Err(StoreError::NotFound(4242))));
    }

    #[test]
    fn test_unknown_precedence_is_corrupt() {
        let conn = open();
        conn.execute_batch("PRAGMA ignore_check_constraints = ON;").unwrap();
        conn.execute(
            "INSERT INTO contacts (email, link_precedence, created_at, updated_at)
             VALUES ('biff@hillvalley.edu', 'tertiary', 0, 0)",
            [],
        )
        .unwrap();

        let mut store = SqliteContactStore::new(&conn);
        let result = store.find_by_email_or_phone(Some("biff@hillvalley.edu"), None);
        assert!(matches!(result, Err(StoreError::Corrupt { .. })));
    }
}
