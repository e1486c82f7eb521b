use shared_types::{Contact, LinkPrecedence};

use super::error::StoreResult;

/// Fields the caller supplies when creating a contact. The store assigns the
/// id and timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewContact {
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub linked_id: Option<i64>,
    pub link_precedence: LinkPrecedence,
}

impl NewContact {
    pub fn primary(email: Option<&str>, phone_number: Option<&str>) -> Self {
        Self {
            email: email.map(str::to_string),
            phone_number: phone_number.map(str::to_string),
            linked_id: None,
            link_precedence: LinkPrecedence::Primary,
        }
    }

    pub fn secondary(email: Option<&str>, phone_number: Option<&str>, primary_id: i64) -> Self {
        Self {
            email: email.map(str::to_string),
            phone_number: phone_number.map(str::to_string),
            linked_id: Some(primary_id),
            link_precedence: LinkPrecedence::Secondary,
        }
    }
}

/// New link state for an existing contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkUpdate {
    pub link_precedence: LinkPrecedence,
    pub linked_id: Option<i64>,
}

impl LinkUpdate {
    pub fn secondary_of(primary_id: i64) -> Self {
        Self {
            link_precedence: LinkPrecedence::Secondary,
            linked_id: Some(primary_id),
        }
    }
}

/// Storage operations the consolidation core relies on.
///
/// Every call made during one resolution must run inside the same
/// transaction (or lock scope) of the implementing backend.
pub trait ContactStore {
    /// Contacts whose email equals `email` or whose phone number equals
    /// `phone_number`. Absent arguments match nothing.
    fn find_by_email_or_phone(
        &mut self,
        email: Option<&str>,
        phone_number: Option<&str>,
    ) -> StoreResult<Vec<Contact>>;

    fn get_by_id(&mut self, id: i64) -> StoreResult<Option<Contact>>;

    /// Contacts whose `linked_id` is `parent_id`.
    fn get_children(&mut self, parent_id: i64) -> StoreResult<Vec<Contact>>;

    fn insert(&mut self, contact: NewContact) -> StoreResult<Contact>;

    /// Applies `update` and bumps `updated_at`. Returns the stored record.
    fn update_link(&mut self, id: i64, update: LinkUpdate) -> StoreResult<Contact>;
}
