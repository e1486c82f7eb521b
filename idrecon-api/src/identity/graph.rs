use std::collections::{BTreeMap, HashSet};

use shared_types::Contact;

use crate::database::{ContactStore, StoreResult};

/// Contacts of one connected group, keyed by id.
///
/// Iteration is always ascending by id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactGroup {
    members: BTreeMap<i64, Contact>,
}

impl ContactGroup {
    pub fn get(&self, id: i64) -> Option<&Contact> {
        self.members.get(&id)
    }

    pub fn contains(&self, id: i64) -> bool {
        self.members.contains_key(&id)
    }

    pub fn insert(&mut self, contact: Contact) {
        self.members.insert(contact.id, contact);
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Contact> {
        self.members.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.members.keys().copied()
    }

    pub fn primaries(&self) -> impl Iterator<Item = &Contact> {
        self.iter().filter(|c| c.is_primary())
    }

    pub fn has_email(&self, email: &str) -> bool {
        self.iter().any(|c| c.email.as_deref() == Some(email))
    }

    pub fn has_phone_number(&self, phone_number: &str) -> bool {
        self.iter().any(|c| c.phone_number.as_deref() == Some(phone_number))
    }
}

impl FromIterator<Contact> for ContactGroup {
    fn from_iter<I: IntoIterator<Item = Contact>>(iter: I) -> Self {
        let mut group = ContactGroup::default();
        for contact in iter {
            group.insert(contact);
        }
        group
    }
}

/// Collect every contact reachable from `seeds` through `linked_id` in
/// either direction.
///
/// A `linked_id` that points at no stored record is skipped.
pub fn gather<S>(store: &mut S, seeds: impl IntoIterator<Item = Contact>) -> StoreResult<ContactGroup>
where
    S: ContactStore + ?Sized,
{
    let mut group = ContactGroup::default();
    let mut pending: Vec<Contact> = seeds.into_iter().collect();

    while let Some(contact) = pending.pop() {
        if group.contains(contact.id) {
            continue;
        }

        if let Some(parent_id) = contact.linked_id {
            if !group.contains(parent_id) {
                match store.get_by_id(parent_id)? {
                    Some(parent) => pending.push(parent),
                    None => tracing::debug!(
                        contact_id = contact.id,
                        parent_id,
                        "Skipping dangling linked_id"
                    ),
                }
            }
        }

        let children = store.get_children(contact.id)?;
        pending.extend(children.into_iter().filter(|c| !group.contains(c.id)));

        group.insert(contact);
    }

    Ok(group)
}

/// Returns the id of a contact whose `linked_id` chain loops back on itself
/// inside the group, if any.
pub fn find_link_cycle(group: &ContactGroup) -> Option<i64> {
    for start in group.iter() {
        let mut seen = HashSet::from([start.id]);
        let mut current = start;

        while let Some(next) = current.linked_id.and_then(|id| group.get(id)) {
            if !seen.insert(next.id) {
                return Some(start.id);
            }
            current = next;
        }
    }

    None
}
