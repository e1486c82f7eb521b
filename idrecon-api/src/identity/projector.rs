use std::collections::HashSet;

use shared_types::{ConsolidatedContact, Contact};

use super::graph::ContactGroup;

/// Build the response document for a consolidated group.
///
/// The primary's own email and phone number come first in their lists; the
/// remaining values follow in ascending contact id order, de-duplicated.
pub fn project(primary: &Contact, group: &ContactGroup) -> ConsolidatedContact {
    let emails = ordered_values(
        primary.email.as_deref(),
        group.iter().filter_map(|c| c.email.as_deref()),
    );
    let phone_numbers = ordered_values(
        primary.phone_number.as_deref(),
        group.iter().filter_map(|c| c.phone_number.as_deref()),
    );
    let secondary_contact_ids = group.ids().filter(|id| *id != primary.id).collect();

    ConsolidatedContact {
        primary_contact_id: primary.id,
        emails,
        phone_numbers,
        secondary_contact_ids,
    }
}

fn ordered_values<'a>(first: Option<&'a str>, rest: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    first
        .into_iter()
        .chain(rest)
        .filter(|value| !value.is_empty() && seen.insert(*value))
        .map(str::to_string)
        .collect()
}
