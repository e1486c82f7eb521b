use shared_types::{Contact, LinkPrecedence};

use super::graph::{self, ContactGroup};
use super::{IdentityError, Observation, Resolution};
use crate::database::{ContactStore, LinkUpdate, NewContact};

/// Outcome of primary election over a group snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Election {
    pub primary_id: i64,
    /// Set when the group held no primary and the oldest member was taken
    /// instead.
    pub fallback: bool,
}

/// Pick the group's primary: the oldest current primary, or the oldest
/// member when there is none. Age is `created_at`, then `id`.
pub fn elect_primary(group: &ContactGroup) -> Option<Election> {
    if let Some(primary) = group.primaries().min_by_key(|c| c.age_key()) {
        return Some(Election {
            primary_id: primary.id,
            fallback: false,
        });
    }

    group.iter().min_by_key(|c| c.age_key()).map(|oldest| Election {
        primary_id: oldest.id,
        fallback: true,
    })
}

/// Link changes needed so every other member is a secondary pointing
/// straight at the elected primary. Nothing is relinked under a fallback
/// election, since a secondary is never promoted.
pub fn plan_relinks(group: &ContactGroup, election: &Election) -> Vec<(i64, LinkUpdate)> {
    if election.fallback {
        return Vec::new();
    }

    group
        .iter()
        .filter(|c| c.id != election.primary_id)
        .filter(|c| {
            c.link_precedence != LinkPrecedence::Secondary || c.linked_id != Some(election.primary_id)
        })
        .map(|c| (c.id, LinkUpdate::secondary_of(election.primary_id)))
        .collect()
}

/// Resolve an observation to its consolidated identity, mutating the store
/// where groups merge or gain new values.
///
/// Callers run this inside a single transaction of `store`.
pub fn resolve<S>(store: &mut S, observation: &Observation<'_>) -> Result<Resolution, IdentityError>
where
    S: ContactStore + ?Sized,
{
    let matches = store.find_by_email_or_phone(observation.email, observation.phone_number)?;

    if matches.is_empty() {
        let primary = store.insert(NewContact::primary(
            observation.email,
            observation.phone_number,
        ))?;
        tracing::info!(contact_id = primary.id, "Created new primary contact");

        let group = ContactGroup::from_iter([primary.clone()]);
        return Ok(Resolution { primary, group });
    }

    let mut group = graph::gather(store, matches)?;

    if let Some(contact_id) = graph::find_link_cycle(&group) {
        return Err(IdentityError::invariant(format!(
            "linked_id cycle through contact {}",
            contact_id
        )));
    }

    let election = elect_primary(&group)
        .ok_or_else(|| IdentityError::invariant("matched contacts produced an empty group"))?;
    let primary_id = election.primary_id;

    if election.fallback {
        tracing::warn!(
            contact_id = primary_id,
            group_size = group.len(),
            "Group has no primary contact, using its oldest member"
        );
    }

    let relinks = plan_relinks(&group, &election);
    if !relinks.is_empty() {
        let demoted = relinks
            .iter()
            .filter(|(id, _)| group.get(*id).is_some_and(Contact::is_primary))
            .count();

        for (id, update) in &relinks {
            store.update_link(*id, *update)?;
        }

        tracing::info!(
            primary_id,
            demoted,
            relinked = relinks.len() - demoted,
            "Merged contact group under oldest primary"
        );

        let primary = store
            .get_by_id(primary_id)?
            .ok_or_else(|| IdentityError::invariant(format!("elected primary {} vanished", primary_id)))?;
        group = graph::gather(store, [primary])?;
    }

    let new_email = observation.email.is_some_and(|e| !group.has_email(e));
    let new_phone = observation
        .phone_number
        .is_some_and(|p| !group.has_phone_number(p));

    if new_email || new_phone {
        let secondary = store.insert(NewContact::secondary(
            observation.email,
            observation.phone_number,
            primary_id,
        ))?;
        tracing::info!(
            contact_id = secondary.id,
            primary_id,
            "Linked new secondary contact"
        );
        group.insert(secondary);
    }

    let primary = group
        .get(primary_id)
        .cloned()
        .ok_or_else(|| IdentityError::invariant(format!("primary {} missing from its group", primary_id)))?;

    Ok(Resolution { primary, group })
}
