//! Group role policy domain service.
//!
//! Pure rules over a group's role map: who becomes Admin at creation, which
//! role-map replacements an edit may perform, and admin continuity.

use std::collections::BTreeMap;

use rand::seq::IndexedRandom;
use rand::Rng;

use crate::domain::entities::{Group, GroupRole};
use crate::shared::error::AppError;

/// Domain service for group role rules.
pub struct GroupPolicy;

impl GroupPolicy {
    /// Role map of a new group: supplied roles for everyone else, Admin for
    /// the creator whatever was supplied for them.
    pub fn initial_roles(
        creator_id: &str,
        supplied: &BTreeMap<String, GroupRole>,
    ) -> BTreeMap<String, GroupRole> {
        let mut roles: BTreeMap<String, GroupRole> = supplied
            .iter()
            .filter(|(id, _)| id.as_str() != creator_id)
            .map(|(id, role)| (id.clone(), *role))
            .collect();
        roles.insert(creator_id.to_string(), GroupRole::Admin);
        roles
    }

    /// Check a replacement role map against the current group.
    ///
    /// - the creator stays Admin while still an active participant
    /// - nobody already listed may disappear from the map
    pub fn validate_edit(
        group: &Group,
        new_roles: &BTreeMap<String, GroupRole>,
    ) -> Result<(), AppError> {
        if group.is_active_participant(&group.creator_id)
            && new_roles.get(&group.creator_id) != Some(&GroupRole::Admin)
        {
            return Err(AppError::bad_request(
                "The group creator cannot be removed or demoted",
            ));
        }

        if let Some(dropped) = group
            .participants
            .keys()
            .find(|id| !new_roles.contains_key(*id))
        {
            return Err(AppError::bad_request(format!(
                "Participant {} cannot be dropped from the group; they must leave it",
                dropped
            )));
        }

        Ok(())
    }

    /// Ids present in `new_roles` but not yet listed in the group.
    pub fn added_participants(group: &Group, new_roles: &BTreeMap<String, GroupRole>) -> Vec<String> {
        new_roles
            .keys()
            .filter(|id| !group.is_listed(id))
            .cloned()
            .collect()
    }

    /// Promote one active participant when no Admin is left.
    ///
    /// The choice among active participants is random; returns the promoted
    /// user, or `None` when an Admin exists or nobody active remains.
    pub fn ensure_admin<R: Rng + ?Sized>(group: &mut Group, rng: &mut R) -> Option<String> {
        if group.has_admin() {
            return None;
        }

        let candidates = group.active_participants();
        let chosen = candidates.choose(rng)?.clone();
        group.participants.insert(chosen.clone(), GroupRole::Admin);
        Some(chosen)
    }
}
