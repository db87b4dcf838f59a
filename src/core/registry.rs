//! Member registry
//!
//! Holds the members of a snapshot, keyed by identifier.

use crate::types::{CirculationError, EntityKind, Member, MemberDraft, MemberId};
use chrono::NaiveDate;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct MemberRegistry {
    members: BTreeMap<MemberId, Member>,
    next_id: MemberId,
}

impl MemberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from existing members
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` if an identifier or email address appears
    /// twice.
    pub fn from_members(members: Vec<Member>) -> Result<Self, CirculationError> {
        let mut registry = Self::new();
        for member in members {
            if registry.members.contains_key(&member.id) {
                return Err(CirculationError::validation(format!(
                    "duplicate member id {}",
                    member.id
                )));
            }
            registry.ensure_unique_email(&member.email, None)?;
            registry.reserve_through(member.id);
            registry.members.insert(member.id, member);
        }
        Ok(registry)
    }

    /// Keep `id` and every identifier below it from being assigned again
    pub fn reserve_through(&mut self, id: MemberId) {
        self.next_id = self.next_id.max(id.saturating_add(1));
    }

    /// Look a member up by identifier
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no such member exists.
    pub fn get(&self, id: MemberId) -> Result<&Member, CirculationError> {
        self.members
            .get(&id)
            .ok_or_else(|| CirculationError::not_found(EntityKind::Member, id))
    }

    pub fn list(&self) -> Vec<&Member> {
        self.members.values().collect()
    }

    /// Members allowed to borrow
    pub fn active(&self) -> Vec<&Member> {
        self.members.values().filter(|m| m.is_active()).collect()
    }

    /// Register a new member
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` if the draft is invalid or its email
    /// address is already registered.
    pub fn insert(
        &mut self,
        draft: MemberDraft,
        today: NaiveDate,
    ) -> Result<&Member, CirculationError> {
        let id = self.next_id.max(1);
        let member = draft.into_member(id, today)?;
        self.ensure_unique_email(&member.email, None)?;
        self.reserve_through(id);
        Ok(self.members.entry(id).or_insert(member))
    }

    /// Replace a member's details
    ///
    /// The registration date is kept unless the draft supplies one.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown member, or a `ValidationError` if
    /// the draft is invalid or its email belongs to another member.
    pub fn update(
        &mut self,
        id: MemberId,
        draft: MemberDraft,
        today: NaiveDate,
    ) -> Result<&Member, CirculationError> {
        let registered = self.get(id)?.registration_date;
        let member = MemberDraft {
            registration_date: draft.registration_date.or(registered),
            ..draft
        }
        .into_member(id, today)?;
        self.ensure_unique_email(&member.email, Some(id))?;

        self.members.insert(id, member);
        self.get(id)
    }

    /// Remove a member
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no such member exists.
    pub fn remove(&mut self, id: MemberId) -> Result<Member, CirculationError> {
        self.members
            .remove(&id)
            .ok_or_else(|| CirculationError::not_found(EntityKind::Member, id))
    }

    pub fn into_members(self) -> Vec<Member> {
        self.members.into_values().collect()
    }

    fn ensure_unique_email(
        &self,
        email: &str,
        except: Option<MemberId>,
    ) -> Result<(), CirculationError> {
        let taken = self
            .members
            .values()
            .any(|m| Some(m.id) != except && m.email.eq_ignore_ascii_case(email));
        if taken {
            return Err(CirculationError::validation(format!(
                "email {} is already registered",
                email
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MembershipStatus;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 11, 1).unwrap()
    }

    fn draft(name: &str, email: &str) -> MemberDraft {
        MemberDraft {
            name: name.to_string(),
            email: email.to_string(),
            ..MemberDraft::default()
        }
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut registry = MemberRegistry::new();
        let id = registry.insert(draft("Ada", "ada@example.org"), today()).unwrap().id;

        assert_eq!(registry.get(id).unwrap().name, "Ada");
        assert_eq!(
            registry.get(42).unwrap_err(),
            CirculationError::not_found(EntityKind::Member, 42)
        );
    }

    #[test]
    fn test_email_must_be_unique() {
        let mut registry = MemberRegistry::new();
        registry.insert(draft("Ada", "ada@example.org"), today()).unwrap();

        let result = registry.insert(draft("Imposter", "ADA@example.org"), today());
        assert!(matches!(result, Err(CirculationError::ValidationError { .. })));
    }

    #[test]
    fn test_update_keeps_registration_date_and_own_email() {
        let mut registry = MemberRegistry::new();
        registry.insert(draft("Ada", "ada@example.org"), today()).unwrap();

        let later = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let updated = registry
            .update(
                1,
                MemberDraft {
                    membership_status: Some(MembershipStatus::Suspended),
                    ..draft("Ada King", "ada@example.org")
                },
                later,
            )
            .unwrap();

        assert_eq!(updated.name, "Ada King");
        assert_eq!(updated.membership_status, MembershipStatus::Suspended);
        assert_eq!(updated.registration_date, Some(today()));
        assert!(registry.active().is_empty());
    }
}
