//! Member-related types

use super::error::CirculationError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Member identifier
pub type MemberId = u64;

/// Membership standing
///
/// Only `Active` members may borrow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MembershipStatus {
    #[default]
    Active,
    Suspended,
    Expired,
}

impl MembershipStatus {
    /// Whether members with this status may borrow
    pub fn can_borrow(self) -> bool {
        matches!(self, MembershipStatus::Active)
    }
}

impl fmt::Display for MembershipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MembershipStatus::Active => write!(f, "ACTIVE"),
            MembershipStatus::Suspended => write!(f, "SUSPENDED"),
            MembershipStatus::Expired => write!(f, "EXPIRED"),
        }
    }
}

impl FromStr for MembershipStatus {
    type Err = CirculationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(MembershipStatus::Active),
            "suspended" => Ok(MembershipStatus::Suspended),
            "expired" => Ok(MembershipStatus::Expired),
            other => Err(CirculationError::validation(format!(
                "unknown membership status '{}'",
                other
            ))),
        }
    }
}

/// A registered library member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    /// Unique member identifier
    #[serde(rename = "memberId", alias = "id")]
    pub id: MemberId,

    pub name: String,

    pub email: String,

    #[serde(default)]
    pub phone: Option<String>,

    #[serde(default)]
    pub address: Option<String>,

    #[serde(default)]
    pub membership_status: MembershipStatus,

    #[serde(default)]
    pub registration_date: Option<NaiveDate>,
}

impl Member {
    pub fn is_active(&self) -> bool {
        self.membership_status.can_borrow()
    }
}

/// Input record for creating or updating a member
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberDraft {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub membership_status: Option<MembershipStatus>,
    #[serde(default)]
    pub registration_date: Option<NaiveDate>,
}

impl MemberDraft {
    /// Build a member with the given identifier, validating the draft
    ///
    /// Missing status defaults to `Active`, missing registration date to
    /// `today`.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` if the name is blank or the email address
    /// is not plausibly an address.
    pub fn into_member(self, id: MemberId, today: NaiveDate) -> Result<Member, CirculationError> {
        if self.name.trim().is_empty() {
            return Err(CirculationError::validation("member name must not be empty"));
        }
        let email = self.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(CirculationError::validation(format!(
                "'{}' is not a valid email address",
                self.email
            )));
        }

        Ok(Member {
            id,
            name: self.name.trim().to_string(),
            email: email.to_string(),
            phone: self.phone,
            address: self.address,
            membership_status: self.membership_status.unwrap_or_default(),
            registration_date: self.registration_date.or(Some(today)),
        })
    }
}
