//! Which fields a principal may read and write on clubs and users.

use std::collections::BTreeSet;

use serde_json::{Map, Value};
use uuid::Uuid;

use super::predicates;
use super::principal::Principal;

pub const CLUB_BASE: &[&str] = &["id", "name", "region", "description", "location", "email", "phone", "website"];
pub const CLUB_DIVE_OFFICER: &[&str] = &[
    "id", "name", "region", "description", "location", "email", "phone", "website", "foundation_date", "users",
];
pub const CLUB_ADMIN: &[&str] = &[
    "id", "name", "region", "description", "location", "email", "phone", "website", "foundation_date", "users",
    "created_at", "updated_at",
];

pub const CLUB_ADMIN_WRITE: &[&str] = &[
    "name", "region", "foundation_date", "description", "location", "email", "phone", "website",
];
pub const CLUB_DIVE_OFFICER_WRITE: &[&str] = &["foundation_date", "description", "location", "email", "phone", "website"];

pub mod fieldsets {
    pub const CONTACT_DETAILS: &[&str] = &["email", "id", "first_name", "last_name", "phone_home", "phone_mobile"];

    pub const MEMBERSHIP_STATUS: &[&str] = &[
        "current_membership_status",
        "member_since",
        "next_medical_disclaimer_due_date",
        "next_medical_assessment_due_date",
        "next_renewal_due_date",
        "next_fitness_test_due_date",
        "next_year_membership_status",
    ];

    pub const OWN_PROFILE: &[&str] = &[
        "id",
        "first_name",
        "last_name",
        "gender",
        "is_instructor",
        "is_staff",
        "date_of_birth",
        "club",
        "email",
        "phone_home",
        "phone_mobile",
        "readable_committee_positions",
        "readable_membership_type",
        "next_of_kin_name",
        "next_of_kin_phone",
        "current_membership_status",
        "title",
    ];

    /// Used for user list and detail responses
    pub const DEFAULT: &[&str] = &[
        "id",
        "first_name",
        "last_name",
        "gender",
        "title",
        "readable_committee_positions",
        "readable_membership_type",
        "date_of_birth",
        "email",
        "phone_home",
        "phone_mobile",
        "club",
        "current_membership_status",
        "is_staff",
        "member_since",
        "next_fitness_test_due_date",
        "next_medical_disclaimer_due_date",
        "next_medical_assessment_due_date",
        "next_renewal_due_date",
        "next_year_membership_status",
    ];

    pub const SUMMARY: &[&str] = &["id", "first_name", "last_name", "email"];
}

pub const USER_PROFILE_WRITE: &[&str] = &[
    "first_name",
    "last_name",
    "email",
    "title",
    "gender",
    "date_of_birth",
    "phone_home",
    "phone_mobile",
    "next_of_kin_name",
    "next_of_kin_phone",
    "membership_type",
];
pub const USER_ADMIN_EXTRA_WRITE: &[&str] = &["club", "is_staff", "password"];
pub const USER_SELF_EXTRA_WRITE: &[&str] = &["password"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClubTier {
    Base,
    DiveOfficer,
    Admin,
}

impl ClubTier {
    pub fn for_club(principal: &Principal, club_id: Uuid) -> Self {
        if predicates::is_admin(principal) {
            ClubTier::Admin
        } else if predicates::has_as_dive_officer(principal, Some(club_id)) {
            ClubTier::DiveOfficer
        } else {
            ClubTier::Base
        }
    }

    pub fn fields(self) -> &'static [&'static str] {
        match self {
            ClubTier::Base => CLUB_BASE,
            ClubTier::DiveOfficer => CLUB_DIVE_OFFICER,
            ClubTier::Admin => CLUB_ADMIN,
        }
    }

    pub fn includes_members(self) -> bool {
        self.fields().contains(&"users")
    }
}

pub fn club_write_fields(principal: &Principal, club_id: Uuid) -> &'static [&'static str] {
    match ClubTier::for_club(principal, club_id) {
        ClubTier::Admin => CLUB_ADMIN_WRITE,
        ClubTier::DiveOfficer => CLUB_DIVE_OFFICER_WRITE,
        ClubTier::Base => &[],
    }
}

/// Union of the write sets that apply to the principal editing (or creating)
/// a member of `target_club`. `target_user` is `None` on create.
pub fn user_write_fields(principal: &Principal, target_user: Option<Uuid>, target_club: Uuid) -> BTreeSet<&'static str> {
    let mut allowed = BTreeSet::new();

    if predicates::is_admin(principal) {
        allowed.extend(USER_PROFILE_WRITE);
        allowed.extend(USER_ADMIN_EXTRA_WRITE);
    }
    if predicates::has_as_dive_officer(principal, Some(target_club)) {
        allowed.extend(USER_PROFILE_WRITE);
    }
    if target_user == Some(principal.user_id) {
        allowed.extend(USER_PROFILE_WRITE);
        allowed.extend(USER_SELF_EXTRA_WRITE);
    }

    allowed
}

/// Keep only `fields` of a serialized record. Non-objects pass through.
pub fn project(record: &Value, fields: &[&str]) -> Value {
    match record {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(key, _)| fields.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Drop incoming fields outside `allowed`.
pub fn permitted_writes<'a>(body: Map<String, Value>, allowed: impl IntoIterator<Item = &'a str>) -> Map<String, Value> {
    let allowed: BTreeSet<&str> = allowed.into_iter().collect();
    let (kept, dropped): (Map<String, Value>, Map<String, Value>) =
        body.into_iter().partition(|(key, _)| allowed.contains(key.as_str()));

    if !dropped.is_empty() {
        let names: Vec<&str> = dropped.keys().map(String::as_str).collect();
        tracing::debug!(dropped = ?names, "ignoring fields the caller may not write");
    }

    kept
}
