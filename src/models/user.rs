use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use super::club::ClubSummary;
use crate::membership::MembershipStatus;

/// Forms of address, stored as integer codes.
pub const TITLE_CHOICES: [(i64, &str); 5] = [(0, "Dr"), (1, "Miss"), (2, "Mr"), (3, "Mrs"), (4, "Ms")];

pub const GENDER_CHOICES: [(i64, &str); 2] = [(0, "Female"), (1, "Male")];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipType {
    Full,
    Student,
}

impl MembershipType {
    pub fn code(self) -> i64 {
        match self {
            MembershipType::Full => 0,
            MembershipType::Student => 1,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(MembershipType::Full),
            1 => Some(MembershipType::Student),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MembershipType::Full => "Full Diver",
            MembershipType::Student => "Student Diver",
        }
    }
}

pub fn is_valid_choice(choices: &[(i64, &str)], code: i64) -> bool {
    choices.iter().any(|(c, _)| *c == code)
}

#[derive(Debug, Clone, FromRow)]
pub struct DbUser {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub title: Option<i64>,
    pub gender: Option<i64>,
    pub date_of_birth: Option<NaiveDate>,
    pub phone_home: Option<String>,
    pub phone_mobile: Option<String>,
    pub next_of_kin_name: Option<String>,
    pub next_of_kin_phone: Option<String>,
    pub club_id: Uuid,
    pub member_since: DateTime<Utc>,
    pub membership_type: i64,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const USER_COLUMNS: &str = "id, email, password_hash, first_name, last_name, title, gender, date_of_birth, \
     phone_home, phone_mobile, next_of_kin_name, next_of_kin_phone, club_id, member_since, membership_type, \
     is_staff, is_superuser, created_at, updated_at";

/// Every field a user record can be rendered with. Endpoints pick a
/// named subset of these and project the record onto it.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserProfile {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub title: Option<i64>,
    pub gender: Option<i64>,
    pub date_of_birth: Option<NaiveDate>,
    pub email: String,
    pub phone_home: Option<String>,
    pub phone_mobile: Option<String>,
    pub next_of_kin_name: Option<String>,
    pub next_of_kin_phone: Option<String>,
    pub club: ClubSummary,
    pub member_since: DateTime<Utc>,
    pub membership_type: i64,
    pub readable_membership_type: String,
    pub readable_committee_positions: Vec<String>,
    pub is_staff: bool,
    pub is_instructor: bool,
    pub current_membership_status: MembershipStatus,
    pub next_medical_disclaimer_due_date: NaiveDate,
    pub next_fitness_test_due_date: NaiveDate,
    pub next_medical_assessment_due_date: NaiveDate,
    pub next_renewal_due_date: NaiveDate,
    pub next_year_membership_status: MembershipStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserSummary {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl From<&DbUser> for UserSummary {
    fn from(db: &DbUser) -> Self {
        UserSummary {
            id: db.id,
            first_name: db.first_name.clone(),
            last_name: db.last_name.clone(),
            email: db.email.clone(),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UserCreateRequest {
    #[schema(example = "Ada")]
    pub first_name: String,
    #[schema(example = "Lovelace")]
    pub last_name: String,
    #[schema(example = "ada@example.com")]
    pub email: String,
    pub password: Option<String>,
    pub title: Option<i64>,
    pub gender: Option<i64>,
    pub date_of_birth: Option<NaiveDate>,
    pub phone_home: Option<String>,
    pub phone_mobile: Option<String>,
    pub next_of_kin_name: Option<String>,
    pub next_of_kin_phone: Option<String>,
    pub membership_type: Option<i64>,
    /// Only honoured for administrators
    pub club: Option<Uuid>,
    /// Only honoured for administrators
    pub is_staff: Option<bool>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UserUpdateRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    #[serde(default, deserialize_with = "crate::utils::double_option")]
    #[schema(value_type = Option<i64>)]
    pub title: Option<Option<i64>>,
    #[serde(default, deserialize_with = "crate::utils::double_option")]
    #[schema(value_type = Option<i64>)]
    pub gender: Option<Option<i64>>,
    #[serde(default, deserialize_with = "crate::utils::double_option")]
    #[schema(value_type = Option<NaiveDate>)]
    pub date_of_birth: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "crate::utils::double_option")]
    #[schema(value_type = Option<String>)]
    pub phone_home: Option<Option<String>>,
    #[serde(default, deserialize_with = "crate::utils::double_option")]
    #[schema(value_type = Option<String>)]
    pub phone_mobile: Option<Option<String>>,
    #[serde(default, deserialize_with = "crate::utils::double_option")]
    #[schema(value_type = Option<String>)]
    pub next_of_kin_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "crate::utils::double_option")]
    #[schema(value_type = Option<String>)]
    pub next_of_kin_phone: Option<Option<String>>,
    pub membership_type: Option<i64>,
    pub club: Option<Uuid>,
    pub is_staff: Option<bool>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "ada@example.com")]
    pub email: String,
    #[schema(example = "S3cureP@ssw0rd")]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    #[schema(value_type = Object)]
    pub user: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership_type_labels() {
        assert_eq!(MembershipType::from_code(0), Some(MembershipType::Full));
        assert_eq!(MembershipType::Student.label(), "Student Diver");
        assert_eq!(MembershipType::from_code(7), None);
    }

    #[test]
    fn choice_validation() {
        assert!(is_valid_choice(&TITLE_CHOICES, 4));
        assert!(!is_valid_choice(&TITLE_CHOICES, 5));
        assert!(is_valid_choice(&GENDER_CHOICES, 0));
        assert!(!is_valid_choice(&GENDER_CHOICES, 2));
    }
}
