use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use super::qualification::CertificateSummary;
use super::region::RegionSummary;
use super::user::UserSummary;

// =============================================================================
// COURSE
// =============================================================================

#[derive(Debug, Clone, FromRow)]
pub struct DbCourse {
    pub id: Uuid,
    pub certificate_id: Uuid,
    pub creator_id: Uuid,
    pub organizer_id: Uuid,
    pub region_id: Option<Uuid>,
    pub location: Option<String>,
    pub datetime: Option<DateTime<Utc>>,
    pub maximum_participants: Option<i64>,
    pub send_out_materials: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const COURSE_COLUMNS: &str = "id, certificate_id, creator_id, organizer_id, region_id, location, datetime, \
     maximum_participants, send_out_materials, created_at, updated_at";

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Course {
    pub id: Uuid,
    pub certificate: CertificateSummary,
    pub creator: UserSummary,
    pub organizer: UserSummary,
    pub region: Option<RegionSummary>,
    pub location: Option<String>,
    pub datetime: Option<DateTime<Utc>>,
    pub maximum_participants: Option<i64>,
    pub send_out_materials: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Creator, organizer and region are resolved by the server; see
/// `routes::courses` for the fallback rules.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CourseCreateRequest {
    pub certificate: Option<Uuid>,
    pub creator: Option<Uuid>,
    #[serde(default, deserialize_with = "crate::utils::double_option")]
    #[schema(value_type = Option<Uuid>)]
    pub organizer: Option<Option<Uuid>>,
    pub region: Option<Uuid>,
    pub location: Option<String>,
    pub datetime: Option<DateTime<Utc>>,
    pub maximum_participants: Option<i64>,
    #[serde(default)]
    pub send_out_materials: bool,
    #[serde(default)]
    pub instructors: Vec<Uuid>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CourseUpdateRequest {
    pub certificate: Option<Uuid>,
    #[serde(default, deserialize_with = "crate::utils::double_option")]
    #[schema(value_type = Option<Uuid>)]
    pub organizer: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "crate::utils::double_option")]
    #[schema(value_type = Option<Uuid>)]
    pub region: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "crate::utils::double_option")]
    #[schema(value_type = Option<String>)]
    pub location: Option<Option<String>>,
    #[serde(default, deserialize_with = "crate::utils::double_option")]
    #[schema(value_type = Option<DateTime<Utc>>)]
    pub datetime: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "crate::utils::double_option")]
    #[schema(value_type = Option<i64>)]
    pub maximum_participants: Option<Option<i64>>,
    pub send_out_materials: Option<bool>,
    pub instructors: Option<Vec<Uuid>>,
}

// =============================================================================
// ENROLMENT
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow)]
pub struct CourseEnrolment {
    pub id: Uuid,
    #[sqlx(rename = "user_id")]
    pub user: Uuid,
    #[sqlx(rename = "course_id")]
    pub course: Uuid,
    pub recommended_by_dive_officer: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct EnrolmentCreateRequest {
    pub user: Uuid,
    /// Taken from the path on nested routes
    pub course: Option<Uuid>,
    #[serde(default)]
    pub recommended_by_dive_officer: bool,
}

// =============================================================================
// INSTRUCTION
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow)]
pub struct CourseInstruction {
    pub id: Uuid,
    #[sqlx(rename = "user_id")]
    pub user: Uuid,
    #[sqlx(rename = "course_id")]
    pub course: Uuid,
    pub expense_type: Option<String>,
    pub expense_value: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct InstructionCreateRequest {
    pub user: Option<Uuid>,
    pub expense_type: Option<String>,
    #[serde(default)]
    pub expense_value: i64,
}
