use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use super::region::RegionSummary;
use super::user::UserSummary;

/// Name of the catch-all club that members fall back to.
pub const NATIONAL_CLUB: &str = "National";

#[derive(Debug, Clone, FromRow)]
pub struct DbClub {
    pub id: Uuid,
    pub name: String,
    pub region_id: Uuid,
    pub foundation_date: Option<NaiveDate>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Full club record. What a caller actually receives is a projection of this
/// onto the field tier they are entitled to.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ClubDetail {
    pub id: Uuid,
    pub name: String,
    pub region: RegionSummary,
    pub description: Option<String>,
    pub location: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub foundation_date: Option<NaiveDate>,
    /// Only loaded when the caller's tier includes the member list
    pub users: Vec<UserSummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ClubSummary {
    pub id: Uuid,
    pub name: String,
    pub region: Option<RegionSummary>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ClubCreateRequest {
    #[schema(example = "UCC Sub-Aqua Club")]
    pub name: String,
    /// Defaults to the National region
    pub region: Option<Uuid>,
    pub foundation_date: Option<NaiveDate>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
}

/// Both PUT and PATCH apply only the fields that are present. Fields the
/// caller may not write are removed before this is decoded.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ClubUpdateRequest {
    pub name: Option<String>,
    pub region: Option<Uuid>,
    #[serde(default, deserialize_with = "crate::utils::double_option")]
    #[schema(value_type = Option<NaiveDate>)]
    pub foundation_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "crate::utils::double_option")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "crate::utils::double_option")]
    #[schema(value_type = Option<String>)]
    pub location: Option<Option<String>>,
    #[serde(default, deserialize_with = "crate::utils::double_option")]
    #[schema(value_type = Option<String>)]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "crate::utils::double_option")]
    #[schema(value_type = Option<String>)]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "crate::utils::double_option")]
    #[schema(value_type = Option<String>)]
    pub website: Option<Option<String>>,
}
