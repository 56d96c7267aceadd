use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Name of the catch-all region that clubs fall back to.
pub const NATIONAL_REGION: &str = "National";

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Region {
    pub id: Uuid,
    pub name: String,
    /// The Regional Dive Officer, if one has been appointed
    pub dive_officer: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbRegion {
    pub id: Uuid,
    pub name: String,
    pub dive_officer_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<DbRegion> for Region {
    fn from(db: DbRegion) -> Self {
        Region {
            id: db.id,
            name: db.name,
            dive_officer: db.dive_officer_id,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

/// Nested representation used inside clubs and courses.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegionSummary {
    pub id: Uuid,
    pub name: String,
}

impl From<&DbRegion> for RegionSummary {
    fn from(db: &DbRegion) -> Self {
        RegionSummary {
            id: db.id,
            name: db.name.clone(),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegionCreateRequest {
    #[schema(example = "South")]
    pub name: String,
    pub dive_officer: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct RegionUpdateRequest {
    #[schema(example = "South West")]
    pub name: Option<String>,
    /// `null` removes the current Regional Dive Officer
    #[serde(default, deserialize_with = "crate::utils::double_option")]
    #[schema(value_type = Option<Uuid>)]
    pub dive_officer: Option<Option<Uuid>>,
}
