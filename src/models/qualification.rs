use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// =============================================================================
// CERTIFICATE
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow)]
pub struct Certificate {
    pub id: Uuid,
    pub name: String,
    pub is_instructor_certificate: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CertificateSummary {
    pub id: Uuid,
    pub name: String,
}

impl From<&Certificate> for CertificateSummary {
    fn from(cert: &Certificate) -> Self {
        CertificateSummary {
            id: cert.id,
            name: cert.name.clone(),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CertificateCreateRequest {
    #[schema(example = "Trainee Diver")]
    pub name: String,
    #[serde(default)]
    pub is_instructor_certificate: bool,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CertificateUpdateRequest {
    pub name: Option<String>,
    pub is_instructor_certificate: Option<bool>,
}

// =============================================================================
// QUALIFICATION
// =============================================================================

#[derive(Debug, Clone, FromRow)]
pub struct DbQualification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub certificate_id: Uuid,
    pub date_granted: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QualifiedUser {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Qualification {
    pub id: Uuid,
    pub user: QualifiedUser,
    pub certificate: CertificateSummary,
    pub date_granted: DateTime<Utc>,
}

/// Writes are flat (`{"user": .., "certificate": ..}`) while reads are nested.
#[derive(Debug, Deserialize, ToSchema)]
pub struct QualificationCreateRequest {
    pub user: Uuid,
    pub certificate: Uuid,
    /// Defaults to now
    pub date_granted: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct QualificationUpdateRequest {
    pub user: Option<Uuid>,
    pub certificate: Option<Uuid>,
    pub date_granted: Option<DateTime<Utc>>,
}
