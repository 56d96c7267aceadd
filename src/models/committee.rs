use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Committee roles a member can hold within a club. The integer codes are
/// what gets stored, so they must stay distinct and stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommitteeRole {
    DiveOfficer,
    Captain,
    Treasurer,
    Secretary,
    TrainingOfficer,
}

impl CommitteeRole {
    pub const ALL: [CommitteeRole; 5] = [
        CommitteeRole::DiveOfficer,
        CommitteeRole::Captain,
        CommitteeRole::Treasurer,
        CommitteeRole::Secretary,
        CommitteeRole::TrainingOfficer,
    ];

    pub fn code(self) -> i64 {
        match self {
            CommitteeRole::DiveOfficer => 0,
            CommitteeRole::Captain => 1,
            CommitteeRole::Treasurer => 2,
            CommitteeRole::Secretary => 3,
            CommitteeRole::TrainingOfficer => 4,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|role| role.code() == code)
    }

    pub fn label(self) -> &'static str {
        match self {
            CommitteeRole::DiveOfficer => "Dive Officer",
            CommitteeRole::Captain => "Captain",
            CommitteeRole::Treasurer => "Treasurer",
            CommitteeRole::Secretary => "Secretary",
            CommitteeRole::TrainingOfficer => "Training Officer",
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbCommitteePosition {
    pub id: Uuid,
    pub user_id: Uuid,
    pub club_id: Uuid,
    pub role: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CommitteePosition {
    pub id: Uuid,
    pub user: Uuid,
    pub club: Uuid,
    #[schema(example = 0)]
    pub role: i64,
    #[schema(example = "Dive Officer")]
    pub role_label: String,
    pub created_at: DateTime<Utc>,
}

impl From<DbCommitteePosition> for CommitteePosition {
    fn from(db: DbCommitteePosition) -> Self {
        let role_label = CommitteeRole::from_code(db.role)
            .map(|role| role.label().to_string())
            .unwrap_or_default();
        CommitteePosition {
            id: db.id,
            user: db.user_id,
            club: db.club_id,
            role: db.role,
            role_label,
            created_at: db.created_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AdoptRoleRequest {
    /// Role code: 0 Dive Officer, 1 Captain, 2 Treasurer, 3 Secretary, 4 Training Officer
    #[schema(example = 0)]
    pub role: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip_and_are_distinct() {
        let mut codes: Vec<i64> = CommitteeRole::ALL.iter().map(|r| r.code()).collect();
        codes.dedup();
        assert_eq!(codes.len(), 5);
        for role in CommitteeRole::ALL {
            assert_eq!(CommitteeRole::from_code(role.code()), Some(role));
        }
    }

    #[test]
    fn unknown_code_is_rejected() {
        assert_eq!(CommitteeRole::from_code(5), None);
        assert_eq!(CommitteeRole::from_code(-1), None);
    }

    #[test]
    fn dive_officer_is_code_zero() {
        assert_eq!(CommitteeRole::DiveOfficer.code(), 0);
        assert_eq!(CommitteeRole::DiveOfficer.label(), "Dive Officer");
        assert_eq!(CommitteeRole::TrainingOfficer.label(), "Training Officer");
    }
}
