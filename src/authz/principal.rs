use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::app::AppState;
use crate::errors::{AppError, AppResult};
use crate::jwt::AuthUser;
use crate::models::committee::CommitteeRole;

/// Principal represents the authenticated user together with the club,
/// committee and region facts the policy needs. It is loaded fresh for
/// every request.
#[derive(Debug, Clone)]
pub struct Principal {
    pub user_id: Uuid,
    pub club_id: Uuid,
    /// Region of the principal's club
    pub region_id: Uuid,
    pub is_staff: bool,
    pub is_superuser: bool,
    /// Committee positions held: (club, role)
    pub positions: Vec<(Uuid, CommitteeRole)>,
    /// Regions naming this user as Regional Dive Officer
    pub regions_led: Vec<Uuid>,
}

impl Principal {
    pub fn new(user_id: Uuid, club_id: Uuid, region_id: Uuid) -> Self {
        Self {
            user_id,
            club_id,
            region_id,
            is_staff: false,
            is_superuser: false,
            positions: Vec::new(),
            regions_led: Vec::new(),
        }
    }

    pub fn with_staff(mut self, is_staff: bool) -> Self {
        self.is_staff = is_staff;
        self
    }

    pub fn with_superuser(mut self, is_superuser: bool) -> Self {
        self.is_superuser = is_superuser;
        self
    }

    pub fn with_positions(mut self, positions: impl IntoIterator<Item = (Uuid, CommitteeRole)>) -> Self {
        self.positions = positions.into_iter().collect();
        self
    }

    pub fn with_regions_led(mut self, regions: impl IntoIterator<Item = Uuid>) -> Self {
        self.regions_led = regions.into_iter().collect();
        self
    }

    pub fn holds(&self, club_id: Uuid, role: CommitteeRole) -> bool {
        self.positions.iter().any(|(c, r)| *c == club_id && *r == role)
    }

    pub fn is_admin(&self) -> bool {
        super::predicates::is_admin(self)
    }

    pub fn is_dive_officer(&self) -> bool {
        super::predicates::is_dive_officer(self)
    }

    /// Load the principal for `user_id`. A user that no longer exists cannot
    /// act, so it is reported as unauthenticated.
    pub async fn load(pool: &SqlitePool, user_id: Uuid) -> AppResult<Self> {
        let row = sqlx::query_as::<_, (Uuid, Uuid, Uuid, bool, bool)>(
            "SELECT u.id, u.club_id, c.region_id, u.is_staff, u.is_superuser FROM users u JOIN clubs c ON c.id = u.club_id WHERE u.id = ?",
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::unauthorized("user no longer exists"))?;

        let (id, club_id, region_id, is_staff, is_superuser) = row;

        let positions = sqlx::query_as::<_, (Uuid, i64)>("SELECT club_id, role FROM committee_positions WHERE user_id = ?")
            .bind(id)
            .fetch_all(pool)
            .await?
            .into_iter()
            .filter_map(|(club, code)| match CommitteeRole::from_code(code) {
                Some(role) => Some((club, role)),
                None => {
                    tracing::warn!(user_id = %id, code, "skipping committee position with unknown role");
                    None
                }
            });

        let regions_led = sqlx::query_scalar::<_, Uuid>("SELECT id FROM regions WHERE dive_officer_id = ?")
            .bind(id)
            .fetch_all(pool)
            .await?;

        Ok(Principal::new(id, club_id, region_id)
            .with_staff(is_staff)
            .with_superuser(is_superuser)
            .with_positions(positions)
            .with_regions_led(regions_led))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Principal {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth = AuthUser::from_request_parts(parts, state).await?;
        Principal::load(&state.pool, auth.user_id).await
    }
}

/// Attributes of the record an action targets. Absent attributes make the
/// predicates that need them fail closed.
#[derive(Debug, Clone, Default)]
pub struct ResourceContext {
    pub resource_id: Option<Uuid>,
    /// The user the record belongs to (or is)
    pub user_id: Option<Uuid>,
    /// The club the record belongs to (or is)
    pub club_id: Option<Uuid>,
    /// The region the record belongs to (or is)
    pub region_id: Option<Uuid>,
    pub creator_id: Option<Uuid>,
    pub organizer_id: Option<Uuid>,
    /// Organizer of the course a nested record hangs off
    pub course_organizer_id: Option<Uuid>,
}

impl ResourceContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resource(mut self, resource_id: Uuid) -> Self {
        self.resource_id = Some(resource_id);
        self
    }

    pub fn with_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_club(mut self, club_id: Uuid) -> Self {
        self.club_id = Some(club_id);
        self
    }

    pub fn with_region(mut self, region_id: Uuid) -> Self {
        self.region_id = Some(region_id);
        self
    }

    pub fn with_creator(mut self, creator_id: Uuid) -> Self {
        self.creator_id = Some(creator_id);
        self
    }

    pub fn with_organizer(mut self, organizer_id: Uuid) -> Self {
        self.organizer_id = Some(organizer_id);
        self
    }

    pub fn with_course_organizer(mut self, organizer_id: Uuid) -> Self {
        self.course_organizer_id = Some(organizer_id);
        self
    }
}
