use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::Value;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::visibility::fieldsets;
use crate::authz::{Action, Principal, Resource, ResourceContext};
use crate::db::{defaults, lookup};
use crate::errors::{AppError, AppResult};
use crate::membership::{Eligibility, MembershipStatus};
use crate::models::course::{Course, DbCourse, COURSE_COLUMNS};
use crate::models::region::{DbRegion, Region, RegionCreateRequest, RegionUpdateRequest, NATIONAL_REGION};
use crate::models::user::{DbUser, UserProfile, USER_COLUMNS};
use crate::utils::{parse_body, require_non_empty, utc_now};

use super::users::render_users;

#[utoipa::path(
    get,
    path = "/regions",
    tag = "Regions",
    responses((status = 200, description = "All regions", body = [Region]))
)]
pub async fn list_regions(State(state): State<AppState>, principal: Principal) -> AppResult<Json<Vec<Region>>> {
    state
        .authorize(&principal, Resource::Region, Action::List, &ResourceContext::new())
        .await?;

    let regions = sqlx::query_as::<_, DbRegion>(
        "SELECT id, name, dive_officer_id, created_at, updated_at FROM regions ORDER BY name",
    )
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(regions.into_iter().map(Region::from).collect()))
}

#[utoipa::path(
    get,
    path = "/regions/{id}",
    tag = "Regions",
    params(("id" = Uuid, Path, description = "Region id")),
    responses((status = 200, description = "Region detail", body = Region))
)]
pub async fn get_region(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Region>> {
    state
        .authorize(&principal, Resource::Region, Action::Retrieve, &ResourceContext::new().with_region(id))
        .await?;

    Ok(Json(lookup::fetch_region(&state.pool, id).await?.into()))
}

#[utoipa::path(
    post,
    path = "/regions",
    tag = "Regions",
    request_body = RegionCreateRequest,
    responses(
        (status = 201, description = "Region created", body = Region),
        (status = 409, description = "Region name already in use")
    )
)]
pub async fn create_region(
    State(state): State<AppState>,
    principal: Principal,
    Json(body): Json<Value>,
) -> AppResult<(StatusCode, Json<Region>)> {
    state
        .authorize(&principal, Resource::Region, Action::Create, &ResourceContext::new())
        .await?;

    let payload: RegionCreateRequest = parse_body(body)?;
    require_non_empty("name", &payload.name)?;
    if let Some(officer) = payload.dive_officer {
        ensure_user_exists(&state, officer).await?;
    }

    let id = Uuid::new_v4();
    let now = utc_now();
    sqlx::query("INSERT INTO regions (id, name, dive_officer_id, created_at, updated_at) VALUES (?, ?, ?, ?, ?)")
        .bind(id)
        .bind(payload.name.trim())
        .bind(payload.dive_officer)
        .bind(now)
        .bind(now)
        .execute(&state.pool)
        .await?;

    tracing::info!(region_id = %id, "region created");

    let region = lookup::fetch_region(&state.pool, id).await?;
    Ok((StatusCode::CREATED, Json(region.into())))
}

#[utoipa::path(
    put,
    path = "/regions/{id}",
    tag = "Regions",
    params(("id" = Uuid, Path, description = "Region id")),
    request_body = RegionUpdateRequest,
    responses((status = 200, description = "Region updated", body = Region))
)]
pub async fn update_region(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(body): Json<Value>,
) -> AppResult<Json<Region>> {
    state
        .authorize(&principal, Resource::Region, Action::Update, &ResourceContext::new().with_region(id))
        .await?;

    let mut region = lookup::fetch_region(&state.pool, id).await?;
    let payload: RegionUpdateRequest = parse_body(body)?;

    if let Some(name) = payload.name {
        require_non_empty("name", &name)?;
        if region.name == NATIONAL_REGION && name.trim() != NATIONAL_REGION {
            return Err(AppError::conflict("the National region cannot be renamed"));
        }
        region.name = name.trim().to_string();
    }
    if let Some(officer) = payload.dive_officer {
        if let Some(user_id) = officer {
            ensure_user_exists(&state, user_id).await?;
        }
        region.dive_officer_id = officer;
    }
    region.updated_at = utc_now();

    sqlx::query("UPDATE regions SET name = ?, dive_officer_id = ?, updated_at = ? WHERE id = ?")
        .bind(&region.name)
        .bind(region.dive_officer_id)
        .bind(region.updated_at)
        .bind(region.id)
        .execute(&state.pool)
        .await?;

    Ok(Json(region.into()))
}

/// Clubs and courses of the region move to the National region.
#[utoipa::path(
    delete,
    path = "/regions/{id}",
    tag = "Regions",
    params(("id" = Uuid, Path, description = "Region id")),
    responses(
        (status = 204, description = "Region deleted, clubs and courses reassigned"),
        (status = 409, description = "The National region cannot be deleted")
    )
)]
pub async fn delete_region(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state
        .authorize(&principal, Resource::Region, Action::Destroy, &ResourceContext::new().with_region(id))
        .await?;

    let region = lookup::fetch_region(&state.pool, id).await?;
    if region.name == NATIONAL_REGION {
        return Err(AppError::conflict("the National region cannot be deleted"));
    }

    let mut tx = state.pool.begin().await?;
    let national = defaults::ensure_national_region(&mut *tx).await?;
    let now = utc_now();

    let clubs = sqlx::query("UPDATE clubs SET region_id = ?, updated_at = ? WHERE region_id = ?")
        .bind(national)
        .bind(now)
        .bind(region.id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    let courses = sqlx::query("UPDATE courses SET region_id = ?, updated_at = ? WHERE region_id = ?")
        .bind(national)
        .bind(now)
        .bind(region.id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    sqlx::query("DELETE FROM regions WHERE id = ?")
        .bind(region.id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(region_id = %region.id, clubs, courses, "region deleted, records moved to National region");

    Ok(StatusCode::NO_CONTENT)
}

/// Members of the region's clubs who hold an instructor certificate and are
/// currently members.
#[utoipa::path(
    get,
    path = "/regions/{id}/active-instructors",
    tag = "Regions",
    params(("id" = Uuid, Path, description = "Region id")),
    responses(
        (status = 200, description = "Active instructors in the region", body = [UserProfile]),
        (status = 403, description = "Not an administrator, committee member in the region or its Regional Dive Officer")
    )
)]
pub async fn active_instructors(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<Value>>> {
    let region = lookup::fetch_region(&state.pool, id).await?;
    state
        .authorize(
            &principal,
            Resource::Region,
            Action::ActiveInstructors,
            &ResourceContext::new().with_region(region.id),
        )
        .await?;

    let columns = USER_COLUMNS
        .split(", ")
        .map(|column| format!("u.{}", column.trim()))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "SELECT DISTINCT {columns} FROM users u \
         JOIN clubs c ON c.id = u.club_id \
         JOIN qualifications q ON q.user_id = u.id \
         JOIN certificates cert ON cert.id = q.certificate_id \
         WHERE c.region_id = ? AND cert.is_instructor_certificate = 1 \
         ORDER BY u.last_name, u.first_name"
    );
    let instructors: Vec<DbUser> = sqlx::query_as::<_, DbUser>(&sql)
        .bind(region.id)
        .fetch_all(&state.pool)
        .await?
        .into_iter()
        .filter(|user| Eligibility::for_user(user).status() == MembershipStatus::Current)
        .collect();

    Ok(Json(render_users(&state.pool, &instructors, fieldsets::DEFAULT).await?))
}

#[utoipa::path(
    get,
    path = "/regions/{id}/courses",
    tag = "Regions",
    params(("id" = Uuid, Path, description = "Region id")),
    responses((status = 200, description = "Courses held in the region", body = [Course]))
)]
pub async fn region_courses(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<Course>>> {
    let region = lookup::fetch_region(&state.pool, id).await?;
    state
        .authorize(&principal, Resource::Region, Action::Courses, &ResourceContext::new().with_region(region.id))
        .await?;

    let sql = format!("SELECT {COURSE_COLUMNS} FROM courses WHERE region_id = ? ORDER BY datetime");
    let courses = sqlx::query_as::<_, DbCourse>(&sql)
        .bind(region.id)
        .fetch_all(&state.pool)
        .await?;

    Ok(Json(lookup::render_courses(&state.pool, courses).await?))
}

async fn ensure_user_exists(state: &AppState, user_id: Uuid) -> AppResult<()> {
    match lookup::find_user(&state.pool, user_id).await? {
        Some(_) => Ok(()),
        None => Err(AppError::validation("dive_officer", "no user with this id")),
    }
}
