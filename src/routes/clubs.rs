use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::Value;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use utoipa::IntoParams;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::visibility::{self, fieldsets, ClubTier};
use crate::authz::{Action, Principal, Resource, ResourceContext, Scope};
use crate::db::{defaults, lookup};
use crate::errors::{AppError, AppResult};
use crate::models::club::{ClubCreateRequest, ClubDetail, ClubUpdateRequest, DbClub, NATIONAL_CLUB};
use crate::models::committee::CommitteeRole;
use crate::models::qualification::{DbQualification, Qualification};
use crate::models::region::RegionSummary;
use crate::models::user::{DbUser, UserSummary, USER_COLUMNS};
use crate::utils::{body_object, parse_body, require_non_empty, to_json, utc_now};

use super::users::render_users;

#[utoipa::path(
    get,
    path = "/clubs",
    tag = "Clubs",
    responses(
        (status = 200, description = "Clubs, each limited to the caller's field tier", body = [ClubDetail]),
        (status = 403, description = "Not an administrator or Dive Officer")
    )
)]
pub async fn list_clubs(State(state): State<AppState>, principal: Principal) -> AppResult<Json<Vec<Value>>> {
    state
        .authorize(&principal, Resource::Club, Action::List, &ResourceContext::new())
        .await?;

    let sql = format!("SELECT {} FROM clubs ORDER BY name", lookup::CLUB_COLUMNS);
    let clubs = sqlx::query_as::<_, DbClub>(&sql).fetch_all(&state.pool).await?;

    let mut rendered = Vec::with_capacity(clubs.len());
    for club in clubs {
        let tier = ClubTier::for_club(&principal, club.id);
        rendered.push(render_club(&state.pool, club, tier).await?);
    }

    Ok(Json(rendered))
}

#[utoipa::path(
    post,
    path = "/clubs",
    tag = "Clubs",
    request_body = ClubCreateRequest,
    responses(
        (status = 201, description = "Club created", body = ClubDetail),
        (status = 409, description = "Club name already in use")
    )
)]
pub async fn create_club(
    State(state): State<AppState>,
    principal: Principal,
    Json(body): Json<Value>,
) -> AppResult<(StatusCode, Json<Value>)> {
    state
        .authorize(&principal, Resource::Club, Action::Create, &ResourceContext::new())
        .await?;

    let payload: ClubCreateRequest = parse_body(body)?;
    require_non_empty("name", &payload.name)?;

    let mut tx = state.pool.begin().await?;
    let region_id = match payload.region {
        Some(region_id) => {
            ensure_region_exists(&mut *tx, region_id).await?;
            region_id
        }
        None => defaults::ensure_national_region(&mut *tx).await?,
    };

    let id = Uuid::new_v4();
    let now = utc_now();
    sqlx::query(
        "INSERT INTO clubs (id, name, region_id, foundation_date, description, location, email, phone, website, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(payload.name.trim())
    .bind(region_id)
    .bind(payload.foundation_date)
    .bind(&payload.description)
    .bind(&payload.location)
    .bind(&payload.email)
    .bind(&payload.phone)
    .bind(&payload.website)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    tracing::info!(club_id = %id, "club created");

    let club = lookup::fetch_club(&state.pool, id).await?;
    let rendered = render_club(&state.pool, club, ClubTier::Admin).await?;
    Ok((StatusCode::CREATED, Json(rendered)))
}

#[utoipa::path(
    get,
    path = "/clubs/{id}",
    tag = "Clubs",
    params(("id" = Uuid, Path, description = "Club id")),
    responses((status = 200, description = "Club detail limited to the caller's field tier", body = ClubDetail))
)]
pub async fn get_club(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    state
        .authorize(&principal, Resource::Club, Action::Retrieve, &ResourceContext::new().with_club(id))
        .await?;

    let club = lookup::fetch_club(&state.pool, id).await?;
    let tier = ClubTier::for_club(&principal, id);
    Ok(Json(render_club(&state.pool, club, tier).await?))
}

#[utoipa::path(
    put,
    path = "/clubs/{id}",
    tag = "Clubs",
    params(("id" = Uuid, Path, description = "Club id")),
    request_body = ClubUpdateRequest,
    responses(
        (status = 200, description = "Club updated; fields the caller may not write are ignored", body = ClubDetail),
        (status = 403, description = "Not an administrator or this club's Dive Officer")
    )
)]
pub async fn update_club(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(body): Json<Value>,
) -> AppResult<Json<Value>> {
    apply_club_update(&state, &principal, id, body, Action::Update).await
}

#[utoipa::path(
    patch,
    path = "/clubs/{id}",
    tag = "Clubs",
    params(("id" = Uuid, Path, description = "Club id")),
    request_body = ClubUpdateRequest,
    responses((status = 200, description = "Club updated", body = ClubDetail))
)]
pub async fn partial_update_club(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(body): Json<Value>,
) -> AppResult<Json<Value>> {
    apply_club_update(&state, &principal, id, body, Action::PartialUpdate).await
}

async fn apply_club_update(
    state: &AppState,
    principal: &Principal,
    id: Uuid,
    body: Value,
    action: Action,
) -> AppResult<Json<Value>> {
    state
        .authorize(principal, Resource::Club, action, &ResourceContext::new().with_club(id))
        .await?;

    let mut club = lookup::fetch_club(&state.pool, id).await?;

    let allowed = visibility::club_write_fields(principal, id);
    let body = visibility::permitted_writes(body_object(body)?, allowed.iter().copied());
    let payload: ClubUpdateRequest = parse_body(Value::Object(body))?;

    if let Some(name) = payload.name {
        require_non_empty("name", &name)?;
        club.name = name.trim().to_string();
    }
    if let Some(region_id) = payload.region {
        let mut conn = state.pool.acquire().await?;
        ensure_region_exists(&mut *conn, region_id).await?;
        club.region_id = region_id;
    }
    if let Some(foundation_date) = payload.foundation_date {
        club.foundation_date = foundation_date;
    }
    if let Some(description) = payload.description {
        club.description = description;
    }
    if let Some(location) = payload.location {
        club.location = location;
    }
    if let Some(email) = payload.email {
        club.email = email;
    }
    if let Some(phone) = payload.phone {
        club.phone = phone;
    }
    if let Some(website) = payload.website {
        club.website = website;
    }

    club.updated_at = utc_now();

    sqlx::query(
        "UPDATE clubs SET name = ?, region_id = ?, foundation_date = ?, description = ?, location = ?, email = ?, phone = ?, website = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&club.name)
    .bind(club.region_id)
    .bind(club.foundation_date)
    .bind(&club.description)
    .bind(&club.location)
    .bind(&club.email)
    .bind(&club.phone)
    .bind(&club.website)
    .bind(club.updated_at)
    .bind(club.id)
    .execute(&state.pool)
    .await?;

    let tier = ClubTier::for_club(principal, id);
    Ok(Json(render_club(&state.pool, club, tier).await?))
}

/// Members move to the National club; their committee positions in the
/// deleted club go with it.
#[utoipa::path(
    delete,
    path = "/clubs/{id}",
    tag = "Clubs",
    params(("id" = Uuid, Path, description = "Club id")),
    responses(
        (status = 204, description = "Club deleted and members reassigned"),
        (status = 409, description = "The National club cannot be deleted")
    )
)]
pub async fn delete_club(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state
        .authorize(&principal, Resource::Club, Action::Destroy, &ResourceContext::new().with_club(id))
        .await?;

    let club = lookup::fetch_club(&state.pool, id).await?;
    if club.name == NATIONAL_CLUB {
        return Err(AppError::conflict("the National club cannot be deleted"));
    }

    let mut tx = state.pool.begin().await?;
    let national = defaults::ensure_national_club(&mut *tx).await?;

    let moved = sqlx::query("UPDATE users SET club_id = ?, updated_at = ? WHERE club_id = ?")
        .bind(national)
        .bind(utc_now())
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    sqlx::query("DELETE FROM committee_positions WHERE club_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM clubs WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(club_id = %id, members_moved = moved, "club deleted, members moved to National club");

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/clubs/{id}/qualifications",
    tag = "Clubs",
    params(("id" = Uuid, Path, description = "Club id")),
    responses(
        (status = 200, description = "Qualifications held by the club's members", body = [Qualification]),
        (status = 403, description = "Not an administrator or committee member of this club")
    )
)]
pub async fn club_qualifications(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<Qualification>>> {
    let club = lookup::fetch_club(&state.pool, id).await?;
    state
        .authorize(
            &principal,
            Resource::Club,
            Action::Qualifications,
            &ResourceContext::new().with_club(club.id).with_region(club.region_id),
        )
        .await?;

    let rows = sqlx::query_as::<_, DbQualification>(
        "SELECT q.id, q.user_id, q.certificate_id, q.date_granted, q.created_at, q.updated_at \
         FROM qualifications q JOIN users u ON u.id = q.user_id WHERE u.club_id = ? ORDER BY q.date_granted DESC",
    )
    .bind(club.id)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(lookup::render_qualifications(&state.pool, rows).await?))
}

#[utoipa::path(
    get,
    path = "/clubs/{id}/users",
    tag = "Clubs",
    params(("id" = Uuid, Path, description = "Club id")),
    responses((status = 200, description = "Members of the club visible to the caller", body = [UserSummary]))
)]
pub async fn club_users(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<Value>>> {
    state
        .authorize(&principal, Resource::Club, Action::Users, &ResourceContext::new().with_club(id))
        .await?;

    let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {USER_COLUMNS} FROM users WHERE club_id = "));
    qb.push_bind(id);
    Scope::for_principal(&principal).push_filter(&mut qb, "id", "club_id");
    qb.push(" ORDER BY last_name, first_name");

    let users = qb.build_query_as::<DbUser>().fetch_all(&state.pool).await?;
    Ok(Json(render_users(&state.pool, &users, fieldsets::DEFAULT).await?))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct DiveOfficerQuery {
    /// Administrators may narrow the list to one region
    pub region: Option<Uuid>,
}

#[utoipa::path(
    get,
    path = "/clubs/dive-officers",
    tag = "Clubs",
    params(DiveOfficerQuery),
    responses(
        (status = 200, description = "Contact details of club Dive Officers", body = [UserSummary]),
        (status = 403, description = "Not an administrator or Dive Officer")
    )
)]
pub async fn dive_officers(
    State(state): State<AppState>,
    principal: Principal,
    Query(query): Query<DiveOfficerQuery>,
) -> AppResult<Json<Vec<Value>>> {
    state
        .authorize(&principal, Resource::Club, Action::DiveOfficers, &ResourceContext::new())
        .await?;

    // Dive Officers only see their own region
    let region = if principal.is_admin() {
        query.region
    } else {
        Some(principal.region_id)
    };

    let columns = USER_COLUMNS
        .split(", ")
        .map(|column| format!("u.{}", column.trim()))
        .collect::<Vec<_>>()
        .join(", ");
    let mut qb = QueryBuilder::<Sqlite>::new(format!(
        "SELECT DISTINCT {columns} FROM users u \
         JOIN committee_positions cp ON cp.user_id = u.id AND cp.club_id = u.club_id \
         JOIN clubs c ON c.id = u.club_id WHERE cp.role = "
    ));
    qb.push_bind(CommitteeRole::DiveOfficer.code());
    if let Some(region) = region {
        qb.push(" AND c.region_id = ").push_bind(region);
    }
    qb.push(" ORDER BY u.last_name, u.first_name");

    let officers = qb.build_query_as::<DbUser>().fetch_all(&state.pool).await?;
    Ok(Json(render_users(&state.pool, &officers, fieldsets::CONTACT_DETAILS).await?))
}

async fn render_club(pool: &SqlitePool, club: DbClub, tier: ClubTier) -> AppResult<Value> {
    let region = lookup::fetch_region(pool, club.region_id).await?;

    let users = if tier.includes_members() {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE club_id = ? ORDER BY last_name, first_name");
        sqlx::query_as::<_, DbUser>(&sql)
            .bind(club.id)
            .fetch_all(pool)
            .await?
            .iter()
            .map(UserSummary::from)
            .collect()
    } else {
        Vec::new()
    };

    let detail = ClubDetail {
        id: club.id,
        name: club.name,
        region: RegionSummary::from(&region),
        description: club.description,
        location: club.location,
        email: club.email,
        phone: club.phone,
        website: club.website,
        foundation_date: club.foundation_date,
        users,
        created_at: club.created_at,
        updated_at: club.updated_at,
    };

    Ok(visibility::project(&to_json(&detail)?, tier.fields()))
}

async fn ensure_region_exists(conn: &mut sqlx::SqliteConnection, region_id: Uuid) -> AppResult<()> {
    let exists: Option<Uuid> = sqlx::query_scalar("SELECT id FROM regions WHERE id = ?")
        .bind(region_id)
        .fetch_optional(&mut *conn)
        .await?;

    match exists {
        Some(_) => Ok(()),
        None => Err(AppError::validation("region", "no region with this id")),
    }
}
