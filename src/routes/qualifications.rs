use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::Value;
use sqlx::{QueryBuilder, Sqlite};
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{Action, Principal, Resource, ResourceContext, Scope};
use crate::db::lookup;
use crate::errors::{AppError, AppResult};
use crate::models::qualification::{DbQualification, Qualification, QualificationCreateRequest, QualificationUpdateRequest};
use crate::utils::{parse_body, utc_now};

const SELECT_SCOPED: &str = "SELECT q.id, q.user_id, q.certificate_id, q.date_granted, q.created_at, q.updated_at \
     FROM qualifications q JOIN users u ON u.id = q.user_id WHERE 1 = 1";

#[utoipa::path(
    get,
    path = "/qualifications",
    tag = "Qualifications",
    responses((status = 200, description = "Qualifications visible to the caller, newest first", body = [Qualification]))
)]
pub async fn list_qualifications(
    State(state): State<AppState>,
    principal: Principal,
) -> AppResult<Json<Vec<Qualification>>> {
    state
        .authorize(&principal, Resource::Qualification, Action::List, &ResourceContext::new())
        .await?;

    let mut qb = QueryBuilder::<Sqlite>::new(SELECT_SCOPED);
    Scope::for_principal(&principal).push_filter(&mut qb, "q.user_id", "u.club_id");
    qb.push(" ORDER BY q.date_granted DESC");

    let rows = qb.build_query_as::<DbQualification>().fetch_all(&state.pool).await?;
    Ok(Json(lookup::render_qualifications(&state.pool, rows).await?))
}

/// Qualifications outside the caller's scope are reported as not found.
#[utoipa::path(
    get,
    path = "/qualifications/{id}",
    tag = "Qualifications",
    params(("id" = Uuid, Path, description = "Qualification id")),
    responses(
        (status = 200, description = "Qualification detail", body = Qualification),
        (status = 404, description = "No such qualification within the caller's reach")
    )
)]
pub async fn get_qualification(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Qualification>> {
    state
        .authorize(&principal, Resource::Qualification, Action::Retrieve, &ResourceContext::new().with_resource(id))
        .await?;

    let mut qb = QueryBuilder::<Sqlite>::new(SELECT_SCOPED);
    qb.push(" AND q.id = ").push_bind(id);
    Scope::for_principal(&principal).push_filter(&mut qb, "q.user_id", "u.club_id");

    let row = qb
        .build_query_as::<DbQualification>()
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| AppError::not_found("qualification not found"))?;

    Ok(Json(lookup::render_qualification(&state.pool, row).await?))
}

#[utoipa::path(
    post,
    path = "/qualifications",
    tag = "Qualifications",
    request_body = QualificationCreateRequest,
    responses((status = 201, description = "Qualification granted", body = Qualification))
)]
pub async fn create_qualification(
    State(state): State<AppState>,
    principal: Principal,
    Json(body): Json<Value>,
) -> AppResult<(StatusCode, Json<Qualification>)> {
    state
        .authorize(&principal, Resource::Qualification, Action::Create, &ResourceContext::new())
        .await?;

    let payload: QualificationCreateRequest = parse_body(body)?;
    ensure_references(&state, Some(payload.user), Some(payload.certificate)).await?;

    let id = Uuid::new_v4();
    let now = utc_now();
    sqlx::query(
        "INSERT INTO qualifications (id, user_id, certificate_id, date_granted, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(payload.user)
    .bind(payload.certificate)
    .bind(payload.date_granted.unwrap_or(now))
    .bind(now)
    .bind(now)
    .execute(&state.pool)
    .await?;

    tracing::info!(qualification_id = %id, user_id = %payload.user, certificate_id = %payload.certificate, "qualification granted");

    let row = fetch_qualification(&state, id).await?;
    Ok((StatusCode::CREATED, Json(lookup::render_qualification(&state.pool, row).await?)))
}

#[utoipa::path(
    put,
    path = "/qualifications/{id}",
    tag = "Qualifications",
    params(("id" = Uuid, Path, description = "Qualification id")),
    request_body = QualificationUpdateRequest,
    responses((status = 200, description = "Qualification updated", body = Qualification))
)]
pub async fn update_qualification(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(body): Json<Value>,
) -> AppResult<Json<Qualification>> {
    state
        .authorize(&principal, Resource::Qualification, Action::Update, &ResourceContext::new().with_resource(id))
        .await?;

    let mut row = fetch_qualification(&state, id).await?;
    let payload: QualificationUpdateRequest = parse_body(body)?;
    ensure_references(&state, payload.user, payload.certificate).await?;

    if let Some(user_id) = payload.user {
        row.user_id = user_id;
    }
    if let Some(certificate_id) = payload.certificate {
        row.certificate_id = certificate_id;
    }
    if let Some(date_granted) = payload.date_granted {
        row.date_granted = date_granted;
    }
    row.updated_at = utc_now();

    sqlx::query("UPDATE qualifications SET user_id = ?, certificate_id = ?, date_granted = ?, updated_at = ? WHERE id = ?")
        .bind(row.user_id)
        .bind(row.certificate_id)
        .bind(row.date_granted)
        .bind(row.updated_at)
        .bind(row.id)
        .execute(&state.pool)
        .await?;

    Ok(Json(lookup::render_qualification(&state.pool, row).await?))
}

#[utoipa::path(
    delete,
    path = "/qualifications/{id}",
    tag = "Qualifications",
    params(("id" = Uuid, Path, description = "Qualification id")),
    responses((status = 204, description = "Qualification revoked"))
)]
pub async fn delete_qualification(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state
        .authorize(&principal, Resource::Qualification, Action::Destroy, &ResourceContext::new().with_resource(id))
        .await?;

    let affected = sqlx::query("DELETE FROM qualifications WHERE id = ?")
        .bind(id)
        .execute(&state.pool)
        .await?
        .rows_affected();

    if affected == 0 {
        return Err(AppError::not_found("qualification not found"));
    }

    Ok(StatusCode::NO_CONTENT)
}

async fn fetch_qualification(state: &AppState, id: Uuid) -> AppResult<DbQualification> {
    sqlx::query_as::<_, DbQualification>(
        "SELECT id, user_id, certificate_id, date_granted, created_at, updated_at FROM qualifications WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::not_found("qualification not found"))
}

async fn ensure_references(state: &AppState, user: Option<Uuid>, certificate: Option<Uuid>) -> AppResult<()> {
    if let Some(user_id) = user {
        if lookup::find_user(&state.pool, user_id).await?.is_none() {
            return Err(AppError::validation("user", "no user with this id"));
        }
    }
    if let Some(certificate_id) = certificate {
        if lookup::find_certificate(&state.pool, certificate_id).await?.is_none() {
            return Err(AppError::validation("certificate", "no certificate with this id"));
        }
    }
    Ok(())
}
