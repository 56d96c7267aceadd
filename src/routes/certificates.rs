use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::Value;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{Action, Principal, Resource, ResourceContext};
use crate::db::lookup;
use crate::errors::{AppError, AppResult};
use crate::models::qualification::{Certificate, CertificateCreateRequest, CertificateUpdateRequest};
use crate::utils::{parse_body, require_non_empty, utc_now};

#[utoipa::path(
    get,
    path = "/certificates",
    tag = "Certificates",
    responses((status = 200, description = "All certificates", body = [Certificate]))
)]
pub async fn list_certificates(State(state): State<AppState>, principal: Principal) -> AppResult<Json<Vec<Certificate>>> {
    state
        .authorize(&principal, Resource::Certificate, Action::List, &ResourceContext::new())
        .await?;

    let certificates = sqlx::query_as::<_, Certificate>(
        "SELECT id, name, is_instructor_certificate, created_at, updated_at FROM certificates ORDER BY name",
    )
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(certificates))
}

#[utoipa::path(
    get,
    path = "/certificates/{id}",
    tag = "Certificates",
    params(("id" = Uuid, Path, description = "Certificate id")),
    responses((status = 200, description = "Certificate detail", body = Certificate))
)]
pub async fn get_certificate(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Certificate>> {
    state
        .authorize(&principal, Resource::Certificate, Action::Retrieve, &ResourceContext::new().with_resource(id))
        .await?;

    Ok(Json(lookup::fetch_certificate(&state.pool, id).await?))
}

#[utoipa::path(
    post,
    path = "/certificates",
    tag = "Certificates",
    request_body = CertificateCreateRequest,
    responses((status = 201, description = "Certificate created", body = Certificate))
)]
pub async fn create_certificate(
    State(state): State<AppState>,
    principal: Principal,
    Json(body): Json<Value>,
) -> AppResult<(StatusCode, Json<Certificate>)> {
    state
        .authorize(&principal, Resource::Certificate, Action::Create, &ResourceContext::new())
        .await?;

    let payload: CertificateCreateRequest = parse_body(body)?;
    require_non_empty("name", &payload.name)?;

    let id = Uuid::new_v4();
    let now = utc_now();
    sqlx::query(
        "INSERT INTO certificates (id, name, is_instructor_certificate, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(payload.name.trim())
    .bind(payload.is_instructor_certificate)
    .bind(now)
    .bind(now)
    .execute(&state.pool)
    .await?;

    let certificate = lookup::fetch_certificate(&state.pool, id).await?;
    Ok((StatusCode::CREATED, Json(certificate)))
}

#[utoipa::path(
    put,
    path = "/certificates/{id}",
    tag = "Certificates",
    params(("id" = Uuid, Path, description = "Certificate id")),
    request_body = CertificateUpdateRequest,
    responses((status = 200, description = "Certificate updated", body = Certificate))
)]
pub async fn update_certificate(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(body): Json<Value>,
) -> AppResult<Json<Certificate>> {
    state
        .authorize(&principal, Resource::Certificate, Action::Update, &ResourceContext::new().with_resource(id))
        .await?;

    let mut certificate = lookup::fetch_certificate(&state.pool, id).await?;
    let payload: CertificateUpdateRequest = parse_body(body)?;

    if let Some(name) = payload.name {
        require_non_empty("name", &name)?;
        certificate.name = name.trim().to_string();
    }
    if let Some(flag) = payload.is_instructor_certificate {
        certificate.is_instructor_certificate = flag;
    }
    certificate.updated_at = utc_now();

    sqlx::query("UPDATE certificates SET name = ?, is_instructor_certificate = ?, updated_at = ? WHERE id = ?")
        .bind(&certificate.name)
        .bind(certificate.is_instructor_certificate)
        .bind(certificate.updated_at)
        .bind(certificate.id)
        .execute(&state.pool)
        .await?;

    Ok(Json(certificate))
}

#[utoipa::path(
    delete,
    path = "/certificates/{id}",
    tag = "Certificates",
    params(("id" = Uuid, Path, description = "Certificate id")),
    responses(
        (status = 204, description = "Certificate deleted"),
        (status = 409, description = "Certificate is still used by a course")
    )
)]
pub async fn delete_certificate(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state
        .authorize(&principal, Resource::Certificate, Action::Destroy, &ResourceContext::new().with_resource(id))
        .await?;

    let affected = sqlx::query("DELETE FROM certificates WHERE id = ?")
        .bind(id)
        .execute(&state.pool)
        .await?
        .rows_affected();

    if affected == 0 {
        return Err(AppError::not_found("certificate not found"));
    }

    Ok(StatusCode::NO_CONTENT)
}
