use axum::extract::State;
use axum::Json;
use serde::Serialize;
use sqlx::query_scalar;
use utoipa::ToSchema;

use crate::app::AppState;
use crate::errors::AppResult;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: &'static str,
    pub version: &'static str,
    pub db_ok: bool,
    pub db_error: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/health",
    tag = "Health",
    security(()),
    responses((status = 200, description = "Service and database status", body = HealthResponse))
)]
pub async fn health(State(state): State<AppState>) -> AppResult<Json<HealthResponse>> {
    let version = env!("CARGO_PKG_VERSION");

    match query_scalar::<_, i64>("SELECT 1").fetch_one(&state.pool).await {
        Ok(_) => Ok(Json(HealthResponse {
            status: "ok",
            version,
            db_ok: true,
            db_error: None,
        })),
        Err(err) => {
            tracing::warn!(error = %err, "health check could not reach the database");
            Ok(Json(HealthResponse {
                status: "degraded",
                version,
                db_ok: false,
                db_error: Some(err.to_string()),
            }))
        }
    }
}
