use anyhow::Result;
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use serde_json::Value;
use tempfile::tempdir;
use tower::util::ServiceExt; // for `oneshot`

use dive_registry::config::AppConfig;
use dive_registry::{create_app, db};

#[tokio::test]
async fn health_endpoint_reports_db_ok() -> Result<()> {
    let dir = tempdir()?;
    let config = AppConfig {
        database_url: format!("sqlite://{}", dir.path().join("test.db").display()),
        port: 0,
    };
    let pool = db::init(&config).await?;

    std::env::set_var("JWT_SECRET", "test-secret");
    let app = create_app(pool.clone()).await?;

    let req = Request::builder()
        .method("GET")
        .uri("/api/health")
        .body(Body::empty())?;

    let resp: Response = app.oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::OK, "health endpoint did not return 200");

    let body_bytes = body::to_bytes(resp.into_body(), 10_485_760).await?;
    let v: Value = serde_json::from_slice(&body_bytes)?;
    assert_eq!(v["status"], "ok");
    assert_eq!(v["db_ok"], true, "expected db_ok: true, got: {}", v);

    Ok(())
}
