mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;

use common::{TestApp, World};

#[tokio::test]
async fn certificates_are_readable_by_members_and_managed_by_admins() -> Result<()> {
    let app = TestApp::new().await?;
    let world = World::seed(&app).await?;
    let admin = app.token(world.admin);
    let member = app.token(world.member_a);

    let (status, _) = app
        .request("POST", "/certificates", Some(&member), Some(json!({ "name": "Rescue Diver" })))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .request("POST", "/certificates", Some(&admin), Some(json!({ "name": "   " })))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "name");

    let (status, created) = app
        .request("POST", "/certificates", Some(&admin), Some(json!({ "name": "Rescue Diver" })))
        .await?;
    assert_eq!(status, StatusCode::CREATED, "{}", created);
    assert_eq!(created["is_instructor_certificate"], false);
    let uri = format!("/certificates/{}", created["id"].as_str().unwrap_or_default());

    let (status, fetched) = app.get(&uri, &member).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["name"], "Rescue Diver");

    let (status, updated) = app
        .request("PATCH", &uri, Some(&admin), Some(json!({ "is_instructor_certificate": true })))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Rescue Diver");
    assert_eq!(updated["is_instructor_certificate"], true);

    let (status, _) = app.request("DELETE", &uri, Some(&member), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.request("DELETE", &uri, Some(&admin), None).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.get(&uri, &member).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn certificate_used_by_a_course_cannot_be_deleted() -> Result<()> {
    let app = TestApp::new().await?;
    let world = World::seed(&app).await?;
    let cert = app.certificate("Open Water", false).await?;
    app.course(cert, world.officer_a, world.officer_a, Some(world.region_a)).await?;

    let (status, body) = app
        .request("DELETE", &format!("/certificates/{}", cert), Some(&app.token(world.admin)), None)
        .await?;
    assert_eq!(status, StatusCode::CONFLICT, "{}", body);

    Ok(())
}
