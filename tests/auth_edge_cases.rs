mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;

use common::{TestApp, World, PASSWORD};

#[tokio::test]
async fn login_returns_token_and_own_profile() -> Result<()> {
    let app = TestApp::new().await?;
    let world = World::seed(&app).await?;

    let (status, body) = app
        .request(
            "POST",
            "/auth/login",
            None,
            Some(json!({ "email": "member.a@example.com", "password": PASSWORD })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK, "login failed: {}", body);

    let token = body["token"].as_str().expect("token");
    assert!(!token.is_empty());
    assert_eq!(body["user"]["id"], world.member_a.to_string());
    assert_eq!(body["user"]["club"]["id"], world.club_a.to_string());
    assert!(body["user"].get("current_membership_status").is_some());
    // own-profile projection does not carry administrative timestamps
    assert!(body["user"].get("next_renewal_due_date").is_none());

    let (status, me) = app.get("/users/me", token).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "member.a@example.com");

    Ok(())
}

#[tokio::test]
async fn wrong_password_and_unknown_email_are_unauthorized() -> Result<()> {
    let app = TestApp::new().await?;
    World::seed(&app).await?;

    let (status, body) = app
        .request(
            "POST",
            "/auth/login",
            None,
            Some(json!({ "email": "member.a@example.com", "password": "not-the-password" })),
        )
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    let (status, _) = app
        .request(
            "POST",
            "/auth/login",
            None,
            Some(json!({ "email": "nobody@example.com", "password": PASSWORD })),
        )
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn protected_routes_need_a_valid_token() -> Result<()> {
    let app = TestApp::new().await?;
    let world = World::seed(&app).await?;

    let (status, _) = app.request("GET", "/users/me", None, None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.request("GET", "/clubs", Some("garbage.token.value"), None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = app.token(world.member_a);
    let (status, body) = app.request("POST", "/auth/logout", Some(&token), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Logged out");

    Ok(())
}

#[tokio::test]
async fn token_for_deleted_user_is_rejected() -> Result<()> {
    let app = TestApp::new().await?;
    let world = World::seed(&app).await?;
    let token = app.token(world.member_b);

    sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(world.member_b)
        .execute(&app.pool)
        .await?;

    let (status, _) = app.get("/courses", &token).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    Ok(())
}
