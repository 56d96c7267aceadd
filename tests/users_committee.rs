mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;

use common::{ids, TestApp, World, DIVE_OFFICER};

#[tokio::test]
async fn user_list_is_scoped_to_dive_officers_club() -> Result<()> {
    let app = TestApp::new().await?;
    let world = World::seed(&app).await?;

    let (status, list) = app.get("/users", &app.token(world.officer_a)).await?;
    assert_eq!(status, StatusCode::OK);
    let listed = ids(&list);
    assert_eq!(listed.len(), 3);
    assert!(!listed.contains(&world.member_b.to_string()));

    let (_, all) = app.get("/users", &app.token(world.admin)).await?;
    assert_eq!(ids(&all).len(), 5);

    let (status, _) = app.get("/users", &app.token(world.member_a)).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    Ok(())
}

#[tokio::test]
async fn user_detail_outside_scope_is_not_found() -> Result<()> {
    let app = TestApp::new().await?;
    let world = World::seed(&app).await?;

    let (status, body) = app
        .get(&format!("/users/{}", world.member_b), &app.token(world.officer_a))
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND, "{}", body);

    let (status, body) = app
        .get(&format!("/users/{}", world.member_a), &app.token(world.member_a))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert!(body.get("next_renewal_due_date").is_some());

    let (status, _) = app
        .get(&format!("/users/{}", world.officer_a), &app.token(world.member_a))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, status_body) = app
        .get(&format!("/users/{}/membership-status", world.member_a), &app.token(world.member_a))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(status_body["current_membership_status"], "Current");
    assert_eq!(status_body["next_year_membership_status"], "Lapsed");
    assert!(status_body.get("email").is_none());

    Ok(())
}

#[tokio::test]
async fn dive_officer_creates_members_in_own_club() -> Result<()> {
    let app = TestApp::new().await?;
    let world = World::seed(&app).await?;

    let (status, body) = app
        .request(
            "POST",
            "/users",
            Some(&app.token(world.officer_a)),
            Some(json!({
                "first_name": "Sean",
                "last_name": "Murphy",
                "email": "sean@example.com",
                "club": world.club_b,
                "is_staff": true
            })),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED, "create failed: {}", body);
    assert_eq!(body["club"]["id"], world.club_a.to_string());
    assert_eq!(body["is_staff"], false);

    let (status, body) = app
        .request(
            "POST",
            "/users",
            Some(&app.token(world.admin)),
            Some(json!({ "first_name": "Sean", "last_name": "Again", "email": "sean@example.com" })),
        )
        .await?;
    assert_eq!(status, StatusCode::CONFLICT, "{}", body);

    let (status, body) = app
        .request(
            "POST",
            "/users",
            Some(&app.token(world.admin)),
            Some(json!({ "first_name": "Niamh", "last_name": "Kelly", "email": "niamh@example.com" })),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["club"]["name"], "National");

    let (status, _) = app
        .request(
            "POST",
            "/users",
            Some(&app.token(world.member_a)),
            Some(json!({ "first_name": "No", "last_name": "Way", "email": "noway@example.com" })),
        )
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    Ok(())
}

#[tokio::test]
async fn members_edit_own_profile_but_not_privileges() -> Result<()> {
    let app = TestApp::new().await?;
    let world = World::seed(&app).await?;
    let token = app.token(world.member_a);

    let (status, body) = app
        .request(
            "PATCH",
            &format!("/users/{}", world.member_a),
            Some(&token),
            Some(json!({ "phone_mobile": "087 123 4567", "is_staff": true, "club": world.club_b })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["phone_mobile"], "087 123 4567");
    assert_eq!(body["is_staff"], false);
    assert_eq!(body["club"]["id"], world.club_a.to_string());

    let (status, body) = app
        .request(
            "PATCH",
            &format!("/users/{}", world.member_a),
            Some(&token),
            Some(json!({ "gender": 42 })),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "gender");

    Ok(())
}

#[tokio::test]
async fn user_deletion_is_admin_only_and_blocked_by_courses() -> Result<()> {
    let app = TestApp::new().await?;
    let world = World::seed(&app).await?;

    let (status, _) = app
        .request("DELETE", &format!("/users/{}", world.member_a), Some(&app.token(world.officer_a)), None)
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let cert = app.certificate("Open Water", false).await?;
    app.course(cert, world.admin, world.officer_a, Some(world.region_a)).await?;

    let admin = app.token(world.admin);
    let (status, _) = app
        .request("DELETE", &format!("/users/{}", world.officer_a), Some(&admin), None)
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .request("DELETE", &format!("/users/{}", world.member_a), Some(&admin), None)
        .await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.get(&format!("/users/{}", world.member_a), &admin).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn adopting_a_role_twice_returns_same_position() -> Result<()> {
    let app = TestApp::new().await?;
    let world = World::seed(&app).await?;
    let admin = app.token(world.admin);
    let uri = format!("/users/{}/committee-positions", world.member_a);

    let (status, first) = app.request("POST", &uri, Some(&admin), Some(json!({ "role": DIVE_OFFICER }))).await?;
    assert_eq!(status, StatusCode::CREATED, "{}", first);
    assert_eq!(first["club"], world.club_a.to_string());

    let (status, second) = app.request("POST", &uri, Some(&admin), Some(json!({ "role": DIVE_OFFICER }))).await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["id"], second["id"]);

    let (status, body) = app.request("POST", &uri, Some(&admin), Some(json!({ "role": 99 }))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "role");

    // only administrators hand out roles
    let (status, _) = app
        .request("POST", &uri, Some(&app.token(world.officer_a)), Some(json!({ "role": 1 })))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // the member now acts as Dive Officer and sees the club roster
    let (status, list) = app.get("/users", &app.token(world.member_a)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&list).len(), 3);

    let (status, positions) = app.get(&uri, &app.token(world.member_a)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&positions).len(), 1);

    let position = first["id"].as_str().expect("position id");
    let (status, _) = app
        .request("DELETE", &format!("{}/{}", uri, position), Some(&admin), None)
        .await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.get("/users", &app.token(world.member_a)).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    Ok(())
}

#[tokio::test]
async fn user_qualifications_hidden_from_other_members() -> Result<()> {
    let app = TestApp::new().await?;
    let world = World::seed(&app).await?;
    let cert = app.certificate("Club Diver", false).await?;
    app.qualification(world.member_b, cert).await?;
    let uri = format!("/users/{}/qualifications", world.member_b);

    let (status, list) = app.get(&uri, &app.token(world.member_b)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&list).len(), 1);

    let (status, _) = app.get(&uri, &app.token(world.officer_b)).await?;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get(&uri, &app.token(world.officer_a)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.get(&uri, &app.token(world.member_a)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn qualification_detail_outside_scope_is_not_found() -> Result<()> {
    let app = TestApp::new().await?;
    let world = World::seed(&app).await?;
    let cert = app.certificate("Club Diver", false).await?;
    let qualification = app.qualification(world.member_b, cert).await?;
    let uri = format!("/qualifications/{}", qualification);

    let (status, body) = app.get(&uri, &app.token(world.member_b)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["id"], world.member_b.to_string());

    let (status, _) = app.get(&uri, &app.token(world.member_a)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, list) = app.get("/qualifications", &app.token(world.officer_a)).await?;
    assert_eq!(status, StatusCode::OK);
    assert!(ids(&list).is_empty());

    let (status, _) = app
        .request(
            "POST",
            "/qualifications",
            Some(&app.token(world.officer_b)),
            Some(json!({ "user": world.member_b, "certificate": cert })),
        )
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    Ok(())
}
