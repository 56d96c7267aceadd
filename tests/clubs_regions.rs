mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;
use uuid::Uuid;

use common::{ids, TestApp, World, CAPTAIN};

#[tokio::test]
async fn club_detail_fields_follow_caller_tier() -> Result<()> {
    let app = TestApp::new().await?;
    let world = World::seed(&app).await?;
    let uri = format!("/clubs/{}", world.club_a);

    let (status, base) = app.get(&uri, &app.token(world.member_a)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(base["name"], "Cork Sub-Aqua");
    assert_eq!(base["region"]["name"], "Munster");
    assert!(base.get("users").is_none());
    assert!(base.get("foundation_date").is_none());

    let (_, officer) = app.get(&uri, &app.token(world.officer_a)).await?;
    assert_eq!(ids(&officer["users"]).len(), 3);
    assert!(officer.get("created_at").is_none());

    // another club's Dive Officer only gets the base fields
    let (_, foreign) = app.get(&uri, &app.token(world.officer_b)).await?;
    assert!(foreign.get("users").is_none());

    let (_, admin) = app.get(&uri, &app.token(world.admin)).await?;
    assert!(admin.get("created_at").is_some());
    assert!(admin.get("users").is_some());

    Ok(())
}

#[tokio::test]
async fn club_list_needs_admin_or_dive_officer() -> Result<()> {
    let app = TestApp::new().await?;
    let world = World::seed(&app).await?;

    let (status, _) = app.get("/clubs", &app.token(world.member_a)).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, list) = app.get("/clubs", &app.token(world.officer_a)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&list).len(), 2);

    Ok(())
}

#[tokio::test]
async fn dive_officer_edits_only_contact_fields_of_own_club() -> Result<()> {
    let app = TestApp::new().await?;
    let world = World::seed(&app).await?;
    let uri = format!("/clubs/{}", world.club_a);

    let (status, body) = app
        .request(
            "PATCH",
            &uri,
            Some(&app.token(world.officer_a)),
            Some(json!({ "name": "Renamed", "description": "Shore dives every Sunday" })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK, "update failed: {}", body);
    assert_eq!(body["name"], "Cork Sub-Aqua");
    assert_eq!(body["description"], "Shore dives every Sunday");

    let (status, _) = app
        .request(
            "PUT",
            &format!("/clubs/{}", world.club_b),
            Some(&app.token(world.officer_a)),
            Some(json!({ "description": "not mine" })),
        )
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .request("PATCH", &uri, Some(&app.token(world.admin)), Some(json!({ "name": "Cork SAC" })))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Cork SAC");

    Ok(())
}

#[tokio::test]
async fn dive_officer_update_keeps_name_and_region() -> Result<()> {
    let app = TestApp::new().await?;
    let world = World::seed(&app).await?;

    let (status, body) = app
        .request(
            "PUT",
            &format!("/clubs/{}", world.club_a),
            Some(&app.token(world.officer_a)),
            Some(json!({ "name": "Renamed", "foundation_date": "1975-06-01", "region": world.region_b })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK, "update failed: {}", body);
    assert_eq!(body["foundation_date"], "1975-06-01");
    assert_eq!(body["name"], "Cork Sub-Aqua");
    assert_eq!(body["region"]["id"], world.region_a.to_string());

    Ok(())
}

#[tokio::test]
async fn created_club_defaults_to_national_region() -> Result<()> {
    let app = TestApp::new().await?;
    let world = World::seed(&app).await?;
    let token = app.token(world.admin);

    let (status, body) = app
        .request("POST", "/clubs", Some(&token), Some(json!({ "name": "Galway Sub-Aqua" })))
        .await?;
    assert_eq!(status, StatusCode::CREATED, "create failed: {}", body);
    assert_eq!(body["region"]["name"], "National");

    let (status, body) = app
        .request("POST", "/clubs", Some(&token), Some(json!({ "name": "Galway Sub-Aqua" })))
        .await?;
    assert_eq!(status, StatusCode::CONFLICT, "duplicate name: {}", body);

    let (status, body) = app
        .request(
            "POST",
            "/clubs",
            Some(&token),
            Some(json!({ "name": "Sligo", "region": Uuid::new_v4() })),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "region");

    Ok(())
}

#[tokio::test]
async fn deleting_club_moves_members_to_national_club() -> Result<()> {
    let app = TestApp::new().await?;
    let world = World::seed(&app).await?;
    let token = app.token(world.admin);

    let (status, _) = app
        .request("DELETE", &format!("/clubs/{}", world.club_b), Some(&token), None)
        .await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, member) = app.get(&format!("/users/{}", world.member_b), &token).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(member["club"]["name"], "National");

    // the old club's Dive Officer position went with the club
    let positions: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM committee_positions WHERE user_id = ?")
        .bind(world.officer_b)
        .fetch_one(&app.pool)
        .await?;
    assert_eq!(positions, 0);

    let national = member["club"]["id"].as_str().expect("club id").to_string();
    let (status, body) = app
        .request("DELETE", &format!("/clubs/{}", national), Some(&token), None)
        .await?;
    assert_eq!(status, StatusCode::CONFLICT, "{}", body);

    Ok(())
}

#[tokio::test]
async fn dive_officer_cannot_delete_clubs() -> Result<()> {
    let app = TestApp::new().await?;
    let world = World::seed(&app).await?;

    let (status, _) = app
        .request("DELETE", &format!("/clubs/{}", world.club_a), Some(&app.token(world.officer_a)), None)
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    Ok(())
}

#[tokio::test]
async fn club_users_are_limited_to_callers_scope() -> Result<()> {
    let app = TestApp::new().await?;
    let world = World::seed(&app).await?;

    let (status, own) = app
        .get(&format!("/clubs/{}/users", world.club_a), &app.token(world.officer_a))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&own).len(), 3);

    let (status, foreign) = app
        .get(&format!("/clubs/{}/users", world.club_b), &app.token(world.officer_a))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert!(ids(&foreign).is_empty());

    let (status, _) = app
        .get(&format!("/clubs/{}/users", world.club_a), &app.token(world.member_a))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    Ok(())
}

#[tokio::test]
async fn dive_officer_list_is_regional_for_dive_officers() -> Result<()> {
    let app = TestApp::new().await?;
    let world = World::seed(&app).await?;

    let (status, list) = app.get("/clubs/dive-officers", &app.token(world.officer_a)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&list), vec![world.officer_a.to_string()]);
    assert!(list[0].get("phone_mobile").is_some());
    assert!(list[0].get("club").is_none());

    let (_, all) = app.get("/clubs/dive-officers", &app.token(world.admin)).await?;
    assert_eq!(ids(&all).len(), 2);

    let (_, filtered) = app
        .get(&format!("/clubs/dive-officers?region={}", world.region_b), &app.token(world.admin))
        .await?;
    assert_eq!(ids(&filtered), vec![world.officer_b.to_string()]);

    Ok(())
}

#[tokio::test]
async fn club_qualifications_need_committee_membership() -> Result<()> {
    let app = TestApp::new().await?;
    let world = World::seed(&app).await?;
    let captain = app.user("captain.a@example.com", world.club_a).await?;
    app.position(captain, world.club_a, CAPTAIN).await?;

    let cert = app.certificate("Club Diver", false).await?;
    app.qualification(world.member_a, cert).await?;
    let uri = format!("/clubs/{}/qualifications", world.club_a);

    let (status, list) = app.get(&uri, &app.token(captain)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&list).len(), 1);
    assert_eq!(list[0]["certificate"]["name"], "Club Diver");

    let (status, _) = app.get(&uri, &app.token(world.member_a)).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.get(&uri, &app.token(world.officer_b)).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    Ok(())
}

#[tokio::test]
async fn deleting_region_moves_clubs_and_courses_to_national() -> Result<()> {
    let app = TestApp::new().await?;
    let world = World::seed(&app).await?;
    let token = app.token(world.admin);

    let cert = app.certificate("Open Water", false).await?;
    let course = app
        .course(cert, world.officer_b, world.officer_b, Some(world.region_b))
        .await?;

    let (status, _) = app
        .request("DELETE", &format!("/regions/{}", world.region_b), Some(&token), None)
        .await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, club) = app.get(&format!("/clubs/{}", world.club_b), &token).await?;
    assert_eq!(club["region"]["name"], "National");

    let (_, course) = app.get(&format!("/courses/{}", course), &token).await?;
    assert_eq!(course["region"]["name"], "National");

    let national = club["region"]["id"].as_str().expect("region id").to_string();
    let (status, _) = app
        .request("DELETE", &format!("/regions/{}", national), Some(&token), None)
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .request("PATCH", &format!("/regions/{}", national), Some(&token), Some(json!({ "name": "Elsewhere" })))
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    Ok(())
}

#[tokio::test]
async fn active_instructors_for_committee_and_regional_officer() -> Result<()> {
    let app = TestApp::new().await?;
    let world = World::seed(&app).await?;

    let instructor_cert = app.certificate("Instructor", true).await?;
    let diver_cert = app.certificate("Club Diver", false).await?;
    app.qualification(world.officer_a, instructor_cert).await?;
    app.qualification(world.member_a, diver_cert).await?;
    // an instructor in another region is not listed
    app.qualification(world.officer_b, instructor_cert).await?;

    let uri = format!("/regions/{}/active-instructors", world.region_a);

    let (status, list) = app.get(&uri, &app.token(world.officer_a)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&list), vec![world.officer_a.to_string()]);

    let (status, _) = app.get(&uri, &app.token(world.member_a)).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // committee of another region is refused until they lead this one
    let (status, _) = app.get(&uri, &app.token(world.officer_b)).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    app.lead_region(world.region_a, world.officer_b).await?;
    let (status, _) = app.get(&uri, &app.token(world.officer_b)).await?;
    assert_eq!(status, StatusCode::OK);

    Ok(())
}
