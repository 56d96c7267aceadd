#![allow(dead_code)]

use std::sync::OnceLock;

use anyhow::Result;
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::Utc;
use serde_json::Value;
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot`
use uuid::Uuid;

use dive_registry::app::{router, AppState};
use dive_registry::config::AppConfig;
use dive_registry::db;
use dive_registry::jwt::JwtConfig;
use dive_registry::utils::hash_password;

pub const PASSWORD: &str = "password123";

static PASSWORD_HASH: OnceLock<String> = OnceLock::new();

pub const DIVE_OFFICER: i64 = 0;
pub const CAPTAIN: i64 = 1;

pub struct TestApp {
    pub router: Router,
    pub pool: SqlitePool,
    jwt: JwtConfig,
    _dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Result<Self> {
        let dir = tempfile::tempdir()?;
        let db_path = dir.path().join("test.db");
        let config = AppConfig {
            database_url: format!("sqlite://{}", db_path.display()),
            port: 0,
        };
        let pool = db::init(&config).await?;

        let jwt = JwtConfig::new("test-secret", 1);
        let router = router(AppState::new(pool.clone(), jwt.clone()));

        Ok(Self {
            router,
            pool,
            jwt,
            _dir: dir,
        })
    }

    pub fn token(&self, user_id: Uuid) -> String {
        self.jwt.encode(user_id).expect("token")
    }

    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let req = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))?,
            None => builder.body(Body::empty())?,
        };

        let resp = self.router.clone().oneshot(req).await?;
        let status = resp.status();
        let bytes = body::to_bytes(resp.into_body(), 10_485_760).await?;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok((status, value))
    }

    pub async fn get(&self, uri: &str, token: &str) -> Result<(StatusCode, Value)> {
        self.request("GET", uri, Some(token), None).await
    }

    // -- seeding

    pub async fn region(&self, name: &str) -> Result<Uuid> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        sqlx::query("INSERT INTO regions (id, name, created_at, updated_at) VALUES (?, ?, ?, ?)")
            .bind(id)
            .bind(name)
            .bind(now)
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(id)
    }

    pub async fn lead_region(&self, region: Uuid, user: Uuid) -> Result<()> {
        sqlx::query("UPDATE regions SET dive_officer_id = ? WHERE id = ?")
            .bind(user)
            .bind(region)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn club(&self, name: &str, region: Uuid) -> Result<Uuid> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        sqlx::query("INSERT INTO clubs (id, name, region_id, created_at, updated_at) VALUES (?, ?, ?, ?, ?)")
            .bind(id)
            .bind(name)
            .bind(region)
            .bind(now)
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(id)
    }

    pub async fn user(&self, email: &str, club: Uuid) -> Result<Uuid> {
        self.insert_user(email, club, false).await
    }

    pub async fn admin(&self, email: &str, club: Uuid) -> Result<Uuid> {
        self.insert_user(email, club, true).await
    }

    async fn insert_user(&self, email: &str, club: Uuid, is_staff: bool) -> Result<Uuid> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let local = email.split('@').next().unwrap_or(email);
        sqlx::query(
            "INSERT INTO users (id, email, password_hash, first_name, last_name, club_id, member_since, membership_type, \
             is_staff, is_superuser, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, 0, ?, 0, ?, ?)",
        )
        .bind(id)
        .bind(email)
        .bind(PASSWORD_HASH.get_or_init(|| hash_password(PASSWORD).expect("hash")))
        .bind(local)
        .bind("Diver")
        .bind(club)
        .bind(now)
        .bind(is_staff)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(id)
    }

    pub async fn position(&self, user: Uuid, club: Uuid, role: i64) -> Result<()> {
        sqlx::query("INSERT INTO committee_positions (id, user_id, club_id, role, created_at) VALUES (?, ?, ?, ?, ?)")
            .bind(Uuid::new_v4())
            .bind(user)
            .bind(club)
            .bind(role)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn certificate(&self, name: &str, instructor: bool) -> Result<Uuid> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO certificates (id, name, is_instructor_certificate, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(name)
        .bind(instructor)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(id)
    }

    pub async fn qualification(&self, user: Uuid, certificate: Uuid) -> Result<Uuid> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO qualifications (id, user_id, certificate_id, date_granted, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(user)
        .bind(certificate)
        .bind(now)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(id)
    }

    pub async fn course(&self, certificate: Uuid, creator: Uuid, organizer: Uuid, region: Option<Uuid>) -> Result<Uuid> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO courses (id, certificate_id, creator_id, organizer_id, region_id, location, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(certificate)
        .bind(creator)
        .bind(organizer)
        .bind(region)
        .bind("Quarry")
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(id)
    }
}

/// Two regions, each with one club; a Dive Officer and a plain member in
/// each club, plus a staff administrator in the first club.
pub struct World {
    pub region_a: Uuid,
    pub region_b: Uuid,
    pub club_a: Uuid,
    pub club_b: Uuid,
    pub admin: Uuid,
    pub officer_a: Uuid,
    pub member_a: Uuid,
    pub officer_b: Uuid,
    pub member_b: Uuid,
}

impl World {
    pub async fn seed(app: &TestApp) -> Result<Self> {
        let region_a = app.region("Munster").await?;
        let region_b = app.region("Leinster").await?;
        let club_a = app.club("Cork Sub-Aqua", region_a).await?;
        let club_b = app.club("Dublin Sub-Aqua", region_b).await?;

        let admin = app.admin("admin@example.com", club_a).await?;
        let officer_a = app.user("officer.a@example.com", club_a).await?;
        let member_a = app.user("member.a@example.com", club_a).await?;
        let officer_b = app.user("officer.b@example.com", club_b).await?;
        let member_b = app.user("member.b@example.com", club_b).await?;

        app.position(officer_a, club_a, DIVE_OFFICER).await?;
        app.position(officer_b, club_b, DIVE_OFFICER).await?;

        Ok(Self {
            region_a,
            region_b,
            club_a,
            club_b,
            admin,
            officer_a,
            member_a,
            officer_b,
            member_b,
        })
    }
}

pub fn ids(list: &Value) -> Vec<String> {
    list.as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get("id").and_then(Value::as_str).map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
