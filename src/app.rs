use std::sync::Arc;

use axum::http::Method;
use axum::routing::{delete, get, post};
use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::authz::{Action, DefaultPolicyEvaluator, PolicyEvaluator, Principal, Resource, ResourceContext};
use crate::errors::{AppError, AppResult};
use crate::jwt::JwtConfig;
use crate::routes::{auth, certificates, clubs, courses, enrolments, health, qualifications, regions, users};

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub jwt: Arc<JwtConfig>,
    pub policy: Arc<dyn PolicyEvaluator>,
}

impl AppState {
    pub fn new(pool: SqlitePool, jwt: JwtConfig) -> Self {
        Self {
            pool,
            jwt: Arc::new(jwt),
            policy: Arc::new(DefaultPolicyEvaluator::default()),
        }
    }

    /// 403 unless the policy allows the action.
    pub async fn authorize(
        &self,
        principal: &Principal,
        resource: Resource,
        action: Action,
        ctx: &ResourceContext,
    ) -> AppResult<()> {
        if self.policy.can(principal, resource, action, ctx).await {
            Ok(())
        } else {
            Err(AppError::forbidden("you do not have permission to perform this action"))
        }
    }

    /// Like [`AppState::authorize`] but reports a denial as not found, for
    /// records whose existence should not leak.
    pub async fn authorize_or_hide(
        &self,
        principal: &Principal,
        resource: Resource,
        action: Action,
        ctx: &ResourceContext,
        what: &str,
    ) -> AppResult<()> {
        self.authorize(principal, resource, action, ctx)
            .await
            .map_err(|_| AppError::not_found(format!("{what} not found")))
    }
}

pub async fn create_app(pool: SqlitePool) -> Result<Router, AppError> {
    let jwt_config = JwtConfig::from_env()?;
    let state = AppState::new(pool, jwt_config);
    Ok(router(state))
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_origin(Any)
        .allow_headers(Any);

    let auth_routes = Router::new()
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout));

    let club_routes = Router::new()
        .route("/", get(clubs::list_clubs).post(clubs::create_club))
        .route("/dive-officers", get(clubs::dive_officers))
        .route(
            "/:id",
            get(clubs::get_club)
                .put(clubs::update_club)
                .patch(clubs::partial_update_club)
                .delete(clubs::delete_club),
        )
        .route("/:id/qualifications", get(clubs::club_qualifications))
        .route("/:id/users", get(clubs::club_users));

    let region_routes = Router::new()
        .route("/", get(regions::list_regions).post(regions::create_region))
        .route(
            "/:id",
            get(regions::get_region)
                .put(regions::update_region)
                .patch(regions::update_region)
                .delete(regions::delete_region),
        )
        .route("/:id/active-instructors", get(regions::active_instructors))
        .route("/:id/courses", get(regions::region_courses));

    let user_routes = Router::new()
        .route("/", get(users::list_users).post(users::create_user))
        .route("/me", get(users::me))
        .route(
            "/:id",
            get(users::get_user)
                .put(users::update_user)
                .patch(users::partial_update_user)
                .delete(users::delete_user),
        )
        .route("/:id/membership-status", get(users::membership_status))
        .route("/:id/qualifications", get(users::user_qualifications))
        .route("/:id/courses-organized", get(users::courses_organized))
        .route("/:id/courses-taught", get(users::courses_taught))
        .route(
            "/:id/committee-positions",
            get(users::list_committee_positions).post(users::adopt_committee_role),
        )
        .route("/:id/committee-positions/:position_id", delete(users::remove_committee_position));

    let certificate_routes = Router::new()
        .route("/", get(certificates::list_certificates).post(certificates::create_certificate))
        .route(
            "/:id",
            get(certificates::get_certificate)
                .put(certificates::update_certificate)
                .patch(certificates::update_certificate)
                .delete(certificates::delete_certificate),
        );

    let qualification_routes = Router::new()
        .route("/", get(qualifications::list_qualifications).post(qualifications::create_qualification))
        .route(
            "/:id",
            get(qualifications::get_qualification)
                .put(qualifications::update_qualification)
                .patch(qualifications::update_qualification)
                .delete(qualifications::delete_qualification),
        );

    let course_routes = Router::new()
        .route("/", get(courses::list_courses).post(courses::create_course))
        .route(
            "/:id",
            get(courses::get_course)
                .put(courses::update_course)
                .patch(courses::partial_update_course)
                .delete(courses::delete_course),
        )
        .route(
            "/:id/enrolments",
            get(enrolments::list_course_enrolments).post(enrolments::create_course_enrolment),
        )
        .route(
            "/:id/instructions",
            get(courses::list_instructions).post(courses::create_instruction),
        )
        .route("/:id/instructions/:instruction_id", delete(courses::delete_instruction));

    let enrolment_routes = Router::new()
        .route("/", get(enrolments::list_enrolments).post(enrolments::create_enrolment))
        .route("/:id", get(enrolments::get_enrolment).delete(enrolments::delete_enrolment));

    Router::new()
        .route("/api/health", get(health::health))
        .nest("/auth", auth_routes)
        .nest("/clubs", club_routes)
        .nest("/regions", region_routes)
        .nest("/users", user_routes)
        .nest("/certificates", certificate_routes)
        .nest("/qualifications", qualification_routes)
        .nest("/courses", course_routes)
        .nest("/courseenrolments", enrolment_routes)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
