use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::Value;
use sqlx::{QueryBuilder, Sqlite};
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{predicates, Action, Principal, Resource, ResourceContext, Scope};
use crate::db::lookup;
use crate::errors::{AppError, AppResult};
use crate::models::course::{CourseEnrolment, EnrolmentCreateRequest};
use crate::utils::{parse_body, utc_now};

const ENROLMENT_SELECT: &str = "SELECT e.id, e.user_id, e.course_id, e.recommended_by_dive_officer, e.created_at, e.updated_at \
     FROM course_enrolments e JOIN users u ON u.id = e.user_id WHERE 1 = 1";

/// Enrolments are only listed per course.
#[utoipa::path(
    get,
    path = "/courseenrolments",
    tag = "Enrolments",
    responses((status = 405, description = "Use /courses/{id}/enrolments"))
)]
pub async fn list_enrolments(_principal: Principal) -> AppResult<Json<Vec<CourseEnrolment>>> {
    Err(AppError::method_not_allowed("enrolments are listed per course"))
}

#[utoipa::path(
    get,
    path = "/courses/{id}/enrolments",
    tag = "Enrolments",
    params(("id" = Uuid, Path, description = "Course id")),
    responses((status = 200, description = "Enrolments on the course visible to the caller", body = [CourseEnrolment]))
)]
pub async fn list_course_enrolments(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<CourseEnrolment>>> {
    let course = lookup::fetch_course(&state.pool, id).await?;
    state
        .authorize(
            &principal,
            Resource::CourseEnrolment,
            Action::List,
            &ResourceContext::new().with_resource(course.id).with_course_organizer(course.organizer_id),
        )
        .await?;

    let mut qb = QueryBuilder::<Sqlite>::new(ENROLMENT_SELECT);
    qb.push(" AND e.course_id = ").push_bind(course.id);
    Scope::for_principal(&principal).push_filter(&mut qb, "e.user_id", "u.club_id");
    qb.push(" ORDER BY e.created_at");

    let rows = qb.build_query_as::<CourseEnrolment>().fetch_all(&state.pool).await?;
    Ok(Json(rows))
}

#[utoipa::path(
    post,
    path = "/courseenrolments",
    tag = "Enrolments",
    request_body = EnrolmentCreateRequest,
    responses(
        (status = 201, description = "User enrolled", body = CourseEnrolment),
        (status = 403, description = "Members may only enrol themselves"),
        (status = 404, description = "User outside the Dive Officer's club"),
        (status = 409, description = "Already enrolled")
    )
)]
pub async fn create_enrolment(
    State(state): State<AppState>,
    principal: Principal,
    Json(body): Json<Value>,
) -> AppResult<(StatusCode, Json<CourseEnrolment>)> {
    let payload: EnrolmentCreateRequest = parse_body(body)?;
    let course_id = payload
        .course
        .ok_or_else(|| AppError::validation("course", "this field is required"))?;
    enrol(&state, &principal, course_id, payload).await
}

#[utoipa::path(
    post,
    path = "/courses/{id}/enrolments",
    tag = "Enrolments",
    params(("id" = Uuid, Path, description = "Course id")),
    request_body = EnrolmentCreateRequest,
    responses((status = 201, description = "User enrolled", body = CourseEnrolment))
)]
pub async fn create_course_enrolment(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(body): Json<Value>,
) -> AppResult<(StatusCode, Json<CourseEnrolment>)> {
    let payload: EnrolmentCreateRequest = parse_body(body)?;
    enrol(&state, &principal, id, payload).await
}

/// A Dive Officer looks the member up within their own club, so members of
/// other clubs are not found. Plain members may only enrol themselves.
async fn enrol(
    state: &AppState,
    principal: &Principal,
    course_id: Uuid,
    payload: EnrolmentCreateRequest,
) -> AppResult<(StatusCode, Json<CourseEnrolment>)> {
    let target = lookup::find_user(&state.pool, payload.user).await?;

    if principal.is_dive_officer() && !principal.is_admin() {
        let in_club = target
            .as_ref()
            .is_some_and(|user| Scope::Club(principal.club_id).admits(user.id, user.club_id));
        if !in_club {
            return Err(AppError::not_found("user not found"));
        }
    }

    let mut ctx = ResourceContext::new().with_user(payload.user);
    if let Some(user) = &target {
        ctx = ctx.with_club(user.club_id);
    }
    state
        .authorize(principal, Resource::CourseEnrolment, Action::Create, &ctx)
        .await?;

    let target = target.ok_or_else(|| AppError::validation("user", "no user with this id"))?;
    let course = lookup::fetch_course(&state.pool, course_id)
        .await
        .map_err(|_| AppError::validation("course", "no course with this id"))?;

    // Only an administrator or the member's Dive Officer can vouch for them
    let recommended = payload.recommended_by_dive_officer
        && (principal.is_admin() || predicates::has_as_dive_officer(principal, Some(target.club_id)));

    let id = Uuid::new_v4();
    let now = utc_now();
    sqlx::query(
        "INSERT INTO course_enrolments (id, user_id, course_id, recommended_by_dive_officer, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(target.id)
    .bind(course.id)
    .bind(recommended)
    .bind(now)
    .bind(now)
    .execute(&state.pool)
    .await?;

    tracing::info!(enrolment_id = %id, user_id = %target.id, course_id = %course.id, "user enrolled");

    let enrolment = fetch_enrolment(state, principal, id).await?;
    Ok((StatusCode::CREATED, Json(enrolment)))
}

#[utoipa::path(
    get,
    path = "/courseenrolments/{id}",
    tag = "Enrolments",
    params(("id" = Uuid, Path, description = "Enrolment id")),
    responses(
        (status = 200, description = "Enrolment detail", body = CourseEnrolment),
        (status = 404, description = "No such enrolment within the caller's reach")
    )
)]
pub async fn get_enrolment(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> AppResult<Json<CourseEnrolment>> {
    state
        .authorize(&principal, Resource::CourseEnrolment, Action::Retrieve, &ResourceContext::new().with_resource(id))
        .await?;

    Ok(Json(fetch_enrolment(&state, &principal, id).await?))
}

#[utoipa::path(
    delete,
    path = "/courseenrolments/{id}",
    tag = "Enrolments",
    params(("id" = Uuid, Path, description = "Enrolment id")),
    responses((status = 204, description = "Enrolment withdrawn"))
)]
pub async fn delete_enrolment(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let enrolment = fetch_enrolment(&state, &principal, id).await?;
    let member = lookup::fetch_user(&state.pool, enrolment.user).await?;

    let ctx = ResourceContext::new()
        .with_resource(enrolment.id)
        .with_user(member.id)
        .with_club(member.club_id);
    state
        .authorize(&principal, Resource::CourseEnrolment, Action::Destroy, &ctx)
        .await?;

    sqlx::query("DELETE FROM course_enrolments WHERE id = ?")
        .bind(enrolment.id)
        .execute(&state.pool)
        .await?;

    tracing::info!(enrolment_id = %enrolment.id, user_id = %member.id, "enrolment withdrawn");

    Ok(StatusCode::NO_CONTENT)
}

async fn fetch_enrolment(state: &AppState, principal: &Principal, id: Uuid) -> AppResult<CourseEnrolment> {
    let mut qb = QueryBuilder::<Sqlite>::new(ENROLMENT_SELECT);
    qb.push(" AND e.id = ").push_bind(id);
    Scope::for_principal(principal).push_filter(&mut qb, "e.user_id", "u.club_id");

    qb.build_query_as::<CourseEnrolment>()
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| AppError::not_found("enrolment not found"))
}
