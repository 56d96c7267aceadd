use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::Value;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{predicates, Action, Principal, Resource, ResourceContext, Scope};
use crate::db::lookup;
use crate::errors::{AppError, AppResult};
use crate::models::course::{
    Course, CourseCreateRequest, CourseInstruction, CourseUpdateRequest, DbCourse, InstructionCreateRequest,
    COURSE_COLUMNS,
};
use crate::utils::{parse_body, utc_now};

#[utoipa::path(
    get,
    path = "/courses",
    tag = "Courses",
    responses((status = 200, description = "All courses", body = [Course]))
)]
pub async fn list_courses(State(state): State<AppState>, principal: Principal) -> AppResult<Json<Vec<Course>>> {
    state
        .authorize(&principal, Resource::Course, Action::List, &ResourceContext::new())
        .await?;

    let sql = format!("SELECT {COURSE_COLUMNS} FROM courses ORDER BY datetime");
    let courses = sqlx::query_as::<_, DbCourse>(&sql).fetch_all(&state.pool).await?;
    Ok(Json(lookup::render_courses(&state.pool, courses).await?))
}

#[utoipa::path(
    get,
    path = "/courses/{id}",
    tag = "Courses",
    params(("id" = Uuid, Path, description = "Course id")),
    responses((status = 200, description = "Course detail", body = Course))
)]
pub async fn get_course(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Course>> {
    let course = lookup::fetch_course(&state.pool, id).await?;
    state
        .authorize(&principal, Resource::Course, Action::Retrieve, &course_context(&course))
        .await?;

    Ok(Json(lookup::render_course(&state.pool, course).await?))
}

/// The creator is the caller unless an administrator names someone else.
/// See [`resolve_organizer`] for who ends up organizing.
#[utoipa::path(
    post,
    path = "/courses",
    tag = "Courses",
    request_body = CourseCreateRequest,
    responses(
        (status = 201, description = "Course created", body = Course),
        (status = 400, description = "Missing or unknown certificate")
    )
)]
pub async fn create_course(
    State(state): State<AppState>,
    principal: Principal,
    Json(body): Json<Value>,
) -> AppResult<(StatusCode, Json<Course>)> {
    state
        .authorize(&principal, Resource::Course, Action::Create, &ResourceContext::new())
        .await?;

    let payload: CourseCreateRequest = parse_body(body)?;

    let certificate_id = payload
        .certificate
        .ok_or_else(|| AppError::validation("certificate", "this field is required"))?;
    ensure_certificate(&state.pool, certificate_id).await?;
    validate_participants(payload.maximum_participants)?;

    let creator_id = match payload.creator {
        Some(creator) if principal.is_admin() && creator != principal.user_id => {
            if lookup::find_user(&state.pool, creator).await?.is_none() {
                return Err(AppError::validation("creator", "no user with this id"));
            }
            creator
        }
        _ => principal.user_id,
    };

    let organizer_id = resolve_organizer(&state.pool, &principal, payload.organizer, principal.user_id).await?;

    let region_id = match payload.region {
        Some(region) if principal.is_admin() => {
            lookup::fetch_region(&state.pool, region)
                .await
                .map_err(|_| AppError::validation("region", "no region with this id"))?;
            Some(region)
        }
        _ => organizer_region(&state.pool, organizer_id).await?,
    };

    let id = Uuid::new_v4();
    let now = utc_now();
    let mut tx = state.pool.begin().await?;

    sqlx::query(
        "INSERT INTO courses (id, certificate_id, creator_id, organizer_id, region_id, location, datetime, maximum_participants, \
         send_out_materials, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(certificate_id)
    .bind(creator_id)
    .bind(organizer_id)
    .bind(region_id)
    .bind(&payload.location)
    .bind(payload.datetime)
    .bind(payload.maximum_participants)
    .bind(payload.send_out_materials)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    for instructor in &payload.instructors {
        add_instructor(&mut *tx, id, *instructor).await?;
    }

    tx.commit().await?;

    tracing::info!(course_id = %id, creator_id = %creator_id, organizer_id = %organizer_id, "course created");

    let course = lookup::fetch_course(&state.pool, id).await?;
    Ok((StatusCode::CREATED, Json(lookup::render_course(&state.pool, course).await?)))
}

#[utoipa::path(
    put,
    path = "/courses/{id}",
    tag = "Courses",
    params(("id" = Uuid, Path, description = "Course id")),
    request_body = CourseUpdateRequest,
    responses(
        (status = 200, description = "Course updated", body = Course),
        (status = 403, description = "Not an administrator or Dive Officer")
    )
)]
pub async fn update_course(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(body): Json<Value>,
) -> AppResult<Json<Course>> {
    apply_course_update(&state, &principal, id, body, Action::Update).await
}

#[utoipa::path(
    patch,
    path = "/courses/{id}",
    tag = "Courses",
    params(("id" = Uuid, Path, description = "Course id")),
    request_body = CourseUpdateRequest,
    responses(
        (status = 200, description = "Course updated", body = Course),
        (status = 403, description = "Not an administrator or the course's creator")
    )
)]
pub async fn partial_update_course(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(body): Json<Value>,
) -> AppResult<Json<Course>> {
    apply_course_update(&state, &principal, id, body, Action::PartialUpdate).await
}

async fn apply_course_update(
    state: &AppState,
    principal: &Principal,
    id: Uuid,
    body: Value,
    action: Action,
) -> AppResult<Json<Course>> {
    let mut course = lookup::fetch_course(&state.pool, id).await?;
    state
        .authorize(principal, Resource::Course, action, &course_context(&course))
        .await?;

    let payload: CourseUpdateRequest = parse_body(body)?;

    if let Some(certificate_id) = payload.certificate {
        ensure_certificate(&state.pool, certificate_id).await?;
        course.certificate_id = certificate_id;
    }
    course.organizer_id = resolve_organizer(&state.pool, principal, payload.organizer, course.organizer_id).await?;
    if let Some(region) = payload.region {
        if let Some(region_id) = region {
            lookup::fetch_region(&state.pool, region_id)
                .await
                .map_err(|_| AppError::validation("region", "no region with this id"))?;
        }
        course.region_id = region;
    }
    if let Some(location) = payload.location {
        course.location = location;
    }
    if let Some(datetime) = payload.datetime {
        course.datetime = datetime;
    }
    if let Some(maximum) = payload.maximum_participants {
        validate_participants(maximum)?;
        course.maximum_participants = maximum;
    }
    if let Some(send_out_materials) = payload.send_out_materials {
        course.send_out_materials = send_out_materials;
    }
    course.updated_at = utc_now();

    let mut tx = state.pool.begin().await?;
    sqlx::query(
        "UPDATE courses SET certificate_id = ?, organizer_id = ?, region_id = ?, location = ?, datetime = ?, \
         maximum_participants = ?, send_out_materials = ?, updated_at = ? WHERE id = ?",
    )
    .bind(course.certificate_id)
    .bind(course.organizer_id)
    .bind(course.region_id)
    .bind(&course.location)
    .bind(course.datetime)
    .bind(course.maximum_participants)
    .bind(course.send_out_materials)
    .bind(course.updated_at)
    .bind(course.id)
    .execute(&mut *tx)
    .await?;

    for instructor in payload.instructors.unwrap_or_default() {
        add_instructor(&mut *tx, course.id, instructor).await?;
    }
    tx.commit().await?;

    Ok(Json(lookup::render_course(&state.pool, course).await?))
}

#[utoipa::path(
    delete,
    path = "/courses/{id}",
    tag = "Courses",
    params(("id" = Uuid, Path, description = "Course id")),
    responses((status = 204, description = "Course deleted with its enrolments and instructions"))
)]
pub async fn delete_course(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let course = lookup::fetch_course(&state.pool, id).await?;
    state
        .authorize(&principal, Resource::Course, Action::Destroy, &course_context(&course))
        .await?;

    sqlx::query("DELETE FROM courses WHERE id = ?")
        .bind(course.id)
        .execute(&state.pool)
        .await?;

    tracing::info!(course_id = %course.id, "course deleted");

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/courses/{id}/instructions",
    tag = "Courses",
    params(("id" = Uuid, Path, description = "Course id")),
    responses((status = 200, description = "Instructors on the course visible to the caller", body = [CourseInstruction]))
)]
pub async fn list_instructions(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<CourseInstruction>>> {
    let course = lookup::fetch_course(&state.pool, id).await?;
    let ctx = ResourceContext::new().with_resource(course.id).with_course_organizer(course.organizer_id);
    state
        .authorize(&principal, Resource::CourseInstruction, Action::List, &ctx)
        .await?;

    // The organizer sees the whole roster of their own course
    let scope = if predicates::is_organizer(&principal, &course_context(&course)) {
        Scope::Everything
    } else {
        Scope::for_principal(&principal)
    };

    let mut qb = QueryBuilder::<Sqlite>::new(
        "SELECT ci.id, ci.user_id, ci.course_id, ci.expense_type, ci.expense_value, ci.created_at, ci.updated_at \
         FROM course_instructions ci JOIN users u ON u.id = ci.user_id WHERE ci.course_id = ",
    );
    qb.push_bind(course.id);
    scope.push_filter(&mut qb, "ci.user_id", "u.club_id");
    qb.push(" ORDER BY ci.created_at");

    let rows = qb.build_query_as::<CourseInstruction>().fetch_all(&state.pool).await?;
    Ok(Json(rows))
}

#[utoipa::path(
    post,
    path = "/courses/{id}/instructions",
    tag = "Courses",
    params(("id" = Uuid, Path, description = "Course id")),
    request_body = InstructionCreateRequest,
    responses(
        (status = 201, description = "Instructor added", body = CourseInstruction),
        (status = 409, description = "Already instructing on this course")
    )
)]
pub async fn create_instruction(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(body): Json<Value>,
) -> AppResult<(StatusCode, Json<CourseInstruction>)> {
    let course = lookup::fetch_course(&state.pool, id).await?;
    let payload: InstructionCreateRequest = parse_body(body)?;
    let user_id = payload.user.unwrap_or(principal.user_id);

    let ctx = ResourceContext::new()
        .with_user(user_id)
        .with_course_organizer(course.organizer_id);
    state
        .authorize(&principal, Resource::CourseInstruction, Action::Create, &ctx)
        .await?;

    if lookup::find_user(&state.pool, user_id).await?.is_none() {
        return Err(AppError::validation("user", "no user with this id"));
    }
    if payload.expense_value < 0 {
        return Err(AppError::validation("expense_value", "must not be negative"));
    }

    let instruction_id = Uuid::new_v4();
    let now = utc_now();
    sqlx::query(
        "INSERT INTO course_instructions (id, user_id, course_id, expense_type, expense_value, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(instruction_id)
    .bind(user_id)
    .bind(course.id)
    .bind(&payload.expense_type)
    .bind(payload.expense_value)
    .bind(now)
    .bind(now)
    .execute(&state.pool)
    .await?;

    let instruction = fetch_instruction(&state.pool, course.id, instruction_id).await?;
    Ok((StatusCode::CREATED, Json(instruction)))
}

#[utoipa::path(
    delete,
    path = "/courses/{id}/instructions/{instruction_id}",
    tag = "Courses",
    params(
        ("id" = Uuid, Path, description = "Course id"),
        ("instruction_id" = Uuid, Path, description = "Instruction id")
    ),
    responses((status = 204, description = "Instructor removed from the course"))
)]
pub async fn delete_instruction(
    State(state): State<AppState>,
    principal: Principal,
    Path((id, instruction_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    let course = lookup::fetch_course(&state.pool, id).await?;
    let instruction = fetch_instruction(&state.pool, course.id, instruction_id).await?;

    let ctx = ResourceContext::new()
        .with_resource(instruction.id)
        .with_user(instruction.user)
        .with_course_organizer(course.organizer_id);
    state
        .authorize(&principal, Resource::CourseInstruction, Action::Destroy, &ctx)
        .await?;

    sqlx::query("DELETE FROM course_instructions WHERE id = ?")
        .bind(instruction.id)
        .execute(&state.pool)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub fn course_context(course: &DbCourse) -> ResourceContext {
    let ctx = ResourceContext::new()
        .with_resource(course.id)
        .with_creator(course.creator_id)
        .with_organizer(course.organizer_id)
        .with_course_organizer(course.organizer_id);
    match course.region_id {
        Some(region_id) => ctx.with_region(region_id),
        None => ctx,
    }
}

/// Who organizes a course after a create or update.
///
/// Absent or `null` keeps `fallback`. Administrators may name any existing
/// user and Dive Officers a member of their own club. Any other request
/// quietly keeps `fallback`.
pub async fn resolve_organizer(
    pool: &SqlitePool,
    principal: &Principal,
    requested: Option<Option<Uuid>>,
    fallback: Uuid,
) -> AppResult<Uuid> {
    let may_assign = principal.is_admin() || principal.is_dive_officer();

    let requested = match requested {
        None | Some(None) => return Ok(fallback),
        Some(Some(_)) if !may_assign => {
            tracing::debug!(user_id = %principal.user_id, "organizer change ignored for caller without rights");
            return Ok(fallback);
        }
        Some(Some(requested)) => requested,
    };

    match lookup::find_user(pool, requested).await? {
        Some(user) if principal.is_admin() || user.club_id == principal.club_id => Ok(user.id),
        Some(_) => {
            tracing::debug!(organizer = %requested, "organizer outside the caller's club, keeping current");
            Ok(fallback)
        }
        None => {
            tracing::debug!(organizer = %requested, "unknown organizer, keeping current");
            Ok(fallback)
        }
    }
}

async fn organizer_region(pool: &SqlitePool, organizer_id: Uuid) -> AppResult<Option<Uuid>> {
    Ok(sqlx::query_scalar::<_, Uuid>(
        "SELECT c.region_id FROM users u JOIN clubs c ON c.id = u.club_id WHERE u.id = ?",
    )
    .bind(organizer_id)
    .fetch_optional(pool)
    .await?)
}

async fn ensure_certificate(pool: &SqlitePool, certificate_id: Uuid) -> AppResult<()> {
    match lookup::find_certificate(pool, certificate_id).await? {
        Some(_) => Ok(()),
        None => Err(AppError::validation("certificate", "no certificate with this id")),
    }
}

fn validate_participants(maximum: Option<i64>) -> AppResult<()> {
    match maximum {
        Some(value) if value < 0 => Err(AppError::validation("maximum_participants", "must not be negative")),
        _ => Ok(()),
    }
}

/// Get-or-create the instruction linking `user_id` to the course.
async fn add_instructor(conn: &mut SqliteConnection, course_id: Uuid, user_id: Uuid) -> AppResult<()> {
    let exists: Option<Uuid> = sqlx::query_scalar("SELECT id FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?;
    if exists.is_none() {
        return Err(AppError::validation("instructors", format!("no user with id {user_id}")));
    }

    let now = utc_now();
    sqlx::query(
        "INSERT INTO course_instructions (id, user_id, course_id, expense_type, expense_value, created_at, updated_at) \
         VALUES (?, ?, ?, NULL, 0, ?, ?) ON CONFLICT (user_id, course_id) DO NOTHING",
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(course_id)
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn fetch_instruction(pool: &SqlitePool, course_id: Uuid, instruction_id: Uuid) -> AppResult<CourseInstruction> {
    sqlx::query_as::<_, CourseInstruction>(
        "SELECT id, user_id, course_id, expense_type, expense_value, created_at, updated_at \
         FROM course_instructions WHERE id = ? AND course_id = ?",
    )
    .bind(instruction_id)
    .bind(course_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("instruction not found"))
}
