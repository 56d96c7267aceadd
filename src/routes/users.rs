use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::{Map, Value};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::visibility::{self, fieldsets};
use crate::authz::{Action, Principal, Resource, ResourceContext, Scope};
use crate::db::{defaults, lookup};
use crate::errors::{AppError, AppResult};
use crate::models::committee::{AdoptRoleRequest, CommitteePosition, CommitteeRole};
use crate::models::course::{Course, DbCourse, COURSE_COLUMNS};
use crate::models::qualification::{DbQualification, Qualification};
use crate::models::user::{
    is_valid_choice, DbUser, MembershipType, UserCreateRequest, UserProfile, UserUpdateRequest, GENDER_CHOICES,
    TITLE_CHOICES, USER_COLUMNS,
};
use crate::utils::{body_object, hash_password, parse_body, require_non_empty, to_json, utc_now};

/// Render users through the full profile and project them onto `fields`.
pub async fn render_users(pool: &SqlitePool, users: &[DbUser], fields: &[&str]) -> AppResult<Vec<Value>> {
    let mut rendered = Vec::with_capacity(users.len());
    for user in users {
        rendered.push(render_user(pool, user, fields).await?);
    }
    Ok(rendered)
}

pub async fn render_user(pool: &SqlitePool, user: &DbUser, fields: &[&str]) -> AppResult<Value> {
    let profile = lookup::user_profile(pool, user).await?;
    Ok(visibility::project(&to_json(&profile)?, fields))
}

/// Look a user up through the caller's scope; out-of-scope users are 404.
async fn fetch_scoped_user(pool: &SqlitePool, principal: &Principal, id: Uuid) -> AppResult<DbUser> {
    let user = lookup::fetch_user(pool, id).await?;
    if Scope::for_principal(principal).admits(user.id, user.club_id) {
        Ok(user)
    } else {
        Err(AppError::not_found("user not found"))
    }
}

/// Authorize `action` on user `id` and return it if in scope.
async fn authorized_user(state: &AppState, principal: &Principal, id: Uuid, action: Action) -> AppResult<DbUser> {
    state
        .authorize(principal, Resource::User, action, &ResourceContext::new().with_user(id))
        .await?;
    fetch_scoped_user(&state.pool, principal, id).await
}

#[utoipa::path(
    get,
    path = "/users",
    tag = "Users",
    responses(
        (status = 200, description = "Users visible to the caller", body = [UserProfile]),
        (status = 403, description = "Not an administrator or Dive Officer")
    )
)]
pub async fn list_users(State(state): State<AppState>, principal: Principal) -> AppResult<Json<Vec<Value>>> {
    state
        .authorize(&principal, Resource::User, Action::List, &ResourceContext::new())
        .await?;

    let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {USER_COLUMNS} FROM users WHERE 1 = 1"));
    Scope::for_principal(&principal).push_filter(&mut qb, "id", "club_id");
    qb.push(" ORDER BY last_name, first_name");

    let users = qb.build_query_as::<DbUser>().fetch_all(&state.pool).await?;
    Ok(Json(render_users(&state.pool, &users, fieldsets::DEFAULT).await?))
}

#[utoipa::path(
    get,
    path = "/users/me",
    tag = "Users",
    responses((status = 200, description = "The caller's own profile", body = UserProfile))
)]
pub async fn me(State(state): State<AppState>, principal: Principal) -> AppResult<Json<Value>> {
    state
        .authorize(&principal, Resource::User, Action::Me, &ResourceContext::new().with_user(principal.user_id))
        .await?;

    let user = lookup::fetch_user(&state.pool, principal.user_id).await?;
    Ok(Json(render_user(&state.pool, &user, fieldsets::OWN_PROFILE).await?))
}

/// Administrators choose the club (National by default); a Dive Officer's
/// new member always joins the Dive Officer's club.
#[utoipa::path(
    post,
    path = "/users",
    tag = "Users",
    request_body = UserCreateRequest,
    responses(
        (status = 201, description = "User created", body = UserProfile),
        (status = 409, description = "Email already in use")
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    principal: Principal,
    Json(body): Json<Value>,
) -> AppResult<(StatusCode, Json<Value>)> {
    state
        .authorize(&principal, Resource::User, Action::Create, &ResourceContext::new())
        .await?;

    let body = body_object(body)?;
    let club_id = if principal.is_admin() {
        match requested_club(&body)? {
            Some(club_id) => {
                lookup::fetch_club(&state.pool, club_id)
                    .await
                    .map_err(|_| AppError::validation("club", "no club with this id"))?;
                club_id
            }
            None => {
                let mut conn = state.pool.acquire().await?;
                defaults::ensure_national_club(&mut *conn).await?
            }
        }
    } else {
        principal.club_id
    };

    let allowed = visibility::user_write_fields(&principal, None, club_id);
    let body = visibility::permitted_writes(body, allowed);
    let payload: UserCreateRequest = parse_body(Value::Object(body))?;

    require_non_empty("first_name", &payload.first_name)?;
    require_non_empty("last_name", &payload.last_name)?;
    require_non_empty("email", &payload.email)?;
    validate_choices(payload.title, payload.gender, payload.membership_type)?;

    let password_hash = match payload.password.as_deref() {
        Some(password) => hash_password(password)?,
        None => String::new(),
    };

    let id = Uuid::new_v4();
    let now = utc_now();
    sqlx::query(
        "INSERT INTO users (id, email, password_hash, first_name, last_name, title, gender, date_of_birth, phone_home, phone_mobile, \
         next_of_kin_name, next_of_kin_phone, club_id, member_since, membership_type, is_staff, is_superuser, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(payload.email.trim())
    .bind(password_hash)
    .bind(payload.first_name.trim())
    .bind(payload.last_name.trim())
    .bind(payload.title)
    .bind(payload.gender)
    .bind(payload.date_of_birth)
    .bind(&payload.phone_home)
    .bind(&payload.phone_mobile)
    .bind(&payload.next_of_kin_name)
    .bind(&payload.next_of_kin_phone)
    .bind(club_id)
    .bind(now)
    .bind(payload.membership_type.unwrap_or(MembershipType::Full.code()))
    .bind(payload.is_staff.unwrap_or(false))
    .bind(false)
    .bind(now)
    .bind(now)
    .execute(&state.pool)
    .await?;

    tracing::info!(user_id = %id, club_id = %club_id, created_by = %principal.user_id, "user created");

    let user = lookup::fetch_user(&state.pool, id).await?;
    let rendered = render_user(&state.pool, &user, fieldsets::DEFAULT).await?;
    Ok((StatusCode::CREATED, Json(rendered)))
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "Users",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "User detail", body = UserProfile),
        (status = 404, description = "No such user within the caller's reach")
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let user = authorized_user(&state, &principal, id, Action::Retrieve).await?;
    Ok(Json(render_user(&state.pool, &user, fieldsets::DEFAULT).await?))
}

#[utoipa::path(
    put,
    path = "/users/{id}",
    tag = "Users",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = UserUpdateRequest,
    responses((status = 200, description = "User updated; fields the caller may not write are ignored", body = UserProfile))
)]
pub async fn update_user(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(body): Json<Value>,
) -> AppResult<Json<Value>> {
    apply_user_update(&state, &principal, id, body, Action::Update).await
}

#[utoipa::path(
    patch,
    path = "/users/{id}",
    tag = "Users",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = UserUpdateRequest,
    responses((status = 200, description = "User updated", body = UserProfile))
)]
pub async fn partial_update_user(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(body): Json<Value>,
) -> AppResult<Json<Value>> {
    apply_user_update(&state, &principal, id, body, Action::PartialUpdate).await
}

async fn apply_user_update(
    state: &AppState,
    principal: &Principal,
    id: Uuid,
    body: Value,
    action: Action,
) -> AppResult<Json<Value>> {
    let mut user = authorized_user(state, principal, id, action).await?;

    let allowed = visibility::user_write_fields(principal, Some(user.id), user.club_id);
    let body = visibility::permitted_writes(body_object(body)?, allowed);
    let payload: UserUpdateRequest = parse_body(Value::Object(body))?;

    if let Some(first_name) = payload.first_name {
        require_non_empty("first_name", &first_name)?;
        user.first_name = first_name.trim().to_string();
    }
    if let Some(last_name) = payload.last_name {
        require_non_empty("last_name", &last_name)?;
        user.last_name = last_name.trim().to_string();
    }
    if let Some(email) = payload.email {
        require_non_empty("email", &email)?;
        user.email = email.trim().to_string();
    }
    if let Some(password) = payload.password.as_deref() {
        user.password_hash = hash_password(password)?;
    }
    if let Some(title) = payload.title {
        user.title = title;
    }
    if let Some(gender) = payload.gender {
        user.gender = gender;
    }
    if let Some(date_of_birth) = payload.date_of_birth {
        user.date_of_birth = date_of_birth;
    }
    if let Some(phone_home) = payload.phone_home {
        user.phone_home = phone_home;
    }
    if let Some(phone_mobile) = payload.phone_mobile {
        user.phone_mobile = phone_mobile;
    }
    if let Some(name) = payload.next_of_kin_name {
        user.next_of_kin_name = name;
    }
    if let Some(phone) = payload.next_of_kin_phone {
        user.next_of_kin_phone = phone;
    }
    if let Some(membership_type) = payload.membership_type {
        user.membership_type = membership_type;
    }
    if let Some(club_id) = payload.club {
        lookup::fetch_club(&state.pool, club_id)
            .await
            .map_err(|_| AppError::validation("club", "no club with this id"))?;
        user.club_id = club_id;
    }
    if let Some(is_staff) = payload.is_staff {
        user.is_staff = is_staff;
    }
    validate_choices(user.title, user.gender, Some(user.membership_type))?;

    user.updated_at = utc_now();

    sqlx::query(
        "UPDATE users SET email = ?, password_hash = ?, first_name = ?, last_name = ?, title = ?, gender = ?, date_of_birth = ?, \
         phone_home = ?, phone_mobile = ?, next_of_kin_name = ?, next_of_kin_phone = ?, club_id = ?, membership_type = ?, \
         is_staff = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(user.title)
    .bind(user.gender)
    .bind(user.date_of_birth)
    .bind(&user.phone_home)
    .bind(&user.phone_mobile)
    .bind(&user.next_of_kin_name)
    .bind(&user.next_of_kin_phone)
    .bind(user.club_id)
    .bind(user.membership_type)
    .bind(user.is_staff)
    .bind(user.updated_at)
    .bind(user.id)
    .execute(&state.pool)
    .await?;

    Ok(Json(render_user(&state.pool, &user, fieldsets::DEFAULT).await?))
}

/// Committee positions, qualifications, enrolments and instructions go with
/// the user. Users still referenced as a course's creator or organizer stay.
#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "Users",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 409, description = "User still creates or organizes courses")
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state
        .authorize(&principal, Resource::User, Action::Destroy, &ResourceContext::new().with_user(id))
        .await?;

    let user = lookup::fetch_user(&state.pool, id).await?;

    let courses: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM courses WHERE creator_id = ? OR organizer_id = ?")
        .bind(user.id)
        .bind(user.id)
        .fetch_one(&state.pool)
        .await?;
    if courses > 0 {
        return Err(AppError::conflict("user still creates or organizes courses"));
    }

    sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(user.id)
        .execute(&state.pool)
        .await?;

    tracing::info!(user_id = %user.id, deleted_by = %principal.user_id, "user deleted");

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/users/{id}/membership-status",
    tag = "Users",
    params(("id" = Uuid, Path, description = "User id")),
    responses((status = 200, description = "Membership status and due dates", body = UserProfile))
)]
pub async fn membership_status(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let user = authorized_user(&state, &principal, id, Action::MembershipStatus).await?;
    Ok(Json(render_user(&state.pool, &user, fieldsets::MEMBERSHIP_STATUS).await?))
}

/// Visible to administrators, the user and the Dive Officer of the user's
/// club. Everyone else is told the user does not exist.
#[utoipa::path(
    get,
    path = "/users/{id}/qualifications",
    tag = "Users",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "The user's qualifications, newest first", body = [Qualification]),
        (status = 404, description = "No such user within the caller's reach")
    )
)]
pub async fn user_qualifications(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<Qualification>>> {
    let user = lookup::fetch_user(&state.pool, id).await?;
    let ctx = ResourceContext::new().with_user(user.id).with_club(user.club_id);
    state
        .authorize_or_hide(&principal, Resource::User, Action::Qualifications, &ctx, "user")
        .await?;

    let rows = sqlx::query_as::<_, DbQualification>(
        "SELECT id, user_id, certificate_id, date_granted, created_at, updated_at FROM qualifications \
         WHERE user_id = ? ORDER BY date_granted DESC",
    )
    .bind(user.id)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(lookup::render_qualifications(&state.pool, rows).await?))
}

#[utoipa::path(
    get,
    path = "/users/{id}/courses-organized",
    tag = "Users",
    params(("id" = Uuid, Path, description = "User id")),
    responses((status = 200, description = "Courses the user organizes", body = [Course]))
)]
pub async fn courses_organized(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<Course>>> {
    let user = authorized_user(&state, &principal, id, Action::CoursesOrganized).await?;

    let sql = format!("SELECT {COURSE_COLUMNS} FROM courses WHERE organizer_id = ? ORDER BY datetime");
    let courses = sqlx::query_as::<_, DbCourse>(&sql)
        .bind(user.id)
        .fetch_all(&state.pool)
        .await?;

    Ok(Json(lookup::render_courses(&state.pool, courses).await?))
}

#[utoipa::path(
    get,
    path = "/users/{id}/courses-taught",
    tag = "Users",
    params(("id" = Uuid, Path, description = "User id")),
    responses((status = 200, description = "Courses the user teaches or has taught", body = [Course]))
)]
pub async fn courses_taught(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<Course>>> {
    let user = authorized_user(&state, &principal, id, Action::CoursesTaught).await?;

    let columns = COURSE_COLUMNS
        .split(", ")
        .map(|column| format!("c.{}", column.trim()))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "SELECT {columns} FROM courses c JOIN course_instructions ci ON ci.course_id = c.id \
         WHERE ci.user_id = ? ORDER BY c.datetime"
    );
    let courses = sqlx::query_as::<_, DbCourse>(&sql)
        .bind(user.id)
        .fetch_all(&state.pool)
        .await?;

    Ok(Json(lookup::render_courses(&state.pool, courses).await?))
}

#[utoipa::path(
    get,
    path = "/users/{id}/committee-positions",
    tag = "Users",
    params(("id" = Uuid, Path, description = "User id")),
    responses((status = 200, description = "Committee positions the user holds", body = [CommitteePosition]))
)]
pub async fn list_committee_positions(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<CommitteePosition>>> {
    let user = lookup::fetch_user(&state.pool, id).await?;
    let ctx = ResourceContext::new().with_user(user.id).with_club(user.club_id);
    state
        .authorize(&principal, Resource::CommitteePosition, Action::List, &ctx)
        .await?;

    let positions = lookup::committee_positions(&state.pool, user.id)
        .await?
        .into_iter()
        .map(CommitteePosition::from)
        .collect();

    Ok(Json(positions))
}

/// Give the user a role in their current club. Adopting a role already held
/// returns the existing position.
#[utoipa::path(
    post,
    path = "/users/{id}/committee-positions",
    tag = "Users",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = AdoptRoleRequest,
    responses(
        (status = 201, description = "Position held", body = CommitteePosition),
        (status = 400, description = "Unknown role code")
    )
)]
pub async fn adopt_committee_role(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(body): Json<Value>,
) -> AppResult<(StatusCode, Json<CommitteePosition>)> {
    let user = lookup::fetch_user(&state.pool, id).await?;
    let ctx = ResourceContext::new().with_user(user.id).with_club(user.club_id);
    state
        .authorize(&principal, Resource::CommitteePosition, Action::Create, &ctx)
        .await?;

    let payload: AdoptRoleRequest = parse_body(body)?;
    let role = CommitteeRole::from_code(payload.role)
        .ok_or_else(|| AppError::validation("role", format!("{} is not a valid choice", payload.role)))?;

    let position = lookup::adopt_role(&state.pool, user.id, user.club_id, role).await?;

    tracing::info!(user_id = %user.id, club_id = %user.club_id, role = role.label(), "committee role adopted");

    Ok((StatusCode::CREATED, Json(CommitteePosition::from(position))))
}

#[utoipa::path(
    delete,
    path = "/users/{id}/committee-positions/{position_id}",
    tag = "Users",
    params(
        ("id" = Uuid, Path, description = "User id"),
        ("position_id" = Uuid, Path, description = "Committee position id")
    ),
    responses((status = 204, description = "Position removed"))
)]
pub async fn remove_committee_position(
    State(state): State<AppState>,
    principal: Principal,
    Path((id, position_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    let user = lookup::fetch_user(&state.pool, id).await?;
    let ctx = ResourceContext::new().with_user(user.id).with_club(user.club_id);
    state
        .authorize(&principal, Resource::CommitteePosition, Action::Destroy, &ctx)
        .await?;

    let removed = sqlx::query("DELETE FROM committee_positions WHERE id = ? AND user_id = ?")
        .bind(position_id)
        .bind(user.id)
        .execute(&state.pool)
        .await?
        .rows_affected();

    if removed == 0 {
        return Err(AppError::not_found("committee position not found"));
    }

    Ok(StatusCode::NO_CONTENT)
}

fn requested_club(body: &Map<String, Value>) -> AppResult<Option<Uuid>> {
    match body.get("club") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(raw)) => Uuid::parse_str(raw)
            .map(Some)
            .map_err(|_| AppError::validation("club", "must be a valid UUID")),
        Some(_) => Err(AppError::validation("club", "must be a valid UUID")),
    }
}

fn validate_choices(title: Option<i64>, gender: Option<i64>, membership_type: Option<i64>) -> AppResult<()> {
    if let Some(code) = title {
        if !is_valid_choice(&TITLE_CHOICES, code) {
            return Err(AppError::validation("title", format!("{code} is not a valid choice")));
        }
    }
    if let Some(code) = gender {
        if !is_valid_choice(&GENDER_CHOICES, code) {
            return Err(AppError::validation("gender", format!("{code} is not a valid choice")));
        }
    }
    if let Some(code) = membership_type {
        if MembershipType::from_code(code).is_none() {
            return Err(AppError::validation("membership_type", format!("{code} is not a valid choice")));
        }
    }
    Ok(())
}
