//! Row fetchers and renderers shared by the route modules.

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::membership::{self, Eligibility};
use crate::models::club::{ClubSummary, DbClub};
use crate::models::committee::{CommitteeRole, DbCommitteePosition};
use crate::models::course::{Course, DbCourse, COURSE_COLUMNS};
use crate::models::qualification::{Certificate, CertificateSummary, DbQualification, QualifiedUser, Qualification};
use crate::models::region::{DbRegion, RegionSummary};
use crate::models::user::{DbUser, MembershipType, UserProfile, UserSummary, USER_COLUMNS};
use crate::utils::utc_now;

pub const CLUB_COLUMNS: &str = "id, name, region_id, foundation_date, description, location, email, phone, website, created_at, updated_at";

pub async fn find_user(pool: &SqlitePool, id: Uuid) -> AppResult<Option<DbUser>> {
	let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
	Ok(sqlx::query_as::<_, DbUser>(&sql).bind(id).fetch_optional(pool).await?)
}

pub async fn fetch_user(pool: &SqlitePool, id: Uuid) -> AppResult<DbUser> {
	find_user(pool, id)
		.await?
		.ok_or_else(|| AppError::not_found("user not found"))
}

pub async fn fetch_user_by_email(pool: &SqlitePool, email: &str) -> AppResult<Option<DbUser>> {
	let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?");
	Ok(sqlx::query_as::<_, DbUser>(&sql).bind(email).fetch_optional(pool).await?)
}

pub async fn fetch_club(pool: &SqlitePool, id: Uuid) -> AppResult<DbClub> {
	let sql = format!("SELECT {CLUB_COLUMNS} FROM clubs WHERE id = ?");
	sqlx::query_as::<_, DbClub>(&sql)
		.bind(id)
		.fetch_optional(pool)
		.await?
		.ok_or_else(|| AppError::not_found("club not found"))
}

pub async fn fetch_region(pool: &SqlitePool, id: Uuid) -> AppResult<DbRegion> {
	sqlx::query_as::<_, DbRegion>("SELECT id, name, dive_officer_id, created_at, updated_at FROM regions WHERE id = ?")
		.bind(id)
		.fetch_optional(pool)
		.await?
		.ok_or_else(|| AppError::not_found("region not found"))
}

pub async fn find_certificate(pool: &SqlitePool, id: Uuid) -> AppResult<Option<Certificate>> {
	Ok(sqlx::query_as::<_, Certificate>(
		"SELECT id, name, is_instructor_certificate, created_at, updated_at FROM certificates WHERE id = ?",
	)
	.bind(id)
	.fetch_optional(pool)
	.await?)
}

pub async fn fetch_certificate(pool: &SqlitePool, id: Uuid) -> AppResult<Certificate> {
	find_certificate(pool, id)
		.await?
		.ok_or_else(|| AppError::not_found("certificate not found"))
}

pub async fn fetch_course(pool: &SqlitePool, id: Uuid) -> AppResult<DbCourse> {
	let sql = format!("SELECT {COURSE_COLUMNS} FROM courses WHERE id = ?");
	sqlx::query_as::<_, DbCourse>(&sql)
		.bind(id)
		.fetch_optional(pool)
		.await?
		.ok_or_else(|| AppError::not_found("course not found"))
}

pub async fn region_summary(pool: &SqlitePool, id: Uuid) -> AppResult<RegionSummary> {
	let region = fetch_region(pool, id).await?;
	Ok(RegionSummary::from(&region))
}

pub async fn club_summary(pool: &SqlitePool, id: Uuid) -> AppResult<ClubSummary> {
	let club = fetch_club(pool, id).await?;
	let region = sqlx::query_as::<_, (Uuid, String)>("SELECT id, name FROM regions WHERE id = ?")
		.bind(club.region_id)
		.fetch_optional(pool)
		.await?
		.map(|(id, name)| RegionSummary { id, name });

	Ok(ClubSummary {
		id: club.id,
		name: club.name,
		region,
	})
}

/// Users holding a qualification for an instructor certificate.
pub async fn is_instructor(pool: &SqlitePool, user_id: Uuid) -> AppResult<bool> {
	let count: i64 = sqlx::query_scalar(
		"SELECT COUNT(1) FROM qualifications q JOIN certificates c ON c.id = q.certificate_id \
		 WHERE q.user_id = ? AND c.is_instructor_certificate = 1",
	)
	.bind(user_id)
	.fetch_one(pool)
	.await?;
	Ok(count > 0)
}

pub async fn committee_positions(pool: &SqlitePool, user_id: Uuid) -> AppResult<Vec<DbCommitteePosition>> {
	Ok(sqlx::query_as::<_, DbCommitteePosition>(
		"SELECT id, user_id, club_id, role, created_at FROM committee_positions WHERE user_id = ? ORDER BY role",
	)
	.bind(user_id)
	.fetch_all(pool)
	.await?)
}

/// Build the full renderable profile; callers project it down to a fieldset.
pub async fn user_profile(pool: &SqlitePool, user: &DbUser) -> AppResult<UserProfile> {
	let club = club_summary(pool, user.club_id).await?;
	let readable_committee_positions = committee_positions(pool, user.id)
		.await?
		.into_iter()
		.filter_map(|pos| CommitteeRole::from_code(pos.role))
		.map(|role| role.label().to_string())
		.collect();
	let is_instructor = is_instructor(pool, user.id).await?;

	let eligibility = Eligibility::for_user(user);
	let due = eligibility.due_dates(utc_now().date_naive());

	let readable_membership_type = MembershipType::from_code(user.membership_type)
		.map(|kind| kind.label().to_string())
		.unwrap_or_default();

	Ok(UserProfile {
		id: user.id,
		first_name: user.first_name.clone(),
		last_name: user.last_name.clone(),
		title: user.title,
		gender: user.gender,
		date_of_birth: user.date_of_birth,
		email: user.email.clone(),
		phone_home: user.phone_home.clone(),
		phone_mobile: user.phone_mobile.clone(),
		next_of_kin_name: user.next_of_kin_name.clone(),
		next_of_kin_phone: user.next_of_kin_phone.clone(),
		club,
		member_since: user.member_since,
		membership_type: user.membership_type,
		readable_membership_type,
		readable_committee_positions,
		is_staff: user.is_staff,
		is_instructor,
		current_membership_status: eligibility.status(),
		next_medical_disclaimer_due_date: due.medical_disclaimer,
		next_fitness_test_due_date: due.fitness_test,
		next_medical_assessment_due_date: due.medical_assessment,
		next_renewal_due_date: due.renewal,
		next_year_membership_status: membership::next_year_status(),
	})
}

async fn user_summary(pool: &SqlitePool, id: Uuid) -> AppResult<UserSummary> {
	let user = fetch_user(pool, id).await?;
	Ok(UserSummary::from(&user))
}

pub async fn render_course(pool: &SqlitePool, course: DbCourse) -> AppResult<Course> {
	let certificate = fetch_certificate(pool, course.certificate_id).await?;
	let region = match course.region_id {
		Some(region_id) => Some(region_summary(pool, region_id).await?),
		None => None,
	};

	Ok(Course {
		id: course.id,
		certificate: CertificateSummary::from(&certificate),
		creator: user_summary(pool, course.creator_id).await?,
		organizer: user_summary(pool, course.organizer_id).await?,
		region,
		location: course.location,
		datetime: course.datetime,
		maximum_participants: course.maximum_participants,
		send_out_materials: course.send_out_materials,
		created_at: course.created_at,
		updated_at: course.updated_at,
	})
}

pub async fn render_courses(pool: &SqlitePool, courses: Vec<DbCourse>) -> AppResult<Vec<Course>> {
	let mut rendered = Vec::with_capacity(courses.len());
	for course in courses {
		rendered.push(render_course(pool, course).await?);
	}
	Ok(rendered)
}

pub async fn render_qualification(pool: &SqlitePool, qualification: DbQualification) -> AppResult<Qualification> {
	let user = fetch_user(pool, qualification.user_id).await?;
	let certificate = fetch_certificate(pool, qualification.certificate_id).await?;

	Ok(Qualification {
		id: qualification.id,
		user: QualifiedUser {
			id: user.id,
			first_name: user.first_name,
			last_name: user.last_name,
		},
		certificate: CertificateSummary::from(&certificate),
		date_granted: qualification.date_granted,
	})
}

pub async fn render_qualifications(pool: &SqlitePool, rows: Vec<DbQualification>) -> AppResult<Vec<Qualification>> {
	let mut rendered = Vec::with_capacity(rows.len());
	for row in rows {
		rendered.push(render_qualification(pool, row).await?);
	}
	Ok(rendered)
}

/// Get-or-create a committee position. Adopting a role twice leaves exactly
/// one position.
pub async fn adopt_role(pool: &SqlitePool, user_id: Uuid, club_id: Uuid, role: CommitteeRole) -> AppResult<DbCommitteePosition> {
	sqlx::query(
		"INSERT INTO committee_positions (id, user_id, club_id, role, created_at) VALUES (?, ?, ?, ?, ?) \
		 ON CONFLICT (user_id, club_id, role) DO NOTHING",
	)
	.bind(Uuid::new_v4())
	.bind(user_id)
	.bind(club_id)
	.bind(role.code())
	.bind(utc_now())
	.execute(pool)
	.await?;

	Ok(sqlx::query_as::<_, DbCommitteePosition>(
		"SELECT id, user_id, club_id, role, created_at FROM committee_positions WHERE user_id = ? AND club_id = ? AND role = ?",
	)
	.bind(user_id)
	.bind(club_id)
	.bind(role.code())
	.fetch_one(pool)
	.await?)
}
