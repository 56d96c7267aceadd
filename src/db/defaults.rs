//! Get-or-create for the National region and club that orphaned records fall
//! back to. Both take a connection so they can run inside a caller's
//! transaction.

use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::errors::AppResult;
use crate::models::club::NATIONAL_CLUB;
use crate::models::region::NATIONAL_REGION;
use crate::utils::utc_now;

fn is_unique_violation(err: &sqlx::Error) -> bool {
	matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

async fn find_region(conn: &mut SqliteConnection, name: &str) -> AppResult<Option<Uuid>> {
	Ok(sqlx::query_scalar::<_, Uuid>("SELECT id FROM regions WHERE name = ?")
		.bind(name)
		.fetch_optional(&mut *conn)
		.await?)
}

async fn find_club(conn: &mut SqliteConnection, name: &str) -> AppResult<Option<Uuid>> {
	Ok(sqlx::query_scalar::<_, Uuid>("SELECT id FROM clubs WHERE name = ?")
		.bind(name)
		.fetch_optional(&mut *conn)
		.await?)
}

pub async fn ensure_national_region(conn: &mut SqliteConnection) -> AppResult<Uuid> {
	if let Some(id) = find_region(conn, NATIONAL_REGION).await? {
		return Ok(id);
	}

	let id = Uuid::new_v4();
	let now = utc_now();
	let inserted = sqlx::query("INSERT INTO regions (id, name, created_at, updated_at) VALUES (?, ?, ?, ?)")
		.bind(id)
		.bind(NATIONAL_REGION)
		.bind(now)
		.bind(now)
		.execute(&mut *conn)
		.await;

	match inserted {
		Ok(_) => {
			tracing::info!(region_id = %id, "created National region");
			Ok(id)
		}
		// Lost the race to a concurrent creator
		Err(err) if is_unique_violation(&err) => find_region(conn, NATIONAL_REGION)
			.await?
			.ok_or_else(|| err.into()),
		Err(err) => Err(err.into()),
	}
}

pub async fn ensure_national_club(conn: &mut SqliteConnection) -> AppResult<Uuid> {
	if let Some(id) = find_club(conn, NATIONAL_CLUB).await? {
		return Ok(id);
	}

	let region_id = ensure_national_region(conn).await?;
	let id = Uuid::new_v4();
	let now = utc_now();
	let inserted = sqlx::query("INSERT INTO clubs (id, name, region_id, created_at, updated_at) VALUES (?, ?, ?, ?, ?)")
		.bind(id)
		.bind(NATIONAL_CLUB)
		.bind(region_id)
		.bind(now)
		.bind(now)
		.execute(&mut *conn)
		.await;

	match inserted {
		Ok(_) => {
			tracing::info!(club_id = %id, "created National club");
			Ok(id)
		}
		Err(err) if is_unique_violation(&err) => find_club(conn, NATIONAL_CLUB)
			.await?
			.ok_or_else(|| err.into()),
		Err(err) => Err(err.into()),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use sqlx::sqlite::SqliteConnectOptions;
	use sqlx::{ConnectOptions, Connection};
	use std::str::FromStr;

	async fn memory_conn() -> SqliteConnection {
		let mut conn = SqliteConnectOptions::from_str("sqlite::memory:")
			.unwrap()
			.foreign_keys(true)
			.connect()
			.await
			.unwrap();
		sqlx::migrate!().run(&mut conn).await.unwrap();
		conn
	}

	#[tokio::test]
	async fn national_defaults_are_created_once() {
		let mut conn = memory_conn().await;

		let club = ensure_national_club(&mut conn).await.unwrap();
		let again = ensure_national_club(&mut conn).await.unwrap();
		assert_eq!(club, again);

		let region = ensure_national_region(&mut conn).await.unwrap();
		let linked: Uuid = sqlx::query_scalar("SELECT region_id FROM clubs WHERE id = ?")
			.bind(club)
			.fetch_one(&mut conn)
			.await
			.unwrap();
		assert_eq!(linked, region);

		let regions: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM regions")
			.fetch_one(&mut conn)
			.await
			.unwrap();
		assert_eq!(regions, 1);

		conn.close().await.unwrap();
	}
}
