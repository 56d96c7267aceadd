use std::collections::HashSet;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::Row;
use sqlx::SqlitePool;
use uuid::Uuid;

use dive_registry::config::{load_env, AppConfig};
use dive_registry::db::{self, defaults};
use dive_registry::models::user::MembershipType;
use dive_registry::utils::{hash_password, utc_now};

#[derive(Parser, Debug)]
#[command(author, version, about = "dive registry administration tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply pending migrations
    MigrateRun,
    /// Show migration status against the current database
    MigrateStatus,
    /// Create a superuser in the National club
    CreateAdmin {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long, default_value = "Registry")]
        first_name: String,
        #[arg(long, default_value = "Admin")]
        last_name: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_env();

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;

    match cli.command {
        Commands::MigrateRun => {
            // init runs the embedded migrations
            db::init(&config).await?;
            println!("Migrations applied");
        }
        Commands::MigrateStatus => {
            let pool = db::init(&config).await?;
            print_status(&pool).await?;
        }
        Commands::CreateAdmin {
            email,
            password,
            first_name,
            last_name,
        } => {
            let pool = db::init(&config).await?;
            let id = create_admin(&pool, &email, &password, &first_name, &last_name).await?;
            println!("Created administrator {} ({})", email, id);
        }
    }

    Ok(())
}

async fn create_admin(
    pool: &SqlitePool,
    email: &str,
    password: &str,
    first_name: &str,
    last_name: &str,
) -> anyhow::Result<Uuid> {
    let password_hash = hash_password(password)?;

    let mut tx = pool.begin().await?;
    let club_id = defaults::ensure_national_club(&mut *tx).await?;

    let id = Uuid::new_v4();
    let now = utc_now();
    sqlx::query(
        "INSERT INTO users (id, email, password_hash, first_name, last_name, club_id, member_since, membership_type, \
         is_staff, is_superuser, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, 1, 1, ?, ?)",
    )
    .bind(id)
    .bind(email.trim())
    .bind(password_hash)
    .bind(first_name)
    .bind(last_name)
    .bind(club_id)
    .bind(now)
    .bind(MembershipType::Full.code())
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await
    .with_context(|| format!("failed to create user {}", email))?;

    tx.commit().await?;
    Ok(id)
}

async fn print_status(pool: &SqlitePool) -> anyhow::Result<()> {
    let migrator = sqlx::migrate!();

    let rows = sqlx::query("SELECT version FROM _sqlx_migrations WHERE success = 1")
        .fetch_all(pool)
        .await?;
    let applied_versions: HashSet<i64> = rows
        .iter()
        .filter_map(|row| row.try_get::<i64, _>("version").ok())
        .collect();

    println!("{:<8} {:<20} {}", "Status", "Version", "Name");
    for migration in migrator.iter() {
        let version = migration.version;
        let status = if applied_versions.contains(&version) { "applied" } else { "pending" };
        let desc = migration.description.as_ref().trim();
        let name = if desc.is_empty() { "unknown" } else { desc };
        println!("{:<8} {:<20} {}", status, version, name);
    }

    Ok(())
}
