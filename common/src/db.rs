use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::info;

use crate::{
    models::{HistoryEntry, PointsConfig, User, UserStats},
    utils::random_avatar,
};

/// Config rows created by `seed_points_config` when missing.
pub const DEFAULT_POINTS_CONFIG: &[(&str, &str, &str)] = &[
    (
        "points_per_ad_click",
        "50",
        "Points awarded per qualifying ad click",
    ),
    ("open_game_cost", "0", "Points deducted per reported session"),
    (
        "min_play_time",
        "900",
        "Minimum session length in seconds before any duration points",
    ),
];

pub async fn establish_connection(database_url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .context("Failed to create pool")?;

    Ok(pool)
}

pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("../migrations")
        .run(pool)
        .await
        .context("Failed to run migrations")?;
    info!("Migrations applied");
    Ok(())
}

/// Inserts the default config keys that are not present yet. Existing rows
/// are left untouched so admin edits survive restarts.
pub async fn seed_points_config(pool: &PgPool) -> anyhow::Result<(usize, usize)> {
    let mut tx = pool.begin().await?;
    let mut created = 0;

    for (key, value, description) in DEFAULT_POINTS_CONFIG {
        let inserted = sqlx::query(
            "INSERT INTO points_config (key, value, description) VALUES ($1, $2, $3) ON CONFLICT (key) DO NOTHING",
        )
        .bind(key)
        .bind(value)
        .bind(description)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        created += inserted as usize;
    }

    tx.commit().await?;

    let preserved = DEFAULT_POINTS_CONFIG.len() - created;
    info!(
        "Points config seeded (created: {}, preserved: {})",
        created, preserved
    );
    Ok((created, preserved))
}

pub async fn list_points_config(pool: &PgPool) -> anyhow::Result<Vec<PointsConfig>> {
    let rows = sqlx::query_as("SELECT * FROM points_config ORDER BY key")
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn find_user_by_wallet(pool: &PgPool, wallet_addr: &str) -> anyhow::Result<Option<User>> {
    let user = sqlx::query_as("SELECT * FROM users WHERE wallet_addr = $1")
        .bind(wallet_addr)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

/// Returns the user for `wallet_addr`, creating it with a random avatar on
/// first sight. The flag is true when the row was created by this call.
pub async fn find_or_create_user(pool: &PgPool, wallet_addr: &str) -> anyhow::Result<(User, bool)> {
    let mut tx = pool.begin().await?;

    let created: Option<User> = sqlx::query_as(
        "INSERT INTO users (wallet_addr, avatar) VALUES ($1, $2) ON CONFLICT (wallet_addr) DO NOTHING RETURNING *",
    )
    .bind(wallet_addr)
    .bind(random_avatar())
    .fetch_optional(&mut *tx)
    .await?;

    let result = match created {
        Some(user) => {
            info!("New user created: {}, avatar: {:?}", wallet_addr, user.avatar);
            (user, true)
        }
        None => {
            let user: User = sqlx::query_as("SELECT * FROM users WHERE wallet_addr = $1")
                .bind(wallet_addr)
                .fetch_one(&mut *tx)
                .await?;
            (user, false)
        }
    };

    tx.commit().await?;
    Ok(result)
}

pub async fn get_user_stats(pool: &PgPool, user_id: i32) -> anyhow::Result<UserStats> {
    let stats = sqlx::query_as(
        "SELECT COUNT(*)::BIGINT AS total_games_played,
                COALESCE(SUM(duration), 0)::BIGINT AS total_play_time,
                COALESCE(SUM(earned_points), 0)::BIGINT AS total_points_earned
         FROM game_plays WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    Ok(stats)
}

pub async fn get_game_play_history(
    pool: &PgPool,
    user_id: i32,
    limit: i64,
    offset: i64,
) -> anyhow::Result<(Vec<HistoryEntry>, i64)> {
    let entries: Vec<HistoryEntry> = sqlx::query_as(
        "SELECT gp.id, gp.game_id, g.name AS game_name, gp.duration, gp.ad_clicks,
                gp.earned_points, gp.created_at AS played_at
         FROM game_plays gp
         LEFT JOIN games g ON g.id = gp.game_id
         WHERE gp.user_id = $1
         ORDER BY gp.created_at DESC, gp.id DESC
         LIMIT $2 OFFSET $3",
    )
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: (i64,) = sqlx::query_as("SELECT COUNT(*)::BIGINT FROM game_plays WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await?;

    Ok((entries, total.0))
}
