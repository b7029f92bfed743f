use chrono::{DateTime, Utc};
use common::{
    models::{GamePlay, NewGamePlay, PlaySession, PointsConfig, User},
    utils::SessionStatus,
};
use sqlx::{PgPool, Postgres, Transaction};

use super::{LedgerStore, LedgerUnit};
use crate::{error::Result, window::DayWindow};

/// Ledger backed by Postgres. Per-user serialization comes from
/// `SELECT ... FOR UPDATE` on the user row.
#[derive(Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub struct PgLedgerUnit {
    tx: Transaction<'static, Postgres>,
}

impl LedgerStore for PgLedgerStore {
    type Unit = PgLedgerUnit;

    async fn begin(&self) -> Result<PgLedgerUnit> {
        let tx = self.pool.begin().await?;
        Ok(PgLedgerUnit { tx })
    }
}

impl LedgerUnit for PgLedgerUnit {
    async fn lock_user(&mut self, wallet_addr: &str) -> Result<Option<User>> {
        let user = sqlx::query_as("SELECT * FROM users WHERE wallet_addr = $1 FOR UPDATE")
            .bind(wallet_addr)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(user)
    }

    async fn points_config(&mut self) -> Result<Vec<PointsConfig>> {
        let rows = sqlx::query_as("SELECT * FROM points_config")
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(rows)
    }

    async fn game_plays_in_window(
        &mut self,
        user_id: i32,
        game_id: i32,
        window: DayWindow,
    ) -> Result<Vec<GamePlay>> {
        let plays = sqlx::query_as(
            "SELECT * FROM game_plays
             WHERE user_id = $1 AND game_id = $2 AND created_at >= $3 AND created_at < $4
             ORDER BY created_at DESC",
        )
        .bind(user_id)
        .bind(game_id)
        .bind(window.start)
        .bind(window.end)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(plays)
    }

    async fn ad_clicks_in_window(&mut self, user_id: i32, window: DayWindow) -> Result<Vec<i32>> {
        let rows: Vec<(i32,)> = sqlx::query_as(
            "SELECT ad_clicks FROM game_plays
             WHERE user_id = $1 AND created_at >= $2 AND created_at < $3",
        )
        .bind(user_id)
        .bind(window.start)
        .bind(window.end)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(rows.into_iter().map(|(clicks,)| clicks).collect())
    }

    async fn insert_game_play(
        &mut self,
        play: NewGamePlay,
        created_at: DateTime<Utc>,
    ) -> Result<GamePlay> {
        let row = sqlx::query_as(
            "INSERT INTO game_plays (user_id, game_id, duration, ad_clicks, earned_points, created_at)
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
        )
        .bind(play.user_id)
        .bind(play.game_id)
        .bind(play.duration)
        .bind(play.ad_clicks)
        .bind(play.earned_points)
        .bind(created_at)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(row)
    }

    async fn increment_points(&mut self, user_id: i32, amount: i64) -> Result<i64> {
        let balance: (i64,) = sqlx::query_as(
            "UPDATE users SET points = points + $1, updated_at = NOW() WHERE id = $2 RETURNING points",
        )
        .bind(amount)
        .bind(user_id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(balance.0)
    }

    async fn insert_session(
        &mut self,
        token: &str,
        user_id: i32,
        game_id: i32,
        started_at: DateTime<Utc>,
    ) -> Result<PlaySession> {
        let session = sqlx::query_as(
            "INSERT INTO play_sessions (token, user_id, game_id, started_at, status)
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(token)
        .bind(user_id)
        .bind(game_id)
        .bind(started_at)
        .bind(SessionStatus::PENDING.to_string())
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(session)
    }

    async fn lock_session(&mut self, token: &str) -> Result<Option<PlaySession>> {
        let session = sqlx::query_as("SELECT * FROM play_sessions WHERE token = $1 FOR UPDATE")
            .bind(token)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(session)
    }

    async fn settle_session(
        &mut self,
        session_id: i32,
        game_play_id: i32,
        result: &str,
        settled_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE play_sessions SET status = $1, game_play_id = $2, result = $3, settled_at = $4
             WHERE id = $5",
        )
        .bind(SessionStatus::SETTLED.to_string())
        .bind(game_play_id)
        .bind(result)
        .bind(settled_at)
        .bind(session_id)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
