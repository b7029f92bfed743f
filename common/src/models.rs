use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde::Serialize;

use crate::utils::SessionStatus;

#[derive(Debug, Clone, Deserialize, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i32,
    pub wallet_addr: String,
    pub points: i64,
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One reported play session. Rows are append-only; `earned_points` is
/// fixed at insert time.
#[derive(Debug, Clone, Deserialize, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct GamePlay {
    pub id: i32,
    pub user_id: i32,
    pub game_id: i32,
    pub duration: i32,
    pub ad_clicks: i32,
    pub earned_points: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewGamePlay {
    pub user_id: i32,
    pub game_id: i32,
    pub duration: i32,
    pub ad_clicks: i32,
    pub earned_points: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize, sqlx::FromRow)]
pub struct PointsConfig {
    pub id: i32,
    pub key: String,
    pub value: String,
    pub description: Option<String>,
}

/// Server-issued token for a single play session.
#[derive(Debug, Clone, Deserialize, Serialize, sqlx::FromRow)]
pub struct PlaySession {
    pub id: i32,
    pub token: String,
    pub user_id: i32,
    pub game_id: i32,
    pub started_at: DateTime<Utc>,
    pub status: String,
    pub game_play_id: Option<i32>,
    /// Serialized earn outcome, kept so a settled session can be replayed.
    pub result: Option<String>,
    pub settled_at: Option<DateTime<Utc>>,
}

impl PlaySession {
    pub fn status(&self) -> anyhow::Result<SessionStatus> {
        SessionStatus::from_str(&self.status)
    }

    pub fn is_settled(&self) -> bool {
        matches!(self.status(), Ok(SessionStatus::SETTLED))
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_games_played: i64,
    pub total_play_time: i64,
    pub total_points_earned: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: i32,
    pub game_id: i32,
    pub game_name: Option<String>,
    pub duration: i32,
    pub ad_clicks: i32,
    pub earned_points: i64,
    pub played_at: DateTime<Utc>,
}
