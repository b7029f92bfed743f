use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use chrono::{DateTime, Utc};
use common::{
    models::{GamePlay, NewGamePlay, PlaySession, PointsConfig, User},
    utils::SessionStatus,
};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{LedgerStore, LedgerUnit};
use crate::{error::Result, window::DayWindow};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    users: Vec<User>,
    game_plays: Vec<GamePlay>,
    config: Vec<PointsConfig>,
    sessions: Vec<PlaySession>,
}

/// In-process ledger. A unit holds the single store lock from `begin` until
/// it is committed or dropped, so units never interleave. Writes are staged
/// on a copy and only published by `commit`.
#[derive(Clone, Default)]
pub struct MemoryLedgerStore {
    state: Arc<Mutex<MemoryState>>,
    fail_increments: Arc<AtomicBool>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_user(&self, wallet_addr: &str) -> User {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let user = User {
            id: state.users.len() as i32 + 1,
            wallet_addr: wallet_addr.to_string(),
            points: 0,
            avatar: None,
            created_at: now,
            updated_at: now,
        };
        state.users.push(user.clone());
        user
    }

    pub async fn set_config(&self, key: &str, value: &str) {
        let mut state = self.state.lock().await;
        match state.config.iter_mut().find(|c| c.key == key) {
            Some(row) => row.value = value.to_string(),
            None => {
                let id = state.config.len() as i32 + 1;
                state.config.push(PointsConfig {
                    id,
                    key: key.to_string(),
                    value: value.to_string(),
                    description: None,
                });
            }
        }
    }

    pub async fn user(&self, wallet_addr: &str) -> Option<User> {
        let state = self.state.lock().await;
        state
            .users
            .iter()
            .find(|u| u.wallet_addr == wallet_addr)
            .cloned()
    }

    pub async fn game_plays(&self) -> Vec<GamePlay> {
        self.state.lock().await.game_plays.clone()
    }

    pub async fn sessions(&self) -> Vec<PlaySession> {
        self.state.lock().await.sessions.clone()
    }

    /// Makes every following `increment_points` fail with a store error.
    pub fn fail_increments(&self, fail: bool) {
        self.fail_increments.store(fail, Ordering::SeqCst);
    }
}

pub struct MemoryLedgerUnit {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
    fail_increments: bool,
}

impl LedgerStore for MemoryLedgerStore {
    type Unit = MemoryLedgerUnit;

    async fn begin(&self) -> Result<MemoryLedgerUnit> {
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(MemoryLedgerUnit {
            guard,
            staged,
            fail_increments: self.fail_increments.load(Ordering::SeqCst),
        })
    }
}

impl LedgerUnit for MemoryLedgerUnit {
    async fn lock_user(&mut self, wallet_addr: &str) -> Result<Option<User>> {
        Ok(self
            .staged
            .users
            .iter()
            .find(|u| u.wallet_addr == wallet_addr)
            .cloned())
    }

    async fn points_config(&mut self) -> Result<Vec<PointsConfig>> {
        Ok(self.staged.config.clone())
    }

    async fn game_plays_in_window(
        &mut self,
        user_id: i32,
        game_id: i32,
        window: DayWindow,
    ) -> Result<Vec<GamePlay>> {
        Ok(self
            .staged
            .game_plays
            .iter()
            .filter(|p| p.user_id == user_id && p.game_id == game_id)
            .filter(|p| window.contains(p.created_at))
            .cloned()
            .collect())
    }

    async fn ad_clicks_in_window(&mut self, user_id: i32, window: DayWindow) -> Result<Vec<i32>> {
        Ok(self
            .staged
            .game_plays
            .iter()
            .filter(|p| p.user_id == user_id && window.contains(p.created_at))
            .map(|p| p.ad_clicks)
            .collect())
    }

    async fn insert_game_play(
        &mut self,
        play: NewGamePlay,
        created_at: DateTime<Utc>,
    ) -> Result<GamePlay> {
        let row = GamePlay {
            id: self.staged.game_plays.len() as i32 + 1,
            user_id: play.user_id,
            game_id: play.game_id,
            duration: play.duration,
            ad_clicks: play.ad_clicks,
            earned_points: play.earned_points,
            created_at,
        };
        self.staged.game_plays.push(row.clone());
        Ok(row)
    }

    async fn increment_points(&mut self, user_id: i32, amount: i64) -> Result<i64> {
        if self.fail_increments {
            return Err(sqlx::Error::Protocol("injected increment failure".to_string()).into());
        }
        let user = self
            .staged
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or(sqlx::Error::RowNotFound)?;
        user.points = user
            .points
            .checked_add(amount)
            .ok_or_else(|| sqlx::Error::Protocol("points balance out of range".to_string()))?;
        user.updated_at = Utc::now();
        Ok(user.points)
    }

    async fn insert_session(
        &mut self,
        token: &str,
        user_id: i32,
        game_id: i32,
        started_at: DateTime<Utc>,
    ) -> Result<PlaySession> {
        let session = PlaySession {
            id: self.staged.sessions.len() as i32 + 1,
            token: token.to_string(),
            user_id,
            game_id,
            started_at,
            status: SessionStatus::PENDING.to_string(),
            game_play_id: None,
            result: None,
            settled_at: None,
        };
        self.staged.sessions.push(session.clone());
        Ok(session)
    }

    async fn lock_session(&mut self, token: &str) -> Result<Option<PlaySession>> {
        Ok(self
            .staged
            .sessions
            .iter()
            .find(|s| s.token == token)
            .cloned())
    }

    async fn settle_session(
        &mut self,
        session_id: i32,
        game_play_id: i32,
        result: &str,
        settled_at: DateTime<Utc>,
    ) -> Result<()> {
        let session = self
            .staged
            .sessions
            .iter_mut()
            .find(|s| s.id == session_id)
            .ok_or(sqlx::Error::RowNotFound)?;
        session.status = SessionStatus::SETTLED.to_string();
        session.game_play_id = Some(game_play_id);
        session.result = Some(result.to_string());
        session.settled_at = Some(settled_at);
        Ok(())
    }

    async fn commit(mut self) -> Result<()> {
        *self.guard = std::mem::take(&mut self.staged);
        Ok(())
    }
}
