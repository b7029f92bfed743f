//! Persistence seam for the engine.
//!
//! A `LedgerUnit` is one transaction. Everything read or written through it
//! commits together on `commit`; dropping it without committing discards
//! every write. `lock_user` must block other units for the same user until
//! this one finishes, which is what keeps the daily caps exact under
//! concurrent `earn` calls.

use chrono::{DateTime, Utc};
use common::models::{GamePlay, NewGamePlay, PlaySession, PointsConfig, User};

use crate::{error::Result, window::DayWindow};

pub mod memory;
pub mod postgres;

pub use memory::MemoryLedgerStore;
pub use postgres::PgLedgerStore;

#[allow(async_fn_in_trait)]
pub trait LedgerStore {
    type Unit: LedgerUnit;

    async fn begin(&self) -> Result<Self::Unit>;
}

#[allow(async_fn_in_trait)]
pub trait LedgerUnit {
    /// Fetches the user by wallet and holds its row lock until the unit ends.
    async fn lock_user(&mut self, wallet_addr: &str) -> Result<Option<User>>;

    async fn points_config(&mut self) -> Result<Vec<PointsConfig>>;

    async fn game_plays_in_window(
        &mut self,
        user_id: i32,
        game_id: i32,
        window: DayWindow,
    ) -> Result<Vec<GamePlay>>;

    /// Ad clicks of every game play by the user inside the window.
    async fn ad_clicks_in_window(&mut self, user_id: i32, window: DayWindow) -> Result<Vec<i32>>;

    async fn insert_game_play(
        &mut self,
        play: NewGamePlay,
        created_at: DateTime<Utc>,
    ) -> Result<GamePlay>;

    /// Adds `amount` to the balance and returns the new balance.
    async fn increment_points(&mut self, user_id: i32, amount: i64) -> Result<i64>;

    async fn insert_session(
        &mut self,
        token: &str,
        user_id: i32,
        game_id: i32,
        started_at: DateTime<Utc>,
    ) -> Result<PlaySession>;

    async fn lock_session(&mut self, token: &str) -> Result<Option<PlaySession>>;

    async fn settle_session(
        &mut self,
        session_id: i32,
        game_play_id: i32,
        result: &str,
        settled_at: DateTime<Utc>,
    ) -> Result<()>;

    async fn commit(self) -> Result<()>;
}
