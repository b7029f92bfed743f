//! Points accrual for reported play sessions.
//!
//! [`PointsEngine::earn`] turns a session report into an award: duration
//! tier points capped per game per day, ad-click points capped per user per
//! day, minus the per-session cost, floored at zero. The game play row and
//! the balance increment are written in one store transaction.

pub mod ad_observer;
pub mod engine;
pub mod error;
pub mod rules;
pub mod store;
pub mod window;

pub use engine::{EarnOutcome, EarnReport, PointsEngine};
pub use error::{PointsError, Result};
pub use rules::{Breakdown, Milestone, RuleSet};
pub use window::{Clock, DayPolicy, DayWindow, FixedClock, SystemClock};
