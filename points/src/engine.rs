use common::models::{NewGamePlay, PlaySession};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    error::{PointsError, Result},
    rules::{Breakdown, RuleSet, SessionInput},
    store::{LedgerStore, LedgerUnit},
    window::{Clock, DayPolicy, SystemClock},
};

/// A finished session as reported by the client.
#[derive(Debug, Clone, Default)]
pub struct EarnReport {
    pub game_id: i32,
    /// Seconds played.
    pub duration: i64,
    pub ad_clicks: i64,
    /// Token from `start_session`, if the client obtained one.
    pub session_token: Option<String>,
}

fn is_false(v: &bool) -> bool {
    !*v
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EarnOutcome {
    pub earned_points: i64,
    pub breakdown: Breakdown,
    pub total_points: i64,
    pub game_play_id: i32,
    /// True when this is the stored result of an already settled session.
    #[serde(default, skip_serializing_if = "is_false")]
    pub replayed: bool,
    #[serde(skip)]
    pub tier_clipped: bool,
    #[serde(skip)]
    pub rejected_ad_clicks: i64,
}

pub struct PointsEngine<S, C = SystemClock> {
    store: S,
    clock: C,
    day_policy: DayPolicy,
}

impl<S: LedgerStore, C: Clock> PointsEngine<S, C> {
    pub fn new(store: S, clock: C, day_policy: DayPolicy) -> Self {
        Self {
            store,
            clock,
            day_policy,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn day_policy(&self) -> DayPolicy {
        self.day_policy
    }

    /// Awards points for one reported session.
    ///
    /// The user row stays locked from the first read to the commit, so the
    /// cap sums cannot go stale between reading today's rows and inserting
    /// the new one. Without a session token every call creates a new row;
    /// with one, a second call returns the first call's outcome.
    pub async fn earn(&self, wallet_addr: &str, report: EarnReport) -> Result<EarnOutcome> {
        validate_report(&report)?;

        let now = self.clock.now();
        let mut unit = self.store.begin().await?;

        let user = unit
            .lock_user(wallet_addr)
            .await?
            .ok_or(PointsError::NotFound)?;

        let mut duration = report.duration;
        let session = match report.session_token.as_deref() {
            Some(token) => {
                let session = unit
                    .lock_session(token)
                    .await?
                    .ok_or(PointsError::SessionNotFound)?;
                if session.user_id != user.id || session.game_id != report.game_id {
                    return Err(PointsError::Validation(
                        "Session does not belong to this user and game".to_string(),
                    ));
                }
                if session.is_settled() {
                    let outcome = replay(&session)?;
                    info!(
                        "Replaying settled session {} for {}: {} points",
                        session.token, wallet_addr, outcome.earned_points
                    );
                    return Ok(outcome);
                }

                let elapsed = (now - session.started_at).num_seconds().max(0);
                if duration > elapsed {
                    debug!(
                        "Reported duration {}s exceeds server elapsed {}s for session {}",
                        duration, elapsed, session.token
                    );
                    duration = elapsed;
                }
                Some(session)
            }
            None => None,
        };

        let rules = RuleSet::from_config(&unit.points_config().await?);
        let window = self.day_policy.window(now);

        let prior_plays = unit
            .game_plays_in_window(user.id, report.game_id, window)
            .await?;
        let today_ad_clicks: i64 = unit
            .ad_clicks_in_window(user.id, window)
            .await?
            .into_iter()
            .map(i64::from)
            .sum();

        let award = rules.assess(&SessionInput {
            duration,
            ad_clicks: report.ad_clicks,
            prior_durations: prior_plays.iter().map(|p| i64::from(p.duration)).collect(),
            today_ad_clicks,
        });

        if award.tier_clipped() {
            debug!(
                "Tier points for {} on game {} clipped from {} to {} (today: {})",
                wallet_addr,
                report.game_id,
                award.raw_tier_points,
                award.breakdown.time_points,
                award.today_tier_sum
            );
        }
        let rejected_ad_clicks = report.ad_clicks - award.breakdown.valid_ad_clicks;
        if rejected_ad_clicks > 0 {
            debug!(
                "Daily ad click cap reached for {}: counted {} of {} (today: {})",
                wallet_addr, award.breakdown.valid_ad_clicks, report.ad_clicks, today_ad_clicks
            );
        }

        let play = unit
            .insert_game_play(
                NewGamePlay {
                    user_id: user.id,
                    game_id: report.game_id,
                    duration: to_column(duration, "duration")?,
                    ad_clicks: to_column(report.ad_clicks, "adClicks")?,
                    earned_points: award.earned_points,
                },
                now,
            )
            .await?;
        let total_points = unit.increment_points(user.id, award.earned_points).await?;

        let outcome = EarnOutcome {
            earned_points: award.earned_points,
            breakdown: award.breakdown.clone(),
            total_points,
            game_play_id: play.id,
            replayed: false,
            tier_clipped: award.tier_clipped(),
            rejected_ad_clicks,
        };

        if let Some(session) = session {
            let result = serde_json::to_string(&outcome)
                .map_err(|e| PointsError::Corrupt(e.to_string()))?;
            unit.settle_session(session.id, play.id, &result, now).await?;
        }

        unit.commit().await?;

        info!(
            wallet = wallet_addr,
            game_id = report.game_id,
            duration,
            minutes = award.breakdown.duration_minutes,
            time_points = award.breakdown.time_points,
            today_tier_sum = award.today_tier_sum,
            ad_clicks = report.ad_clicks,
            valid_ad_clicks = award.breakdown.valid_ad_clicks,
            today_ad_clicks,
            ad_points = award.breakdown.ad_points,
            open_game_cost = award.breakdown.open_game_cost,
            earned_points = award.earned_points,
            total_points,
            "Points awarded"
        );

        Ok(outcome)
    }

    /// Issues a pending session token stamped with the server clock.
    pub async fn start_session(&self, wallet_addr: &str, game_id: i32) -> Result<PlaySession> {
        let now = self.clock.now();
        let mut unit = self.store.begin().await?;

        let user = unit
            .lock_user(wallet_addr)
            .await?
            .ok_or(PointsError::NotFound)?;

        let token = Uuid::new_v4().to_string();
        let session = unit.insert_session(&token, user.id, game_id, now).await?;
        unit.commit().await?;

        info!(
            "Started play session {} for {} on game {}",
            session.token, wallet_addr, game_id
        );
        Ok(session)
    }
}

fn validate_report(report: &EarnReport) -> Result<()> {
    if report.duration < 0 {
        return Err(PointsError::Validation(
            "duration must be non-negative".to_string(),
        ));
    }
    if report.ad_clicks < 0 {
        return Err(PointsError::Validation(
            "adClicks must be non-negative".to_string(),
        ));
    }
    Ok(())
}

fn to_column(value: i64, field: &str) -> Result<i32> {
    i32::try_from(value).map_err(|_| PointsError::Validation(format!("{} is out of range", field)))
}

fn replay(session: &PlaySession) -> Result<EarnOutcome> {
    let stored = session.result.as_deref().ok_or_else(|| {
        PointsError::Corrupt(format!("settled session {} has no result", session.token))
    })?;
    let mut outcome: EarnOutcome =
        serde_json::from_str(stored).map_err(|e| PointsError::Corrupt(e.to_string()))?;
    outcome.replayed = true;
    Ok(outcome)
}
