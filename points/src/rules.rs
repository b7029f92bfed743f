//! Point rules: duration tiers, daily caps and the admin-tunable values.
//!
//! Tier values and both daily caps are structural and compiled in. Only
//! `points_per_ad_click`, `open_game_cost` and `min_play_time` come from the
//! `points_config` table, merged over the defaults below.

use common::models::PointsConfig;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// `(minimum minutes, points)`, highest tier first.
pub const DURATION_TIERS: [(i64, i64); 3] = [(60, 45), (30, 20), (15, 10)];
pub const TIER_CAP_PER_GAME_PER_DAY: i64 = 45;
pub const AD_CLICK_CAP_PER_DAY: i64 = 3;

pub const DEFAULT_POINTS_PER_AD_CLICK: i64 = 50;
pub const DEFAULT_OPEN_GAME_COST: i64 = 0;
pub const DEFAULT_MIN_PLAY_TIME: i64 = 900;

pub const KEY_POINTS_PER_AD_CLICK: &str = "points_per_ad_click";
pub const KEY_OPEN_GAME_COST: &str = "open_game_cost";
pub const KEY_MIN_PLAY_TIME: &str = "min_play_time";

pub fn duration_minutes(duration: i64) -> i64 {
    duration.max(0) / 60
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Milestone {
    #[serde(rename = "60min")]
    SixtyMinutes,
    #[serde(rename = "30min")]
    ThirtyMinutes,
    #[serde(rename = "15min")]
    FifteenMinutes,
    #[serde(rename = "none")]
    Unqualified,
}

impl Milestone {
    /// Label shown to the player. Depends on minutes alone, not on
    /// `min_play_time`.
    pub fn from_minutes(minutes: i64) -> Self {
        if minutes >= 60 {
            Milestone::SixtyMinutes
        } else if minutes >= 30 {
            Milestone::ThirtyMinutes
        } else if minutes >= 15 {
            Milestone::FifteenMinutes
        } else {
            Milestone::Unqualified
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleSet {
    pub points_per_ad_click: i64,
    pub open_game_cost: i64,
    pub min_play_time: i64,
    pub tier_cap_per_game: i64,
    pub ad_click_cap_per_day: i64,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            points_per_ad_click: DEFAULT_POINTS_PER_AD_CLICK,
            open_game_cost: DEFAULT_OPEN_GAME_COST,
            min_play_time: DEFAULT_MIN_PLAY_TIME,
            tier_cap_per_game: TIER_CAP_PER_GAME_PER_DAY,
            ad_click_cap_per_day: AD_CLICK_CAP_PER_DAY,
        }
    }
}

fn parse_non_negative(row: &PointsConfig, default: i64) -> i64 {
    match row.value.trim().parse::<i64>() {
        Ok(v) if v >= 0 => v,
        _ => {
            warn!(
                "Ignoring invalid value {:?} for config key {}, using {}",
                row.value, row.key, default
            );
            default
        }
    }
}

impl RuleSet {
    /// Builds a rule set from config rows. Missing keys keep their default;
    /// unknown keys are ignored.
    pub fn from_config(rows: &[PointsConfig]) -> Self {
        let mut rules = RuleSet::default();
        for row in rows {
            match row.key.as_str() {
                KEY_POINTS_PER_AD_CLICK => {
                    rules.points_per_ad_click = parse_non_negative(row, DEFAULT_POINTS_PER_AD_CLICK)
                }
                KEY_OPEN_GAME_COST => {
                    rules.open_game_cost = parse_non_negative(row, DEFAULT_OPEN_GAME_COST)
                }
                KEY_MIN_PLAY_TIME => {
                    rules.min_play_time = parse_non_negative(row, DEFAULT_MIN_PLAY_TIME)
                }
                _ => {}
            }
        }
        rules
    }

    /// Tier points for a single session, before any daily cap.
    pub fn tier_points(&self, duration: i64) -> i64 {
        if duration < self.min_play_time {
            return 0;
        }
        let minutes = duration_minutes(duration);
        DURATION_TIERS
            .iter()
            .find(|(min_minutes, _)| minutes >= *min_minutes)
            .map(|(_, points)| *points)
            .unwrap_or(0)
    }

    /// Sum of tier points the given historical durations would earn today.
    pub fn tier_sum<I>(&self, durations: I) -> i64
    where
        I: IntoIterator<Item = i64>,
    {
        durations.into_iter().map(|d| self.tier_points(d)).sum()
    }

    pub fn clip_tier(&self, today_tier_sum: i64, tier: i64) -> i64 {
        let remaining = self.tier_cap_per_game - today_tier_sum;
        if remaining <= 0 {
            0
        } else {
            tier.min(remaining)
        }
    }

    pub fn valid_ad_clicks(&self, reported: i64, today_ad_clicks: i64) -> i64 {
        let remaining = (self.ad_click_cap_per_day - today_ad_clicks).max(0);
        reported.max(0).min(remaining)
    }

    /// Runs the full award computation for one session.
    pub fn assess(&self, input: &SessionInput) -> Award {
        let minutes = duration_minutes(input.duration);
        let raw_tier = self.tier_points(input.duration);
        let today_tier_sum = self.tier_sum(input.prior_durations.iter().copied());
        let time_points = self.clip_tier(today_tier_sum, raw_tier);

        let valid_ad_clicks = self.valid_ad_clicks(input.ad_clicks, input.today_ad_clicks);
        // Config values are admin-set and unbounded; saturate rather than wrap.
        let ad_points = valid_ad_clicks.saturating_mul(self.points_per_ad_click);

        let earned_points = time_points
            .saturating_add(ad_points)
            .saturating_sub(self.open_game_cost)
            .max(0);

        Award {
            earned_points,
            raw_tier_points: raw_tier,
            today_tier_sum,
            breakdown: Breakdown {
                time_points,
                ad_points,
                open_game_cost: self.open_game_cost,
                duration_minutes: minutes,
                milestone: Milestone::from_minutes(minutes),
                valid_ad_clicks,
            },
        }
    }
}

/// Facts about a session and the user's day so far.
#[derive(Debug, Clone, Default)]
pub struct SessionInput {
    pub duration: i64,
    pub ad_clicks: i64,
    /// Durations of today's earlier sessions for the same user and game.
    pub prior_durations: Vec<i64>,
    /// Ad clicks already recorded today for the user across all games.
    pub today_ad_clicks: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Breakdown {
    pub time_points: i64,
    pub ad_points: i64,
    pub open_game_cost: i64,
    pub duration_minutes: i64,
    pub milestone: Milestone,
    pub valid_ad_clicks: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Award {
    pub earned_points: i64,
    pub raw_tier_points: i64,
    pub today_tier_sum: i64,
    pub breakdown: Breakdown,
}

impl Award {
    pub fn tier_clipped(&self) -> bool {
        self.breakdown.time_points < self.raw_tier_points
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(key: &str, value: &str) -> PointsConfig {
        PointsConfig {
            id: 0,
            key: key.to_string(),
            value: value.to_string(),
            description: None,
        }
    }

    #[test]
    fn tier_points_is_a_non_decreasing_step_function() {
        let rules = RuleSet::default();
        let mut last = 0;
        for duration in (0..=7200).step_by(30) {
            let points = rules.tier_points(duration);
            assert!(points >= last, "tier dropped at {}s", duration);
            last = points;
        }
        assert_eq!(rules.tier_points(899), 0);
        assert_eq!(rules.tier_points(900), 10);
        assert_eq!(rules.tier_points(1800), 20);
        assert_eq!(rules.tier_points(3600), 45);
    }

    #[test]
    fn below_min_play_time_earns_no_tier_even_past_an_hour() {
        let rules = RuleSet {
            min_play_time: 4000,
            ..RuleSet::default()
        };
        assert_eq!(duration_minutes(3999), 66);
        assert_eq!(rules.tier_points(3999), 0);
        assert_eq!(rules.tier_points(4000), 45);
    }

    #[test]
    fn milestone_tracks_minutes_only() {
        assert_eq!(Milestone::from_minutes(14), Milestone::Unqualified);
        assert_eq!(Milestone::from_minutes(15), Milestone::FifteenMinutes);
        assert_eq!(Milestone::from_minutes(45), Milestone::ThirtyMinutes);
        assert_eq!(Milestone::from_minutes(61), Milestone::SixtyMinutes);
        assert_eq!(
            serde_json::to_string(&Milestone::ThirtyMinutes).unwrap(),
            "\"30min\""
        );
    }

    #[test]
    fn from_config_merges_over_defaults() {
        let rules = RuleSet::from_config(&[
            config(KEY_POINTS_PER_AD_CLICK, "25"),
            config(KEY_MIN_PLAY_TIME, " 60 "),
            config("points_15min", "11"),
        ]);
        assert_eq!(rules.points_per_ad_click, 25);
        assert_eq!(rules.min_play_time, 60);
        assert_eq!(rules.open_game_cost, DEFAULT_OPEN_GAME_COST);
        assert_eq!(rules.tier_points(900), 10);
    }

    #[test]
    fn from_config_falls_back_on_bad_values() {
        let rules = RuleSet::from_config(&[
            config(KEY_OPEN_GAME_COST, "-5"),
            config(KEY_POINTS_PER_AD_CLICK, "lots"),
            config(KEY_MIN_PLAY_TIME, "0"),
        ]);
        assert_eq!(rules.open_game_cost, DEFAULT_OPEN_GAME_COST);
        assert_eq!(rules.points_per_ad_click, DEFAULT_POINTS_PER_AD_CLICK);
        assert_eq!(rules.min_play_time, 0);
    }

    #[test]
    fn thirty_minute_session_with_two_ad_clicks() {
        let award = RuleSet::default().assess(&SessionInput {
            duration: 1800,
            ad_clicks: 2,
            ..SessionInput::default()
        });
        assert_eq!(award.breakdown.time_points, 20);
        assert_eq!(award.breakdown.ad_points, 100);
        assert_eq!(award.breakdown.milestone, Milestone::ThirtyMinutes);
        assert_eq!(award.earned_points, 120);
    }

    #[test]
    fn second_session_is_clipped_to_remaining_cap() {
        let award = RuleSet::default().assess(&SessionInput {
            duration: 3700,
            ad_clicks: 2,
            prior_durations: vec![1800],
            today_ad_clicks: 2,
        });
        assert_eq!(award.raw_tier_points, 45);
        assert_eq!(award.today_tier_sum, 20);
        assert_eq!(award.breakdown.time_points, 25);
        assert!(award.tier_clipped());
        assert_eq!(award.breakdown.valid_ad_clicks, 1);
        assert_eq!(award.earned_points, 75);
    }

    #[test]
    fn third_session_gets_no_tier_points() {
        let award = RuleSet::default().assess(&SessionInput {
            duration: 5000,
            ad_clicks: 0,
            prior_durations: vec![1800, 3700],
            today_ad_clicks: 3,
        });
        assert_eq!(award.breakdown.time_points, 0);
        assert_eq!(award.earned_points, 0);
    }

    #[test]
    fn history_is_retiered_from_duration() {
        let rules = RuleSet::default();
        // 10 + 10 + 20 = 40, leaving 5
        let sum = rules.tier_sum([900, 1000, 1900, 60]);
        assert_eq!(sum, 40);
        assert_eq!(rules.clip_tier(sum, 20), 5);
        assert_eq!(rules.clip_tier(45, 10), 0);
        assert_eq!(rules.clip_tier(60, 10), 0);
    }

    #[test]
    fn ad_clicks_cap_per_day() {
        let rules = RuleSet::default();
        assert_eq!(rules.valid_ad_clicks(5, 0), 3);
        assert_eq!(rules.valid_ad_clicks(5, 2), 1);
        assert_eq!(rules.valid_ad_clicks(5, 3), 0);
        assert_eq!(rules.valid_ad_clicks(5, 7), 0);
        assert_eq!(rules.valid_ad_clicks(-1, 0), 0);
    }

    #[test]
    fn huge_config_values_saturate_instead_of_overflowing() {
        let rules = RuleSet::from_config(&[config(
            KEY_POINTS_PER_AD_CLICK,
            "4611686018427387904",
        )]);
        let award = rules.assess(&SessionInput {
            duration: 3600,
            ad_clicks: 2,
            ..SessionInput::default()
        });
        assert_eq!(award.breakdown.ad_points, i64::MAX);
        assert_eq!(award.earned_points, i64::MAX);

        let rules = RuleSet {
            open_game_cost: i64::MAX,
            ..rules
        };
        let award = rules.assess(&SessionInput {
            duration: 3600,
            ad_clicks: 2,
            ..SessionInput::default()
        });
        assert_eq!(award.earned_points, 0);
    }

    #[test]
    fn open_game_cost_never_drives_award_negative() {
        let rules = RuleSet {
            open_game_cost: 100,
            ..RuleSet::default()
        };
        let award = rules.assess(&SessionInput {
            duration: 1000,
            ad_clicks: 1,
            ..SessionInput::default()
        });
        assert_eq!(award.breakdown.time_points, 10);
        assert_eq!(award.breakdown.ad_points, 50);
        assert_eq!(award.breakdown.open_game_cost, 100);
        assert_eq!(award.earned_points, 0);
    }
}
