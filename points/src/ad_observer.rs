//! Ad-network navigation detection for the client-side click counter.
//!
//! Substring matching is coarse and can both over- and under-count. The
//! count only matters as input to `earn`, where the per-day cap applies.

/// URL fragments that mark a navigation as an ad click.
pub const AD_URL_PATTERNS: &[&str] = &[
    "googleads",
    "doubleclick",
    "googlesyndication",
    "adservice",
    "ads.",
    "ad.",
    "/ads/",
    "click.",
    "track.",
];

pub fn is_ad_navigation(url: &str) -> bool {
    let url = url.to_ascii_lowercase();
    AD_URL_PATTERNS.iter().any(|pattern| url.contains(pattern))
}

/// Per-session tally of ad navigations, reported once at session end.
#[derive(Debug, Default, Clone)]
pub struct AdClickCounter {
    count: u32,
}

impl AdClickCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts `url` if it looks like an ad navigation.
    pub fn observe(&mut self, url: &str) -> bool {
        let hit = is_ad_navigation(url);
        if hit {
            self.count = self.count.saturating_add(1);
        }
        hit
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    /// Returns the count and resets it for the next session.
    pub fn take(&mut self) -> u32 {
        std::mem::take(&mut self.count)
    }
}
