// Theme selection policy - combines the local hour with the region
// classification into a light/dark decision.
//
// Decisions are ephemeral: recomputed per request, never stored. A
// user-chosen override lives elsewhere and wins outright; this policy is
// only consulted when no override exists.

use chrono::{DateTime, Timelike, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::core::location::{is_southern_region, Location};

/// Local-hour window (inclusive start, exclusive end) in which the light
/// theme is eligible.
pub const LIGHT_WINDOW_START: u32 = 10;
pub const LIGHT_WINDOW_END: u32 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
}

/// A theme decision plus the human-readable justification we surface to the
/// client ("why am I seeing dark mode?").
#[derive(Debug, Clone, Serialize)]
pub struct ThemeDecision {
    pub theme: Theme,
    pub reason: String,
    pub computed_at: DateTime<Utc>,
}

/// Which variant of the rule to apply.
///
/// The rule shipped in three conflicting versions over time. They survive
/// here as named strategies so each one stays testable; `RequireBoth` is
/// the canonical rule and the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeRule {
    /// Light only when the region is southern AND the local hour is in the
    /// 10 AM - 12 PM window.
    RequireBoth,
    /// Light when either condition holds.
    EitherCondition,
    /// `RequireBoth` for anonymous visitors; logged-in users are always
    /// dark.
    AnonymousRequireBoth { logged_in: bool },
}

#[derive(Debug, Clone)]
pub struct ThemeConfig {
    pub rule: ThemeRule,
    /// Timezone the hour window is evaluated in.
    pub timezone: Tz,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            rule: ThemeRule::RequireBoth,
            timezone: chrono_tz::Asia::Kolkata,
        }
    }
}

pub struct ThemePolicy {
    config: ThemeConfig,
}

impl ThemePolicy {
    pub fn new(config: ThemeConfig) -> Self {
        Self { config }
    }

    /// Decide the theme for a request.
    ///
    /// `location` is whatever the resolver produced - `None` (or the
    /// `Unknown` placeholder region) simply fails the southern condition.
    pub fn decide(&self, location: Option<&Location>, now: DateTime<Utc>) -> ThemeDecision {
        let local_hour = now.with_timezone(&self.config.timezone).hour();
        let in_window = (LIGHT_WINDOW_START..LIGHT_WINDOW_END).contains(&local_hour);
        let southern = location
            .map(|l| is_southern_region(&l.region))
            .unwrap_or(false);

        let (light, forced_dark) = match self.config.rule {
            ThemeRule::RequireBoth => (southern && in_window, false),
            ThemeRule::EitherCondition => (southern || in_window, false),
            ThemeRule::AnonymousRequireBoth { logged_in } => {
                (!logged_in && southern && in_window, logged_in)
            }
        };

        let theme = if light { Theme::Light } else { Theme::Dark };
        let reason = build_reason(theme, southern, in_window, local_hour, forced_dark);

        tracing::info!(
            region = location.map(|l| l.region.as_str()).unwrap_or("none"),
            local_hour,
            southern,
            in_window,
            rule = ?self.config.rule,
            theme = ?theme,
            "theme decision"
        );

        ThemeDecision {
            theme,
            reason,
            computed_at: now,
        }
    }
}

fn build_reason(
    theme: Theme,
    southern: bool,
    in_window: bool,
    local_hour: u32,
    forced_dark: bool,
) -> String {
    if forced_dark {
        return "Logged-in users always use the dark theme".to_string();
    }

    match theme {
        Theme::Light => match (southern, in_window) {
            (true, true) => {
                "Southern India location and time within the 10 AM-12 PM window".to_string()
            }
            (true, false) => "Located in Southern India".to_string(),
            (false, true) => "Time is between 10 AM and 12 PM".to_string(),
            // A light decision always has at least one condition behind it.
            (false, false) => unreachable!("light theme without a holding condition"),
        },
        Theme::Dark => match (southern, in_window) {
            (false, false) => format!(
                "Not in Southern India and outside the 10 AM-12 PM window (current hour: {local_hour})"
            ),
            (false, true) => "Not in Southern India (requires TN/KL/KA/AP/TG)".to_string(),
            (true, false) => {
                format!("Outside the 10 AM-12 PM window (current hour: {local_hour})")
            }
            (true, true) => unreachable!("dark theme with both conditions holding"),
        },
    }
}
