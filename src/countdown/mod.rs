//! Campaign countdowns.
//!
//! [`compute`] turns a `(start, end, now)` triple into the time left until
//! `end` and the fraction of the window that has elapsed. The
//! [`refresher`] re-runs it on a fixed cadence for a tracked set of entities.

use std::fmt::{self, Display};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod endpoints;
pub mod manager;
pub mod refresher;
pub mod views;
pub use endpoints::*;

pub const MILLIS_PER_DAY: i64 = 86_400_000;
pub const MILLIS_PER_HOUR: i64 = 3_600_000;
pub const MILLIS_PER_MINUTE: i64 = 60_000;
pub const MILLIS_PER_SECOND: i64 = 1_000;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct TimeRemaining {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl TimeRemaining {
    pub fn from_millis(millis: i64) -> TimeRemaining {
        let millis = i64::max(millis, 0);

        TimeRemaining {
            days: millis / MILLIS_PER_DAY,
            hours: (millis % MILLIS_PER_DAY) / MILLIS_PER_HOUR,
            minutes: (millis % MILLIS_PER_HOUR) / MILLIS_PER_MINUTE,
            seconds: (millis % MILLIS_PER_MINUTE) / MILLIS_PER_SECOND,
        }
    }

    pub fn total_seconds(&self) -> i64 {
        self.days * 86_400 + self.hours * 3_600 + self.minutes * 60 + self.seconds
    }
}

impl Display for TimeRemaining {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}d {}h {}m {}s",
            self.days, self.hours, self.minutes, self.seconds
        )
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Countdown {
    pub remaining: TimeRemaining,
    pub percentage: f64,
}

impl Countdown {
    pub fn ended() -> Countdown {
        Countdown {
            remaining: TimeRemaining::default(),
            percentage: 100.0,
        }
    }

    pub fn is_ended(&self) -> bool {
        self.remaining == TimeRemaining::default() && self.percentage >= 100.0
    }
}

/// Computes the countdown for the window `[start, end]` as seen at `now`.
///
/// Once `now` reaches `end` the result is always [`Countdown::ended`]. A
/// window whose `end` is not after its `start` has no duration to measure
/// progress against and is reported as ended as well.
pub fn compute(start: DateTime<Utc>, end: DateTime<Utc>, now: DateTime<Utc>) -> Countdown {
    let remaining_ms = (end - now).num_milliseconds();
    let total_ms = (end - start).num_milliseconds();

    if remaining_ms <= 0 || total_ms <= 0 {
        return Countdown::ended();
    }

    let elapsed_ms = total_ms - remaining_ms;
    let percentage = (elapsed_ms as f64 / total_ms as f64 * 100.0).max(0.0).min(100.0);

    Countdown {
        remaining: TimeRemaining::from_millis(remaining_ms),
        percentage,
    }
}

/// Lifecycle of one tracked entity's countdown.
#[derive(Copy, Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(tag = "state", rename_all = "SCREAMING-KEBAB-CASE")]
pub enum CountdownState {
    Pending,
    Active(Countdown),
    Ended,
}

impl CountdownState {
    pub fn is_ended(&self) -> bool {
        matches!(self, CountdownState::Ended)
    }

    pub fn countdown(&self) -> Option<Countdown> {
        match self {
            CountdownState::Pending => None,
            CountdownState::Active(countdown) => Some(*countdown),
            CountdownState::Ended => Some(Countdown::ended()),
        }
    }

    /// Text shown next to a campaign, e.g. `5d 0h 12m 3s`.
    pub fn label(&self) -> String {
        match self {
            CountdownState::Pending => "Calculating...".to_string(),
            CountdownState::Active(countdown) => countdown.remaining.to_string(),
            CountdownState::Ended => "Ended".to_string(),
        }
    }
}

impl From<Countdown> for CountdownState {
    fn from(countdown: Countdown) -> CountdownState {
        if countdown.is_ended() {
            CountdownState::Ended
        } else {
            CountdownState::Active(countdown)
        }
    }
}

/// The `[start, end]` window of an entity being counted down.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CountdownWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl CountdownWindow {
    pub fn compute(&self, now: DateTime<Utc>) -> Countdown {
        compute(self.start, self.end, now)
    }
}
