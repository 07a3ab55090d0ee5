use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use tracing::{info, warn, Level};

use crate::api::DEFAULT_BODY_LIMIT;
use crate::countdown::views::ViewLimits;
use crate::donation::aggregate::DEFAULT_STIPEND_RATE;
use crate::error::Error;

pub const DEFAULT_INTERN_GOAL: f64 = 20000.0;

/// Business values applied when deriving figures from portal data.
#[derive(Clone, Debug, PartialEq)]
pub struct PortalPolicy {
    pub stipend_rate: f64,
    pub intern_goal: f64,
    pub tick_interval: Duration,
}

impl Default for PortalPolicy {
    fn default() -> PortalPolicy {
        PortalPolicy {
            stipend_rate: DEFAULT_STIPEND_RATE,
            intern_goal: DEFAULT_INTERN_GOAL,
            tick_interval: Duration::from_secs(1),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: String,
    pub upstream_url: String,
    pub upstream_body_limit: usize,
    pub policy: PortalPolicy,
    pub view_limits: ViewLimits,
}

impl Config {
    pub fn load() -> Result<Config, Error> {
        Config::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Config, Error> {
        let stipend_rate: f64 = try_load(&lookup, "PORTAL_STIPEND_RATE", "0.20")?;
        if !(0.0..=1.0).contains(&stipend_rate) {
            return Err(invalid("PORTAL_STIPEND_RATE", stipend_rate));
        }

        let intern_goal: f64 = try_load(&lookup, "PORTAL_INTERN_GOAL", "20000")?;
        if !(intern_goal >= 0.0) || intern_goal.is_infinite() {
            return Err(invalid("PORTAL_INTERN_GOAL", intern_goal));
        }

        let tick_millis: u64 = try_load(&lookup, "PORTAL_TICK_MILLIS", "1000")?;
        if tick_millis == 0 {
            return Err(invalid("PORTAL_TICK_MILLIS", tick_millis));
        }

        let view_idle_secs: u64 = try_load(&lookup, "PORTAL_VIEW_IDLE_SECS", "300")?;
        if view_idle_secs == 0 {
            return Err(invalid("PORTAL_VIEW_IDLE_SECS", view_idle_secs));
        }

        let max_views: usize = try_load(&lookup, "PORTAL_MAX_VIEWS", "256")?;
        if max_views == 0 {
            return Err(invalid("PORTAL_MAX_VIEWS", max_views));
        }

        Ok(Config {
            bind_address: try_load(&lookup, "PORTAL_BIND_ADDRESS", "127.0.0.1:8080")?,
            upstream_url: try_load(
                &lookup,
                "PORTAL_UPSTREAM_URL",
                "https://intern-portal-gtn2.onrender.com",
            )?,
            upstream_body_limit: try_load(
                &lookup,
                "PORTAL_UPSTREAM_LIMIT",
                &DEFAULT_BODY_LIMIT.to_string(),
            )?,
            policy: PortalPolicy {
                stipend_rate,
                intern_goal,
                tick_interval: Duration::from_millis(tick_millis),
            },
            view_limits: ViewLimits {
                idle_timeout: Duration::from_secs(view_idle_secs),
                max_views,
            },
        })
    }
}

/// Read apart from [`Config`] so logging can be set up before the rest of
/// the configuration is loaded and logged.
pub fn load_log_level() -> Result<Level, Error> {
    try_load(&|key: &str| env::var(key).ok(), "PORTAL_LOG_LEVEL", "DEBUG")
}

fn try_load<T: FromStr>(
    lookup: &dyn Fn(&str) -> Option<String>,
    key: &str,
    default: &str,
) -> Result<T, Error>
where
    T::Err: Display,
{
    let value = lookup(key).unwrap_or_else(|| {
        info!("{} not set, using default: {}", key, default);
        default.to_string()
    });

    value.parse().map_err(|err| {
        warn!("invalid {} value: {}", key, err);
        Error::InvalidConfig {
            key: key.to_string(),
            value,
        }
    })
}

fn invalid(key: &str, value: impl Display) -> Error {
    warn!("{} is out of range: {}", key, value);
    Error::InvalidConfig {
        key: key.to_string(),
        value: value.to_string(),
    }
}
