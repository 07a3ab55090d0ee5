use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::campaign::{Campaign, CampaignId};
use crate::error::Error;
use crate::typedid::{TypedId, TypedIdMarker};

use super::refresher::{Clock, CountdownRefresher, CountdownSnapshot, Tracked};

pub type CountdownViewId = TypedId<CountdownView>;

pub const DEFAULT_VIEW_IDLE_TIMEOUT: Duration = Duration::from_secs(300);
pub const DEFAULT_MAX_VIEWS: usize = 256;

/// Bounds on the live view registry. A view nobody has read or reloaded for
/// `idle_timeout` is stopped and dropped.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ViewLimits {
    pub idle_timeout: Duration,
    pub max_views: usize,
}

impl ViewLimits {
    /// How often the reaper looks for idle views.
    pub fn sweep_period(&self) -> Duration {
        (self.idle_timeout / 2).max(Duration::from_millis(100))
    }
}

impl Default for ViewLimits {
    fn default() -> ViewLimits {
        ViewLimits {
            idle_timeout: DEFAULT_VIEW_IDLE_TIMEOUT,
            max_views: DEFAULT_MAX_VIEWS,
        }
    }
}

/// A set of campaigns whose countdowns are kept live by a refresher until
/// the view is deleted.
pub struct CountdownView {
    pub id: CountdownViewId,
    pub ongoing_only: bool,
    pub created_at: DateTime<Utc>,
    pub reloaded_at: DateTime<Utc>,
    last_used: Instant,
    campaigns: Vec<Campaign>,
    refresher: CountdownRefresher<CampaignId>,
}

impl TypedIdMarker for CountdownView {
    fn tag() -> &'static str {
        "CDV"
    }
}

impl CountdownView {
    pub fn start(
        ongoing_only: bool,
        campaigns: Vec<Campaign>,
        clock: Arc<dyn Clock>,
        period: Duration,
    ) -> CountdownView {
        let now = clock.now();
        let refresher = CountdownRefresher::start(tracked(&campaigns), clock, period);

        CountdownView {
            id: CountdownViewId::new(),
            ongoing_only,
            created_at: now,
            reloaded_at: now,
            last_used: Instant::now(),
            campaigns,
            refresher,
        }
    }

    pub fn campaigns(&self) -> &[Campaign] {
        &self.campaigns
    }

    pub fn snapshot(&self) -> Arc<CountdownSnapshot<CampaignId>> {
        self.refresher.snapshot()
    }

    /// Swaps in a freshly fetched campaign list. Countdowns for it show up
    /// from the refresher's next tick.
    pub fn replace_campaigns(&mut self, campaigns: Vec<Campaign>, now: DateTime<Utc>) {
        self.refresher.track(tracked(&campaigns));
        self.campaigns = campaigns;
        self.reloaded_at = now;
    }

    pub fn stop(&mut self) {
        self.refresher.stop();
    }
}

fn tracked(campaigns: &[Campaign]) -> Vec<Tracked<CampaignId>> {
    campaigns
        .iter()
        .map(|campaign| Tracked {
            id: campaign.id.clone(),
            window: campaign.window(),
        })
        .collect()
}

/// Live countdown views, shared by every worker.
pub struct CountdownViews {
    clock: Arc<dyn Clock>,
    limits: ViewLimits,
    views: Mutex<HashMap<CountdownViewId, CountdownView>>,
}

impl CountdownViews {
    pub fn new(clock: Arc<dyn Clock>, limits: ViewLimits) -> CountdownViews {
        CountdownViews {
            clock,
            limits,
            views: Mutex::new(HashMap::new()),
        }
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    pub fn limits(&self) -> ViewLimits {
        self.limits
    }

    /// Registers a started view. Idle views are swept first; if the registry
    /// is still full the view is dropped, which stops its refresher.
    pub fn insert(&self, view: CountdownView) -> Result<CountdownViewId, Error> {
        let mut views = self.lock();
        sweep(&mut views, self.limits.idle_timeout);

        if views.len() >= self.limits.max_views {
            warn!(limit = self.limits.max_views, "countdown view limit reached");
            return Err(Error::TooManyCountdownViews {
                limit: self.limits.max_views,
            });
        }

        let view_id = view.id;
        views.insert(view_id, view);
        Ok(view_id)
    }

    /// Runs `f` against the view and marks it as used.
    pub fn with_view<R>(
        &self,
        view_id: CountdownViewId,
        f: impl FnOnce(&mut CountdownView) -> R,
    ) -> Option<R> {
        self.lock().get_mut(&view_id).map(|view| {
            view.last_used = Instant::now();
            f(view)
        })
    }

    pub fn remove(&self, view_id: CountdownViewId) -> Option<CountdownView> {
        self.lock().remove(&view_id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Stops and drops every view idle for longer than the idle timeout.
    /// Returns how many were dropped.
    pub fn sweep_idle(&self) -> usize {
        sweep(&mut self.lock(), self.limits.idle_timeout)
    }

    /// Stops every refresher. Used on shutdown.
    pub fn stop_all(&self) {
        let mut views = self.lock();
        for view in views.values_mut() {
            view.stop();
        }
        info!(views = views.len(), "stopped all countdown views");
        views.clear();
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CountdownViewId, CountdownView>> {
        self.views.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn sweep(views: &mut HashMap<CountdownViewId, CountdownView>, idle_timeout: Duration) -> usize {
    let now = Instant::now();
    let before = views.len();

    views.retain(|view_id, view| {
        let idle = now.saturating_duration_since(view.last_used) >= idle_timeout;
        if idle {
            view.stop();
            debug!(%view_id, "dropping idle countdown view");
        }
        !idle
    });

    let dropped = before - views.len();
    if dropped > 0 {
        info!(dropped, remaining = views.len(), "swept idle countdown views");
    }
    dropped
}

/// Background task sweeping idle views every [`ViewLimits::sweep_period`].
pub struct ViewReaper {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl ViewReaper {
    /// Must be called from within a tokio runtime.
    pub fn start(views: Arc<CountdownViews>) -> ViewReaper {
        let period = views.limits().sweep_period();
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        views.sweep_idle();
                    }
                }
            }

            debug!("countdown view reaper exited");
        });

        ViewReaper {
            cancel,
            handle: Some(handle),
        }
    }

    pub fn stop(&mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for ViewReaper {
    fn drop(&mut self) {
        self.stop();
    }
}
