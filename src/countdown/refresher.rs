//! Periodic recomputation of countdowns for a tracked set of entities.
//!
//! A [`CountdownRefresher`] owns one tokio task. Every tick it samples the
//! clock once, recomputes every tracked entity from scratch and publishes the
//! result as a single immutable [`CountdownSnapshot`]. Readers only ever see
//! whole snapshots.
//!
//! Stopping is cancel-then-drain: [`CountdownRefresher::stop`] flips the
//! shared `stopped` flag under the same lock a tick publishes under, so once
//! it returns no tick can publish again, even one already in flight.

use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{CountdownState, CountdownWindow};

pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_secs(1);

/// Wall-clock source sampled once per tick.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Copy, Clone, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// An entity whose countdown is kept up to date. Entities without a window
/// are skipped on every tick until one is provided.
#[derive(Clone, Debug)]
pub struct Tracked<K> {
    pub id: K,
    pub window: Option<CountdownWindow>,
}

#[derive(Clone, Debug)]
pub struct CountdownSnapshot<K: Eq + Hash> {
    pub tick: u64,
    pub sampled_at: DateTime<Utc>,
    states: HashMap<K, CountdownState>,
}

impl<K: Eq + Hash> CountdownSnapshot<K> {
    fn empty(sampled_at: DateTime<Utc>) -> CountdownSnapshot<K> {
        CountdownSnapshot {
            tick: 0,
            sampled_at,
            states: HashMap::new(),
        }
    }

    /// State of `id` in this snapshot; anything not computed yet is pending.
    pub fn state(&self, id: &K) -> CountdownState {
        self.states
            .get(id)
            .copied()
            .unwrap_or(CountdownState::Pending)
    }

    pub fn get(&self, id: &K) -> Option<&CountdownState> {
        self.states.get(id)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &CountdownState)> {
        self.states.iter()
    }
}

struct Shared<K> {
    tracked: Vec<Tracked<K>>,
    ended: HashSet<K>,
    next_tick: u64,
    stopped: bool,
}

type Publisher<K> = watch::Sender<Arc<CountdownSnapshot<K>>>;

pub struct CountdownRefresher<K: Eq + Hash> {
    shared: Arc<Mutex<Shared<K>>>,
    receiver: watch::Receiver<Arc<CountdownSnapshot<K>>>,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl<K> CountdownRefresher<K>
where
    K: Clone + Eq + Hash + Debug + Send + Sync + 'static,
{
    /// Computes the initial snapshot right away and spawns the tick loop.
    ///
    /// Must be called from within a tokio runtime. `period` must be non-zero.
    pub fn start(
        entities: Vec<Tracked<K>>,
        clock: Arc<dyn Clock>,
        period: Duration,
    ) -> CountdownRefresher<K> {
        let entity_count = entities.len();
        let shared = Arc::new(Mutex::new(Shared {
            tracked: entities,
            ended: HashSet::new(),
            next_tick: 0,
            stopped: false,
        }));
        let (publisher, receiver) = watch::channel(Arc::new(CountdownSnapshot::empty(clock.now())));

        refresh(&shared, &*clock, &publisher);

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_refresh_loop(
            Arc::clone(&shared),
            clock,
            publisher,
            period,
            cancel.clone(),
        ));

        info!(
            entities = entity_count,
            period_ms = period.as_millis() as u64,
            "countdown refresher started"
        );

        CountdownRefresher {
            shared,
            receiver,
            cancel,
            handle: Some(handle),
        }
    }

    /// Replaces the tracked set. The change is picked up by the next tick;
    /// the current snapshot is left as is.
    pub fn track(&self, entities: Vec<Tracked<K>>) {
        debug!(entities = entities.len(), "replacing tracked countdowns");
        lock(&self.shared).tracked = entities;
    }
}

impl<K: Eq + Hash> CountdownRefresher<K> {
    pub fn snapshot(&self) -> Arc<CountdownSnapshot<K>> {
        Arc::clone(&self.receiver.borrow())
    }

    /// Receiver notified on every tick after this call.
    pub fn subscribe(&self) -> watch::Receiver<Arc<CountdownSnapshot<K>>> {
        let mut receiver = self.receiver.clone();
        receiver.borrow_and_update();
        receiver
    }

    pub fn is_stopped(&self) -> bool {
        lock(&self.shared).stopped
    }

    pub fn stop(&mut self) {
        let was_running = {
            let mut shared = lock(&self.shared);
            !std::mem::replace(&mut shared.stopped, true)
        };

        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }

        if was_running {
            info!("countdown refresher stopped");
        }
    }
}

impl<K: Eq + Hash> Drop for CountdownRefresher<K> {
    fn drop(&mut self) {
        self.stop();
    }
}

fn lock<K>(shared: &Mutex<Shared<K>>) -> MutexGuard<'_, Shared<K>> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn run_refresh_loop<K>(
    shared: Arc<Mutex<Shared<K>>>,
    clock: Arc<dyn Clock>,
    publisher: Publisher<K>,
    period: Duration,
    cancel: CancellationToken,
) where
    K: Clone + Eq + Hash + Debug + Send + Sync + 'static,
{
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                if !refresh(&shared, &*clock, &publisher) {
                    break;
                }
            }
        }
    }

    debug!("countdown refresh loop exited");
}

/// Runs one tick. Returns `false` if the refresher has been stopped.
fn refresh<K>(shared: &Mutex<Shared<K>>, clock: &dyn Clock, publisher: &Publisher<K>) -> bool
where
    K: Clone + Eq + Hash + Debug,
{
    let mut guard = lock(shared);
    if guard.stopped {
        return false;
    }

    let now = clock.now();
    let Shared {
        tracked,
        ended,
        next_tick,
        ..
    } = &mut *guard;

    let mut states = HashMap::with_capacity(tracked.len());
    for entity in tracked.iter() {
        let window = match entity.window {
            Some(window) => window,
            None => {
                debug!(id = ?entity.id, "skipping countdown without a window");
                continue;
            }
        };

        // ended is terminal, even if the wall clock steps backwards
        let state = if ended.contains(&entity.id) {
            CountdownState::Ended
        } else {
            CountdownState::from(window.compute(now))
        };

        if state.is_ended() {
            ended.insert(entity.id.clone());
        }
        states.insert(entity.id.clone(), state);
    }
    // marks survive skipped ticks and are only pruned once the entity is untracked
    let still_tracked: HashSet<&K> = tracked.iter().map(|entity| &entity.id).collect();
    ended.retain(|id| still_tracked.contains(id));

    let snapshot = CountdownSnapshot {
        tick: *next_tick,
        sampled_at: now,
        states,
    };
    *next_tick += 1;

    publisher.send_replace(Arc::new(snapshot));

    true
}
