//! Per-scope usage limiting (cooldowns).
//!
//! A [`UsageTracker`] grants each scope (a user, or a group) at most
//! `bucket` uses per `window`. The window starts at the first use and does
//! not slide: once it has fully elapsed the next use opens a fresh window.
//!
//! Expired entries are removed by a background sweep task. Any use that
//! leaves the ledger non-empty starts the task if none is running, and the
//! task stops itself once the ledger is empty, so an idle bot holds no
//! timers. Sweeping needs a tokio runtime; without one, entries are still
//! reset lazily on the next use.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

use crate::message::Message;

/// Shortest sweep period; tokio intervals reject a zero period.
const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

/// Which identity a usage limit counts against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageScope {
    #[default]
    User,
    /// The message's group, or its channel when there is no group.
    Group,
}

/// Cooldown settings for one command.
///
/// A zero window disables limiting.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use chat_command_dispatch::{UsageLimit, UsageScope};
///
/// let limit = UsageLimit::new(2, Duration::from_secs(5)).with_scope(UsageScope::Group);
/// assert_eq!(limit.window(), Duration::from_secs(5));
/// assert_eq!(limit.sweep_interval(), limit.window());
/// assert!(UsageLimit::default().is_disabled());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageLimit {
    /// Uses granted per window.
    pub bucket: u32,
    pub window_ms: u64,
    #[serde(default)]
    pub scope: UsageScope,
    /// Sweep period; the window length when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sweep_interval_ms: Option<u64>,
}

impl Default for UsageLimit {
    fn default() -> Self {
        Self {
            bucket: 1,
            window_ms: 0,
            scope: UsageScope::User,
            sweep_interval_ms: None,
        }
    }
}

impl UsageLimit {
    pub fn new(bucket: u32, window: Duration) -> Self {
        Self {
            bucket,
            window_ms: duration_ms(window),
            ..Self::default()
        }
    }

    pub fn with_scope(mut self, scope: UsageScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval_ms = Some(duration_ms(interval));
        self
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        self.sweep_interval_ms
            .map_or(self.window(), Duration::from_millis)
            .max(MIN_SWEEP_INTERVAL)
    }

    pub fn is_disabled(&self) -> bool {
        self.window_ms == 0
    }

    /// Ledger key `message` counts against.
    pub fn scope_key<'a>(&self, message: &'a Message) -> &'a str {
        match self.scope {
            UsageScope::User => &message.author_id,
            UsageScope::Group => message.group_id.as_deref().unwrap_or(&message.channel.id),
        }
    }

    /// Reason the limit cannot be enforced, if any.
    pub fn problem(&self) -> Option<&'static str> {
        (!self.is_disabled() && self.bucket == 0)
            .then_some("bucket must be at least 1 when a window is set")
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Uses recorded for one scope in its current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageEntry {
    pub bucket: u32,
    pub last_reset: Instant,
}

impl UsageEntry {
    fn fresh(now: Instant) -> Self {
        Self {
            bucket: 1,
            last_reset: now,
        }
    }

    fn expired(&self, now: Instant, window: Duration) -> bool {
        now.saturating_duration_since(self.last_reset) > window
    }
}

#[derive(Debug, Default)]
struct Ledger {
    entries: HashMap<String, UsageEntry>,
    sweeper: Option<JoinHandle<()>>,
}

/// Cooldown ledger for one command.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use chat_command_dispatch::{UsageLimit, UsageTracker};
///
/// let tracker = UsageTracker::new(UsageLimit::new(1, Duration::from_secs(60)));
/// assert!(tracker.allow_usage("alice"));
/// assert!(!tracker.allow_usage("alice"));
/// assert!(tracker.allow_usage("bob"));
/// ```
#[derive(Debug)]
pub struct UsageTracker {
    limit: UsageLimit,
    ledger: Arc<Mutex<Ledger>>,
}

impl UsageTracker {
    pub fn new(limit: UsageLimit) -> Self {
        Self {
            limit,
            ledger: Arc::default(),
        }
    }

    pub fn limit(&self) -> &UsageLimit {
        &self.limit
    }

    /// Records a use by `scope` now. Returns `false` when the bucket is
    /// exhausted for the current window.
    pub fn allow_usage(&self, scope: &str) -> bool {
        self.allow_usage_at(scope, Instant::now())
    }

    /// Records a use by `scope` at `now`.
    pub fn allow_usage_at(&self, scope: &str, now: Instant) -> bool {
        if self.limit.is_disabled() {
            return true;
        }
        let window = self.limit.window();
        let mut ledger = lock(&self.ledger);

        let allowed = match ledger.entries.entry(scope.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(UsageEntry::fresh(now));
                true
            }
            Entry::Occupied(mut slot) => {
                let entry = slot.get_mut();
                if entry.expired(now, window) {
                    *entry = UsageEntry::fresh(now);
                    true
                } else if entry.bucket >= self.limit.bucket {
                    false
                } else {
                    entry.bucket += 1;
                    true
                }
            }
        };

        self.start_sweeper(&mut ledger);
        allowed
    }

    /// Time until `scope` may use the command again, if it is currently
    /// rate-limited.
    pub fn retry_after(&self, scope: &str) -> Option<Duration> {
        let ledger = lock(&self.ledger);
        let entry = ledger.entries.get(scope)?;
        let now = Instant::now();
        let window = self.limit.window();
        if entry.bucket < self.limit.bucket || entry.expired(now, window) {
            return None;
        }
        Some(window.saturating_sub(now.saturating_duration_since(entry.last_reset)))
    }

    /// Current ledger entry for `scope`.
    pub fn entry(&self, scope: &str) -> Option<UsageEntry> {
        lock(&self.ledger).entries.get(scope).copied()
    }

    /// Number of scopes holding an entry.
    pub fn active_scopes(&self) -> usize {
        lock(&self.ledger).entries.len()
    }

    /// Whether the background sweep task is running.
    pub fn is_sweeping(&self) -> bool {
        lock(&self.ledger)
            .sweeper
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    fn start_sweeper(&self, ledger: &mut Ledger) {
        let running = ledger.sweeper.as_ref().is_some_and(|h| !h.is_finished());
        if running || ledger.entries.is_empty() {
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let period = self.limit.sweep_interval();
        debug!(period_ms = period.as_millis() as u64, "Starting usage sweep");
        ledger.sweeper = Some(runtime.spawn(sweep(
            Arc::downgrade(&self.ledger),
            self.limit.window(),
            period,
        )));
    }
}

impl Drop for UsageTracker {
    fn drop(&mut self) {
        if let Some(handle) = lock(&self.ledger).sweeper.take() {
            handle.abort();
        }
    }
}

fn lock(ledger: &Mutex<Ledger>) -> MutexGuard<'_, Ledger> {
    ledger.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn sweep(ledger: Weak<Mutex<Ledger>>, window: Duration, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // First tick completes immediately.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let Some(ledger) = ledger.upgrade() else {
            return;
        };
        if !sweep_once(&ledger, window) {
            return;
        }
    }
}

/// Removes expired entries. Returns `false` once the ledger is empty, after
/// detaching the sweeper.
fn sweep_once(ledger: &Mutex<Ledger>, window: Duration) -> bool {
    let mut ledger = lock(ledger);
    let now = Instant::now();
    let before = ledger.entries.len();
    ledger.entries.retain(|_, entry| !entry.expired(now, window));

    let swept = before - ledger.entries.len();
    if swept > 0 {
        debug!(swept, remaining = ledger.entries.len(), "Swept expired usage entries");
    }
    if ledger.entries.is_empty() {
        ledger.sweeper = None;
        debug!("Usage ledger empty, stopping sweep");
        return false;
    }
    true
}
