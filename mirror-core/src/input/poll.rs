//! Rate-limited access to the remote controller snapshot.
//!
//! A single frame usually queries every button, both sticks and the
//! touch surface. [`SnapshotCache`] serves all of those queries from one
//! fetched [`ControllerState`] and refreshes it at most once per
//! [`PollGate`] interval, whatever the caller's query rate.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::input::state::ControllerState;
use crate::link::RemoteLink;

/// Minimum spacing between two snapshot fetches (~120 Hz ceiling).
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(8);

// ── PollGate ─────────────────────────────────────────────────────

/// Remembers when the last fetch happened and whether another is due.
#[derive(Debug, Clone)]
pub struct PollGate {
    interval: Duration,
    last_poll: Option<Instant>,
}

impl PollGate {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_poll: None,
        }
    }

    /// Whether a fetch is allowed at `now`. Always true before the first
    /// fetch.
    pub fn is_due(&self, now: Instant) -> bool {
        match self.last_poll {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.interval,
        }
    }

    /// Record a successful fetch at `now`.
    pub fn mark(&mut self, now: Instant) {
        self.last_poll = Some(now);
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for PollGate {
    fn default() -> Self {
        Self::new(MIN_POLL_INTERVAL)
    }
}

// ── SnapshotCache ────────────────────────────────────────────────

struct CacheInner {
    state: ControllerState,
    gate: PollGate,
    fetches: u64,
}

/// Latest fetched [`ControllerState`] plus the gate that throttles
/// refreshes.
///
/// The lock is held across the gate check and the fetch, so concurrent
/// callers never both fetch inside one window and never see a torn
/// snapshot.
pub struct SnapshotCache {
    link: Arc<dyn RemoteLink>,
    inner: Mutex<CacheInner>,
}

impl SnapshotCache {
    /// A cache using the default 8 ms gate.
    pub fn new(link: Arc<dyn RemoteLink>) -> Self {
        Self::with_interval(link, MIN_POLL_INTERVAL)
    }

    pub fn with_interval(link: Arc<dyn RemoteLink>, interval: Duration) -> Self {
        Self {
            link,
            inner: Mutex::new(CacheInner {
                state: ControllerState::default(),
                gate: PollGate::new(interval),
                fetches: 0,
            }),
        }
    }

    /// Current snapshot, or `None` while the link is disconnected.
    pub fn poll(&self) -> Option<ControllerState> {
        self.poll_at(Instant::now())
    }

    /// [`poll`](Self::poll) with an explicit timestamp (useful for testing).
    pub fn poll_at(&self, now: Instant) -> Option<ControllerState> {
        if !self.link.is_connected() {
            return None;
        }

        let mut inner = self.inner.lock();
        if inner.gate.is_due(now) {
            inner.state = self.link.controller_snapshot();
            inner.gate.mark(now);
            inner.fetches += 1;
        }
        Some(inner.state)
    }

    /// Number of snapshots fetched from the link so far.
    pub fn fetch_count(&self) -> u64 {
        self.inner.lock().fetches
    }

    pub fn link(&self) -> &Arc<dyn RemoteLink> {
        &self.link
    }
}

// ── Tests ────────────────────────────────────────────────────────
