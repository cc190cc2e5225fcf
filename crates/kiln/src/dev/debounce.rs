//! Trailing-edge debouncing, one timer per concern.
//!
//! The session owns a single [`Debouncer`] keyed by [`Concern`]. `notify`
//! (re)arms a concern's deadline; [`Debouncer::fired`] resolves when the
//! earliest deadline passes and yields the concern, with no event payload.
//! Each concern has its own deadline, so rebuild bursts never move the reload
//! broadcast and vice versa.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::time::Duration;
use tokio::time::Instant;

use crate::config::DebounceConfig;

/// What a debounced firing asks the session to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Concern {
    /// Rebuild the target
    Rebuild,
    /// Flush acknowledgements and the pending reload batch to clients
    Broadcast,
}

/// Per-concern trailing-edge debounce timers.
#[derive(Debug)]
pub struct Debouncer<K> {
    default_window: Duration,
    windows: HashMap<K, Duration>,
    deadlines: HashMap<K, Instant>,
}

impl<K> Debouncer<K>
where
    K: Copy + Eq + Hash + Debug,
{
    /// Create a debouncer whose concerns all use `default_window`.
    pub fn new(default_window: Duration) -> Self {
        Self {
            default_window,
            windows: HashMap::new(),
            deadlines: HashMap::new(),
        }
    }

    /// Give one concern its own quiet window.
    pub fn with_window(mut self, key: K, window: Duration) -> Self {
        self.windows.insert(key, window);
        self
    }

    /// Quiet window used for `key`.
    pub fn window(&self, key: K) -> Duration {
        self.windows.get(&key).copied().unwrap_or(self.default_window)
    }

    /// Register interest in `key`.
    ///
    /// Arms the timer, or pushes an armed timer out to `now + window`.
    pub fn notify(&mut self, key: K) {
        let deadline = Instant::now() + self.window(key);
        self.deadlines.insert(key, deadline);
    }

    pub fn is_pending(&self, key: K) -> bool {
        self.deadlines.contains_key(&key)
    }

    /// Drop every timer without firing any of them.
    pub fn cancel_all(&mut self) {
        if !self.deadlines.is_empty() {
            tracing::debug!(pending = self.deadlines.len(), "cancelling debounce timers");
        }
        self.deadlines.clear();
    }

    fn next_deadline(&self) -> Option<(K, Instant)> {
        self.deadlines
            .iter()
            .min_by_key(|(_, deadline)| **deadline)
            .map(|(key, deadline)| (*key, *deadline))
    }

    /// Wait for the earliest deadline and return its concern.
    ///
    /// Cancel-safe: the timer is only consumed once the sleep completes, so
    /// dropping this future inside `tokio::select!` loses nothing. With no
    /// pending timer it never resolves.
    pub async fn fired(&mut self) -> K {
        let Some((key, deadline)) = self.next_deadline() else {
            return std::future::pending().await;
        };

        tokio::time::sleep_until(deadline).await;
        self.deadlines.remove(&key);
        key
    }
}

impl Debouncer<Concern> {
    /// The session scheduler with the configured windows.
    pub fn for_session(config: &DebounceConfig) -> Self {
        Self::new(Duration::from_millis(config.rebuild_ms))
            .with_window(Concern::Rebuild, Duration::from_millis(config.rebuild_ms))
            .with_window(Concern::Broadcast, Duration::from_millis(config.reload_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const W: Duration = Duration::from_millis(1000);

    fn scheduler() -> Debouncer<Concern> {
        Debouncer::for_session(&DebounceConfig {
            rebuild_ms: 1000,
            reload_ms: 2000,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_fires_once_at_last_event_plus_window() {
        let mut debouncer = scheduler();
        let start = Instant::now();

        for _ in 0..5 {
            debouncer.notify(Concern::Rebuild);
            tokio::time::advance(Duration::from_millis(300)).await;
        }
        let last_notify = start + Duration::from_millis(1200);

        let fired = debouncer.fired().await;
        assert_eq!(fired, Concern::Rebuild);
        assert_eq!(Instant::now(), last_notify + W);
        assert!(!debouncer.is_pending(Concern::Rebuild));

        // Nothing else pending: a second wait must not resolve.
        let second = tokio::time::timeout(Duration::from_secs(10), debouncer.fired()).await;
        assert!(second.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_concerns_are_independent() {
        let mut debouncer = scheduler();
        let start = Instant::now();

        debouncer.notify(Concern::Broadcast);
        tokio::time::advance(Duration::from_millis(500)).await;
        // A rebuild burst after the broadcast was scheduled must not delay it.
        for _ in 0..4 {
            debouncer.notify(Concern::Rebuild);
            tokio::time::advance(Duration::from_millis(400)).await;
        }

        assert_eq!(debouncer.fired().await, Concern::Broadcast);
        assert_eq!(Instant::now(), start + Duration::from_millis(2100));

        assert_eq!(debouncer.fired().await, Concern::Rebuild);
        assert_eq!(Instant::now(), start + Duration::from_millis(2700));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all_drops_pending_timers() {
        let mut debouncer = scheduler();
        debouncer.notify(Concern::Rebuild);
        debouncer.notify(Concern::Broadcast);

        debouncer.cancel_all();
        assert!(!debouncer.is_pending(Concern::Rebuild));
        assert!(!debouncer.is_pending(Concern::Broadcast));

        let fired = tokio::time::timeout(Duration::from_secs(5), debouncer.fired()).await;
        assert!(fired.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_wait_keeps_timer() {
        let mut debouncer = scheduler();
        debouncer.notify(Concern::Rebuild);

        let early = tokio::time::timeout(Duration::from_millis(100), debouncer.fired()).await;
        assert!(early.is_err());
        assert!(debouncer.is_pending(Concern::Rebuild));

        assert_eq!(debouncer.fired().await, Concern::Rebuild);
    }

    #[test]
    fn test_windows() {
        let debouncer = scheduler();
        assert_eq!(debouncer.window(Concern::Rebuild), Duration::from_millis(1000));
        assert_eq!(debouncer.window(Concern::Broadcast), Duration::from_millis(2000));

        let generic: Debouncer<&str> = Debouncer::new(Duration::from_millis(50));
        assert_eq!(generic.window("anything"), Duration::from_millis(50));
    }
}
