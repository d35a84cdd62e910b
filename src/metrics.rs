// Dispatch metrics
//
// Lightweight counters for the cross-thread event channel, logged when the
// controller is finalized.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Event channel counters for one splash controller
///
/// Uses atomic operations so both threads can record without locks.
#[derive(Debug)]
pub struct DispatchMetrics {
    /// Events pushed onto the queue (including wake-ups)
    pub events_posted: AtomicU64,

    /// Events the GUI thread has taken off the queue and handled
    pub events_serviced: AtomicU64,

    /// Synchronous calls that returned a result
    pub sync_calls: AtomicU64,

    /// Asynchronous posts accepted by the queue
    pub async_posts: AtomicU64,

    /// Progress updates posted through `update_progress`
    pub progress_updates: AtomicU64,

    /// Posts rejected because the GUI thread was not running
    pub dropped_posts: AtomicU64,

    created: Instant,
}

impl DispatchMetrics {
    pub fn new() -> Self {
        Self {
            events_posted: AtomicU64::new(0),
            events_serviced: AtomicU64::new(0),
            sync_calls: AtomicU64::new(0),
            async_posts: AtomicU64::new(0),
            progress_updates: AtomicU64::new(0),
            dropped_posts: AtomicU64::new(0),
            created: Instant::now(),
        }
    }

    pub fn record_posted(&self) {
        self.events_posted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_serviced(&self) {
        self.events_serviced.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sync_call(&self) {
        self.sync_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_async_post(&self) {
        self.async_posts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_progress_update(&self) {
        self.progress_updates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.dropped_posts.fetch_add(1, Ordering::Relaxed);
    }

    /// Events posted but not (yet) serviced
    pub fn pending(&self) -> u64 {
        self.events_posted
            .load(Ordering::Relaxed)
            .saturating_sub(self.events_serviced.load(Ordering::Relaxed))
    }

    /// Time since the controller was created
    pub fn lifetime(&self) -> Duration {
        self.created.elapsed()
    }

    /// Log metrics summary
    pub fn log_summary(&self) {
        tracing::info!("=== Splash Dispatch Summary ===");
        tracing::info!("Lifetime: {:.2}s", self.lifetime().as_secs_f64());
        tracing::info!(
            "Events: {} posted, {} serviced, {} pending",
            self.events_posted.load(Ordering::Relaxed),
            self.events_serviced.load(Ordering::Relaxed),
            self.pending()
        );
        tracing::info!(
            "Calls: {} sync, {} async, {} progress updates, {} dropped",
            self.sync_calls.load(Ordering::Relaxed),
            self.async_posts.load(Ordering::Relaxed),
            self.progress_updates.load(Ordering::Relaxed),
            self.dropped_posts.load(Ordering::Relaxed)
        );
    }
}

impl Default for DispatchMetrics {
    fn default() -> Self {
        Self::new()
    }
}
