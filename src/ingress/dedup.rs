//! Duplicate suppression for webhook retransmissions.
//!
//! Slack redelivers an event when the endpoint is slow to acknowledge, so the
//! same `event_id` can arrive more than once. This is the only shared mutable
//! state in the pipeline: a bounded, time-expiring set of accepted ids.

use std::time::{Duration, Instant};

use dashmap::{DashMap, Entry};

/// Entries past this count trigger an expiry sweep on the next insert.
const SWEEP_THRESHOLD: usize = 1024;

/// Time-expiring set of event ids already accepted for processing.
///
/// `check_and_insert` is atomic per id: two concurrent deliveries of the same
/// event cannot both pass. Expired entries are evicted lazily, either when
/// re-encountered or by a sweep once the map grows past a high-water mark.
#[derive(Debug)]
pub struct DuplicateSuppressor {
    seen: DashMap<String, Instant>,
    window: Duration,
}

impl DuplicateSuppressor {
    /// Create a suppressor. The window must be at least as long as the
    /// upstream retry horizon or retransmissions will slip through.
    pub fn new(window: Duration) -> Self {
        Self {
            seen: DashMap::new(),
            window,
        }
    }

    /// Atomically record an event id. Returns `true` when the id is fresh and
    /// the event should proceed, `false` when it is a duplicate to drop.
    pub fn check_and_insert(&self, event_id: &str) -> bool {
        if self.seen.len() > SWEEP_THRESHOLD {
            self.sweep();
        }

        match self.seen.entry(event_id.to_string()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().elapsed() >= self.window {
                    occupied.insert(Instant::now());
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(Instant::now());
                true
            }
        }
    }

    /// Drop all entries older than the suppression window.
    pub fn sweep(&self) {
        let window = self.window;
        self.seen.retain(|_, inserted_at| inserted_at.elapsed() < window);
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_delivery_passes_second_is_dropped() {
        let dedup = DuplicateSuppressor::new(Duration::from_secs(60));

        assert!(dedup.check_and_insert("Ev1"));
        assert!(!dedup.check_and_insert("Ev1"));
        assert!(dedup.check_and_insert("Ev2"));
    }

    #[test]
    fn id_is_accepted_again_after_the_window_expires() {
        let dedup = DuplicateSuppressor::new(Duration::from_millis(20));

        assert!(dedup.check_and_insert("Ev1"));
        assert!(!dedup.check_and_insert("Ev1"));

        std::thread::sleep(Duration::from_millis(30));

        assert!(dedup.check_and_insert("Ev1"));
    }

    #[test]
    fn sweep_evicts_expired_entries() {
        let dedup = DuplicateSuppressor::new(Duration::from_millis(10));

        dedup.check_and_insert("Ev1");
        dedup.check_and_insert("Ev2");
        assert_eq!(dedup.len(), 2);

        std::thread::sleep(Duration::from_millis(20));
        dedup.sweep();

        assert!(dedup.is_empty());
    }

    #[test]
    fn concurrent_deliveries_of_one_id_admit_exactly_one() {
        use std::sync::Arc;

        let dedup = Arc::new(DuplicateSuppressor::new(Duration::from_secs(60)));
        let mut handles = Vec::new();

        for _ in 0..16 {
            let dedup = dedup.clone();
            handles.push(std::thread::spawn(move || dedup.check_and_insert("Ev1")));
        }

        let admitted = handles.into_iter().map(|h| h.join().unwrap()).filter(|fresh| *fresh).count();

        assert_eq!(admitted, 1);
    }
}
