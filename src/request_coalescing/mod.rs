// Request Coalescing Module
//
// Deduplicates concurrent identical transforms.
// When multiple clients request the same signed image in the same format:
// - First request (leader): fetches and transforms, then publishes the result
// - Subsequent requests (followers): wait on the leader and clone its result
// - If the leader is dropped before publishing (client went away), followers
//   run the work themselves

use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;

/// Role a caller ended up playing for a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoalesceRole {
    /// Did the work
    Leader,
    /// Received a result computed by another request
    Follower,
}

/// Request coalescing manager
/// Tracks in-flight work by key and shares the result with concurrent callers
#[derive(Debug)]
pub struct RequestCoalescer<T> {
    /// Map of in-flight work: key -> watch sender carrying the eventual result
    in_flight: Arc<Mutex<HashMap<String, watch::Sender<Option<T>>>>>,
}

impl<T> Clone for RequestCoalescer<T> {
    fn clone(&self) -> Self {
        Self {
            in_flight: Arc::clone(&self.in_flight),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> RequestCoalescer<T> {
    /// Create a new request coalescer
    pub fn new() -> Self {
        Self {
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Run `work` for `key`, or share the result of an identical run already in flight.
    pub async fn run<F, Fut>(&self, key: &str, work: F) -> (T, CoalesceRole)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        match self.acquire(key) {
            CoalescingSlot::Leader(guard) => {
                let value = work().await;
                guard.complete(value.clone());
                (value, CoalesceRole::Leader)
            }
            CoalescingSlot::Follower(mut rx) => {
                let shared = match rx.wait_for(Option::is_some).await {
                    Ok(value) => value.clone(),
                    Err(_) => None,
                };
                match shared {
                    Some(value) => (value, CoalesceRole::Follower),
                    // Leader vanished without publishing
                    None => (work().await, CoalesceRole::Leader),
                }
            }
        }
    }

    /// Acquire a coalescing slot for a key
    ///
    /// Returns `CoalescingSlot::Leader` if this is the first request for the key,
    /// otherwise a receiver that will carry the leader's result.
    fn acquire(&self, key: &str) -> CoalescingSlot<T> {
        let mut in_flight = self.in_flight.lock();
        if let Some(sender) = in_flight.get(key) {
            return CoalescingSlot::Follower(sender.subscribe());
        }

        let (tx, _rx) = watch::channel(None);
        in_flight.insert(key.to_string(), tx.clone());

        CoalescingSlot::Leader(LeaderGuard {
            key: key.to_string(),
            in_flight: Arc::clone(&self.in_flight),
            sender: tx,
        })
    }

    /// Get current number of in-flight keys
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().len()
    }
}

impl<T: Clone + Send + Sync + 'static> Default for RequestCoalescer<T> {
    fn default() -> Self {
        Self::new()
    }
}

enum CoalescingSlot<T> {
    Leader(LeaderGuard<T>),
    Follower(watch::Receiver<Option<T>>),
}

/// Guard held by the leader request
/// Removes the in-flight entry when dropped, whether or not a result was published
struct LeaderGuard<T> {
    key: String,
    in_flight: Arc<Mutex<HashMap<String, watch::Sender<Option<T>>>>>,
    sender: watch::Sender<Option<T>>,
}

impl<T> LeaderGuard<T> {
    /// Publish the result to every follower
    fn complete(self, value: T) {
        self.sender.send_replace(Some(value));
    }
}

impl<T> Drop for LeaderGuard<T> {
    fn drop(&mut self) {
        self.in_flight.lock().remove(&self.key);
    }
}
