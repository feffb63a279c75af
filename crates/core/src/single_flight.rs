//! Keyed single-flight execution
//!
//! At most one operation per key is in flight. Concurrent callers for the
//! same key await the leader's result instead of starting their own.
//!
//! Two rules beyond plain de-duplication:
//! - A caller passing `issued_at` reuses the last settled result for its key
//!   if that result completed after `issued_at`. A call that was already
//!   running when a refresh finished must not trigger another refresh.
//! - Every waiter holds a guard. When the last waiter goes away (cancelled or
//!   dropped) the registry entry is removed and the operation is dropped with
//!   it, so a cancelled flight never blocks later callers.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Weak};

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::debug;

struct Flight<V> {
    id: u64,
    future: Shared<BoxFuture<'static, V>>,
    waiters: usize,
}

struct Settled<V> {
    at: Instant,
    value: V,
}

struct State<K, V> {
    in_flight: HashMap<K, Flight<V>>,
    settled: HashMap<K, Settled<V>>,
    next_id: u64,
}

/// Registry of in-flight operations keyed by `K`.
pub struct SingleFlight<K, V> {
    state: Arc<Mutex<State<K, V>>>,
}

impl<K, V> Default for SingleFlight<K, V> {
    fn default() -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                in_flight: HashMap::new(),
                settled: HashMap::new(),
                next_id: 0,
            })),
        }
    }
}

impl<K, V> SingleFlight<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + std::fmt::Debug + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `make()` for `key` unless an equivalent operation is in flight or
    /// settled after `issued_at`.
    pub async fn run<F, Fut>(&self, key: K, issued_at: Option<Instant>, make: F) -> V
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = V> + Send + 'static,
    {
        let (id, future) = {
            let mut state = self.state.lock();

            if let Some(issued_at) = issued_at {
                if let Some(settled) = state.settled.get(&key) {
                    if settled.at > issued_at {
                        debug!(?key, "reusing result settled after call was issued");
                        return settled.value.clone();
                    }
                }
            }

            if let Some(flight) = state.in_flight.get_mut(&key) {
                flight.waiters += 1;
                debug!(?key, waiters = flight.waiters, "joining in-flight operation");
                (flight.id, flight.future.clone())
            } else {
                let id = state.next_id;
                state.next_id = state.next_id.wrapping_add(1);
                let future = settle(Arc::downgrade(&self.state), key.clone(), id, make())
                    .boxed()
                    .shared();
                state
                    .in_flight
                    .insert(key.clone(), Flight { id, future: future.clone(), waiters: 1 });
                debug!(?key, "starting operation");
                (id, future)
            }
        };

        let _guard = WaiterGuard { state: &self.state, key: &key, id };
        future.await
    }

    /// Whether an operation for `key` is currently running.
    pub fn is_in_flight(&self, key: &K) -> bool {
        self.state.lock().in_flight.contains_key(key)
    }

    /// Number of keys with a running operation.
    pub fn in_flight_count(&self) -> usize {
        self.state.lock().in_flight.len()
    }

    /// Forget the settled result for `key`.
    pub fn forget(&self, key: &K) {
        self.state.lock().settled.remove(key);
    }
}

async fn settle<K, V, Fut>(state: Weak<Mutex<State<K, V>>>, key: K, id: u64, operation: Fut) -> V
where
    K: Eq + Hash,
    V: Clone,
    Fut: Future<Output = V>,
{
    let value = operation.await;
    if let Some(state) = state.upgrade() {
        let mut state = state.lock();
        if state.in_flight.get(&key).is_some_and(|flight| flight.id == id) {
            state.in_flight.remove(&key);
        }
        state.settled.insert(key, Settled { at: Instant::now(), value: value.clone() });
    }
    value
}

struct WaiterGuard<'a, K: Eq + Hash, V> {
    state: &'a Mutex<State<K, V>>,
    key: &'a K,
    id: u64,
}

impl<K: Eq + Hash, V> Drop for WaiterGuard<'_, K, V> {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        let abandoned = match state.in_flight.get_mut(self.key) {
            Some(flight) if flight.id == self.id => {
                flight.waiters = flight.waiters.saturating_sub(1);
                flight.waiters == 0
            }
            _ => false,
        };
        if abandoned {
            // Dropping the last handle cancels the operation.
            state.in_flight.remove(self.key);
        }
    }
}
