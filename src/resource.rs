//! Reactive wrapper around one asynchronous read.
//!
//! ARCHITECTURE
//! ============
//! An `AsyncResource` owns a fetcher closure, its current parameters, and a
//! `tokio::sync::watch` slot holding `{data, loading, error}`. Every state
//! change is published as a whole new `ResourceState`; subscribers see
//! immutable snapshots and re-read on change.
//!
//! CONCURRENCY
//! ===========
//! - `refetch()` calls that overlap with an in-flight load for the same
//!   parameters join that load (one `Shared` future) instead of starting a
//!   second one.
//! - A load for different parameters, or an explicit `restart()`, bumps the
//!   generation. A load that finishes after being superseded is dropped
//!   without touching the slot.
//! - The flight slot sits behind a `std::sync::Mutex` that is never held
//!   across an `.await`.

use std::fmt::Display;
use std::sync::{Arc, Mutex, PoisonError};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tokio::sync::watch;

/// Fetcher signature: parameters in, owned future out.
pub type Fetcher<P, T, E> = Arc<dyn Fn(P) -> BoxFuture<'static, Result<T, E>> + Send + Sync>;

type Flight = Shared<BoxFuture<'static, ()>>;

// =============================================================================
// STATE
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceState<T> {
    pub data: Option<T>,
    pub loading: bool,
    pub error: Option<String>,
}

impl<T> Default for ResourceState<T> {
    fn default() -> Self {
        Self { data: None, loading: false, error: None }
    }
}

struct Pending<P> {
    params: P,
    future: Flight,
}

struct FlightSlot<P> {
    params: P,
    generation: u64,
    pending: Option<Pending<P>>,
}

struct Inner<P, T, E> {
    fetcher: Fetcher<P, T, E>,
    state: watch::Sender<ResourceState<T>>,
    flight: Mutex<FlightSlot<P>>,
}

impl<P, T, E> Inner<P, T, E> {
    fn slot(&self) -> std::sync::MutexGuard<'_, FlightSlot<P>> {
        self.flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// =============================================================================
// RESOURCE
// =============================================================================

pub struct AsyncResource<P, T, E> {
    inner: Arc<Inner<P, T, E>>,
}

impl<P, T, E> Clone for AsyncResource<P, T, E> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<P, T, E> AsyncResource<P, T, E>
where
    P: Clone + PartialEq + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
    E: Display + Send + 'static,
{
    /// Create a resource without loading; call [`Self::refetch`] to start.
    pub fn new(params: P, fetcher: Fetcher<P, T, E>) -> Self {
        let (state, _) = watch::channel(ResourceState::default());
        Self {
            inner: Arc::new(Inner {
                fetcher,
                state,
                flight: Mutex::new(FlightSlot { params, generation: 0, pending: None }),
            }),
        }
    }

    /// Current snapshot.
    #[must_use]
    pub fn state(&self) -> ResourceState<T> {
        self.inner.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ResourceState<T>> {
        self.inner.state.subscribe()
    }

    #[must_use]
    pub fn params(&self) -> P {
        self.inner.slot().params.clone()
    }

    /// Re-run the fetcher with the current parameters.
    pub async fn refetch(&self) {
        let params = self.params();
        self.refetch_with(params).await;
    }

    /// Replace the parameters and re-run only if they changed.
    pub async fn set_params(&self, params: P) {
        if self.inner.slot().params == params {
            return;
        }
        self.refetch_with(params).await;
    }

    /// Run the fetcher with `params`, joining an identical in-flight load.
    pub async fn refetch_with(&self, params: P) {
        self.run(params, true).await;
    }

    /// Start a new load with the current parameters, superseding any in-flight one.
    pub async fn restart(&self) {
        let params = self.params();
        self.run(params, false).await;
    }

    async fn run(&self, params: P, join: bool) {
        let flight = {
            let mut slot = self.inner.slot();
            slot.params = params.clone();
            let joinable = slot
                .pending
                .as_ref()
                .filter(|pending| join && pending.params == params)
                .map(|pending| pending.future.clone());
            if let Some(future) = joinable {
                tracing::debug!(generation = slot.generation, "joining in-flight load");
                future
            } else {
                slot.generation += 1;
                let future = Self::load(Arc::clone(&self.inner), params.clone(), slot.generation)
                    .boxed()
                    .shared();
                slot.pending = Some(Pending { params, future: future.clone() });
                future
            }
        };

        flight.clone().await;

        let mut slot = self.inner.slot();
        if slot
            .pending
            .as_ref()
            .is_some_and(|pending| Shared::ptr_eq(&pending.future, &flight))
        {
            slot.pending = None;
        }
    }

    async fn load(inner: Arc<Inner<P, T, E>>, params: P, generation: u64) {
        inner.state.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });

        let result = (inner.fetcher)(params).await;

        let slot = inner.slot();
        if slot.generation != generation {
            tracing::debug!(generation, current = slot.generation, "discarding superseded load");
            return;
        }
        inner.state.send_modify(|state| {
            state.loading = false;
            match result {
                Ok(data) => {
                    state.data = Some(data);
                    state.error = None;
                }
                Err(e) => state.error = Some(e.to_string()),
            }
        });
    }
}

#[cfg(test)]
#[path = "resource_test.rs"]
mod tests;
