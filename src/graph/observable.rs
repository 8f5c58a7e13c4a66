//! Observable streams and operators
//!
//! An [`Observable`] is a recipe for a stream of `serde_json::Value`s.
//! Every call to [`Observable::subscribe`] registers a fresh subscription
//! immediately (hot sources start buffering at that point) and hands back a
//! boxed stream the caller drives.

use std::fmt;
use std::sync::Arc;

use futures::future::{self, BoxFuture};
use futures::stream::{self, BoxStream, PollNext};
use futures::{FutureExt, StreamExt};
use serde_json::Value;

type SubscribeFn = dyn Fn() -> BoxStream<'static, Value> + Send + Sync;

/// Cloneable, multi-subscriber stream source
#[derive(Clone)]
pub struct Observable {
    subscribe: Arc<SubscribeFn>,
}

impl fmt::Debug for Observable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable").finish_non_exhaustive()
    }
}

/// Tagged item used when merging several sources into one state machine
enum Tagged {
    Left(Value),
    Right(Value),
    Other(usize, Value),
}

impl Observable {
    /// Build an observable from a subscribe function
    pub fn from_fn<F>(subscribe: F) -> Self
    where
        F: Fn() -> BoxStream<'static, Value> + Send + Sync + 'static,
    {
        Self {
            subscribe: Arc::new(subscribe),
        }
    }

    /// Emits a single value to every subscriber, then completes
    pub fn just(value: Value) -> Self {
        Self::from_fn(move || stream::once(future::ready(value.clone())).boxed())
    }

    /// Never emits and never completes
    pub fn never() -> Self {
        Self::from_fn(|| stream::pending().boxed())
    }

    /// Register a new subscription
    pub fn subscribe(&self) -> BoxStream<'static, Value> {
        (self.subscribe)()
    }

    pub fn map<F>(&self, f: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        let source = self.clone();
        let f = Arc::new(f);
        Self::from_fn(move || {
            let f = Arc::clone(&f);
            source.subscribe().map(move |v| f(v)).boxed()
        })
    }

    /// Map and drop `None`s (covers both `filter` and `map`)
    pub fn filter_map<F>(&self, f: F) -> Self
    where
        F: Fn(Value) -> Option<Value> + Send + Sync + 'static,
    {
        let source = self.clone();
        let f = Arc::new(f);
        Self::from_fn(move || {
            let f = Arc::clone(&f);
            source
                .subscribe()
                .filter_map(move |v| future::ready(f(v)))
                .boxed()
        })
    }

    /// Run an async step per value, emitting results in source order
    pub fn then<F>(&self, f: F) -> Self
    where
        F: Fn(Value) -> BoxFuture<'static, Value> + Send + Sync + 'static,
    {
        let source = self.clone();
        let f = Arc::new(f);
        Self::from_fn(move || {
            let f = Arc::clone(&f);
            source.subscribe().then(move |v| f(v)).boxed()
        })
    }

    /// Run an inner stream per value, all inner streams concurrently.
    ///
    /// Items of one inner stream keep their order; items of different inner
    /// streams interleave as they become ready.
    pub fn flat_map<F>(&self, f: F) -> Self
    where
        F: Fn(Value) -> BoxStream<'static, Value> + Send + Sync + 'static,
    {
        let source = self.clone();
        let f = Arc::new(f);
        Self::from_fn(move || {
            let f = Arc::clone(&f);
            source
                .subscribe()
                .flat_map_unordered(None, move |v| f(v))
                .boxed()
        })
    }

    /// Prepend a value to every subscription
    pub fn start_with(&self, value: Value) -> Self {
        let source = self.clone();
        Self::from_fn(move || {
            stream::once(future::ready(value.clone()))
                .chain(source.subscribe())
                .boxed()
        })
    }

    /// Interleave the emissions of two observables.
    ///
    /// No order is kept between the two sides. Derive both from one source
    /// (see [`Observable::flat_map`]) when effects must follow their cause.
    pub fn merge(&self, other: &Observable) -> Self {
        let left = self.clone();
        let right = other.clone();
        Self::from_fn(move || stream::select(left.subscribe(), right.subscribe()).boxed())
    }

    /// Emit `[trigger, latest(others)...]` each time `self` emits.
    ///
    /// Emissions are dropped until every other source has produced a value.
    /// Pending values from `others` are always drained before the trigger, so a
    /// write followed by a trigger is observed in that order.
    pub fn with_latest_from(&self, others: &[Observable]) -> Self {
        let trigger = self.clone();
        let others: Vec<Observable> = others.to_vec();
        Self::from_fn(move || {
            let count = others.len();
            let latest_streams = stream::select_all(
                others
                    .iter()
                    .enumerate()
                    .map(|(i, o)| o.subscribe().map(move |v| Tagged::Other(i, v)).boxed()),
            );
            let triggers = trigger.subscribe().map(Tagged::Left);
            let merged = stream::select_with_strategy(latest_streams, triggers, |_: &mut ()| {
                PollNext::Left
            });

            let mut latest: Vec<Option<Value>> = vec![None; count];
            merged
                .filter_map(move |item| {
                    let out = match item {
                        Tagged::Other(i, v) => {
                            latest[i] = Some(v);
                            None
                        }
                        Tagged::Left(t) => {
                            if latest.iter().all(Option::is_some) {
                                let mut row = Vec::with_capacity(count + 1);
                                row.push(t);
                                row.extend(latest.iter().flatten().cloned());
                                Some(Value::Array(row))
                            } else {
                                None
                            }
                        }
                        Tagged::Right(_) => None,
                    };
                    future::ready(out)
                })
                .boxed()
        })
    }

    /// Emit `f(a, b)` whenever either side emits, once both have a value
    pub fn combine_latest<F>(&self, other: &Observable, f: F) -> Self
    where
        F: Fn(&Value, &Value) -> Value + Send + Sync + 'static,
    {
        let left = self.clone();
        let right = other.clone();
        let f = Arc::new(f);
        Self::from_fn(move || {
            let f = Arc::clone(&f);
            let merged = stream::select(
                left.subscribe().map(Tagged::Left),
                right.subscribe().map(Tagged::Right),
            );
            let mut a: Option<Value> = None;
            let mut b: Option<Value> = None;
            merged
                .filter_map(move |item| {
                    match item {
                        Tagged::Left(v) => a = Some(v),
                        Tagged::Right(v) => b = Some(v),
                        Tagged::Other(..) => {}
                    }
                    let out = match (&a, &b) {
                        (Some(x), Some(y)) => Some(f(x, y)),
                        _ => None,
                    };
                    future::ready(out)
                })
                .boxed()
        })
    }
}

/// Box an async block for [`Observable::then`]
pub fn boxed<F>(fut: F) -> BoxFuture<'static, Value>
where
    F: std::future::Future<Output = Value> + Send + 'static,
{
    fut.boxed()
}
