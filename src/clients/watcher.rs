//! # Instance watch and initial-sync barrier.
//!
//! Orchestrator watches deliver a relist protocol (`Init`, `InitApply`*, `InitDone`) followed
//! by incremental `Apply` / `Delete` signals. [`InstanceCache`] turns that protocol into the
//! added / updated / deleted notifications the coordinator consumes:
//!
//! ```text
//! Init ─► InitApply(a) ─► InitApply(b) ─► InitDone      (buffered, nothing emitted)
//!                                            │
//!                                            ├─► a unknown: Added(a), Updated{a, a}
//!                                            ├─► b known:   Updated{old, b}
//!                                            └─► c known, not listed: Deleted(c)
//! Apply(a)  ─► Updated{old, a} | Added(a), Updated{a, a}
//! Delete(a) ─► Deleted(a)
//! Resync    ─► Updated{a, a} for every known a
//! ```
//!
//! The `Updated{a, a}` after `Added(a)` lets instances that are already running begin
//! streaming without waiting for their next change. [`translate`] merges a periodic
//! `Resync` into a signal stream, so an instance whose stream could not be opened is
//! retried on the next tick.

use std::collections::HashMap;
use std::time::Duration;

use futures::stream::{self, BoxStream, Stream, StreamExt};
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::error::Error;
use crate::model::{Instance, InstanceEvent, InstanceIdentity};

/// Source of instance lifecycle events.
///
/// Implementations yield nothing before their initial listing has completed. Errors are
/// non-fatal: the stream keeps going after yielding one.
pub trait InstanceWatcher: Send + Sync + 'static {
    fn events(&self) -> BoxStream<'static, Result<InstanceEvent, Error>>;
}

/// Raw watch signal, independent of the orchestrator client.
#[derive(Debug, Clone, PartialEq)]
pub enum WatchSignal {
    /// A (re)list started.
    Init,
    /// One object of the current listing.
    InitApply(Instance),
    /// The listing is complete.
    InitDone,
    /// An object was created or modified.
    Apply(Instance),
    /// An object was removed.
    Delete(Instance),
    /// Periodic re-announcement of every known object.
    Resync,
}

/// Last known snapshot of every watched instance.
#[derive(Debug, Default)]
pub struct InstanceCache {
    known: HashMap<InstanceIdentity, Instance>,
    pending: Option<Vec<Instance>>,
}

impl InstanceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one signal and returns the notifications it produces, in order.
    pub fn apply(&mut self, signal: WatchSignal) -> Vec<InstanceEvent> {
        match signal {
            WatchSignal::Init => {
                self.pending = Some(Vec::new());
                Vec::new()
            }
            WatchSignal::InitApply(instance) => {
                self.pending.get_or_insert_with(Vec::new).push(instance);
                Vec::new()
            }
            WatchSignal::InitDone => self.finish_listing(),
            WatchSignal::Apply(instance) => {
                if self.pending.is_some() {
                    // a relist is in progress; the listing will carry the latest state
                    self.pending.get_or_insert_with(Vec::new).push(instance);
                    return Vec::new();
                }
                match self.known.insert(instance.id.clone(), instance.clone()) {
                    Some(old) => vec![InstanceEvent::Updated { old, new: instance }],
                    None => vec![
                        InstanceEvent::Added(instance.clone()),
                        InstanceEvent::Updated {
                            old: instance.clone(),
                            new: instance,
                        },
                    ],
                }
            }
            WatchSignal::Delete(instance) => {
                if let Some(pending) = self.pending.as_mut() {
                    pending.retain(|i| i.id != instance.id);
                }
                self.known.remove(&instance.id);
                vec![InstanceEvent::Deleted(instance)]
            }
            WatchSignal::Resync => self.resync(),
        }
    }

    /// `Updated{i, i}` for every known instance, sorted by identity. Empty while a listing
    /// is in progress.
    fn resync(&self) -> Vec<InstanceEvent> {
        if self.pending.is_some() {
            return Vec::new();
        }
        let mut known: Vec<&Instance> = self.known.values().collect();
        known.sort_by(|a, b| a.id.cmp(&b.id));
        known
            .into_iter()
            .map(|i| InstanceEvent::Updated {
                old: i.clone(),
                new: i.clone(),
            })
            .collect()
    }

    /// Number of instances currently known.
    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }

    fn finish_listing(&mut self) -> Vec<InstanceEvent> {
        let listed = self.pending.take().unwrap_or_default();
        let mut out = Vec::with_capacity(listed.len() * 2);
        let mut seen: HashMap<InstanceIdentity, Instance> = HashMap::with_capacity(listed.len());

        for instance in listed {
            match self.known.get(&instance.id) {
                Some(old) => out.push(InstanceEvent::Updated {
                    old: old.clone(),
                    new: instance.clone(),
                }),
                None if !seen.contains_key(&instance.id) => {
                    out.push(InstanceEvent::Added(instance.clone()));
                    out.push(InstanceEvent::Updated {
                        old: instance.clone(),
                        new: instance.clone(),
                    });
                }
                None => {
                    let old = seen.get(&instance.id).cloned().unwrap_or_else(|| instance.clone());
                    out.push(InstanceEvent::Updated {
                        old,
                        new: instance.clone(),
                    });
                }
            }
            seen.insert(instance.id.clone(), instance);
        }

        let mut gone: Vec<Instance> = self
            .known
            .values()
            .filter(|i| !seen.contains_key(&i.id))
            .cloned()
            .collect();
        gone.sort_by(|a, b| a.id.cmp(&b.id));
        out.extend(gone.into_iter().map(InstanceEvent::Deleted));

        self.known = seen;
        out
    }
}

/// Runs `signals` through a fresh [`InstanceCache`], injecting [`WatchSignal::Resync`]
/// every `resync` period (`None` or zero disables it). The result ends when `signals`
/// ends; errors pass through.
pub fn translate<S>(
    signals: S,
    resync: Option<Duration>,
) -> BoxStream<'static, Result<InstanceEvent, Error>>
where
    S: Stream<Item = Result<WatchSignal, Error>> + Send + 'static,
{
    // `None` marks the end of `signals`; the tick stream never ends on its own
    let signals = signals.map(Some).chain(stream::iter([None]));
    let ticks = match resync {
        Some(period) if !period.is_zero() => {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            stream::unfold(interval, |mut interval| async move {
                interval.tick().await;
                Some((Some(Ok(WatchSignal::Resync)), interval))
            })
            .boxed()
        }
        _ => stream::pending().boxed(),
    };

    let mut cache = InstanceCache::new();
    stream::select(signals, ticks)
        .take_while(|item| futures::future::ready(item.is_some()))
        .flat_map(move |item| {
            let out: Vec<Result<InstanceEvent, Error>> = match item {
                Some(Ok(signal)) => cache.apply(signal).into_iter().map(Ok).collect(),
                Some(Err(e)) => vec![Err(e)],
                None => Vec::new(),
            };
            stream::iter(out)
        })
        .boxed()
}
