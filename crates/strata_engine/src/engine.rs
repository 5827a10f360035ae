//! The memo table and the demand-driven scheduler.
//!
//! Every `(kind, key)` pair has at most one slot. A slot is either a memo
//! (the last committed result, its fingerprint and the dependencies read to
//! produce it) or a running evaluation that other requesters wait on.
//!
//! Requests take a fast path under a shard read lock when the memo is fresh.
//! Otherwise the slow path takes the entry lock and installs a running
//! marker; whoever installs it evaluates, everybody else waits on its
//! `Notify`. A dirty memo is first re-verified by walking its dependencies
//! in order; only when one of them reports a different fingerprint does the
//! rule run again.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use strata_common::Fingerprint;
use tokio::sync::Notify;

use crate::deps::{unpack, Deps, Frame};
use crate::error::{EngineError, RuleError};
use crate::kind::RuleId;
use crate::registry::{AnyValue, BoxFuture, Registry};
use crate::rule::Query;
use crate::stats::{Counters, EngineStats};

/// The validity state of a cache entry.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Status {
    /// The result reflects the current inputs.
    Fresh,
    /// An input the entry depends on changed; the entry must be re-verified
    /// before use.
    Dirty,
    /// Being evaluated.
    InProgress,
    /// The last evaluation failed and none of its inputs changed since.
    Failed,
}

#[derive(Clone)]
pub(crate) enum Outcome {
    Value(AnyValue),
    Failed(RuleError),
}

pub(crate) struct Fetched {
    pub(crate) outcome: Outcome,
    pub(crate) fingerprint: Fingerprint,
}

#[derive(Clone)]
struct Memo {
    outcome: Outcome,
    fingerprint: Fingerprint,
    /// Dependencies read by the evaluation, with the fingerprints observed.
    /// For failed entries these only serve to invalidate them.
    deps: Arc<[(RuleId, Fingerprint)]>,
    dirty: bool,
    /// Revision at which the entry was last computed or verified.
    generation: u64,
    /// Set by [`Engine::set_input`]. A pinned input is the only copy of its
    /// value, so it survives invalidation and garbage collection.
    pinned: bool,
}

impl Memo {
    fn fetched(&self) -> Fetched {
        Fetched {
            outcome: self.outcome.clone(),
            fingerprint: self.fingerprint,
        }
    }

    fn status(&self) -> Status {
        match (&self.outcome, self.dirty) {
            (_, true) => Status::Dirty,
            (Outcome::Failed(_), false) => Status::Failed,
            (Outcome::Value(_), false) => Status::Fresh,
        }
    }
}

struct Running {
    notify: Arc<Notify>,
    frame: Arc<Frame>,
}

enum Slot {
    Running(Running),
    Memo(Memo),
}

enum Begin {
    Ready(Fetched),
    Wait(Arc<Notify>),
    Retry,
    Run(Start),
}

struct Start {
    notify: Arc<Notify>,
    frame: Arc<Frame>,
    previous: Option<Memo>,
}

struct Shared {
    registry: Registry,
    slots: DashMap<RuleId, Slot>,
    /// Reverse dependency edges: entry -> entries that read it.
    dependents: DashMap<RuleId, HashSet<RuleId>>,
    revision: AtomicU64,
    counters: Counters,
    cancelled: AtomicBool,
}

/// The incremental rule engine.
///
/// Cheap to clone; clones share the same cache.
#[derive(Clone)]
pub struct Engine {
    shared: Arc<Shared>,
}

impl Engine {
    /// Creates an engine with an empty cache.
    pub fn new(registry: Registry) -> Self {
        Self {
            shared: Arc::new(Shared {
                registry,
                slots: DashMap::new(),
                dependents: DashMap::new(),
                revision: AtomicU64::new(0),
                counters: Counters::new(),
                cancelled: AtomicBool::new(false),
            }),
        }
    }

    pub(crate) fn registry(&self) -> &Registry {
        &self.shared.registry
    }

    /// The current input revision. Every input change increments it.
    pub fn revision(&self) -> u64 {
        self.shared.revision.load(Ordering::Acquire)
    }

    fn bump_revision(&self) -> u64 {
        self.shared.revision.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Returns `true` after [`shutdown`](Self::shutdown).
    pub fn is_shut_down(&self) -> bool {
        self.shared.cancelled.load(Ordering::Acquire)
    }

    /// Requests the value of rule `Q` for `key`.
    ///
    /// Returns the cached result when it is fresh, re-verifies or recomputes
    /// it otherwise. A failed rule returns its own error.
    pub async fn request<Q: Query>(&self, key: Q::Key) -> Result<Q::Value, RuleError> {
        self.shared.registry.check::<Q>()?;
        let id = RuleId::new(Q::KIND, key);
        let fetched = self.fetch(id.clone(), None).await?;
        match fetched.outcome {
            Outcome::Failed(err) => Err(err),
            outcome @ Outcome::Value(_) => unpack::<Q>(
                id,
                Fetched {
                    outcome,
                    fingerprint: fetched.fingerprint,
                },
            ),
        }
    }

    /// Sets the value of an input.
    ///
    /// Returns `false` if the new value has the same fingerprint as the
    /// current one, in which case nothing is invalidated. Otherwise every
    /// entry transitively depending on the input is marked dirty.
    pub fn set_input<Q: Query>(&self, key: Q::Key, value: Q::Value) -> Result<bool, EngineError> {
        if self.is_shut_down() {
            return Err(EngineError::Cancelled);
        }
        if !Q::KIND.is_input() {
            return Err(EngineError::NotAnInput(Q::KIND));
        }
        self.shared.registry.check::<Q>()?;
        let fingerprint = Q::fingerprint(&value)?;
        let id = RuleId::new(Q::KIND, key);

        let superseded = match self.shared.slots.entry(id.clone()) {
            Entry::Occupied(mut entry) => {
                if let Slot::Memo(memo) = entry.get() {
                    let unchanged = !memo.dirty
                        && memo.fingerprint == fingerprint
                        && matches!(memo.outcome, Outcome::Value(_));
                    if unchanged {
                        return Ok(false);
                    }
                }
                let memo = self.input_memo(Arc::new(value), fingerprint);
                match std::mem::replace(entry.get_mut(), Slot::Memo(memo)) {
                    Slot::Running(running) => Some(running.notify),
                    Slot::Memo(_) => None,
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(Slot::Memo(self.input_memo(Arc::new(value), fingerprint)));
                None
            }
        };
        if let Some(notify) = superseded {
            notify.notify_waiters();
        }

        let marked = self.mark_dependents_dirty(&id);
        tracing::debug!(input = %id, dirty = marked, "input changed");
        Ok(true)
    }

    fn input_memo(&self, value: AnyValue, fingerprint: Fingerprint) -> Memo {
        let revision = self.bump_revision();
        Memo {
            outcome: Outcome::Value(value),
            fingerprint,
            deps: Arc::from(Vec::new()),
            dirty: false,
            generation: revision,
            pinned: true,
        }
    }

    /// Marks `id` and everything transitively depending on it dirty.
    ///
    /// An input entry that was initialized by its rule is dropped instead, so
    /// its next read initializes it again. An input set with
    /// [`set_input`](Self::set_input) keeps its value. Returns the number of
    /// dependents marked.
    pub fn invalidate(&self, id: &RuleId) -> usize {
        self.bump_revision();
        if id.kind.is_input() {
            self.shared
                .slots
                .remove_if(id, |_, slot| matches!(slot, Slot::Memo(memo) if !memo.pinned));
        } else {
            self.mark_dirty(id);
        }
        self.mark_dependents_dirty(id)
    }

    /// Invalidates every cached entry matching `predicate`.
    pub fn invalidate_all(&self, predicate: impl Fn(&RuleId) -> bool) -> usize {
        let matching: Vec<RuleId> = self
            .shared
            .slots
            .iter()
            .filter(|entry| predicate(entry.key()))
            .map(|entry| entry.key().clone())
            .collect();
        matching.iter().map(|id| self.invalidate(id)).sum()
    }

    /// Invalidates every failed entry matching `predicate`, so the next
    /// request retries it even if none of its dependencies changed. Returns
    /// the number of failed entries found.
    pub fn invalidate_failed(&self, predicate: impl Fn(&RuleId) -> bool) -> usize {
        let failed: Vec<RuleId> = self
            .shared
            .slots
            .iter()
            .filter(|entry| predicate(entry.key()))
            .filter(|entry| match entry.value() {
                Slot::Memo(memo) => matches!(memo.outcome, Outcome::Failed(_)),
                Slot::Running(_) => false,
            })
            .map(|entry| entry.key().clone())
            .collect();
        for id in &failed {
            self.invalidate(id);
        }
        failed.len()
    }

    fn mark_dirty(&self, id: &RuleId) -> bool {
        let Some(mut slot) = self.shared.slots.get_mut(id) else {
            return false;
        };
        match &mut *slot {
            Slot::Memo(memo) => memo.dirty = true,
            Slot::Running(running) => running.frame.invalidate(),
        }
        true
    }

    fn mark_dependents_dirty(&self, root: &RuleId) -> usize {
        let mut stack = vec![root.clone()];
        let mut seen = HashSet::new();
        let mut marked = 0;
        while let Some(id) = stack.pop() {
            let dependents: Vec<RuleId> = self
                .shared
                .dependents
                .get(&id)
                .map(|set| set.iter().cloned().collect())
                .unwrap_or_default();
            for dependent in dependents {
                if seen.insert(dependent.clone()) {
                    if self.mark_dirty(&dependent) {
                        marked += 1;
                    }
                    stack.push(dependent);
                }
            }
        }
        marked
    }

    pub(crate) fn add_dependent(&self, dependency: &RuleId, dependent: &RuleId) {
        self.shared
            .dependents
            .entry(dependency.clone())
            .or_default()
            .insert(dependent.clone());
    }

    fn prune_dependents(
        &self,
        id: &RuleId,
        old: &[(RuleId, Fingerprint)],
        new: &[(RuleId, Fingerprint)],
    ) {
        for (dep, _) in old {
            if new.iter().any(|(read, _)| read == dep) {
                continue;
            }
            if let Some(mut set) = self.shared.dependents.get_mut(dep) {
                set.remove(id);
            }
        }
    }

    /// Resolves `id` to a fresh result. `caller` is the frame of the rule
    /// reading it, if any.
    pub(crate) fn fetch<'a>(
        &'a self,
        id: RuleId,
        caller: Option<&'a Arc<Frame>>,
    ) -> BoxFuture<'a, Result<Fetched, EngineError>> {
        Box::pin(async move {
            loop {
                if self.is_shut_down() {
                    return Err(EngineError::Cancelled);
                }
                match self.begin(&id, caller)? {
                    Begin::Ready(fetched) => return Ok(fetched),
                    Begin::Retry => tokio::task::yield_now().await,
                    Begin::Wait(notify) => {
                        let notified = notify.notified();
                        tokio::pin!(notified);
                        // registered before the re-check, so a completion in
                        // between is not missed
                        notified.as_mut().enable();
                        if self.is_running(&id, &notify) && !self.is_shut_down() {
                            notified.await;
                        }
                    }
                    Begin::Run(start) => return self.run(id, start).await,
                }
            }
        })
    }

    fn begin(&self, id: &RuleId, caller: Option<&Arc<Frame>>) -> Result<Begin, EngineError> {
        let running = match self.shared.slots.get(id) {
            Some(slot) => match &*slot {
                Slot::Memo(memo) if !memo.dirty => return Ok(Begin::Ready(memo.fetched())),
                Slot::Memo(_) => None,
                Slot::Running(running) => Some((running.notify.clone(), running.frame.clone())),
            },
            None => None,
        };

        if let Some((notify, frame)) = running {
            if let Some(caller) = caller {
                if self.reaches(&frame, &caller.id) {
                    self.shared.counters.cycle();
                    tracing::error!(rule = %id, caller = %caller.id, "rule cycle detected");
                    return Err(EngineError::RuleCycle(id.clone()));
                }
            }
            return Ok(Begin::Wait(notify));
        }

        let notify = Arc::new(Notify::new());
        let frame = Arc::new(Frame::new(id.clone()));
        let running = Slot::Running(Running {
            notify: notify.clone(),
            frame: frame.clone(),
        });
        match self.shared.slots.entry(id.clone()) {
            Entry::Occupied(mut entry) => {
                let slot = entry.get_mut();
                match slot {
                    Slot::Running(_) => return Ok(Begin::Retry),
                    Slot::Memo(memo) if !memo.dirty => return Ok(Begin::Ready(memo.fetched())),
                    Slot::Memo(_) => {}
                }
                let previous = match std::mem::replace(slot, running) {
                    Slot::Memo(memo) => Some(memo),
                    Slot::Running(_) => None,
                };
                Ok(Begin::Run(Start {
                    notify,
                    frame,
                    previous,
                }))
            }
            Entry::Vacant(entry) => {
                entry.insert(running);
                Ok(Begin::Run(Start {
                    notify,
                    frame,
                    previous: None,
                }))
            }
        }
    }

    fn is_running(&self, id: &RuleId, notify: &Arc<Notify>) -> bool {
        self.shared.slots.get(id).is_some_and(|slot| {
            matches!(&*slot, Slot::Running(running) if Arc::ptr_eq(&running.notify, notify))
        })
    }

    fn running_frame(&self, id: &RuleId) -> Option<Arc<Frame>> {
        self.shared.slots.get(id).and_then(|slot| match &*slot {
            Slot::Running(running) => Some(running.frame.clone()),
            Slot::Memo(_) => None,
        })
    }

    /// Returns `true` if the evaluation in `from`, directly or through other
    /// running evaluations, asked for `target`.
    fn reaches(&self, from: &Arc<Frame>, target: &RuleId) -> bool {
        let mut stack = vec![from.clone()];
        let mut seen = HashSet::new();
        while let Some(frame) = stack.pop() {
            for dep in frame.requested() {
                if dep == *target {
                    return true;
                }
                if seen.insert(dep.clone()) {
                    if let Some(next) = self.running_frame(&dep) {
                        stack.push(next);
                    }
                }
            }
        }
        false
    }

    async fn run(&self, id: RuleId, start: Start) -> Result<Fetched, EngineError> {
        let Start {
            notify,
            frame,
            previous,
        } = start;
        let mut guard = RunGuard {
            engine: self.clone(),
            id: id.clone(),
            notify: notify.clone(),
            previous,
            armed: true,
        };

        if let Some(previous) = guard.previous.clone() {
            let reusable = matches!(previous.outcome, Outcome::Value(_));
            if reusable && self.verify(&previous.deps, &frame).await? {
                let memo = Memo {
                    dirty: false,
                    generation: self.revision(),
                    ..previous
                };
                if self.install(&id, &notify, &frame, memo.clone()) {
                    guard.armed = false;
                    self.shared.counters.cutoff();
                    tracing::debug!(rule = %id, "dependencies unchanged, kept cached result");
                    return Ok(memo.fetched());
                }
                frame.reset();
            }
        }

        let rule = self.shared.registry.rule(id.kind).clone();
        let deps = Deps::new(self.clone(), frame.clone());
        tracing::debug!(rule = %id, "computing");
        let result = rule.execute(&id.key, &deps).await;
        self.shared.counters.computation(id.kind);
        if self.is_shut_down() {
            return Err(EngineError::Cancelled);
        }

        let (outcome, fingerprint) = match result {
            Ok((value, fingerprint)) => (Outcome::Value(value), fingerprint),
            Err(err) => {
                if let RuleError::Internal(internal) = &err {
                    tracing::error!(rule = %id, error = %internal, "rule failed with an internal error");
                } else {
                    tracing::debug!(rule = %id, error = %err, "rule failed");
                }
                let fingerprint = err.fingerprint();
                (Outcome::Failed(err), fingerprint)
            }
        };
        let memo = Memo {
            outcome,
            fingerprint,
            deps: frame.take_reads().into(),
            dirty: false,
            generation: self.revision(),
            pinned: false,
        };

        if self.install(&id, &notify, &frame, memo.clone()) {
            guard.armed = false;
            if let Some(previous) = &guard.previous {
                self.prune_dependents(&id, &previous.deps, &memo.deps);
            }
        } else {
            self.shared.counters.discarded();
            tracing::warn!(rule = %id, "discarded result computed from superseded inputs");
        }
        Ok(memo.fetched())
    }

    /// Brings each dependency up to date in order and compares its
    /// fingerprint with the one observed. Stops at the first difference.
    async fn verify(
        &self,
        deps: &[(RuleId, Fingerprint)],
        frame: &Arc<Frame>,
    ) -> Result<bool, EngineError> {
        for (dep, observed) in deps {
            frame.request(dep);
            match self.fetch(dep.clone(), Some(frame)).await {
                Ok(fetched) if fetched.fingerprint == *observed => {}
                Ok(_) => return Ok(false),
                Err(EngineError::Cancelled) => return Err(EngineError::Cancelled),
                Err(err) => {
                    tracing::debug!(rule = %frame.id, dependency = %dep, %err, "re-verification failed");
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    /// Commits `memo` if every dependency it read is still fresh with the
    /// fingerprint observed and no input changed under the evaluation.
    fn install(&self, id: &RuleId, notify: &Arc<Notify>, frame: &Frame, memo: Memo) -> bool {
        let stale = memo
            .deps
            .iter()
            .any(|(dep, observed)| !self.is_current(dep, *observed));
        if stale || frame.is_invalidated() || self.is_shut_down() {
            return false;
        }
        {
            let Some(mut slot) = self.shared.slots.get_mut(id) else {
                return false;
            };
            let ours = matches!(&*slot, Slot::Running(running) if Arc::ptr_eq(&running.notify, notify));
            if !ours || frame.is_invalidated() {
                return false;
            }
            *slot = Slot::Memo(memo);
        }
        notify.notify_waiters();
        true
    }

    fn is_current(&self, id: &RuleId, observed: Fingerprint) -> bool {
        self.shared.slots.get(id).is_some_and(|slot| {
            matches!(&*slot, Slot::Memo(memo) if !memo.dirty && memo.fingerprint == observed)
        })
    }

    /// The status of an entry, or `None` if it is not cached.
    pub fn status(&self, id: &RuleId) -> Option<Status> {
        self.shared.slots.get(id).map(|slot| match &*slot {
            Slot::Memo(memo) => memo.status(),
            Slot::Running(_) => Status::InProgress,
        })
    }

    /// The dependencies recorded by an entry's last evaluation, in read
    /// order, with the fingerprints observed.
    pub fn dependencies(&self, id: &RuleId) -> Option<Vec<(RuleId, Fingerprint)>> {
        self.shared.slots.get(id).and_then(|slot| match &*slot {
            Slot::Memo(memo) => Some(memo.deps.to_vec()),
            Slot::Running(_) => None,
        })
    }

    /// Entries that read `id`, sorted.
    pub fn dependents(&self, id: &RuleId) -> Vec<RuleId> {
        let mut dependents: Vec<RuleId> = self
            .shared
            .dependents
            .get(id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        dependents.sort();
        dependents
    }

    /// The fingerprint of an entry's cached result.
    pub fn fingerprint(&self, id: &RuleId) -> Option<Fingerprint> {
        self.shared.slots.get(id).and_then(|slot| match &*slot {
            Slot::Memo(memo) => Some(memo.fingerprint),
            Slot::Running(_) => None,
        })
    }

    /// The revision at which an entry was last computed or verified.
    pub fn generation(&self, id: &RuleId) -> Option<u64> {
        self.shared.slots.get(id).and_then(|slot| match &*slot {
            Slot::Memo(memo) => Some(memo.generation),
            Slot::Running(_) => None,
        })
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.shared.slots.len()
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.shared.slots.is_empty()
    }

    /// Evaluation counters.
    pub fn stats(&self) -> EngineStats {
        self.shared.counters.snapshot()
    }

    /// Drops every cached entry not reachable from `roots` through recorded
    /// dependencies. Inputs set with [`set_input`](Self::set_input) are kept.
    /// Returns the number of entries removed.
    pub fn collect_garbage(&self, roots: &[RuleId]) -> usize {
        let mut live = HashSet::new();
        let mut stack = roots.to_vec();
        while let Some(id) = stack.pop() {
            if !live.insert(id.clone()) {
                continue;
            }
            if let Some(deps) = self.dependencies(&id) {
                stack.extend(deps.into_iter().map(|(dep, _)| dep));
            }
        }

        let before = self.shared.slots.len();
        self.shared
            .slots
            .retain(|id, slot| match slot {
                Slot::Running(_) => true,
                Slot::Memo(memo) => memo.pinned || live.contains(id),
            });
        self.shared.dependents.retain(|id, set| {
            set.retain(|dependent| live.contains(dependent));
            live.contains(id) && !set.is_empty()
        });
        let removed = before.saturating_sub(self.shared.slots.len());
        tracing::debug!(removed, live = live.len(), "collected garbage");
        removed
    }

    /// Cancels the engine: in-flight evaluations finish but are not
    /// committed, waiters and new requests fail with
    /// [`EngineError::Cancelled`], and every cached result is released.
    pub fn shutdown(&self) {
        if self.shared.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        let waiting: Vec<Arc<Notify>> = self
            .shared
            .slots
            .iter()
            .filter_map(|entry| match entry.value() {
                Slot::Running(running) => Some(running.notify.clone()),
                Slot::Memo(_) => None,
            })
            .collect();
        self.shared.slots.clear();
        self.shared.dependents.clear();
        for notify in waiting {
            notify.notify_waiters();
        }
        tracing::info!("engine shut down");
    }
}

/// Restores a slot if its evaluation does not commit: the previous memo is
/// put back dirty, or the slot is removed if there was none. Waiters are
/// woken either way.
struct RunGuard {
    engine: Engine,
    id: RuleId,
    notify: Arc<Notify>,
    previous: Option<Memo>,
    armed: bool,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let slots = &self.engine.shared.slots;
        let notify = &self.notify;
        let ours =
            |slot: &Slot| matches!(slot, Slot::Running(running) if Arc::ptr_eq(&running.notify, notify));
        match self.previous.take() {
            Some(mut memo) => {
                memo.dirty = true;
                if let Some(mut slot) = slots.get_mut(&self.id) {
                    if ours(&*slot) {
                        *slot = Slot::Memo(memo);
                    }
                }
            }
            None => {
                slots.remove_if(&self.id, |_, slot| ours(slot));
            }
        }
        self.notify.notify_waiters();
    }
}
