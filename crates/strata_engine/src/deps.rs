//! Evaluation frames: the channel through which a rule reads other rules.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use strata_common::Fingerprint;

use crate::engine::{Engine, Fetched, Outcome};
use crate::error::RuleError;
use crate::kind::RuleId;
use crate::rule::Query;

/// Bookkeeping for one running evaluation.
#[derive(Debug)]
pub(crate) struct Frame {
    pub(crate) id: RuleId,
    /// Everything this evaluation asked for so far, read or merely
    /// re-verified. Walked by cycle detection.
    requested: Mutex<Vec<RuleId>>,
    /// Dependencies read, with the fingerprint observed, in read order.
    reads: Mutex<Vec<(RuleId, Fingerprint)>>,
    /// Set when an input this evaluation may have read changed meanwhile.
    invalidated: AtomicBool,
}

impl Frame {
    pub(crate) fn new(id: RuleId) -> Self {
        Self {
            id,
            requested: Mutex::new(Vec::new()),
            reads: Mutex::new(Vec::new()),
            invalidated: AtomicBool::new(false),
        }
    }

    pub(crate) fn request(&self, id: &RuleId) {
        let mut requested = self.requested.lock();
        if !requested.contains(id) {
            requested.push(id.clone());
        }
    }

    pub(crate) fn requested(&self) -> Vec<RuleId> {
        self.requested.lock().clone()
    }

    fn record(&self, id: RuleId, fingerprint: Fingerprint) {
        let mut reads = self.reads.lock();
        if !reads.iter().any(|(read, _)| *read == id) {
            reads.push((id, fingerprint));
        }
    }

    pub(crate) fn take_reads(&self) -> Vec<(RuleId, Fingerprint)> {
        std::mem::take(&mut *self.reads.lock())
    }

    /// Forgets everything recorded so far, before evaluating from scratch.
    pub(crate) fn reset(&self) {
        self.requested.lock().clear();
        self.reads.lock().clear();
        self.invalidated.store(false, Ordering::Release);
    }

    pub(crate) fn invalidate(&self) {
        self.invalidated.store(true, Ordering::Release);
    }

    pub(crate) fn is_invalidated(&self) -> bool {
        self.invalidated.load(Ordering::Acquire)
    }
}

/// Read access to other rules from inside [`Rule::compute`](crate::Rule::compute).
///
/// Every read is recorded as a dependency of the running rule, together with
/// the fingerprint of the value observed.
#[derive(Clone)]
pub struct Deps {
    engine: Engine,
    frame: Arc<Frame>,
}

impl Deps {
    pub(crate) fn new(engine: Engine, frame: Arc<Frame>) -> Self {
        Self { engine, frame }
    }

    /// The entry being evaluated.
    pub fn current(&self) -> &RuleId {
        &self.frame.id
    }

    /// Reads the value of rule `Q` for `key`, evaluating it if needed.
    ///
    /// A failed dependency is returned as [`RuleError::DependencyFailed`];
    /// the read is recorded either way, so the caller is re-evaluated when
    /// the dependency changes.
    pub async fn get<Q: Query>(&self, key: Q::Key) -> Result<Q::Value, RuleError> {
        self.engine.registry().check::<Q>()?;
        let id = RuleId::new(Q::KIND, key);
        let fetched = self.fetch(id.clone()).await?;
        self.frame.record(id.clone(), fetched.fingerprint);
        unpack::<Q>(id, fetched)
    }

    /// Reads rule `Q` for every key in parallel.
    ///
    /// Results come back in key order and the reads are recorded in key
    /// order, whatever order the evaluations finish in.
    pub async fn fetch_all<Q: Query>(
        &self,
        keys: Vec<Q::Key>,
    ) -> Result<Vec<Result<Q::Value, RuleError>>, RuleError> {
        self.engine.registry().check::<Q>()?;
        let ids: Vec<RuleId> = keys.into_iter().map(|key| RuleId::new(Q::KIND, key)).collect();

        let mut handles = Vec::with_capacity(ids.len());
        for id in &ids {
            let deps = self.clone();
            let id = id.clone();
            handles.push(tokio::spawn(async move { deps.fetch(id).await }));
        }

        let mut fetched = Vec::with_capacity(handles.len());
        for handle in handles {
            let result = handle.await.map_err(|e| {
                RuleError::Internal(strata_common::InternalError::new(format!(
                    "dependency evaluation panicked: {e}"
                )))
            })?;
            fetched.push(result?);
        }

        Ok(ids
            .into_iter()
            .zip(fetched)
            .map(|(id, fetched)| {
                self.frame.record(id.clone(), fetched.fingerprint);
                unpack::<Q>(id, fetched)
            })
            .collect())
    }

    async fn fetch(&self, id: RuleId) -> Result<Fetched, RuleError> {
        self.frame.request(&id);
        let fetched = self.engine.fetch(id.clone(), Some(&self.frame)).await?;
        self.engine.add_dependent(&id, &self.frame.id);
        Ok(fetched)
    }
}

pub(crate) fn unpack<Q: Query>(id: RuleId, fetched: Fetched) -> Result<Q::Value, RuleError> {
    match fetched.outcome {
        Outcome::Value(value) => value.downcast_ref::<Q::Value>().cloned().ok_or_else(|| {
            RuleError::Internal(strata_common::InternalError::new(format!(
                "stored value of {id} is not a {}",
                std::any::type_name::<Q::Value>()
            )))
        }),
        Outcome::Failed(cause) => Err(RuleError::DependencyFailed {
            dependency: id,
            cause: Box::new(cause),
        }),
    }
}
