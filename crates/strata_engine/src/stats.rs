//! Evaluation counters.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::kind::RuleKind;

/// A snapshot of what the engine has done since it was created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    /// Rule evaluations, including input initialization.
    pub computations: u64,
    /// Dirty entries that were re-verified without recomputation.
    pub cutoffs: u64,
    /// Evaluations whose result was not installed because an input changed
    /// while they ran.
    pub discarded: u64,
    /// Rule cycles detected.
    pub cycles: u64,
    /// Evaluations per rule kind. Kinds never evaluated are absent.
    pub per_kind: BTreeMap<RuleKind, u64>,
}

impl EngineStats {
    /// Evaluations of `kind`.
    pub fn computations_of(&self, kind: RuleKind) -> u64 {
        self.per_kind.get(&kind).copied().unwrap_or(0)
    }
}

#[derive(Debug)]
pub(crate) struct Counters {
    per_kind: [AtomicU64; RuleKind::COUNT],
    cutoffs: AtomicU64,
    discarded: AtomicU64,
    cycles: AtomicU64,
}

impl Counters {
    pub(crate) fn new() -> Self {
        Self {
            per_kind: std::array::from_fn(|_| AtomicU64::new(0)),
            cutoffs: AtomicU64::new(0),
            discarded: AtomicU64::new(0),
            cycles: AtomicU64::new(0),
        }
    }

    pub(crate) fn computation(&self, kind: RuleKind) {
        self.per_kind[kind.index()].fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn cutoff(&self) {
        self.cutoffs.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn discarded(&self) {
        self.discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn cycle(&self) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> EngineStats {
        let per_kind: BTreeMap<RuleKind, u64> = RuleKind::ALL
            .into_iter()
            .map(|kind| (kind, self.per_kind[kind.index()].load(Ordering::Relaxed)))
            .filter(|(_, n)| *n > 0)
            .collect();
        EngineStats {
            computations: per_kind.values().sum(),
            cutoffs: self.cutoffs.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            cycles: self.cycles.load(Ordering::Relaxed),
            per_kind,
        }
    }
}
