//! The incremental rule graph.
//!
//! Rules are typed computations keyed by a [`RuleKind`] and a [`RuleKey`].
//! The [`Engine`] memoizes their results together with a content
//! [`Fingerprint`](strata_common::Fingerprint) and the dependencies each
//! evaluation read through [`Deps`]. An input change marks the transitive
//! dependents dirty; the next request re-verifies them dependency by
//! dependency and recomputes only what actually observed a different value.
//!
//! Concurrent requests for the same entry are coalesced: one task computes,
//! the others wait on a [`tokio::sync::Notify`] without blocking a worker.

#![warn(missing_docs)]

pub mod deps;
pub mod engine;
pub mod error;
pub mod graph;
pub mod kind;
pub mod registry;
pub mod rule;
pub mod session;
pub mod stats;

#[cfg(test)]
mod testing;

pub use deps::Deps;
pub use engine::{Engine, Status};
pub use error::{EngineError, RuleError};
pub use graph::ModuleGraph;
pub use kind::{Key, RuleId, RuleKey, RuleKind};
pub use registry::{Registry, RegistryBuilder};
pub use rule::{InputRule, Query, Rule, Value};
pub use session::SessionManager;
pub use stats::EngineStats;
