//! The traits rule implementations provide.

use async_trait::async_trait;
use std::fmt;
use strata_common::{Fingerprint, StrataResult};

use crate::deps::Deps;
use crate::error::RuleError;
use crate::kind::{Key, RuleKind};

/// A rule result: immutable, cheap to clone, shareable between threads.
///
/// Large results should be wrapped in an `Arc`.
pub trait Value: Clone + Send + Sync + fmt::Debug + 'static {}

impl<T: Clone + Send + Sync + fmt::Debug + 'static> Value for T {}

/// The static signature of a rule kind: key type, value type and cutoff
/// policy.
pub trait Query: Send + Sync + 'static {
    /// The kind this rule implements.
    const KIND: RuleKind;

    /// The key shape.
    type Key: Key;

    /// The result type.
    type Value: Value;

    /// Fingerprint of a result, used for early cutoff.
    ///
    /// Two results with the same fingerprint are interchangeable for every
    /// dependent. A rule may fingerprint a projection of its result (for
    /// example leaving out source positions) when dependents cannot observe
    /// the rest.
    fn fingerprint(value: &Self::Value) -> StrataResult<Fingerprint>;
}

/// A derived rule.
///
/// `compute` must be a function of the values it reads through `deps`; any
/// other state it consults is invisible to invalidation.
#[async_trait]
pub trait Rule: Query {
    /// Computes the value for `key`.
    async fn compute(&self, key: &Self::Key, deps: &Deps) -> Result<Self::Value, RuleError>;
}

/// An input rule. Inputs are set by the host through
/// [`Engine::set_input`](crate::Engine::set_input); `initial` provides the
/// value of an input that was never set.
pub trait InputRule: Query {
    /// Produces the initial value for `key`.
    fn initial(&self, key: &Self::Key) -> Result<Self::Value, RuleError>;
}
