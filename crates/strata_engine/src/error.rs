//! Error types for the rule engine.

use strata_common::{Fingerprint, InternalError};
use strata_diagnostics::Diagnostic;

use crate::kind::{RuleId, RuleKind};

/// Errors from the engine itself: misuse, internal invariant violations and
/// shutdown.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    /// The engine was shut down.
    #[error("engine has been shut down")]
    Cancelled,

    /// A rule (transitively) requested itself.
    #[error("rule cycle detected at {0}")]
    RuleCycle(RuleId),

    /// The registry does not cover every rule kind.
    #[error("no rule registered for {}", display_kinds(.0))]
    MissingRules(Vec<RuleKind>),

    /// A kind was registered twice.
    #[error("rule {0} registered more than once")]
    DuplicateRule(RuleKind),

    /// A rule was registered with the wrong key shape or as the wrong
    /// flavour (input vs derived).
    #[error("rule {kind} registered with an incompatible signature: {reason}")]
    BadRegistration {
        /// The offending kind.
        kind: RuleKind,
        /// What is wrong with it.
        reason: String,
    },

    /// A request's key or value type does not match the registered rule.
    #[error("type mismatch for {kind}: requested {requested}, registered {registered}")]
    TypeMismatch {
        /// The requested kind.
        kind: RuleKind,
        /// Value type named by the request.
        requested: &'static str,
        /// Value type of the registered rule.
        registered: &'static str,
    },

    /// `set_input` was called for a derived kind.
    #[error("{0} is not an input")]
    NotAnInput(RuleKind),

    /// An internal invariant was violated.
    #[error(transparent)]
    Internal(#[from] InternalError),
}

fn display_kinds(kinds: &[RuleKind]) -> String {
    kinds
        .iter()
        .map(|k| k.name())
        .collect::<Vec<_>>()
        .join(", ")
}

/// The error outcome of a rule evaluation.
///
/// Failed results are cached like successful ones and handed to dependents
/// as [`RuleError::DependencyFailed`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuleError {
    /// The input is unusable: unreadable file, syntax or type errors.
    #[error("{} diagnostic(s)", .0.len())]
    Input(Vec<Diagnostic>),

    /// A dependency failed.
    #[error("dependency {dependency} failed")]
    DependencyFailed {
        /// The failed dependency.
        dependency: RuleId,
        /// Its error.
        #[source]
        cause: Box<RuleError>,
    },

    /// The compiler session could not be created.
    #[error("compiler session failed: {0}")]
    Session(String),

    /// The request is part of a rule cycle.
    #[error("rule cycle detected at {0}")]
    Cycle(RuleId),

    /// The engine was shut down while evaluating.
    #[error("evaluation cancelled")]
    Cancelled,

    /// An internal invariant was violated.
    #[error(transparent)]
    Internal(#[from] InternalError),
}

impl RuleError {
    /// The innermost error of a chain of dependency failures.
    pub fn root_cause(&self) -> &RuleError {
        match self {
            RuleError::DependencyFailed { cause, .. } => cause.root_cause(),
            other => other,
        }
    }

    /// Fingerprint of this failure, observed by dependents that read it.
    pub(crate) fn fingerprint(&self) -> Fingerprint {
        Fingerprint::from_bytes(format!("{self:?}").as_bytes())
    }
}

impl From<EngineError> for RuleError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Cancelled => RuleError::Cancelled,
            EngineError::RuleCycle(id) => RuleError::Cycle(id),
            EngineError::Internal(err) => RuleError::Internal(err),
            other => RuleError::Internal(InternalError::new(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_common::SourcePath;

    #[test]
    fn missing_rules_lists_kinds() {
        let err = EngineError::MissingRules(vec![RuleKind::TypeCheck, RuleKind::ParseFile]);
        assert_eq!(err.to_string(), "no rule registered for TypeCheck, ParseFile");
    }

    #[test]
    fn root_cause_unwraps_chain() {
        let inner = RuleError::Session("package `core` not found".into());
        let err = RuleError::DependencyFailed {
            dependency: RuleId::new(RuleKind::AcquireSession, SourcePath::new("a.src")),
            cause: Box::new(RuleError::DependencyFailed {
                dependency: RuleId::new(RuleKind::SessionWithDeps, SourcePath::new("a.src")),
                cause: Box::new(inner.clone()),
            }),
        };
        assert_eq!(err.root_cause(), &inner);
    }

    #[test]
    fn engine_errors_convert() {
        let id = RuleId::new(RuleKind::TypeCheck, SourcePath::new("a.src"));
        assert_eq!(
            RuleError::from(EngineError::RuleCycle(id.clone())),
            RuleError::Cycle(id)
        );
        assert!(matches!(
            RuleError::from(EngineError::NotAnInput(RuleKind::TypeCheck)),
            RuleError::Internal(_)
        ));
    }

    #[test]
    fn failure_fingerprint_is_stable() {
        let a = RuleError::Session("boom".into());
        assert_eq!(a.fingerprint(), a.clone().fingerprint());
        assert_ne!(a.fingerprint(), RuleError::Session("bang".into()).fingerprint());
    }
}
