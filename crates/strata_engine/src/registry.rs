//! The rule registry: one type-erased implementation per rule kind.

use std::any::{Any, TypeId};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use strata_common::{Fingerprint, InternalError};

use crate::deps::Deps;
use crate::error::{EngineError, RuleError};
use crate::kind::{Key, RuleKey, RuleKind};
use crate::rule::{InputRule, Query, Rule};

pub(crate) type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A type-erased rule result.
pub(crate) type AnyValue = Arc<dyn Any + Send + Sync>;

/// A rule with its key and value types erased, so the engine can dispatch on
/// [`RuleKind`] alone.
pub(crate) trait ErasedRule: Send + Sync {
    fn key_type(&self) -> TypeId;

    fn value_type(&self) -> TypeId;

    fn value_type_name(&self) -> &'static str;

    /// Computes (or, for inputs, initializes) the value and its fingerprint.
    fn execute<'a>(
        &'a self,
        key: &'a RuleKey,
        deps: &'a Deps,
    ) -> BoxFuture<'a, Result<(AnyValue, Fingerprint), RuleError>>;
}

fn typed_key<K: Key>(kind: RuleKind, key: &RuleKey) -> Result<K, RuleError> {
    K::from_rule_key(key).ok_or_else(|| {
        RuleError::Internal(InternalError::new(format!(
            "{kind} evaluated with a key of the wrong shape: {key:?}"
        )))
    })
}

struct Derived<R>(R);

impl<R: Rule> ErasedRule for Derived<R> {
    fn key_type(&self) -> TypeId {
        TypeId::of::<R::Key>()
    }

    fn value_type(&self) -> TypeId {
        TypeId::of::<R::Value>()
    }

    fn value_type_name(&self) -> &'static str {
        std::any::type_name::<R::Value>()
    }

    fn execute<'a>(
        &'a self,
        key: &'a RuleKey,
        deps: &'a Deps,
    ) -> BoxFuture<'a, Result<(AnyValue, Fingerprint), RuleError>> {
        Box::pin(async move {
            let key = typed_key::<R::Key>(R::KIND, key)?;
            let value = self.0.compute(&key, deps).await?;
            let fingerprint = R::fingerprint(&value)?;
            Ok((Arc::new(value) as AnyValue, fingerprint))
        })
    }
}

struct Input<R>(R);

impl<R: InputRule> ErasedRule for Input<R> {
    fn key_type(&self) -> TypeId {
        TypeId::of::<R::Key>()
    }

    fn value_type(&self) -> TypeId {
        TypeId::of::<R::Value>()
    }

    fn value_type_name(&self) -> &'static str {
        std::any::type_name::<R::Value>()
    }

    fn execute<'a>(
        &'a self,
        key: &'a RuleKey,
        _deps: &'a Deps,
    ) -> BoxFuture<'a, Result<(AnyValue, Fingerprint), RuleError>> {
        Box::pin(async move {
            let key = typed_key::<R::Key>(R::KIND, key)?;
            let value = self.0.initial(&key)?;
            let fingerprint = R::fingerprint(&value)?;
            Ok((Arc::new(value) as AnyValue, fingerprint))
        })
    }
}

/// Collects rule implementations; [`build`](Self::build) checks that the
/// catalog is covered exactly once.
pub struct RegistryBuilder {
    rules: Vec<Option<Arc<dyn ErasedRule>>>,
    errors: Vec<EngineError>,
}

impl RegistryBuilder {
    fn new() -> Self {
        Self {
            rules: (0..RuleKind::COUNT).map(|_| None).collect(),
            errors: Vec::new(),
        }
    }

    fn insert<Q: Query>(&mut self, rule: Arc<dyn ErasedRule>, input: bool) {
        let kind = Q::KIND;
        if kind.is_input() != input {
            let reason = if input {
                "registered as an input but the kind is derived"
            } else {
                "registered as derived but the kind is an input"
            };
            self.errors.push(EngineError::BadRegistration {
                kind,
                reason: reason.to_string(),
            });
            return;
        }
        if <Q::Key as Key>::GLOBAL != kind.is_global() {
            self.errors.push(EngineError::BadRegistration {
                kind,
                reason: "key shape does not match the kind".to_string(),
            });
            return;
        }
        let slot = &mut self.rules[kind.index()];
        if slot.is_some() {
            self.errors.push(EngineError::DuplicateRule(kind));
            return;
        }
        *slot = Some(rule);
    }

    /// Registers a derived rule.
    pub fn register<R: Rule>(mut self, rule: R) -> Self {
        self.insert::<R>(Arc::new(Derived(rule)), false);
        self
    }

    /// Registers an input rule.
    pub fn register_input<R: InputRule>(mut self, rule: R) -> Self {
        self.insert::<R>(Arc::new(Input(rule)), true);
        self
    }

    /// Returns `true` if no rule is registered for `kind` yet.
    pub fn is_missing(&self, kind: RuleKind) -> bool {
        self.rules[kind.index()].is_none()
    }

    /// Finishes the registry.
    ///
    /// Fails on the first registration error, or if any kind of the catalog
    /// has no rule.
    pub fn build(self) -> Result<Registry, EngineError> {
        if let Some(err) = self.errors.into_iter().next() {
            tracing::error!(%err, "invalid rule registration");
            return Err(err);
        }
        let missing: Vec<RuleKind> = RuleKind::ALL
            .into_iter()
            .filter(|kind| self.rules[kind.index()].is_none())
            .collect();
        if !missing.is_empty() {
            let err = EngineError::MissingRules(missing);
            tracing::error!(%err, "incomplete rule registry");
            return Err(err);
        }
        let rules = self.rules.into_iter().flatten().collect();
        Ok(Registry { rules })
    }
}

/// The complete, immutable mapping from rule kind to implementation.
pub struct Registry {
    rules: Box<[Arc<dyn ErasedRule>]>,
}

impl Registry {
    /// Starts a new registry.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    pub(crate) fn rule(&self, kind: RuleKind) -> &Arc<dyn ErasedRule> {
        &self.rules[kind.index()]
    }

    /// Checks that `Q` matches the rule registered for `Q::KIND`.
    pub(crate) fn check<Q: Query>(&self) -> Result<(), EngineError> {
        let rule = self.rule(Q::KIND);
        if rule.value_type() != TypeId::of::<Q::Value>() || rule.key_type() != TypeId::of::<Q::Key>()
        {
            let err = EngineError::TypeMismatch {
                kind: Q::KIND,
                requested: std::any::type_name::<Q::Value>(),
                registered: rule.value_type_name(),
            };
            tracing::error!(%err, "request does not match the registered rule");
            return Err(err);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, Text};

    #[test]
    fn incomplete_registry_is_rejected() {
        let err = Registry::builder()
            .register_input(Text::default())
            .build()
            .err()
            .unwrap();
        match err {
            EngineError::MissingRules(kinds) => {
                assert_eq!(kinds.len(), RuleKind::COUNT - 1);
                assert!(!kinds.contains(&RuleKind::SourceText));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let builder = Registry::builder()
            .register_input(Text::default())
            .register_input(Text::default());
        let err = testing::fill(builder).build().err().unwrap();
        assert_eq!(err, EngineError::DuplicateRule(RuleKind::SourceText));
    }

    #[test]
    fn complete_registry_builds() {
        let builder = Registry::builder().register_input(Text::default());
        assert!(!builder.is_missing(RuleKind::SourceText));
        assert!(builder.is_missing(RuleKind::TypeCheck));
        assert!(testing::fill(builder).build().is_ok());
    }

    #[test]
    fn request_type_is_checked() {
        let registry = testing::fill(Registry::builder()).build().unwrap();
        assert!(registry.check::<testing::stubs::ParseFile>().is_ok());
        assert!(matches!(
            registry.check::<testing::Length>(),
            Err(EngineError::TypeMismatch { .. })
        ));
    }
}
