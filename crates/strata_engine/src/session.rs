//! Shared compiler sessions.
//!
//! A session is expensive to build and read-only once built. Sessions are
//! keyed by the fingerprint of the configuration they were built from, so an
//! unrelated configuration change keeps them alive.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use strata_common::Fingerprint;
use tokio::sync::OnceCell;

use crate::error::RuleError;

type Cell<S> = Arc<OnceCell<Result<Arc<S>, String>>>;

/// Builds each session once per configuration fingerprint and hands out
/// shared references to it.
///
/// Construction runs on the blocking pool. Concurrent requests for the same
/// key wait for a single build; a failed build is remembered, so every
/// request with that key fails the same way until the key changes.
pub struct SessionManager<S> {
    sessions: DashMap<Fingerprint, Cell<S>>,
    builds: AtomicU64,
}

impl<S: Send + Sync + 'static> SessionManager<S> {
    /// Creates a manager without sessions.
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
            builds: AtomicU64::new(0),
        }
    }

    /// Returns the session for `key`, building it with `build` if needed.
    pub async fn session_for<F>(&self, key: Fingerprint, build: F) -> Result<Arc<S>, RuleError>
    where
        F: FnOnce() -> Result<S, String> + Send + 'static,
    {
        let cell = self.sessions.entry(key).or_default().clone();
        let result = cell
            .get_or_init(|| async move {
                self.builds.fetch_add(1, Ordering::Relaxed);
                tracing::info!(%key, "building compiler session");
                match tokio::task::spawn_blocking(build).await {
                    Ok(Ok(session)) => Ok(Arc::new(session)),
                    Ok(Err(message)) => {
                        tracing::warn!(%key, %message, "compiler session failed");
                        Err(message)
                    }
                    Err(err) => {
                        tracing::error!(%key, %err, "compiler session construction panicked");
                        Err(format!("session construction panicked: {err}"))
                    }
                }
            })
            .await;
        result.clone().map_err(RuleError::Session)
    }

    /// The session for `key`, if it is built and healthy.
    pub fn get(&self, key: &Fingerprint) -> Option<Arc<S>> {
        let cell = self.sessions.get(key)?.clone();
        cell.get().and_then(|result| result.as_ref().ok().cloned())
    }

    /// Drops every session whose key does not satisfy `keep`. Returns the
    /// number dropped. Holders of a dropped session keep it alive until they
    /// release it.
    pub fn retain(&self, mut keep: impl FnMut(&Fingerprint) -> bool) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|key, _| keep(key));
        before.saturating_sub(self.sessions.len())
    }

    /// Forgets failed builds, so the next request for their key builds
    /// again. Returns the number forgotten.
    pub fn forget_failures(&self) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, cell| !matches!(cell.get(), Some(Err(_))));
        before.saturating_sub(self.sessions.len())
    }

    /// Drops every session.
    pub fn clear(&self) {
        let released = self.sessions.len();
        self.sessions.clear();
        tracing::debug!(released, "released compiler sessions");
    }

    /// Number of sessions, including failed ones.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if no session exists.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// How many builds were started.
    pub fn builds(&self) -> u64 {
        self.builds.load(Ordering::Relaxed)
    }
}

impl<S: Send + Sync + 'static> Default for SessionManager<S> {
    fn default() -> Self {
        Self::new()
    }
}
