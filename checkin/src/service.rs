//! Long-lived series pass service.
//!
//! The service owns the store subscription of the [`SyncEngine`] and hands
//! out one [`CheckinResolver`] per request. Dropping the service unsubscribes
//! the sync engine.

use crate::environment::SeriesPassEnvironment;
use crate::resolution::CheckinResolver;
use crate::suppression::SyncSuppressor;
use crate::sync::SyncEngine;
use series_pass_core::{RecordId, SubscriptionId};
use std::sync::Arc;

/// Wires the sync engine to the record store and builds request resolvers.
pub struct SeriesPassService {
    env: SeriesPassEnvironment,
    suppressor: SyncSuppressor,
    sync: Arc<SyncEngine>,
    subscription: SubscriptionId,
}

impl SeriesPassService {
    /// Create the service and subscribe its sync engine to the store
    #[must_use]
    pub fn new(env: SeriesPassEnvironment) -> Self {
        let suppressor = SyncSuppressor::new();
        let sync = Arc::new(SyncEngine::new(
            Arc::clone(&env.store),
            Arc::clone(&env.providers),
            suppressor.clone(),
        ));
        let subscription = env.store.subscribe(sync.clone());
        tracing::info!(providers = env.providers.len(), "Series pass sync engine subscribed");

        Self {
            env,
            suppressor,
            sync,
            subscription,
        }
    }

    /// Fresh resolver for one incoming request
    #[must_use]
    pub fn request(&self) -> CheckinResolver {
        CheckinResolver::new(self.env.clone(), self.suppressor.clone())
    }

    /// Whether `id` is a clone, optionally of `original_id`
    #[must_use]
    pub fn is_clone(&self, id: RecordId, original_id: Option<RecordId>) -> bool {
        self.request().is_clone(id, original_id)
    }

    /// The subscribed sync engine
    #[must_use]
    pub fn sync_engine(&self) -> &SyncEngine {
        &self.sync
    }

    /// The shared environment
    #[must_use]
    pub const fn environment(&self) -> &SeriesPassEnvironment {
        &self.env
    }
}

impl Drop for SeriesPassService {
    fn drop(&mut self) {
        self.env.store.unsubscribe(self.subscription);
    }
}
