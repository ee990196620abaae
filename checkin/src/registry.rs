//! Ticket provider registry, keyed by attendee record kind.

use series_pass_core::record::{CLONE_OF_KEY, QR_STATUS_KEY};
use series_pass_core::{Record, RecordId, TicketProvider};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// The set of ticket providers an installation knows about.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn TicketProvider>>,
}

impl ProviderRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a provider. A later provider for the same attendee kind replaces the earlier one.
    #[must_use]
    pub fn with_provider(mut self, provider: Arc<dyn TicketProvider>) -> Self {
        self.register(provider);
        self
    }

    /// Add a provider in place
    pub fn register(&mut self, provider: Arc<dyn TicketProvider>) {
        self.providers
            .retain(|existing| existing.attendee_kind() != provider.attendee_kind());
        self.providers.push(provider);
    }

    /// Provider storing attendees under `kind`
    #[must_use]
    pub fn for_kind(&self, kind: &str) -> Option<Arc<dyn TicketProvider>> {
        self.providers
            .iter()
            .find(|provider| provider.attendee_kind() == kind)
            .cloned()
    }

    /// Provider owning an attendee record
    #[must_use]
    pub fn for_record(&self, record: &Record) -> Option<Arc<dyn TicketProvider>> {
        self.for_kind(&record.kind)
    }

    /// Probe every provider's link attribute on `record`, in registration order.
    ///
    /// Returns the first provider whose link attribute holds an id, with that id.
    #[must_use]
    pub fn probe_link(
        &self,
        record: &Record,
    ) -> Option<(Arc<dyn TicketProvider>, RecordId)> {
        self.providers.iter().find_map(|provider| {
            record
                .attribute_id(provider.link_attribute_name())
                .map(|id| (Arc::clone(provider), id))
        })
    }

    /// Every provider's link attribute name
    #[must_use]
    pub fn link_attribute_names(&self) -> BTreeSet<String> {
        self.providers
            .iter()
            .map(|provider| provider.link_attribute_name().to_string())
            .collect()
    }

    /// Attributes that are local to one occurrence and never mirrored between
    /// a canonical attendee and its clones.
    #[must_use]
    pub fn occurrence_local_keys(&self) -> BTreeSet<String> {
        let mut keys = self.link_attribute_names();
        for provider in &self.providers {
            keys.insert(provider.checkin_flag_attribute_name().to_string());
            keys.insert(provider.checkin_details_attribute_name());
        }
        keys.insert(QR_STATUS_KEY.to_string());
        keys.insert(CLONE_OF_KEY.to_string());
        keys
    }

    /// Number of registered providers
    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Check if no provider is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.providers.iter().map(|provider| provider.slug()))
            .finish()
    }
}
