//! Environment dependencies for check-in resolution.

use crate::config::CheckinConfig;
use crate::registry::ProviderRegistry;
use series_pass_core::environment::Clock;
use series_pass_core::{OccurrenceQuery, RecordStore};
use std::sync::Arc;

/// Injected collaborators shared by every component of the engine.
#[derive(Clone)]
pub struct SeriesPassEnvironment {
    /// Clock for check-in windows
    pub clock: Arc<dyn Clock>,
    /// Record store holding attendees, tickets and events
    pub store: Arc<dyn RecordStore>,
    /// Occurrence calendar
    pub occurrences: Arc<dyn OccurrenceQuery>,
    /// Ticket providers by attendee kind
    pub providers: Arc<ProviderRegistry>,
    /// Resolution settings
    pub config: CheckinConfig,
}

impl SeriesPassEnvironment {
    /// Creates a new `SeriesPassEnvironment`
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        store: Arc<dyn RecordStore>,
        occurrences: Arc<dyn OccurrenceQuery>,
        providers: Arc<ProviderRegistry>,
        config: CheckinConfig,
    ) -> Self {
        Self {
            clock,
            store,
            occurrences,
            providers,
            config,
        }
    }
}
