//! Series Pass Check-in Demo
//!
//! Walks a series pass holder through check-in against in-memory
//! collaborators:
//! - QR check-in resolving the one occurrence in progress
//! - Repeated QR check-in rejected as already checked in
//! - Explicit target outside the check-in window
//! - Attribute sync between the canonical attendee and its clones
//! - Un-check-in materializing clones for every occurrence
//!
//! # Usage
//!
//! ```bash
//! RUST_LOG=series_pass_checkin=debug cargo run --bin demo
//! ```

use chrono::Duration;
use serde_json::json;
use series_pass_checkin::metrics::register_checkin_metrics;
use series_pass_checkin::{
    CheckinConfig, CheckinResponse, ProviderRegistry, ResponseStatus, SeriesPassEnvironment,
    SeriesPassService,
};
use series_pass_core::environment::{Clock, SystemClock};
use series_pass_core::record::{SERIES_PASS_TICKET_TYPE, TICKET_TYPE_KEY};
use series_pass_core::{RecordDraft, RecordId, RecordStore};
use series_pass_testing::{InMemoryCalendar, InMemoryRecordStore, RecordingTicketProvider};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "demo=info,series_pass_checkin=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    register_checkin_metrics();

    // Load configuration
    let config = CheckinConfig::from_env();
    tracing::info!(buffer_secs = config.checkin_buffer_secs, "Configuration loaded");

    // ========== Collaborators ==========

    let clock = Arc::new(SystemClock);
    let now = clock.now();
    let store = Arc::new(InMemoryRecordStore::new());
    let calendar = Arc::new(InMemoryCalendar::new());
    let provider = Arc::new(RecordingTicketProvider::rsvp(store.clone()));

    let series = RecordId::new(100);
    let ended = RecordId::new(101);
    let in_progress = RecordId::new(102);
    let upcoming = RecordId::new(103);
    for (event, start, end) in [
        (ended, now - Duration::hours(5), now - Duration::hours(3)),
        (in_progress, now - Duration::hours(1), now + Duration::hours(1)),
        (upcoming, now + Duration::hours(10), now + Duration::hours(12)),
    ] {
        calendar.add_event(event, Some(series));
        calendar.add_occurrence(event, start, end);
    }

    let ticket = store.insert(
        RecordDraft::new("tribe_rsvp_tickets")
            .with_field("title", "Summer Lecture Series Pass")
            .with_attribute(TICKET_TYPE_KEY, SERIES_PASS_TICKET_TYPE),
    );
    let attendee = store.insert(
        RecordDraft::new("tribe_rsvp_attendees")
            .with_field("status", "publish")
            .with_attribute("_tribe_rsvp_event", series)
            .with_attribute("_tribe_rsvp_product", ticket)
            .with_attribute("_tribe_rsvp_full_name", "Ada Lovelace"),
    );

    let service = SeriesPassService::new(SeriesPassEnvironment::new(
        clock,
        store.clone(),
        calendar,
        Arc::new(ProviderRegistry::new().with_provider(provider.clone())),
        config,
    ));

    // ========== Demo Scenario ==========

    // Step 1: QR check-in resolves the occurrence in progress
    let mut request = service.request();
    let outcome = request.handle_checkin(attendee, None, true);
    tracing::info!(outcome = outcome.as_str(), clones = ?request.clones_of(attendee), "Step 1: QR check-in");

    // Step 2: the same scan again
    let mut request = service.request();
    let outcome = request.handle_checkin(attendee, None, true);
    let response = request.describe_failure(
        attendee,
        CheckinResponse::new(ResponseStatus::BadRequest, json!({ "msg": "Check-in failed" })),
    );
    tracing::info!(
        outcome = outcome.as_str(),
        status = response.status.code(),
        body = %response.body["msg"],
        "Step 2: repeated QR check-in"
    );

    // Step 3: explicit target outside the QR window
    let mut request = service.request();
    let outcome = request.handle_checkin(attendee, Some(upcoming), true);
    tracing::info!(outcome = outcome.as_str(), "Step 3: check-in for the upcoming lecture");

    // Step 4: renaming the holder reaches every clone
    store.set_attribute(attendee, "_tribe_rsvp_full_name", json!("Ada King"))?;
    for clone in service.request().clones_of(attendee) {
        let name = store
            .record(clone)
            .and_then(|record| record.attribute("_tribe_rsvp_full_name").cloned());
        tracing::info!(clone_id = %clone, name = ?name, "Step 4: clone synchronized");
    }

    // Step 5: un-check-in from the in-progress lecture
    let mut request = service.request();
    let outcome = request.handle_uncheckin(attendee, Some(in_progress));
    tracing::info!(
        outcome = outcome.as_str(),
        clones = request.clones_of(attendee).len(),
        uncheckins = provider.uncheckins().len(),
        "Step 5: un-check-in"
    );

    Ok(())
}
