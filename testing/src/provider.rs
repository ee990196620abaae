//! Recording ticket provider.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Lock poisoning is the only panic source

use series_pass_core::record::QR_STATUS_KEY;
use series_pass_core::{RecordId, RecordStore, TicketProvider};
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// One recorded call to [`TicketProvider::checkin`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CheckinCall {
    /// Attendee that was checked in
    pub attendee_id: RecordId,
    /// Whether the check-in came from a QR scan
    pub qr: bool,
    /// Occurrence the check-in targeted
    pub occurrence_id: RecordId,
}

/// Ticket provider that records calls and writes check-in state to the store.
///
/// Successful check-ins set the check-in flag, details and QR status
/// attributes on the attendee; un-check-ins remove them again.
pub struct RecordingTicketProvider {
    slug: String,
    attendee_kind: String,
    link_attribute: String,
    ticket_attribute: String,
    checkin_flag: String,
    store: Arc<dyn RecordStore>,
    accept: AtomicBool,
    checkins: Mutex<Vec<CheckinCall>>,
    uncheckins: Mutex<Vec<RecordId>>,
}

impl RecordingTicketProvider {
    /// Create a provider with explicit attribute naming
    #[must_use]
    pub fn new(
        slug: &str,
        attendee_kind: &str,
        link_attribute: &str,
        ticket_attribute: &str,
        checkin_flag: &str,
        store: Arc<dyn RecordStore>,
    ) -> Self {
        Self {
            slug: slug.to_string(),
            attendee_kind: attendee_kind.to_string(),
            link_attribute: link_attribute.to_string(),
            ticket_attribute: ticket_attribute.to_string(),
            checkin_flag: checkin_flag.to_string(),
            store,
            accept: AtomicBool::new(true),
            checkins: Mutex::new(Vec::new()),
            uncheckins: Mutex::new(Vec::new()),
        }
    }

    /// Provider named like the RSVP backend
    #[must_use]
    pub fn rsvp(store: Arc<dyn RecordStore>) -> Self {
        Self::new(
            "rsvp",
            "tribe_rsvp_attendees",
            "_tribe_rsvp_event",
            "_tribe_rsvp_product",
            "_tribe_rsvp_checkedin",
            store,
        )
    }

    /// Provider named like the commerce backend
    #[must_use]
    pub fn commerce(store: Arc<dyn RecordStore>) -> Self {
        Self::new(
            "tickets-commerce",
            "tec_tc_attendee",
            "_tec_tickets_commerce_event",
            "_tec_tickets_commerce_ticket",
            "_tec_tickets_commerce_checked_in",
            store,
        )
    }

    /// Make following check-ins succeed or fail
    pub fn accept_checkins(&self, accept: bool) {
        self.accept.store(accept, Ordering::SeqCst);
    }

    /// Recorded check-in calls, oldest first
    #[must_use]
    pub fn checkins(&self) -> Vec<CheckinCall> {
        self.checkins.lock().unwrap().clone()
    }

    /// Recorded un-check-in calls, oldest first
    #[must_use]
    pub fn uncheckins(&self) -> Vec<RecordId> {
        self.uncheckins.lock().unwrap().clone()
    }
}

impl TicketProvider for RecordingTicketProvider {
    fn slug(&self) -> &str {
        &self.slug
    }

    fn attendee_kind(&self) -> &str {
        &self.attendee_kind
    }

    fn link_attribute_name(&self) -> &str {
        &self.link_attribute
    }

    fn ticket_attribute_name(&self) -> &str {
        &self.ticket_attribute
    }

    fn checkin_flag_attribute_name(&self) -> &str {
        &self.checkin_flag
    }

    fn checkin(&self, attendee_id: RecordId, qr: bool, occurrence_id: RecordId) -> bool {
        self.checkins.lock().unwrap().push(CheckinCall {
            attendee_id,
            qr,
            occurrence_id,
        });

        if !self.accept.load(Ordering::SeqCst) {
            return false;
        }

        let details = json!({ "source": if qr { "app" } else { "site" }, "event_id": occurrence_id });
        self.store.set_attribute(attendee_id, &self.checkin_flag, json!("1")).is_ok()
            && self
                .store
                .set_attribute(attendee_id, &self.checkin_details_attribute_name(), details)
                .is_ok()
            && (!qr || self.store.set_attribute(attendee_id, QR_STATUS_KEY, json!("1")).is_ok())
    }

    fn uncheckin(&self, attendee_id: RecordId) -> bool {
        self.uncheckins.lock().unwrap().push(attendee_id);

        [
            self.checkin_flag.clone(),
            self.checkin_details_attribute_name(),
            QR_STATUS_KEY.to_string(),
        ]
        .iter()
        .all(|key| self.store.delete_attribute(attendee_id, key).is_ok())
    }
}
