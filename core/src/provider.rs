//! Ticket provider capability.
//!
//! Each ticketing backend stores attendees under its own record kind and its
//! own attribute names. The engine never hard-codes those names; it asks the
//! provider that owns the attendee.

use crate::record::RecordId;

/// The capability that performs the actual check-in and owns provider
/// specific attribute naming.
pub trait TicketProvider: Send + Sync {
    /// Short provider name, used in logs
    fn slug(&self) -> &str;

    /// Record kind this provider stores attendees under
    fn attendee_kind(&self) -> &str;

    /// Attribute linking an attendee to its series, event or occurrence
    fn link_attribute_name(&self) -> &str;

    /// Attribute linking an attendee to its ticket
    fn ticket_attribute_name(&self) -> &str;

    /// Attribute flagging an attendee as checked in
    fn checkin_flag_attribute_name(&self) -> &str;

    /// Attribute holding check-in details (time, device, location)
    fn checkin_details_attribute_name(&self) -> String {
        format!("{}_details", self.checkin_flag_attribute_name())
    }

    /// Check an attendee in for an occurrence
    fn checkin(&self, attendee_id: RecordId, qr: bool, occurrence_id: RecordId) -> bool;

    /// Undo an attendee's check-in
    fn uncheckin(&self, attendee_id: RecordId) -> bool;
}
