use chrono::{DateTime, Utc};
use common::{BookingId, CategoryId, EventId, ParticipantType, TicketType, UserId};
use domain::CapacityReading;
use serde::{Deserialize, Serialize};
use store::{AttendeeBookingRow, EventAttendeeRow, EventRow};

/// One line of an event listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSummary {
    pub event_id: EventId,
    pub name: String,
    pub image_url: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub category_id: CategoryId,
    pub category_name: String,
    pub full_address: String,
    pub landmark: Option<String>,
    pub ticket_type: TicketType,
    pub ticket_fare: Option<String>,
    pub total_tickets: u32,
    pub available_tickets: u32,
    pub participant_type: ParticipantType,
    pub creator_id: UserId,
}

impl From<EventRow> for EventSummary {
    fn from(row: EventRow) -> Self {
        let capacity = CapacityReading::observe(
            row.event.event_id,
            row.event.total_tickets,
            row.confirmed_bookings,
        );
        let event = row.event;

        Self {
            event_id: event.event_id,
            name: event.name,
            image_url: event.image_url,
            start_time: event.start_time,
            end_time: event.end_time,
            category_id: event.category_id,
            category_name: row.category_name,
            full_address: row.address.full_address,
            landmark: event.landmark,
            ticket_type: event.ticket_type,
            ticket_fare: event.ticket_fare.map(|fare| fare.to_string()),
            total_tickets: event.total_tickets,
            available_tickets: capacity.remaining,
            participant_type: event.participant_type,
            creator_id: event.creator_id,
        }
    }
}

/// An attendee's confirmed booking with the event it is for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendeeBooking {
    pub booking_id: BookingId,
    pub event_id: EventId,
    pub event_name: String,
    pub image_url: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub ticket_type: TicketType,
    pub ticket_fare: Option<String>,
    pub registered_at: DateTime<Utc>,
}

impl From<AttendeeBookingRow> for AttendeeBooking {
    fn from(row: AttendeeBookingRow) -> Self {
        Self {
            booking_id: row.booking_id,
            event_id: row.event_id,
            event_name: row.event_name,
            image_url: row.image_url,
            start_time: row.start_time,
            end_time: row.end_time,
            ticket_type: row.ticket_type,
            ticket_fare: row.ticket_fare.map(|fare| fare.to_string()),
            registered_at: row.registered_at,
        }
    }
}

/// A confirmed attendee as shown to the event's creator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventAttendee {
    pub booking_id: BookingId,
    pub attendee_id: UserId,
    /// `None` when the attendee never completed a profile.
    pub name: Option<String>,
    pub registered_at: DateTime<Utc>,
}

impl From<EventAttendeeRow> for EventAttendee {
    fn from(row: EventAttendeeRow) -> Self {
        let name = match (row.first_name, row.last_name) {
            (Some(first), Some(last)) => Some(format!("{first} {last}")),
            (Some(first), None) => Some(first),
            (None, Some(last)) => Some(last),
            (None, None) => None,
        };

        Self {
            booking_id: row.booking_id,
            attendee_id: row.attendee_id,
            name,
            registered_at: row.registered_at,
        }
    }
}
