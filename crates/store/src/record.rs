//! Plain records exchanged with the store.
//!
//! Relationships are explicit foreign-key fields; joined reads come back as
//! flat rows rather than object graphs.

use chrono::{DateTime, Utc};
use common::{
    AddressId, BookingId, CategoryId, EventId, Money, ParticipantType, TicketType, UserId,
};
use serde::{Deserialize, Serialize};

/// Profile of an identity. Registering requires one; paid events require a merchant id on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub merchant_id: Option<String>,
}

impl Profile {
    pub fn new(user_id: UserId, first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            user_id,
            first_name: first_name.into(),
            last_name: last_name.into(),
            merchant_id: None,
        }
    }

    pub fn with_merchant_id(mut self, merchant_id: impl Into<String>) -> Self {
        self.merchant_id = Some(merchant_id.into());
        self
    }

    /// A merchant id counts only when it is non-blank.
    pub fn has_merchant_id(&self) -> bool {
        self.merchant_id
            .as_deref()
            .is_some_and(|id| !id.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub category_id: CategoryId,
    pub name: String,
    pub image_url: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCategory {
    pub name: String,
    pub image_url: String,
}

/// A geocoded location, shared by every event whose address normalizes to `full_address`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub address_id: AddressId,
    pub full_address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAddress {
    pub full_address: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Where the address of a new event comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum AddressSource {
    /// The normalized string was already stored.
    Existing(Address),
    /// Freshly geocoded; inserted inside the event-creation transaction.
    Geocoded(NewAddress),
}

/// A stored event row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub event_id: EventId,
    pub name: String,
    pub description: String,
    pub agenda: String,
    pub image_url: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub landmark: Option<String>,
    pub ticket_type: TicketType,
    pub ticket_fare: Option<Money>,
    pub total_tickets: u32,
    pub participant_type: ParticipantType,
    pub participant_count: u32,
    pub category_id: CategoryId,
    pub address_id: AddressId,
    pub creator_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Event fields supplied at creation. The address id is resolved by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub event_id: EventId,
    pub name: String,
    pub description: String,
    pub agenda: String,
    pub image_url: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub landmark: Option<String>,
    pub ticket_type: TicketType,
    pub ticket_fare: Option<Money>,
    pub total_tickets: u32,
    pub participant_type: ParticipantType,
    pub participant_count: u32,
    pub category_id: CategoryId,
    pub creator_id: UserId,
    pub created_at: DateTime<Utc>,
}

/// Everything event creation writes, committed as one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct EventDraft {
    pub event: NewEvent,
    pub address: AddressSource,
    pub creator_booking: NewBooking,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreatedEvent {
    pub event: Event,
    pub address: Address,
    pub creator_booking: Booking,
}

/// Partial update of an event's descriptive fields. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub agenda: Option<String>,
    pub image_url: Option<String>,
}

impl EventChanges {
    /// True when no field would change.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.agenda.is_none()
            && self.image_url.is_none()
    }

    /// Merges the present fields onto `event`.
    pub fn apply_to(&self, event: &mut Event) {
        if let Some(name) = &self.name {
            event.name = name.clone();
        }
        if let Some(description) = &self.description {
            event.description = description.clone();
        }
        if let Some(agenda) = &self.agenda {
            event.agenda = agenda.clone();
        }
        if let Some(image_url) = &self.image_url {
            event.image_url = image_url.clone();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub booking_id: BookingId,
    pub event_id: EventId,
    pub attendee_id: UserId,
    /// `true` means confirmed; only confirmed rows count against capacity.
    pub booking_status: bool,
    pub registered_at: DateTime<Utc>,
    pub scanned_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBooking {
    pub booking_id: BookingId,
    pub event_id: EventId,
    pub attendee_id: UserId,
    pub registered_at: DateTime<Utc>,
}

impl NewBooking {
    pub fn new(event_id: EventId, attendee_id: UserId, registered_at: DateTime<Utc>) -> Self {
        Self {
            booking_id: BookingId::new(),
            event_id,
            attendee_id,
            registered_at,
        }
    }
}

/// Result of an atomic capacity-gated booking insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReserveOutcome {
    Reserved(Booking),
    /// Confirmed bookings already reach total tickets.
    SoldOut,
    /// A row for (event, attendee) already exists.
    AlreadyBooked(Booking),
    EventMissing,
}

/// Event joined with its address, category name and live confirmed-booking count.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRow {
    pub event: Event,
    pub address: Address,
    pub category_name: String,
    pub confirmed_bookings: u64,
}

/// One of an attendee's confirmed bookings, joined with event details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendeeBookingRow {
    pub booking_id: BookingId,
    pub event_id: EventId,
    pub event_name: String,
    pub image_url: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub ticket_type: TicketType,
    pub ticket_fare: Option<Money>,
    pub registered_at: DateTime<Utc>,
}

/// One confirmed attendee of an event, joined with profile names when a profile exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventAttendeeRow {
    pub booking_id: BookingId,
    pub attendee_id: UserId,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub registered_at: DateTime<Utc>,
}
