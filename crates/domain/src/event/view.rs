use chrono::{DateTime, Utc};
use common::{AddressId, CategoryId, EventId, ParticipantType, TicketType, UserId};
use serde::{Deserialize, Serialize};
use store::{Address, Event};

use crate::booking::RegistrationState;
use crate::capacity::CapacityReading;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressView {
    pub address_id: AddressId,
    pub full_address: String,
    pub landmark: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketDetails {
    pub ticket_type: TicketType,
    /// Decimal string such as `"499.99"`; absent for free events.
    pub ticket_fare: Option<String>,
    pub total_tickets: u32,
    pub available_tickets: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantDetails {
    pub participant_type: ParticipantType,
    pub participant_count: u32,
}

/// An event as seen by one viewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventView {
    pub event_id: EventId,
    pub name: String,
    pub description: String,
    pub agenda: String,
    pub image_url: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub category_id: CategoryId,
    pub category_name: String,
    pub creator_id: UserId,
    pub address: AddressView,
    pub ticket_details: TicketDetails,
    pub participant_details: ParticipantDetails,
    pub register_state: RegistrationState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EventView {
    pub fn compose(
        event: &Event,
        address: &Address,
        category_name: &str,
        capacity: CapacityReading,
        register_state: RegistrationState,
    ) -> Self {
        Self {
            event_id: event.event_id,
            name: event.name.clone(),
            description: event.description.clone(),
            agenda: event.agenda.clone(),
            image_url: event.image_url.clone(),
            start_time: event.start_time,
            end_time: event.end_time,
            category_id: event.category_id,
            category_name: category_name.to_string(),
            creator_id: event.creator_id,
            address: AddressView {
                address_id: address.address_id,
                full_address: address.full_address.clone(),
                landmark: event.landmark.clone(),
                latitude: address.latitude,
                longitude: address.longitude,
            },
            ticket_details: TicketDetails {
                ticket_type: event.ticket_type,
                ticket_fare: event.ticket_fare.map(|fare| fare.to_string()),
                total_tickets: event.total_tickets,
                available_tickets: capacity.remaining,
            },
            participant_details: ParticipantDetails {
                participant_type: event.participant_type,
                participant_count: event.participant_count,
            },
            register_state,
            created_at: event.created_at,
            updated_at: event.updated_at,
        }
    }
}
