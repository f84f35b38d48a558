//! Shared types for the event registration workspace.
//!
//! Identifiers are strongly typed so an attendee id can never be passed
//! where an event id is expected. Policy types describe how an event sells
//! tickets and admits participants.

pub mod policy;
pub mod types;

pub use policy::{Money, ParseEnumError, ParticipantType, TicketType};
pub use types::{AddressId, BookingId, CategoryId, EventId, UserId};
