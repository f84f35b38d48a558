//! Event registration and capacity management.
//!
//! This crate provides the components that own the registration invariants:
//! - `AddressResolver` deduplicating geocoded locations
//! - `CategoryCatalog` for event categories
//! - `CapacityLedger` computing remaining tickets from live bookings
//! - `BookingEngine` enforcing one confirmed booking per attendee and event
//! - `EventManager` orchestrating creation and partial updates

pub mod address;
pub mod booking;
pub mod capacity;
pub mod category;
pub mod clock;
pub mod error;
pub mod event;
pub mod services;
pub mod validation;

pub use address::{
    AddressParts, AddressResolver, Coordinates, DEFAULT_GEOCODER_URL, GeocodeError, Geocoder,
    HttpGeocoder, InMemoryGeocoder,
};
pub use booking::{BookingEngine, Registration, RegistrationState};
pub use capacity::{CapacityLedger, CapacityReading};
pub use category::CategoryCatalog;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ConflictReason, DomainError, FieldError, Result, ValidationErrors};
pub use event::{AddressView, EventManager, EventView, ParticipantDetails, TicketDetails};
pub use services::RegistrationServices;
pub use validation::{
    AddressInput, CategoryRequest, CreateEventRequest, ParticipantInput, TicketInput,
    UpdateEventRequest, ValidatedEvent,
};
