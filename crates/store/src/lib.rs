//! Storage layer for event registration.
//!
//! The [`RegistrationStore`] trait is the single shared mutable resource of
//! the system. Every implementation must enforce, at the storage level:
//! - at most one booking row per (event, attendee)
//! - at most one address row per normalized address string
//! - a confirmed-booking count that never exceeds an event's total tickets
//!
//! Two implementations are provided: [`InMemoryStore`] for tests and local
//! development, and [`PostgresStore`] for production.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod record;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use query::{EventOrder, EventQuery};
pub use record::{
    Address, AddressSource, AttendeeBookingRow, Booking, Category, CreatedEvent, Event,
    EventAttendeeRow, EventChanges, EventDraft, EventRow, NewAddress, NewBooking, NewCategory,
    NewEvent, Profile, ReserveOutcome,
};
pub use store::{RegistrationStore, RegistrationStoreExt};
