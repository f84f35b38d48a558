//! Query side of the registration system.
//!
//! Read-only listings assembled from joined event, address, category,
//! booking and profile rows. Only confirmed bookings are ever shown or
//! counted.

pub mod queries;
pub mod views;

pub use queries::EventQueries;
pub use views::{AttendeeBooking, EventAttendee, EventSummary};
