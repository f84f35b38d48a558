use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CategoryId, EventId, UserId};

use crate::{
    Address, AttendeeBookingRow, Booking, Category, CreatedEvent, Event, EventAttendeeRow,
    EventChanges, EventDraft, EventQuery, EventRow, NewAddress, NewBooking, NewCategory, Profile,
    ReserveOutcome, Result,
};

/// Core trait for registration storage.
///
/// All implementations must be thread-safe (Send + Sync) and every method
/// is its own transaction: it either fully commits or leaves no trace.
#[async_trait]
pub trait RegistrationStore: Send + Sync {
    /// Loads the profile of an identity, if one was completed.
    async fn get_profile(&self, user_id: UserId) -> Result<Option<Profile>>;

    /// Inserts or replaces a profile.
    async fn save_profile(&self, profile: Profile) -> Result<()>;

    /// Creates all categories or none of them.
    ///
    /// Fails with `UniqueViolation` if any name already exists.
    async fn create_categories(&self, categories: Vec<NewCategory>) -> Result<Vec<Category>>;

    async fn get_category(&self, category_id: CategoryId) -> Result<Option<Category>>;

    async fn get_category_by_name(&self, name: &str) -> Result<Option<Category>>;

    /// Lists all categories ordered by id.
    async fn list_categories(&self) -> Result<Vec<Category>>;

    /// Finds an address by its exact normalized string.
    async fn find_address(&self, full_address: &str) -> Result<Option<Address>>;

    /// Inserts an address, or returns the existing row when another writer
    /// stored the same normalized string first.
    async fn insert_address(&self, address: NewAddress) -> Result<Address>;

    /// Atomically persists a new event, its address (when freshly geocoded)
    /// and the creator's confirmed booking.
    async fn create_event(&self, draft: EventDraft) -> Result<CreatedEvent>;

    async fn get_event(&self, event_id: EventId) -> Result<Option<Event>>;

    /// Loads an event joined with address, category name and confirmed count.
    async fn get_event_row(&self, event_id: EventId) -> Result<Option<EventRow>>;

    /// Merges the present fields of `changes` onto the stored event.
    ///
    /// Returns None if the event doesn't exist.
    async fn update_event(
        &self,
        event_id: EventId,
        changes: EventChanges,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Event>>;

    /// Lists joined event rows matching a query.
    async fn query_events(&self, query: EventQuery) -> Result<Vec<EventRow>>;

    /// Returns the booking row for (event, attendee), confirmed or not.
    async fn get_booking(&self, event_id: EventId, attendee_id: UserId)
    -> Result<Option<Booking>>;

    /// Counts rows with `booking_status == true` for an event.
    async fn count_confirmed_bookings(&self, event_id: EventId) -> Result<u64>;

    /// Inserts a confirmed booking if, at commit time, the event exists, has
    /// fewer confirmed bookings than total tickets, and no row exists for the
    /// same (event, attendee). Capacity is checked before duplication.
    async fn reserve_booking(&self, booking: NewBooking) -> Result<ReserveOutcome>;

    /// Lists an attendee's confirmed bookings, optionally restricted to some events.
    async fn attendee_bookings(
        &self,
        attendee_id: UserId,
        event_ids: Option<&[EventId]>,
    ) -> Result<Vec<AttendeeBookingRow>>;

    /// Lists the confirmed attendees of an event.
    async fn event_attendees(&self, event_id: EventId) -> Result<Vec<EventAttendeeRow>>;
}

/// Extension trait providing convenience methods for registration stores.
#[async_trait]
pub trait RegistrationStoreExt: RegistrationStore {
    async fn event_exists(&self, event_id: EventId) -> Result<bool> {
        Ok(self.get_event(event_id).await?.is_some())
    }

    async fn has_profile(&self, user_id: UserId) -> Result<bool> {
        Ok(self.get_profile(user_id).await?.is_some())
    }

    /// Returns true if a confirmed booking exists for (event, attendee).
    async fn is_confirmed(&self, event_id: EventId, attendee_id: UserId) -> Result<bool> {
        Ok(self
            .get_booking(event_id, attendee_id)
            .await?
            .is_some_and(|booking| booking.booking_status))
    }
}

// Blanket implementation for all RegistrationStore implementations
impl<T: RegistrationStore + ?Sized> RegistrationStoreExt for T {}
