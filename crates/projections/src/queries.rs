use std::sync::Arc;

use common::{CategoryId, EventId, UserId};
use domain::{Clock, DomainError, Result};
use store::{EventQuery, RegistrationStore};

use crate::views::{AttendeeBooking, EventAttendee, EventSummary};

/// Read-only listings over the registration store.
pub struct EventQueries<S: RegistrationStore> {
    store: S,
    clock: Arc<dyn Clock>,
}

impl<S: RegistrationStore> EventQueries<S> {
    pub fn new(store: S, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Events that have not started yet, in creation order.
    #[tracing::instrument(skip(self))]
    pub async fn upcoming_events(&self) -> Result<Vec<EventSummary>> {
        let rows = self
            .store
            .query_events(EventQuery::upcoming(self.clock.now()))
            .await?;
        Ok(rows.into_iter().map(EventSummary::from).collect())
    }

    /// Upcoming events of one category.
    #[tracing::instrument(skip(self))]
    pub async fn events_in_category(&self, category_id: CategoryId) -> Result<Vec<EventSummary>> {
        let query = EventQuery::upcoming(self.clock.now()).category(category_id);
        let rows = self.store.query_events(query).await?;
        Ok(rows.into_iter().map(EventSummary::from).collect())
    }

    /// Every event `creator_id` created, past ones included, latest start first.
    #[tracing::instrument(skip(self))]
    pub async fn events_created_by(&self, creator_id: UserId) -> Result<Vec<EventSummary>> {
        let rows = self
            .store
            .query_events(EventQuery::created_by(creator_id))
            .await?;
        Ok(rows.into_iter().map(EventSummary::from).collect())
    }

    /// An attendee's confirmed bookings, optionally limited to `event_ids`.
    #[tracing::instrument(skip(self))]
    pub async fn bookings_for_attendee(
        &self,
        attendee_id: UserId,
        event_ids: Option<&[EventId]>,
    ) -> Result<Vec<AttendeeBooking>> {
        let rows = self.store.attendee_bookings(attendee_id, event_ids).await?;
        Ok(rows.into_iter().map(AttendeeBooking::from).collect())
    }

    /// Confirmed attendees of an event. Only its creator may look.
    #[tracing::instrument(skip(self))]
    pub async fn attendees_for_event(
        &self,
        event_id: EventId,
        requester_id: UserId,
    ) -> Result<Vec<EventAttendee>> {
        let event = self
            .store
            .get_event(event_id)
            .await?
            .ok_or_else(|| DomainError::not_found("event", event_id))?;

        if event.creator_id != requester_id {
            return Err(DomainError::Forbidden(
                "only the creator can view this event's bookings".to_string(),
            ));
        }

        let rows = self.store.event_attendees(event_id).await?;
        Ok(rows.into_iter().map(EventAttendee::from).collect())
    }
}
