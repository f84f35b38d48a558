//! Event Lifecycle Manager: creation, partial update and detail views.

mod view;

use std::sync::Arc;

use common::{EventId, TicketType, UserId};
use store::{EventDraft, NewEvent, RegistrationStore};

use crate::address::AddressResolver;
use crate::booking::{BookingEngine, RegistrationState};
use crate::capacity::CapacityLedger;
use crate::category::CategoryCatalog;
use crate::clock::Clock;
use crate::error::{DomainError, Result};
use crate::validation::{CreateEventRequest, UpdateEventRequest};

pub use view::{AddressView, EventView, ParticipantDetails, TicketDetails};

/// Creates, edits and reads events on behalf of their creators.
pub struct EventManager<S: RegistrationStore> {
    store: S,
    addresses: Arc<AddressResolver<S>>,
    categories: Arc<CategoryCatalog<S>>,
    bookings: Arc<BookingEngine<S>>,
    ledger: CapacityLedger<S>,
    clock: Arc<dyn Clock>,
}

impl<S: RegistrationStore> EventManager<S> {
    /// Creates a new event manager over the given store and services.
    pub fn new(
        store: S,
        addresses: Arc<AddressResolver<S>>,
        categories: Arc<CategoryCatalog<S>>,
        bookings: Arc<BookingEngine<S>>,
        ledger: CapacityLedger<S>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            addresses,
            categories,
            bookings,
            ledger,
            clock,
        }
    }

    /// Creates an event and books its creator's seat.
    ///
    /// The address (when new), the event and the creator's booking are
    /// written in one transaction; a failure at any step persists nothing.
    #[tracing::instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_event(
        &self,
        request: &CreateEventRequest,
        creator_id: UserId,
    ) -> Result<EventView> {
        let now = self.clock.now();
        let validated = request.validate(now)?;

        if validated.ticket_type == TicketType::Paid {
            self.authorize_paid_creator(creator_id).await?;
        }

        let category = match self.categories.get_by_id(validated.category_id).await {
            Ok(category) => category,
            Err(DomainError::NotFound { .. }) => {
                return Err(DomainError::validation(
                    "category_id",
                    format!("category {} does not exist", validated.category_id),
                ));
            }
            Err(e) => return Err(e),
        };

        let address = self.addresses.locate(&validated.full_address).await?;

        let event_id = EventId::new();
        let draft = EventDraft {
            event: NewEvent {
                event_id,
                name: validated.name,
                description: validated.description,
                agenda: validated.agenda,
                image_url: validated.image_url,
                start_time: validated.start_time,
                end_time: validated.end_time,
                landmark: validated.landmark,
                ticket_type: validated.ticket_type,
                ticket_fare: validated.ticket_fare,
                total_tickets: validated.total_tickets,
                participant_type: validated.participant_type,
                participant_count: validated.participant_count,
                category_id: category.category_id,
                creator_id,
                created_at: now,
            },
            address,
            creator_booking: self.bookings.creator_booking(event_id, creator_id),
        };

        let created = self.store.create_event(draft).await?;

        metrics::counter!("events_created_total").increment(1);
        tracing::info!(
            %event_id,
            address_id = %created.address.address_id,
            "Event created"
        );

        let capacity = self
            .ledger
            .reading(event_id, created.event.total_tickets)
            .await?;

        Ok(EventView::compose(
            &created.event,
            &created.address,
            &category.name,
            capacity,
            RegistrationState::Registered,
        ))
    }

    /// Paid events need a profile carrying a merchant id.
    async fn authorize_paid_creator(&self, creator_id: UserId) -> Result<()> {
        let Some(profile) = self.store.get_profile(creator_id).await? else {
            return Err(DomainError::Forbidden(
                "a user profile is required to create a paid event".to_string(),
            ));
        };
        if !profile.has_merchant_id() {
            return Err(DomainError::validation(
                "ticket_details.ticket_type",
                "a merchant id must be set on the profile to create paid events",
            ));
        }
        Ok(())
    }

    /// Merges the supplied descriptive fields onto an event its requester created.
    #[tracing::instrument(skip(self, request))]
    pub async fn update_event(
        &self,
        event_id: EventId,
        request: &UpdateEventRequest,
        requester_id: UserId,
    ) -> Result<EventView> {
        let changes = request.validate()?;

        let event = self
            .store
            .get_event(event_id)
            .await?
            .ok_or_else(|| DomainError::not_found("event", event_id))?;

        if event.creator_id != requester_id {
            return Err(DomainError::Forbidden(
                "only the creator can update this event".to_string(),
            ));
        }

        self.store
            .update_event(event_id, changes, self.clock.now())
            .await?
            .ok_or_else(|| DomainError::not_found("event", event_id))?;

        tracing::info!(%event_id, "Event updated");
        self.get_event_by_id(event_id, requester_id).await
    }

    /// Loads an event with live capacity and the viewer's registration state.
    #[tracing::instrument(skip(self))]
    pub async fn get_event_by_id(&self, event_id: EventId, viewer_id: UserId) -> Result<EventView> {
        let row = self
            .store
            .get_event_row(event_id)
            .await?
            .ok_or_else(|| DomainError::not_found("event", event_id))?;

        let capacity = self.ledger.reading(event_id, row.event.total_tickets).await?;
        let register_state = self.bookings.status(event_id, viewer_id).await?;

        Ok(EventView::compose(
            &row.event,
            &row.address,
            &row.category_name,
            capacity,
            register_state,
        ))
    }
}
