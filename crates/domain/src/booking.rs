//! Booking Engine: the per-(event, attendee) registration state machine.
//!
//! A pair is either `NotRegistered` (no confirmed row) or `Registered`.
//! Capacity is checked before duplication, so a repeat attempt on a full
//! event is answered with "sold out".

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use common::{BookingId, EventId, TicketType, UserId};
use serde::{Deserialize, Serialize};
use store::{NewBooking, RegistrationStore, RegistrationStoreExt, ReserveOutcome};

use crate::capacity::CapacityLedger;
use crate::clock::Clock;
use crate::error::{ConflictReason, DomainError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationState {
    Registered,
    NotRegistered,
}

/// A successful registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub booking_id: BookingId,
    pub event_id: EventId,
    pub attendee_id: UserId,
    pub state: RegistrationState,
    pub registered_at: DateTime<Utc>,
}

/// Registers users for events and cancels their bookings.
pub struct BookingEngine<S: RegistrationStore> {
    store: S,
    ledger: CapacityLedger<S>,
    clock: Arc<dyn Clock>,
}

impl<S: RegistrationStore> BookingEngine<S> {
    /// Creates a new booking engine over the given store and capacity ledger.
    pub fn new(store: S, ledger: CapacityLedger<S>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            ledger,
            clock,
        }
    }

    /// Registers `attendee_id` for `event_id`.
    ///
    /// The pre-checks give precise errors; the store re-checks capacity and
    /// duplication atomically with the insert.
    #[tracing::instrument(skip(self))]
    pub async fn register(&self, event_id: EventId, attendee_id: UserId) -> Result<Registration> {
        let started = Instant::now();
        let result = self.try_register(event_id, attendee_id).await;
        metrics::histogram!("registration_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        match &result {
            Ok(registration) => {
                metrics::counter!("bookings_registered_total").increment(1);
                tracing::info!(booking_id = %registration.booking_id, "Attendee registered");
            }
            Err(e) => {
                let reason = rejection_reason(e);
                metrics::counter!("bookings_rejected_total", "reason" => reason).increment(1);
                tracing::warn!(reason, error = %e, "Registration rejected");
            }
        }

        result
    }

    async fn try_register(&self, event_id: EventId, attendee_id: UserId) -> Result<Registration> {
        if !self.store.has_profile(attendee_id).await? {
            return Err(DomainError::Forbidden(
                "a completed profile is required to register".to_string(),
            ));
        }

        let event = self
            .store
            .get_event(event_id)
            .await?
            .ok_or_else(|| DomainError::not_found("event", event_id))?;

        let now = self.clock.now();
        if now >= event.start_time {
            return Err(DomainError::RegistrationClosed);
        }

        let reading = self.ledger.reading(event_id, event.total_tickets).await?;
        if reading.oversold {
            return Err(DomainError::InvariantViolation(format!(
                "event {event_id} has {} confirmed bookings for {} tickets",
                reading.confirmed, reading.total_tickets
            )));
        }
        if reading.is_sold_out() {
            return Err(DomainError::Conflict(ConflictReason::SoldOut));
        }

        if let Some(existing) = self.store.get_booking(event_id, attendee_id).await? {
            return Err(existing_booking_error(existing.booking_status));
        }

        if event.ticket_type == TicketType::Paid {
            return Err(DomainError::NotImplemented("paid ticket registration"));
        }

        let booking = NewBooking::new(event_id, attendee_id, now);
        match self.store.reserve_booking(booking).await? {
            ReserveOutcome::Reserved(booking) => Ok(Registration {
                booking_id: booking.booking_id,
                event_id: booking.event_id,
                attendee_id: booking.attendee_id,
                state: RegistrationState::Registered,
                registered_at: booking.registered_at,
            }),
            ReserveOutcome::SoldOut => Err(DomainError::Conflict(ConflictReason::SoldOut)),
            ReserveOutcome::AlreadyBooked(existing) => {
                Err(existing_booking_error(existing.booking_status))
            }
            ReserveOutcome::EventMissing => Err(DomainError::not_found("event", event_id)),
        }
    }

    /// REGISTERED iff a confirmed booking row exists for the pair.
    pub async fn status(&self, event_id: EventId, attendee_id: UserId) -> Result<RegistrationState> {
        if self.store.is_confirmed(event_id, attendee_id).await? {
            Ok(RegistrationState::Registered)
        } else {
            Ok(RegistrationState::NotRegistered)
        }
    }

    /// [`status`](Self::status) for a caller-supplied event id; unknown events are `NotFound`.
    #[tracing::instrument(skip(self))]
    pub async fn status_for_event(
        &self,
        event_id: EventId,
        attendee_id: UserId,
    ) -> Result<RegistrationState> {
        if !self.store.event_exists(event_id).await? {
            return Err(DomainError::not_found("event", event_id));
        }
        self.status(event_id, attendee_id).await
    }

    /// Builds the creator's complimentary booking, written together with the event.
    pub fn creator_booking(&self, event_id: EventId, creator_id: UserId) -> NewBooking {
        NewBooking::new(event_id, creator_id, self.clock.now())
    }
}

fn existing_booking_error(confirmed: bool) -> DomainError {
    if confirmed {
        DomainError::Conflict(ConflictReason::AlreadyRegistered)
    } else {
        // No cancellation flow exists, so re-confirmation has no defined policy
        DomainError::NotImplemented("re-confirming an unconfirmed booking")
    }
}

fn rejection_reason(e: &DomainError) -> &'static str {
    match e {
        DomainError::Conflict(ConflictReason::SoldOut) => "sold_out",
        DomainError::Conflict(_) => "already_registered",
        DomainError::RegistrationClosed => "closed",
        DomainError::Forbidden(_) => "no_profile",
        DomainError::NotFound { .. } => "not_found",
        DomainError::NotImplemented(_) => "not_implemented",
        DomainError::InvariantViolation(_) => "invariant_violation",
        _ => "error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use common::{BookingId, CategoryId, Money, ParticipantType};
    use store::{
        AddressSource, Booking, EventDraft, InMemoryStore, NewAddress, NewCategory, NewEvent,
        Profile,
    };

    use crate::clock::ManualClock;

    struct Fixture {
        store: InMemoryStore,
        clock: ManualClock,
        engine: BookingEngine<InMemoryStore>,
    }

    fn fixture() -> Fixture {
        let store = InMemoryStore::new();
        let clock = ManualClock::new(Utc::now());
        let engine = BookingEngine::new(
            store.clone(),
            CapacityLedger::new(store.clone()),
            Arc::new(clock.clone()),
        );
        Fixture {
            store,
            clock,
            engine,
        }
    }

    async fn seed_event(f: &Fixture, total_tickets: u32, ticket_type: TicketType) -> EventId {
        let category = f
            .store
            .create_categories(vec![NewCategory {
                name: format!("Cat {}", EventId::new()),
                image_url: "https://img.example.com/c.png".to_string(),
            }])
            .await
            .unwrap()
            .remove(0);
        let now = f.clock.now();
        let event_id = EventId::new();
        let creator = UserId::new();
        f.store
            .create_event(EventDraft {
                event: NewEvent {
                    event_id,
                    name: "Board Games".to_string(),
                    description: "Bring your favourite game".to_string(),
                    agenda: "Play all night".to_string(),
                    image_url: "https://img.example.com/games.png".to_string(),
                    start_time: now + Duration::hours(5),
                    end_time: now + Duration::hours(9),
                    landmark: None,
                    ticket_type,
                    ticket_fare: (ticket_type == TicketType::Paid).then(|| Money::from_cents(500)),
                    total_tickets,
                    participant_type: ParticipantType::Individual,
                    participant_count: 1,
                    category_id: category.category_id,
                    creator_id: creator,
                    created_at: now,
                },
                address: AddressSource::Geocoded(NewAddress {
                    full_address: format!("{event_id} Game Street"),
                    latitude: 1.0,
                    longitude: 2.0,
                }),
                creator_booking: NewBooking::new(event_id, creator, now),
            })
            .await
            .unwrap();
        event_id
    }

    async fn attendee(f: &Fixture) -> UserId {
        let id = UserId::new();
        f.store
            .save_profile(Profile::new(id, "Grace", "Hopper"))
            .await
            .unwrap();
        id
    }

    #[tokio::test]
    async fn register_then_status_is_registered() {
        let f = fixture();
        let event_id = seed_event(&f, 5, TicketType::Free).await;
        let user = attendee(&f).await;

        assert_eq!(
            f.engine.status(event_id, user).await.unwrap(),
            RegistrationState::NotRegistered
        );

        let registration = f.engine.register(event_id, user).await.unwrap();
        assert_eq!(registration.state, RegistrationState::Registered);
        assert_eq!(
            f.engine.status(event_id, user).await.unwrap(),
            RegistrationState::Registered
        );
    }

    #[tokio::test]
    async fn register_requires_profile() {
        let f = fixture();
        let event_id = seed_event(&f, 5, TicketType::Free).await;

        let result = f.engine.register(event_id, UserId::new()).await;
        assert!(matches!(result, Err(DomainError::Forbidden(_))));
    }

    #[tokio::test]
    async fn register_unknown_event() {
        let f = fixture();
        let user = attendee(&f).await;

        let result = f.engine.register(EventId::new(), user).await;
        assert!(matches!(result, Err(DomainError::NotFound { entity: "event", .. })));
    }

    #[tokio::test]
    async fn status_for_unknown_event_is_not_found() {
        let f = fixture();
        let user = attendee(&f).await;

        let result = f.engine.status_for_event(EventId::new(), user).await;
        assert!(matches!(result, Err(DomainError::NotFound { entity: "event", .. })));

        let event_id = seed_event(&f, 5, TicketType::Free).await;
        assert_eq!(
            f.engine.status_for_event(event_id, user).await.unwrap(),
            RegistrationState::NotRegistered
        );
    }

    #[tokio::test]
    async fn registration_closes_at_start_time() {
        let f = fixture();
        let event_id = seed_event(&f, 5, TicketType::Free).await;
        let user = attendee(&f).await;

        f.clock.advance(Duration::hours(5));
        let result = f.engine.register(event_id, user).await;
        assert!(matches!(result, Err(DomainError::RegistrationClosed)));
    }

    #[tokio::test]
    async fn full_event_reports_sold_out_even_for_duplicates() {
        let f = fixture();
        let event_id = seed_event(&f, 2, TicketType::Free).await;
        let user = attendee(&f).await;

        f.engine.register(event_id, user).await.unwrap();
        let result = f.engine.register(event_id, user).await;
        assert!(matches!(
            result,
            Err(DomainError::Conflict(ConflictReason::SoldOut))
        ));
    }

    #[tokio::test]
    async fn unconfirmed_row_is_not_silently_accepted() {
        let f = fixture();
        let event_id = seed_event(&f, 5, TicketType::Free).await;
        let user = attendee(&f).await;
        f.store
            .insert_booking_unchecked(Booking {
                booking_id: BookingId::new(),
                event_id,
                attendee_id: user,
                booking_status: false,
                registered_at: Utc::now(),
                scanned_at: None,
            })
            .await
            .unwrap();

        let result = f.engine.register(event_id, user).await;
        assert!(matches!(result, Err(DomainError::NotImplemented(_))));
        assert_eq!(
            f.engine.status(event_id, user).await.unwrap(),
            RegistrationState::NotRegistered
        );
    }

    #[tokio::test]
    async fn paid_registration_is_not_implemented_after_checks() {
        let f = fixture();
        let event_id = seed_event(&f, 1, TicketType::Paid).await;
        let user = attendee(&f).await;

        // The creator holds the only seat, so capacity is checked first
        let result = f.engine.register(event_id, user).await;
        assert!(matches!(
            result,
            Err(DomainError::Conflict(ConflictReason::SoldOut))
        ));

        f.store.set_total_tickets(event_id, 10).await;
        let result = f.engine.register(event_id, user).await;
        assert!(matches!(result, Err(DomainError::NotImplemented(_))));
    }

    #[tokio::test]
    async fn oversold_event_surfaces_invariant_violation() {
        let f = fixture();
        let event_id = seed_event(&f, 3, TicketType::Free).await;
        let user = attendee(&f).await;
        f.engine.register(event_id, user).await.unwrap();

        f.store.set_total_tickets(event_id, 1).await;
        let other = attendee(&f).await;
        let result = f.engine.register(event_id, other).await;
        assert!(matches!(result, Err(DomainError::InvariantViolation(_))));
    }
}
