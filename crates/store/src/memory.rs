use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{AddressId, CategoryId, EventId, UserId};
use tokio::sync::RwLock;

use crate::{
    Address, AddressSource, AttendeeBookingRow, Booking, Category, CreatedEvent, Event,
    EventAttendeeRow, EventChanges, EventDraft, EventOrder, EventQuery, EventRow, NewAddress,
    NewBooking, NewCategory, Profile, ReserveOutcome, Result, StoreError,
    store::RegistrationStore,
};

#[derive(Debug, Default)]
struct State {
    profiles: HashMap<UserId, Profile>,
    categories: BTreeMap<CategoryId, Category>,
    next_category_id: i64,
    addresses: BTreeMap<AddressId, Address>,
    address_index: HashMap<String, AddressId>,
    next_address_id: i64,
    events: Vec<Event>,
    bookings: Vec<Booking>,
}

impl State {
    fn event(&self, event_id: EventId) -> Option<&Event> {
        self.events.iter().find(|e| e.event_id == event_id)
    }

    fn booking(&self, event_id: EventId, attendee_id: UserId) -> Option<&Booking> {
        self.bookings
            .iter()
            .find(|b| b.event_id == event_id && b.attendee_id == attendee_id)
    }

    fn confirmed_count(&self, event_id: EventId) -> u64 {
        self.bookings
            .iter()
            .filter(|b| b.event_id == event_id && b.booking_status)
            .count() as u64
    }

    fn allocate_address(&mut self, address: NewAddress) -> Address {
        self.next_address_id += 1;
        let stored = Address {
            address_id: AddressId::new(self.next_address_id),
            full_address: address.full_address,
            latitude: address.latitude,
            longitude: address.longitude,
            created_at: Utc::now(),
        };
        self.address_index
            .insert(stored.full_address.clone(), stored.address_id);
        self.addresses.insert(stored.address_id, stored.clone());
        stored
    }

    fn row(&self, event: &Event) -> Result<EventRow> {
        let address = self.addresses.get(&event.address_id).ok_or_else(|| {
            StoreError::CorruptRow(format!(
                "event {} references missing address {}",
                event.event_id, event.address_id
            ))
        })?;
        let category = self.categories.get(&event.category_id).ok_or_else(|| {
            StoreError::CorruptRow(format!(
                "event {} references missing category {}",
                event.event_id, event.category_id
            ))
        })?;
        Ok(EventRow {
            event: event.clone(),
            address: address.clone(),
            category_name: category.name.clone(),
            confirmed_bookings: self.confirmed_count(event.event_id),
        })
    }
}

/// In-memory store implementation for testing and local development.
///
/// A single lock guards all tables, so every trait method is atomic and
/// serialized with respect to every other.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored address rows.
    pub async fn address_count(&self) -> usize {
        self.state.read().await.addresses.len()
    }

    /// Returns the number of stored event rows.
    pub async fn event_count(&self) -> usize {
        self.state.read().await.events.len()
    }

    /// Returns the number of stored booking rows, confirmed or not.
    pub async fn booking_count(&self) -> usize {
        self.state.read().await.bookings.len()
    }

    /// Inserts a booking row without any capacity check.
    ///
    /// Only uniqueness is enforced. Used to seed legacy rows such as
    /// unconfirmed bookings.
    pub async fn insert_booking_unchecked(&self, booking: Booking) -> Result<()> {
        let mut state = self.state.write().await;
        if state.booking(booking.event_id, booking.attendee_id).is_some() {
            return Err(StoreError::UniqueViolation {
                constraint: "uq_event_attendee".to_string(),
            });
        }
        state.bookings.push(booking);
        Ok(())
    }

    /// Overwrites an event's total tickets without touching its bookings.
    pub async fn set_total_tickets(&self, event_id: EventId, total_tickets: u32) -> bool {
        let mut state = self.state.write().await;
        match state.events.iter_mut().find(|e| e.event_id == event_id) {
            Some(event) => {
                event.total_tickets = total_tickets;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl RegistrationStore for InMemoryStore {
    async fn get_profile(&self, user_id: UserId) -> Result<Option<Profile>> {
        Ok(self.state.read().await.profiles.get(&user_id).cloned())
    }

    async fn save_profile(&self, profile: Profile) -> Result<()> {
        self.state
            .write()
            .await
            .profiles
            .insert(profile.user_id, profile);
        Ok(())
    }

    async fn create_categories(&self, categories: Vec<NewCategory>) -> Result<Vec<Category>> {
        let mut state = self.state.write().await;

        // Check every name first so a failure leaves nothing behind
        for (i, category) in categories.iter().enumerate() {
            let clashes_stored = state.categories.values().any(|c| c.name == category.name);
            let clashes_batch = categories[..i].iter().any(|c| c.name == category.name);
            if clashes_stored || clashes_batch {
                return Err(StoreError::UniqueViolation {
                    constraint: "uq_category_name".to_string(),
                });
            }
        }

        let now = Utc::now();
        let mut created = Vec::with_capacity(categories.len());
        for category in categories {
            state.next_category_id += 1;
            let stored = Category {
                category_id: CategoryId::new(state.next_category_id),
                name: category.name,
                image_url: category.image_url,
                created_at: now,
            };
            state.categories.insert(stored.category_id, stored.clone());
            created.push(stored);
        }
        Ok(created)
    }

    async fn get_category(&self, category_id: CategoryId) -> Result<Option<Category>> {
        Ok(self.state.read().await.categories.get(&category_id).cloned())
    }

    async fn get_category_by_name(&self, name: &str) -> Result<Option<Category>> {
        let state = self.state.read().await;
        Ok(state.categories.values().find(|c| c.name == name).cloned())
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        Ok(self.state.read().await.categories.values().cloned().collect())
    }

    async fn find_address(&self, full_address: &str) -> Result<Option<Address>> {
        let state = self.state.read().await;
        Ok(state
            .address_index
            .get(full_address)
            .and_then(|id| state.addresses.get(id))
            .cloned())
    }

    async fn insert_address(&self, address: NewAddress) -> Result<Address> {
        let mut state = self.state.write().await;
        let known = state.address_index.get(&address.full_address).copied();
        if let Some(existing) = known.and_then(|id| state.addresses.get(&id)) {
            return Ok(existing.clone());
        }
        Ok(state.allocate_address(address))
    }

    async fn create_event(&self, draft: EventDraft) -> Result<CreatedEvent> {
        let mut state = self.state.write().await;
        let EventDraft {
            event,
            address,
            creator_booking,
        } = draft;

        if !state.categories.contains_key(&event.category_id) {
            return Err(StoreError::MissingReference("events_category_id_fkey".into()));
        }
        if state.event(event.event_id).is_some() {
            return Err(StoreError::UniqueViolation {
                constraint: "events_pkey".to_string(),
            });
        }
        if creator_booking.event_id != event.event_id {
            return Err(StoreError::MissingReference(
                "event_bookings_event_id_fkey".into(),
            ));
        }
        if let AddressSource::Existing(ref existing) = address
            && !state.addresses.contains_key(&existing.address_id)
        {
            return Err(StoreError::MissingReference("events_address_id_fkey".into()));
        }

        // All checks passed; from here on nothing can fail
        let address = match address {
            AddressSource::Existing(existing) => existing,
            AddressSource::Geocoded(new_address) => {
                let known = state.address_index.get(&new_address.full_address).copied();
                match known.and_then(|id| state.addresses.get(&id)).cloned() {
                    Some(existing) => existing,
                    None => state.allocate_address(new_address),
                }
            }
        };

        let stored = Event {
            event_id: event.event_id,
            name: event.name,
            description: event.description,
            agenda: event.agenda,
            image_url: event.image_url,
            start_time: event.start_time,
            end_time: event.end_time,
            landmark: event.landmark,
            ticket_type: event.ticket_type,
            ticket_fare: event.ticket_fare,
            total_tickets: event.total_tickets,
            participant_type: event.participant_type,
            participant_count: event.participant_count,
            category_id: event.category_id,
            address_id: address.address_id,
            creator_id: event.creator_id,
            created_at: event.created_at,
            updated_at: event.created_at,
        };
        let booking = Booking {
            booking_id: creator_booking.booking_id,
            event_id: creator_booking.event_id,
            attendee_id: creator_booking.attendee_id,
            booking_status: true,
            registered_at: creator_booking.registered_at,
            scanned_at: None,
        };

        state.events.push(stored.clone());
        state.bookings.push(booking.clone());

        Ok(CreatedEvent {
            event: stored,
            address,
            creator_booking: booking,
        })
    }

    async fn get_event(&self, event_id: EventId) -> Result<Option<Event>> {
        Ok(self.state.read().await.event(event_id).cloned())
    }

    async fn get_event_row(&self, event_id: EventId) -> Result<Option<EventRow>> {
        let state = self.state.read().await;
        state.event(event_id).map(|e| state.row(e)).transpose()
    }

    async fn update_event(
        &self,
        event_id: EventId,
        changes: EventChanges,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Event>> {
        let mut state = self.state.write().await;
        let Some(event) = state.events.iter_mut().find(|e| e.event_id == event_id) else {
            return Ok(None);
        };
        changes.apply_to(event);
        event.updated_at = updated_at;
        Ok(Some(event.clone()))
    }

    async fn query_events(&self, query: EventQuery) -> Result<Vec<EventRow>> {
        let state = self.state.read().await;
        let mut events: Vec<&Event> = state
            .events
            .iter()
            .filter(|e| {
                if let Some(after) = query.starts_after
                    && e.start_time <= after
                {
                    return false;
                }
                if let Some(creator) = query.creator_id
                    && e.creator_id != creator
                {
                    return false;
                }
                if let Some(category) = query.category_id
                    && e.category_id != category
                {
                    return false;
                }
                true
            })
            .collect();

        match query.order {
            EventOrder::Created => {}
            EventOrder::StartTimeAscending => events.sort_by_key(|e| e.start_time),
            EventOrder::StartTimeDescending => {
                events.sort_by(|a, b| b.start_time.cmp(&a.start_time))
            }
        }

        events
            .into_iter()
            .skip(query.offset.unwrap_or(0))
            .take(query.limit.unwrap_or(usize::MAX))
            .map(|e| state.row(e))
            .collect()
    }

    async fn get_booking(
        &self,
        event_id: EventId,
        attendee_id: UserId,
    ) -> Result<Option<Booking>> {
        Ok(self
            .state
            .read()
            .await
            .booking(event_id, attendee_id)
            .cloned())
    }

    async fn count_confirmed_bookings(&self, event_id: EventId) -> Result<u64> {
        Ok(self.state.read().await.confirmed_count(event_id))
    }

    async fn reserve_booking(&self, booking: NewBooking) -> Result<ReserveOutcome> {
        let mut state = self.state.write().await;

        let Some(event) = state.event(booking.event_id) else {
            return Ok(ReserveOutcome::EventMissing);
        };
        if state.confirmed_count(booking.event_id) >= u64::from(event.total_tickets) {
            return Ok(ReserveOutcome::SoldOut);
        }
        if let Some(existing) = state.booking(booking.event_id, booking.attendee_id) {
            return Ok(ReserveOutcome::AlreadyBooked(existing.clone()));
        }

        let stored = Booking {
            booking_id: booking.booking_id,
            event_id: booking.event_id,
            attendee_id: booking.attendee_id,
            booking_status: true,
            registered_at: booking.registered_at,
            scanned_at: None,
        };
        state.bookings.push(stored.clone());
        Ok(ReserveOutcome::Reserved(stored))
    }

    async fn attendee_bookings(
        &self,
        attendee_id: UserId,
        event_ids: Option<&[EventId]>,
    ) -> Result<Vec<AttendeeBookingRow>> {
        let state = self.state.read().await;
        let rows = state
            .bookings
            .iter()
            .filter(|b| b.attendee_id == attendee_id && b.booking_status)
            .filter(|b| event_ids.is_none_or(|ids| ids.contains(&b.event_id)))
            .filter_map(|b| {
                state.event(b.event_id).map(|e| AttendeeBookingRow {
                    booking_id: b.booking_id,
                    event_id: e.event_id,
                    event_name: e.name.clone(),
                    image_url: e.image_url.clone(),
                    start_time: e.start_time,
                    end_time: e.end_time,
                    ticket_type: e.ticket_type,
                    ticket_fare: e.ticket_fare,
                    registered_at: b.registered_at,
                })
            })
            .collect();
        Ok(rows)
    }

    async fn event_attendees(&self, event_id: EventId) -> Result<Vec<EventAttendeeRow>> {
        let state = self.state.read().await;
        let rows = state
            .bookings
            .iter()
            .filter(|b| b.event_id == event_id && b.booking_status)
            .map(|b| {
                let profile = state.profiles.get(&b.attendee_id);
                EventAttendeeRow {
                    booking_id: b.booking_id,
                    attendee_id: b.attendee_id,
                    first_name: profile.map(|p| p.first_name.clone()),
                    last_name: profile.map(|p| p.last_name.clone()),
                    registered_at: b.registered_at,
                }
            })
            .collect();
        Ok(rows)
    }
}
