//! Integration tests: event creation and registration → listing queries.

use std::sync::Arc;

use chrono::{Duration, Utc};
use common::{CategoryId, UserId};
use domain::{
    AddressInput, Clock, CreateEventRequest, DomainError, InMemoryGeocoder, ManualClock,
    ParticipantInput, RegistrationServices, TicketInput,
};
use projections::EventQueries;
use store::{InMemoryStore, NewCategory, Profile, RegistrationStore};

struct Setup {
    store: InMemoryStore,
    clock: ManualClock,
    services: RegistrationServices<InMemoryStore>,
    queries: EventQueries<InMemoryStore>,
    music: CategoryId,
    sports: CategoryId,
}

/// Helper to set up services, queries and two categories.
async fn setup() -> Setup {
    let store = InMemoryStore::new();
    let clock = ManualClock::new(Utc::now());
    let services = RegistrationServices::new(
        store.clone(),
        Arc::new(InMemoryGeocoder::new()),
        Arc::new(clock.clone()),
    );
    let queries = EventQueries::new(store.clone(), Arc::new(clock.clone()));

    let categories = store
        .create_categories(vec![
            NewCategory {
                name: "Music".to_string(),
                image_url: "https://img.example.com/music.png".to_string(),
            },
            NewCategory {
                name: "Sports".to_string(),
                image_url: "https://img.example.com/sports.png".to_string(),
            },
        ])
        .await
        .unwrap();

    Setup {
        store,
        clock,
        services,
        queries,
        music: categories[0].category_id,
        sports: categories[1].category_id,
    }
}

impl Setup {
    fn request(&self, name: &str, category: CategoryId, starts_in: Duration) -> CreateEventRequest {
        let start_time = self.clock.now() + starts_in;
        CreateEventRequest {
            name: name.to_string(),
            description: "An evening out".to_string(),
            image_url: "https://img.example.com/event.jpg".to_string(),
            agenda: "Doors at seven".to_string(),
            start_time,
            end_time: start_time + Duration::hours(3),
            category_id: category.as_i64(),
            address: AddressInput {
                street_address: "1 Harbour Road".to_string(),
                landmark: Some("Pier 4".to_string()),
                city: "Sydney".to_string(),
                state: "NSW".to_string(),
                postal_code: "2000".to_string(),
                country: "Australia".to_string(),
            },
            ticket_details: TicketInput {
                ticket_type: "free".to_string(),
                ticket_fare: None,
                total_tickets: 10,
            },
            participant_details: ParticipantInput {
                participant_type: "individual".to_string(),
                participant_count: None,
            },
        }
    }

    async fn attendee(&self, first: &str, last: &str) -> UserId {
        let id = UserId::new();
        self.store
            .save_profile(Profile::new(id, first, last))
            .await
            .unwrap();
        id
    }
}

#[tokio::test]
async fn test_upcoming_events_exclude_started_ones() {
    let s = setup().await;
    let creator = UserId::new();

    let soon = s
        .services
        .events
        .create_event(&s.request("Soon", s.music, Duration::hours(1)), creator)
        .await
        .unwrap();
    let later = s
        .services
        .events
        .create_event(&s.request("Later", s.sports, Duration::days(3)), creator)
        .await
        .unwrap();

    let upcoming = s.queries.upcoming_events().await.unwrap();
    let ids: Vec<_> = upcoming.iter().map(|e| e.event_id).collect();
    assert_eq!(ids, vec![soon.event_id, later.event_id]);

    s.clock.advance(Duration::hours(2));
    let upcoming = s.queries.upcoming_events().await.unwrap();
    assert_eq!(upcoming.len(), 1);
    assert_eq!(upcoming[0].event_id, later.event_id);
    assert_eq!(upcoming[0].category_name, "Sports");
    assert_eq!(upcoming[0].landmark.as_deref(), Some("Pier 4"));
}

#[tokio::test]
async fn test_available_tickets_track_registrations() {
    let s = setup().await;
    let event = s
        .services
        .events
        .create_event(&s.request("Gig", s.music, Duration::days(1)), UserId::new())
        .await
        .unwrap();

    let listed = s.queries.upcoming_events().await.unwrap();
    assert_eq!(listed[0].total_tickets, 10);
    assert_eq!(listed[0].available_tickets, 9);

    for i in 0..3 {
        let guest = s.attendee("Guest", &i.to_string()).await;
        s.services
            .bookings
            .register(event.event_id, guest)
            .await
            .unwrap();
    }

    let listed = s.queries.upcoming_events().await.unwrap();
    assert_eq!(listed[0].available_tickets, 6);
}

#[tokio::test]
async fn test_events_in_category_filters_and_skips_past() {
    let s = setup().await;
    let creator = UserId::new();
    for (name, category, starts_in) in [
        ("Jazz", s.music, Duration::days(1)),
        ("Opera", s.music, Duration::hours(1)),
        ("Derby", s.sports, Duration::days(1)),
    ] {
        s.services
            .events
            .create_event(&s.request(name, category, starts_in), creator)
            .await
            .unwrap();
    }

    s.clock.advance(Duration::hours(2));

    let music = s.queries.events_in_category(s.music).await.unwrap();
    let names: Vec<_> = music.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["Jazz"]);

    let empty = s
        .queries
        .events_in_category(CategoryId::new(999))
        .await
        .unwrap();
    assert!(empty.is_empty());
}

#[tokio::test]
async fn test_events_created_by_include_past_latest_first() {
    let s = setup().await;
    let creator = UserId::new();
    let someone_else = UserId::new();

    for (name, starts_in, who) in [
        ("First", Duration::hours(1), creator),
        ("Third", Duration::days(5), creator),
        ("Second", Duration::days(2), creator),
        ("Not mine", Duration::days(1), someone_else),
    ] {
        s.services
            .events
            .create_event(&s.request(name, s.music, starts_in), who)
            .await
            .unwrap();
    }

    s.clock.advance(Duration::hours(6));

    let mine = s.queries.events_created_by(creator).await.unwrap();
    let names: Vec<_> = mine.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["Third", "Second", "First"]);
}

#[tokio::test]
async fn test_bookings_for_attendee_with_event_filter() {
    let s = setup().await;
    let guest = s.attendee("Ada", "Lovelace").await;
    let mut event_ids = Vec::new();

    for name in ["One", "Two", "Three"] {
        let event = s
            .services
            .events
            .create_event(&s.request(name, s.music, Duration::days(1)), UserId::new())
            .await
            .unwrap();
        s.services
            .bookings
            .register(event.event_id, guest)
            .await
            .unwrap();
        event_ids.push(event.event_id);
    }

    let all = s.queries.bookings_for_attendee(guest, None).await.unwrap();
    assert_eq!(all.len(), 3);

    let filtered = s
        .queries
        .bookings_for_attendee(guest, Some(&event_ids[1..2]))
        .await
        .unwrap();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].event_id, event_ids[1]);
    assert_eq!(filtered[0].event_name, "Two");

    let nobody = s
        .queries
        .bookings_for_attendee(UserId::new(), None)
        .await
        .unwrap();
    assert!(nobody.is_empty());
}

#[tokio::test]
async fn test_attendees_visible_to_creator_only() {
    let s = setup().await;
    let creator = UserId::new();
    let event = s
        .services
        .events
        .create_event(&s.request("Meetup", s.sports, Duration::days(1)), creator)
        .await
        .unwrap();
    let guest = s.attendee("Alan", "Turing").await;
    s.services
        .bookings
        .register(event.event_id, guest)
        .await
        .unwrap();

    let attendees = s
        .queries
        .attendees_for_event(event.event_id, creator)
        .await
        .unwrap();
    assert_eq!(attendees.len(), 2);

    // The creator's own seat has no profile behind it
    let creator_row = attendees.iter().find(|a| a.attendee_id == creator).unwrap();
    assert_eq!(creator_row.name, None);
    let guest_row = attendees.iter().find(|a| a.attendee_id == guest).unwrap();
    assert_eq!(guest_row.name.as_deref(), Some("Alan Turing"));

    let result = s.queries.attendees_for_event(event.event_id, guest).await;
    assert!(matches!(result, Err(DomainError::Forbidden(_))));
}

#[tokio::test]
async fn test_attendees_for_unknown_event() {
    let s = setup().await;
    let result = s
        .queries
        .attendees_for_event(common::EventId::new(), UserId::new())
        .await;
    assert!(matches!(
        result,
        Err(DomainError::NotFound { entity: "event", .. })
    ));
}
