use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{
    AddressId, BookingId, CategoryId, EventId, Money, ParticipantType, TicketType, UserId,
};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use uuid::Uuid;

use crate::{
    Address, AddressSource, AttendeeBookingRow, Booking, Category, CreatedEvent, Event,
    EventAttendeeRow, EventChanges, EventDraft, EventOrder, EventQuery, EventRow, NewAddress,
    NewBooking, NewCategory, Profile, ReserveOutcome, Result, StoreError,
    store::RegistrationStore,
};

const EVENT_COLUMNS: &str = "e.event_id, e.event_name, e.description, e.agenda, e.image_url, \
     e.start_time, e.end_time, e.landmark, e.ticket_type, e.ticket_fare_cents, e.total_tickets, \
     e.participant_type, e.participant_count, e.category_id, e.address_id, e.creator_id, \
     e.created_at, e.updated_at";

const ROW_JOINS: &str = "a.full_address, a.latitude, a.longitude, a.created_at AS address_created_at, \
     c.category_name, \
     (SELECT COUNT(*) FROM event_bookings b WHERE b.event_id = e.event_id AND b.booking_status) \
     AS confirmed_bookings \
     FROM events e \
     JOIN event_addresses a ON a.address_id = e.address_id \
     JOIN event_categories c ON c.category_id = e.category_id";

const BOOKING_COLUMNS: &str =
    "booking_id, event_id, attendee_id, booking_status, registered_at, scanned_at";

/// PostgreSQL-backed registration store.
///
/// Capacity is enforced by locking the event row for the duration of the
/// booking transaction; duplicates are additionally rejected by the
/// `uq_event_attendee` constraint.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL registration store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_category(row: PgRow) -> Result<Category> {
        Ok(Category {
            category_id: CategoryId::new(row.try_get("category_id")?),
            name: row.try_get("category_name")?,
            image_url: row.try_get("image_url")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_address(row: &PgRow) -> Result<Address> {
        Ok(Address {
            address_id: AddressId::new(row.try_get("address_id")?),
            full_address: row.try_get("full_address")?,
            latitude: row.try_get("latitude")?,
            longitude: row.try_get("longitude")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_event(row: &PgRow) -> Result<Event> {
        let ticket_type: String = row.try_get("ticket_type")?;
        let participant_type: String = row.try_get("participant_type")?;
        let fare: Option<i64> = row.try_get("ticket_fare_cents")?;

        Ok(Event {
            event_id: EventId::from_uuid(row.try_get::<Uuid, _>("event_id")?),
            name: row.try_get("event_name")?,
            description: row.try_get("description")?,
            agenda: row.try_get("agenda")?,
            image_url: row.try_get("image_url")?,
            start_time: row.try_get("start_time")?,
            end_time: row.try_get("end_time")?,
            landmark: row.try_get("landmark")?,
            ticket_type: ticket_type
                .parse::<TicketType>()
                .map_err(|e| StoreError::CorruptRow(e.to_string()))?,
            ticket_fare: fare.map(Money::from_cents),
            total_tickets: to_u32(row.try_get("total_tickets")?, "total_tickets")?,
            participant_type: participant_type
                .parse::<ParticipantType>()
                .map_err(|e| StoreError::CorruptRow(e.to_string()))?,
            participant_count: to_u32(row.try_get("participant_count")?, "participant_count")?,
            category_id: CategoryId::new(row.try_get("category_id")?),
            address_id: AddressId::new(row.try_get("address_id")?),
            creator_id: UserId::from_uuid(row.try_get::<Uuid, _>("creator_id")?),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_event_row(row: PgRow) -> Result<EventRow> {
        let event = Self::row_to_event(&row)?;
        let confirmed: i64 = row.try_get("confirmed_bookings")?;

        Ok(EventRow {
            address: Address {
                address_id: event.address_id,
                full_address: row.try_get("full_address")?,
                latitude: row.try_get("latitude")?,
                longitude: row.try_get("longitude")?,
                created_at: row.try_get("address_created_at")?,
            },
            category_name: row.try_get("category_name")?,
            confirmed_bookings: u64::try_from(confirmed).unwrap_or_default(),
            event,
        })
    }

    fn row_to_booking(row: PgRow) -> Result<Booking> {
        Ok(Booking {
            booking_id: BookingId::from_uuid(row.try_get::<Uuid, _>("booking_id")?),
            event_id: EventId::from_uuid(row.try_get::<Uuid, _>("event_id")?),
            attendee_id: UserId::from_uuid(row.try_get::<Uuid, _>("attendee_id")?),
            booking_status: row.try_get("booking_status")?,
            registered_at: row.try_get("registered_at")?,
            scanned_at: row.try_get("scanned_at")?,
        })
    }

    /// Inserts a geocoded address inside `tx`, or reads back the row a
    /// concurrent writer stored under the same normalized string.
    async fn upsert_address(
        tx: &mut Transaction<'static, Postgres>,
        address: &NewAddress,
    ) -> Result<Address> {
        let inserted: Option<PgRow> = sqlx::query(
            r#"
            INSERT INTO event_addresses (full_address, latitude, longitude)
            VALUES ($1, $2, $3)
            ON CONFLICT (full_address) DO NOTHING
            RETURNING address_id, full_address, latitude, longitude, created_at
            "#,
        )
        .bind(&address.full_address)
        .bind(address.latitude)
        .bind(address.longitude)
        .fetch_optional(&mut **tx)
        .await
        .map_err(StoreError::from_sqlx)?;

        let row = match inserted {
            Some(row) => row,
            None => {
                sqlx::query(
                    r#"
                    SELECT address_id, full_address, latitude, longitude, created_at
                    FROM event_addresses
                    WHERE full_address = $1
                    "#,
                )
                .bind(&address.full_address)
                .fetch_one(&mut **tx)
                .await?
            }
        };

        Self::row_to_address(&row)
    }
}

fn to_u32(value: i32, column: &str) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| StoreError::CorruptRow(format!("negative {column}: {value}")))
}

fn to_i32(value: u32, column: &str) -> Result<i32> {
    i32::try_from(value)
        .map_err(|_| StoreError::CorruptRow(format!("{column} out of range: {value}")))
}

#[async_trait]
impl RegistrationStore for PostgresStore {
    async fn get_profile(&self, user_id: UserId) -> Result<Option<Profile>> {
        let row: Option<PgRow> = sqlx::query(
            "SELECT user_id, first_name, last_name, merchant_id FROM profiles WHERE user_id = $1",
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(Profile {
                user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
                first_name: row.try_get("first_name")?,
                last_name: row.try_get("last_name")?,
                merchant_id: row.try_get("merchant_id")?,
            })),
            None => Ok(None),
        }
    }

    async fn save_profile(&self, profile: Profile) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO profiles (user_id, first_name, last_name, merchant_id)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO UPDATE SET
                first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                merchant_id = EXCLUDED.merchant_id,
                updated_at = NOW()
            "#,
        )
        .bind(profile.user_id.as_uuid())
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .bind(&profile.merchant_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn create_categories(&self, categories: Vec<NewCategory>) -> Result<Vec<Category>> {
        let mut tx = self.pool.begin().await?;
        let mut created = Vec::with_capacity(categories.len());

        for category in &categories {
            let row = sqlx::query(
                r#"
                INSERT INTO event_categories (category_name, image_url)
                VALUES ($1, $2)
                RETURNING category_id, category_name, image_url, created_at
                "#,
            )
            .bind(&category.name)
            .bind(&category.image_url)
            .fetch_one(&mut *tx)
            .await
            .map_err(StoreError::from_sqlx)?;

            created.push(Self::row_to_category(row)?);
        }

        tx.commit().await?;
        Ok(created)
    }

    async fn get_category(&self, category_id: CategoryId) -> Result<Option<Category>> {
        let row: Option<PgRow> = sqlx::query(
            r#"
            SELECT category_id, category_name, image_url, created_at
            FROM event_categories
            WHERE category_id = $1
            "#,
        )
        .bind(category_id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_category).transpose()
    }

    async fn get_category_by_name(&self, name: &str) -> Result<Option<Category>> {
        let row: Option<PgRow> = sqlx::query(
            r#"
            SELECT category_id, category_name, image_url, created_at
            FROM event_categories
            WHERE category_name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_category).transpose()
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        let rows = sqlx::query(
            r#"
            SELECT category_id, category_name, image_url, created_at
            FROM event_categories
            ORDER BY category_id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_category).collect()
    }

    async fn find_address(&self, full_address: &str) -> Result<Option<Address>> {
        let row: Option<PgRow> = sqlx::query(
            r#"
            SELECT address_id, full_address, latitude, longitude, created_at
            FROM event_addresses
            WHERE full_address = $1
            "#,
        )
        .bind(full_address)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_address).transpose()
    }

    async fn insert_address(&self, address: NewAddress) -> Result<Address> {
        let mut tx = self.pool.begin().await?;
        let stored = Self::upsert_address(&mut tx, &address).await?;
        tx.commit().await?;
        Ok(stored)
    }

    #[tracing::instrument(skip(self, draft), fields(event_id = %draft.event.event_id))]
    async fn create_event(&self, draft: EventDraft) -> Result<CreatedEvent> {
        let EventDraft {
            event,
            address,
            creator_booking,
        } = draft;

        let mut tx = self.pool.begin().await?;

        let address = match address {
            AddressSource::Existing(existing) => existing,
            AddressSource::Geocoded(new_address) => {
                Self::upsert_address(&mut tx, &new_address).await?
            }
        };

        sqlx::query(
            r#"
            INSERT INTO events (
                event_id, event_name, description, agenda, image_url, start_time, end_time,
                landmark, ticket_type, ticket_fare_cents, total_tickets, participant_type,
                participant_count, category_id, address_id, creator_id, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $17)
            "#,
        )
        .bind(event.event_id.as_uuid())
        .bind(&event.name)
        .bind(&event.description)
        .bind(&event.agenda)
        .bind(&event.image_url)
        .bind(event.start_time)
        .bind(event.end_time)
        .bind(&event.landmark)
        .bind(event.ticket_type.as_str())
        .bind(event.ticket_fare.map(|fare| fare.cents()))
        .bind(to_i32(event.total_tickets, "total_tickets")?)
        .bind(event.participant_type.as_str())
        .bind(to_i32(event.participant_count, "participant_count")?)
        .bind(event.category_id.as_i64())
        .bind(address.address_id.as_i64())
        .bind(event.creator_id.as_uuid())
        .bind(event.created_at)
        .execute(&mut *tx)
        .await
        .map_err(StoreError::from_sqlx)?;

        sqlx::query(
            r#"
            INSERT INTO event_bookings (booking_id, event_id, attendee_id, booking_status, registered_at)
            VALUES ($1, $2, $3, TRUE, $4)
            "#,
        )
        .bind(creator_booking.booking_id.as_uuid())
        .bind(creator_booking.event_id.as_uuid())
        .bind(creator_booking.attendee_id.as_uuid())
        .bind(creator_booking.registered_at)
        .execute(&mut *tx)
        .await
        .map_err(StoreError::from_sqlx)?;

        tx.commit().await?;

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

        Ok(CreatedEvent {
            event: stored,
            address,
            creator_booking: Booking {
                booking_id: creator_booking.booking_id,
                event_id: creator_booking.event_id,
                attendee_id: creator_booking.attendee_id,
                booking_status: true,
                registered_at: creator_booking.registered_at,
                scanned_at: None,
            },
        })
    }

    async fn get_event(&self, event_id: EventId) -> Result<Option<Event>> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM events e WHERE e.event_id = $1");
        let row: Option<PgRow> = sqlx::query(&sql)
            .bind(event_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_event).transpose()
    }

    async fn get_event_row(&self, event_id: EventId) -> Result<Option<EventRow>> {
        let sql = format!("SELECT {EVENT_COLUMNS}, {ROW_JOINS} WHERE e.event_id = $1");
        let row: Option<PgRow> = sqlx::query(&sql)
            .bind(event_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_event_row).transpose()
    }

    async fn update_event(
        &self,
        event_id: EventId,
        changes: EventChanges,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Event>> {
        let sql = format!(
            r#"
            UPDATE events AS e SET
                event_name = COALESCE($2, e.event_name),
                description = COALESCE($3, e.description),
                agenda = COALESCE($4, e.agenda),
                image_url = COALESCE($5, e.image_url),
                updated_at = $6
            WHERE e.event_id = $1
            RETURNING {EVENT_COLUMNS}
            "#
        );
        let row: Option<PgRow> = sqlx::query(&sql)
            .bind(event_id.as_uuid())
            .bind(changes.name)
            .bind(changes.description)
            .bind(changes.agenda)
            .bind(changes.image_url)
            .bind(updated_at)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_event).transpose()
    }

    async fn query_events(&self, query: EventQuery) -> Result<Vec<EventRow>> {
        let mut sql = format!("SELECT {EVENT_COLUMNS}, {ROW_JOINS} WHERE 1=1");
        let mut param_count = 0;

        // Build dynamic query
        if query.starts_after.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND e.start_time > ${param_count}"));
        }
        if query.creator_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND e.creator_id = ${param_count}"));
        }
        if query.category_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND e.category_id = ${param_count}"));
        }

        sql.push_str(match query.order {
            EventOrder::Created => " ORDER BY e.created_at ASC, e.event_id ASC",
            EventOrder::StartTimeAscending => " ORDER BY e.start_time ASC, e.event_id ASC",
            EventOrder::StartTimeDescending => " ORDER BY e.start_time DESC, e.event_id ASC",
        });

        if query.limit.is_some() {
            param_count += 1;
            sql.push_str(&format!(" LIMIT ${param_count}"));
        }
        if query.offset.is_some() {
            param_count += 1;
            sql.push_str(&format!(" OFFSET ${param_count}"));
        }

        let mut sqlx_query = sqlx::query(&sql);

        if let Some(after) = query.starts_after {
            sqlx_query = sqlx_query.bind(after);
        }
        if let Some(creator) = query.creator_id {
            sqlx_query = sqlx_query.bind(creator.as_uuid());
        }
        if let Some(category) = query.category_id {
            sqlx_query = sqlx_query.bind(category.as_i64());
        }
        if let Some(limit) = query.limit {
            sqlx_query = sqlx_query.bind(limit as i64);
        }
        if let Some(offset) = query.offset {
            sqlx_query = sqlx_query.bind(offset as i64);
        }

        let rows = sqlx_query.fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_event_row).collect()
    }

    async fn get_booking(
        &self,
        event_id: EventId,
        attendee_id: UserId,
    ) -> Result<Option<Booking>> {
        let sql = format!(
            "SELECT {BOOKING_COLUMNS} FROM event_bookings WHERE event_id = $1 AND attendee_id = $2"
        );
        let row: Option<PgRow> = sqlx::query(&sql)
            .bind(event_id.as_uuid())
            .bind(attendee_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_booking).transpose()
    }

    async fn count_confirmed_bookings(&self, event_id: EventId) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM event_bookings WHERE event_id = $1 AND booking_status",
        )
        .bind(event_id.as_uuid())
        .fetch_one(&self.pool)
        .await?;

        Ok(u64::try_from(count).unwrap_or_default())
    }

    #[tracing::instrument(skip(self, booking), fields(event_id = %booking.event_id, attendee_id = %booking.attendee_id))]
    async fn reserve_booking(&self, booking: NewBooking) -> Result<ReserveOutcome> {
        let mut tx = self.pool.begin().await?;

        // Serializes every booking attempt on the same event
        let total: Option<i32> =
            sqlx::query_scalar("SELECT total_tickets FROM events WHERE event_id = $1 FOR UPDATE")
                .bind(booking.event_id.as_uuid())
                .fetch_optional(&mut *tx)
                .await?;

        let Some(total) = total else {
            tracing::debug!("booking target vanished");
            return Ok(ReserveOutcome::EventMissing);
        };

        let confirmed: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM event_bookings WHERE event_id = $1 AND booking_status",
        )
        .bind(booking.event_id.as_uuid())
        .fetch_one(&mut *tx)
        .await?;

        if confirmed >= i64::from(total) {
            return Ok(ReserveOutcome::SoldOut);
        }

        let sql = format!(
            "SELECT {BOOKING_COLUMNS} FROM event_bookings WHERE event_id = $1 AND attendee_id = $2"
        );
        let existing: Option<PgRow> = sqlx::query(&sql)
            .bind(booking.event_id.as_uuid())
            .bind(booking.attendee_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await?;

        if let Some(row) = existing {
            return Ok(ReserveOutcome::AlreadyBooked(Self::row_to_booking(row)?));
        }

        let sql = format!(
            r#"
            INSERT INTO event_bookings (booking_id, event_id, attendee_id, booking_status, registered_at)
            VALUES ($1, $2, $3, TRUE, $4)
            RETURNING {BOOKING_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(booking.booking_id.as_uuid())
            .bind(booking.event_id.as_uuid())
            .bind(booking.attendee_id.as_uuid())
            .bind(booking.registered_at)
            .fetch_one(&mut *tx)
            .await
            .map_err(StoreError::from_sqlx)?;

        tx.commit().await?;
        Ok(ReserveOutcome::Reserved(Self::row_to_booking(row)?))
    }

    async fn attendee_bookings(
        &self,
        attendee_id: UserId,
        event_ids: Option<&[EventId]>,
    ) -> Result<Vec<AttendeeBookingRow>> {
        let event_ids: Option<Vec<Uuid>> =
            event_ids.map(|ids| ids.iter().map(EventId::as_uuid).collect());

        let rows = sqlx::query(
            r#"
            SELECT b.booking_id, b.event_id, e.event_name, e.image_url, e.start_time, e.end_time,
                   e.ticket_type, e.ticket_fare_cents, b.registered_at
            FROM event_bookings b
            JOIN events e ON e.event_id = b.event_id
            WHERE b.attendee_id = $1
              AND b.booking_status
              AND ($2::uuid[] IS NULL OR b.event_id = ANY($2))
            ORDER BY b.registered_at ASC
            "#,
        )
        .bind(attendee_id.as_uuid())
        .bind(event_ids)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let ticket_type: String = row.try_get("ticket_type")?;
                let fare: Option<i64> = row.try_get("ticket_fare_cents")?;
                Ok(AttendeeBookingRow {
                    booking_id: BookingId::from_uuid(row.try_get::<Uuid, _>("booking_id")?),
                    event_id: EventId::from_uuid(row.try_get::<Uuid, _>("event_id")?),
                    event_name: row.try_get("event_name")?,
                    image_url: row.try_get("image_url")?,
                    start_time: row.try_get("start_time")?,
                    end_time: row.try_get("end_time")?,
                    ticket_type: ticket_type
                        .parse::<TicketType>()
                        .map_err(|e| StoreError::CorruptRow(e.to_string()))?,
                    ticket_fare: fare.map(Money::from_cents),
                    registered_at: row.try_get("registered_at")?,
                })
            })
            .collect()
    }

    async fn event_attendees(&self, event_id: EventId) -> Result<Vec<EventAttendeeRow>> {
        let rows = sqlx::query(
            r#"
            SELECT b.booking_id, b.attendee_id, p.first_name, p.last_name, b.registered_at
            FROM event_bookings b
            LEFT JOIN profiles p ON p.user_id = b.attendee_id
            WHERE b.event_id = $1 AND b.booking_status
            ORDER BY b.registered_at ASC
            "#,
        )
        .bind(event_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(EventAttendeeRow {
                    booking_id: BookingId::from_uuid(row.try_get::<Uuid, _>("booking_id")?),
                    attendee_id: UserId::from_uuid(row.try_get::<Uuid, _>("attendee_id")?),
                    first_name: row.try_get("first_name")?,
                    last_name: row.try_get("last_name")?,
                    registered_at: row.try_get("registered_at")?,
                })
            })
            .collect()
    }
}
