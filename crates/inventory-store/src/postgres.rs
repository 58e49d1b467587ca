use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use common::{Channel, HotelId, ReservationId, RoomId};
use domain::{
    CancellationToken, ChannelSourcedFields, ExternalBookingRef, GuestDetails, Hotel, Money,
    NewReservation, Reservation, ReservationStatus, Room, StayDates,
};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{InventoryStore, Result, StoreError};

const RESERVATION_COLUMNS: &str = "id, hotel_id, room_id, guest_name, guest_email, guest_phone, \
     guest_city, guest_address, arrival_date, departure_date, adults, children, \
     total_price_minor, notes, check_in_notes, cancellation_token, payment_status, \
     room_status, external_channel, external_booking_id, created_at, updated_at";

const CAPACITY_EXCEEDED: &str = "RB001";
const ROOM_NOT_FOUND: &str = "RB002";
const UNIQUE_EXTERNAL_BOOKING: &str = "unique_external_booking";

/// PostgreSQL-backed inventory store implementation.
#[derive(Clone)]
pub struct PostgresInventoryStore {
    pool: PgPool,
}

impl PostgresInventoryStore {
    /// Creates a new PostgreSQL inventory store.
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

    fn row_to_reservation(row: PgRow) -> Result<Reservation> {
        let arrival: NaiveDate = row.try_get("arrival_date")?;
        let departure: NaiveDate = row.try_get("departure_date")?;
        let stay = StayDates::new(arrival, departure).map_err(|e| corrupt(&row, e))?;

        let status: String = row.try_get("room_status")?;
        let payment: String = row.try_get("payment_status")?;
        let channel: Option<String> = row.try_get("external_channel")?;
        let booking_id: Option<String> = row.try_get("external_booking_id")?;
        let external = match (channel, booking_id) {
            (Some(channel), Some(booking_id)) => {
                let channel: Channel = channel.parse().map_err(|e| corrupt(&row, e))?;
                Some(ExternalBookingRef::new(channel, booking_id))
            }
            _ => None,
        };

        Ok(Reservation {
            id: ReservationId::from_uuid(row.try_get::<Uuid, _>("id")?),
            hotel_id: HotelId::new(row.try_get("hotel_id")?),
            room_id: RoomId::new(row.try_get("room_id")?),
            guest: GuestDetails {
                name: row.try_get("guest_name")?,
                email: row.try_get("guest_email")?,
                phone: row.try_get("guest_phone")?,
                city: row.try_get("guest_city")?,
                address: row.try_get("guest_address")?,
            },
            stay,
            adults: non_negative(row.try_get("adults")?),
            children: non_negative(row.try_get("children")?),
            total_price: Money::from_minor(row.try_get("total_price_minor")?),
            notes: row.try_get("notes")?,
            check_in_notes: row.try_get("check_in_notes")?,
            cancellation_token: row
                .try_get::<Option<String>, _>("cancellation_token")?
                .map(CancellationToken::from_stored),
            payment_status: payment.parse().map_err(|e| corrupt(&row, e))?,
            status: status.parse().map_err(|e| corrupt(&row, e))?,
            external,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_room(row: PgRow) -> Result<Room> {
        Ok(Room {
            id: RoomId::new(row.try_get("id")?),
            hotel_id: HotelId::new(row.try_get("hotel_id")?),
            name: row.try_get("name")?,
            quantity: non_negative(row.try_get("quantity")?),
            nightly_rate: Money::from_minor(row.try_get("nightly_rate_minor")?),
        })
    }

    async fn fetch_one_where(&self, clause: &str, id: Uuid) -> Result<Option<Reservation>> {
        let sql = format!("SELECT {RESERVATION_COLUMNS} FROM reservations WHERE {clause}");
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        row.map(Self::row_to_reservation).transpose()
    }

    /// Resolves a compare-and-set miss into the precise error.
    async fn stale_or_missing(
        &self,
        id: ReservationId,
        expected: ReservationStatus,
    ) -> StoreError {
        match self.get_reservation(id).await {
            Ok(Some(current)) => StoreError::StaleStatus {
                id,
                expected,
                actual: current.status,
            },
            Ok(None) => StoreError::ReservationNotFound(id),
            Err(e) => e,
        }
    }
}

fn corrupt(row: &PgRow, err: impl std::fmt::Display) -> StoreError {
    let id = row
        .try_get::<Uuid, _>("id")
        .map(|id| id.to_string())
        .unwrap_or_else(|_| "<unknown>".to_string());
    StoreError::Corrupt(format!("reservation {id}: {err}"))
}

fn non_negative(value: i32) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

fn db_code(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().map(|c| c.into_owned()),
        _ => None,
    }
}

fn is_unique_external_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.constraint() == Some(UNIQUE_EXTERNAL_BOOKING))
}

#[async_trait]
impl InventoryStore for PostgresInventoryStore {
    async fn get_hotel(&self, id: HotelId) -> Result<Option<Hotel>> {
        let row = sqlx::query("SELECT id, name, contact_email FROM hotels WHERE id = $1")
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| {
            Ok(Hotel {
                id: HotelId::new(row.try_get("id")?),
                name: row.try_get("name")?,
                contact_email: row.try_get("contact_email")?,
            })
        })
        .transpose()
    }

    async fn get_room(&self, id: RoomId) -> Result<Option<Room>> {
        let row = sqlx::query(
            "SELECT id, hotel_id, name, quantity, nightly_rate_minor FROM rooms WHERE id = $1",
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_room).transpose()
    }

    async fn save_hotel(&self, hotel: Hotel) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO hotels (id, name, contact_email)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, contact_email = EXCLUDED.contact_email
            "#,
        )
        .bind(hotel.id.as_i64())
        .bind(&hotel.name)
        .bind(&hotel.contact_email)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn save_room(&self, room: Room) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO rooms (id, hotel_id, name, quantity, nightly_rate_minor)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE SET
                hotel_id = EXCLUDED.hotel_id,
                name = EXCLUDED.name,
                quantity = EXCLUDED.quantity,
                nightly_rate_minor = EXCLUDED.nightly_rate_minor
            "#,
        )
        .bind(room.id.as_i64())
        .bind(room.hotel_id.as_i64())
        .bind(&room.name)
        .bind(room.quantity as i32)
        .bind(room.nightly_rate.minor())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self, reservation), fields(room_id = %reservation.room_id))]
    async fn create_direct_booking(&self, reservation: NewReservation) -> Result<Reservation> {
        let created_at: DateTime<Utc> = sqlx::query_scalar(
            "SELECT create_direct_reservation($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)",
        )
        .bind(reservation.id.as_uuid())
        .bind(reservation.hotel_id.as_i64())
        .bind(reservation.room_id.as_i64())
        .bind(&reservation.guest.name)
        .bind(&reservation.guest.email)
        .bind(&reservation.guest.phone)
        .bind(&reservation.guest.city)
        .bind(&reservation.guest.address)
        .bind(reservation.stay.arrival())
        .bind(reservation.stay.departure())
        .bind(reservation.adults as i32)
        .bind(reservation.children as i32)
        .bind(reservation.total_price.minor())
        .bind(&reservation.notes)
        .bind(&reservation.check_in_notes)
        .bind(reservation.cancellation_token.as_ref().map(|t| t.as_str()))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match db_code(&e).as_deref() {
            Some(CAPACITY_EXCEEDED) => StoreError::CapacityExceeded {
                room_id: reservation.room_id,
                arrival: reservation.stay.arrival(),
                departure: reservation.stay.departure(),
            },
            Some(ROOM_NOT_FOUND) => StoreError::RoomNotFound {
                room_id: reservation.room_id,
                hotel_id: reservation.hotel_id,
            },
            _ => StoreError::Database(e),
        })?;

        Ok(reservation.into_reservation(created_at))
    }

    async fn insert_external(&self, reservation: NewReservation) -> Result<Reservation> {
        let (channel, booking_id) = match &reservation.external {
            Some(external) => (Some(external.channel.as_str()), Some(external.booking_id.as_str())),
            None => (None, None),
        };

        let sql = format!(
            r#"
            INSERT INTO reservations (
                id, hotel_id, room_id, guest_name, guest_email, guest_phone, guest_city,
                guest_address, arrival_date, departure_date, adults, children,
                total_price_minor, notes, check_in_notes, cancellation_token,
                payment_status, room_status, external_channel, external_booking_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
            RETURNING {RESERVATION_COLUMNS}
            "#
        );

        let row = sqlx::query(&sql)
            .bind(reservation.id.as_uuid())
            .bind(reservation.hotel_id.as_i64())
            .bind(reservation.room_id.as_i64())
            .bind(&reservation.guest.name)
            .bind(&reservation.guest.email)
            .bind(&reservation.guest.phone)
            .bind(&reservation.guest.city)
            .bind(&reservation.guest.address)
            .bind(reservation.stay.arrival())
            .bind(reservation.stay.departure())
            .bind(reservation.adults as i32)
            .bind(reservation.children as i32)
            .bind(reservation.total_price.minor())
            .bind(&reservation.notes)
            .bind(&reservation.check_in_notes)
            .bind(reservation.cancellation_token.as_ref().map(|t| t.as_str()))
            .bind(reservation.payment_status.as_str())
            .bind(reservation.status.as_str())
            .bind(channel)
            .bind(booking_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_external_violation(&e)
                    && let Some(external) = &reservation.external
                {
                    return StoreError::DuplicateExternalBooking(external.clone());
                }
                StoreError::Database(e)
            })?;

        Self::row_to_reservation(row)
    }

    async fn find_by_external(
        &self,
        external: &ExternalBookingRef,
    ) -> Result<Option<Reservation>> {
        let sql = format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations \
             WHERE external_channel = $1 AND external_booking_id = $2"
        );
        let row = sqlx::query(&sql)
            .bind(external.channel.as_str())
            .bind(&external.booking_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_reservation).transpose()
    }

    async fn overwrite_external(
        &self,
        id: ReservationId,
        expected: ReservationStatus,
        fields: ChannelSourcedFields,
        status: ReservationStatus,
    ) -> Result<Reservation> {
        let sql = format!(
            r#"
            UPDATE reservations SET
                hotel_id = $3, room_id = $4, guest_name = $5, guest_email = $6,
                guest_phone = $7, guest_city = $8, guest_address = $9,
                arrival_date = $10, departure_date = $11, adults = $12, children = $13,
                total_price_minor = $14, check_in_notes = $15, room_status = $16,
                updated_at = NOW()
            WHERE id = $1 AND room_status = $2
            RETURNING {RESERVATION_COLUMNS}
            "#
        );

        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .bind(expected.as_str())
            .bind(fields.hotel_id.as_i64())
            .bind(fields.room_id.as_i64())
            .bind(&fields.guest.name)
            .bind(&fields.guest.email)
            .bind(&fields.guest.phone)
            .bind(&fields.guest.city)
            .bind(&fields.guest.address)
            .bind(fields.stay.arrival())
            .bind(fields.stay.departure())
            .bind(fields.adults as i32)
            .bind(fields.children as i32)
            .bind(fields.total_price.minor())
            .bind(&fields.check_in_notes)
            .bind(status.as_str())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Self::row_to_reservation(row),
            None => Err(self.stale_or_missing(id, expected).await),
        }
    }

    async fn get_reservation(&self, id: ReservationId) -> Result<Option<Reservation>> {
        self.fetch_one_where("id = $1", id.as_uuid()).await
    }

    async fn find_by_token(&self, token: &CancellationToken) -> Result<Option<Reservation>> {
        let sql =
            format!("SELECT {RESERVATION_COLUMNS} FROM reservations WHERE cancellation_token = $1");
        let row = sqlx::query(&sql)
            .bind(token.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_reservation).transpose()
    }

    async fn list_active_by_email(
        &self,
        email: &str,
        today: NaiveDate,
    ) -> Result<Vec<Reservation>> {
        let sql = format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations \
             WHERE LOWER(guest_email) = LOWER($1) AND departure_date >= $2 \
             ORDER BY arrival_date ASC, created_at ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(email)
            .bind(today)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::row_to_reservation).collect()
    }

    async fn update_status(
        &self,
        id: ReservationId,
        expected: ReservationStatus,
        to: ReservationStatus,
    ) -> Result<Reservation> {
        let sql = format!(
            "UPDATE reservations SET room_status = $3, updated_at = NOW() \
             WHERE id = $1 AND room_status = $2 \
             RETURNING {RESERVATION_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .bind(expected.as_str())
            .bind(to.as_str())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Self::row_to_reservation(row),
            None => Err(self.stale_or_missing(id, expected).await),
        }
    }

    async fn attach_external_ref(
        &self,
        id: ReservationId,
        external: ExternalBookingRef,
    ) -> Result<Reservation> {
        let sql = format!(
            "UPDATE reservations SET external_channel = $2, external_booking_id = $3, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {RESERVATION_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .bind(external.channel.as_str())
            .bind(&external.booking_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_external_violation(&e) {
                    return StoreError::DuplicateExternalBooking(external.clone());
                }
                StoreError::Database(e)
            })?;

        match row {
            Some(row) => Self::row_to_reservation(row),
            None => Err(StoreError::ReservationNotFound(id)),
        }
    }

    async fn count_occupying(&self, room_id: RoomId, night: NaiveDate) -> Result<u32> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM reservations
            WHERE room_id = $1
              AND room_status IN ('pending', 'confirmed', 'checked_in')
              AND arrival_date <= $2
              AND departure_date > $2
            "#,
        )
        .bind(room_id.as_i64())
        .bind(night)
        .fetch_one(&self.pool)
        .await?;

        Ok(count as u32)
    }
}
