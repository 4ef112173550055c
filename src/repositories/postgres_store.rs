//! Almacén PostgreSQL
//!
//! Cada operación de escritura abre su propia transacción. Los invariantes
//! que dependen de lecturas previas se protegen con bloqueo de fila
//! (`FOR UPDATE`) o con el índice único parcial `trips_one_active_per_driver`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgConnection, PgPool};
use tracing::debug;
use uuid::Uuid;

use super::{FleetStore, Page, StoreError, TripCompletion};
use crate::models::{
    Defect, EndSnapshot, Location, MileageEntry, OdometerReading, ReconcileOutcome, StartSnapshot, Trip, TripStatus,
    Vehicle,
};

const UNIQUE_VIOLATION: &str = "23505";

/// Fila de la tabla trips
#[derive(Debug, FromRow)]
struct TripRow {
    id: Uuid,
    tenant_id: Uuid,
    vehicle_id: Uuid,
    driver_id: Uuid,
    status: TripStatus,
    start_odometer: i64,
    start_fuel_level: i32,
    start_photos: Vec<String>,
    start_defects: Json<Vec<Defect>>,
    start_notes: Option<String>,
    start_location: Option<Json<Location>>,
    started_at: DateTime<Utc>,
    end_odometer: Option<i64>,
    end_fuel_level: Option<i32>,
    end_photos: Vec<String>,
    end_defects: Json<Vec<Defect>>,
    end_notes: Option<String>,
    end_location: Option<Json<Location>>,
    ended_at: Option<DateTime<Utc>>,
    distance_traveled: Option<i64>,
    duration_minutes: Option<i64>,
    cancelled_at: Option<DateTime<Utc>>,
    cancel_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TripRow> for Trip {
    fn from(row: TripRow) -> Self {
        let end = match (
            row.end_odometer,
            row.end_fuel_level,
            row.ended_at,
            row.distance_traveled,
            row.duration_minutes,
        ) {
            (Some(odometer), Some(fuel_level), Some(ended_at), Some(distance_traveled), Some(duration_minutes)) => {
                Some(EndSnapshot {
                    odometer,
                    fuel_level,
                    photos: row.end_photos,
                    defects: row.end_defects.0,
                    notes: row.end_notes,
                    location: row.end_location.map(|l| l.0),
                    ended_at,
                    distance_traveled,
                    duration_minutes,
                })
            }
            _ => None,
        };

        Trip {
            id: row.id,
            tenant_id: row.tenant_id,
            vehicle_id: row.vehicle_id,
            driver_id: row.driver_id,
            status: row.status,
            start: StartSnapshot {
                odometer: row.start_odometer,
                fuel_level: row.start_fuel_level,
                photos: row.start_photos,
                defects: row.start_defects.0,
                notes: row.start_notes,
                location: row.start_location.map(|l| l.0),
                started_at: row.started_at,
            },
            end,
            cancelled_at: row.cancelled_at,
            cancel_reason: row.cancel_reason,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

pub struct PgFleetStore {
    pool: PgPool,
}

impl PgFleetStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_insert_error(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.code().as_deref() == Some(UNIQUE_VIOLATION) {
            return StoreError::ActiveTripExists;
        }
    }
    StoreError::Database(e)
}

/// Bloquea el viaje y exige que siga en curso y pertenezca al conductor
async fn lock_active_trip(
    conn: &mut PgConnection,
    trip_id: Uuid,
    driver_id: Uuid,
    tenant_id: Uuid,
) -> Result<Trip, StoreError> {
    let row = sqlx::query_as::<_, TripRow>(
        "SELECT * FROM trips WHERE id = $1 AND driver_id = $2 AND tenant_id = $3 FOR UPDATE",
    )
    .bind(trip_id)
    .bind(driver_id)
    .bind(tenant_id)
    .fetch_optional(&mut *conn)
    .await?;

    match row.map(Trip::from) {
        Some(trip) if trip.is_in_progress() => Ok(trip),
        _ => Err(StoreError::TripNotActive(trip_id)),
    }
}

/// Entrada del libro + proyección del odómetro, dentro de la transacción del llamador
async fn append_entry(conn: &mut PgConnection, reading: &OdometerReading) -> Result<MileageEntry, StoreError> {
    let previous: Option<i64> = sqlx::query_scalar(
        "SELECT current_odometer FROM vehicles WHERE id = $1 AND tenant_id = $2 FOR UPDATE",
    )
    .bind(reading.vehicle_id)
    .bind(reading.tenant_id)
    .fetch_optional(&mut *conn)
    .await?;
    let previous = previous.ok_or(StoreError::VehicleNotFound(reading.vehicle_id))?;

    reading.guard.check(previous, reading.mileage)?;

    let entry = MileageEntry::record(reading, previous, Utc::now());

    sqlx::query(
        r#"
        INSERT INTO mileage_entries (id, tenant_id, vehicle_id, mileage, previous_mileage, difference, source, notes, recorded_by, recorded_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#,
    )
    .bind(entry.id)
    .bind(entry.tenant_id)
    .bind(entry.vehicle_id)
    .bind(entry.mileage)
    .bind(entry.previous_mileage)
    .bind(entry.difference)
    .bind(entry.source)
    .bind(entry.notes.clone())
    .bind(entry.recorded_by)
    .bind(entry.recorded_at)
    .execute(&mut *conn)
    .await?;

    // Ambas columnas salen del mismo parámetro
    sqlx::query("UPDATE vehicles SET current_odometer = $2, mileage = $2, updated_at = $3 WHERE id = $1")
        .bind(reading.vehicle_id)
        .bind(reading.mileage)
        .bind(entry.recorded_at)
        .execute(&mut *conn)
        .await?;

    debug!(
        vehicle_id = %entry.vehicle_id,
        previous = entry.previous_mileage,
        mileage = entry.mileage,
        "📒 Entrada de kilometraje registrada"
    );

    Ok(entry)
}

#[async_trait]
impl FleetStore for PgFleetStore {
    async fn find_vehicle(&self, vehicle_id: Uuid, tenant_id: Uuid) -> Result<Option<Vehicle>, StoreError> {
        let vehicle = sqlx::query_as::<_, Vehicle>("SELECT * FROM vehicles WHERE id = $1 AND tenant_id = $2")
            .bind(vehicle_id)
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(vehicle)
    }

    async fn find_trip(&self, trip_id: Uuid, tenant_id: Uuid) -> Result<Option<Trip>, StoreError> {
        let row = sqlx::query_as::<_, TripRow>("SELECT * FROM trips WHERE id = $1 AND tenant_id = $2")
            .bind(trip_id)
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Trip::from))
    }

    async fn find_active_trip(&self, driver_id: Uuid, tenant_id: Uuid) -> Result<Option<Trip>, StoreError> {
        let row = sqlx::query_as::<_, TripRow>(
            "SELECT * FROM trips WHERE driver_id = $1 AND tenant_id = $2 AND status = 'in_progress'",
        )
        .bind(driver_id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Trip::from))
    }

    async fn list_trips(&self, driver_id: Uuid, tenant_id: Uuid, page: Page) -> Result<Vec<Trip>, StoreError> {
        let rows = sqlx::query_as::<_, TripRow>(
            r#"
            SELECT * FROM trips
            WHERE driver_id = $1 AND tenant_id = $2
            ORDER BY started_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(driver_id)
        .bind(tenant_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Trip::from).collect())
    }

    async fn insert_trip(&self, trip: &Trip) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO trips (
                id, tenant_id, vehicle_id, driver_id, status,
                start_odometer, start_fuel_level, start_photos, start_defects, start_notes, start_location, started_at,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(trip.id)
        .bind(trip.tenant_id)
        .bind(trip.vehicle_id)
        .bind(trip.driver_id)
        .bind(trip.status)
        .bind(trip.start.odometer)
        .bind(trip.start.fuel_level)
        .bind(trip.start.photos.clone())
        .bind(Json(trip.start.defects.clone()))
        .bind(trip.start.notes.clone())
        .bind(trip.start.location.clone().map(Json))
        .bind(trip.start.started_at)
        .bind(trip.created_at)
        .bind(trip.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_insert_error)?;

        Ok(())
    }

    async fn complete_trip(&self, completion: TripCompletion) -> Result<(Trip, MileageEntry), StoreError> {
        let mut tx = self.pool.begin().await?;

        let mut trip = lock_active_trip(&mut tx, completion.trip_id, completion.driver_id, completion.tenant_id).await?;
        let entry = append_entry(&mut tx, &completion.reading).await?;

        trip.complete(completion.end)
            .map_err(|_| StoreError::TripNotActive(completion.trip_id))?;
        let end = trip.end.clone().ok_or(StoreError::TripNotActive(completion.trip_id))?;

        let row = sqlx::query_as::<_, TripRow>(
            r#"
            UPDATE trips
            SET status = $2,
                end_odometer = $3, end_fuel_level = $4, end_photos = $5, end_defects = $6,
                end_notes = $7, end_location = $8, ended_at = $9,
                distance_traveled = $10, duration_minutes = $11, updated_at = $12
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(trip.id)
        .bind(trip.status)
        .bind(end.odometer)
        .bind(end.fuel_level)
        .bind(end.photos)
        .bind(Json(end.defects))
        .bind(end.notes)
        .bind(end.location.map(Json))
        .bind(end.ended_at)
        .bind(end.distance_traveled)
        .bind(end.duration_minutes)
        .bind(trip.updated_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok((Trip::from(row), entry))
    }

    async fn cancel_trip(
        &self,
        trip_id: Uuid,
        driver_id: Uuid,
        tenant_id: Uuid,
        at: DateTime<Utc>,
        reason: Option<String>,
    ) -> Result<Trip, StoreError> {
        let mut tx = self.pool.begin().await?;

        let mut trip = lock_active_trip(&mut tx, trip_id, driver_id, tenant_id).await?;
        trip.cancel(at, reason).map_err(|_| StoreError::TripNotActive(trip_id))?;

        let row = sqlx::query_as::<_, TripRow>(
            r#"
            UPDATE trips
            SET status = $2, cancelled_at = $3, cancel_reason = $4, updated_at = $5
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(trip.id)
        .bind(trip.status)
        .bind(trip.cancelled_at)
        .bind(trip.cancel_reason.clone())
        .bind(trip.updated_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Trip::from(row))
    }

    async fn append_mileage(&self, reading: OdometerReading) -> Result<MileageEntry, StoreError> {
        let mut tx = self.pool.begin().await?;
        let entry = append_entry(&mut tx, &reading).await?;
        tx.commit().await?;
        Ok(entry)
    }

    async fn list_mileage(&self, vehicle_id: Uuid, tenant_id: Uuid, page: Page) -> Result<Vec<MileageEntry>, StoreError> {
        let entries = sqlx::query_as::<_, MileageEntry>(
            r#"
            SELECT * FROM mileage_entries
            WHERE vehicle_id = $1 AND tenant_id = $2
            ORDER BY recorded_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(vehicle_id)
        .bind(tenant_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    async fn reconcile_odometer(&self, vehicle_id: Uuid, tenant_id: Uuid) -> Result<ReconcileOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Mismo bloqueo de fila que `append_entry`: ninguna entrada nueva se cuela entre la lectura y la escritura
        let vehicle = sqlx::query_as::<_, Vehicle>(
            "SELECT * FROM vehicles WHERE id = $1 AND tenant_id = $2 FOR UPDATE",
        )
        .bind(vehicle_id)
        .bind(tenant_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StoreError::VehicleNotFound(vehicle_id))?;

        let latest: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT mileage FROM mileage_entries
            WHERE vehicle_id = $1 AND tenant_id = $2
            ORDER BY recorded_at DESC
            LIMIT 1
            "#,
        )
        .bind(vehicle_id)
        .bind(tenant_id)
        .fetch_optional(&mut *tx)
        .await?;

        let latest = match latest {
            Some(mileage) => mileage,
            None => return Ok(ReconcileOutcome::NoEntries),
        };
        if vehicle.current_odometer == latest && !vehicle.has_legacy_drift() {
            return Ok(ReconcileOutcome::InSync);
        }

        sqlx::query("UPDATE vehicles SET current_odometer = $2, mileage = $2, updated_at = now() WHERE id = $1")
            .bind(vehicle_id)
            .bind(latest)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(ReconcileOutcome::Repaired {
            from: vehicle.current_odometer,
            to: latest,
        })
    }
}
