//! Repositorios
//!
//! `FleetStore` es la frontera de persistencia del núcleo. Cada método es una
//! unidad atómica: las comprobaciones que protegen invariantes (viaje único en
//! curso, odómetro, transición de estado) se evalúan dentro de la misma
//! transacción que escribe.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    EndSnapshot, MileageEntry, MileageRejection, OdometerReading, ReconcileOutcome, Trip, Vehicle,
};

pub mod incident_repository;
pub mod memory_store;
pub mod postgres_store;

pub use incident_repository::IncidentRepository;
pub use memory_store::{FaultPoint, MemoryFleetStore};
pub use postgres_store::PgFleetStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("driver already has a trip in progress")]
    ActiveTripExists,

    #[error("trip {0} not found or not in progress")]
    TripNotActive(Uuid),

    #[error("vehicle {0} not found")]
    VehicleNotFound(Uuid),

    #[error("reading rejected: {0}")]
    Rejected(#[from] MileageRejection),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("storage failure: {0}")]
    Backend(String),
}

/// Cierre de un viaje: instantánea final más la lectura que se aplica al libro
#[derive(Debug, Clone)]
pub struct TripCompletion {
    pub trip_id: Uuid,
    pub driver_id: Uuid,
    pub tenant_id: Uuid,
    pub end: EndSnapshot,
    pub reading: OdometerReading,
}

/// Paginación simple para listados
#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Default for Page {
    fn default() -> Self {
        Self { limit: 50, offset: 0 }
    }
}

#[async_trait]
pub trait FleetStore: Send + Sync {
    async fn find_vehicle(&self, vehicle_id: Uuid, tenant_id: Uuid) -> Result<Option<Vehicle>, StoreError>;

    async fn find_trip(&self, trip_id: Uuid, tenant_id: Uuid) -> Result<Option<Trip>, StoreError>;

    async fn find_active_trip(&self, driver_id: Uuid, tenant_id: Uuid) -> Result<Option<Trip>, StoreError>;

    async fn list_trips(&self, driver_id: Uuid, tenant_id: Uuid, page: Page) -> Result<Vec<Trip>, StoreError>;

    /// Inserta un viaje en curso; `ActiveTripExists` si el conductor ya tiene uno
    async fn insert_trip(&self, trip: &Trip) -> Result<(), StoreError>;

    /// Completa el viaje y aplica la lectura al libro en una sola transacción
    async fn complete_trip(&self, completion: TripCompletion) -> Result<(Trip, MileageEntry), StoreError>;

    async fn cancel_trip(
        &self,
        trip_id: Uuid,
        driver_id: Uuid,
        tenant_id: Uuid,
        at: DateTime<Utc>,
        reason: Option<String>,
    ) -> Result<Trip, StoreError>;

    /// Inserta la entrada y proyecta el odómetro del vehículo atómicamente
    async fn append_mileage(&self, reading: OdometerReading) -> Result<MileageEntry, StoreError>;

    async fn list_mileage(&self, vehicle_id: Uuid, tenant_id: Uuid, page: Page) -> Result<Vec<MileageEntry>, StoreError>;

    /// Alinea el odómetro (y su espejo) con la última entrada del libro.
    /// Lee y escribe bajo el mismo bloqueo que las escrituras del libro.
    async fn reconcile_odometer(&self, vehicle_id: Uuid, tenant_id: Uuid) -> Result<ReconcileOutcome, StoreError>;
}
