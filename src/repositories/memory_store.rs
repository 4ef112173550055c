//! Almacén en memoria
//!
//! Implementa `FleetStore` sobre un único `Mutex`: cada operación trabaja
//! sobre una copia del estado y solo la publica si termina sin error, de modo
//! que un fallo a mitad de operación no deja escrituras parciales.
//!
//! Permite inyectar fallos en la escritura del libro para reproducir el
//! escenario de caída entre la inserción de la entrada y la actualización del
//! vehículo.

use std::collections::HashMap;
use std::sync::Mutex as SyncMutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::warn;
use uuid::Uuid;

use super::{FleetStore, Page, StoreError, TripCompletion};
use crate::models::{MileageEntry, OdometerReading, ReconcileOutcome, Trip, Vehicle};

/// Punto de fallo inyectable en la próxima escritura del libro
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultPoint {
    /// La operación aborta después de insertar la entrada; no se publica nada
    CrashAfterLedgerInsert,
    /// La entrada se publica pero el odómetro del vehículo no se actualiza
    /// (escritor heredado sin transacción)
    LoseVehicleUpdate,
}

#[derive(Debug, Default, Clone)]
struct MemoryState {
    vehicles: HashMap<Uuid, Vehicle>,
    trips: HashMap<Uuid, Trip>,
    mileage: Vec<MileageEntry>,
}

#[derive(Debug, Default)]
pub struct MemoryFleetStore {
    state: Mutex<MemoryState>,
    fault: SyncMutex<Option<FaultPoint>>,
}

impl MemoryFleetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_vehicle(&self, vehicle: Vehicle) {
        self.state.lock().await.vehicles.insert(vehicle.id, vehicle);
    }

    pub async fn vehicle(&self, vehicle_id: Uuid) -> Option<Vehicle> {
        self.state.lock().await.vehicles.get(&vehicle_id).cloned()
    }

    pub async fn trips(&self) -> Vec<Trip> {
        self.state.lock().await.trips.values().cloned().collect()
    }

    pub async fn mileage_entries(&self, vehicle_id: Uuid) -> Vec<MileageEntry> {
        self.state
            .lock()
            .await
            .mileage
            .iter()
            .filter(|e| e.vehicle_id == vehicle_id)
            .cloned()
            .collect()
    }

    /// Arma un fallo para la próxima escritura del libro
    pub fn inject_fault(&self, fault: FaultPoint) {
        if let Ok(mut slot) = self.fault.lock() {
            *slot = Some(fault);
        }
    }

    fn take_fault(&self) -> Option<FaultPoint> {
        self.fault.lock().ok().and_then(|mut slot| slot.take())
    }

    async fn transact<T>(
        &self,
        op: impl FnOnce(&mut MemoryState) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut state = self.state.lock().await;
        let mut staged = state.clone();
        let result = op(&mut staged)?;
        *state = staged;
        Ok(result)
    }

    fn apply_reading(&self, staged: &mut MemoryState, reading: &OdometerReading) -> Result<MileageEntry, StoreError> {
        let previous = staged
            .vehicles
            .get(&reading.vehicle_id)
            .filter(|v| v.tenant_id == reading.tenant_id)
            .map(|v| v.current_odometer)
            .ok_or(StoreError::VehicleNotFound(reading.vehicle_id))?;

        reading.guard.check(previous, reading.mileage)?;

        let now = Utc::now();
        let entry = MileageEntry::record(reading, previous, now);
        staged.mileage.push(entry.clone());

        match self.take_fault() {
            Some(FaultPoint::CrashAfterLedgerInsert) => {
                return Err(StoreError::Backend(
                    "simulated crash between ledger insert and vehicle update".to_string(),
                ));
            }
            Some(FaultPoint::LoseVehicleUpdate) => {
                warn!("⚠️ Fallo inyectado: odómetro de {} sin actualizar", reading.vehicle_id);
                return Ok(entry);
            }
            None => {}
        }

        if let Some(vehicle) = staged.vehicles.get_mut(&reading.vehicle_id) {
            vehicle.project_odometer(reading.mileage, now);
        }

        Ok(entry)
    }
}

fn owned_active_trip<'a>(
    staged: &'a mut MemoryState,
    trip_id: Uuid,
    driver_id: Uuid,
    tenant_id: Uuid,
) -> Result<&'a mut Trip, StoreError> {
    staged
        .trips
        .get_mut(&trip_id)
        .filter(|t| t.is_owned_by(driver_id, tenant_id) && t.is_in_progress())
        .ok_or(StoreError::TripNotActive(trip_id))
}

#[async_trait]
impl FleetStore for MemoryFleetStore {
    async fn find_vehicle(&self, vehicle_id: Uuid, tenant_id: Uuid) -> Result<Option<Vehicle>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.vehicles.get(&vehicle_id).filter(|v| v.tenant_id == tenant_id).cloned())
    }

    async fn find_trip(&self, trip_id: Uuid, tenant_id: Uuid) -> Result<Option<Trip>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.trips.get(&trip_id).filter(|t| t.tenant_id == tenant_id).cloned())
    }

    async fn find_active_trip(&self, driver_id: Uuid, tenant_id: Uuid) -> Result<Option<Trip>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .trips
            .values()
            .find(|t| t.is_owned_by(driver_id, tenant_id) && t.is_in_progress())
            .cloned())
    }

    async fn list_trips(&self, driver_id: Uuid, tenant_id: Uuid, page: Page) -> Result<Vec<Trip>, StoreError> {
        let state = self.state.lock().await;
        let mut trips: Vec<Trip> = state
            .trips
            .values()
            .filter(|t| t.is_owned_by(driver_id, tenant_id))
            .cloned()
            .collect();
        trips.sort_by(|a, b| b.start.started_at.cmp(&a.start.started_at));
        Ok(trips
            .into_iter()
            .skip(page.offset.max(0) as usize)
            .take(page.limit.max(0) as usize)
            .collect())
    }

    async fn insert_trip(&self, trip: &Trip) -> Result<(), StoreError> {
        self.transact(|staged| {
            // Equivalente al índice único parcial de PostgreSQL
            if staged
                .trips
                .values()
                .any(|t| t.driver_id == trip.driver_id && t.is_in_progress())
            {
                return Err(StoreError::ActiveTripExists);
            }
            staged.trips.insert(trip.id, trip.clone());
            Ok(())
        })
        .await
    }

    async fn complete_trip(&self, completion: TripCompletion) -> Result<(Trip, MileageEntry), StoreError> {
        self.transact(|staged| {
            owned_active_trip(staged, completion.trip_id, completion.driver_id, completion.tenant_id)?;
            let entry = self.apply_reading(staged, &completion.reading)?;

            let trip = owned_active_trip(staged, completion.trip_id, completion.driver_id, completion.tenant_id)?;
            trip.complete(completion.end)
                .map_err(|_| StoreError::TripNotActive(completion.trip_id))?;
            Ok((trip.clone(), entry))
        })
        .await
    }

    async fn cancel_trip(
        &self,
        trip_id: Uuid,
        driver_id: Uuid,
        tenant_id: Uuid,
        at: DateTime<Utc>,
        reason: Option<String>,
    ) -> Result<Trip, StoreError> {
        self.transact(|staged| {
            let trip = owned_active_trip(staged, trip_id, driver_id, tenant_id)?;
            trip.cancel(at, reason).map_err(|_| StoreError::TripNotActive(trip_id))?;
            Ok(trip.clone())
        })
        .await
    }

    async fn append_mileage(&self, reading: OdometerReading) -> Result<MileageEntry, StoreError> {
        self.transact(|staged| self.apply_reading(staged, &reading)).await
    }

    async fn list_mileage(&self, vehicle_id: Uuid, tenant_id: Uuid, page: Page) -> Result<Vec<MileageEntry>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .mileage
            .iter()
            .rev()
            .filter(|e| e.vehicle_id == vehicle_id && e.tenant_id == tenant_id)
            .skip(page.offset.max(0) as usize)
            .take(page.limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn reconcile_odometer(&self, vehicle_id: Uuid, tenant_id: Uuid) -> Result<ReconcileOutcome, StoreError> {
        self.transact(|staged| {
            let latest = staged
                .mileage
                .iter()
                .rev()
                .find(|e| e.vehicle_id == vehicle_id && e.tenant_id == tenant_id)
                .map(|e| e.mileage);

            let vehicle = staged
                .vehicles
                .get_mut(&vehicle_id)
                .filter(|v| v.tenant_id == tenant_id)
                .ok_or(StoreError::VehicleNotFound(vehicle_id))?;

            let latest = match latest {
                Some(mileage) => mileage,
                None => return Ok(ReconcileOutcome::NoEntries),
            };
            if vehicle.current_odometer == latest && !vehicle.has_legacy_drift() {
                return Ok(ReconcileOutcome::InSync);
            }

            let from = vehicle.current_odometer;
            vehicle.project_odometer(latest, Utc::now());
            Ok(ReconcileOutcome::Repaired { from, to: latest })
        })
        .await
    }
}
