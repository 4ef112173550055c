//! Libro de kilometraje
//!
//! Único escritor del odómetro de los vehículos. Toda lectura aceptada deja
//! una entrada inmutable en `mileage_entries` y proyecta el valor sobre
//! `current_odometer` (y su espejo heredado) en la misma transacción.
//!
//! La cota anti-fraude se aplica en la actualización manual del conductor.
//! En el cierre de viaje solo se aplica si `MileagePolicy::enforce_jump_on_trip_end`
//! está activo; por defecto no lo está.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::config::MileagePolicy;
use crate::models::{MileageEntry, MileageSource, OdometerGuard, OdometerReading, Trip};
use crate::repositories::{FleetStore, Page};
use crate::utils::errors::{AppError, AppResult};

pub use crate::models::ReconcileOutcome;

pub struct MileageLedger {
    store: Arc<dyn FleetStore>,
    policy: MileagePolicy,
}

impl MileageLedger {
    pub fn new(store: Arc<dyn FleetStore>, policy: MileagePolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> &MileagePolicy {
        &self.policy
    }

    /// Lectura de taller o inspección: sin cota anti-fraude, pero el odómetro
    /// nunca retrocede
    pub async fn record(
        &self,
        vehicle_id: Uuid,
        new_mileage: i64,
        source: MileageSource,
        tenant_id: Uuid,
        notes: Option<String>,
        recorded_by: Option<Uuid>,
    ) -> AppResult<MileageEntry> {
        let reading = OdometerReading {
            vehicle_id,
            tenant_id,
            mileage: new_mileage,
            source,
            notes,
            recorded_by,
            guard: OdometerGuard::NonDecreasing,
        };

        let entry = self.store.append_mileage(reading).await?;
        info!(
            vehicle_id = %vehicle_id,
            source = ?source,
            difference = entry.difference,
            "📒 Lectura de odómetro registrada"
        );
        Ok(entry)
    }

    /// Actualización manual del conductor: debe crecer y respetar la cota anti-fraude
    pub async fn manual_update(
        &self,
        vehicle_id: Uuid,
        new_mileage: i64,
        driver_id: Uuid,
        tenant_id: Uuid,
        notes: Option<String>,
    ) -> AppResult<MileageEntry> {
        let reading = OdometerReading {
            vehicle_id,
            tenant_id,
            mileage: new_mileage,
            source: MileageSource::Manual,
            notes,
            recorded_by: Some(driver_id),
            guard: OdometerGuard::StrictIncrease {
                max_jump: self.policy.max_manual_jump,
            },
        };

        match self.store.append_mileage(reading).await {
            Ok(entry) => {
                info!(
                    vehicle_id = %vehicle_id,
                    driver_id = %driver_id,
                    previous = entry.previous_mileage,
                    mileage = entry.mileage,
                    "🚗 Kilometraje actualizado manualmente"
                );
                Ok(entry)
            }
            Err(e) => {
                warn!(vehicle_id = %vehicle_id, driver_id = %driver_id, error = %e, "⚠️ Actualización manual rechazada");
                Err(e.into())
            }
        }
    }

    /// Lectura que se aplica al libro cuando se completa un viaje
    pub fn trip_end_reading(&self, trip: &Trip, end_odometer: i64) -> OdometerReading {
        let guard = if self.policy.enforce_jump_on_trip_end {
            OdometerGuard::MaxJump {
                max_jump: self.policy.max_manual_jump,
            }
        } else {
            OdometerGuard::Unchecked
        };

        OdometerReading {
            vehicle_id: trip.vehicle_id,
            tenant_id: trip.tenant_id,
            mileage: end_odometer,
            source: MileageSource::Manual,
            notes: Some(format!("Trip {} completed", trip.id)),
            recorded_by: Some(trip.driver_id),
            guard,
        }
    }

    pub async fn history(&self, vehicle_id: Uuid, tenant_id: Uuid, page: Page) -> AppResult<Vec<MileageEntry>> {
        self.store
            .find_vehicle(vehicle_id, tenant_id)
            .await?
            .ok_or_else(|| AppError::NotFound("vehicle not found".to_string()))?;

        Ok(self.store.list_mileage(vehicle_id, tenant_id, page).await?)
    }

    /// Alinea el odómetro del vehículo con la última entrada del libro.
    /// Idempotente: una segunda ejecución devuelve `InSync`.
    pub async fn reconcile(&self, vehicle_id: Uuid, tenant_id: Uuid) -> AppResult<ReconcileOutcome> {
        let outcome = self.store.reconcile_odometer(vehicle_id, tenant_id).await?;

        if let ReconcileOutcome::Repaired { from, to } = outcome {
            warn!(vehicle_id = %vehicle_id, from, to, "🔧 Odómetro reconciliado con el libro");
        }

        Ok(outcome)
    }
}
