//! Servicio de viajes
//!
//! Orquesta el ciclo de vida de un viaje (`start`, `end`, `cancel`). Todas las
//! precondiciones se comprueban antes de escribir; las que dependen de estado
//! compartido se repiten dentro de la transacción del almacén, que es quien
//! tiene la última palabra (índice único de viaje en curso, bloqueo de fila
//! del viaje y del vehículo).
//!
//! El escalado de daños ocurre después de confirmar el cierre y nunca lo
//! revierte.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::dto::{CancelSessionRequest, EndSessionRequest, StartSessionRequest};
use crate::models::trip::duration_minutes;
use crate::models::{EndSnapshot, MileageEntry, StartSnapshot, Trip};
use crate::repositories::{FleetStore, Page, TripCompletion};
use crate::services::defect_diff;
use crate::services::incident_escalator::{EscalationOutcome, IncidentEscalator};
use crate::services::mileage_ledger::MileageLedger;
use crate::utils::errors::{AppError, AppResult};

/// Resultado de cerrar un viaje
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TripEndOutcome {
    pub trip: Trip,
    pub mileage_entry: MileageEntry,
    pub escalation: EscalationOutcome,
}

pub struct TripService {
    store: Arc<dyn FleetStore>,
    ledger: Arc<MileageLedger>,
    escalator: IncidentEscalator,
}

impl TripService {
    pub fn new(store: Arc<dyn FleetStore>, ledger: Arc<MileageLedger>, escalator: IncidentEscalator) -> Self {
        Self { store, ledger, escalator }
    }

    /// NONE -> IN_PROGRESS
    pub async fn start(&self, request: StartSessionRequest, driver_id: Uuid, tenant_id: Uuid) -> AppResult<Trip> {
        if self.store.find_active_trip(driver_id, tenant_id).await?.is_some() {
            return Err(AppError::Conflict("session already in progress".to_string()));
        }

        let vehicle = self
            .store
            .find_vehicle(request.vehicle_id, tenant_id)
            .await?
            .filter(|v| v.is_assigned_to(driver_id))
            .ok_or_else(|| AppError::NotFound("vehicle not found or not assigned to driver".to_string()))?;

        let gap = (request.start_odometer - vehicle.current_odometer).abs();
        if gap > self.ledger.policy().start_odometer_tolerance {
            warn!(
                target: "audit",
                vehicle_id = %vehicle.id,
                driver_id = %driver_id,
                reported = request.start_odometer,
                recorded = vehicle.current_odometer,
                gap,
                "⚠️ Odómetro de inicio fuera de tolerancia"
            );
        }

        let trip = Trip::start(
            tenant_id,
            vehicle.id,
            driver_id,
            StartSnapshot {
                odometer: request.start_odometer,
                fuel_level: request.start_fuel_level,
                photos: request.start_photos,
                defects: request.start_defects.unwrap_or_default(),
                notes: request.start_notes,
                location: request.start_location,
                started_at: Utc::now(),
            },
        );

        // El almacén rechaza la inserción si otra petición ganó la carrera
        self.store.insert_trip(&trip).await?;

        info!(trip_id = %trip.id, vehicle_id = %trip.vehicle_id, driver_id = %driver_id, "🚦 Viaje iniciado");
        Ok(trip)
    }

    /// IN_PROGRESS -> COMPLETED
    pub async fn end(
        &self,
        trip_id: Uuid,
        request: EndSessionRequest,
        driver_id: Uuid,
        tenant_id: Uuid,
    ) -> AppResult<TripEndOutcome> {
        let trip = self.active_trip_of(trip_id, driver_id, tenant_id).await?;

        if request.end_odometer < trip.start.odometer {
            return Err(AppError::BadRequest("end odometer below start odometer".to_string()));
        }

        let ended_at = Utc::now();
        let end = EndSnapshot {
            odometer: request.end_odometer,
            fuel_level: request.end_fuel_level,
            photos: request.end_photos,
            defects: request.end_defects.unwrap_or_default(),
            notes: request.end_notes,
            location: request.end_location,
            ended_at,
            distance_traveled: request.end_odometer - trip.start.odometer,
            duration_minutes: duration_minutes(trip.start.started_at, ended_at),
        };

        let completion = TripCompletion {
            trip_id,
            driver_id,
            tenant_id,
            reading: self.ledger.trip_end_reading(&trip, request.end_odometer),
            end,
        };
        let (trip, mileage_entry) = self.store.complete_trip(completion).await?;

        info!(
            trip_id = %trip.id,
            distance = ?trip.end.as_ref().map(|e| e.distance_traveled),
            "🏁 Viaje completado"
        );

        let escalation = match trip.end.as_ref() {
            Some(end) => {
                let severe = defect_diff::severe_new(&trip.start.defects, &end.defects);
                self.escalator.escalate(&trip, &severe).await
            }
            None => EscalationOutcome::NotRequired,
        };

        Ok(TripEndOutcome {
            trip,
            mileage_entry,
            escalation,
        })
    }

    /// IN_PROGRESS -> CANCELLED, sin efectos sobre odómetro ni defectos
    pub async fn cancel(
        &self,
        trip_id: Uuid,
        request: CancelSessionRequest,
        driver_id: Uuid,
        tenant_id: Uuid,
    ) -> AppResult<Trip> {
        self.active_trip_of(trip_id, driver_id, tenant_id).await?;

        let trip = self
            .store
            .cancel_trip(trip_id, driver_id, tenant_id, Utc::now(), request.reason)
            .await?;

        info!(trip_id = %trip.id, driver_id = %driver_id, "🛑 Viaje cancelado");
        Ok(trip)
    }

    pub async fn active_trip(&self, driver_id: Uuid, tenant_id: Uuid) -> AppResult<Option<Trip>> {
        Ok(self.store.find_active_trip(driver_id, tenant_id).await?)
    }

    pub async fn get_trip(&self, trip_id: Uuid, driver_id: Uuid, tenant_id: Uuid) -> AppResult<Trip> {
        self.store
            .find_trip(trip_id, tenant_id)
            .await?
            .filter(|t| t.driver_id == driver_id)
            .ok_or_else(|| AppError::NotFound("session not found".to_string()))
    }

    pub async fn list_trips(&self, driver_id: Uuid, tenant_id: Uuid, page: Page) -> AppResult<Vec<Trip>> {
        Ok(self.store.list_trips(driver_id, tenant_id, page).await?)
    }

    async fn active_trip_of(&self, trip_id: Uuid, driver_id: Uuid, tenant_id: Uuid) -> AppResult<Trip> {
        self.store
            .find_trip(trip_id, tenant_id)
            .await?
            .filter(|t| t.driver_id == driver_id && t.is_in_progress())
            .ok_or_else(|| AppError::NotFound("session not found or not in progress".to_string()))
    }
}
