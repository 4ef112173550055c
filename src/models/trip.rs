//! Modelo de Trip (sesión de uso de vehículo)
//!
//! ```text
//! NONE ──start──▶ IN_PROGRESS ──end────▶ COMPLETED (terminal)
//!                      │
//!                      └──cancel──▶ CANCELLED (terminal)
//! ```
//!
//! Las transiciones se validan aquí (`complete`, `cancel`) y los almacenes las
//! aplican dentro de su transacción, después de bloquear la fila del viaje.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;
use uuid::Uuid;

use super::defect::Defect;

/// Estado del viaje - mapea al ENUM trip_status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "trip_status", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TripStatus {
    InProgress,
    Completed,
    Cancelled,
}

impl TripStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl std::fmt::Display for TripStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        };
        f.write_str(s)
    }
}

/// Posición reportada por el dispositivo del conductor
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// Instantánea tomada al iniciar el viaje
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StartSnapshot {
    pub odometer: i64,
    pub fuel_level: i32,
    pub photos: Vec<String>,
    pub defects: Vec<Defect>,
    pub notes: Option<String>,
    pub location: Option<Location>,
    pub started_at: DateTime<Utc>,
}

/// Instantánea tomada al finalizar el viaje, con los valores derivados
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EndSnapshot {
    pub odometer: i64,
    pub fuel_level: i32,
    pub photos: Vec<String>,
    pub defects: Vec<Defect>,
    pub notes: Option<String>,
    pub location: Option<Location>,
    pub ended_at: DateTime<Utc>,
    pub distance_traveled: i64,
    pub duration_minutes: i64,
}

/// Viaje de un conductor con un vehículo
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub vehicle_id: Uuid,
    pub driver_id: Uuid,
    pub status: TripStatus,
    pub start: StartSnapshot,
    pub end: Option<EndSnapshot>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancel_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TripTransitionError {
    #[error("invalid trip transition: {from} -> {to}")]
    InvalidTransition { from: TripStatus, to: TripStatus },
}

impl Trip {
    pub fn start(tenant_id: Uuid, vehicle_id: Uuid, driver_id: Uuid, start: StartSnapshot) -> Self {
        let now = start.started_at;
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            vehicle_id,
            driver_id,
            status: TripStatus::InProgress,
            start,
            end: None,
            cancelled_at: None,
            cancel_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_in_progress(&self) -> bool {
        self.status == TripStatus::InProgress
    }

    pub fn is_owned_by(&self, driver_id: Uuid, tenant_id: Uuid) -> bool {
        self.driver_id == driver_id && self.tenant_id == tenant_id
    }

    /// IN_PROGRESS -> COMPLETED
    pub fn complete(&mut self, end: EndSnapshot) -> Result<(), TripTransitionError> {
        self.ensure_in_progress(TripStatus::Completed)?;
        self.updated_at = end.ended_at;
        self.end = Some(end);
        self.status = TripStatus::Completed;
        Ok(())
    }

    /// IN_PROGRESS -> CANCELLED, sin efectos sobre odómetro ni defectos
    pub fn cancel(&mut self, at: DateTime<Utc>, reason: Option<String>) -> Result<(), TripTransitionError> {
        self.ensure_in_progress(TripStatus::Cancelled)?;
        self.status = TripStatus::Cancelled;
        self.cancelled_at = Some(at);
        self.cancel_reason = reason;
        self.updated_at = at;
        Ok(())
    }

    fn ensure_in_progress(&self, to: TripStatus) -> Result<(), TripTransitionError> {
        if self.status.is_terminal() {
            return Err(TripTransitionError::InvalidTransition { from: self.status, to });
        }
        Ok(())
    }
}

/// Minutos entre inicio y fin, redondeados al minuto más cercano
pub fn duration_minutes(started_at: DateTime<Utc>, ended_at: DateTime<Utc>) -> i64 {
    let seconds = (ended_at - started_at).num_seconds();
    (seconds as f64 / 60.0).round() as i64
}
