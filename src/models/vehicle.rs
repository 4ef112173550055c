//! Modelo de Vehicle
//!
//! El vehículo es una entidad externa a este núcleo: solo se leen su tenant, su
//! conductor asignado y su odómetro, y solo se escribe el odómetro.
//!
//! `current_odometer` es el valor autoritativo. La columna heredada `mileage`
//! es una proyección que se escribe siempre con el mismo valor (artefacto de
//! migración); nunca se actualiza por separado.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

/// Estado del vehículo - mapea al ENUM vehicle_status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "vehicle_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum VehicleStatus {
    Active,
    Maintenance,
    OutOfService,
    Retired,
}

/// Vehicle - mapea a la tabla vehicles
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub assigned_driver_id: Option<Uuid>,
    pub status: VehicleStatus,
    pub current_odometer: i64,
    /// Espejo heredado de `current_odometer`
    pub mileage: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Vehicle {
    pub fn new(tenant_id: Uuid, assigned_driver_id: Option<Uuid>, odometer: i64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            assigned_driver_id,
            status: VehicleStatus::Active,
            current_odometer: odometer,
            mileage: odometer,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_assigned_to(&self, driver_id: Uuid) -> bool {
        self.assigned_driver_id == Some(driver_id)
    }

    /// Escribe el odómetro y su espejo heredado a partir de un único valor
    pub fn project_odometer(&mut self, value: i64, at: DateTime<Utc>) {
        self.current_odometer = value;
        self.mileage = value;
        self.updated_at = at;
    }

    /// true si la columna heredada se ha desincronizado del valor autoritativo
    pub fn has_legacy_drift(&self) -> bool {
        self.mileage != self.current_odometer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_odometer_writes_both_fields() {
        let mut vehicle = Vehicle::new(Uuid::new_v4(), None, 100_000);
        vehicle.mileage = 99_000;
        assert!(vehicle.has_legacy_drift());

        vehicle.project_odometer(100_150, Utc::now());
        assert_eq!(vehicle.current_odometer, 100_150);
        assert_eq!(vehicle.mileage, 100_150);
        assert!(!vehicle.has_legacy_drift());
    }
}
