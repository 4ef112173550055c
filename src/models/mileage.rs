//! Modelo del libro de kilometraje
//!
//! `MileageEntry` es inmutable una vez escrito. La única forma de construir
//! una entrada es `MileageEntry::record`, que calcula `difference` a partir de
//! la lectura nueva y la anterior.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;
use uuid::Uuid;

/// Origen de una lectura de odómetro - mapea al ENUM mileage_source
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "mileage_source", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MileageSource {
    Manual,
    Maintenance,
    Inspection,
}

/// Entrada del libro de kilometraje - mapea a la tabla mileage_entries
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MileageEntry {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub vehicle_id: Uuid,
    pub mileage: i64,
    pub previous_mileage: i64,
    pub difference: i64,
    pub source: MileageSource,
    pub notes: Option<String>,
    pub recorded_by: Option<Uuid>,
    pub recorded_at: DateTime<Utc>,
}

impl MileageEntry {
    /// Construye la entrada para una lectura aceptada
    pub fn record(reading: &OdometerReading, previous_mileage: i64, recorded_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id: reading.tenant_id,
            vehicle_id: reading.vehicle_id,
            mileage: reading.mileage,
            previous_mileage,
            difference: reading.mileage - previous_mileage,
            source: reading.source,
            notes: reading.notes.clone(),
            recorded_by: reading.recorded_by,
            recorded_at,
        }
    }
}

/// Resultado de reconciliar el odómetro de un vehículo con su libro
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    InSync,
    NoEntries,
    Repaired { from: i64, to: i64 },
}

/// Lectura pendiente de aplicar al libro
///
/// El almacén la aplica en una sola transacción: lee el odómetro actual con
/// bloqueo, evalúa `guard`, inserta la entrada y proyecta el odómetro.
#[derive(Debug, Clone)]
pub struct OdometerReading {
    pub vehicle_id: Uuid,
    pub tenant_id: Uuid,
    pub mileage: i64,
    pub source: MileageSource,
    pub notes: Option<String>,
    pub recorded_by: Option<Uuid>,
    pub guard: OdometerGuard,
}

/// Reglas que una lectura debe cumplir frente al odómetro vigente
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OdometerGuard {
    /// Sin comprobación (fin de viaje por defecto)
    Unchecked,
    /// No puede retroceder; repetir la lectura vigente es válido (taller, inspección)
    NonDecreasing,
    /// Debe crecer y el salto no puede superar `max_jump` (actualización manual)
    StrictIncrease { max_jump: i64 },
    /// Solo limita el salto hacia arriba
    MaxJump { max_jump: i64 },
}

/// Motivo por el que el libro rechaza una lectura
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MileageRejection {
    #[error("mileage must be greater than current odometer ({current})")]
    NotIncreasing { current: i64, requested: i64 },

    #[error("mileage cannot go below current odometer ({current})")]
    Decreasing { current: i64, requested: i64 },

    #[error("mileage jump too large, possible fraud ({jump} > {max_jump})")]
    JumpTooLarge { jump: i64, max_jump: i64 },
}

impl OdometerGuard {
    pub fn check(&self, current: i64, requested: i64) -> Result<(), MileageRejection> {
        let jump = requested - current;
        match *self {
            Self::Unchecked => Ok(()),
            Self::NonDecreasing => {
                if requested < current {
                    return Err(MileageRejection::Decreasing { current, requested });
                }
                Ok(())
            }
            Self::StrictIncrease { max_jump } => {
                if requested <= current {
                    return Err(MileageRejection::NotIncreasing { current, requested });
                }
                if jump > max_jump {
                    return Err(MileageRejection::JumpTooLarge { jump, max_jump });
                }
                Ok(())
            }
            Self::MaxJump { max_jump } => {
                if jump > max_jump {
                    return Err(MileageRejection::JumpTooLarge { jump, max_jump });
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(mileage: i64) -> OdometerReading {
        OdometerReading {
            vehicle_id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            mileage,
            source: MileageSource::Manual,
            notes: None,
            recorded_by: None,
            guard: OdometerGuard::Unchecked,
        }
    }

    #[test]
    fn test_entry_difference_matches_readings() {
        let entry = MileageEntry::record(&reading(100_150), 100_000, Utc::now());
        assert_eq!(entry.difference, 150);
        assert_eq!(entry.difference, entry.mileage - entry.previous_mileage);

        let backwards = MileageEntry::record(&reading(99_000), 100_000, Utc::now());
        assert_eq!(backwards.difference, -1_000);
    }

    #[test]
    fn test_strict_increase_guard() {
        let guard = OdometerGuard::StrictIncrease { max_jump: 10_000 };

        assert!(guard.check(100_000, 100_001).is_ok());
        assert!(guard.check(100_000, 110_000).is_ok());
        assert_eq!(
            guard.check(100_000, 100_000),
            Err(MileageRejection::NotIncreasing { current: 100_000, requested: 100_000 })
        );
        assert!(matches!(guard.check(100_000, 99_999), Err(MileageRejection::NotIncreasing { .. })));
        assert_eq!(
            guard.check(100_000, 111_000),
            Err(MileageRejection::JumpTooLarge { jump: 11_000, max_jump: 10_000 })
        );
    }

    #[test]
    fn test_max_jump_guard_allows_equal_reading() {
        let guard = OdometerGuard::MaxJump { max_jump: 10_000 };
        assert!(guard.check(100_000, 100_000).is_ok());
        assert!(guard.check(100_000, 130_000).is_err());
        assert!(OdometerGuard::Unchecked.check(100_000, 130_000).is_ok());
    }

    #[test]
    fn test_non_decreasing_guard_rejects_rollback() {
        let guard = OdometerGuard::NonDecreasing;
        assert!(guard.check(100_000, 100_000).is_ok());
        assert!(guard.check(100_000, 180_000).is_ok());
        assert_eq!(
            guard.check(100_000, 0),
            Err(MileageRejection::Decreasing { current: 100_000, requested: 0 })
        );
    }
}
