//! Modelos del sistema
//!
//! Este módulo contiene los modelos de datos del núcleo de viajes y
//! kilometraje, alineados con el schema PostgreSQL de `migrations/`.

pub mod defect;
pub mod incident;
pub mod mileage;
pub mod trip;
pub mod vehicle;

pub use defect::{Defect, DefectSeverity, DefectType};
pub use incident::{IncidentReport, IncidentType, NewIncidentReport};
pub use mileage::{
    MileageEntry, MileageRejection, MileageSource, OdometerGuard, OdometerReading, ReconcileOutcome,
};
pub use trip::{EndSnapshot, Location, StartSnapshot, Trip, TripStatus, TripTransitionError};
pub use vehicle::{Vehicle, VehicleStatus};
