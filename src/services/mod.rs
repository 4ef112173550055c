//! Services module
//!
//! Lógica de negocio del núcleo: máquina de estados de viajes, libro de
//! kilometraje, diff de defectos y escalado de daños.

pub mod defect_diff;
pub mod incident_escalator;
pub mod mileage_ledger;
pub mod trip_service;

pub use incident_escalator::{EscalationOutcome, IncidentEscalator, InMemoryReportCreator, ReportCreator};
pub use mileage_ledger::{MileageLedger, ReconcileOutcome};
pub use trip_service::{TripEndOutcome, TripService};
