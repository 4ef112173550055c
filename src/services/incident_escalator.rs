//! Escalado de daños a reportes de incidente
//!
//! La creación del reporte es un canal lateral de mejor esfuerzo: se espera
//! su resultado, se registra en el log y se devuelve al llamador, pero nunca
//! revierte el cierre del viaje ni el libro de kilometraje.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{error, info};
use uuid::Uuid;

use crate::models::{Defect, IncidentReport, IncidentType, NewIncidentReport, Trip};

#[derive(Error, Debug, Clone)]
pub enum EscalationError {
    #[error("incident report creation failed: {0}")]
    Creation(String),
}

/// Capacidad de creación de reportes, propiedad del sistema de reportes
#[async_trait]
pub trait ReportCreator: Send + Sync {
    async fn create(&self, report: NewIncidentReport) -> Result<IncidentReport, EscalationError>;
}

/// Resultado observable del escalado al cerrar un viaje
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EscalationOutcome {
    NotRequired,
    Created {
        #[serde(rename = "reportId")]
        report_id: Uuid,
    },
    Failed { reason: String },
}

pub struct IncidentEscalator {
    creator: Arc<dyn ReportCreator>,
}

impl IncidentEscalator {
    pub fn new(creator: Arc<dyn ReportCreator>) -> Self {
        Self { creator }
    }

    /// Crea un único reporte DAMAGE que agrupa todos los defectos severos nuevos
    pub async fn escalate(&self, trip: &Trip, severe: &[&Defect]) -> EscalationOutcome {
        if severe.is_empty() {
            return EscalationOutcome::NotRequired;
        }

        let report = NewIncidentReport {
            vehicle_id: trip.vehicle_id,
            driver_id: trip.driver_id,
            tenant_id: trip.tenant_id,
            incident_type: IncidentType::Damage,
            description: damage_description(severe),
            notes: Some(report_notes(trip)),
        };

        match self.creator.create(report).await {
            Ok(created) => {
                info!(
                    trip_id = %trip.id,
                    report_id = %created.id,
                    defects = severe.len(),
                    "🚨 Reporte de daños creado al finalizar el viaje"
                );
                EscalationOutcome::Created { report_id: created.id }
            }
            Err(e) => {
                error!(trip_id = %trip.id, error = %e, "❌ No se pudo crear el reporte de daños");
                EscalationOutcome::Failed { reason: e.to_string() }
            }
        }
    }
}

fn damage_description(severe: &[&Defect]) -> String {
    let details: Vec<String> = severe
        .iter()
        .map(|d| format!("{} at {}: {}", d.defect_type, d.location, d.description))
        .collect();
    format!("Severe damage found at end of trip: {}", details.join("; "))
}

fn report_notes(trip: &Trip) -> String {
    let mut notes = format!("Created automatically when trip {} was completed", trip.id);
    if let Some(end_notes) = trip.end.as_ref().and_then(|e| e.notes.as_deref()) {
        notes.push_str(&format!(". Driver notes: {}", end_notes));
    }
    notes
}

/// Creador de reportes en memoria
#[derive(Debug, Default)]
pub struct InMemoryReportCreator {
    reports: Mutex<Vec<IncidentReport>>,
    failure: Mutex<Option<String>>,
}

impl InMemoryReportCreator {
    pub fn new() -> Self {
        Self::default()
    }

    /// A partir de ahora toda creación falla con `reason`
    pub async fn fail_with(&self, reason: &str) {
        *self.failure.lock().await = Some(reason.to_string());
    }

    pub async fn reports(&self) -> Vec<IncidentReport> {
        self.reports.lock().await.clone()
    }
}

#[async_trait]
impl ReportCreator for InMemoryReportCreator {
    async fn create(&self, report: NewIncidentReport) -> Result<IncidentReport, EscalationError> {
        if let Some(reason) = self.failure.lock().await.clone() {
            return Err(EscalationError::Creation(reason));
        }
        let created = IncidentReport::open(report);
        self.reports.lock().await.push(created.clone());
        Ok(created)
    }
}
