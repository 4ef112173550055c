//! Modelo de IncidentReport
//!
//! El ciclo de vida del reporte (acknowledge/resolve) pertenece al sistema de
//! reportes; aquí solo existe el contrato de creación.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

/// Tipo de incidente - mapea al ENUM incident_type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "incident_type", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IncidentType {
    Damage,
    Accident,
    Mechanical,
    Other,
}

/// Datos para crear un reporte de incidente
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewIncidentReport {
    pub vehicle_id: Uuid,
    pub driver_id: Uuid,
    pub tenant_id: Uuid,
    pub incident_type: IncidentType,
    pub description: String,
    pub notes: Option<String>,
}

/// Reporte de incidente - mapea a la tabla incident_reports
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct IncidentReport {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub vehicle_id: Uuid,
    pub driver_id: Uuid,
    pub incident_type: IncidentType,
    pub description: String,
    pub notes: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl IncidentReport {
    pub fn open(report: NewIncidentReport) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id: report.tenant_id,
            vehicle_id: report.vehicle_id,
            driver_id: report.driver_id,
            incident_type: report.incident_type,
            description: report.description,
            notes: report.notes,
            status: "open".to_string(),
            created_at: Utc::now(),
        }
    }
}
