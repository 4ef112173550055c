use async_trait::async_trait;
use sqlx::PgPool;

use crate::models::{IncidentReport, NewIncidentReport};
use crate::services::incident_escalator::{EscalationError, ReportCreator};

/// Crea reportes de incidente en la tabla `incident_reports`
pub struct IncidentRepository {
    pool: PgPool,
}

impl IncidentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReportCreator for IncidentRepository {
    async fn create(&self, report: NewIncidentReport) -> Result<IncidentReport, EscalationError> {
        let report = IncidentReport::open(report);

        sqlx::query_as::<_, IncidentReport>(
            r#"
            INSERT INTO incident_reports (id, tenant_id, vehicle_id, driver_id, incident_type, description, notes, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(report.id)
        .bind(report.tenant_id)
        .bind(report.vehicle_id)
        .bind(report.driver_id)
        .bind(report.incident_type)
        .bind(&report.description)
        .bind(&report.notes)
        .bind(&report.status)
        .bind(report.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| EscalationError::Creation(format!("Error creating incident report: {}", e)))
    }
}
