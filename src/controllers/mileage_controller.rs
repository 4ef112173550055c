use std::sync::Arc;

use uuid::Uuid;
use validator::Validate;

use crate::dto::{ApiResponse, ListQuery, ManualMileageUpdateRequest, RecordReadingRequest};
use crate::middleware::AuthenticatedUser;
use crate::models::MileageEntry;
use crate::services::{MileageLedger, ReconcileOutcome};
use crate::utils::errors::AppError;

pub struct MileageController {
    ledger: Arc<MileageLedger>,
}

impl MileageController {
    pub fn new(ledger: Arc<MileageLedger>) -> Self {
        Self { ledger }
    }

    /// Actualización manual del conductor
    pub async fn manual_update(
        &self,
        user: &AuthenticatedUser,
        vehicle_id: Uuid,
        request: ManualMileageUpdateRequest,
    ) -> Result<ApiResponse<MileageEntry>, AppError> {
        request.validate()?;

        let entry = self
            .ledger
            .manual_update(vehicle_id, request.mileage, user.user_id, user.tenant_id, request.notes)
            .await?;
        Ok(ApiResponse::success_with_message(entry, "Kilometraje actualizado"))
    }

    /// Lectura de taller o inspección, solo personal de flota
    pub async fn record(
        &self,
        user: &AuthenticatedUser,
        vehicle_id: Uuid,
        request: RecordReadingRequest,
    ) -> Result<ApiResponse<MileageEntry>, AppError> {
        user.require_staff()?;
        request.validate()?;

        let entry = self
            .ledger
            .record(
                vehicle_id,
                request.mileage,
                request.source,
                user.tenant_id,
                request.notes,
                Some(user.user_id),
            )
            .await?;
        Ok(ApiResponse::success_with_message(entry, "Lectura registrada"))
    }

    pub async fn history(
        &self,
        user: &AuthenticatedUser,
        vehicle_id: Uuid,
        query: ListQuery,
    ) -> Result<ApiResponse<Vec<MileageEntry>>, AppError> {
        let entries = self.ledger.history(vehicle_id, user.tenant_id, query.page()).await?;
        Ok(ApiResponse::success(entries))
    }

    pub async fn reconcile(
        &self,
        user: &AuthenticatedUser,
        vehicle_id: Uuid,
    ) -> Result<ApiResponse<ReconcileOutcome>, AppError> {
        user.require_staff()?;

        let outcome = self.ledger.reconcile(vehicle_id, user.tenant_id).await?;
        Ok(ApiResponse::success(outcome))
    }
}
