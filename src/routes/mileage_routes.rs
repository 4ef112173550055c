use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::controllers::mileage_controller::MileageController;
use crate::dto::{ApiResponse, ListQuery, ManualMileageUpdateRequest, RecordReadingRequest};
use crate::middleware::AuthenticatedUser;
use crate::models::MileageEntry;
use crate::services::ReconcileOutcome;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_mileage_router() -> Router<AppState> {
    Router::new()
        .route("/:id/mileage", post(update_mileage).get(mileage_history))
        .route("/:id/mileage/readings", post(record_reading))
        .route("/:id/mileage/reconcile", post(reconcile_mileage))
}

async fn update_mileage(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<ManualMileageUpdateRequest>,
) -> Result<Json<ApiResponse<MileageEntry>>, AppError> {
    let controller = MileageController::new(state.ledger.clone());
    let response = controller.manual_update(&user, id, request).await?;
    Ok(Json(response))
}

async fn mileage_history(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<Vec<MileageEntry>>>, AppError> {
    let controller = MileageController::new(state.ledger.clone());
    let response = controller.history(&user, id, query).await?;
    Ok(Json(response))
}

async fn record_reading(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<RecordReadingRequest>,
) -> Result<Json<ApiResponse<MileageEntry>>, AppError> {
    let controller = MileageController::new(state.ledger.clone());
    let response = controller.record(&user, id, request).await?;
    Ok(Json(response))
}

async fn reconcile_mileage(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ReconcileOutcome>>, AppError> {
    let controller = MileageController::new(state.ledger.clone());
    let response = controller.reconcile(&user, id).await?;
    Ok(Json(response))
}
