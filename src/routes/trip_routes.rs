use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::controllers::trip_controller::TripController;
use crate::dto::{ApiResponse, CancelSessionRequest, EndSessionRequest, ListQuery, StartSessionRequest};
use crate::middleware::AuthenticatedUser;
use crate::models::Trip;
use crate::services::TripEndOutcome;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_trip_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_trips))
        .route("/start", post(start_trip))
        .route("/active", get(active_trip))
        .route("/:id", get(get_trip))
        .route("/:id/end", post(end_trip))
        .route("/:id/cancel", post(cancel_trip))
}

async fn start_trip(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<StartSessionRequest>,
) -> Result<Json<ApiResponse<Trip>>, AppError> {
    let controller = TripController::new(state.trips.clone());
    let response = controller.start(&user, request).await?;
    Ok(Json(response))
}

async fn end_trip(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<EndSessionRequest>,
) -> Result<Json<ApiResponse<TripEndOutcome>>, AppError> {
    let controller = TripController::new(state.trips.clone());
    let response = controller.end(&user, id, request).await?;
    Ok(Json(response))
}

// El cuerpo es opcional: vacío se cancela sin motivo, malformado es 400
async fn cancel_trip(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    body: Bytes,
) -> Result<Json<ApiResponse<Trip>>, AppError> {
    let request = parse_cancel_body(&body)?;
    let controller = TripController::new(state.trips.clone());
    let response = controller.cancel(&user, id, request).await?;
    Ok(Json(response))
}

fn parse_cancel_body(body: &[u8]) -> Result<CancelSessionRequest, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(CancelSessionRequest::default());
    }
    serde_json::from_slice(body).map_err(|e| AppError::BadRequest(format!("JSON inválido: {}", e)))
}

async fn active_trip(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<ApiResponse<Option<Trip>>>, AppError> {
    let controller = TripController::new(state.trips.clone());
    let response = controller.active(&user).await?;
    Ok(Json(response))
}

async fn get_trip(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Trip>>, AppError> {
    let controller = TripController::new(state.trips.clone());
    let response = controller.get(&user, id).await?;
    Ok(Json(response))
}

async fn list_trips(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<Vec<Trip>>>, AppError> {
    let controller = TripController::new(state.trips.clone());
    let response = controller.list(&user, query).await?;
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_body_parsing() {
        assert!(parse_cancel_body(b"").unwrap().reason.is_none());
        assert!(parse_cancel_body(b"  \n").unwrap().reason.is_none());

        let request = parse_cancel_body(br#"{"reason":"wrong vehicle"}"#).unwrap();
        assert_eq!(request.reason.as_deref(), Some("wrong vehicle"));

        assert!(matches!(parse_cancel_body(b"{reason:"), Err(AppError::BadRequest(_))));
    }
}
