use std::sync::Arc;

use uuid::Uuid;
use validator::Validate;

use crate::dto::{ApiResponse, CancelSessionRequest, EndSessionRequest, ListQuery, StartSessionRequest};
use crate::middleware::AuthenticatedUser;
use crate::models::Trip;
use crate::services::{TripEndOutcome, TripService};
use crate::utils::errors::AppError;

pub struct TripController {
    service: Arc<TripService>,
}

impl TripController {
    pub fn new(service: Arc<TripService>) -> Self {
        Self { service }
    }

    pub async fn start(
        &self,
        user: &AuthenticatedUser,
        request: StartSessionRequest,
    ) -> Result<ApiResponse<Trip>, AppError> {
        request.validate()?;

        let trip = self.service.start(request, user.user_id, user.tenant_id).await?;
        Ok(ApiResponse::success_with_message(trip, "Viaje iniciado"))
    }

    pub async fn end(
        &self,
        user: &AuthenticatedUser,
        trip_id: Uuid,
        request: EndSessionRequest,
    ) -> Result<ApiResponse<TripEndOutcome>, AppError> {
        request.validate()?;

        let outcome = self.service.end(trip_id, request, user.user_id, user.tenant_id).await?;
        Ok(ApiResponse::success_with_message(outcome, "Viaje completado"))
    }

    pub async fn cancel(
        &self,
        user: &AuthenticatedUser,
        trip_id: Uuid,
        request: CancelSessionRequest,
    ) -> Result<ApiResponse<Trip>, AppError> {
        request.validate()?;

        let trip = self.service.cancel(trip_id, request, user.user_id, user.tenant_id).await?;
        Ok(ApiResponse::success_with_message(trip, "Viaje cancelado"))
    }

    /// El viaje en curso del conductor, si existe
    pub async fn active(&self, user: &AuthenticatedUser) -> Result<ApiResponse<Option<Trip>>, AppError> {
        let trip = self.service.active_trip(user.user_id, user.tenant_id).await?;
        Ok(ApiResponse::success(trip))
    }

    pub async fn get(&self, user: &AuthenticatedUser, trip_id: Uuid) -> Result<ApiResponse<Trip>, AppError> {
        let trip = self.service.get_trip(trip_id, user.user_id, user.tenant_id).await?;
        Ok(ApiResponse::success(trip))
    }

    pub async fn list(&self, user: &AuthenticatedUser, query: ListQuery) -> Result<ApiResponse<Vec<Trip>>, AppError> {
        let trips = self
            .service
            .list_trips(user.user_id, user.tenant_id, query.page())
            .await?;
        Ok(ApiResponse::success(trips))
    }
}
