//! DTOs de la API
//!
//! Requests validados con `validator` y el sobre genérico de respuesta.

pub mod api_response;
pub mod mileage_dto;
pub mod trip_dto;

pub use api_response::ApiResponse;
pub use mileage_dto::{ManualMileageUpdateRequest, RecordReadingRequest};
pub use trip_dto::{CancelSessionRequest, EndSessionRequest, ListQuery, StartSessionRequest};
