use serde::Deserialize;
use validator::Validate;

use crate::models::MileageSource;

// Request del conductor para actualizar el kilometraje
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ManualMileageUpdateRequest {
    #[validate(range(min = 0))]
    pub mileage: i64,

    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

// Request de taller/inspección para registrar una lectura
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RecordReadingRequest {
    #[validate(range(min = 0))]
    pub mileage: i64,

    pub source: MileageSource,

    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}
