use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::models::{Defect, Location};
use crate::repositories::Page;
use crate::utils::validation::{validate_defects, validate_location, validate_photos};

// Request para iniciar un viaje
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionRequest {
    pub vehicle_id: Uuid,

    #[validate(range(min = 0))]
    pub start_odometer: i64,

    #[validate(range(min = 0, max = 100))]
    pub start_fuel_level: i32,

    #[serde(default)]
    #[validate(length(max = 20), custom = "validate_photos")]
    pub start_photos: Vec<String>,

    #[validate(custom = "validate_defects")]
    pub start_defects: Option<Vec<Defect>>,

    #[validate(length(max = 2000))]
    pub start_notes: Option<String>,

    #[validate(custom = "validate_location")]
    pub start_location: Option<Location>,
}

// Request para finalizar un viaje
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EndSessionRequest {
    #[validate(range(min = 0))]
    pub end_odometer: i64,

    #[validate(range(min = 0, max = 100))]
    pub end_fuel_level: i32,

    #[serde(default)]
    #[validate(length(max = 20), custom = "validate_photos")]
    pub end_photos: Vec<String>,

    #[validate(custom = "validate_defects")]
    pub end_defects: Option<Vec<Defect>>,

    #[validate(length(max = 2000))]
    pub end_notes: Option<String>,

    #[validate(custom = "validate_location")]
    pub end_location: Option<Location>,
}

// Request para cancelar un viaje
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CancelSessionRequest {
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

// Query de paginación para el historial
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ListQuery {
    pub fn page(&self) -> Page {
        let defaults = Page::default();
        Page {
            limit: self.limit.unwrap_or(defaults.limit).clamp(1, 100),
            offset: self.offset.unwrap_or(defaults.offset).max(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_start_request_validation() {
        let valid: StartSessionRequest = serde_json::from_value(json!({
            "vehicleId": Uuid::new_v4(),
            "startOdometer": 100000,
            "startFuelLevel": 75,
            "startPhotos": ["photos/front.jpg"]
        }))
        .unwrap();
        assert!(valid.validate().is_ok());
        assert!(valid.start_defects.is_none());

        let mut fuel = valid.clone();
        fuel.start_fuel_level = 101;
        assert!(fuel.validate().is_err());

        let mut odometer = valid;
        odometer.start_odometer = -1;
        assert!(odometer.validate().is_err());
    }

    #[test]
    fn test_list_query_clamps() {
        let page = ListQuery { limit: Some(10_000), offset: Some(-3) }.page();
        assert_eq!(page.limit, 100);
        assert_eq!(page.offset, 0);

        let page = ListQuery::default().page();
        assert_eq!(page.limit, 50);
    }
}
