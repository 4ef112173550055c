//! Utilidades de validación
//!
//! Validadores personalizados para `#[validate(custom = "...")]` en los DTOs
//! de viajes y kilometraje.

use std::collections::HashSet;

use validator::ValidationError;

use crate::models::{Defect, Location};

/// Validar formato de coordenadas GPS
pub fn validate_location(location: &Location) -> Result<(), ValidationError> {
    if !(-90.0..=90.0).contains(&location.latitude) {
        let mut error = ValidationError::new("latitude");
        error.add_param("value".into(), &location.latitude);
        error.add_param("range".into(), &"-90.0 to 90.0".to_string());
        return Err(error);
    }

    if !(-180.0..=180.0).contains(&location.longitude) {
        let mut error = ValidationError::new("longitude");
        error.add_param("value".into(), &location.longitude);
        error.add_param("range".into(), &"-180.0 to 180.0".to_string());
        return Err(error);
    }

    Ok(())
}

/// Validar el checklist de defectos: ids presentes y sin duplicados
pub fn validate_defects(defects: &Vec<Defect>) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for defect in defects {
        if defect.id.trim().is_empty() {
            return Err(ValidationError::new("defect_id_required"));
        }
        if !seen.insert(defect.id.as_str()) {
            let mut error = ValidationError::new("defect_id_duplicated");
            error.add_param("id".into(), &defect.id);
            return Err(error);
        }
    }
    Ok(())
}

/// Validar que ninguna referencia de foto esté vacía
pub fn validate_photos(photos: &Vec<String>) -> Result<(), ValidationError> {
    if photos.iter().any(|p| p.trim().is_empty()) {
        return Err(ValidationError::new("photo_reference_empty"));
    }
    Ok(())
}
