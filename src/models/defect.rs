//! Modelo de Defect
//!
//! Los defectos no se persisten por separado: viajan embebidos (JSONB) en las
//! instantáneas de inicio y fin de cada viaje.

use serde::{Deserialize, Serialize};

/// Tipo de defecto observado en el vehículo
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DefectType {
    Scratch,
    Dent,
    Broken,
    Dirty,
    Missing,
    Other,
}

impl std::fmt::Display for DefectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Scratch => "scratch",
            Self::Dent => "dent",
            Self::Broken => "broken",
            Self::Dirty => "dirty",
            Self::Missing => "missing",
            Self::Other => "other",
        };
        f.write_str(s)
    }
}

/// Gravedad del defecto
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DefectSeverity {
    Minor,
    Moderate,
    Severe,
}

/// Defecto reportado por el conductor en el checklist
///
/// El `id` lo genera el cliente y se conserva entre el checklist de inicio y
/// el de fin; es la clave del diff.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Defect {
    pub id: String,
    #[serde(rename = "type")]
    pub defect_type: DefectType,
    pub location: String,
    pub severity: DefectSeverity,
    pub description: String,
    #[serde(default)]
    pub photos: Vec<String>,
}

impl Defect {
    pub fn is_severe(&self) -> bool {
        self.severity == DefectSeverity::Severe
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defect_wire_format() {
        let defect: Defect = serde_json::from_value(json!({
            "id": "d-1",
            "type": "dent",
            "location": "rear bumper",
            "severity": "severe",
            "description": "deep dent"
        }))
        .unwrap();

        assert_eq!(defect.defect_type, DefectType::Dent);
        assert!(defect.is_severe());
        assert!(defect.photos.is_empty());
    }
}
