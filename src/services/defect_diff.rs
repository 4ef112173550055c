//! Diff de checklists de defectos
//!
//! Funciones puras: comparan el checklist de inicio con el de fin por `id`
//! de defecto. El resultado conserva el orden del checklist final y no
//! depende del orden del checklist inicial.

use std::collections::HashSet;

use crate::models::Defect;

/// Defectos del checklist final cuyo id no aparece en el inicial
pub fn new_defects<'a>(start: &[Defect], end: &'a [Defect]) -> Vec<&'a Defect> {
    let known: HashSet<&str> = start.iter().map(|d| d.id.as_str()).collect();
    end.iter().filter(|d| !known.contains(d.id.as_str())).collect()
}

/// Defectos nuevos con gravedad `severe`
pub fn severe_new<'a>(start: &[Defect], end: &'a [Defect]) -> Vec<&'a Defect> {
    new_defects(start, end).into_iter().filter(|d| d.is_severe()).collect()
}
