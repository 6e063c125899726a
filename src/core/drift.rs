//! Identifier drift between two layouts of the same template
//!
//! Formulas store positional identifiers, so inserting, removing or moving a
//! field renumbers every later field while saved formulas keep the old
//! numbers. These helpers compare a layout before and after an edit using
//! the stable field ids. Nothing here is applied automatically.

use crate::core::cells::{CellMap, CELL_REF};
use crate::core::formula::referenced_cells;
use crate::types::{DataInputSection, FormulaField};

/// A field whose identifier changed between two layouts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellDrift {
    pub field_id: String,
    pub label: String,
    pub before: String,
    pub after: String,
}

/// A formula affected by a structural edit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormulaDrift {
    pub index: usize,
    pub label: String,
    pub formula: String,
    /// Referenced identifiers that now point at a different field
    pub moved: Vec<CellDrift>,
    /// Referenced identifiers whose field no longer exists
    pub removed: Vec<String>,
    /// The formula rewritten to follow its fields
    pub rebound: String,
}

/// Fields present in both layouts whose identifier changed, in `before` order
pub fn detect_drift(before: &[DataInputSection], after: &[DataInputSection]) -> Vec<CellDrift> {
    let after_map = CellMap::new(after);

    crate::core::cells::cell_assignments(before)
        .into_iter()
        .filter_map(|assignment| {
            let now = after_map.cell_for_field(&assignment.field_id)?;
            (now != assignment.cell_id).then(|| CellDrift {
                field_id: assignment.field_id,
                label: assignment.label,
                before: assignment.cell_id,
                after: now.to_string(),
            })
        })
        .collect()
}

/// Rewrite identifiers so the formula keeps pointing at the same fields.
///
/// Identifiers whose field was removed, or that were never assigned in
/// `before`, are left as written.
pub fn rebind_formula(
    formula: &str,
    before: &[DataInputSection],
    after: &[DataInputSection],
) -> String {
    let before_map = CellMap::new(before);
    let after_map = CellMap::new(after);
    rebind_with(formula, &before_map, &after_map)
}

fn rebind_with(formula: &str, before: &CellMap, after: &CellMap) -> String {
    CELL_REF
        .replace_all(formula, |caps: &regex::Captures| {
            let id = &caps[0];
            before
                .field_for_cell(id)
                .and_then(|field| after.cell_for_field(field))
                .unwrap_or(id)
                .to_string()
        })
        .into_owned()
}

/// Formulas that reference a moved or removed field, in formula order
pub fn formula_drift(
    formulas: &[FormulaField],
    before: &[DataInputSection],
    after: &[DataInputSection],
) -> Vec<FormulaDrift> {
    let before_map = CellMap::new(before);
    let after_map = CellMap::new(after);
    let drift = detect_drift(before, after);

    formulas
        .iter()
        .enumerate()
        .filter_map(|(index, formula)| {
            let refs = referenced_cells(&formula.value);

            let moved: Vec<CellDrift> = drift
                .iter()
                .filter(|d| refs.contains(&d.before))
                .cloned()
                .collect();
            let removed: Vec<String> = refs
                .iter()
                .filter(|id| {
                    before_map
                        .field_for_cell(id)
                        .is_some_and(|field| after_map.cell_for_field(field).is_none())
                })
                .cloned()
                .collect();

            if moved.is_empty() && removed.is_empty() {
                return None;
            }

            Some(FormulaDrift {
                index,
                label: formula.label.clone(),
                formula: formula.value.clone(),
                moved,
                removed,
                rebound: rebind_with(&formula.value, &before_map, &after_map),
            })
        })
        .collect()
}
