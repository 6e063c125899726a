//! Positional cell identifiers for data-input fields
//!
//! Every data-input field is labelled `A<n>`, where `n` counts fields in
//! section-then-field order starting at 1. Identifiers are derived from the
//! layout on every call and never stored, so re-opening a saved template
//! reproduces the identifiers its formulas were written against.

use crate::types::DataInputSection;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// Whole-word cell identifier: `A` followed by digits
pub(crate) static CELL_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bA\d+\b").expect("cell identifier pattern is valid"));

/// Identifier of the field at (`section_index`, `field_index`).
///
/// Coordinates are not bounds-checked against the field list; a section
/// index past the end panics.
pub fn cell_id(sections: &[DataInputSection], section_index: usize, field_index: usize) -> String {
    let before: usize = sections[..section_index]
        .iter()
        .map(|s| s.fields.len())
        .sum();
    format_cell_id(before + field_index + 1)
}

pub fn format_cell_id(number: usize) -> String {
    format!("A{}", number)
}

/// 1-based position encoded in an identifier, e.g. `A12` → 12
pub fn parse_cell_id(id: &str) -> Option<usize> {
    let digits = id.strip_prefix('A')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().filter(|n| *n > 0)
}

/// A data-input field together with its derived identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellAssignment {
    pub cell_id: String,
    pub section_index: usize,
    pub field_index: usize,
    pub field_id: String,
    pub label: String,
    pub section_title: String,
}

/// Identifier assignment for every field, in layout order
pub fn cell_assignments(sections: &[DataInputSection]) -> Vec<CellAssignment> {
    let mut assignments = Vec::new();
    let mut number = 0;

    for (section_index, section) in sections.iter().enumerate() {
        for (field_index, field) in section.fields.iter().enumerate() {
            number += 1;
            assignments.push(CellAssignment {
                cell_id: format_cell_id(number),
                section_index,
                field_index,
                field_id: field.id.clone(),
                label: field.label.clone(),
                section_title: section.title.clone(),
            });
        }
    }

    assignments
}

/// All identifiers of a layout, in order
pub fn cell_ids(sections: &[DataInputSection]) -> Vec<String> {
    let total: usize = sections.iter().map(|s| s.fields.len()).sum();
    (1..=total).map(format_cell_id).collect()
}

/// Two-way mapping between stable field ids and positional identifiers for
/// one layout. Rebuild it after every structural edit.
#[derive(Debug, Clone, Default)]
pub struct CellMap {
    by_field: HashMap<String, String>,
    by_cell: HashMap<String, String>,
}

impl CellMap {
    pub fn new(sections: &[DataInputSection]) -> Self {
        let mut map = Self::default();
        for assignment in cell_assignments(sections) {
            map.by_cell
                .insert(assignment.cell_id.clone(), assignment.field_id.clone());
            // Duplicate ids keep their first cell
            map.by_field
                .entry(assignment.field_id)
                .or_insert(assignment.cell_id);
        }
        map
    }

    pub fn cell_for_field(&self, field_id: &str) -> Option<&str> {
        self.by_field.get(field_id).map(String::as_str)
    }

    pub fn field_for_cell(&self, cell_id: &str) -> Option<&str> {
        self.by_cell.get(cell_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_cell.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_cell.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DataInputField;

    fn layout(counts: &[usize]) -> Vec<DataInputSection> {
        counts
            .iter()
            .enumerate()
            .map(|(s, n)| {
                DataInputSection::new(
                    format!("S{}", s),
                    (0..*n)
                        .map(|f| DataInputField::new(format!("f{}-{}", s, f)))
                        .collect(),
                )
            })
            .collect()
    }

    #[test]
    fn test_cell_id_counts_preceding_sections() {
        let sections = layout(&[2, 1]);
        assert_eq!(cell_id(&sections, 0, 0), "A1");
        assert_eq!(cell_id(&sections, 0, 1), "A2");
        assert_eq!(cell_id(&sections, 1, 0), "A3");
    }

    #[test]
    fn test_cell_id_is_deterministic() {
        let sections = layout(&[3, 0, 4]);
        let first: Vec<String> = (0..4).map(|f| cell_id(&sections, 2, f)).collect();
        let second: Vec<String> = (0..4).map(|f| cell_id(&sections, 2, f)).collect();
        assert_eq!(first, second);
        assert_eq!(first, vec!["A4", "A5", "A6", "A7"]);
    }

    #[test]
    #[should_panic]
    fn test_cell_id_panics_past_last_section() {
        let sections = layout(&[1]);
        cell_id(&sections, 2, 0);
    }

    #[test]
    fn test_assignments_match_cell_id() {
        let sections = layout(&[2, 3]);
        let assignments = cell_assignments(&sections);
        assert_eq!(assignments.len(), 5);
        for a in &assignments {
            assert_eq!(a.cell_id, cell_id(&sections, a.section_index, a.field_index));
        }
        assert_eq!(assignments[3].label, "f1-1");
        assert_eq!(cell_ids(&sections), vec!["A1", "A2", "A3", "A4", "A5"]);
    }

    #[test]
    fn test_parse_cell_id() {
        assert_eq!(parse_cell_id("A12"), Some(12));
        assert_eq!(parse_cell_id("A0"), None);
        assert_eq!(parse_cell_id("A"), None);
        assert_eq!(parse_cell_id("B1"), None);
        assert_eq!(parse_cell_id("A1x"), None);
    }

    #[test]
    fn test_cell_map_round_trip() {
        let sections = layout(&[1, 2]);
        let map = CellMap::new(&sections);
        let field_id = &sections[1].fields[0].id;
        assert_eq!(map.cell_for_field(field_id), Some("A2"));
        assert_eq!(map.field_for_cell("A2"), Some(field_id.as_str()));
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn test_cell_ref_pattern_respects_word_boundaries() {
        let found: Vec<&str> = CELL_REF
            .find_iter("A1 + A10 * BA2 + A3_x")
            .map(|m| m.as_str())
            .collect();
        assert_eq!(found, vec!["A1", "A10"]);
    }
}
