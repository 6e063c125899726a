//! Data-input validation rules
//!
//! Checks an entered value against the rule selected for its field. An
//! empty value always passes; clearing a cell is how a formula goes back to
//! pending.

use crate::core::cells::{cell_assignments, parse_cell_id};
use crate::error::{CaljarError, CaljarResult};
use crate::types::{DataInputSection, ValidationRule, ValidationType, ValueMap};
use regex::Regex;

/// A value that breaks its field's rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleViolation {
    pub cell: String,
    pub label: String,
    pub value: String,
    pub reason: String,
}

/// A rule that cannot be applied, e.g. a `List` without options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleProblem {
    pub cell: String,
    pub label: String,
    pub message: String,
}

fn list_options(options: &str) -> Vec<&str> {
    options
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .collect()
}

fn custom_pattern(pattern: &str) -> Result<Regex, String> {
    // the whole value has to match, not a substring
    Regex::new(&format!("^(?:{})$", pattern)).map_err(|e| format!("invalid pattern: {}", e))
}

/// Check that a rule is usable on its own
pub fn check_rule(rule: &ValidationRule) -> Result<(), String> {
    let options = rule.options.as_deref().unwrap_or("").trim();
    match rule.kind {
        ValidationType::List if list_options(options).is_empty() => {
            Err("List validation needs comma-separated options".to_string())
        }
        ValidationType::Custom if options.is_empty() => {
            Err("Custom validation needs a pattern".to_string())
        }
        ValidationType::Custom => custom_pattern(options).map(|_| ()),
        _ => Ok(()),
    }
}

/// Check one value; `Err` carries the reason shown to the user
pub fn check_value(rule: &ValidationRule, value: &str) -> Result<(), String> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(());
    }

    match rule.kind {
        ValidationType::Any => Ok(()),
        ValidationType::WholeNumber => value
            .parse::<i64>()
            .map(|_| ())
            .map_err(|_| format!("'{}' is not a whole number", value)),
        ValidationType::Decimal => match value.parse::<f64>() {
            Ok(n) if n.is_finite() => Ok(()),
            _ => Err(format!("'{}' is not a decimal number", value)),
        },
        ValidationType::List => {
            let options = list_options(rule.options.as_deref().unwrap_or(""));
            if options.contains(&value) {
                Ok(())
            } else {
                Err(format!("'{}' is not one of: {}", value, options.join(", ")))
            }
        }
        ValidationType::Custom => {
            let pattern = rule.options.as_deref().unwrap_or("").trim();
            if pattern.is_empty() {
                return Ok(());
            }
            if custom_pattern(pattern)?.is_match(value) {
                Ok(())
            } else {
                Err(format!("'{}' does not match {}", value, pattern))
            }
        }
    }
}

/// Check the value about to be stored in `cell`
pub fn check_cell(sections: &[DataInputSection], cell: &str, value: &str) -> CaljarResult<()> {
    let assignment = cell_assignments(sections)
        .into_iter()
        .find(|a| a.cell_id == cell);

    let Some(assignment) = assignment else {
        // A cell identifier must belong to the layout; named
        // header/analysis fields carry no rule
        if parse_cell_id(cell).is_some() {
            return Err(CaljarError::InvalidValue {
                cell: cell.to_string(),
                reason: "no data-input field has this identifier".to_string(),
            });
        }
        return Ok(());
    };

    let rule = &sections[assignment.section_index].fields[assignment.field_index].validation;
    check_value(rule, value).map_err(|reason| CaljarError::InvalidValue {
        cell: format!("{} ({})", cell, assignment.label),
        reason,
    })
}

/// Every stored value that breaks its rule, in layout order
pub fn check_values(sections: &[DataInputSection], values: &ValueMap) -> Vec<RuleViolation> {
    let mut violations = Vec::new();

    for assignment in cell_assignments(sections) {
        let Some(value) = values.get(&assignment.cell_id) else {
            continue;
        };
        let rule = &sections[assignment.section_index].fields[assignment.field_index].validation;
        if let Err(reason) = check_value(rule, value) {
            violations.push(RuleViolation {
                cell: assignment.cell_id,
                label: assignment.label,
                value: value.clone(),
                reason,
            });
        }
    }

    violations
}

/// Every field whose rule cannot be applied
pub fn check_rules(sections: &[DataInputSection]) -> Vec<RuleProblem> {
    cell_assignments(sections)
        .into_iter()
        .filter_map(|a| {
            let rule = &sections[a.section_index].fields[a.field_index].validation;
            check_rule(rule).err().map(|message| RuleProblem {
                cell: a.cell_id,
                label: a.label,
                message,
            })
        })
        .collect()
}
