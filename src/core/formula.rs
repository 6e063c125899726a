//! Formula evaluation against a value map
//!
//! A formula is plain expression text whose cell identifiers are replaced by
//! the current cell values before the expression engine sees it. Evaluation
//! never fails: incomplete input yields [`Evaluation::Pending`] and anything
//! that cannot be computed yields [`Evaluation::Invalid`].

use crate::core::cells::{parse_cell_id, CELL_REF};
use crate::core::expression::{self, find_function, EvalContext, Value};
use crate::error::{formula_error, CaljarError, CaljarResult, FormulaErrorContext};
use crate::types::ValueMap;
use std::collections::BTreeSet;
use std::fmt;
use tracing::trace;

pub const PENDING_MESSAGE: &str = "Calculation pending...";
pub const INVALID_MESSAGE: &str = "Invalid formula or data";

/// Outcome of evaluating one formula
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    /// Computed; numbers are already rounded to two decimals
    Ready(Value),
    /// A referenced cell is missing or empty
    Pending,
    /// The formula or its data cannot be computed
    Invalid,
}

impl Evaluation {
    /// Text shown next to the formula label
    pub fn display(&self) -> String {
        match self {
            Evaluation::Ready(Value::Number(n)) => format_number(*n),
            Evaluation::Ready(value) => value.as_text(),
            Evaluation::Pending => PENDING_MESSAGE.to_string(),
            Evaluation::Invalid => INVALID_MESSAGE.to_string(),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Evaluation::Ready(_))
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Evaluation::Ready(Value::Number(n)) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

/// Round half away from zero to two decimals
pub fn round2(n: f64) -> f64 {
    // Past 1e15 an f64 has no hundredths left, and scaling could overflow
    if n.abs() >= 1e15 {
        return n;
    }
    // + 0.0 folds -0.0 into 0.0 so tiny negatives never print as "-0.00"
    (n * 100.0).round() / 100.0 + 0.0
}

/// Fixed-point, two decimals, no grouping
pub fn format_number(n: f64) -> String {
    format!("{:.2}", round2(n))
}

fn strip_equals(formula: &str) -> &str {
    formula.strip_prefix('=').unwrap_or(formula)
}

/// Distinct cell identifiers a formula mentions
pub fn referenced_cells(formula: &str) -> BTreeSet<String> {
    CELL_REF
        .find_iter(strip_equals(formula))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Replace every whole-word identifier that has a value in `values`.
///
/// Replacement happens in a single pass, so a value that itself looks like
/// an identifier is never expanded again.
pub fn substitute(expression: &str, values: &ValueMap) -> String {
    CELL_REF
        .replace_all(expression, |caps: &regex::Captures| {
            let id = &caps[0];
            values.get(id).cloned().unwrap_or_else(|| id.to_string())
        })
        .into_owned()
}

/// Evaluate `formula` against the current value map
pub fn evaluate(formula: &str, values: &ValueMap) -> Evaluation {
    let body = strip_equals(formula);

    let refs = referenced_cells(body);
    if let Some(missing) = refs
        .iter()
        .find(|id| values.get(*id).map_or(true, |v| v.is_empty()))
    {
        trace!(formula, cell = %missing, "pending");
        return Evaluation::Pending;
    }

    // the engine strips the single leading '=' itself
    let substituted = substitute(formula, values);
    let result = expression::parse_expression(&substituted)
        .map_err(|e| e.to_string())
        .and_then(|ast| {
            expression::evaluate(&ast, &EvalContext::new()).map_err(|e| e.to_string())
        });

    match result {
        Ok(Value::Number(n)) if !n.is_finite() => {
            trace!(formula, %substituted, "non-finite result");
            Evaluation::Invalid
        }
        Ok(Value::Number(n)) => Evaluation::Ready(Value::Number(round2(n))),
        Ok(other) => Evaluation::Ready(other),
        Err(error) => {
            trace!(formula, %substituted, %error, "invalid");
            Evaluation::Invalid
        }
    }
}

/// Authoring-time check: the formula parses, every identifier is one of
/// `known_cells`, and every function exists with an accepted argument count.
/// Nothing is evaluated.
pub fn validate_formula(formula: &str, location: &str, known_cells: &[String]) -> CaljarResult<()> {
    let fail = |error: String| {
        FormulaErrorContext::new(formula, location, error)
            .with_available_cells(known_cells.to_vec())
    };

    if strip_equals(formula).trim().is_empty() {
        return Err(formula_error(
            formula,
            location,
            "Formula is empty",
            Some("Insert a cell identifier or a function from the palette"),
        ));
    }

    let ast = expression::parse_expression(formula)
        .map_err(|e| CaljarError::Formula(fail(e.to_string())))?;

    let mut unknown_ref = None;
    ast.for_each_reference(&mut |name| {
        if unknown_ref.is_some() {
            return;
        }
        let is_cell = parse_cell_id(name).is_some();
        let known = known_cells.iter().any(|c| c == name);
        let constant = name.eq_ignore_ascii_case("TRUE") || name.eq_ignore_ascii_case("FALSE");
        if !(known || constant) {
            unknown_ref = Some((name.to_string(), is_cell));
        }
    });

    if let Some((name, is_cell)) = unknown_ref {
        let message = if is_cell {
            format!("Unknown cell '{}'", name)
        } else {
            format!("Unknown name '{}'", name)
        };
        let mut ctx = fail(message);
        if let Some(similar) = ctx.find_similar(&name) {
            ctx = ctx.with_suggestion(format!("Did you mean '{}'?", similar));
        }
        return Err(CaljarError::Formula(ctx));
    }

    let mut bad_call = None;
    ast.for_each_call(&mut |name, argc| {
        if bad_call.is_some() {
            return;
        }
        match find_function(name) {
            None => bad_call = Some((format!("Unknown function '{}'", name), None)),
            Some(spec) if !spec.accepts(argc) => {
                bad_call = Some((
                    format!(
                        "{} requires {} argument(s), got {}",
                        spec.name,
                        spec.arity(),
                        argc
                    ),
                    Some(format!("Example: {}", spec.example)),
                ))
            }
            Some(_) => {}
        }
    });

    if let Some((message, suggestion)) = bad_call {
        let mut ctx = fail(message);
        if let Some(s) = suggestion {
            ctx = ctx.with_suggestion(s);
        }
        return Err(CaljarError::Formula(ctx));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, &str)]) -> ValueMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn cells(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("A{}", i)).collect()
    }

    #[test]
    fn test_referenced_cells_is_a_set() {
        let refs = referenced_cells("=A1 + A1 * A10 - ABS(A2)");
        assert_eq!(refs.into_iter().collect::<Vec<_>>(), vec!["A1", "A10", "A2"]);
    }

    #[test]
    fn test_substitute_whole_words_only() {
        let map = values(&[("A1", "5"), ("A10", "2")]);
        assert_eq!(substitute("A1 + A10", &map), "5 + 2");
    }

    #[test]
    fn test_substitute_does_not_chain() {
        let map = values(&[("A1", "A2"), ("A2", "7")]);
        assert_eq!(substitute("A1 + A2", &map), "A2 + 7");
    }

    #[test]
    fn test_rounds_to_two_decimals() {
        let map = values(&[("A1", "10"), ("A2", "4")]);
        assert_eq!(evaluate("=A1/A2", &map).display(), "2.50");
        assert_eq!(evaluate("=1/3", &ValueMap::new()).display(), "0.33");
        assert_eq!(evaluate("2/3", &ValueMap::new()).display(), "0.67");
    }

    #[test]
    fn test_rounds_half_away_from_zero() {
        assert_eq!(format_number(0.125), "0.13");
        assert_eq!(format_number(-0.125), "-0.13");
        assert_eq!(format_number(-0.001), "0.00");
    }

    #[test]
    fn test_huge_finite_result_stays_fixed_point() {
        assert_eq!(round2(1e307), 1e307);
        assert_eq!(format_number(1e15), "1000000000000000.00");

        let map = values(&[("A1", "1e307")]);
        let shown = evaluate("=A1*1", &map).display();
        assert!(!shown.contains("inf"));
        assert!(shown.ends_with(".00"));
        assert!(shown.len() > 300);
    }

    #[test]
    fn test_deep_nesting_is_invalid() {
        let depth = 10_000;
        let formula = format!("{}1{}", "(".repeat(depth), ")".repeat(depth));
        assert_eq!(evaluate(&formula, &ValueMap::new()), Evaluation::Invalid);

        // Same through a substituted value
        let opened = "(".repeat(depth);
        let map = values(&[("A1", opened.as_str())]);
        assert_eq!(evaluate("=A1", &map), Evaluation::Invalid);
    }

    #[test]
    fn test_pending_when_any_reference_missing_or_empty() {
        let map = values(&[("A1", "10"), ("A2", "")]);
        assert_eq!(evaluate("A1 / A2", &map), Evaluation::Pending);
        assert_eq!(evaluate("A1 + A3", &map), Evaluation::Pending);
        assert_eq!(evaluate("A1 + A3", &map).display(), PENDING_MESSAGE);
    }

    #[test]
    fn test_pending_takes_precedence_over_syntax_errors() {
        let map = values(&[("A1", "10")]);
        assert_eq!(evaluate("A1 +* A2", &map), Evaluation::Pending);
    }

    #[test]
    fn test_invalid_cases() {
        let map = values(&[("A1", "10"), ("A2", "abc")]);
        assert_eq!(evaluate("A1 / 0", &map), Evaluation::Invalid);
        assert_eq!(evaluate("A1 * A2", &map), Evaluation::Invalid);
        assert_eq!(evaluate("", &map), Evaluation::Invalid);
        assert_eq!(evaluate("=", &map), Evaluation::Invalid);
        assert_eq!(evaluate("SQRT(-1)", &map), Evaluation::Invalid);
        assert_eq!(evaluate("10 ^ 400", &map), Evaluation::Invalid);
        assert_eq!(evaluate("A1 / 0", &map).display(), INVALID_MESSAGE);
    }

    #[test]
    fn test_identifier_inside_word_is_not_a_reference() {
        // BA1 is not scanned, so it is never substituted and fails as a name
        let map = values(&[("A1", "1")]);
        assert!(referenced_cells("BA1 + 1").is_empty());
        assert_eq!(evaluate("BA1 + 1", &map), Evaluation::Invalid);
    }

    #[test]
    fn test_textual_substitution_of_expression_values() {
        // the value is pasted as text, so it participates in precedence
        let map = values(&[("A1", "2+3")]);
        assert_eq!(evaluate("A1*2", &map).display(), "8.00");
    }

    #[test]
    fn test_non_numeric_results_pass_through() {
        let map = values(&[("A1", "12")]);
        assert_eq!(
            evaluate("IF(A1 > 10, \"Pass\", \"Fail\")", &map).display(),
            "Pass"
        );
        assert_eq!(evaluate("A1 > 10", &map).display(), "TRUE");
    }

    #[test]
    fn test_functions_through_substitution() {
        let map = values(&[("A1", "4"), ("A2", "16")]);
        assert_eq!(evaluate("=SQRT(A2) + ABS(-A1)", &map).display(), "8.00");
        assert_eq!(evaluate("=LOG(100)", &map).display(), "2.00");
        assert_eq!(evaluate("=AVERAGE(A1, A2)", &map).display(), "10.00");
    }

    #[test]
    fn test_negative_value_substitution() {
        let map = values(&[("A1", "-3")]);
        assert_eq!(evaluate("10 - A1", &map).display(), "13.00");
    }

    #[test]
    fn test_validate_accepts_known_cells() {
        assert!(validate_formula("=ROUND(A1 / A2, 3)", "formula[0]", &cells(2)).is_ok());
        assert!(validate_formula("IF(A1 > 0, TRUE, FALSE)", "formula[0]", &cells(1)).is_ok());
    }

    #[test]
    fn test_validate_rejects_unknown_cell() {
        let err = validate_formula("A1 + A5", "formula[0]", &cells(2)).unwrap_err();
        let CaljarError::Formula(ctx) = err else {
            panic!("expected formula error");
        };
        assert!(ctx.error.contains("Unknown cell 'A5'"));
        assert_eq!(ctx.available_cells, cells(2));
    }

    #[test]
    fn test_validate_suggests_for_lowercase_cell() {
        let err = validate_formula("a1 + 1", "formula[0]", &cells(2)).unwrap_err();
        let CaljarError::Formula(ctx) = err else {
            panic!("expected formula error");
        };
        assert_eq!(ctx.suggestion.as_deref(), Some("Did you mean 'A1'?"));
    }

    #[test]
    fn test_validate_rejects_unknown_function_and_arity() {
        let err = validate_formula("FOO(A1)", "formula[0]", &cells(1)).unwrap_err();
        assert!(err.to_string().contains("Unknown function 'FOO'"));

        let err = validate_formula("SQRT(A1, A1)", "formula[0]", &cells(1)).unwrap_err();
        assert!(err.to_string().contains("SQRT requires 1 argument(s), got 2"));
    }

    #[test]
    fn test_validate_rejects_syntax_errors_and_empty() {
        assert!(validate_formula("A1 +", "formula[0]", &cells(1)).is_err());
        assert!(validate_formula("=", "formula[0]", &cells(1)).is_err());
    }
}
