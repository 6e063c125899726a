//! Error handling tests

use caljar::core::validate_formula;
use caljar::error::{formula_error, CaljarError, FormulaErrorContext};

#[test]
fn test_formula_error_context_new() {
    let ctx = FormulaErrorContext::new("=A1 + B", "formula[0]", "Unknown name 'B'");
    assert_eq!(ctx.formula, "=A1 + B");
    assert_eq!(ctx.location, "formula[0]");
    assert_eq!(ctx.error, "Unknown name 'B'");
    assert!(ctx.suggestion.is_none());
    assert!(ctx.available_cells.is_empty());
}

#[test]
fn test_formula_error_context_with_suggestion() {
    let ctx = FormulaErrorContext::new("=A1 + B", "formula[0]", "Error")
        .with_suggestion("Check cell identifiers");
    assert_eq!(ctx.suggestion, Some("Check cell identifiers".to_string()));
}

#[test]
fn test_formula_error_context_find_similar_exact_match() {
    let ctx = FormulaErrorContext::new("=a1", "loc", "err")
        .with_available_cells(vec!["A1".to_string(), "A2".to_string()]);

    // Case-insensitive exact match
    assert_eq!(ctx.find_similar("a1"), Some("A1".to_string()));
    assert_eq!(ctx.find_similar("A2"), Some("A2".to_string()));
}

#[test]
fn test_formula_error_context_find_similar_prefix_match() {
    let ctx = FormulaErrorContext::new("=A + 1", "loc", "err")
        .with_available_cells(vec!["A12".to_string(), "A20".to_string()]);
    assert_eq!(ctx.find_similar("A1"), Some("A12".to_string()));
}

#[test]
fn test_formula_error_context_find_similar_contains_match() {
    let ctx = FormulaErrorContext::new("=x", "loc", "err")
        .with_available_cells(vec!["lot_number".to_string()]);
    assert_eq!(ctx.find_similar("number"), Some("lot_number".to_string()));
}

#[test]
fn test_formula_error_context_find_similar_no_match() {
    let ctx = FormulaErrorContext::new("=x", "loc", "err")
        .with_available_cells(vec!["A1".to_string(), "A2".to_string()]);
    assert!(ctx.find_similar("xyz").is_none());
}

#[test]
fn test_formula_error_context_format_error_basic() {
    let ctx = FormulaErrorContext::new("=A1 / A9", "formula[1] \"Density\"", "Unknown cell 'A9'");
    let formatted = ctx.format_error();

    assert!(formatted.contains("formula[1] \"Density\""));
    assert!(formatted.contains("=A1 / A9"));
    assert!(formatted.contains("Unknown cell 'A9'"));
}

#[test]
fn test_formula_error_context_format_error_with_suggestion() {
    let ctx = FormulaErrorContext::new("=a1", "formula[0]", "Error").with_suggestion("Did you mean 'A1'?");
    assert!(ctx
        .format_error()
        .contains("Suggestion: Did you mean 'A1'?"));
}

#[test]
fn test_formula_error_context_format_error_with_cells() {
    let ctx = FormulaErrorContext::new("=A3", "formula[0]", "Error")
        .with_available_cells(vec!["A1".to_string(), "A2".to_string()]);
    assert!(ctx.format_error().contains("Available cells: A1, A2"));
}

#[test]
fn test_formula_error_context_format_error_many_cells() {
    // Long palettes are left out of the message
    let ctx = FormulaErrorContext::new("=A99", "formula[0]", "Error")
        .with_available_cells((1..=15).map(|i| format!("A{}", i)).collect());
    assert!(!ctx.format_error().contains("Available cells:"));
}

#[test]
fn test_formula_error_helper_function() {
    let err = formula_error("=X + Y", "location", "error msg", None);
    match err {
        CaljarError::Formula(ctx) => {
            assert_eq!(ctx.formula, "=X + Y");
            assert_eq!(ctx.location, "location");
            assert_eq!(ctx.error, "error msg");
            assert!(ctx.suggestion.is_none());
        }
        _ => panic!("Expected CaljarError::Formula"),
    }
}

#[test]
fn test_formula_error_helper_with_suggestion() {
    let err = formula_error("=X + Y", "location", "error msg", Some("try this"));
    match err {
        CaljarError::Formula(ctx) => {
            assert_eq!(ctx.suggestion, Some("try this".to_string()));
        }
        _ => panic!("Expected CaljarError::Formula"),
    }
}

#[test]
fn test_validate_formula_empty_uses_helper() {
    let err = validate_formula("=", "formula[0]", &[]).unwrap_err();
    let message = err.to_string();
    assert!(message.starts_with("Formula error: in formula[0]"));
    assert!(message.contains("Formula is empty"));
}

#[test]
fn test_caljar_error_display() {
    assert_eq!(
        CaljarError::Parse("Invalid syntax".to_string()).to_string(),
        "Parse error: Invalid syntax"
    );
    assert_eq!(
        CaljarError::Validation("bad".to_string()).to_string(),
        "Validation error: bad"
    );
    assert_eq!(
        CaljarError::ReadOnly("locked".to_string()).to_string(),
        "Read-only: locked"
    );
    assert_eq!(
        CaljarError::IndexOutOfRange {
            what: "formulas",
            index: 4,
            len: 2
        }
        .to_string(),
        "Index 4 out of range for formulas (length 2)"
    );
    assert_eq!(
        CaljarError::InvalidValue {
            cell: "A1 (Weight)".to_string(),
            reason: "'x' is not a decimal number".to_string()
        }
        .to_string(),
        "Invalid value for A1 (Weight): 'x' is not a decimal number"
    );
}

#[test]
fn test_io_error_conversion() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
    let err: CaljarError = io.into();
    assert!(err.to_string().starts_with("IO error:"));
}
