//! General-purpose arithmetic expression engine
//!
//! Tokenizer → recursive-descent parser → AST evaluator over `f64`. Knows
//! nothing about cells or templates; `core::formula` layers cell readiness
//! and substitution on top.

pub mod evaluator;
pub mod parser;
pub mod tokenizer;

pub use evaluator::{
    evaluate, find_function, EvalContext, EvalError, FunctionSpec, Value, FUNCTIONS,
    PALETTE_SIZE,
};
pub use parser::{Expr, ParseError};

/// Tokenize and parse without evaluating
pub fn parse_expression(text: &str) -> Result<Expr, ParseError> {
    let tokens =
        tokenizer::tokenize(text).map_err(|e| ParseError::new(e.message, e.position))?;
    parser::parse(tokens)
}

/// Tokenize, parse and evaluate `text` with no named values in scope
pub fn evaluate_str(text: &str) -> Result<Value, EvalError> {
    let ast = parse_expression(text).map_err(|e| EvalError::new(e.to_string()))?;
    evaluate(&ast, &EvalContext::new())
}
