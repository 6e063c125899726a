//! Formula evaluator
//!
//! Evaluates an AST to produce a result value.

use super::parser::Expr;
use std::collections::HashMap;

/// Value type that can be returned from evaluation
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Text(String),
    Boolean(bool),
}

impl Value {
    /// Try to convert to f64
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Text(s) => s.trim().parse().ok(),
            Value::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            Value::Number(n) => format!("{}", n),
            Value::Text(s) => s.clone(),
            Value::Boolean(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Boolean(b) => *b,
            Value::Number(n) => *n != 0.0,
            Value::Text(s) => s.eq_ignore_ascii_case("TRUE"),
        }
    }
}

/// Named values visible to an expression
#[derive(Debug, Clone, Default)]
pub struct EvalContext {
    pub names: HashMap<String, Value>,
}

impl EvalContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.names.insert(name.into(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.names.get(name)
    }
}

/// Error during evaluation
#[derive(Debug, Clone, PartialEq)]
pub struct EvalError {
    pub message: String,
}

impl EvalError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for EvalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Eval error: {}", self.message)
    }
}

impl std::error::Error for EvalError {}

/// A function the evaluator understands
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FunctionSpec {
    pub name: &'static str,
    pub min_args: usize,
    /// `None` for variadic functions
    pub max_args: Option<usize>,
    pub example: &'static str,
    pub description: &'static str,
}

impl FunctionSpec {
    pub fn accepts(&self, argc: usize) -> bool {
        argc >= self.min_args && self.max_args.map_or(true, |max| argc <= max)
    }

    pub fn arity(&self) -> String {
        match self.max_args {
            Some(max) if max == self.min_args => format!("{}", max),
            Some(max) => format!("{}-{}", self.min_args, max),
            None => format!("{}+", self.min_args),
        }
    }
}

const fn func(
    name: &'static str,
    min_args: usize,
    max_args: Option<usize>,
    example: &'static str,
    description: &'static str,
) -> FunctionSpec {
    FunctionSpec {
        name,
        min_args,
        max_args,
        example,
        description,
    }
}

/// Every supported function. The first ten make up the authoring palette.
pub const FUNCTIONS: &[FunctionSpec] = &[
    func("SUM", 1, None, "SUM(A1, A2)", "Sum of the arguments"),
    func("AVERAGE", 1, None, "AVERAGE(A1, A2)", "Arithmetic mean"),
    func("STDEV", 2, None, "STDEV(A1, A2)", "Sample standard deviation"),
    func("MIN", 1, None, "MIN(A1, A2)", "Smallest argument"),
    func("MAX", 1, None, "MAX(A1, A2)", "Largest argument"),
    func("LOG", 1, Some(2), "LOG(A1)", "Logarithm, base 10 unless a base is given"),
    func("LN", 1, Some(1), "LN(A1)", "Natural logarithm"),
    func("SQRT", 1, Some(1), "SQRT(A1)", "Square root"),
    func("ABS", 1, Some(1), "ABS(A1)", "Absolute value"),
    func("ROUND", 1, Some(2), "ROUND(A1, 2)", "Round half away from zero"),
    func("AVG", 1, None, "AVG(A1, A2)", "Alias of AVERAGE"),
    func("STDEV.S", 2, None, "STDEV.S(A1, A2)", "Alias of STDEV"),
    func("STDEV.P", 1, None, "STDEV.P(A1, A2)", "Population standard deviation"),
    func("MEDIAN", 1, None, "MEDIAN(A1, A2, A3)", "Middle value"),
    func("COUNT", 0, None, "COUNT(A1, A2)", "Number of numeric arguments"),
    func("LOG10", 1, Some(1), "LOG10(A1)", "Base-10 logarithm"),
    func("EXP", 1, Some(1), "EXP(A1)", "e raised to a power"),
    func("POWER", 2, Some(2), "POWER(A1, 2)", "Raise to a power"),
    func("MOD", 2, Some(2), "MOD(A1, 3)", "Remainder with the sign of the divisor"),
    func("INT", 1, Some(1), "INT(A1)", "Round down to an integer"),
    func("ROUNDUP", 1, Some(2), "ROUNDUP(A1, 1)", "Round away from zero"),
    func("ROUNDDOWN", 1, Some(2), "ROUNDDOWN(A1, 1)", "Round toward zero"),
    func("PI", 0, Some(0), "PI()", "The constant pi"),
    func("IF", 2, Some(3), "IF(A1 > 0, A1, 0)", "Conditional value"),
    func("AND", 1, None, "AND(A1 > 0, A2 > 0)", "True when every argument is true"),
    func("OR", 1, None, "OR(A1 > 0, A2 > 0)", "True when any argument is true"),
    func("NOT", 1, Some(1), "NOT(A1 > 0)", "Logical negation"),
];

/// Number of leading entries in `FUNCTIONS` shown in the formula palette
pub const PALETTE_SIZE: usize = 10;

/// Look up a function by name (case-insensitive)
pub fn find_function(name: &str) -> Option<&'static FunctionSpec> {
    FUNCTIONS.iter().find(|f| f.name.eq_ignore_ascii_case(name))
}

/// Evaluate an expression in the given context
pub fn evaluate(expr: &Expr, ctx: &EvalContext) -> Result<Value, EvalError> {
    match expr {
        Expr::Number(n) => Ok(Value::Number(*n)),

        Expr::Text(s) => Ok(Value::Text(s.clone())),

        Expr::Reference(name) => evaluate_reference(name, ctx),

        Expr::FunctionCall { name, args } => evaluate_function(name, args, ctx),

        Expr::BinaryOp { op, left, right } => {
            let left_val = evaluate(left, ctx)?;
            let right_val = evaluate(right, ctx)?;
            evaluate_binary_op(op, &left_val, &right_val)
        }

        Expr::UnaryOp { op, operand } => {
            let val = evaluate(operand, ctx)?;
            evaluate_unary_op(op, &val)
        }
    }
}

fn evaluate_reference(name: &str, ctx: &EvalContext) -> Result<Value, EvalError> {
    if let Some(value) = ctx.get(name) {
        return Ok(value.clone());
    }

    match name.to_uppercase().as_str() {
        "TRUE" => Ok(Value::Boolean(true)),
        "FALSE" => Ok(Value::Boolean(false)),
        _ => Err(EvalError::new(format!("Unknown name: {}", name))),
    }
}

fn numeric_operands(left: &Value, right: &Value) -> Result<(f64, f64), EvalError> {
    let l = left
        .as_number()
        .ok_or_else(|| EvalError::new("Left operand must be a number"))?;
    let r = right
        .as_number()
        .ok_or_else(|| EvalError::new("Right operand must be a number"))?;
    Ok((l, r))
}

fn evaluate_binary_op(op: &str, left: &Value, right: &Value) -> Result<Value, EvalError> {
    if op == "=" {
        return Ok(Value::Boolean(values_equal(left, right)));
    }
    if op == "<>" {
        return Ok(Value::Boolean(!values_equal(left, right)));
    }

    let (l, r) = numeric_operands(left, right)?;

    match op {
        "+" => Ok(Value::Number(l + r)),
        "-" => Ok(Value::Number(l - r)),
        "*" => Ok(Value::Number(l * r)),
        "/" => {
            if r == 0.0 {
                Err(EvalError::new("Division by zero"))
            } else {
                Ok(Value::Number(l / r))
            }
        }
        "^" => Ok(Value::Number(l.powf(r))),
        "<" => Ok(Value::Boolean(l < r)),
        ">" => Ok(Value::Boolean(l > r)),
        "<=" => Ok(Value::Boolean(l <= r)),
        ">=" => Ok(Value::Boolean(l >= r)),
        _ => Err(EvalError::new(format!("Unknown operator: {}", op))),
    }
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Text(l), Value::Text(r)) => l.eq_ignore_ascii_case(r),
        (Value::Boolean(l), Value::Boolean(r)) => l == r,
        _ => match (left.as_number(), right.as_number()) {
            (Some(l), Some(r)) => (l - r).abs() < 1e-10,
            _ => false,
        },
    }
}

fn evaluate_unary_op(op: &str, operand: &Value) -> Result<Value, EvalError> {
    let n = operand
        .as_number()
        .ok_or_else(|| EvalError::new("Operand must be a number"))?;
    match op {
        "-" => Ok(Value::Number(-n)),
        "+" => Ok(Value::Number(n)),
        _ => Err(EvalError::new(format!("Unknown unary operator: {}", op))),
    }
}

fn evaluate_function(name: &str, args: &[Expr], ctx: &EvalContext) -> Result<Value, EvalError> {
    let spec =
        find_function(name).ok_or_else(|| EvalError::new(format!("Unknown function: {}", name)))?;
    if !spec.accepts(args.len()) {
        return Err(EvalError::new(format!(
            "{} requires {} argument(s), got {}",
            spec.name,
            spec.arity(),
            args.len()
        )));
    }

    let number = |i: usize| -> Result<f64, EvalError> {
        evaluate(&args[i], ctx)?
            .as_number()
            .ok_or_else(|| EvalError::new(format!("{} requires a number", spec.name)))
    };
    let digits = |i: usize| -> Result<i32, EvalError> {
        if args.len() > i {
            Ok(number(i)? as i32)
        } else {
            Ok(0)
        }
    };

    match spec.name {
        // ═══════════════════════════════════════════════════════════════════════
        // AGGREGATES
        // ═══════════════════════════════════════════════════════════════════════
        "SUM" => Ok(Value::Number(collect_numeric_values(args, ctx)?.iter().sum())),

        "AVERAGE" | "AVG" => {
            let values = collect_numeric_values(args, ctx)?;
            mean(&values)
                .map(Value::Number)
                .ok_or_else(|| EvalError::new("AVERAGE of empty set"))
        }

        "STDEV" | "STDEV.S" => {
            let values = collect_numeric_values(args, ctx)?;
            if values.len() < 2 {
                return Err(EvalError::new("STDEV requires at least two numbers"));
            }
            Ok(Value::Number(std_dev(&values, values.len() - 1)))
        }

        "STDEV.P" => {
            let values = collect_numeric_values(args, ctx)?;
            if values.is_empty() {
                return Err(EvalError::new("STDEV.P of empty set"));
            }
            Ok(Value::Number(std_dev(&values, values.len())))
        }

        "MIN" => collect_numeric_values(args, ctx)?
            .into_iter()
            .reduce(f64::min)
            .map(Value::Number)
            .ok_or_else(|| EvalError::new("MIN of empty set")),

        "MAX" => collect_numeric_values(args, ctx)?
            .into_iter()
            .reduce(f64::max)
            .map(Value::Number)
            .ok_or_else(|| EvalError::new("MAX of empty set")),

        "MEDIAN" => {
            let mut values = collect_numeric_values(args, ctx)?;
            if values.is_empty() {
                return Err(EvalError::new("MEDIAN of empty set"));
            }
            values.sort_by(f64::total_cmp);
            let mid = values.len() / 2;
            if values.len() % 2 == 0 {
                Ok(Value::Number((values[mid - 1] + values[mid]) / 2.0))
            } else {
                Ok(Value::Number(values[mid]))
            }
        }

        "COUNT" => {
            let mut count = 0;
            for arg in args {
                if let Value::Number(_) = evaluate(arg, ctx)? {
                    count += 1;
                }
            }
            Ok(Value::Number(count as f64))
        }

        // ═══════════════════════════════════════════════════════════════════════
        // MATH
        // ═══════════════════════════════════════════════════════════════════════
        "ABS" => Ok(Value::Number(number(0)?.abs())),

        "SQRT" => {
            let val = number(0)?;
            if val < 0.0 {
                Err(EvalError::new("SQRT of negative number"))
            } else {
                Ok(Value::Number(val.sqrt()))
            }
        }

        "LN" => {
            let val = number(0)?;
            if val <= 0.0 {
                Err(EvalError::new("LN of non-positive number"))
            } else {
                Ok(Value::Number(val.ln()))
            }
        }

        "LOG" | "LOG10" => {
            let val = number(0)?;
            let base = if args.len() > 1 { number(1)? } else { 10.0 };
            if val <= 0.0 {
                Err(EvalError::new("LOG of non-positive number"))
            } else if base <= 0.0 || base == 1.0 {
                Err(EvalError::new("LOG base must be positive and not 1"))
            } else {
                Ok(Value::Number(val.log(base)))
            }
        }

        "EXP" => Ok(Value::Number(number(0)?.exp())),

        "POWER" => Ok(Value::Number(number(0)?.powf(number(1)?))),

        "MOD" => {
            let (val, divisor) = (number(0)?, number(1)?);
            if divisor == 0.0 {
                Err(EvalError::new("MOD: Division by zero"))
            } else {
                Ok(Value::Number(val - divisor * (val / divisor).floor()))
            }
        }

        "INT" => Ok(Value::Number(number(0)?.floor())),

        "ROUND" => {
            let multiplier = 10_f64.powi(digits(1)?);
            Ok(Value::Number((number(0)? * multiplier).round() / multiplier))
        }

        "ROUNDUP" => {
            let multiplier = 10_f64.powi(digits(1)?);
            let scaled = number(0)? * multiplier;
            Ok(Value::Number(scaled.abs().ceil().copysign(scaled) / multiplier))
        }

        "ROUNDDOWN" => {
            let multiplier = 10_f64.powi(digits(1)?);
            Ok(Value::Number((number(0)? * multiplier).trunc() / multiplier))
        }

        "PI" => Ok(Value::Number(std::f64::consts::PI)),

        // ═══════════════════════════════════════════════════════════════════════
        // LOGICAL
        // ═══════════════════════════════════════════════════════════════════════
        "IF" => {
            if evaluate(&args[0], ctx)?.is_truthy() {
                evaluate(&args[1], ctx)
            } else if args.len() > 2 {
                evaluate(&args[2], ctx)
            } else {
                Ok(Value::Boolean(false))
            }
        }

        "AND" => {
            for arg in args {
                if !evaluate(arg, ctx)?.is_truthy() {
                    return Ok(Value::Boolean(false));
                }
            }
            Ok(Value::Boolean(true))
        }

        "OR" => {
            for arg in args {
                if evaluate(arg, ctx)?.is_truthy() {
                    return Ok(Value::Boolean(true));
                }
            }
            Ok(Value::Boolean(false))
        }

        "NOT" => Ok(Value::Boolean(!evaluate(&args[0], ctx)?.is_truthy())),

        _ => Err(EvalError::new(format!("Unknown function: {}", name))),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// HELPER FUNCTIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Evaluate every argument as a number; text that does not parse is an error
fn collect_numeric_values(args: &[Expr], ctx: &EvalContext) -> Result<Vec<f64>, EvalError> {
    args.iter()
        .map(|arg| {
            let val = evaluate(arg, ctx)?;
            val.as_number()
                .ok_or_else(|| EvalError::new(format!("Expected a number, got '{}'", val.as_text())))
        })
        .collect()
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn std_dev(values: &[f64], denominator: usize) -> f64 {
    let avg = mean(values).unwrap_or(0.0);
    let sum_sq: f64 = values.iter().map(|v| (v - avg).powi(2)).sum();
    (sum_sq / denominator as f64).sqrt()
}
