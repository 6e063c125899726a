use thiserror::Error;

pub type CaljarResult<T> = Result<T, CaljarError>;

#[derive(Error, Debug)]
pub enum CaljarError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Formula error: {}", .0.format_error())]
    Formula(FormulaErrorContext),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Read-only: {0}")]
    ReadOnly(String),

    #[error("Index {index} out of range for {what} (length {len})")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },

    #[error("Invalid value for {cell}: {reason}")]
    InvalidValue { cell: String, reason: String },
}

/// Context attached to an authoring-time formula error
#[derive(Debug, Clone, PartialEq)]
pub struct FormulaErrorContext {
    pub formula: String,
    /// Where the formula lives, e.g. `formula[2] "Density"`
    pub location: String,
    pub error: String,
    pub suggestion: Option<String>,
    pub available_cells: Vec<String>,
}

impl FormulaErrorContext {
    pub fn new(
        formula: impl Into<String>,
        location: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            formula: formula.into(),
            location: location.into(),
            error: error.into(),
            suggestion: None,
            available_cells: Vec::new(),
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_available_cells(mut self, cells: Vec<String>) -> Self {
        self.available_cells = cells;
        self
    }

    /// Find the closest available name: case-insensitive exact, then prefix,
    /// then substring match.
    pub fn find_similar(&self, name: &str) -> Option<String> {
        let lower = name.to_lowercase();

        if let Some(exact) = self
            .available_cells
            .iter()
            .find(|c| c.to_lowercase() == lower)
        {
            return Some(exact.clone());
        }

        if let Some(prefix) = self
            .available_cells
            .iter()
            .find(|c| c.to_lowercase().starts_with(&lower))
        {
            return Some(prefix.clone());
        }

        self.available_cells
            .iter()
            .find(|c| c.to_lowercase().contains(&lower))
            .cloned()
    }

    /// Render the multi-line message shown by `caljar validate`
    pub fn format_error(&self) -> String {
        let mut out = format!(
            "in {}\n  Formula: {}\n  Error: {}",
            self.location, self.formula, self.error
        );

        if let Some(suggestion) = &self.suggestion {
            out.push_str(&format!("\n  Suggestion: {}", suggestion));
        }

        // Long palettes are noise in a terminal
        if !self.available_cells.is_empty() && self.available_cells.len() <= 10 {
            out.push_str(&format!(
                "\n  Available cells: {}",
                self.available_cells.join(", ")
            ));
        }

        out
    }
}

/// Build a `CaljarError::Formula` in one call
pub fn formula_error(
    formula: &str,
    location: &str,
    error: &str,
    suggestion: Option<&str>,
) -> CaljarError {
    let mut ctx = FormulaErrorContext::new(formula, location, error);
    if let Some(s) = suggestion {
        ctx = ctx.with_suggestion(s);
    }
    CaljarError::Formula(ctx)
}
