//! Live recomputation of every formula whenever an input changes
//!
//! A [`LiveSheet`] owns the value map and the formulas of one template or
//! record. Every change re-evaluates all formulas against the whole map.
//! Formulas reference raw inputs only, so there is no dependency graph and
//! no ordering between formulas.

use crate::core::formula::{evaluate, Evaluation};
use crate::error::{CaljarError, CaljarResult};
use crate::types::{FormulaField, Status, TemplateDocument, ValueMap};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// The three screens that bind values to formulas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Template designer preview
    #[default]
    Design,
    /// Record data entry
    DataEntry,
    /// Template verification run
    Verification,
}

impl Mode {
    /// Whether values may change for a document in `status`
    pub fn accepts_input(self, status: Status) -> bool {
        match self {
            Mode::Design => status.is_design_editable(),
            Mode::DataEntry => status.is_entry_editable(),
            Mode::Verification => status == Status::Draft,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Design => "design",
            Mode::DataEntry => "data-entry",
            Mode::Verification => "verification",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "design" => Ok(Mode::Design),
            "data-entry" | "entry" | "record" => Ok(Mode::DataEntry),
            "verification" | "verify" => Ok(Mode::Verification),
            other => Err(format!(
                "unknown mode '{}' (expected design, data-entry or verification)",
                other
            )),
        }
    }
}

/// Result of one formula after a recompute pass
#[derive(Debug, Clone, PartialEq)]
pub struct FormulaResult {
    pub index: usize,
    pub label: String,
    pub formula: String,
    pub evaluation: Evaluation,
}

impl FormulaResult {
    pub fn display(&self) -> String {
        self.evaluation.display()
    }
}

#[derive(Debug, Clone)]
pub struct LiveSheet {
    formulas: Vec<FormulaField>,
    values: ValueMap,
    editable: bool,
}

impl LiveSheet {
    /// An editable sheet over `formulas` with an empty value map
    pub fn new(formulas: Vec<FormulaField>) -> Self {
        Self {
            formulas,
            values: ValueMap::new(),
            editable: true,
        }
    }

    /// Bind a document for one of the three call sites. Stored values are
    /// loaded; whether they may change depends on the mode and the status.
    pub fn for_mode(document: &TemplateDocument, mode: Mode) -> Self {
        let status = document.effective_status();
        let editable = mode.accepts_input(status);
        debug!(%mode, %status, editable, "binding sheet");
        Self {
            formulas: document.formulas().to_vec(),
            values: document.value_map(),
            editable,
        }
    }

    pub fn is_editable(&self) -> bool {
        self.editable
    }

    pub fn values(&self) -> &ValueMap {
        &self.values
    }

    pub fn into_values(self) -> ValueMap {
        self.values
    }

    pub fn formulas(&self) -> &[FormulaField] {
        &self.formulas
    }

    fn ensure_editable(&self, cell: &str) -> CaljarResult<()> {
        if self.editable {
            Ok(())
        } else {
            Err(CaljarError::ReadOnly(format!(
                "cannot change {} in a read-only sheet",
                cell
            )))
        }
    }

    /// Evaluate every formula against the current map
    pub fn recompute(&self) -> Vec<FormulaResult> {
        let results: Vec<FormulaResult> = self
            .formulas
            .iter()
            .enumerate()
            .map(|(index, formula)| FormulaResult {
                index,
                label: formula.label.clone(),
                formula: formula.value.clone(),
                evaluation: evaluate(&formula.value, &self.values),
            })
            .collect();

        debug!(
            formulas = results.len(),
            ready = results.iter().filter(|r| r.evaluation.is_ready()).count(),
            pending = results
                .iter()
                .filter(|r| r.evaluation == Evaluation::Pending)
                .count(),
            "recomputed"
        );

        results
    }

    pub fn set_value(
        &mut self,
        cell: impl Into<String>,
        value: impl Into<String>,
    ) -> CaljarResult<Vec<FormulaResult>> {
        let cell = cell.into();
        self.ensure_editable(&cell)?;
        self.values.insert(cell, value.into());
        Ok(self.recompute())
    }

    /// Remove a value; formulas referencing it become pending
    pub fn clear_value(&mut self, cell: &str) -> CaljarResult<Vec<FormulaResult>> {
        self.ensure_editable(cell)?;
        self.values.remove(cell);
        Ok(self.recompute())
    }

    /// Replace the whole map, e.g. when a stored record is opened. Loading
    /// is not an edit and is allowed on read-only sheets.
    pub fn load_values(&mut self, values: ValueMap) -> Vec<FormulaResult> {
        self.values = values;
        self.recompute()
    }
}
