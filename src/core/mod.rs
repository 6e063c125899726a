//! Formula engine: cell identifiers, evaluation and live recomputation

pub mod cells;
pub mod drift;
pub mod expression;
pub mod formula;
pub mod formula_set;
pub mod input_rules;
pub mod recompute;

pub use cells::{cell_assignments, cell_id, CellAssignment, CellMap};
pub use drift::{detect_drift, formula_drift, rebind_formula, CellDrift, FormulaDrift};
pub use formula::{evaluate, referenced_cells, substitute, validate_formula, Evaluation};
pub use formula_set::{FormulaAttribute, FormulaFieldSet};
pub use recompute::{FormulaResult, LiveSheet, Mode};
