//! CalJar - formula engine for GxP calculation templates
//!
//! Analysts lay out labeled data-input fields in ordered sections, write
//! arithmetic formulas against them and get live results while entering
//! data. Every field gets a positional cell identifier (`A1`, `A2`, ...)
//! derived from the layout; formulas refer to fields through those
//! identifiers.
//!
//! # Features
//!
//! - Positional cell identifiers and stable field-id mapping
//! - Formula evaluation with pending/invalid states and two-decimal display
//! - Live recomputation for the designer, data-entry and verification screens
//! - Identifier drift analysis after structural edits
//! - Input validation rules (whole number, decimal, list, pattern)
//! - Template documents in JSON or YAML, checked against a JSON Schema
//!
//! # Example
//!
//! ```
//! use caljar::core::{evaluate, Evaluation};
//! use caljar::types::ValueMap;
//!
//! let mut values = ValueMap::new();
//! values.insert("A1".to_string(), "10".to_string());
//! values.insert("A2".to_string(), "4".to_string());
//!
//! assert_eq!(evaluate("=A1/A2", &values).display(), "2.50");
//!
//! values.insert("A2".to_string(), String::new());
//! assert_eq!(evaluate("=A1/A2", &values), Evaluation::Pending);
//! ```

pub mod cli;
pub mod core;
pub mod error;
pub mod parser;
pub mod types;
pub mod writer;

// Re-export commonly used types
pub use error::{CaljarError, CaljarResult};
pub use types::{
    DataInputField, DataInputSection, FormulaField, Status, TemplateDocument, ValueMap,
};
