//! CLI command handlers

pub mod commands;

pub use commands::{cells, drift, enter, evaluate, functions, status, validate, watch};
