use crate::core::cells::{cell_assignments, cell_ids};
use crate::core::drift::{detect_drift, formula_drift};
use crate::core::expression::{FUNCTIONS, PALETTE_SIZE};
use crate::core::formula::{validate_formula, Evaluation};
use crate::core::input_rules::{check_cell, check_rules, check_values};
use crate::core::recompute::{FormulaResult, LiveSheet, Mode};
use crate::error::{CaljarError, CaljarResult};
use crate::parser;
use crate::types::{Status, TemplateDocument, ValidationType, WorkflowAction};
use crate::writer;
use colored::Colorize;
use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebouncedEventKind};
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use std::time::Duration;

//==============================================================================
// Shared helpers
//==============================================================================

/// Split `A1=10` into the cell and its value. An empty value clears the cell.
pub fn parse_assignment(text: &str) -> CaljarResult<(String, String)> {
    let (cell, value) = text.split_once('=').ok_or_else(|| {
        CaljarError::Parse(format!("Expected <cell>=<value>, got '{}'", text))
    })?;
    let cell = cell.trim();
    if cell.is_empty() {
        return Err(CaljarError::Parse(format!(
            "Missing cell identifier in '{}'",
            text
        )));
    }
    Ok((cell.to_string(), value.trim().to_string()))
}

fn rule_summary(kind: ValidationType, options: Option<&str>) -> String {
    match (kind, options) {
        (ValidationType::List | ValidationType::Custom, Some(opts)) if !opts.trim().is_empty() => {
            format!("{} ({})", kind.label(), opts.trim())
        }
        _ => kind.label().to_string(),
    }
}

fn label_width(results: &[FormulaResult]) -> usize {
    results
        .iter()
        .map(|r| r.label.chars().count())
        .max()
        .unwrap_or(0)
}

fn print_results(results: &[FormulaResult]) {
    if results.is_empty() {
        println!("{}", "⚠️  No formulas defined".yellow());
        return;
    }

    let width = label_width(results);
    for result in results {
        let shown = result.display();
        let shown = match result.evaluation {
            Evaluation::Ready(_) => shown.bold().green(),
            Evaluation::Pending => shown.yellow(),
            Evaluation::Invalid => shown.bold().red(),
        };
        println!(
            "   {}  {}  {}",
            format!("{:<width$}", result.label, width = width)
                .bright_blue()
                .bold(),
            shown,
            result.formula.dimmed()
        );
    }
}

fn results_to_json(results: &[FormulaResult]) -> serde_json::Value {
    serde_json::Value::Array(
        results
            .iter()
            .map(|r| {
                let state = match r.evaluation {
                    Evaluation::Ready(_) => "ready",
                    Evaluation::Pending => "pending",
                    Evaluation::Invalid => "invalid",
                };
                serde_json::json!({
                    "index": r.index,
                    "label": r.label,
                    "formula": r.formula,
                    "state": state,
                    "display": r.display(),
                })
            })
            .collect(),
    )
}

//==============================================================================
// cells
//==============================================================================

/// Print the identifier assigned to every data-input field
pub fn cells(file: PathBuf) -> CaljarResult<()> {
    let doc = parser::parse_document(&file)?;

    println!("{}", "📋 Cell identifiers".bold().green());
    println!("   File: {}\n", file.display());

    let assignments = cell_assignments(doc.sections());
    if assignments.is_empty() {
        println!("{}", "⚠️  No data-input fields defined".yellow());
        return Ok(());
    }

    let mut current_section = None;
    for a in &assignments {
        if current_section != Some(a.section_index) {
            current_section = Some(a.section_index);
            println!("   {}", a.section_title.bold());
        }
        let field = &doc.sections()[a.section_index].fields[a.field_index];
        println!(
            "      {} {:<30} {}",
            format!("{:<5}", a.cell_id).cyan().bold(),
            a.label,
            rule_summary(field.validation.kind, field.validation.options.as_deref()).dimmed()
        );
    }

    println!("\n   {} cells", assignments.len());
    Ok(())
}

//==============================================================================
// evaluate
//==============================================================================

/// Evaluate every formula against the stored values plus `--set` overrides
pub fn evaluate(file: PathBuf, overrides: Vec<String>, mode: Mode, json: bool) -> CaljarResult<()> {
    let doc = parser::parse_document(&file)?;
    let mut sheet = LiveSheet::for_mode(&doc, mode);

    let mut results = sheet.recompute();
    for text in &overrides {
        let (cell, value) = parse_assignment(text)?;
        results = if value.is_empty() {
            sheet.clear_value(&cell)?
        } else {
            sheet.set_value(cell, value)?
        };
    }

    if json {
        let text = serde_json::to_string_pretty(&results_to_json(&results))?;
        println!("{}", text);
        return Ok(());
    }

    println!("{}", "🧮 Evaluating formulas".bold().green());
    println!("   File: {}", file.display());
    println!("   Mode: {} ({})\n", mode, doc.effective_status());
    print_results(&results);
    Ok(())
}

//==============================================================================
// validate
//==============================================================================

/// Problems found in one document; empty when it is valid
pub fn validate_document(doc: &TemplateDocument) -> Vec<String> {
    let mut problems = Vec::new();
    let known = cell_ids(doc.sections());

    for problem in check_rules(doc.sections()) {
        problems.push(format!(
            "Field {} ({}): {}",
            problem.cell, problem.label, problem.message
        ));
    }

    for (index, formula) in doc.formulas().iter().enumerate() {
        let location = format!("formula[{}] \"{}\"", index, formula.label);
        if let Err(e) = validate_formula(&formula.value, &location, &known) {
            problems.push(e.to_string());
        }
    }

    for violation in check_values(doc.sections(), &doc.verification_data) {
        problems.push(format!(
            "Value {} ({}): {}",
            violation.cell, violation.label, violation.reason
        ));
    }

    problems
}

fn validate_file(file: &Path) -> CaljarResult<()> {
    let doc = parser::parse_document(file)?;
    let problems = validate_document(&doc);

    println!(
        "   Found {} sections, {} cells, {} formulas",
        doc.sections().len(),
        cell_ids(doc.sections()).len(),
        doc.formulas().len()
    );

    if problems.is_empty() {
        return Ok(());
    }

    for problem in &problems {
        println!("   {} {}", "❌".red(), problem);
    }
    Err(CaljarError::Validation(format!(
        "{} problem(s) in {}",
        problems.len(),
        file.display()
    )))
}

/// Validate one or more template documents
pub fn validate(files: Vec<PathBuf>) -> CaljarResult<()> {
    let mut failed = 0;

    for file in &files {
        println!("{}", "✅ Validating template".bold().green());
        println!("   File: {}", file.display());

        match validate_file(file) {
            Ok(()) => println!("{}\n", "✅ Template is valid!".bold().green()),
            Err(e) => {
                println!("{}\n", format!("❌ {}", e).bold().red());
                failed += 1;
            }
        }
    }

    if failed > 0 {
        return Err(CaljarError::Validation(format!(
            "{} of {} file(s) failed validation",
            failed,
            files.len()
        )));
    }
    Ok(())
}

//==============================================================================
// enter
//==============================================================================

/// Store values in `verification_data` and print the recomputed results
pub fn enter(file: PathBuf, assignments: Vec<String>, mode: Mode) -> CaljarResult<()> {
    let mut doc = parser::parse_document(&file)?;
    let mut sheet = LiveSheet::for_mode(&doc, mode);

    // Everything is checked before anything is written
    let mut parsed = Vec::with_capacity(assignments.len());
    for text in &assignments {
        let (cell, value) = parse_assignment(text)?;
        check_cell(doc.sections(), &cell, &value)?;
        parsed.push((cell, value));
    }

    let mut results = sheet.recompute();
    for (cell, value) in parsed {
        if value.is_empty() {
            results = sheet.clear_value(&cell)?;
            doc.verification_data.remove(&cell);
        } else {
            results = sheet.set_value(cell.clone(), value.clone())?;
            doc.verification_data.insert(cell, value);
        }
    }

    let backup = writer::write_document(&file, &doc)?;

    println!("{}", "✍️  Values stored".bold().green());
    println!("   File: {}", file.display());
    if let Some(backup) = backup {
        println!("   Backup: {}", backup.display());
    }
    println!();
    print_results(&results);
    Ok(())
}

//==============================================================================
// drift
//==============================================================================

/// Report identifier drift between two layouts of the same template
pub fn drift(before: PathBuf, after: PathBuf) -> CaljarResult<()> {
    let old = parser::parse_document(&before)?;
    let new = parser::parse_document(&after)?;

    println!("{}", "🔀 Identifier drift".bold().green());
    println!("   Before: {}", before.display());
    println!("   After:  {}\n", after.display());

    let moved = detect_drift(old.sections(), new.sections());
    let affected = formula_drift(old.formulas(), old.sections(), new.sections());

    if moved.is_empty() && affected.is_empty() {
        println!("{}", "✅ No identifiers changed".bold().green());
        return Ok(());
    }

    for d in &moved {
        println!(
            "   {:<30} {} → {}",
            d.label,
            d.before.red(),
            d.after.green()
        );
    }

    if !affected.is_empty() {
        println!("\n{}", "⚠️  Formulas pointing at different fields:".bold().yellow());
        for f in &affected {
            println!("   {}", f.label.bright_blue().bold());
            println!("      Saved:   {}", f.formula);
            println!("      Rebound: {}", f.rebound.green());
            if !f.removed.is_empty() {
                println!(
                    "      Removed: {}",
                    f.removed.join(", ").red()
                );
            }
        }
    }

    Ok(())
}

//==============================================================================
// functions
//==============================================================================

/// Print the function palette; `--all` adds the rest of the catalog
pub fn functions(all: bool, json: bool) -> CaljarResult<()> {
    let shown = if all { FUNCTIONS } else { &FUNCTIONS[..PALETTE_SIZE] };

    if json {
        let list: Vec<serde_json::Value> = shown
            .iter()
            .map(|f| {
                serde_json::json!({
                    "name": f.name,
                    "arity": f.arity(),
                    "example": f.example,
                    "description": f.description,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&list)?);
        return Ok(());
    }

    println!("{}", "🧰 Functions".bold().green());
    for f in shown {
        println!(
            "   {} {:<22} {}",
            format!("{:<10}", f.name).cyan().bold(),
            f.example,
            f.description.dimmed()
        );
    }
    println!("\n   Operators: + - * / ^ ( ) = <> < > <= >=");
    Ok(())
}

//==============================================================================
// status
//==============================================================================

fn available_actions(status: Status) -> Vec<WorkflowAction> {
    WorkflowAction::ALL
        .into_iter()
        .filter(|a| status.apply(*a).is_some())
        .collect()
}

/// Show the workflow status, or apply an action and store the new status
pub fn status(file: PathBuf, action: Option<WorkflowAction>) -> CaljarResult<()> {
    let mut doc = parser::parse_document(&file)?;
    let current = doc.effective_status();

    let Some(action) = action else {
        println!("   Status: {}", current.to_string().bold());
        let actions: Vec<String> = available_actions(current)
            .iter()
            .map(|a| a.as_str().to_string())
            .collect();
        if actions.is_empty() {
            println!("   No further actions");
        } else {
            println!("   Actions: {}", actions.join(", "));
        }
        return Ok(());
    };

    let next = current.apply(action).ok_or_else(|| {
        CaljarError::Validation(format!(
            "Cannot {} a document in status {}",
            action.as_str(),
            current
        ))
    })?;

    doc.status = Some(next);
    writer::write_document(&file, &doc)?;
    println!("   {} → {}", current.to_string().dimmed(), next.to_string().bold().green());
    Ok(())
}

//==============================================================================
// watch
//==============================================================================

/// Re-evaluate a document every time it is saved
pub fn watch(file: PathBuf, mode: Mode, verbose: bool) -> CaljarResult<()> {
    println!("{}", "👁️  CalJar - Watch Mode".bold().green());
    println!("   Watching: {}", file.display());
    println!("   Mode: {}", mode);
    println!("   Press {} to stop\n", "Ctrl+C".bold().yellow());

    if !file.exists() {
        return Err(CaljarError::Validation(format!(
            "File not found: {}",
            file.display()
        )));
    }

    let canonical_path = file.canonicalize()?;
    let parent_dir = canonical_path
        .parent()
        .ok_or_else(|| CaljarError::Validation("Cannot determine parent directory".to_string()))?;

    let (tx, rx) = channel();

    // Editors write in several steps; wait for the burst to settle
    let mut debouncer = new_debouncer(Duration::from_millis(200), tx)
        .map_err(|e| CaljarError::Validation(format!("Failed to create file watcher: {}", e)))?;

    debouncer
        .watcher()
        .watch(parent_dir, RecursiveMode::NonRecursive)
        .map_err(|e| CaljarError::Validation(format!("Failed to watch directory: {}", e)))?;

    if verbose {
        println!(
            "   {} {}",
            "Watching directory:".cyan(),
            parent_dir.display()
        );
    }

    println!("{}", "🔄 Initial run...".cyan());
    run_watch_action(&file, mode);
    println!();

    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                let relevant = events.iter().any(|event| {
                    event.kind == DebouncedEventKind::Any
                        && (event.path.canonicalize().ok().as_ref() == Some(&canonical_path)
                            || event.path.file_name() == canonical_path.file_name())
                });

                if relevant {
                    if verbose {
                        print!("\x1B[2J\x1B[1;1H");
                    }
                    println!("\n{}", "🔄 Change detected".cyan());
                    run_watch_action(&file, mode);
                    println!();
                }
            }
            Ok(Err(error)) => {
                eprintln!("{} Watch error: {}", "❌".red(), error);
            }
            Err(e) => {
                eprintln!("{} Channel error: {}", "❌".red(), e);
                break;
            }
        }
    }

    Ok(())
}

/// One watch iteration; failures are printed, never propagated
fn run_watch_action(file: &Path, mode: Mode) {
    match watch_results(file, mode) {
        Ok(results) => print_results(&results),
        Err(e) => println!("{} {}", "❌ Evaluation failed:".bold().red(), e),
    }
}

fn watch_results(file: &Path, mode: Mode) -> CaljarResult<Vec<FormulaResult>> {
    let doc = parser::parse_document(file)?;
    Ok(LiveSheet::for_mode(&doc, mode).recompute())
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;
