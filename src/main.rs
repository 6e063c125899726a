use caljar::cli;
use caljar::core::Mode;
use caljar::error::CaljarResult;
use caljar::types::WorkflowAction;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "caljar")]
#[command(about = "Formula engine for GxP calculation templates")]
#[command(long_about = "CalJar - calculation templates with live formulas

Data-input fields are numbered A1, A2, ... in section order. Formulas refer
to fields by those identifiers and are recomputed whenever a value changes.

COMMANDS:
  cells      - Show the identifier of every data-input field
  evaluate   - Evaluate all formulas against stored values
  validate   - Check schema, formulas and stored values
  enter      - Store values and show the recomputed results
  drift      - Compare identifiers between two layouts
  functions  - List the functions formulas may use
  status     - Show or advance the workflow status
  watch      - Re-evaluate on every save

EXAMPLES:
  caljar cells template.yaml
  caljar evaluate template.yaml --set A1=10 --set A2=4
  caljar enter record.json A1=5.2 A3=Pass
  caljar drift v1.yaml v2.yaml

LOGGING:
  CALJAR_LOG=caljar=debug caljar evaluate template.yaml")]
#[command(version)]
struct Cli {
    /// Log engine activity to stderr (same as CALJAR_LOG=caljar=debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the cell identifier assigned to every data-input field
    Cells {
        /// Template document (.json, .yaml or .yml)
        file: PathBuf,
    },

    #[command(long_about = "Evaluate every formula of a template.

Values come from the document's verification_data, header and analysis-info
fields, then from --set overrides in order. Overrides are not saved.

RESULTS:
  5.00                      - computed, rounded to two decimals
  Calculation pending...    - a referenced cell is missing or empty
  Invalid formula or data   - the formula cannot be computed

MODES:
  design        - designer preview; values change while DRAFT or REJECTED
  data-entry    - record entry; values change while DRAFT
  verification  - template verification; values change while DRAFT")]
    /// Evaluate all formulas against stored values
    Evaluate {
        /// Template document (.json, .yaml or .yml)
        file: PathBuf,

        /// Override a value before evaluating (e.g. --set A1=10)
        #[arg(short, long = "set", value_name = "CELL=VALUE")]
        set: Vec<String>,

        /// Call site whose editing rules apply
        #[arg(short, long, env = "CALJAR_MODE", default_value = "design")]
        mode: Mode,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check schema, formulas, validation rules and stored values
    Validate {
        /// Template document(s) to validate
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    #[command(long_about = "Store values in a document and show the recomputed results.

Each value is checked against its field's validation rule before anything
is written. An empty value (A1=) clears the cell. The previous file is kept
as <file>.bak.")]
    /// Store values and show the recomputed results
    Enter {
        /// Template or record document
        file: PathBuf,

        /// Values to store (e.g. A1=5.2)
        #[arg(required = true, value_name = "CELL=VALUE")]
        values: Vec<String>,

        /// Call site whose editing rules apply
        #[arg(short, long, env = "CALJAR_MODE", default_value = "data-entry")]
        mode: Mode,
    },

    #[command(long_about = "Compare cell identifiers between two layouts of a template.

Identifiers are positional: inserting, removing or moving a field renumbers
every later field while saved formulas keep the old numbers. This command
lists the fields whose identifier changed and the formulas of the first
document that would now point at different fields, with a rewritten
version that follows the fields.")]
    /// Report identifier drift between two layouts
    Drift {
        /// Layout the formulas were written against
        before: PathBuf,

        /// Edited layout
        after: PathBuf,
    },

    /// List the functions formulas may use
    Functions {
        /// Include functions outside the palette
        #[arg(short, long)]
        all: bool,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the workflow status, or apply an action
    Status {
        /// Template or record document
        file: PathBuf,

        /// Action to apply (verify, submit, review, approve, reject, cancel,
        /// revise, retire, acknowledge-rejection)
        action: Option<WorkflowAction>,
    },

    /// Re-evaluate a document on every save
    Watch {
        /// Template document to watch
        file: PathBuf,

        /// Call site whose editing rules apply
        #[arg(short, long, env = "CALJAR_MODE", default_value = "design")]
        mode: Mode,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("caljar=debug")
    } else {
        EnvFilter::try_from_env("CALJAR_LOG").unwrap_or_else(|_| EnvFilter::new("caljar=warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> CaljarResult<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Cells { file } => cli::cells(file),

        Commands::Evaluate {
            file,
            set,
            mode,
            json,
        } => cli::evaluate(file, set, mode, json),

        Commands::Validate { files } => cli::validate(files),

        Commands::Enter { file, values, mode } => cli::enter(file, values, mode),

        Commands::Drift { before, after } => cli::drift(before, after),

        Commands::Functions { all, json } => cli::functions(all, json),

        Commands::Status { file, action } => cli::status(file, action),

        Commands::Watch { file, mode } => cli::watch(file, mode, cli.verbose),
    }
}
