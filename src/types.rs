use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Current value of every cell (and named field) keyed by identifier.
///
/// Keys are cell identifiers (`A1`, `A2`, ...) for data inputs, or the
/// field's own id for header and analysis-info fields.
pub type ValueMap = BTreeMap<String, String>;

//==============================================================================
// Workflow Status
//==============================================================================

/// Workflow status of a template or record, as reported by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Draft,
    Verified,
    SubmittedForReview,
    Reviewed,
    Approved,
    Rejected,
    Retired,
    Cancelled,
}

/// Workflow actions a user can request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowAction {
    Verify,
    Submit,
    Review,
    Approve,
    Reject,
    Cancel,
    /// Approved → Draft; the backend creates a new version
    Revise,
    Retire,
    #[serde(alias = "acknowledge-rejection")]
    AcknowledgeRejection,
}

impl Status {
    pub const ALL: [Status; 8] = [
        Status::Draft,
        Status::Verified,
        Status::SubmittedForReview,
        Status::Reviewed,
        Status::Approved,
        Status::Rejected,
        Status::Retired,
        Status::Cancelled,
    ];

    /// Sections, fields and formulas may only change in these states
    pub fn is_design_editable(self) -> bool {
        matches!(self, Status::Draft | Status::Rejected)
    }

    /// Record values may only be entered while the record is a draft
    pub fn is_entry_editable(self) -> bool {
        self == Status::Draft
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Retired | Status::Cancelled)
    }

    /// Status reached by applying `action`, or `None` if the backend would
    /// refuse the transition.
    pub fn apply(self, action: WorkflowAction) -> Option<Status> {
        use Status::*;
        use WorkflowAction as A;

        match (self, action) {
            (Draft, A::Verify) => Some(Verified),
            (Draft, A::Submit) | (Verified, A::Submit) => Some(SubmittedForReview),
            (SubmittedForReview, A::Review) => Some(Reviewed),
            (SubmittedForReview, A::Cancel) => Some(Cancelled),
            (SubmittedForReview, A::Reject) | (Reviewed, A::Reject) => Some(Rejected),
            (Reviewed, A::Approve) => Some(Approved),
            (Approved, A::Revise) => Some(Draft),
            (Approved, A::Retire) => Some(Retired),
            (Rejected, A::AcknowledgeRejection) => Some(Draft),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Draft => "DRAFT",
            Status::Verified => "VERIFIED",
            Status::SubmittedForReview => "SUBMITTED_FOR_REVIEW",
            Status::Reviewed => "REVIEWED",
            Status::Approved => "APPROVED",
            Status::Rejected => "REJECTED",
            Status::Retired => "RETIRED",
            Status::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase().replace(['-', ' '], "_");
        Status::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| format!("Unknown status '{}'", s))
    }
}

impl WorkflowAction {
    pub const ALL: [WorkflowAction; 9] = [
        WorkflowAction::Verify,
        WorkflowAction::Submit,
        WorkflowAction::Review,
        WorkflowAction::Approve,
        WorkflowAction::Reject,
        WorkflowAction::Cancel,
        WorkflowAction::Revise,
        WorkflowAction::Retire,
        WorkflowAction::AcknowledgeRejection,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowAction::Verify => "verify",
            WorkflowAction::Submit => "submit",
            WorkflowAction::Review => "review",
            WorkflowAction::Approve => "approve",
            WorkflowAction::Reject => "reject",
            WorkflowAction::Cancel => "cancel",
            WorkflowAction::Revise => "revise",
            WorkflowAction::Retire => "retire",
            WorkflowAction::AcknowledgeRejection => "acknowledge_rejection",
        }
    }
}

impl fmt::Display for WorkflowAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for WorkflowAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        WorkflowAction::ALL
            .into_iter()
            .find(|action| action.as_str() == normalized)
            .ok_or_else(|| format!("Unknown workflow action '{}'", s))
    }
}

//==============================================================================
// Data Inputs
//==============================================================================

/// Validation type selected for a data-input field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ValidationType {
    #[default]
    Any,
    #[serde(rename = "Whole Number", alias = "WholeNumber")]
    WholeNumber,
    Decimal,
    List,
    Custom,
}

impl ValidationType {
    pub fn label(self) -> &'static str {
        match self {
            ValidationType::Any => "Any",
            ValidationType::WholeNumber => "Whole Number",
            ValidationType::Decimal => "Decimal",
            ValidationType::List => "List",
            ValidationType::Custom => "Custom",
        }
    }
}

/// Validation settings attached to a data-input field
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidationRule {
    #[serde(rename = "type", default)]
    pub kind: ValidationType,
    /// Comma-separated choices for `List`, a regular expression for `Custom`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<String>,
}

/// A single data-input field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataInputField {
    /// Opaque key; never the cell identifier
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub validation: ValidationRule,
}

impl DataInputField {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            id: new_id("field"),
            label: label.into(),
            validation: ValidationRule::default(),
        }
    }

    pub fn with_validation(mut self, kind: ValidationType, options: Option<&str>) -> Self {
        self.validation = ValidationRule {
            kind,
            options: options.map(str::to_string),
        };
        self
    }
}

/// An ordered group of data-input fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataInputSection {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub fields: Vec<DataInputField>,
}

impl DataInputSection {
    pub fn new(title: impl Into<String>, fields: Vec<DataInputField>) -> Self {
        Self {
            id: new_id("section"),
            title: title.into(),
            fields,
        }
    }
}

//==============================================================================
// Formulas and Key/Value Fields
//==============================================================================

/// A user-authored formula: a display label and the formula text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormulaField {
    pub id: String,
    #[serde(default)]
    pub label: String,
    /// Formula text, optionally prefixed with a cosmetic `=`
    #[serde(default)]
    pub value: String,
}

impl FormulaField {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: new_id("formula"),
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Header ("template info") and analysis-info fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValueField {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default, deserialize_with = "deserialize_cell_text")]
    pub value: String,
}

//==============================================================================
// Persisted Template Document
//==============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FieldBlock {
    #[serde(default)]
    pub fields: Vec<KeyValueField>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DataInputs {
    #[serde(default)]
    pub sections: Vec<DataInputSection>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Calculation {
    #[serde(default)]
    pub formulas: Vec<FormulaField>,
}

/// The `document_data` stored by the backend for a template or record
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TemplateDocument {
    /// Workflow status; not part of the backend payload, set by tooling
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(default)]
    pub header: FieldBlock,
    #[serde(default, rename = "sampleInfo")]
    pub sample_info: FieldBlock,
    #[serde(default, rename = "dataInputs")]
    pub data_inputs: DataInputs,
    #[serde(default)]
    pub calculation: Calculation,
    #[serde(default, deserialize_with = "deserialize_value_map")]
    pub verification_data: ValueMap,
}

impl TemplateDocument {
    pub fn sections(&self) -> &[DataInputSection] {
        &self.data_inputs.sections
    }

    pub fn formulas(&self) -> &[FormulaField] {
        &self.calculation.formulas
    }

    /// Status used when the document does not carry one
    pub fn effective_status(&self) -> Status {
        self.status.unwrap_or(Status::Draft)
    }

    /// Value map seen by formulas: header and analysis-info fields under
    /// their own ids, overlaid by the stored verification values.
    pub fn value_map(&self) -> ValueMap {
        let mut values = ValueMap::new();
        for field in self.header.fields.iter().chain(&self.sample_info.fields) {
            values.insert(field.id.clone(), field.value.clone());
        }
        for (key, value) in &self.verification_data {
            values.insert(key.clone(), value.clone());
        }
        values
    }
}

//==============================================================================
// Helpers
//==============================================================================

/// Fresh opaque id, e.g. `formula_3f2a...`
pub fn new_id(prefix: &str) -> String {
    format!("{}_{}", prefix, uuid::Uuid::new_v4().simple())
}

/// Cell values arrive as strings from the form but as numbers from
/// hand-written fixtures.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawCellValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
}

impl RawCellValue {
    fn into_text(self) -> String {
        match self {
            RawCellValue::Text(s) => s,
            RawCellValue::Integer(i) => i.to_string(),
            RawCellValue::Float(f) => f.to_string(),
            RawCellValue::Boolean(b) => b.to_string(),
        }
    }
}

fn deserialize_cell_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<RawCellValue> = Option::deserialize(deserializer)?;
    Ok(raw.map(RawCellValue::into_text).unwrap_or_default())
}

fn deserialize_value_map<'de, D>(deserializer: D) -> Result<ValueMap, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<BTreeMap<String, Option<RawCellValue>>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(key, value)| (key, value.map(RawCellValue::into_text).unwrap_or_default()))
        .collect())
}
