use crate::error::{CaljarError, CaljarResult};
use crate::types::TemplateDocument;
use jsonschema::JSONSchema;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, warn};

/// Serialization format of a template document, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> CaljarResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        match ext.as_deref() {
            Some("json") => Ok(DocumentFormat::Json),
            Some("yaml") | Some("yml") => Ok(DocumentFormat::Yaml),
            _ => Err(CaljarError::Parse(format!(
                "Unsupported file type: {} (expected .json, .yaml or .yml)",
                path.display()
            ))),
        }
    }
}

/// Load a template document from `.json`, `.yaml` or `.yml`.
///
/// The raw document is checked against the embedded JSON Schema before it
/// is deserialized, so structural problems are reported with their JSON
/// path instead of a serde message. Cell identifiers are not stored; they
/// are derived again from `dataInputs.sections` by the caller.
///
/// # Example
/// ```no_run
/// use caljar::parser::parse_document;
/// use std::path::Path;
///
/// let doc = parse_document(Path::new("template.yaml"))?;
/// println!("Formulas: {}", doc.formulas().len());
/// # Ok::<(), caljar::error::CaljarError>(())
/// ```
pub fn parse_document(path: &Path) -> CaljarResult<TemplateDocument> {
    let format = DocumentFormat::from_path(path)?;
    let content = std::fs::read_to_string(path)?;
    debug!(path = %path.display(), ?format, "parsing document");
    parse_document_str(&content, format)
}

/// Parse document text that is already in memory
pub fn parse_document_str(content: &str, format: DocumentFormat) -> CaljarResult<TemplateDocument> {
    // An empty file is a document with no blocks
    if content.trim().is_empty() {
        return Ok(TemplateDocument::default());
    }

    let raw: serde_json::Value = match format {
        DocumentFormat::Json => serde_json::from_str(content)?,
        DocumentFormat::Yaml => serde_yaml::from_str(content)?,
    };

    validate_against_schema(&raw)?;

    let document: TemplateDocument = serde_json::from_value(raw)?;
    warn_on_duplicate_ids(&document);
    Ok(document)
}

/// Validate a raw document against the CalJar JSON Schema
pub fn validate_against_schema(document: &serde_json::Value) -> CaljarResult<()> {
    let schema_str = include_str!("../../schema/caljar-document.schema.json");
    let schema_value: serde_json::Value = serde_json::from_str(schema_str)
        .map_err(|e| CaljarError::Validation(format!("Failed to parse schema: {}", e)))?;

    let compiled_schema = JSONSchema::compile(&schema_value)
        .map_err(|e| CaljarError::Validation(format!("Failed to compile schema: {}", e)))?;

    if let Err(errors) = compiled_schema.validate(document) {
        let error_messages: Vec<String> = errors
            .map(|e| format!("  - {} (at {})", e, display_path(&e.instance_path.to_string())))
            .collect();
        return Err(CaljarError::Validation(format!(
            "Schema validation failed:\n{}",
            error_messages.join("\n")
        )));
    }

    Ok(())
}

fn display_path(pointer: &str) -> String {
    if pointer.is_empty() {
        "/".to_string()
    } else {
        pointer.to_string()
    }
}

/// Duplicate field ids make the field-to-cell mapping ambiguous
fn warn_on_duplicate_ids(document: &TemplateDocument) {
    let mut seen = HashSet::new();
    for section in document.sections() {
        for field in &section.fields {
            if !seen.insert(field.id.as_str()) {
                warn!(field_id = %field.id, "duplicate data-input field id");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Status, ValidationType};

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            DocumentFormat::from_path(Path::new("t.JSON")).unwrap(),
            DocumentFormat::Json
        );
        assert_eq!(
            DocumentFormat::from_path(Path::new("t.yml")).unwrap(),
            DocumentFormat::Yaml
        );
        assert!(DocumentFormat::from_path(Path::new("t.xlsx")).is_err());
        assert!(DocumentFormat::from_path(Path::new("template")).is_err());
    }

    #[test]
    fn test_parse_yaml_document() {
        let yaml = r#"
status: REJECTED
dataInputs:
  sections:
    - id: s1
      title: Weighing
      fields:
        - id: w
          label: Weight
          validation: { type: Decimal }
        - id: r
          label: Result
          validation: { type: List, options: "Pass,Fail" }
calculation:
  formulas:
    - id: c1
      label: Density
      value: "=A1/A2"
verification_data:
  A1: 5
  A2: "1"
"#;
        let doc = parse_document_str(yaml, DocumentFormat::Yaml).unwrap();
        assert_eq!(doc.status, Some(Status::Rejected));
        assert_eq!(doc.sections()[0].fields.len(), 2);
        assert_eq!(
            doc.sections()[0].fields[1].validation.kind,
            ValidationType::List
        );
        assert_eq!(doc.verification_data.get("A1").map(String::as_str), Some("5"));
    }

    #[test]
    fn test_empty_yaml_is_empty_document() {
        let doc = parse_document_str("", DocumentFormat::Yaml).unwrap();
        assert!(doc.sections().is_empty());
    }

    #[test]
    fn test_schema_rejects_unknown_status() {
        let err = parse_document_str(r#"{ "status": "PUBLISHED" }"#, DocumentFormat::Json)
            .unwrap_err();
        assert!(matches!(err, CaljarError::Validation(_)));
        assert!(err.to_string().contains("/status"));
    }

    #[test]
    fn test_schema_rejects_field_without_id() {
        let json = r#"{ "dataInputs": { "sections": [ { "id": "s", "fields": [ { "label": "x" } ] } ] } }"#;
        let err = parse_document_str(json, DocumentFormat::Json).unwrap_err();
        assert!(matches!(err, CaljarError::Validation(_)));
    }

    #[test]
    fn test_schema_rejects_non_string_formula() {
        let json = r#"{ "calculation": { "formulas": [ { "id": "c", "value": 12 } ] } }"#;
        assert!(matches!(
            parse_document_str(json, DocumentFormat::Json),
            Err(CaljarError::Validation(_))
        ));
    }

    #[test]
    fn test_malformed_json_is_json_error() {
        assert!(matches!(
            parse_document_str("{ not json", DocumentFormat::Json),
            Err(CaljarError::Json(_))
        ));
    }
}
