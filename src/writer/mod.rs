use crate::error::CaljarResult;
use crate::parser::DocumentFormat;
use crate::types::TemplateDocument;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Serialize a document in the given format. Computed results are never
/// part of the document, only the values they were computed from.
pub fn document_to_string(document: &TemplateDocument, format: DocumentFormat) -> CaljarResult<String> {
    Ok(match format {
        DocumentFormat::Json => {
            let mut text = serde_json::to_string_pretty(document)?;
            text.push('\n');
            text
        }
        DocumentFormat::Yaml => serde_yaml::to_string(document)?,
    })
}

/// Write a document in the format implied by the file extension.
///
/// An existing file is copied to `<file>.bak` first; the backup path is
/// returned when one was made.
pub fn write_document(path: &Path, document: &TemplateDocument) -> CaljarResult<Option<PathBuf>> {
    let format = DocumentFormat::from_path(path)?;
    let content = document_to_string(document, format)?;

    let backup = if path.exists() {
        let mut name = path.as_os_str().to_os_string();
        name.push(".bak");
        let backup_path = PathBuf::from(name);
        fs::copy(path, &backup_path)?;
        Some(backup_path)
    } else {
        None
    };

    fs::write(path, content)?;
    debug!(path = %path.display(), backup = backup.is_some(), "document written");
    Ok(backup)
}
