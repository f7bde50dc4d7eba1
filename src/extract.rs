use crate::store::types::SourceKind;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Unsupported file type: .{0}")]
    Unsupported(String),
    #[error("Could not read text from {0}: {1}")]
    Parse(String, String),
}

#[derive(Debug)]
pub struct Extracted {
    pub text: String,
    pub kind: SourceKind,
}

/// Opaque extraction collaborator: binary file in, plain text out. The
/// storage layer never sees the binary payload.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, filename: &str, bytes: &[u8]) -> Result<Extracted, ExtractError>;
}

pub struct FileExtractor;

impl TextExtractor for FileExtractor {
    fn extract(&self, filename: &str, bytes: &[u8]) -> Result<Extracted, ExtractError> {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "txt" | "md" | "markdown" => {
                let text = String::from_utf8(bytes.to_vec())
                    .map_err(|e| ExtractError::Parse(filename.to_string(), e.to_string()))?;
                Ok(Extracted {
                    text,
                    kind: SourceKind::Txt,
                })
            }
            "pdf" => {
                let text = pdf_extract::extract_text_from_mem(bytes)
                    .map_err(|e| ExtractError::Parse(filename.to_string(), e.to_string()))?;
                Ok(Extracted {
                    text,
                    kind: SourceKind::Pdf,
                })
            }
            other => Err(ExtractError::Unsupported(other.to_string())),
        }
    }
}
