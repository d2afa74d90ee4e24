use std::path::Path;

use bytes::Bytes;
use tracing::{debug, warn};

use crate::error::ClientError;

const ALLOWED_MIME_TYPES: [&str; 4] = [
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "text/plain",
];

/// A contract accepted for analysis.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: String,
    pub body: Bytes,
}

impl UploadFile {
    pub fn new(
        file_name: &str,
        declared_type: Option<&str>,
        body: Bytes,
    ) -> Result<Self, ClientError> {
        let content_type = accepted_content_type(file_name, declared_type)?;
        if body.is_empty() {
            return Err(ClientError::Validation(format!("{} is empty", file_name)));
        }
        Ok(Self {
            file_name: file_name.to_string(),
            content_type: content_type.to_string(),
            body,
        })
    }

    /// Checks the type before touching the disk, so a wrong file is never read.
    pub fn from_path(path: &Path, declared_type: Option<&str>) -> Result<Self, ClientError> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ClientError::Validation(format!("bad file path {}", path.display())))?;
        accepted_content_type(file_name, declared_type)?;
        let body = std::fs::read(path).map_err(|e| ClientError::io(path, e))?;
        debug!(file = %file_name, bytes = body.len(), "upload file loaded");
        Self::new(file_name, declared_type, Bytes::from(body))
    }
}

/// PDF, Word (DOC/DOCX) or plain text, by declared MIME type or by extension.
pub fn accepted_content_type(
    file_name: &str,
    declared_type: Option<&str>,
) -> Result<&'static str, ClientError> {
    if let Some(declared) = declared_type {
        let declared = declared.trim().to_ascii_lowercase();
        if let Some(ct) = ALLOWED_MIME_TYPES.iter().find(|ct| **ct == declared) {
            return Ok(ct);
        }
    }
    match mime_from_ext(file_name) {
        Some(ct) => Ok(ct),
        None => {
            warn!(file = %file_name, declared = ?declared_type, "unsupported file type");
            Err(ClientError::Validation(
                "Please choose a PDF, Word (DOC/DOCX) or TXT file.".into(),
            ))
        }
    }
}

fn mime_from_ext(file_name: &str) -> Option<&'static str> {
    let ext = Path::new(file_name)
        .extension()?
        .to_str()?
        .to_ascii_lowercase();
    match ext.as_str() {
        "pdf" => Some("application/pdf"),
        "doc" => Some("application/msword"),
        "docx" => Some("application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
        "txt" => Some("text/plain"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_from_ext() {
        assert_eq!(mime_from_ext("lease.PDF"), Some("application/pdf"));
        assert_eq!(mime_from_ext("a.doc"), Some("application/msword"));
        assert!(mime_from_ext("a.docx").unwrap().contains("wordprocessingml"));
        assert_eq!(mime_from_ext("notes.txt"), Some("text/plain"));
        assert_eq!(mime_from_ext("photo.jpg"), None);
        assert_eq!(mime_from_ext("README"), None);
    }

    #[test]
    fn declared_type_wins_over_extension() {
        assert_eq!(
            accepted_content_type("contract", Some("application/pdf")).unwrap(),
            "application/pdf"
        );
        assert_eq!(
            accepted_content_type("contract.txt", Some("image/png")).unwrap(),
            "text/plain"
        );
        assert!(accepted_content_type("photo.png", Some("image/png")).is_err());
    }

    #[test]
    fn empty_file_is_rejected() {
        let err = UploadFile::new("a.pdf", None, Bytes::new()).unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
    }

    #[test]
    fn from_path_rejects_before_reading() {
        // The path does not exist; a read attempt would produce a different message.
        let err = UploadFile::from_path(Path::new("/nonexistent/photo.jpg"), None).unwrap_err();
        assert!(err.to_string().contains("PDF"));
    }

    #[test]
    fn unreadable_allowed_file_is_an_io_error() {
        let err = UploadFile::from_path(Path::new("/nonexistent/contract.pdf"), None).unwrap_err();
        assert!(matches!(err, ClientError::Io { ref path, .. } if path.ends_with("contract.pdf")));
        assert!(!err.is_retryable());
    }

    #[test]
    fn from_path_reads_allowed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("contract.txt");
        std::fs::write(&path, "The parties agree...").unwrap();

        let file = UploadFile::from_path(&path, None).unwrap();
        assert_eq!(file.file_name, "contract.txt");
        assert_eq!(file.content_type, "text/plain");
        assert_eq!(&file.body[..], b"The parties agree...");
    }
}
