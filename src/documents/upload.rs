//! Upload validation and content fingerprinting.

use sha2::{Digest, Sha256};
use std::path::Path;
use thiserror::Error;

/// Leading bytes of every PDF file.
pub const PDF_SIGNATURE: &[u8] = b"%PDF-";

/// Reasons an upload is refused before anything is stored.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    /// The multipart body carried no `file` field, or it was empty.
    #[error("File is required")]
    MissingFile,
    /// The filename does not end in `.pdf`.
    #[error("Only PDF files are allowed")]
    InvalidExtension,
    /// The content does not start with the PDF signature.
    #[error("Invalid file type, only PDF files are allowed")]
    InvalidContent,
    /// The content exceeds the configured limit.
    #[error(
        "File size ({:.2} MB) exceeds the maximum limit of {:.0} MB",
        megabytes(.size),
        megabytes(.limit)
    )]
    TooLarge {
        /// Size of the rejected upload in bytes.
        size: u64,
        /// Configured limit in bytes.
        limit: u64,
    },
}

fn megabytes(bytes: &u64) -> f64 {
    *bytes as f64 / (1024.0 * 1024.0)
}

/// Check filename, size, and signature of an upload.
pub fn validate_upload(filename: &str, content: &[u8], max_bytes: u64) -> Result<(), UploadError> {
    if content.is_empty() {
        return Err(UploadError::MissingFile);
    }

    let is_pdf = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
    if !is_pdf {
        return Err(UploadError::InvalidExtension);
    }

    let size = content.len() as u64;
    if size > max_bytes {
        return Err(UploadError::TooLarge {
            size,
            limit: max_bytes,
        });
    }

    if !content.starts_with(PDF_SIGNATURE) {
        return Err(UploadError::InvalidContent);
    }

    Ok(())
}

/// Hex-encoded SHA-256 of the content.
pub fn content_checksum(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}
