//! Error types for image assembly.

/// Result type alias for image assembly operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while assembling or rewriting image tarballs.
///
/// All errors are fatal to the current invocation: there is no retry policy,
/// and a failed run must not be treated as having produced a usable output
/// archive.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // =========================================================================
    // Archive Errors
    // =========================================================================
    /// Malformed tar input.
    #[error("malformed archive: {0}")]
    InvalidArchive(String),

    // =========================================================================
    // Manifest Errors
    // =========================================================================
    /// Image tarball has no `manifest.json` entry.
    #[error("archive contains no manifest entry")]
    ManifestNotFound,

    /// Manifest JSON could not be parsed.
    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    /// Manifest lacks a required field.
    #[error("manifest missing required field: {field}")]
    MissingField { field: String },

    // =========================================================================
    // Rename Errors
    // =========================================================================
    /// Rename rule is malformed (missing separator or empty prefix).
    #[error("invalid rename rule '{rule}': {reason}")]
    InvalidRenameRule { rule: String, reason: String },

    // =========================================================================
    // Image Configuration Errors
    // =========================================================================
    /// Image configuration JSON could not be parsed.
    #[error("invalid image configuration: {0}")]
    InvalidImageConfig(String),

    // =========================================================================
    // I/O Errors
    // =========================================================================
    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}
