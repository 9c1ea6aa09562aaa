//! Error types for spec translation.

use std::path::PathBuf;

/// Result type alias for translation operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while translating a container specification.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // =========================================================================
    // Specification Errors
    // =========================================================================
    /// The container specification is internally inconsistent.
    #[error("invalid container specification: {0}")]
    InvalidSpec(String),

    /// Translator configuration could not be loaded.
    #[error("invalid translator configuration at {path}: {reason}")]
    InvalidConfig { path: PathBuf, reason: String },

    // =========================================================================
    // Environment Probe Errors
    // =========================================================================
    /// The ID map file could not be read.
    #[error("failed to read ID map {path}: {reason}")]
    IdMapUnreadable { path: PathBuf, reason: String },

    /// The ID map file has malformed content.
    #[error("malformed ID map {path} at line {line}: {reason}")]
    IdMapMalformed {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    // =========================================================================
    // Device Errors
    // =========================================================================
    /// A declared device could not be resolved to a device node.
    #[error("invalid device '{path}': {reason}")]
    InvalidDevice { path: String, reason: String },

    /// Enumerating host devices failed.
    #[error("failed to enumerate devices under {root}: {reason}")]
    DeviceEnumerationFailed { root: PathBuf, reason: String },

    // =========================================================================
    // Mount Errors
    // =========================================================================
    /// A mount carries an option that is unknown or conflicts with another.
    #[error("invalid option '{option}' for mount at {destination}: {reason}")]
    InvalidMountOption {
        destination: String,
        option: String,
        reason: String,
    },

    /// A mount has a type the runtime does not understand.
    #[error("unsupported mount type '{mount_type}' at {destination}")]
    UnsupportedMountType {
        destination: String,
        mount_type: String,
    },

    // =========================================================================
    // Namespace Errors
    // =========================================================================
    /// A namespace shared with another container could not be located.
    #[error("cannot join {kind} namespace of container '{container}': {reason}")]
    NamespaceUnavailable {
        container: String,
        kind: String,
        reason: String,
    },

    // =========================================================================
    // I/O Errors
    // =========================================================================
    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Returns true if retrying after the host environment changes may help.
    ///
    /// Only environment probe failures qualify. A specification that failed
    /// validation fails the same way every time.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::IdMapUnreadable { .. } | Self::IdMapMalformed { .. }
        )
    }
}
