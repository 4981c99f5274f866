//! Error types for ocibridge.
//!
//! Every status code returned by a foreign call is turned into one of the
//! OCI variants below by [`ErrorTranslator`](crate::core::diagnostics::ErrorTranslator);
//! callers never see raw codes. The remaining variants cover configuration
//! and local validation.
use crate::core::diagnostics::DiagnosticSource;
use thiserror::Error;

/// Error type shared by the whole crate.
#[derive(Error, Debug)]
pub enum OciError {
    /// The call failed and the runtime supplied a diagnostic message.
    ///
    /// The message is reproduced verbatim, e.g. `ORA-01017: invalid username/password`.
    #[error("{0}")]
    Diagnostic(String),

    /// The call was given a handle the runtime does not recognise.
    #[error("OCI call returned OCI_INVALID_HANDLE")]
    InvalidHandle,

    /// The call returned a status outside the recognised set.
    #[error("OCI call returned unknown status {0}")]
    UnknownStatus(i16),

    /// The diagnostic fetch reported success but the message buffer held no
    /// terminating null byte.
    #[error("diagnostic message was not null-terminated within {0} bytes")]
    UnterminatedDiagnostic(usize),

    /// The diagnostic-retrieval call itself failed with OCI_ERROR.
    #[error("diagnostic retrieval from the {0} handle failed")]
    DiagnosticUnavailable(DiagnosticSource),

    /// Transaction bookkeeping errors
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Credentials the foreign API cannot accept
    #[error("Credential error: {0}")]
    Credentials(String),

    /// Configuration loading and validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File system and I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Functionality not compiled into this build
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

impl OciError {
    /// Returns true for errors produced from a foreign-call status.
    pub fn is_foreign(&self) -> bool {
        matches!(
            self,
            OciError::Diagnostic(_)
                | OciError::InvalidHandle
                | OciError::UnknownStatus(_)
                | OciError::UnterminatedDiagnostic(_)
                | OciError::DiagnosticUnavailable(_)
        )
    }
}

/// Type alias for Result to use OciError as the error type.
pub type Result<T> = std::result::Result<T, OciError>;
