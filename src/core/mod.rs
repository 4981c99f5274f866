//! Core Module for ocibridge
//!
//! Handle ownership, status translation and the connection lifecycle built
//! on top of the foreign call boundary in [`ffi`].

pub mod db;
pub mod diagnostics;
pub mod error;
pub mod ffi;
pub mod handle;

// Re-export commonly used types for convenience
pub use diagnostics::{DiagnosticSource, ErrorTranslator};
pub use error::{OciError, Result};
pub use handle::NativeHandle;
