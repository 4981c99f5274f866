//! Boundary with the Oracle Call Interface.
//!
//! Everything that knows about raw foreign addresses and numeric status
//! words lives here. The rest of the crate talks to the runtime through the
//! [`ForeignApi`] trait, so a fake implementation can stand in for the real
//! client library in tests.

pub mod buffer;
#[cfg(feature = "oci")]
pub mod native;

use serde::Deserialize;
use std::fmt;
use std::sync::Arc;

pub use buffer::{InBytes, OutBuffer};
#[cfg(feature = "oci")]
pub use native::OciLibrary;

/// Largest diagnostic message the runtime will write (OCI_ERROR_MAXMSG_SIZE2).
pub const OCI_ERROR_MAXMSG_SIZE2: usize = 3072;

/// Status word returned by every foreign call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Status(pub i16);

impl Status {
    pub const SUCCESS: Status = Status(0);
    pub const ERROR: Status = Status(-1);
    pub const INVALID_HANDLE: Status = Status(-2);

    /// Narrows a native 32-bit `sword` the same way the runtime's callers do.
    pub fn from_sword(code: i32) -> Self {
        Status(code as i16)
    }

    pub fn code(self) -> i16 {
        self.0
    }

    pub fn is_success(self) -> bool {
        self == Status::SUCCESS
    }

    /// Maps the status onto the outcome classes the translator acts on.
    pub fn classify(self) -> StatusClass {
        match self {
            Status::SUCCESS => StatusClass::Success,
            Status::ERROR => StatusClass::Error,
            Status::INVALID_HANDLE => StatusClass::InvalidHandle,
            Status(other) => StatusClass::Unknown(other),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.classify() {
            StatusClass::Success => write!(f, "OCI_SUCCESS"),
            StatusClass::Error => write!(f, "OCI_ERROR"),
            StatusClass::InvalidHandle => write!(f, "OCI_INVALID_HANDLE"),
            StatusClass::Unknown(code) => write!(f, "{code}"),
        }
    }
}

/// Outcome class of a status word.
///
/// `OCI_SUCCESS_WITH_INFO`, `OCI_NO_DATA` and friends are deliberately
/// `Unknown`: this layer only recognises three codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    Error,
    InvalidHandle,
    Unknown(i16),
}

/// Category of a foreign handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleType {
    Environment,
    Error,
    ServiceContext,
    Statement,
    Describe,
    Server,
    Session,
    Transaction,
}

impl HandleType {
    /// The `OCI_HTYPE_*` constant for this category.
    pub fn code(self) -> u32 {
        match self {
            HandleType::Environment => 1,
            HandleType::Error => 2,
            HandleType::ServiceContext => 3,
            HandleType::Statement => 4,
            HandleType::Describe => 7,
            HandleType::Server => 8,
            HandleType::Session => 9,
            HandleType::Transaction => 10,
        }
    }
}

impl fmt::Display for HandleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HandleType::Environment => "environment",
            HandleType::Error => "error",
            HandleType::ServiceContext => "service context",
            HandleType::Statement => "statement",
            HandleType::Describe => "describe",
            HandleType::Server => "server",
            HandleType::Session => "session",
            HandleType::Transaction => "transaction",
        };
        f.write_str(name)
    }
}

/// Opaque address of a resource owned by the foreign runtime.
///
/// It is never dereferenced on the Rust side; only [`ForeignApi`]
/// implementations turn it back into a pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RawHandle(usize);

impl RawHandle {
    pub const NULL: RawHandle = RawHandle(0);

    pub fn from_addr(addr: usize) -> Self {
        RawHandle(addr)
    }

    pub fn addr(self) -> usize {
        self.0
    }

    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

/// Initialisation mode passed to environment creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvMode {
    #[default]
    Default,
    Threaded,
    Object,
}

impl EnvMode {
    pub fn code(self) -> u32 {
        match self {
            EnvMode::Default => 0,
            EnvMode::Threaded => 1,
            EnvMode::Object => 2,
        }
    }
}

/// The foreign entry points this crate drives.
///
/// Each method returns a single [`Status`]; out-parameters are written
/// through the references passed in and are only meaningful on success.
pub trait ForeignApi: Send + Sync {
    /// `OCIEnvCreate`
    fn env_create(&self, env: &mut RawHandle, mode: EnvMode) -> Status;

    /// `OCIHandleAlloc`
    fn handle_alloc(&self, parent: RawHandle, handle: &mut RawHandle, kind: HandleType) -> Status;

    /// `OCIHandleFree`
    fn handle_free(&self, handle: RawHandle, kind: HandleType) -> Status;

    /// `OCILogon`; writes the session's service context into `service`.
    fn logon(
        &self,
        env: RawHandle,
        error: RawHandle,
        service: &mut RawHandle,
        user: InBytes<'_>,
        password: InBytes<'_>,
        connect: InBytes<'_>,
    ) -> Status;

    /// `OCILogoff`
    fn logoff(&self, service: RawHandle, error: RawHandle) -> Status;

    /// `OCIErrorGet`; writes the diagnostic code and a null-terminated message.
    fn error_get(
        &self,
        handle: RawHandle,
        record: u32,
        code: &mut i32,
        message: OutBuffer<'_>,
        kind: HandleType,
    ) -> Status;
}

/// Shared, injectable handle to the foreign runtime.
pub type SharedApi = Arc<dyn ForeignApi>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(Status::SUCCESS.classify(), StatusClass::Success);
        assert_eq!(Status::ERROR.classify(), StatusClass::Error);
        assert_eq!(Status::INVALID_HANDLE.classify(), StatusClass::InvalidHandle);
        assert_eq!(Status(1).classify(), StatusClass::Unknown(1));
        assert_eq!(Status(100).classify(), StatusClass::Unknown(100));
    }

    #[test]
    fn test_status_from_sword_truncates() {
        assert_eq!(Status::from_sword(-1), Status::ERROR);
        assert_eq!(Status::from_sword(0x0001_0000), Status::SUCCESS);
        assert_eq!(Status::from_sword(99).code(), 99);
    }

    #[test]
    fn test_handle_type_codes() {
        assert_eq!(HandleType::Environment.code(), 1);
        assert_eq!(HandleType::Error.code(), 2);
        assert_eq!(HandleType::ServiceContext.code(), 3);
        assert_eq!(HandleType::Statement.code(), 4);
    }

    #[test]
    fn test_raw_handle_null() {
        assert!(RawHandle::NULL.is_null());
        assert!(RawHandle::default().is_null());
        assert!(!RawHandle::from_addr(0x1000).is_null());
    }

    #[test]
    fn test_env_mode_parses_lowercase() {
        #[derive(Deserialize)]
        struct Wrapper {
            mode: EnvMode,
        }
        let parsed: Wrapper = toml::from_str("mode = \"threaded\"").unwrap();
        assert_eq!(parsed.mode, EnvMode::Threaded);
        assert_eq!(parsed.mode.code(), 1);
    }
}
