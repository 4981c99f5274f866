//! Status translation and diagnostic retrieval.
//!
//! Every foreign call result passes through [`ErrorTranslator::translate`].
//! Only `OCI_ERROR` triggers a diagnostic fetch, and the fetch is made against
//! one of two sinks: the environment handle (environment creation and handle
//! allocation) or the error handle (everything issued once a connection has
//! one). The two must not be mixed up; the runtime files records on the
//! handle that was passed to the failing call.

use crate::core::ffi::{ForeignApi, HandleType, OutBuffer, RawHandle, Status, StatusClass, OCI_ERROR_MAXMSG_SIZE2};
use crate::core::{OciError, Result};
use std::fmt;
use tracing::debug;

/// Handle from which failure text is retrieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticSource {
    Environment,
    ErrorContext,
}

impl DiagnosticSource {
    pub fn handle_type(self) -> HandleType {
        match self {
            DiagnosticSource::Environment => HandleType::Environment,
            DiagnosticSource::ErrorContext => HandleType::Error,
        }
    }
}

impl fmt::Display for DiagnosticSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticSource::Environment => f.write_str("environment"),
            DiagnosticSource::ErrorContext => f.write_str("error"),
        }
    }
}

/// Turns raw statuses into [`OciError`]s.
///
/// Borrowing the handles ties a translator to the connection that issued the
/// call, so it cannot outlive them.
#[derive(Clone, Copy)]
pub struct ErrorTranslator<'a> {
    api: &'a dyn ForeignApi,
    environment: RawHandle,
    error: RawHandle,
}

impl<'a> ErrorTranslator<'a> {
    pub fn new(api: &'a dyn ForeignApi, environment: RawHandle, error: RawHandle) -> Self {
        Self {
            api,
            environment,
            error,
        }
    }

    /// Translator for calls made before an error handle exists.
    pub fn for_environment(api: &'a dyn ForeignApi, environment: RawHandle) -> Self {
        Self::new(api, environment, RawHandle::NULL)
    }

    /// `Ok(())` for `OCI_SUCCESS`, otherwise the structured failure.
    pub fn translate(&self, status: Status, source: DiagnosticSource) -> Result<()> {
        match status.classify() {
            StatusClass::Success => Ok(()),
            StatusClass::Error => Err(self.fetch(source)),
            StatusClass::InvalidHandle => Err(OciError::InvalidHandle),
            StatusClass::Unknown(code) => Err(OciError::UnknownStatus(code)),
        }
    }

    fn fetch(&self, source: DiagnosticSource) -> OciError {
        let handle = match source {
            DiagnosticSource::Environment => self.environment,
            DiagnosticSource::ErrorContext => self.error,
        };
        let mut buf = vec![0u8; OCI_ERROR_MAXMSG_SIZE2];
        let mut code = 0i32;
        let status = self
            .api
            .error_get(handle, 1, &mut code, OutBuffer::new(&mut buf), source.handle_type());
        debug!(%source, %status, "fetched diagnostic record");

        // The fetch goes through the same table; an OCI_ERROR here has no
        // further record to read.
        match status.classify() {
            StatusClass::Success => match message_from_buffer(&buf) {
                Ok(message) => OciError::Diagnostic(message),
                Err(err) => err,
            },
            StatusClass::Error => OciError::DiagnosticUnavailable(source),
            StatusClass::InvalidHandle => OciError::InvalidHandle,
            StatusClass::Unknown(code) => OciError::UnknownStatus(code),
        }
    }
}

impl fmt::Debug for ErrorTranslator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorTranslator")
            .field("environment", &self.environment)
            .field("error", &self.error)
            .finish()
    }
}

/// Text of a diagnostic buffer up to its first null byte.
///
/// A buffer without a terminator is reported as
/// [`OciError::UnterminatedDiagnostic`] rather than truncated.
pub fn message_from_buffer(buf: &[u8]) -> Result<String> {
    let end = buf
        .iter()
        .position(|&b| b == 0)
        .ok_or(OciError::UnterminatedDiagnostic(buf.len()))?;
    Ok(String::from_utf8_lossy(&buf[..end]).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::FakeApi;

    const ENV: RawHandle = RawHandle::NULL;

    fn env_and_err() -> (RawHandle, RawHandle) {
        (RawHandle::from_addr(0x10), RawHandle::from_addr(0x20))
    }

    #[test]
    fn test_success_does_not_fetch() {
        let fake = FakeApi::new();
        let translator = ErrorTranslator::for_environment(&fake, ENV);
        assert!(translator.translate(Status::SUCCESS, DiagnosticSource::Environment).is_ok());
        assert!(fake.error_gets().is_empty());
    }

    #[test]
    fn test_error_fetches_from_error_handle() {
        let fake = FakeApi::new().with_diagnostic(HandleType::Error, "ORA-01017: invalid username");
        let (env, err) = env_and_err();
        let translator = ErrorTranslator::new(&fake, env, err);

        let result = translator.translate(Status::ERROR, DiagnosticSource::ErrorContext);
        match result {
            Err(OciError::Diagnostic(msg)) => assert_eq!(msg, "ORA-01017: invalid username"),
            other => panic!("Expected diagnostic error, got {other:?}"),
        }
        assert_eq!(fake.error_gets(), vec![HandleType::Error]);
    }

    #[test]
    fn test_sources_are_not_conflated() {
        let fake = FakeApi::new()
            .with_diagnostic(HandleType::Error, "from error handle")
            .with_diagnostic(HandleType::Environment, "from environment");
        let (env, err) = env_and_err();
        let translator = ErrorTranslator::new(&fake, env, err);

        let env_err = translator
            .translate(Status::ERROR, DiagnosticSource::Environment)
            .unwrap_err();
        assert_eq!(env_err.to_string(), "from environment");
        let ctx_err = translator
            .translate(Status::ERROR, DiagnosticSource::ErrorContext)
            .unwrap_err();
        assert_eq!(ctx_err.to_string(), "from error handle");
    }

    #[test]
    fn test_invalid_handle_ignores_diagnostics() {
        let fake = FakeApi::new().with_diagnostic(HandleType::Error, "should not be read");
        let translator = ErrorTranslator::new(&fake, ENV, RawHandle::from_addr(0x20));

        let err = translator
            .translate(Status::INVALID_HANDLE, DiagnosticSource::ErrorContext)
            .unwrap_err();
        assert!(matches!(err, OciError::InvalidHandle));
        assert!(fake.error_gets().is_empty());
    }

    #[test]
    fn test_unknown_status_embeds_code() {
        let fake = FakeApi::new();
        let translator = ErrorTranslator::for_environment(&fake, ENV);

        let err = translator
            .translate(Status(99), DiagnosticSource::Environment)
            .unwrap_err();
        assert!(matches!(err, OciError::UnknownStatus(99)));
        assert!(err.to_string().contains("99"));
    }

    #[test]
    fn test_unterminated_message_is_integrity_failure() {
        let fake = FakeApi::new().with_raw_diagnostic(HandleType::Error, vec![b'x'; OCI_ERROR_MAXMSG_SIZE2]);
        let translator = ErrorTranslator::new(&fake, ENV, RawHandle::from_addr(0x20));

        let err = translator
            .translate(Status::ERROR, DiagnosticSource::ErrorContext)
            .unwrap_err();
        assert!(matches!(err, OciError::UnterminatedDiagnostic(OCI_ERROR_MAXMSG_SIZE2)));
    }

    #[test]
    fn test_failed_fetch_is_reported() {
        let fake = FakeApi::new().fail_error_get(Status::ERROR);
        let translator = ErrorTranslator::for_environment(&fake, RawHandle::from_addr(0x10));
        let err = translator
            .translate(Status::ERROR, DiagnosticSource::Environment)
            .unwrap_err();
        assert!(matches!(err, OciError::DiagnosticUnavailable(DiagnosticSource::Environment)));

        let fake = FakeApi::new().fail_error_get(Status(100));
        let translator = ErrorTranslator::for_environment(&fake, RawHandle::from_addr(0x10));
        let err = translator
            .translate(Status::ERROR, DiagnosticSource::Environment)
            .unwrap_err();
        assert!(matches!(err, OciError::UnknownStatus(100)));
    }

    #[test]
    fn test_message_from_buffer() {
        assert_eq!(message_from_buffer(b"ORA-00942\0garbage").unwrap(), "ORA-00942");
        assert_eq!(message_from_buffer(b"\0").unwrap(), "");
        assert!(matches!(
            message_from_buffer(b"abc"),
            Err(OciError::UnterminatedDiagnostic(3))
        ));
    }
}
