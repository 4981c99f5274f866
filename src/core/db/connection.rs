//! Connection lifecycle.
//!
//! The session protocol is encoded in the types:
//!
//! ```text
//! Environment::create ──► Environment ──allocate_handles──► Connection ──login──► Session
//!                                                              │                    │
//!                                                              └──── close/drop ────┴──► (closed)
//! ```
//!
//! Each step consumes the previous state, so handles always exist before the
//! call that needs them and a closed connection cannot be used again.
//! Teardown runs on every path out of [`Connection`], including a failed
//! login and a plain drop, and only touches handles that are still allocated.

use super::Transaction;
use crate::core::diagnostics::{DiagnosticSource, ErrorTranslator};
use crate::core::ffi::{EnvMode, HandleType, InBytes, SharedApi, Status};
use crate::core::handle::NativeHandle;
use crate::core::{OciError, Result};
use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;
use tracing::{debug, info, warn};

/// Connections are `Send` but not `Sync`: one owner drives them at a time.
type NotSync = PhantomData<Cell<()>>;

/// Login credentials as raw bytes.
///
/// The runtime interprets the bytes itself; each field is passed with its
/// exact length, so embedded nulls and missing terminators are fine.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    user: Vec<u8>,
    password: Vec<u8>,
    connect: Vec<u8>,
}

impl Credentials {
    pub fn new(
        user: impl Into<Vec<u8>>,
        password: impl Into<Vec<u8>>,
        connect: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
            connect: connect.into(),
        }
    }

    pub fn user(&self) -> &[u8] {
        &self.user
    }

    /// Connect descriptor or TNS alias.
    pub fn connect(&self) -> &[u8] {
        &self.connect
    }

    fn validate(&self) -> Result<()> {
        let fields = [
            ("user", &self.user),
            ("password", &self.password),
            ("connect", &self.connect),
        ];
        for (name, value) in fields {
            if u32::try_from(value.len()).is_err() {
                return Err(OciError::Credentials(format!(
                    "{name} is {} bytes, the limit is {}",
                    value.len(),
                    u32::MAX
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &String::from_utf8_lossy(&self.user))
            .field("password", &"<redacted>")
            .field("connect", &String::from_utf8_lossy(&self.connect))
            .finish()
    }
}

/// An environment with nothing allocated beneath it yet.
pub struct Environment {
    api: SharedApi,
    env: NativeHandle,
    _not_sync: NotSync,
}

impl Environment {
    /// Creates the environment resource.
    ///
    /// Failure is fatal: nothing else is allocated and no handle survives.
    pub fn create(api: SharedApi, mode: EnvMode) -> Result<Self> {
        let mut env = NativeHandle::unallocated(api.clone(), HandleType::Environment);
        let status = api.env_create(env.slot(), mode);
        if let Err(err) = ErrorTranslator::for_environment(api.as_ref(), env.raw())
            .translate(status, DiagnosticSource::Environment)
        {
            // The runtime may hand back an environment just to carry the
            // diagnostic.
            env.free();
            return Err(err);
        }
        debug!(?mode, addr = env.raw().addr(), "created environment");
        Ok(Self {
            api,
            env,
            _not_sync: PhantomData,
        })
    }

    pub fn handle(&self) -> &NativeHandle {
        &self.env
    }

    /// Allocates the service-context and error handles.
    ///
    /// Both allocations report through the environment's diagnostics. On
    /// failure everything allocated so far is released before returning.
    pub fn allocate_handles(mut self) -> Result<Connection> {
        let mut service = NativeHandle::allocate(&self.env, HandleType::ServiceContext)?;
        let error = match NativeHandle::allocate(&self.env, HandleType::Error) {
            Ok(handle) => handle,
            Err(err) => {
                service.free();
                return Err(err);
            }
        };

        let environment = std::mem::replace(
            &mut self.env,
            NativeHandle::unallocated(self.api.clone(), HandleType::Environment),
        );
        Ok(Connection {
            api: self.api.clone(),
            environment,
            service,
            error,
            transaction: None,
            session_open: false,
            _not_sync: PhantomData,
        })
    }
}

impl Drop for Environment {
    fn drop(&mut self) {
        self.env.free();
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment").field("env", &self.env).finish()
    }
}

/// Environment, service-context and error handles, not yet logged in.
pub struct Connection {
    api: SharedApi,
    environment: NativeHandle,
    service: NativeHandle,
    error: NativeHandle,
    transaction: Option<Transaction>,
    session_open: bool,
    _not_sync: NotSync,
}

impl Connection {
    /// Creates the environment and allocates the connection handles.
    pub fn open(api: SharedApi, mode: EnvMode) -> Result<Self> {
        Environment::create(api, mode)?.allocate_handles()
    }

    pub fn environment(&self) -> &NativeHandle {
        &self.environment
    }

    pub fn service_context(&self) -> &NativeHandle {
        &self.service
    }

    pub fn error_context(&self) -> &NativeHandle {
        &self.error
    }

    pub fn is_session_open(&self) -> bool {
        self.session_open
    }

    /// Translator bound to this connection's environment and error handles.
    pub fn translator(&self) -> ErrorTranslator<'_> {
        ErrorTranslator::new(self.api.as_ref(), self.environment.raw(), self.error.raw())
    }

    /// Allocates a handle of `kind` scoped to this connection's environment.
    pub fn allocate(&self, kind: HandleType) -> Result<NativeHandle> {
        NativeHandle::allocate(&self.environment, kind)
    }

    /// Logs in. A failed login tears the connection down before the error
    /// is returned.
    pub fn login(mut self, credentials: &Credentials) -> Result<Session> {
        credentials.validate()?;

        let status = self.api.logon(
            self.environment.raw(),
            self.error.raw(),
            self.service.slot(),
            InBytes::new(&credentials.user),
            InBytes::new(&credentials.password),
            InBytes::new(&credentials.connect),
        );
        let user = String::from_utf8_lossy(&credentials.user).into_owned();
        if let Err(err) = self.translator().translate(status, DiagnosticSource::ErrorContext) {
            warn!(%user, error = %err, "login failed");
            self.shutdown();
            return Err(err);
        }

        self.session_open = true;
        info!(%user, "session opened");
        Ok(Session { conn: self })
    }

    /// Releases the connection.
    pub fn close(mut self) {
        self.shutdown();
    }

    /// Logs off if needed, then frees the service context and the
    /// environment, children first. Safe to call repeatedly.
    pub(crate) fn shutdown(&mut self) {
        if self.session_open {
            let status = self.api.logoff(self.service.raw(), self.error.raw());
            if let Err(err) = self.translator().translate(status, DiagnosticSource::ErrorContext) {
                warn!(error = %err, "logoff failed");
            }
            self.session_open = false;
            info!("session closed");
        }
        self.transaction = None;
        self.service.free();
        self.environment.free();
        // Reclaimed by the runtime along with its parent environment.
        self.error.release();
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("environment", &self.environment)
            .field("service", &self.service)
            .field("error", &self.error)
            .field("transaction", &self.transaction)
            .field("session_open", &self.session_open)
            .finish()
    }
}

/// A logged-in connection.
#[derive(Debug)]
pub struct Session {
    conn: Connection,
}

impl Session {
    /// Runs the whole protocol: environment, handles, login.
    pub fn establish(api: SharedApi, mode: EnvMode, credentials: &Credentials) -> Result<Self> {
        Connection::open(api, mode)?.login(credentials)
    }

    pub fn is_open(&self) -> bool {
        self.conn.session_open
    }

    pub fn environment(&self) -> &NativeHandle {
        self.conn.environment()
    }

    pub fn service_context(&self) -> &NativeHandle {
        self.conn.service_context()
    }

    /// Error handle for collaborators issuing their own foreign calls.
    pub fn error_context(&self) -> &NativeHandle {
        self.conn.error_context()
    }

    pub fn translator(&self) -> ErrorTranslator<'_> {
        self.conn.translator()
    }

    /// Translates the status of a call made with this session's error handle.
    pub fn check(&self, status: Status) -> Result<()> {
        self.translator().translate(status, DiagnosticSource::ErrorContext)
    }

    pub fn allocate(&self, kind: HandleType) -> Result<NativeHandle> {
        self.conn.allocate(kind)
    }

    /// Handle for a statement to be prepared by the caller.
    pub fn new_statement_handle(&self) -> Result<NativeHandle> {
        self.allocate(HandleType::Statement)
    }

    /// Starts tracking a new transaction.
    ///
    /// Only one transaction reference is held; starting another while one is
    /// active is an error rather than a silent overwrite. This departs from
    /// the plain reassignment a bare `OCITransStart` wrapper would do: the
    /// caller must [`finish_transaction`](Session::finish_transaction) first.
    pub fn begin(&mut self) -> Result<&Transaction> {
        if let Some(active) = &self.conn.transaction {
            return Err(OciError::Transaction(format!(
                "transaction {} is still active",
                active.id()
            )));
        }
        let tx: &Transaction = self.conn.transaction.insert(Transaction::start());
        debug!(id = %tx.id(), "transaction started");
        Ok(tx)
    }

    pub fn transaction(&self) -> Option<&Transaction> {
        self.conn.transaction.as_ref()
    }

    /// Detaches the current transaction once it has been committed or
    /// rolled back.
    pub fn finish_transaction(&mut self) -> Option<Transaction> {
        let finished = self.conn.transaction.take();
        if let Some(tx) = &finished {
            debug!(id = %tx.id(), "transaction finished");
        }
        finished
    }

    /// Logs off and releases every handle.
    pub fn close(mut self) {
        self.conn.shutdown();
    }
}
