//! # Test Utilities Module
//!
//! A recording stand-in for the Oracle client library.
//!
//! [`FakeApi`] implements [`ForeignApi`] without touching foreign memory. It
//! hands out distinct fake addresses, records every call, and can be told to
//! fail specific calls or to serve specific diagnostic text, so the handle
//! lifecycle can be checked from the outside.

use crate::core::ffi::{
    EnvMode, ForeignApi, HandleType, InBytes, OutBuffer, RawHandle, Status,
};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// One recorded foreign call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    EnvCreate(EnvMode),
    HandleAlloc(HandleType),
    HandleFree(RawHandle, HandleType),
    Logon {
        user: Vec<u8>,
        password: Vec<u8>,
        connect: Vec<u8>,
    },
    Logoff,
    ErrorGet(HandleType),
}

#[derive(Debug, Default)]
struct FakeState {
    next_addr: usize,
    calls: Vec<Call>,
    allocated: usize,
}

/// Scriptable fake of the foreign runtime.
#[derive(Debug, Default)]
pub struct FakeApi {
    env_create_status: Option<Status>,
    env_create_hands_out: bool,
    alloc_status: HashMap<HandleType, Status>,
    free_status: HashMap<HandleType, Status>,
    logon_status: Option<Status>,
    logoff_status: Option<Status>,
    error_get_status: Option<Status>,
    diagnostics: HashMap<HandleType, Vec<u8>>,
    state: Mutex<FakeState>,
}

impl FakeApi {
    /// A runtime on which every call succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_env_create(mut self, status: Status) -> Self {
        self.env_create_status = Some(status);
        self
    }

    /// Like [`fail_env_create`](FakeApi::fail_env_create), but the slot is
    /// still populated, the way the runtime returns an environment that only
    /// carries the diagnostic.
    pub fn fail_env_create_with_handle(mut self, status: Status) -> Self {
        self.env_create_status = Some(status);
        self.env_create_hands_out = true;
        self
    }

    pub fn fail_alloc(mut self, kind: HandleType, status: Status) -> Self {
        self.alloc_status.insert(kind, status);
        self
    }

    pub fn fail_free(mut self, kind: HandleType, status: Status) -> Self {
        self.free_status.insert(kind, status);
        self
    }

    pub fn fail_logon(mut self, status: Status) -> Self {
        self.logon_status = Some(status);
        self
    }

    pub fn fail_logoff(mut self, status: Status) -> Self {
        self.logoff_status = Some(status);
        self
    }

    pub fn fail_error_get(mut self, status: Status) -> Self {
        self.error_get_status = Some(status);
        self
    }

    /// Diagnostic text served for `kind`, written with a null terminator.
    pub fn with_diagnostic(self, kind: HandleType, message: &str) -> Self {
        let mut bytes = message.as_bytes().to_vec();
        bytes.push(0);
        self.with_raw_diagnostic(kind, bytes)
    }

    /// Diagnostic bytes served for `kind` exactly as given.
    pub fn with_raw_diagnostic(mut self, kind: HandleType, bytes: Vec<u8>) -> Self {
        self.diagnostics.insert(kind, bytes);
        self
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn hand_out(&self, slot: &mut RawHandle) {
        let mut state = self.state();
        state.next_addr += 0x100;
        state.allocated += 1;
        *slot = RawHandle::from_addr(0x1000 + state.next_addr);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    /// Categories of successful and failed allocation requests, in order.
    pub fn allocations(&self) -> Vec<HandleType> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::HandleAlloc(kind) => Some(kind),
                _ => None,
            })
            .collect()
    }

    /// Categories of freed handles, in order.
    pub fn frees(&self) -> Vec<HandleType> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::HandleFree(_, kind) => Some(kind),
                _ => None,
            })
            .collect()
    }

    /// Sources that diagnostics were requested from, in order.
    pub fn error_gets(&self) -> Vec<HandleType> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::ErrorGet(kind) => Some(kind),
                _ => None,
            })
            .collect()
    }

    pub fn logoff_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, Call::Logoff))
            .count()
    }

    /// Handles handed out and not yet freed.
    pub fn live_handles(&self) -> usize {
        let freed = self.frees().len();
        self.state().allocated.saturating_sub(freed)
    }

    fn record(&self, call: Call) {
        self.state().calls.push(call);
    }
}

impl ForeignApi for FakeApi {
    fn env_create(&self, env: &mut RawHandle, mode: EnvMode) -> Status {
        self.record(Call::EnvCreate(mode));
        match self.env_create_status {
            Some(status) => {
                if self.env_create_hands_out {
                    self.hand_out(env);
                }
                status
            }
            None => {
                self.hand_out(env);
                Status::SUCCESS
            }
        }
    }

    fn handle_alloc(&self, parent: RawHandle, handle: &mut RawHandle, kind: HandleType) -> Status {
        self.record(Call::HandleAlloc(kind));
        if parent.is_null() {
            return Status::INVALID_HANDLE;
        }
        match self.alloc_status.get(&kind) {
            Some(status) => *status,
            None => {
                self.hand_out(handle);
                Status::SUCCESS
            }
        }
    }

    fn handle_free(&self, handle: RawHandle, kind: HandleType) -> Status {
        self.record(Call::HandleFree(handle, kind));
        self.free_status.get(&kind).copied().unwrap_or(Status::SUCCESS)
    }

    fn logon(
        &self,
        _env: RawHandle,
        _error: RawHandle,
        _service: &mut RawHandle,
        user: InBytes<'_>,
        password: InBytes<'_>,
        connect: InBytes<'_>,
    ) -> Status {
        self.record(Call::Logon {
            user: user.as_slice().to_vec(),
            password: password.as_slice().to_vec(),
            connect: connect.as_slice().to_vec(),
        });
        self.logon_status.unwrap_or(Status::SUCCESS)
    }

    fn logoff(&self, _service: RawHandle, _error: RawHandle) -> Status {
        self.record(Call::Logoff);
        self.logoff_status.unwrap_or(Status::SUCCESS)
    }

    fn error_get(
        &self,
        _handle: RawHandle,
        _record: u32,
        code: &mut i32,
        mut message: OutBuffer<'_>,
        kind: HandleType,
    ) -> Status {
        self.record(Call::ErrorGet(kind));
        if let Some(status) = self.error_get_status {
            return status;
        }
        let Some(text) = self.diagnostics.get(&kind) else {
            // OCI_NO_DATA: no record on this handle
            return Status(100);
        };
        let out = message.as_mut_slice();
        let n = text.len().min(out.len());
        out[..n].copy_from_slice(&text[..n]);
        *code = 1;
        Status::SUCCESS
    }
}
