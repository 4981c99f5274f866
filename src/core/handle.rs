//! Ownership of a single foreign handle.

use crate::core::diagnostics::{DiagnosticSource, ErrorTranslator};
use crate::core::ffi::{HandleType, RawHandle, SharedApi};
use crate::core::Result;
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

/// Owns one opaque foreign resource of a fixed category.
///
/// The address is either null or refers to a live resource of `kind`.
/// `NativeHandle` is deliberately not `Clone`: exactly one owner may free it,
/// and [`free`](NativeHandle::free) nulls the address so a second call is a
/// no-op. Dropping a handle does not free it; child handles are reclaimed by
/// the runtime together with their parent environment.
///
/// A handle allocated through a parent watches the parent's liveness token.
/// Once the parent is freed the child reads as unallocated and its `free`
/// no longer reaches the runtime.
pub struct NativeHandle {
    kind: HandleType,
    raw: RawHandle,
    api: SharedApi,
    alive: Option<Arc<()>>,
    parent: Option<Weak<()>>,
}

impl NativeHandle {
    /// Creates an empty handle of `kind`.
    pub(crate) fn unallocated(api: SharedApi, kind: HandleType) -> Self {
        Self {
            kind,
            raw: RawHandle::NULL,
            api,
            alive: Some(Arc::new(())),
            parent: None,
        }
    }

    /// Allocates a new handle of `kind` through `environment`.
    ///
    /// Failures are always reported from the environment's diagnostic
    /// source; the new handle does not exist yet to carry its own.
    pub fn allocate(environment: &NativeHandle, kind: HandleType) -> Result<NativeHandle> {
        let api = environment.api.clone();
        let parent_raw = environment.raw();
        let mut handle = NativeHandle::unallocated(api.clone(), kind);
        handle.parent = environment.alive.as_ref().map(Arc::downgrade);
        let status = api.handle_alloc(parent_raw, &mut handle.raw, kind);
        ErrorTranslator::for_environment(api.as_ref(), parent_raw)
            .translate(status, DiagnosticSource::Environment)?;
        debug!(kind = %kind, addr = handle.raw.addr(), "allocated handle");
        Ok(handle)
    }

    pub fn kind(&self) -> HandleType {
        self.kind
    }

    fn parent_alive(&self) -> bool {
        self.parent
            .as_ref()
            .map_or(true, |parent| parent.strong_count() > 0)
    }

    /// Address handed to foreign calls; null once this handle or its parent
    /// has been freed.
    pub fn raw(&self) -> RawHandle {
        if self.parent_alive() {
            self.raw
        } else {
            RawHandle::NULL
        }
    }

    pub fn is_allocated(&self) -> bool {
        !self.raw().is_null()
    }

    /// Requests deallocation. Best-effort: a failing free is logged, never
    /// returned, and the handle is treated as released either way.
    pub fn free(&mut self) {
        if self.raw.is_null() {
            return;
        }
        if !self.parent_alive() {
            debug!(kind = %self.kind, addr = self.raw.addr(), "parent already freed, handle reclaimed with it");
            self.release();
            return;
        }
        let status = self.api.handle_free(self.raw, self.kind);
        if status.is_success() {
            debug!(kind = %self.kind, addr = self.raw.addr(), "freed handle");
        } else {
            warn!(kind = %self.kind, addr = self.raw.addr(), %status, "failed to free handle");
        }
        self.release();
    }

    /// Forgets the address without calling into the runtime. Children
    /// allocated through this handle become unusable.
    pub(crate) fn release(&mut self) {
        self.raw = RawHandle::NULL;
        self.alive = None;
    }

    /// Out-parameter slot for calls that populate this handle.
    pub(crate) fn slot(&mut self) -> &mut RawHandle {
        &mut self.raw
    }
}

impl fmt::Debug for NativeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeHandle")
            .field("kind", &self.kind)
            .field("raw", &self.raw)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ffi::{EnvMode, Status};
    use crate::core::OciError;
    use crate::test_utils::{Call, FakeApi};
    use std::sync::Arc;

    fn environment(fake: &Arc<FakeApi>) -> NativeHandle {
        let api: SharedApi = fake.clone();
        let mut env = NativeHandle::unallocated(api.clone(), HandleType::Environment);
        assert!(api.env_create(env.slot(), EnvMode::Default).is_success());
        env
    }

    #[test]
    fn test_allocate_through_environment() {
        let fake = Arc::new(FakeApi::new());
        let env = environment(&fake);

        let stmt = NativeHandle::allocate(&env, HandleType::Statement).unwrap();
        assert_eq!(stmt.kind(), HandleType::Statement);
        assert!(stmt.is_allocated());
        assert_ne!(stmt.raw(), env.raw());
        assert_eq!(fake.allocations(), vec![HandleType::Statement]);
    }

    #[test]
    fn test_allocation_failure_uses_environment_diagnostics() {
        let fake = Arc::new(
            FakeApi::new()
                .fail_alloc(HandleType::Statement, Status::ERROR)
                .with_diagnostic(HandleType::Environment, "ORA-24315: illegal attribute type"),
        );
        let env = environment(&fake);

        let err = NativeHandle::allocate(&env, HandleType::Statement).unwrap_err();
        match err {
            OciError::Diagnostic(msg) => assert_eq!(msg, "ORA-24315: illegal attribute type"),
            other => panic!("Expected diagnostic error, got {other:?}"),
        }
        assert_eq!(fake.error_gets(), vec![HandleType::Environment]);
    }

    #[test]
    fn test_free_is_idempotent() {
        let fake = Arc::new(FakeApi::new());
        let env = environment(&fake);
        let mut stmt = NativeHandle::allocate(&env, HandleType::Statement).unwrap();
        let raw = stmt.raw();

        stmt.free();
        stmt.free();

        assert!(!stmt.is_allocated());
        let frees: Vec<_> = fake
            .calls()
            .into_iter()
            .filter(|c| matches!(c, Call::HandleFree(..)))
            .collect();
        assert_eq!(frees, vec![Call::HandleFree(raw, HandleType::Statement)]);
    }

    #[test]
    fn test_failed_free_still_releases() {
        let fake = Arc::new(FakeApi::new().fail_free(HandleType::Statement, Status::INVALID_HANDLE));
        let env = environment(&fake);
        let mut stmt = NativeHandle::allocate(&env, HandleType::Statement).unwrap();

        stmt.free();
        assert!(!stmt.is_allocated());
        assert_eq!(fake.frees(), vec![HandleType::Statement]);
    }

    #[test]
    fn test_child_free_after_parent_is_noop() {
        let fake = Arc::new(FakeApi::new());
        let mut env = environment(&fake);
        let mut stmt = NativeHandle::allocate(&env, HandleType::Statement).unwrap();
        assert!(stmt.is_allocated());

        env.free();
        assert!(!stmt.is_allocated());
        assert!(stmt.raw().is_null());

        stmt.free();
        assert_eq!(fake.frees(), vec![HandleType::Environment]);
    }

    #[test]
    fn test_unallocated_free_skips_runtime() {
        let fake = Arc::new(FakeApi::new());
        let api: SharedApi = fake.clone();
        let mut handle = NativeHandle::unallocated(api, HandleType::ServiceContext);
        handle.free();
        assert!(fake.calls().is_empty());
    }
}
