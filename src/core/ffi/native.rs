//! [`ForeignApi`] backed by the Oracle client library.
//!
//! Entry points are described in the "Connect, Authorize, and Initialize"
//! and "Handle and Descriptor" chapters of the OCI reference.

use super::{EnvMode, ForeignApi, HandleType, InBytes, OutBuffer, RawHandle, Status};
use std::os::raw::{c_int, c_uint, c_void};
use std::ptr;
use tracing::warn;

#[cfg_attr(windows, link(name = "oci"))]
#[cfg_attr(not(windows), link(name = "clntsh"))]
extern "C" {
    fn OCIEnvCreate(
        envhpp: *mut *mut c_void,
        mode: c_uint,
        ctxp: *mut c_void,
        malocfp: *const c_void,
        ralocfp: *const c_void,
        mfreefp: *const c_void,
        xtramem_sz: usize,
        usrmempp: *mut *mut c_void,
    ) -> c_int;

    fn OCIHandleAlloc(
        parenth: *const c_void,
        hndlpp: *mut *mut c_void,
        htype: c_uint,
        xtramem_sz: usize,
        usrmempp: *mut *mut c_void,
    ) -> c_int;

    fn OCIHandleFree(hndlp: *mut c_void, htype: c_uint) -> c_int;

    fn OCILogon(
        envhp: *mut c_void,
        errhp: *mut c_void,
        svchp: *mut *mut c_void,
        username: *const u8,
        uname_len: c_uint,
        password: *const u8,
        passwd_len: c_uint,
        dbname: *const u8,
        dbname_len: c_uint,
    ) -> c_int;

    fn OCILogoff(svchp: *mut c_void, errhp: *mut c_void) -> c_int;

    fn OCIErrorGet(
        hndlp: *mut c_void,
        recordno: c_uint,
        sqlstate: *mut u8,
        errcodep: *mut i32,
        bufp: *mut u8,
        bufsiz: c_uint,
        htype: c_uint,
    ) -> c_int;
}

fn as_ptr(handle: RawHandle) -> *mut c_void {
    handle.addr() as *mut c_void
}

/// The system Oracle client library.
#[derive(Debug, Default, Clone, Copy)]
pub struct OciLibrary;

impl ForeignApi for OciLibrary {
    fn env_create(&self, env: &mut RawHandle, mode: EnvMode) -> Status {
        let mut out: *mut c_void = ptr::null_mut();
        let rc = unsafe {
            OCIEnvCreate(
                &mut out,
                mode.code(),
                ptr::null_mut(),
                ptr::null(),
                ptr::null(),
                ptr::null(),
                0,
                ptr::null_mut(),
            )
        };
        *env = RawHandle::from_addr(out as usize);
        Status::from_sword(rc)
    }

    fn handle_alloc(&self, parent: RawHandle, handle: &mut RawHandle, kind: HandleType) -> Status {
        let mut out: *mut c_void = ptr::null_mut();
        let rc = unsafe { OCIHandleAlloc(as_ptr(parent), &mut out, kind.code(), 0, ptr::null_mut()) };
        *handle = RawHandle::from_addr(out as usize);
        Status::from_sword(rc)
    }

    fn handle_free(&self, handle: RawHandle, kind: HandleType) -> Status {
        Status::from_sword(unsafe { OCIHandleFree(as_ptr(handle), kind.code()) })
    }

    fn logon(
        &self,
        env: RawHandle,
        error: RawHandle,
        service: &mut RawHandle,
        user: InBytes<'_>,
        password: InBytes<'_>,
        connect: InBytes<'_>,
    ) -> Status {
        let (Some(user_len), Some(password_len), Some(connect_len)) =
            (user.len_u32(), password.len_u32(), connect.len_u32())
        else {
            warn!("logon argument longer than u32::MAX bytes, not calling OCILogon");
            return Status::ERROR;
        };
        let mut svc = as_ptr(*service);
        let rc = unsafe {
            OCILogon(
                as_ptr(env),
                as_ptr(error),
                &mut svc,
                user.as_ptr(),
                user_len,
                password.as_ptr(),
                password_len,
                connect.as_ptr(),
                connect_len,
            )
        };
        *service = RawHandle::from_addr(svc as usize);
        Status::from_sword(rc)
    }

    fn logoff(&self, service: RawHandle, error: RawHandle) -> Status {
        Status::from_sword(unsafe { OCILogoff(as_ptr(service), as_ptr(error)) })
    }

    fn error_get(
        &self,
        handle: RawHandle,
        record: u32,
        code: &mut i32,
        mut message: OutBuffer<'_>,
        kind: HandleType,
    ) -> Status {
        let Some(size) = message.capacity_u32() else {
            warn!(capacity = message.capacity(), "diagnostic buffer too large for OCIErrorGet");
            return Status::ERROR;
        };
        let rc = unsafe {
            OCIErrorGet(
                as_ptr(handle),
                record,
                ptr::null_mut(),
                code,
                message.as_mut_ptr(),
                size,
                kind.code(),
            )
        };
        Status::from_sword(rc)
    }
}
