// Core infrastructure modules
pub mod core;

pub mod config;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use crate::core::db::{Connection, Credentials, Environment, Session, Transaction};
pub use crate::core::ffi::{EnvMode, ForeignApi, HandleType, SharedApi, Status};
pub use crate::core::{OciError, Result};
