//! Database Module
//!
//! - **Connection Management** (`connection.rs`): environment, handles, login and teardown
//! - **Transactions** (`transaction.rs`): the transaction reference a session tracks
//!
//! Statement preparation and transaction demarcation are left to the layers
//! built on top; they obtain handles and translate statuses through
//! [`Session`].
pub mod connection;
pub mod transaction;

pub use connection::*;
pub use transaction::*;
