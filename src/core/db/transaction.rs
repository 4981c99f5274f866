//! Transaction reference tracked by a session.
//!
//! Commit and rollback belong to the transaction layer built on top of this
//! crate; a [`Session`](super::Session) only remembers which transaction is
//! current.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Reference to the transaction a session is running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    id: Uuid,
    started_at: DateTime<Utc>,
}

impl Transaction {
    pub(crate) fn start() -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}
