use std::fmt;

use chrono::Utc;
use uuid::Uuid;

use crate::models::Task;

/// Prefix reserved for ids minted on the client.
pub const LOCAL_ID_PREFIX: &str = "local-";

/// Identifier of an optimistic entry. Never sent to the server.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TempId(String);

impl TempId {
    pub fn generate() -> Self {
        Self(format!("{LOCAL_ID_PREFIX}{}", Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TempId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn is_local_id(id: &str) -> bool {
    id.starts_with(LOCAL_ID_PREFIX)
}

/// A row of the displayed page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Confirmed(Task),
    /// Submitted but not yet acknowledged. `task.id` equals `temp_id`.
    Pending { temp_id: TempId, task: Task },
}

impl Entry {
    /// Optimistic entry for a title the server hasn't accepted yet. The owner
    /// is unknown until the server answers, so `user_id` is zero.
    pub fn pending(temp_id: TempId, title: &str) -> Self {
        let now = Utc::now();
        let task = Task {
            id: temp_id.to_string(),
            title: title.to_string(),
            completed: false,
            user_id: 0,
            created_at: now,
            updated_at: now,
        };
        Entry::Pending { temp_id, task }
    }

    pub fn task(&self) -> &Task {
        match self {
            Entry::Confirmed(task) | Entry::Pending { task, .. } => task,
        }
    }

    pub fn id(&self) -> &str {
        &self.task().id
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Entry::Pending { .. })
    }

    pub fn is_pending_for(&self, id: &TempId) -> bool {
        matches!(self, Entry::Pending { temp_id, .. } if temp_id == id)
    }

    pub fn is_confirmed(&self, id: &str) -> bool {
        matches!(self, Entry::Confirmed(task) if task.id == id)
    }
}
