use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    NotStarted,
    Complete,
    Failed,
}

impl TaskState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::NotStarted => "NOT_STARTED",
            TaskState::Complete => "COMPLETE",
            TaskState::Failed => "FAILED",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Execution record for one commit attempt of a publish.
///
/// `publish_id` is a lookup reference only; the task does not own the publish.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct Task {
    pub id: String,
    pub publish_id: String,
    pub state: TaskState,
    pub deadline: DateTime<Utc>,
}

impl Task {
    pub fn new(
        id: impl Into<String>,
        publish_id: impl Into<String>,
        deadline: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            publish_id: publish_id.into(),
            state: TaskState::NotStarted,
            deadline,
        }
    }

    pub fn with_state(mut self, state: TaskState) -> Self {
        self.state = state;
        self
    }

    /// A task is expired once `now` reaches its deadline.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.deadline
    }
}
