use std::fmt;

use serde::{Deserialize, Serialize};

use super::Item;

/// Lifecycle of a publish.
///
/// Only `Committing` publishes are acted on by the committer; everything else
/// is reported and left alone.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PublishState {
    Pending,
    Committing,
    Committed,
    Failed,
    Complete,
}

impl PublishState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PublishState::Pending => "PENDING",
            PublishState::Committing => "COMMITTING",
            PublishState::Committed => "COMMITTED",
            PublishState::Failed => "FAILED",
            PublishState::Complete => "COMPLETE",
        }
    }
}

impl fmt::Display for PublishState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of staged content targeting one environment.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct Publish {
    pub id: String,
    pub env: String,
    pub state: PublishState,
    pub items: Vec<Item>,
}

impl Publish {
    pub fn new(id: impl Into<String>, env: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            env: env.into(),
            state: PublishState::Pending,
            items: Vec::new(),
        }
    }

    pub fn with_state(mut self, state: PublishState) -> Self {
        self.state = state;
        self
    }

    pub fn with_items(mut self, items: impl IntoIterator<Item = Item>) -> Self {
        self.items.extend(items);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items that are not entry points, in publish order.
    pub fn content_items<'a>(&'a self, entry_point_files: &'a [String]) -> Vec<&'a Item> {
        self.items
            .iter()
            .filter(|item| !item.is_entry_point(entry_point_files))
            .collect()
    }

    /// Entry-point items, in publish order.
    pub fn entry_point_items<'a>(&'a self, entry_point_files: &'a [String]) -> Vec<&'a Item> {
        self.items
            .iter()
            .filter(|item| item.is_entry_point(entry_point_files))
            .collect()
    }
}
