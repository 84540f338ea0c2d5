//! Publish, task and item records the committer operates on.

mod item;
mod publish;
mod task;

pub use item::{Item, StoreRecord};
pub use publish::{Publish, PublishState};
pub use task::{Task, TaskState};
