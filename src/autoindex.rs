//! Post-commit autoindex hook.

use thiserror::Error;

use crate::model::Publish;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("autoindex failed: {0}")]
pub struct AutoindexError(pub String);

/// Generates index content for a publish after it has been committed.
///
/// Invoked once per successful commit and never on failure. Its result does
/// not affect the committed state.
pub trait Autoindex: Send + Sync {
    fn run(&self, publish: &Publish, env: &str) -> Result<(), AutoindexError>;
}

/// Autoindex hook that does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAutoindex;

impl Autoindex for NoopAutoindex {
    fn run(&self, _publish: &Publish, _env: &str) -> Result<(), AutoindexError> {
        Ok(())
    }
}
