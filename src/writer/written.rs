use crate::error::CommitError;
use crate::model::StoreRecord;

/// Records confirmed written during one commit attempt.
///
/// Drives rollback and nothing else; dropped once the attempt concludes.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WrittenSet {
    records: Vec<StoreRecord>,
}

impl WrittenSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, records: impl IntoIterator<Item = StoreRecord>) {
        self.records.extend(records);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> Vec<StoreRecord> {
        self.records
    }
}

/// A failed submission, together with whatever landed before the failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    pub error: CommitError,
    pub written: Vec<StoreRecord>,
}

impl BatchFailure {
    pub fn new(error: CommitError, written: Vec<StoreRecord>) -> Self {
        Self { error, written }
    }
}
