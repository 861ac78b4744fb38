use crate::error::QueryError;
use crate::types::ProgressEvent;

/// One state transition produced while a query runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryUpdate {
    Event(ProgressEvent),
    MalformedLine { line: String },
    Failed(QueryError),
    /// Always the last update of a submission.
    Finished,
}

/// An update tagged with the submission that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedUpdate {
    pub generation: u64,
    pub update: QueryUpdate,
}
