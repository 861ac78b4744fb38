mod query;
mod update;

pub use query::{
    ProgressLog, QueryState, QueryView, STEP_ERROR_FALLBACK, STREAM_PROCESSING_ERROR,
};
pub use update::{QueryUpdate, TaggedUpdate};
