use super::update::QueryUpdate;
use crate::types::{EventStatus, ProgressEvent};
use serde::Serialize;

pub const STREAM_PROCESSING_ERROR: &str = "Error processing stream data.";
pub const STEP_ERROR_FALLBACK: &str = "An error occurred during a step.";

/// Append-only record of every event received for one query, in arrival
/// order. Terminal events are recorded too.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ProgressLog {
    events: Vec<ProgressEvent>,
}

impl ProgressLog {
    pub fn push(&mut self, event: ProgressEvent) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn as_slice(&self) -> &[ProgressEvent] {
        &self.events
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ProgressEvent> {
        self.events.iter()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryState {
    pub query: String,
    pub loading: bool,
    pub summary: Option<String>,
    pub error: Option<String>,
    pub progress: ProgressLog,
    pub generation: u64,
}

/// What the presentation layer renders. Unset text fields are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueryView {
    pub loading: bool,
    pub error: String,
    pub summary: String,
    pub progress_steps: Vec<ProgressEvent>,
}

impl QueryState {
    /// Start a new submission: every field from the previous one is cleared
    /// before any event of the new stream can arrive.
    pub fn reset(&mut self, query: impl Into<String>, generation: u64) {
        *self = Self {
            query: query.into(),
            loading: true,
            generation,
            ..Self::default()
        };
    }

    pub fn apply(&mut self, update: QueryUpdate) {
        match update {
            QueryUpdate::Event(event) => self.apply_event(event),
            QueryUpdate::MalformedLine { .. } => {
                self.error = Some(STREAM_PROCESSING_ERROR.to_string());
            }
            QueryUpdate::Failed(error) => {
                self.error = Some(error.to_string());
            }
            QueryUpdate::Finished => {
                self.loading = false;
            }
        }
    }

    fn apply_event(&mut self, event: ProgressEvent) {
        match event.status {
            Some(EventStatus::Complete) => {
                self.summary = event.final_result.clone();
            }
            Some(EventStatus::Error) => {
                let message = non_empty(&event.final_result)
                    .or_else(|| non_empty(&event.step))
                    .unwrap_or(STEP_ERROR_FALLBACK);
                self.error = Some(message.to_string());
            }
            _ => {}
        }
        self.progress.push(event);
    }

    pub fn view(&self) -> QueryView {
        QueryView {
            loading: self.loading,
            error: self.error.clone().unwrap_or_default(),
            summary: self.summary.clone().unwrap_or_default(),
            progress_steps: self.progress.as_slice().to_vec(),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|text| !text.is_empty())
}
