use crate::api::{ApiClient, DecodedLine, NdjsonDecoder};
use crate::config::Config;
use crate::error::QueryError;
use crate::state::{QueryUpdate, TaggedUpdate};
use crate::types::EventStatus;
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Behaviour at stream end that the backend protocol leaves open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamOptions {
    pub flush_trailing_line: bool,
    pub require_terminal_event: bool,
}

impl From<&Config> for StreamOptions {
    fn from(config: &Config) -> Self {
        Self {
            flush_trailing_line: config.flush_trailing_line,
            require_terminal_event: config.require_terminal_event,
        }
    }
}

/// How a body stream ended when the transport itself did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    Completed,
    Errored,
    EndedWithoutTerminal,
}

#[derive(Clone)]
pub struct UpdateSender {
    generation: u64,
    tx: mpsc::UnboundedSender<TaggedUpdate>,
}

impl UpdateSender {
    pub fn new(generation: u64, tx: mpsc::UnboundedSender<TaggedUpdate>) -> Self {
        Self { generation, tx }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn send(&self, update: QueryUpdate) {
        let _ = self.tx.send(TaggedUpdate {
            generation: self.generation,
            update,
        });
    }
}

/// Run one submission to the end. Every path finishes with
/// [`QueryUpdate::Finished`].
pub async fn run_query(
    client: Arc<ApiClient>,
    query: String,
    options: StreamOptions,
    cancel: CancellationToken,
    updates: UpdateSender,
) {
    let generation = updates.generation();
    tracing::debug!(generation, url = %client.request_url(), "submitting query");

    let outcome = tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(QueryError::Cancelled),
        result = consume_response(&client, &query, options, &updates) => result,
    };

    match outcome {
        Ok(end) => tracing::debug!(generation, ?end, "progress stream closed"),
        Err(error) => {
            tracing::info!(generation, %error, "query failed");
            updates.send(QueryUpdate::Failed(error));
        }
    }
    updates.send(QueryUpdate::Finished);
}

async fn consume_response(
    client: &ApiClient,
    query: &str,
    options: StreamOptions,
    updates: &UpdateSender,
) -> Result<StreamEnd, QueryError> {
    let mut stream = client.create_stream(query).await?;
    let mut decoder = NdjsonDecoder::new();
    let mut last_terminal = None;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        for line in decoder.process(&chunk) {
            forward_line(line, &mut last_terminal, updates);
        }
    }

    if decoder.replaced_invalid_bytes() {
        tracing::warn!("progress stream contained invalid UTF-8; replaced with U+FFFD");
    }

    if let Some(tail) = decoder.finish() {
        if options.flush_trailing_line {
            if let Some(line) = crate::api::stream::parse_line(&tail) {
                forward_line(line, &mut last_terminal, updates);
            }
        } else {
            tracing::debug!(tail = %tail, "dropping unterminated final line");
        }
    }

    let end = match last_terminal {
        Some(EventStatus::Complete) => StreamEnd::Completed,
        Some(_) => StreamEnd::Errored,
        None => StreamEnd::EndedWithoutTerminal,
    };
    if end == StreamEnd::EndedWithoutTerminal && options.require_terminal_event {
        return Err(QueryError::Incomplete);
    }
    Ok(end)
}

fn forward_line(
    line: DecodedLine,
    last_terminal: &mut Option<EventStatus>,
    updates: &UpdateSender,
) {
    match line {
        DecodedLine::Event(event) => {
            if event.is_terminal() {
                *last_terminal = event.status.clone();
            }
            updates.send(QueryUpdate::Event(event));
        }
        DecodedLine::Malformed { line, .. } => {
            updates.send(QueryUpdate::MalformedLine { line });
        }
    }
}
