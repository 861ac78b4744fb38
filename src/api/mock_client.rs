use crate::api::client::{ByteStream, MockStreamProducer};
use crate::error::QueryError;
use bytes::Bytes;
use futures::{stream, StreamExt};
use std::sync::{Arc, Mutex};

/// One scripted backend reply.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Body delivered as exactly these chunks, then end of stream.
    Chunks(Vec<Vec<u8>>),
    /// Body chunks followed by a transport failure.
    ChunksThenError(Vec<Vec<u8>>, String),
    /// Body chunks, then the stream never produces anything else.
    ChunksThenStall(Vec<Vec<u8>>),
    /// The request itself fails.
    Fail(QueryError),
}

impl MockResponse {
    pub fn lines(lines: &[&str]) -> Self {
        MockResponse::Chunks(
            lines
                .iter()
                .map(|line| format!("{line}\n").into_bytes())
                .collect(),
        )
    }
}

#[derive(Clone)]
pub struct MockApiClient {
    responses: Arc<Mutex<Vec<MockResponse>>>,
    queries: Arc<Mutex<Vec<String>>>,
}

impl MockApiClient {
    pub fn new(responses: Vec<MockResponse>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            queries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn received_queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

impl MockStreamProducer for MockApiClient {
    fn create_mock_stream(&self, query: &str) -> Result<ByteStream, QueryError> {
        self.queries.lock().unwrap().push(query.to_string());

        let mut responses_guard = self.responses.lock().unwrap();
        if responses_guard.is_empty() {
            return Err(QueryError::transport(
                "MockApiClient: No more responses configured",
            ));
        }

        let ok_chunks = |chunks: Vec<Vec<u8>>| {
            stream::iter(
                chunks
                    .into_iter()
                    .map(|chunk| Ok::<Bytes, QueryError>(Bytes::from(chunk))),
            )
        };

        match responses_guard.remove(0) {
            MockResponse::Chunks(chunks) => Ok(Box::pin(ok_chunks(chunks))),
            MockResponse::ChunksThenError(chunks, message) => Ok(Box::pin(
                ok_chunks(chunks).chain(stream::once(async move {
                    Err(QueryError::transport(message))
                })),
            )),
            MockResponse::ChunksThenStall(chunks) => {
                Ok(Box::pin(ok_chunks(chunks).chain(stream::pending())))
            }
            MockResponse::Fail(error) => Err(error),
        }
    }
}
