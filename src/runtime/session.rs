use super::frontend::QueryObserver;
use super::worker::{run_query, StreamOptions, UpdateSender};
use crate::api::ApiClient;
use crate::config::Config;
use crate::error::QueryError;
use crate::state::{QueryState, QueryUpdate, QueryView, TaggedUpdate};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Submits queries and owns the only copy of [`QueryState`].
///
/// Each submission runs on its own task and reports back over a channel
/// tagged with the submission's generation. Starting a new submission
/// cancels the previous task, and anything it already sent is discarded
/// when it arrives, so a stale stream can never touch the current state.
pub struct QuerySession {
    client: Arc<ApiClient>,
    options: StreamOptions,
    state: QueryState,
    active: Option<CancellationToken>,
    update_tx: mpsc::UnboundedSender<TaggedUpdate>,
    update_rx: mpsc::UnboundedReceiver<TaggedUpdate>,
    observers: Vec<Box<dyn QueryObserver>>,
}

impl QuerySession {
    pub fn new(client: ApiClient, options: StreamOptions) -> Self {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        Self {
            client: Arc::new(client),
            options,
            state: QueryState::default(),
            active: None,
            update_tx,
            update_rx,
            observers: Vec::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(ApiClient::new(config), StreamOptions::from(config))
    }

    pub fn add_observer(&mut self, observer: impl QueryObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn state(&self) -> &QueryState {
        &self.state
    }

    pub fn view(&self) -> QueryView {
        self.state.view()
    }

    pub fn client(&self) -> Arc<ApiClient> {
        Arc::clone(&self.client)
    }

    /// Reset the state and start streaming `query`. Must be called from
    /// inside a tokio runtime. Returns the generation of the new submission.
    pub fn submit(&mut self, query: &str) -> Result<u64, QueryError> {
        if query.trim().is_empty() {
            return Err(QueryError::EmptyQuery);
        }

        if let Some(previous) = self.active.take() {
            tracing::debug!(
                generation = self.state.generation,
                "superseding in-flight query"
            );
            previous.cancel();
        }

        let generation = self.state.generation + 1;
        self.state.reset(query, generation);
        self.notify();

        let cancel = CancellationToken::new();
        tokio::spawn(run_query(
            Arc::clone(&self.client),
            query.to_string(),
            self.options,
            cancel.clone(),
            UpdateSender::new(generation, self.update_tx.clone()),
        ));
        self.active = Some(cancel);
        Ok(generation)
    }

    /// Abort the current submission. It still finishes through the normal
    /// update path, ending with a cancellation error.
    pub fn cancel(&mut self) {
        if let Some(active) = &self.active {
            active.cancel();
        }
    }

    /// Wait for the next update of the current submission and apply it.
    /// Returns `None` once the submission has finished.
    pub async fn next_update(&mut self) -> Option<QueryUpdate> {
        while self.state.loading {
            let tagged = self.update_rx.recv().await?;
            if tagged.generation != self.state.generation {
                tracing::trace!(
                    stale = tagged.generation,
                    current = self.state.generation,
                    "discarding update from superseded query"
                );
                continue;
            }

            if tagged.update == QueryUpdate::Finished {
                self.active = None;
            }
            self.state.apply(tagged.update.clone());
            self.notify();
            return Some(tagged.update);
        }
        None
    }

    pub async fn wait(&mut self) -> &QueryState {
        while self.next_update().await.is_some() {}
        &self.state
    }

    /// Submit and drive the query to completion.
    pub async fn run(&mut self, query: &str) -> Result<&QueryState, QueryError> {
        self.submit(query)?;
        Ok(self.wait().await)
    }

    fn notify(&mut self) {
        for observer in &mut self.observers {
            observer.on_update(&self.state);
        }
    }
}

impl Drop for QuerySession {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            active.cancel();
        }
    }
}
