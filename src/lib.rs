//! Client for a scraping/summarizing agent that reports progress as an
//! NDJSON stream.
//!
//! [`runtime::QuerySession`] submits a query and owns the resulting
//! [`state::QueryState`]; [`api::NdjsonDecoder`] turns the chunked response
//! body back into progress events.

pub mod api;
pub mod config;
pub mod error;
pub mod runtime;
pub mod state;
#[cfg(test)]
mod test_support;
pub mod types;
pub mod ui;

pub use error::QueryError;
pub use runtime::{QueryObserver, QuerySession, StreamOptions};
pub use state::{QueryState, QueryView};
pub use types::{EventStatus, ProgressEvent};
