use crate::error::LineError;
use anyhow::Result;
use serde_json::Value;
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "warn";
const DEBUG_PAYLOAD_ENV: &str = "WEBSCOUT_DEBUG_PAYLOAD";
const LOG_PATH_ENV: &str = "WEBSCOUT_LOG_PATH";

/// Install the global fmt subscriber. `RUST_LOG` overrides the default
/// filter; `WEBSCOUT_LOG_PATH` redirects output away from stderr so the
/// progress log on stdout stays readable.
pub fn init_tracing() -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let writer = match resolve_log_path() {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(&path)?;
            BoxMakeWriter::new(Mutex::new(file))
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to install tracing subscriber: {error}"))
}

pub fn debug_payload_enabled() -> bool {
    std::env::var(DEBUG_PAYLOAD_ENV)
        .ok()
        .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

pub fn emit_debug_payload(request_url: &str, payload: &Value) {
    let formatted_payload = serde_json::to_string_pretty(payload)
        .unwrap_or_else(|_| "<payload serialization error>".to_string());
    tracing::debug!(url = request_url, "request payload:\n{formatted_payload}");
}

pub fn emit_ndjson_parse_error(line: &str, error: &LineError) {
    tracing::warn!(%error, line, "error parsing JSON from stream");
}

fn resolve_log_path() -> Option<String> {
    std::env::var(LOG_PATH_ENV)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
