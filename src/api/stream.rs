use super::logging::emit_ndjson_parse_error;
use crate::error::LineError;
use crate::types::ProgressEvent;
use encoding_rs::{CoderResult, Decoder, UTF_8};

/// Result of one complete, non-blank NDJSON line.
#[derive(Debug)]
pub enum DecodedLine {
    Event(ProgressEvent),
    Malformed { line: String, error: LineError },
}

/// Incremental NDJSON decoder for a chunked response body.
///
/// Bytes go through a stateful UTF-8 decoder, so a multi-byte character
/// split across two chunks is reassembled before any line splitting happens.
/// Only `\n`-terminated lines are parsed; the unterminated tail stays in the
/// buffer until more bytes arrive or [`NdjsonDecoder::finish`] is called.
pub struct NdjsonDecoder {
    decoder: Decoder,
    buffer: String,
    replaced_invalid_bytes: bool,
}

impl Default for NdjsonDecoder {
    fn default() -> Self {
        Self {
            decoder: UTF_8.new_decoder_with_bom_removal(),
            buffer: String::new(),
            replaced_invalid_bytes: false,
        }
    }
}

impl NdjsonDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn process(&mut self, chunk: &[u8]) -> Vec<DecodedLine> {
        self.decode_into_buffer(chunk, false);
        let mut lines = Vec::new();
        let mut start = 0;

        while let Some(end) = self.buffer[start..].find('\n') {
            let line_end = start + end;
            if let Some(decoded) = parse_line(&self.buffer[start..line_end]) {
                lines.push(decoded);
            }
            start = line_end + 1;
        }

        if start > 0 {
            self.buffer.drain(..start);
        }

        lines
    }

    /// Ends decoding and returns whatever followed the last newline.
    ///
    /// An incomplete multi-byte sequence at the very end of the stream is
    /// emitted as U+FFFD.
    pub fn finish(mut self) -> Option<String> {
        self.decode_into_buffer(&[], true);
        let tail = std::mem::take(&mut self.buffer);
        if tail.trim().is_empty() {
            None
        } else {
            Some(tail)
        }
    }

    pub fn pending(&self) -> &str {
        &self.buffer
    }

    pub fn replaced_invalid_bytes(&self) -> bool {
        self.replaced_invalid_bytes
    }

    fn decode_into_buffer(&mut self, chunk: &[u8], last: bool) {
        let mut remaining = chunk;
        loop {
            let needed = self
                .decoder
                .max_utf8_buffer_length(remaining.len())
                .unwrap_or(remaining.len().saturating_mul(3).saturating_add(4));
            self.buffer.reserve(needed);

            let (result, read, had_errors) =
                self.decoder
                    .decode_to_string(remaining, &mut self.buffer, last);
            self.replaced_invalid_bytes |= had_errors;
            remaining = &remaining[read..];

            match result {
                CoderResult::InputEmpty => break,
                CoderResult::OutputFull => continue,
            }
        }
    }
}

/// Parse a single line taken from the stream. Blank lines yield `None`.
pub fn parse_line(line: &str) -> Option<DecodedLine> {
    if line.trim().is_empty() {
        return None;
    }

    match ProgressEvent::from_json_line(line) {
        Ok(event) => Some(DecodedLine::Event(event)),
        Err(error) => {
            emit_ndjson_parse_error(line, &error);
            Some(DecodedLine::Malformed {
                line: line.to_string(),
                error,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EventStatus;

    fn events(lines: Vec<DecodedLine>) -> Vec<ProgressEvent> {
        lines
            .into_iter()
            .filter_map(|line| match line {
                DecodedLine::Event(event) => Some(event),
                DecodedLine::Malformed { .. } => None,
            })
            .collect()
    }

    #[test]
    fn test_tail_is_retained_between_chunks() {
        let mut decoder = NdjsonDecoder::new();
        assert!(decoder.process(b"{\"status\":\"st").is_empty());
        assert_eq!(decoder.pending(), "{\"status\":\"st");

        let decoded = events(decoder.process(b"ep\",\"step\":\"a\"}\n{\"sta"));
        assert_eq!(decoded, vec![ProgressEvent::step("a")]);
        assert_eq!(decoder.pending(), "{\"sta");
    }

    #[test]
    fn test_blank_and_whitespace_lines_are_skipped() {
        let mut decoder = NdjsonDecoder::new();
        let decoded = decoder.process(b"\n   \n\t\n{\"status\":\"step\",\"step\":\"x\"}\n");
        assert_eq!(decoded.len(), 1);
    }

    #[test]
    fn test_crlf_terminated_line_parses() {
        let mut decoder = NdjsonDecoder::new();
        let decoded =
            events(decoder.process(b"{\"status\":\"complete\",\"final_result\":\"ok\"}\r\n"));
        assert_eq!(decoded[0].status, Some(EventStatus::Complete));
    }

    #[test]
    fn test_split_multibyte_character_is_reassembled() {
        let line = "{\"status\":\"step\",\"step\":\"caf\u{e9} \u{1F600}\"}\n".as_bytes();
        let emoji_start = line
            .windows(4)
            .position(|w| w == "\u{1F600}".as_bytes())
            .expect("emoji bytes");

        let mut decoder = NdjsonDecoder::new();
        assert!(decoder.process(&line[..emoji_start + 1]).is_empty());
        assert!(decoder.process(&line[emoji_start + 1..emoji_start + 3]).is_empty());
        let decoded = events(decoder.process(&line[emoji_start + 3..]));

        assert_eq!(decoded, vec![ProgressEvent::step("caf\u{e9} \u{1F600}")]);
        assert!(!decoder.replaced_invalid_bytes());
    }

    #[test]
    fn test_leading_bom_is_stripped() {
        let mut decoder = NdjsonDecoder::new();
        let decoded =
            events(decoder.process(b"\xEF\xBB\xBF{\"status\":\"step\",\"step\":\"a\"}\n"));
        assert_eq!(decoded, vec![ProgressEvent::step("a")]);
    }

    #[test]
    fn test_finish_returns_unterminated_tail() {
        let mut decoder = NdjsonDecoder::new();
        decoder.process(b"{\"status\":\"step\",\"step\":\"a\"}\n{\"status\":\"complete\"");
        assert_eq!(
            decoder.finish().as_deref(),
            Some("{\"status\":\"complete\"")
        );

        let mut decoder = NdjsonDecoder::new();
        decoder.process(b"{\"status\":\"step\",\"step\":\"a\"}\n  ");
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn test_truncated_multibyte_at_end_becomes_replacement() {
        let mut decoder = NdjsonDecoder::new();
        decoder.process(b"abc\xE2\x82");
        assert_eq!(decoder.finish().as_deref(), Some("abc\u{FFFD}"));
    }
}
