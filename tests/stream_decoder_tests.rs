use webscout::api::{DecodedLine, NdjsonDecoder};
use webscout::error::LineError;
use webscout::types::{EventStatus, ProgressEvent};

const BODY: &str = concat!(
    "{\"status\":\"step\",\"step\":\"Generating search query\"}\n",
    "{\"status\":\"step\",\"step\":\"Scraping https://example.org/caf\u{e9}\"}\n",
    "\n",
    "{\"status\":\"step\",\"step\":\"R\u{e9}sum\u{e9} \u{1F4DD}\"}\r\n",
    "{\"status\":\"complete\",\"final_result\":\"Na\u{ef}ve summary \u{2014} done.\"}\n",
);

fn decode_all(chunks: &[&[u8]]) -> (Vec<ProgressEvent>, usize) {
    let mut decoder = NdjsonDecoder::new();
    let mut events = Vec::new();
    let mut malformed = 0;
    for chunk in chunks {
        for line in decoder.process(chunk) {
            match line {
                DecodedLine::Event(event) => events.push(event),
                DecodedLine::Malformed { .. } => malformed += 1,
            }
        }
    }
    assert_eq!(decoder.finish(), None, "body ends with a newline");
    (events, malformed)
}

#[test]
fn test_fragmented_events() {
    let mut decoder = NdjsonDecoder::new();

    let events1 = decoder.process(b"{\"status\":\"step\",\"st");
    assert_eq!(events1.len(), 0);

    let events2 = decoder.process(b"ep\":\"Fetching page\"}\n");
    assert_eq!(events2.len(), 1);
}

#[test]
fn test_parse_error_handling() {
    let mut decoder = NdjsonDecoder::new();

    let lines = decoder.process(b"not json\n{\"status\":\"step\",\"step\":\"Fetching page\"}\n");
    assert_eq!(lines.len(), 2);

    match &lines[0] {
        DecodedLine::Malformed { line, error } => {
            assert_eq!(line, "not json");
            assert!(matches!(error, LineError::InvalidJson(_)));
        }
        other => panic!("unexpected line: {other:?}"),
    }
    match &lines[1] {
        DecodedLine::Event(event) => assert_eq!(event, &ProgressEvent::step("Fetching page")),
        other => panic!("unexpected line: {other:?}"),
    }
}

#[test]
fn test_non_object_lines_are_malformed() {
    let mut decoder = NdjsonDecoder::new();

    let lines = decoder.process(b"42\n\"step\"\n[1,2]\nnull\n");
    assert_eq!(lines.len(), 4);
    assert!(lines.iter().all(|line| matches!(
        line,
        DecodedLine::Malformed {
            error: LineError::NotAnObject { .. },
            ..
        }
    )));
}

#[test]
fn test_trailing_partial_line_is_never_emitted() {
    let mut decoder = NdjsonDecoder::new();

    let lines = decoder.process(
        b"{\"status\":\"step\",\"step\":\"a\"}\n{\"status\":\"complete\",\"final_result\":\"cut\"}",
    );
    assert_eq!(lines.len(), 1);
    assert_eq!(
        decoder.finish().as_deref(),
        Some("{\"status\":\"complete\",\"final_result\":\"cut\"}")
    );
}

#[test]
fn test_decoding_is_independent_of_chunk_boundaries() {
    let body = BODY.as_bytes();
    let (expected, malformed) = decode_all(&[body]);
    assert_eq!(malformed, 0);
    assert_eq!(expected.len(), 4);
    assert_eq!(expected[3].status, Some(EventStatus::Complete));
    assert_eq!(
        expected[3].final_result.as_deref(),
        Some("Na\u{ef}ve summary \u{2014} done.")
    );

    for split in 1..body.len() {
        let (events, malformed) = decode_all(&[&body[..split], &body[split..]]);
        assert_eq!(malformed, 0, "split at byte {split}");
        assert_eq!(events, expected, "split at byte {split}");
    }

    let single_bytes: Vec<&[u8]> = body.chunks(1).collect();
    let (events, _) = decode_all(&single_bytes);
    assert_eq!(events, expected);

    for first in (1..body.len()).step_by(7) {
        for second in (first + 1..body.len()).step_by(11) {
            let chunks = [&body[..first], &body[first..second], &body[second..]];
            let (events, malformed) = decode_all(&chunks);
            assert_eq!(malformed, 0, "splits at {first} and {second}");
            assert_eq!(events, expected, "splits at {first} and {second}");
        }
    }
}
