//! Chunk-boundary invariance for the frame decoder.
//!
//! However the transport slices a body into chunks, the decoder must emit the
//! same events in the same order as when the body arrives whole. Boundaries may
//! fall inside the prefix, inside the JSON, inside a multi-byte character or
//! between `\r` and `\n`.

use loom_core::{FrameDecoder, FrameEvent};
use proptest::prelude::*;

fn decode_whole(body: &[u8]) -> Vec<FrameEvent> {
    let mut decoder = FrameDecoder::new();
    let mut events = decoder.push(body);
    events.extend(decoder.finish());
    events
}

fn decode_split(body: &[u8], cuts: &[usize]) -> Vec<FrameEvent> {
    let mut decoder = FrameDecoder::new();
    let mut events = Vec::new();
    let mut start = 0;
    for &cut in cuts {
        events.extend(decoder.push(&body[start..cut]));
        start = cut;
    }
    events.extend(decoder.push(&body[start..]));
    events.extend(decoder.finish());
    events
}

fn body_of(texts: &[String], crlf: bool) -> Vec<u8> {
    let eol = if crlf { "\r\n" } else { "\n" };
    let mut body = String::new();
    for (i, text) in texts.iter().enumerate() {
        body.push_str(&format!("data: {}{eol}", serde_json::json!({ "text": text })));
        if i % 2 == 1 {
            body.push_str(&format!(": keep-alive{eol}data: {{broken{eol}{eol}"));
        }
    }
    body.into_bytes()
}

#[test]
fn every_two_point_split_matches_whole_body() {
    let texts = vec!["Héllo".to_string(), " wörld 🌍".to_string(), "日本".to_string()];
    let body = body_of(&texts, false);
    let expected = decode_whole(&body);
    assert_eq!(
        expected.iter().map(|e| e.text.as_str()).collect::<Vec<_>>(),
        vec!["Héllo", " wörld 🌍", "日本"]
    );

    for a in 0..=body.len() {
        for b in a..=body.len() {
            assert_eq!(decode_split(&body, &[a, b]), expected, "cuts at {a},{b}");
        }
    }
}

#[test]
fn single_byte_chunks_with_crlf() {
    let texts = vec!["a".to_string(), "ß".to_string()];
    let body = body_of(&texts, true);
    let cuts: Vec<usize> = (1..body.len()).collect();
    let events = decode_split(&body, &cuts);
    assert_eq!(events, decode_whole(&body));
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].text, "ß");
}

#[test]
fn unterminated_final_record_is_decoded_at_finish() {
    let mut decoder = FrameDecoder::new();
    assert!(decoder.push(b"data: {\"text\":\"tail\"}").is_empty());
    assert!(decoder.pending_len() > 0);
    assert_eq!(decoder.finish(), vec![FrameEvent { text: "tail".into() }]);
}

fn text_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            Just('a'),
            Just(' '),
            Just('"'),
            Just('\\'),
            Just('é'),
            Just('中'),
            Just('🚀'),
            Just('\n'),
        ],
        0..12,
    )
    .prop_map(|chars| chars.into_iter().collect())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn random_splits_preserve_events(
        texts in prop::collection::vec(text_strategy(), 0..6),
        crlf in any::<bool>(),
        raw_cuts in prop::collection::vec(any::<prop::sample::Index>(), 0..8),
    ) {
        let body = body_of(&texts, crlf);
        let mut cuts: Vec<usize> = raw_cuts.iter().map(|i| i.index(body.len() + 1)).collect();
        cuts.sort_unstable();

        let expected = decode_whole(&body);
        prop_assert_eq!(decode_split(&body, &cuts), expected.clone());

        let nonempty: Vec<&str> = texts.iter().map(String::as_str).filter(|t| !t.is_empty()).collect();
        let decoded: Vec<&str> = expected.iter().map(|e| e.text.as_str()).filter(|t| !t.is_empty()).collect();
        prop_assert_eq!(decoded, nonempty);
    }
}
