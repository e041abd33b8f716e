//! Chunk boundaries never change what the decoder yields

use notegen::stream::{RecordDecoder, StreamEvent};
use proptest::prelude::*;
use serde_json::json;

fn encode(events: &[(usize, bool, String)]) -> Vec<u8> {
    let mut body = String::new();
    for (index, ok, message) in events {
        if *ok {
            let data = json!({
                "index": index,
                "status": "done",
                "image_url": format!("/api/ai/images/t/{}.png", index),
            });
            body.push_str(&format!("event: complete\ndata: {}\n\n", data));
        } else {
            let data = json!({"index": index, "status": "error", "message": message});
            body.push_str(&format!("event: error\ndata: {}\n\n", data));
        }
    }
    body.into_bytes()
}

fn decode_in_chunks(bytes: &[u8], cuts: &[usize]) -> Vec<StreamEvent> {
    let mut decoder = RecordDecoder::new();
    let mut events = Vec::new();
    let mut start = 0;
    for &cut in cuts {
        events.extend(decoder.push(&bytes[start..cut]));
        start = cut;
    }
    events.extend(decoder.push(&bytes[start..]));
    decoder.finish();
    events
}

fn split_points(len: usize, raw: Vec<usize>) -> Vec<usize> {
    let mut cuts: Vec<usize> = raw.into_iter().map(|c| c % (len + 1)).collect();
    cuts.sort_unstable();
    cuts
}

proptest! {
    #[test]
    fn any_chunking_yields_the_same_events(
        events in prop::collection::vec((0usize..20, any::<bool>(), "[a-z 封面内容总结]{0,12}"), 1..8),
        raw_cuts in prop::collection::vec(any::<usize>(), 0..12),
    ) {
        let bytes = encode(&events);
        let whole = decode_in_chunks(&bytes, &[]);
        let cuts = split_points(bytes.len(), raw_cuts);
        let chunked = decode_in_chunks(&bytes, &cuts);

        prop_assert_eq!(whole.len(), events.len());
        prop_assert_eq!(chunked, whole);
    }

    #[test]
    fn byte_at_a_time_matches_whole(
        events in prop::collection::vec((0usize..5, any::<bool>(), "[封面内容]{1,4}"), 1..4),
    ) {
        let bytes = encode(&events);
        let cuts: Vec<usize> = (1..bytes.len()).collect();
        prop_assert_eq!(decode_in_chunks(&bytes, &cuts), decode_in_chunks(&bytes, &[]));
    }
}
