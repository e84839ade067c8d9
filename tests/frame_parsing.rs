//! Frame listing parsing tests.

use video_to_sqlite::{FieldValue, parse_frames};

const FRAMES: &str = include_str!("fixtures/probe_frames.txt");

fn text<'a>(record: &'a video_to_sqlite::FrameRecord, key: &str) -> Option<&'a str> {
    record.get(key).and_then(FieldValue::as_text)
}

#[test]
fn fixture_yields_video_frames_in_order() {
    let frames = parse_frames(FRAMES, "sample_video.mp4");

    assert_eq!(frames.len(), 3);
    let types: Vec<_> = frames.iter().map(|frame| text(frame, "pict_type").unwrap()).collect();
    assert_eq!(types, ["I", "P", "B"]);
    let timestamps: Vec<_> = frames.iter().map(|frame| text(frame, "pkt_dts").unwrap()).collect();
    assert_eq!(timestamps, ["0", "3000", "6000"]);
}

#[test]
fn every_frame_is_tagged_with_filename() {
    let frames = parse_frames(FRAMES, "sample_video.mp4");

    for frame in &frames {
        assert_eq!(text(frame, "filename"), Some("sample_video.mp4"));
        assert_eq!(text(frame, "media_type"), Some("video"));
    }
}

#[test]
fn values_stay_verbatim_text() {
    let frames = parse_frames(FRAMES, "sample_video.mp4");
    let first = &frames[0];

    assert_eq!(first.get("pkt_size"), Some(&FieldValue::Text("20815".into())));
    assert_eq!(text(first, "pts_time"), Some("0.000000"));
    assert_eq!(text(first, "sample_aspect_ratio"), Some("1:1"));
}

#[test]
fn side_data_keys_join_the_frame() {
    let frames = parse_frames(FRAMES, "sample_video.mp4");

    assert_eq!(
        text(&frames[0], "side_data_type"),
        Some("H.26[45] User Data Unregistered SEI message")
    );
    assert!(!frames[1].contains_key("side_data_type"));
}

#[test]
fn audio_blocks_are_dropped() {
    let listing = "[FRAME]\nmedia_type=audio\npkt_dts=0\n[/FRAME]\n\
                   [FRAME]\nmedia_type=video\npkt_dts=0\n[/FRAME]\n";
    let frames = parse_frames(listing, "a.mp4");

    assert_eq!(frames.len(), 1);
    assert_eq!(text(&frames[0], "media_type"), Some("video"));
}

#[test]
fn unavailable_decode_timestamp_is_dropped() {
    let listing = "[FRAME]\nmedia_type=video\npkt_dts=N/A\n[/FRAME]\n";
    assert!(parse_frames(listing, "a.mp4").is_empty());
}

#[test]
fn missing_decode_timestamp_is_kept() {
    let listing = "[FRAME]\nmedia_type=video\nkey_frame=1\n[/FRAME]\n";
    assert_eq!(parse_frames(listing, "a.mp4").len(), 1);
}

#[test]
fn block_without_media_type_is_dropped() {
    let listing = "[FRAME]\nkey_frame=1\npkt_dts=0\n[/FRAME]\n";
    assert!(parse_frames(listing, "a.mp4").is_empty());
}

#[test]
fn malformed_lines_are_ignored() {
    let listing = "[FRAME]\nmedia_type=video\nthis line has no separator\n\n[SIDE_DATA]\nwidth=4\n[/FRAME]\n";
    let frames = parse_frames(listing, "a.mp4");

    assert_eq!(frames.len(), 1);
    let keys: Vec<_> = frames[0].keys().collect();
    assert_eq!(keys, ["media_type", "width", "filename"]);
}

#[test]
fn repeated_key_keeps_last_value() {
    let listing = "[FRAME]\nmedia_type=video\nwidth=4\nwidth=8\n[/FRAME]\n";
    let frames = parse_frames(listing, "a.mp4");

    assert_eq!(text(&frames[0], "width"), Some("8"));
    assert_eq!(frames[0].keys().filter(|key| *key == "width").count(), 1);
}

#[test]
fn empty_listing_has_no_frames() {
    assert!(parse_frames("", "a.mp4").is_empty());
}
