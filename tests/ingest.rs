//! End-to-end ingestion tests.
//!
//! Most tests drive [`Ingestor`] from canned probe output so they run
//! without FFmpeg tools; the fixture tests at the bottom need `ffprobe` and
//! `tests/fixtures/sample_video.mp4` and return early without them.

use std::path::Path;

use image::{DynamicImage, RgbImage};
use tempfile::tempdir;
use video_to_sqlite::{
    FieldValue, Fields, FrameRecord, IngestError, IngestOptions, Ingestor, ProbeOutput,
    ProbeSource, Result, Store, pixel_statistics,
};

const SUMMARY: &str = include_str!("fixtures/probe_summary.txt");
const FRAMES: &str = include_str!("fixtures/probe_frames.txt");

fn sample_video_path() -> &'static str {
    "tests/fixtures/sample_video.mp4"
}

/// Replays fixed probe text for any path.
struct Canned {
    summary: String,
    frames: String,
}

impl Canned {
    fn fixture() -> Self {
        Self {
            summary: SUMMARY.to_string(),
            frames: FRAMES.to_string(),
        }
    }
}

impl ProbeSource for Canned {
    fn probe(&self, _path: &Path) -> Result<ProbeOutput> {
        Ok(ProbeOutput {
            summary: self.summary.clone(),
            frames: self.frames.clone(),
        })
    }
}

fn solid(value: u8) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 2, image::Rgb([value, value, value])))
}

fn count(store: &Store, table: &str) -> i64 {
    store
        .connection()
        .query_row(&format!("SELECT COUNT(*) FROM \"{table}\""), [], |row| row.get(0))
        .unwrap()
}

#[test]
fn ingest_writes_both_tables() {
    let mut store = Store::open_in_memory().unwrap();
    let ingestor = Ingestor::with_source(Canned::fixture(), IngestOptions::new());

    let summary = ingestor.ingest(&mut store, "/media/in/sample_video.mp4").unwrap();

    assert_eq!(summary.video.filename, "sample_video.mp4");
    assert_eq!(summary.frame_rows, 3);
    assert_eq!(summary.enriched_frames, None);
    assert_eq!(count(&store, "videos"), 1);
    assert_eq!(count(&store, "frames"), 3);

    let orphans: i64 = store
        .connection()
        .query_row(
            "SELECT COUNT(*) FROM frames LEFT JOIN videos USING (filename) WHERE videos.codec IS NULL",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(orphans, 0);
}

#[test]
fn ingest_twice_keeps_row_counts() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("videos.db");
    let ingestor = Ingestor::with_source(Canned::fixture(), IngestOptions::new());

    for _ in 0..2 {
        let mut store = Store::open(&path).unwrap();
        ingestor.ingest(&mut store, "sample_video.mp4").unwrap();
    }

    let store = Store::open(&path).unwrap();
    assert_eq!(count(&store, "videos"), 1);
    assert_eq!(count(&store, "frames"), 3);
}

#[test]
fn prefix_names_both_tables() {
    let mut store = Store::open_in_memory().unwrap();
    let ingestor = Ingestor::with_source(Canned::fixture(), IngestOptions::new().with_prefix("my_"));

    ingestor.ingest(&mut store, "sample_video.mp4").unwrap();

    assert_eq!(count(&store, "my_videos"), 1);
    assert_eq!(count(&store, "my_frames"), 3);
    assert!(store.columns("videos").unwrap().is_empty());
}

#[test]
fn callback_columns_reach_the_store() {
    let mut store = Store::open_in_memory().unwrap();
    let ingestor = Ingestor::with_source(Canned::fixture(), IngestOptions::new());
    let frames = [solid(10), solid(20), solid(30)].map(Ok);

    let summary = ingestor
        .ingest_frames(&mut store, "sample_video.mp4", frames, &mut pixel_statistics)
        .unwrap();

    assert_eq!(summary.enriched_frames, Some(3));
    let mut statement = store
        .connection()
        .prepare("SELECT frame_no, max, mean, pict_type FROM frames ORDER BY frame_no")
        .unwrap();
    let rows: Vec<(i64, i64, f64, String)> = statement
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)))
        .unwrap()
        .collect::<std::result::Result<_, _>>()
        .unwrap();
    assert_eq!(
        rows,
        [
            (0, 10, 10.0, "I".to_string()),
            (1, 20, 20.0, "P".to_string()),
            (2, 30, 30.0, "B".to_string()),
        ]
    );
}

#[test]
fn callback_widening_leaves_other_rows_null() {
    let mut store = Store::open_in_memory().unwrap();
    let ingestor = Ingestor::with_source(Canned::fixture(), IngestOptions::new());
    let mut callback = |_: &u8, record: &FrameRecord| -> Fields {
        match record.get("frame_no") {
            Some(FieldValue::Integer(0)) => vec![("max".to_string(), FieldValue::from(5))],
            _ => Vec::new(),
        }
    };

    ingestor
        .ingest_frames(&mut store, "sample_video.mp4", [Ok(0u8), Ok(1)], &mut callback)
        .unwrap();

    let mut statement = store.connection().prepare("SELECT max FROM frames ORDER BY frame_no").unwrap();
    let values: Vec<FieldValue> = statement
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<std::result::Result<_, _>>()
        .unwrap();
    assert_eq!(values, [FieldValue::Integer(5), FieldValue::Null, FieldValue::Null]);
}

#[test]
fn decode_error_writes_nothing() {
    let mut store = Store::open_in_memory().unwrap();
    let ingestor = Ingestor::with_source(Canned::fixture(), IngestOptions::new());
    let frames = vec![
        Ok(solid(1)),
        Err(IngestError::VideoDecodeError("truncated".to_string())),
    ];

    let error = ingestor
        .ingest_frames(&mut store, "sample_video.mp4", frames, &mut pixel_statistics)
        .unwrap_err();

    assert!(matches!(error, IngestError::VideoDecodeError(_)));
    assert!(store.columns("videos").unwrap().is_empty());
}

#[test]
fn missing_banner_writes_nothing() {
    let mut store = Store::open_in_memory().unwrap();
    let source = Canned {
        summary: "Input #0, wav, from 'tone.wav':\n  Duration: 00:00:01.00, bitrate: 1411 kb/s\n".to_string(),
        frames: FRAMES.to_string(),
    };
    let ingestor = Ingestor::with_source(source, IngestOptions::new());

    let error = ingestor.ingest(&mut store, "tone.wav").unwrap_err();

    assert!(matches!(error, IngestError::MetadataNotFound { .. }), "unexpected error: {error}");
    assert!(store.columns("videos").unwrap().is_empty());
    assert!(store.columns("frames").unwrap().is_empty());
}

#[test]
fn listing_without_video_frames_writes_only_the_video() {
    let mut store = Store::open_in_memory().unwrap();
    let source = Canned {
        summary: SUMMARY.to_string(),
        frames: "[FRAME]\nmedia_type=audio\npkt_dts=0\n[/FRAME]\n".to_string(),
    };
    let ingestor = Ingestor::with_source(source, IngestOptions::new());

    let summary = ingestor.ingest(&mut store, "sample_video.mp4").unwrap();

    assert_eq!(summary.frame_rows, 0);
    assert_eq!(count(&store, "videos"), 1);
}

#[test]
fn parse_does_not_touch_a_store() {
    let ingestor = Ingestor::with_source(Canned::fixture(), IngestOptions::new());

    let (video, frames) = ingestor.parse("clips/sample_video.mp4").unwrap();

    assert_eq!(video.codec, "h264");
    assert_eq!(frames.len(), 3);
    assert!(frames.iter().all(|frame| !frame.contains_key("frame_no")));
}

#[test]
fn missing_probe_tool_is_reported() {
    let dir = tempdir().unwrap();
    let options = IngestOptions::new().with_ffprobe("video-to-sqlite-no-such-ffprobe");

    let error = video_to_sqlite::ingest(dir.path().join("videos.db"), "clip.mp4", &options).unwrap_err();

    assert!(matches!(error, IngestError::ToolNotFound { .. }), "unexpected error: {error}");
}

#[test]
fn fixture_ingest_with_ffprobe() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let dir = tempdir().unwrap();
    let summary = match video_to_sqlite::ingest(dir.path().join("videos.db"), path, &IngestOptions::new()) {
        Ok(summary) => summary,
        Err(IngestError::ToolNotFound { .. }) => return,
        Err(error) => panic!("ingest failed: {error}"),
    };

    assert_eq!(summary.video.filename, "sample_video.mp4");
    assert_eq!(summary.video.resolution, "320x240");
    assert!(summary.frame_rows > 0);
}

#[test]
fn fixture_ingest_with_pixel_statistics() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let dir = tempdir().unwrap();
    let db_path = dir.path().join("videos.db");
    let summary = match video_to_sqlite::ingest_with_callback(&db_path, path, &IngestOptions::new(), &mut pixel_statistics)
    {
        Ok(summary) => summary,
        Err(IngestError::ToolNotFound { .. }) => return,
        Err(error) => panic!("ingest failed: {error}"),
    };

    assert!(summary.enriched_frames.unwrap_or_default() > 0);
    let store = Store::open(&db_path).unwrap();
    let with_stats: i64 = store
        .connection()
        .query_row("SELECT COUNT(*) FROM frames WHERE mean IS NOT NULL", [], |row| row.get(0))
        .unwrap();
    assert_eq!(with_stats as usize, summary.enriched_frames.unwrap_or_default());
}

#[test]
fn fixture_without_video_stream_is_rejected() {
    let path = "tests/fixtures/sample_audio_only.m4a";
    if !Path::new(path).exists() {
        return;
    }

    let dir = tempdir().unwrap();
    let db_path = dir.path().join("videos.db");
    match video_to_sqlite::ingest(&db_path, path, &IngestOptions::new()) {
        Err(IngestError::MetadataNotFound { field }) => assert_eq!(field, "video stream"),
        Err(IngestError::ToolNotFound { .. }) => return,
        other => panic!("expected missing video stream, got {other:?}"),
    }

    let store = Store::open(&db_path).unwrap();
    assert!(store.columns("videos").unwrap().is_empty());
}
