//! # video-to-sqlite
//!
//! Load metadata about a video file, and about every frame in it, into a
//! SQLite database.
//!
//! `video-to-sqlite` runs `ffprobe` twice against a file: once for the
//! summary banner (codec, pixel format, resolution, frame rate, duration,
//! bitrate) and once with `-show_frames` for per-frame metadata. It writes
//! one row per video and one row per video frame into two linked tables,
//! `videos` and `frames`, optionally prefixed.
//!
//! ## Quick Start
//!
//! ```no_run
//! use video_to_sqlite::IngestOptions;
//!
//! let summary = video_to_sqlite::ingest("videos.db", "input.mp4", &IngestOptions::new())?;
//! println!("{} frames", summary.frame_rows);
//! # Ok::<(), video_to_sqlite::IngestError>(())
//! ```
//!
//! ### Extra Per-Frame Columns
//!
//! A [`FrameCallback`] sees each decoded frame (via FFmpeg, through the
//! [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next) crate) alongside its
//! metadata and returns extra columns for that frame's row:
//!
//! ```no_run
//! use image::DynamicImage;
//! use video_to_sqlite::{Fields, FrameRecord, IngestOptions};
//!
//! let mut brightness = |frame: &DynamicImage, _: &FrameRecord| -> Fields {
//!     let luma = frame.to_luma8();
//!     let total: u64 = luma.pixels().map(|pixel| u64::from(pixel.0[0])).sum();
//!     let mean = total as f64 / u64::from(luma.width() * luma.height()).max(1) as f64;
//!     vec![("brightness".to_string(), mean.into())]
//! };
//!
//! video_to_sqlite::ingest_with_callback(
//!     "videos.db",
//!     "input.mp4",
//!     &IngestOptions::new(),
//!     &mut brightness,
//! )?;
//! # Ok::<(), video_to_sqlite::IngestError>(())
//! ```
//!
//! ## Tables
//!
//! - `<prefix>videos`: primary key `filename`; `duration`, `bitrate`,
//!   `codec`, `pixel_format`, `resolution` as text and `framerate` as a float.
//! - `<prefix>frames`: primary key `(frame_no, filename)`, `filename`
//!   referencing the videos table, plus one column for every key any frame
//!   reported. Column types are inferred across all frames.
//!
//! Re-ingesting a file replaces its rows instead of duplicating them.
//!
//! ## Requirements
//!
//! `ffprobe` must be on `PATH` (or configured with
//! [`IngestOptions::with_ffprobe`]), and FFmpeg development libraries must be
//! installed to build the decoder.

pub mod align;
pub mod config;
pub mod decode;
pub mod error;
pub mod frames;
pub mod ingest;
pub mod metadata;
pub mod probe;
pub mod record;
pub mod schema;
pub mod statistics;
pub mod store;

pub use align::{FRAME_NO, FrameCallback, align_frames};
pub use config::{IngestOptions, PixelFormat};
pub use decode::DecodedFrames;
pub use error::{IngestError, Result};
pub use frames::parse_frames;
pub use ingest::{IngestSummary, Ingestor, ingest, ingest_with_callback};
pub use metadata::{VideoRecord, parse_summary};
pub use probe::{Ffprobe, ProbeOutput, ProbeSource};
pub use record::{FieldValue, Fields, FrameRecord};
pub use schema::{ColumnType, TypeTracker};
pub use statistics::pixel_statistics;
pub use store::Store;
