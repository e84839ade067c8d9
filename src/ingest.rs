//! End-to-end ingestion of one video file.
//!
//! An [`Ingestor`] drives a run in order: probe the file, parse the banner
//! into a [`VideoRecord`] and the frame listing into [`FrameRecord`]s,
//! optionally enrich the records from decoded frames through a
//! [`FrameCallback`], then write both tables in one transaction.
//!
//! # Example
//!
//! ```no_run
//! use video_to_sqlite::{IngestOptions, pixel_statistics};
//!
//! let options = IngestOptions::new().with_prefix("my_");
//!
//! // Metadata only.
//! video_to_sqlite::ingest("videos.db", "clip.mp4", &options)?;
//!
//! // With extra per-frame columns.
//! video_to_sqlite::ingest_with_callback("videos.db", "clip.mp4", &options, &mut pixel_statistics)?;
//! # Ok::<(), video_to_sqlite::IngestError>(())
//! ```

use std::path::Path;

use image::DynamicImage;

use crate::align::{FrameCallback, align_frames};
use crate::config::IngestOptions;
use crate::decode::DecodedFrames;
use crate::error::Result;
use crate::frames::parse_frames;
use crate::metadata::{VideoRecord, parse_summary};
use crate::probe::{Ffprobe, ProbeSource};
use crate::record::FrameRecord;
use crate::store::Store;

/// Outcome of a successful ingestion run.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct IngestSummary {
    /// The row written to the videos table.
    pub video: VideoRecord,
    /// Number of rows written to the frames table.
    pub frame_rows: usize,
    /// Frames passed through the callback, if one was supplied.
    pub enriched_frames: Option<usize>,
}

/// Ingest `video_path` into the database at `db_path` without a callback.
///
/// # Errors
///
/// Fails with the first fatal [`IngestError`](crate::IngestError) of the run;
/// nothing is committed in that case.
pub fn ingest<P: AsRef<Path>, Q: AsRef<Path>>(
    db_path: P,
    video_path: Q,
    options: &IngestOptions,
) -> Result<IngestSummary> {
    let mut store = Store::open(db_path)?;
    Ingestor::new(options.clone()).ingest(&mut store, video_path)
}

/// Ingest `video_path`, adding the columns `callback` computes per frame.
///
/// Frames are decoded lazily with FFmpeg and paired with the probe's frame
/// records by position.
pub fn ingest_with_callback<P, Q, C>(
    db_path: P,
    video_path: Q,
    options: &IngestOptions,
    callback: &mut C,
) -> Result<IngestSummary>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
    C: FrameCallback<DynamicImage> + ?Sized,
{
    let mut store = Store::open(db_path)?;
    Ingestor::new(options.clone()).ingest_with_callback(&mut store, video_path, callback)
}

/// Runs the ingestion pipeline against a [`ProbeSource`].
#[derive(Debug, Clone)]
pub struct Ingestor<S = Ffprobe> {
    source: S,
    options: IngestOptions,
}

impl Ingestor<Ffprobe> {
    /// An ingestor probing with the program named in `options`.
    pub fn new(options: IngestOptions) -> Self {
        let source = Ffprobe::new(options.ffprobe.clone());
        Self { source, options }
    }
}

impl<S: ProbeSource> Ingestor<S> {
    /// An ingestor reading probe text from `source`.
    pub fn with_source(source: S, options: IngestOptions) -> Self {
        Self { source, options }
    }

    /// The options this ingestor writes with.
    pub fn options(&self) -> &IngestOptions {
        &self.options
    }

    /// Probe and parse `video_path` without touching any store.
    pub fn parse<P: AsRef<Path>>(&self, video_path: P) -> Result<(VideoRecord, Vec<FrameRecord>)> {
        let video_path = video_path.as_ref();
        let filename = base_name(video_path);
        let output = self.source.probe(video_path)?;

        let video = parse_summary(&output.summary, &filename)?;
        let frames = parse_frames(&output.frames, &filename);
        Ok((video, frames))
    }

    /// Probe, parse, and write `video_path` without a callback.
    pub fn ingest<P: AsRef<Path>>(&self, store: &mut Store, video_path: P) -> Result<IngestSummary> {
        let (video, frames) = self.parse(video_path)?;
        self.write(store, video, frames, None)
    }

    /// Probe, parse, enrich from FFmpeg-decoded frames, and write.
    pub fn ingest_with_callback<P, C>(
        &self,
        store: &mut Store,
        video_path: P,
        callback: &mut C,
    ) -> Result<IngestSummary>
    where
        P: AsRef<Path>,
        C: FrameCallback<DynamicImage> + ?Sized,
    {
        let (video, records) = self.parse(video_path.as_ref())?;
        let decoded = DecodedFrames::open(video_path, self.options.pixel_format)?;
        self.enrich_and_write(store, video, records, decoded, callback)
    }

    /// Like [`ingest_with_callback`](Self::ingest_with_callback), with the
    /// decoded frames supplied by the caller.
    pub fn ingest_frames<P, F, I, C>(
        &self,
        store: &mut Store,
        video_path: P,
        frames: I,
        callback: &mut C,
    ) -> Result<IngestSummary>
    where
        P: AsRef<Path>,
        I: IntoIterator<Item = Result<F>>,
        C: FrameCallback<F> + ?Sized,
    {
        let (video, records) = self.parse(video_path)?;
        self.enrich_and_write(store, video, records, frames, callback)
    }

    fn enrich_and_write<F, I, C>(
        &self,
        store: &mut Store,
        video: VideoRecord,
        mut records: Vec<FrameRecord>,
        frames: I,
        callback: &mut C,
    ) -> Result<IngestSummary>
    where
        I: IntoIterator<Item = Result<F>>,
        C: FrameCallback<F> + ?Sized,
    {
        let enriched = align_frames(&mut records, frames, callback)?;
        self.write(store, video, records, Some(enriched))
    }

    fn write(
        &self,
        store: &mut Store,
        video: VideoRecord,
        frames: Vec<FrameRecord>,
        enriched_frames: Option<usize>,
    ) -> Result<IngestSummary> {
        let frame_rows = store.write(
            &self.options.videos_table(),
            &self.options.frames_table(),
            &video,
            &frames,
        )?;

        log::info!(
            "Ingested {} ({} {}, {} frames) into {}",
            video.filename,
            video.codec,
            video.resolution,
            frame_rows,
            self.options.frames_table()
        );
        Ok(IngestSummary {
            video,
            frame_rows,
            enriched_frames,
        })
    }
}

/// Final path component, falling back to the whole path.
fn base_name(path: &Path) -> String {
    path.file_name()
        .unwrap_or(path.as_os_str())
        .to_string_lossy()
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_name_strips_directories() {
        assert_eq!(base_name(Path::new("/data/in/clip.mp4")), "clip.mp4");
        assert_eq!(base_name(Path::new("clip.mp4")), "clip.mp4");
        assert_eq!(base_name(Path::new("/")), "/");
    }
}
