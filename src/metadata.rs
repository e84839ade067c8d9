//! Video-level metadata.
//!
//! This module defines [`VideoRecord`], the single row written to the
//! videos table, and [`parse_summary`], which extracts it from the banner
//! text a probe prints for a file. Extraction follows the comma layout of
//! the first video stream description line; it is not a general grammar for
//! the banner.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{IngestError, Result};

static DURATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Duration: (\d\d:\d\d:\d\d\.\d\d)").expect("valid regex"));

static BITRATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"bitrate: (\d+ [kM]?b/s)").expect("valid regex"));

/// Metadata for one ingested video file.
///
/// # Example
///
/// ```
/// use video_to_sqlite::parse_summary;
///
/// let banner = "  Duration: 00:01:30.00, start: 0.000000, bitrate: 5000 kb/s\n    \
///     Stream #0:0: Video: h264, yuv420p(progressive), 1920x1080 [SAR 1:1 DAR 16:9], \
///     30 fps, 30 tbr, 90k tbn, 60 tbc\n";
/// let video = parse_summary(banner, "clip.mp4")?;
/// assert_eq!(video.resolution, "1920x1080");
/// assert_eq!(video.frames_per_second()?, 30.0);
/// # Ok::<(), video_to_sqlite::IngestError>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct VideoRecord {
    /// Base name of the input file; primary key of the videos table.
    pub filename: String,
    /// Container duration formatted `HH:MM:SS.ss`.
    pub duration: String,
    /// Overall bitrate as printed, e.g. `"5000 kb/s"`.
    pub bitrate: String,
    /// Codec description, e.g. `"h264"`.
    pub codec: String,
    /// Pixel format with any parenthesized qualifier removed.
    pub pixel_format: String,
    /// Frame size, e.g. `"1920x1080"`.
    pub resolution: String,
    /// Frame rate token as printed, e.g. `"30"` or `"29.97"`.
    pub framerate: String,
}

impl VideoRecord {
    /// The frame rate as a number.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::InvalidMetadata`] if the token is not numeric.
    pub fn frames_per_second(&self) -> Result<f64> {
        self.framerate
            .parse()
            .map_err(|_| IngestError::InvalidMetadata {
                field: "framerate",
                value: self.framerate.clone(),
            })
    }
}

/// Extract a [`VideoRecord`] from probe banner text.
///
/// The first line that starts with `Stream #` and mentions `Video` is split
/// into comma-separated segments, ignoring commas inside parentheses such
/// as `yuv420p(tv, bt709)`. The codec follows `Video: ` in the first
/// segment and the pixel format leads the second. The resolution is the
/// first `WIDTHxHEIGHT` token and the frame rate the number labelled `fps`;
/// when either is absent, the fourth and sixth plain comma-delimited
/// segments are used instead. Duration and bitrate are matched anywhere in
/// the text.
///
/// # Errors
///
/// Returns [`IngestError::MetadataNotFound`] naming the first piece of
/// metadata that could not be located.
pub fn parse_summary(text: &str, filename: &str) -> Result<VideoRecord> {
    let video_line = text
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with("Stream #") && line.contains("Video"))
        .ok_or(IngestError::MetadataNotFound {
            field: "video stream",
        })?;
    let segments = split_top_level(video_line);
    let plain: Vec<&str> = video_line.split(',').collect();

    let codec = segments
        .first()
        .and_then(|segment| segment.split_once("Video: "))
        .map(|(_, codec)| codec.trim())
        .ok_or(IngestError::MetadataNotFound { field: "codec" })?;
    let pixel_format = leading_token(&segments, 1, "pixel_format")?
        .split('(')
        .next()
        .unwrap_or_default();
    let resolution = match segments.iter().skip(1).find_map(|segment| {
        segment
            .split_whitespace()
            .next()
            .filter(|token| is_resolution(token))
    }) {
        Some(resolution) => resolution,
        None => leading_token(&plain, 3, "resolution")?,
    };
    let framerate = match segments.iter().find_map(|segment| labelled(segment, "fps")) {
        Some(framerate) => framerate,
        None => leading_token(&plain, 5, "framerate")?,
    };

    let duration = capture(&DURATION, text, "duration")?;
    let bitrate = capture(&BITRATE, text, "bitrate")?;

    Ok(VideoRecord {
        filename: filename.to_string(),
        duration: duration.to_string(),
        bitrate: bitrate.to_string(),
        codec: codec.to_string(),
        pixel_format: pixel_format.to_string(),
        resolution: resolution.to_string(),
        framerate: framerate.to_string(),
    })
}

/// Split on commas that are not nested inside `(...)` or `[...]`.
fn split_top_level(line: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (index, character) in line.char_indices() {
        match character {
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                segments.push(&line[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }
    segments.push(&line[start..]);
    segments
}

/// First whitespace-delimited token of segment `index`.
fn leading_token<'a>(segments: &[&'a str], index: usize, field: &'static str) -> Result<&'a str> {
    segments
        .get(index)
        .and_then(|segment| segment.split_whitespace().next())
        .ok_or(IngestError::MetadataNotFound { field })
}

/// The value in a `<value> <unit>` segment, if the unit matches.
fn labelled<'a>(segment: &'a str, unit: &str) -> Option<&'a str> {
    let mut tokens = segment.split_whitespace();
    match (tokens.next(), tokens.next()) {
        (Some(value), Some(label)) if label == unit => Some(value),
        _ => None,
    }
}

fn is_resolution(token: &str) -> bool {
    let digits = |part: &str| !part.is_empty() && part.bytes().all(|byte| byte.is_ascii_digit());
    token
        .split_once('x')
        .is_some_and(|(width, height)| digits(width) && digits(height))
}

fn capture<'a>(pattern: &Regex, text: &'a str, field: &'static str) -> Result<&'a str> {
    pattern
        .captures(text)
        .and_then(|captures| captures.get(1))
        .map(|found| found.as_str())
        .ok_or(IngestError::MetadataNotFound { field })
}
