//! Error types for the `video-to-sqlite` crate.
//!
//! This module defines [`IngestError`], the unified error type returned by
//! every fallible step of an ingestion run: probing, parsing, decoding, and
//! writing to the destination store. Errors carry the triggering condition
//! (missing field name, tool stderr, upstream message) so callers can report
//! them without extra logging at the call site.

use std::{io::Error as IoError, process::ExitStatus};

use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use rusqlite::Error as SqliteError;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T, E = IngestError> = std::result::Result<T, E>;

/// The unified error type for all ingestion operations.
///
/// All variants are fatal for the run that produced them. Malformed
/// `key=value` lines and frames without a decode timestamp are handled by
/// the parser itself and never surface here.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IngestError {
    /// The probe text did not contain an expected pattern.
    #[error("Metadata not found in probe output: {field}")]
    MetadataNotFound {
        /// Which piece of metadata was missing (e.g. `"duration"`).
        field: &'static str,
    },

    /// A metadata token was found but could not be interpreted.
    #[error("Invalid {field} in probe output: {value:?}")]
    InvalidMetadata {
        /// Name of the offending field.
        field: &'static str,
        /// The raw token as it appeared in the probe text.
        value: String,
    },

    /// The external probing tool could not be started.
    #[error("External tool not found: {tool}")]
    ToolNotFound {
        /// Program name or path that was spawned.
        tool: String,
    },

    /// The external probing tool ran but exited abnormally.
    #[error("External tool {tool} failed ({status}): {stderr}")]
    ExternalTool {
        /// Program name or path that was spawned.
        tool: String,
        /// Exit status reported by the OS.
        status: ExitStatus,
        /// Captured standard error, lossily decoded.
        stderr: String,
    },

    /// The destination store could not be opened, written, or altered.
    #[error("Storage error: {0}")]
    Storage(#[from] SqliteError),

    /// The input file has no decodable video stream.
    #[error("No video stream found in file")]
    NoVideoStream,

    /// A video frame could not be decoded.
    #[error("Failed to decode video frame: {0}")]
    VideoDecodeError(String),

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// An I/O error occurred while spawning tools or touching files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// An error from the `image` crate during frame conversion.
    #[error("Image processing error: {0}")]
    ImageError(#[from] ImageError),
}

impl From<FfmpegError> for IngestError {
    fn from(error: FfmpegError) -> Self {
        IngestError::FfmpegError(error.to_string())
    }
}
