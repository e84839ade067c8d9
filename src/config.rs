//! Ingestion configuration.
//!
//! [`IngestOptions`] is a builder that carries the table prefix, the probe
//! program, and the frame output format through an ingestion run without
//! widening every function signature.
//!
//! # Example
//!
//! ```
//! use video_to_sqlite::{IngestOptions, PixelFormat};
//!
//! let options = IngestOptions::new()
//!     .with_prefix("my_")
//!     .with_pixel_format(PixelFormat::Gray8);
//! assert_eq!(options.videos_table(), "my_videos");
//! assert_eq!(options.frames_table(), "my_frames");
//! ```

use std::path::PathBuf;

use ffmpeg_next::format::Pixel;

/// Pixel layout of the images handed to frame callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PixelFormat {
    /// 8-bit RGB (24 bpp). This is the default.
    #[default]
    Rgb8,
    /// 8-bit RGBA with alpha pre-set to 255 (32 bpp).
    Rgba8,
    /// 8-bit grayscale (8 bpp).
    Gray8,
}

impl PixelFormat {
    /// Map to the corresponding FFmpeg pixel format constant.
    pub(crate) fn to_ffmpeg_pixel(self) -> Pixel {
        match self {
            PixelFormat::Rgb8 => Pixel::RGB24,
            PixelFormat::Rgba8 => Pixel::RGBA,
            PixelFormat::Gray8 => Pixel::GRAY8,
        }
    }

    /// Bytes per pixel in the packed output buffer.
    pub(crate) fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgb8 => 3,
            PixelFormat::Rgba8 => 4,
            PixelFormat::Gray8 => 1,
        }
    }
}

/// Settings for one ingestion run.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Prepended to both table names.
    pub(crate) prefix: String,
    /// Program used to probe the input.
    pub(crate) ffprobe: PathBuf,
    /// Image layout for callback frames.
    pub(crate) pixel_format: PixelFormat,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl IngestOptions {
    /// Defaults: no prefix, `ffprobe` from `PATH`, RGB8 frames.
    pub fn new() -> Self {
        Self {
            prefix: String::new(),
            ffprobe: PathBuf::from("ffprobe"),
            pixel_format: PixelFormat::default(),
        }
    }

    /// Set the prefix applied to the `videos` and `frames` table names.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Use a specific probe program instead of `ffprobe` from `PATH`.
    #[must_use]
    pub fn with_ffprobe(mut self, program: impl Into<PathBuf>) -> Self {
        self.ffprobe = program.into();
        self
    }

    /// Set the pixel format of images passed to frame callbacks.
    #[must_use]
    pub fn with_pixel_format(mut self, format: PixelFormat) -> Self {
        self.pixel_format = format;
        self
    }

    /// Prefix applied to both table names.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Pixel format of images handed to frame callbacks.
    pub fn pixel_format(&self) -> PixelFormat {
        self.pixel_format
    }

    /// Name of the per-video table.
    pub fn videos_table(&self) -> String {
        format!("{}videos", self.prefix)
    }

    /// Name of the per-frame table.
    pub fn frames_table(&self) -> String {
        format!("{}frames", self.prefix)
    }
}
