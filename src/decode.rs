//! Lazy, pull-based decoding of every video frame in a file.
//!
//! [`DecodedFrames`] implements [`Iterator`] and decodes frames on demand:
//! each call to [`next()`](Iterator::next) reads and decodes just enough
//! packets to produce the next frame of the best video stream, in the order
//! the decoder emits them. Only one decoded image is alive at a time, so
//! memory stays flat regardless of video length. The iterator is finite and
//! cannot be restarted.
//!
//! # Example
//!
//! ```no_run
//! use video_to_sqlite::{DecodedFrames, PixelFormat};
//!
//! for image in DecodedFrames::open("input.mp4", PixelFormat::Rgb8)? {
//!     let image = image?;
//!     println!("{}x{}", image.width(), image.height());
//! }
//! # Ok::<(), video_to_sqlite::IngestError>(())
//! ```

use std::path::Path;

use ffmpeg_next::{
    Error as FfmpegError, Packet,
    codec::context::Context as CodecContext,
    decoder::Video as VideoDecoder,
    format::{Pixel, context::Input},
    frame::Video as VideoFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
    util::log::Level,
};
use image::{DynamicImage, GrayImage, RgbImage, RgbaImage};

use crate::config::PixelFormat;
use crate::error::{IngestError, Result};

/// Consecutive failed packet reads tolerated before decoding gives up.
const MAX_READ_ERRORS: u32 = 32;

/// Counts consecutive failures against a fixed limit.
#[derive(Debug, Clone, Copy)]
struct FailureBudget {
    consecutive: u32,
    limit: u32,
}

impl FailureBudget {
    fn new(limit: u32) -> Self {
        Self { consecutive: 0, limit }
    }

    /// Record a failure; `true` once the limit is reached.
    fn fail(&mut self) -> bool {
        self.consecutive += 1;
        self.consecutive >= self.limit
    }

    fn succeed(&mut self) {
        self.consecutive = 0;
    }
}

/// A lazy iterator over every decoded frame of a file's video stream.
pub struct DecodedFrames {
    input_context: Input,
    decoder: VideoDecoder,
    /// Rebuilt whenever the source geometry or format changes mid-stream.
    scaler: Option<(ScalingContext, Pixel, u32, u32)>,
    video_stream_index: usize,
    pixel_format: PixelFormat,
    decoded_frame: VideoFrame,
    scaled_frame: VideoFrame,
    eof_sent: bool,
    done: bool,
    read_errors: FailureBudget,
}

impl DecodedFrames {
    /// Open `path` and prepare to decode its best video stream.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::FfmpegError`] if the file cannot be opened and
    /// [`IngestError::NoVideoStream`] if it has no video stream.
    pub fn open<P: AsRef<Path>>(path: P, pixel_format: PixelFormat) -> Result<Self> {
        let path = path.as_ref();
        log::debug!("Opening decoder for {}", path.display());

        ffmpeg_next::init()?;
        ffmpeg_next::util::log::set_level(Level::Error);

        let input_context = ffmpeg_next::format::input(&path)?;
        let stream = input_context
            .streams()
            .best(Type::Video)
            .ok_or(IngestError::NoVideoStream)?;
        let video_stream_index = stream.index();
        let decoder = CodecContext::from_parameters(stream.parameters())?
            .decoder()
            .video()?;

        Ok(Self {
            input_context,
            decoder,
            scaler: None,
            video_stream_index,
            pixel_format,
            decoded_frame: VideoFrame::empty(),
            scaled_frame: VideoFrame::empty(),
            eof_sent: false,
            done: false,
            read_errors: FailureBudget::new(MAX_READ_ERRORS),
        })
    }

    /// Scale and convert the current `decoded_frame` to a `DynamicImage`.
    fn convert_current_frame(&mut self) -> Result<DynamicImage> {
        let format = self.decoded_frame.format();
        let width = self.decoded_frame.width();
        let height = self.decoded_frame.height();

        let stale = !matches!(
            &self.scaler,
            Some((_, f, w, h)) if *f == format && *w == width && *h == height
        );
        if stale {
            let context = ScalingContext::get(
                format,
                width,
                height,
                self.pixel_format.to_ffmpeg_pixel(),
                width,
                height,
                ScalingFlags::BILINEAR,
            )?;
            self.scaler = Some((context, format, width, height));
        }
        if let Some((scaler, ..)) = self.scaler.as_mut() {
            scaler.run(&self.decoded_frame, &mut self.scaled_frame)?;
        }

        let row_len = width as usize * self.pixel_format.bytes_per_pixel();
        let buffer = pack_rows(
            self.scaled_frame.data(0),
            self.scaled_frame.stride(0),
            row_len,
            height as usize,
        );
        let image = match self.pixel_format {
            PixelFormat::Rgb8 => RgbImage::from_raw(width, height, buffer).map(DynamicImage::ImageRgb8),
            PixelFormat::Rgba8 => {
                RgbaImage::from_raw(width, height, buffer).map(DynamicImage::ImageRgba8)
            }
            PixelFormat::Gray8 => {
                GrayImage::from_raw(width, height, buffer).map(DynamicImage::ImageLuma8)
            }
        };

        image.ok_or_else(|| {
            IngestError::VideoDecodeError(format!(
                "Failed to construct {:?} image from decoded frame data",
                self.pixel_format
            ))
        })
    }
}

impl Iterator for DecodedFrames {
    type Item = Result<DynamicImage>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            if self.decoder.receive_frame(&mut self.decoded_frame).is_ok() {
                let converted = self.convert_current_frame();
                if converted.is_err() {
                    self.done = true;
                }
                return Some(converted);
            }

            // Decoder has no buffered frames. Feed it more packets.
            if self.eof_sent {
                self.done = true;
                return None;
            }

            let mut packet = Packet::empty();
            match packet.read(&mut self.input_context) {
                Ok(()) => {
                    self.read_errors.succeed();
                    if packet.stream() == self.video_stream_index {
                        if let Err(error) = self.decoder.send_packet(&packet) {
                            self.done = true;
                            return Some(Err(IngestError::from(error)));
                        }
                    }
                }
                Err(FfmpegError::Eof) => {
                    if let Err(error) = self.decoder.send_eof() {
                        self.done = true;
                        return Some(Err(IngestError::from(error)));
                    }
                    self.eof_sent = true;
                }
                Err(error) => {
                    log::debug!("Skipping unreadable packet: {error}");
                    if self.read_errors.fail() {
                        self.done = true;
                        return Some(Err(IngestError::VideoDecodeError(format!(
                            "{MAX_READ_ERRORS} consecutive packet reads failed, last: {error}"
                        ))));
                    }
                }
            }
        }
    }
}

/// Gather `height` rows of `row_len` bytes from a plane laid out with
/// `stride` bytes per row, dropping the padding at the end of each row.
fn pack_rows(plane: &[u8], stride: usize, row_len: usize, height: usize) -> Vec<u8> {
    if stride == row_len {
        return plane[..row_len * height].to_vec();
    }
    plane
        .chunks(stride)
        .take(height)
        .flat_map(|row| &row[..row_len])
        .copied()
        .collect()
}
