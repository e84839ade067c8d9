//! Built-in frame callback adding pixel statistics.

use image::DynamicImage;

use crate::record::{Fields, FrameRecord};

/// Highest, lowest, and mean sample value across every channel of `frame`.
///
/// Adds `max` and `min` (integers) and `mean` (float) columns. Usable
/// directly as a [`FrameCallback`](crate::FrameCallback).
///
/// # Example
///
/// ```
/// use image::{DynamicImage, GrayImage};
/// use video_to_sqlite::{FieldValue, FrameRecord, pixel_statistics};
///
/// let frame = DynamicImage::ImageLuma8(GrayImage::from_raw(2, 1, vec![10, 30]).unwrap());
/// let fields = pixel_statistics(&frame, &FrameRecord::new());
/// assert_eq!(fields[2], ("mean".to_string(), FieldValue::Float(20.0)));
/// ```
pub fn pixel_statistics(frame: &DynamicImage, _record: &FrameRecord) -> Fields {
    let samples = frame.as_bytes();
    let (Some(&max), Some(&min)) = (samples.iter().max(), samples.iter().min()) else {
        return Fields::new();
    };
    let sum: u64 = samples.iter().map(|&sample| u64::from(sample)).sum();
    let mean = sum as f64 / samples.len() as f64;

    vec![
        ("max".to_string(), max.into()),
        ("min".to_string(), min.into()),
        ("mean".to_string(), mean.into()),
    ]
}
