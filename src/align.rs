//! Pairing parsed frame records with decoded frame images.
//!
//! When a caller supplies a [`FrameCallback`], each parsed [`FrameRecord`]
//! is matched by position with the next decoded image, numbered, and
//! enriched with whatever columns the callback returns.

use crate::error::Result;
use crate::record::{Fields, FrameRecord};

/// Column holding the zero-based frame position.
pub const FRAME_NO: &str = "frame_no";

/// Computes extra per-frame columns from a decoded frame.
///
/// Implemented for every `FnMut(&F, &FrameRecord) -> Fields`, so plain
/// functions and closures can be passed directly. Returning an empty
/// [`Fields`] contributes nothing for that frame.
///
/// # Example
///
/// ```
/// use image::DynamicImage;
/// use video_to_sqlite::{FieldValue, Fields, FrameRecord};
///
/// fn keyframe_width(frame: &DynamicImage, record: &FrameRecord) -> Fields {
///     match record.get("pict_type") {
///         Some(FieldValue::Text(kind)) if kind == "I" => {
///             vec![("width".to_string(), frame.width().into())]
///         }
///         _ => Vec::new(),
///     }
/// }
/// ```
pub trait FrameCallback<F> {
    /// Return the columns to merge into `record` for `frame`.
    fn on_frame(&mut self, frame: &F, record: &FrameRecord) -> Fields;
}

impl<F, C> FrameCallback<F> for C
where
    C: FnMut(&F, &FrameRecord) -> Fields,
{
    fn on_frame(&mut self, frame: &F, record: &FrameRecord) -> Fields {
        self(frame, record)
    }
}

/// Align `records` with `frames` index-for-index and apply `callback`.
///
/// Each paired record gets `frame_no` set to its index, then the callback's
/// columns are merged in (callback keys win on collision). Iteration stops
/// at the shorter sequence; unpaired records or frames are left untouched.
/// Frames are pulled one at a time, so the frame source is never buffered.
///
/// Returns the number of pairs processed.
///
/// # Errors
///
/// Propagates the first error yielded by `frames`.
pub fn align_frames<F, I, C>(records: &mut [FrameRecord], frames: I, callback: &mut C) -> Result<usize>
where
    I: IntoIterator<Item = Result<F>>,
    C: FrameCallback<F> + ?Sized,
{
    let mut aligned = 0;

    for (index, (record, frame)) in records.iter_mut().zip(frames).enumerate() {
        let frame = frame?;
        record.insert(FRAME_NO, index);
        let extra = callback.on_frame(&frame, record);
        record.extend(extra);
        aligned += 1;
    }

    if aligned < records.len() {
        log::debug!(
            "Decoder produced {aligned} frames for {} records; the rest are not enriched",
            records.len()
        );
    }
    Ok(aligned)
}
