//! Parsing of the verbose per-frame probe listing.
//!
//! `ffprobe -show_frames` prints one block per decoded frame of every
//! stream, each wrapped in `[FRAME]` / `[/FRAME]` tags with `key=value`
//! lines in between. Audio frames are interleaved with video frames, and
//! the final video block usually reports `pkt_dts=N/A` as an end-of-stream
//! artifact. [`parse_frames`] keeps only the real video frames, in decode
//! order.

use crate::record::FrameRecord;

const OPEN_TAG: &str = "[FRAME]";
const CLOSE_TAG: &str = "[/FRAME]";

/// Field holding the frame's decode timestamp.
pub const DECODE_TIMESTAMP_FIELD: &str = "pkt_dts";

/// Value the probe prints for a missing timestamp.
pub const NOT_AVAILABLE: &str = "N/A";

/// Parse a `-show_frames` listing into video frame records.
///
/// Every value is kept verbatim as text. Lines without `=` are ignored,
/// keys are split from values at the first `=`, and each surviving record
/// gets a `filename` column set to `filename`.
///
/// # Example
///
/// ```
/// use video_to_sqlite::parse_frames;
///
/// let listing = "[FRAME]\nmedia_type=audio\npkt_dts=0\n[/FRAME]\n\
///                [FRAME]\nmedia_type=video\npkt_dts=0\npict_type=I\n[/FRAME]\n";
/// let frames = parse_frames(listing, "clip.mp4");
/// assert_eq!(frames.len(), 1);
/// assert_eq!(frames[0].get("filename").and_then(|v| v.as_text()), Some("clip.mp4"));
/// ```
pub fn parse_frames(text: &str, filename: &str) -> Vec<FrameRecord> {
    let mut frames = Vec::new();
    let mut current: Option<FrameRecord> = None;
    let mut discarded = 0usize;

    let mut finish = |block: FrameRecord, frames: &mut Vec<FrameRecord>| match accept(block, filename) {
        Some(record) => frames.push(record),
        None => discarded += 1,
    };

    for line in text.lines() {
        match line.trim() {
            OPEN_TAG => {
                if let Some(block) = current.replace(FrameRecord::new()) {
                    finish(block, &mut frames);
                }
            }
            CLOSE_TAG => {
                if let Some(block) = current.take() {
                    finish(block, &mut frames);
                }
            }
            line => {
                if let (Some(block), Some((key, value))) = (current.as_mut(), line.split_once('=')) {
                    block.insert(key, value);
                }
            }
        }
    }

    // A listing cut short still yields its final block.
    if let Some(block) = current.take() {
        finish(block, &mut frames);
    }

    log::debug!(
        "Parsed {} video frames from {filename} ({discarded} blocks discarded)",
        frames.len()
    );
    frames
}

/// Apply the block filters and inject the filename.
fn accept(mut block: FrameRecord, filename: &str) -> Option<FrameRecord> {
    let text = |key: &str| block.get(key).and_then(|value| value.as_text());

    if text("media_type") != Some("video") {
        return None;
    }
    if text(DECODE_TIMESTAMP_FIELD) == Some(NOT_AVAILABLE) {
        return None;
    }

    block.insert("filename", filename);
    Some(block)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FieldValue;

    #[test]
    fn value_keeps_everything_after_first_equals() {
        let frames = parse_frames(
            "[FRAME]\nmedia_type=video\nside_data=a=b\n[/FRAME]\n",
            "x.mp4",
        );
        assert_eq!(frames[0].get("side_data"), Some(&FieldValue::from("a=b")));
    }

    #[test]
    fn unterminated_block_is_kept() {
        let frames = parse_frames("[FRAME]\nmedia_type=video\npkt_dts=5", "x.mp4");
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn lines_outside_blocks_are_ignored() {
        let frames = parse_frames("media_type=video\n[FRAME]\nmedia_type=video\n[/FRAME]\nstray=1\n", "x.mp4");
        assert_eq!(frames.len(), 1);
        assert!(!frames[0].contains_key("stray"));
    }
}
