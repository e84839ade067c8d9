//! Invocation of the external media-probing tool.
//!
//! Ingestion needs two textual views of a file: the summary banner that
//! `ffprobe` prints to standard error, and the verbose per-frame listing
//! produced by `-show_frames` on standard output. [`ProbeSource`] abstracts
//! over where that text comes from so the parsers can be driven from canned
//! output in tests; [`Ffprobe`] is the real subprocess-backed source.
//!
//! # Example
//!
//! ```no_run
//! use video_to_sqlite::{Ffprobe, ProbeSource};
//!
//! let output = Ffprobe::default().probe("input.mp4".as_ref())?;
//! println!("{}", output.summary);
//! # Ok::<(), video_to_sqlite::IngestError>(())
//! ```

use std::{
    ffi::OsString,
    io::ErrorKind,
    path::Path,
    process::{Command, Output},
};

use crate::error::{IngestError, Result};

/// Raw text captured from both probe invocation modes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeOutput {
    /// Banner/summary text (stream descriptions, duration, bitrate).
    pub summary: String,
    /// Verbose `[FRAME] ... [/FRAME]` listing.
    pub frames: String,
}

/// A source of probe text for a media file.
pub trait ProbeSource {
    /// Run both probe modes against `path` and return their captured text.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::ToolNotFound`] or [`IngestError::ExternalTool`]
    /// when the underlying tool cannot run to completion.
    fn probe(&self, path: &Path) -> Result<ProbeOutput>;
}

/// Subprocess-backed [`ProbeSource`] running `ffprobe`.
#[derive(Debug, Clone)]
pub struct Ffprobe {
    program: OsString,
}

impl Default for Ffprobe {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

impl Ffprobe {
    /// Use the given program name or path instead of `ffprobe` from `PATH`.
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn run(&self, mode: &str, path: &Path) -> Result<Output> {
        let tool = self.program.to_string_lossy().into_owned();
        log::debug!("Running {tool} {mode} {}", path.display());

        let output = Command::new(&self.program)
            .arg(mode)
            .arg(path)
            .output()
            .map_err(|error| match error.kind() {
                ErrorKind::NotFound => IngestError::ToolNotFound { tool: tool.clone() },
                _ => IngestError::IoError(error),
            })?;

        if !output.status.success() {
            return Err(IngestError::ExternalTool {
                tool,
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(output)
    }
}

impl ProbeSource for Ffprobe {
    fn probe(&self, path: &Path) -> Result<ProbeOutput> {
        // The banner goes to stderr, the frame listing to stdout.
        let summary = self.run("-hide_banner", path)?;
        let frames = self.run("-show_frames", path)?;

        Ok(ProbeOutput {
            summary: String::from_utf8_lossy(&summary.stderr).into_owned(),
            frames: String::from_utf8_lossy(&frames.stdout).into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_program_is_tool_not_found() {
        let probe = Ffprobe::new("definitely-not-an-installed-ffprobe");
        let error = probe.probe(Path::new("input.mp4")).unwrap_err();
        assert!(
            matches!(error, IngestError::ToolNotFound { .. }),
            "unexpected error: {error}"
        );
    }
}
