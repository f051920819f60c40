use std::path::{Path, PathBuf};

use blobfx_common::frame::{Frame, SourceFrame};

use super::MediaError;

/// Sequential frame decoder.
///
/// Frames come out in stream order, one per call. `Ok(None)` means the
/// stream is exhausted; any `Err` is fatal to the frame loop.
pub trait FrameSource {
    async fn next_frame(&mut self) -> Result<Option<SourceFrame>, MediaError>;
}

/// Sequential frame encoder at a fixed size and rate.
pub trait FrameSink {
    async fn write_frame(&mut self, frame: &Frame) -> Result<(), MediaError>;

    fn frames_written(&self) -> u64;
}

/// Extracted audio track, stored as a file the transcoder can read back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioHandle {
    pub path: PathBuf,
}

/// The final deliverable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputHandle {
    pub path: PathBuf,
}

/// Audio extraction and final remux. The frame loop never sees how this is done.
pub trait MediaTranscoder {
    /// `Ok(None)` without doing any work when `has_audio` is false.
    async fn extract_audio(&self, source: &Path, has_audio: bool) -> Result<Option<AudioHandle>, MediaError>;

    /// Combine the silent `video` with `audio` into `output`.
    async fn mux(&self, video: &Path, audio: Option<&AudioHandle>, output: &Path) -> Result<OutputHandle, MediaError>;
}
