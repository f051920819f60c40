pub mod encoder;
pub mod paths;
pub mod source;
pub mod streams;
pub mod traits;
pub mod transcode;

use tokio::process::Command;
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("failed to spawn {tool}: {reason}")]
    Spawn { tool: String, reason: String },
    #[error("failed to write frame to encoder stdin: {0}")]
    Write(String),
    #[error("failed to read frame from decoder stdout: {0}")]
    Read(String),
    #[error("failed to wait for {tool}: {reason}")]
    Wait { tool: String, reason: String },
    #[error("{tool} exited with non-zero status: {stderr}")]
    FfmpegFailed { tool: String, stderr: String },
    #[error("could not read stream info of {path}: {reason}")]
    StreamInfo { path: String, reason: String },
    #[error("file operation on {path} failed: {reason}")]
    Fs { path: String, reason: String },
}

impl MediaError {
    pub(crate) fn spawn(tool: &str, e: impl std::fmt::Display) -> Self {
        Self::Spawn {
            tool: tool.to_string(),
            reason: e.to_string(),
        }
    }

    pub(crate) fn wait(tool: &str, e: impl std::fmt::Display) -> Self {
        Self::Wait {
            tool: tool.to_string(),
            reason: e.to_string(),
        }
    }

    pub(crate) fn failed(tool: &str, stderr: &[u8]) -> Self {
        Self::FfmpegFailed {
            tool: tool.to_string(),
            stderr: String::from_utf8_lossy(stderr).trim().to_string(),
        }
    }
}

/// Check whether ffmpeg is callable. Logs a warning if not found.
pub async fn check_ffmpeg_available(ffmpeg_bin: &str) {
    match Command::new(ffmpeg_bin).arg("-version").output().await {
        Ok(out) if out.status.success() => {
            debug!(bin = ffmpeg_bin, "ffmpeg is available");
        }
        Ok(_) => {
            warn!(bin = ffmpeg_bin, "ffmpeg returned non-zero for -version; decoding may fail");
        }
        Err(e) => {
            warn!(
                bin = ffmpeg_bin,
                error = %e,
                "ffmpeg not found; decoding, encoding and muxing will fail. \
                 Install ffmpeg with libx264 support."
            );
        }
    }
}
