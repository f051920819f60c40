use std::path::{Path, PathBuf};
use std::process::Stdio;

use blobfx_common::frame::Frame;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, Command};
use tracing::{debug, error, info};

use super::traits::FrameSink;
use super::MediaError;

/// Encodes composited frames into the intermediate silent video.
pub struct FfmpegEncoder {
    tool: String,
    child: Child,
    stdin: ChildStdin,
    output_path: PathBuf,
    width: u32,
    height: u32,
    frame_count: u64,
}

impl FfmpegEncoder {
    /// Spawn an ffmpeg subprocess ready to receive raw `rgb24` frames of
    /// `width x height` on stdin, played back at `fps`.
    pub fn start(ffmpeg_bin: &str, output_path: &Path, width: u32, height: u32, fps: f64) -> Result<Self, MediaError> {
        let size = format!("{width}x{height}");
        let fps_str = fps.to_string();

        let mut cmd = Command::new(ffmpeg_bin);
        cmd.args([
            "-v", "error",
            "-f", "rawvideo",
            "-pix_fmt", "rgb24",
            "-s", &size,
            "-r", &fps_str,
            "-i", "pipe:0",
            "-an",
            "-c:v", "libx264",
            "-pix_fmt", "yuv420p",
            "-movflags", "+faststart",
            "-y",
        ])
        .arg(output_path)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| MediaError::spawn(ffmpeg_bin, e))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| MediaError::spawn(ffmpeg_bin, "could not get stdin handle"))?;

        debug!(
            size = %size,
            fps,
            output = %output_path.display(),
            "ffmpeg encoder started"
        );

        Ok(Self {
            tool: ffmpeg_bin.to_string(),
            child,
            stdin,
            output_path: output_path.to_path_buf(),
            width,
            height,
            frame_count: 0,
        })
    }

    /// Close stdin and wait for ffmpeg to flush the file. Returns its path.
    pub async fn finish(self) -> Result<PathBuf, MediaError> {
        // EOF on stdin ends the encode.
        drop(self.stdin);

        let output = self
            .child
            .wait_with_output()
            .await
            .map_err(|e| MediaError::wait(&self.tool, e))?;

        if !output.status.success() {
            let err = MediaError::failed(&self.tool, &output.stderr);
            error!(error = %err, output = %self.output_path.display(), "encoder exited with error");
            return Err(err);
        }

        info!(
            frame_count = self.frame_count,
            output = %self.output_path.display(),
            "intermediate video encoding complete"
        );
        Ok(self.output_path)
    }
}

impl FrameSink for FfmpegEncoder {
    async fn write_frame(&mut self, frame: &Frame) -> Result<(), MediaError> {
        if frame.dimensions() != (self.width, self.height) {
            return Err(MediaError::Write(format!(
                "frame is {}x{}, encoder expects {}x{}",
                frame.width(),
                frame.height(),
                self.width,
                self.height
            )));
        }
        self.stdin
            .write_all(frame.as_raw())
            .await
            .map_err(|e| MediaError::Write(e.to_string()))?;
        self.frame_count += 1;
        Ok(())
    }

    fn frames_written(&self) -> u64 {
        self.frame_count
    }
}
