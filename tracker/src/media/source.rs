use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;

use blobfx_common::frame::{rgb24_frame_len, SourceFrame};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, ChildStdout, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::traits::FrameSource;
use super::MediaError;

/// Decodes a video file through an ffmpeg child process emitting raw
/// `rgb24` frames on stdout.
///
/// ffmpeg scales every frame to `width x height` itself. The byte stride
/// then never depends on the coded size or on display-matrix rotation, which
/// ffmpeg applies before the scale filter.
pub struct FfmpegSource {
    tool: String,
    child: Child,
    stdout: ChildStdout,
    stderr: Option<JoinHandle<String>>,
    width: u32,
    height: u32,
    next_seq: u64,
    exhausted: bool,
}

impl FfmpegSource {
    pub fn open(ffmpeg_bin: &str, path: &Path, width: u32, height: u32) -> Result<Self, MediaError> {
        let mut child = Command::new(ffmpeg_bin)
            .args(decode_args(path, width, height))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| MediaError::spawn(ffmpeg_bin, e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| MediaError::spawn(ffmpeg_bin, "could not get stdout handle"))?;
        let stderr = child.stderr.take().map(|mut pipe| {
            tokio::spawn(async move {
                let mut text = String::new();
                let _ = pipe.read_to_string(&mut text).await;
                text
            })
        });

        info!(
            path = %path.display(),
            width,
            height,
            "ffmpeg decoder started"
        );

        Ok(Self {
            tool: ffmpeg_bin.to_string(),
            child,
            stdout,
            stderr,
            width,
            height,
            next_seq: 0,
            exhausted: false,
        })
    }

    /// Reap the decoder after its stdout closed. A non-zero exit is a decode failure.
    async fn finish(&mut self) -> Result<(), MediaError> {
        let status = self.child.wait().await.map_err(|e| MediaError::wait(&self.tool, e))?;
        let stderr = match self.stderr.take() {
            Some(handle) => handle.await.unwrap_or_default(),
            None => String::new(),
        };
        if !status.success() {
            return Err(MediaError::failed(&self.tool, stderr.as_bytes()));
        }
        debug!(frames = self.next_seq, "ffmpeg decoder finished");
        Ok(())
    }
}

impl FrameSource for FfmpegSource {
    async fn next_frame(&mut self) -> Result<Option<SourceFrame>, MediaError> {
        if self.exhausted {
            return Ok(None);
        }
        let mut buf = vec![0u8; rgb24_frame_len(self.width, self.height)];
        let filled = read_full(&mut self.stdout, &mut buf)
            .await
            .map_err(|e| MediaError::Read(e.to_string()))?;

        if filled < buf.len() {
            self.exhausted = true;
            if filled > 0 {
                warn!(
                    bytes = filled,
                    expected = buf.len(),
                    "decoder output ended mid-frame, dropping partial frame"
                );
            }
            self.finish().await?;
            return Ok(None);
        }

        let frame = SourceFrame::from_rgb24(self.width, self.height, buf, self.next_seq)
            .map_err(|e| MediaError::Read(e.to_string()))?;
        self.next_seq += 1;
        Ok(Some(frame))
    }
}

pub fn decode_args(path: &Path, width: u32, height: u32) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-v", "error", "-nostdin", "-i"].map(OsString::from).to_vec();
    args.push(path.into());
    args.extend(["-map", "0:v:0", "-vf"].map(OsString::from));
    args.push(format!("scale={width}:{height}").into());
    args.extend(["-f", "rawvideo", "-pix_fmt", "rgb24", "pipe:1"].map(OsString::from));
    args
}

/// Like `read_exact`, but reports how much was read before EOF instead of
/// failing, so a clean end of stream can be told apart from a torn frame.
pub async fn read_full<R: AsyncRead + Unpin>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn read_full_fills_across_short_reads() {
        let (mut tx, mut rx) = tokio::io::duplex(4);
        let writer = tokio::spawn(async move {
            use tokio::io::AsyncWriteExt;
            tx.write_all(&[1, 2, 3, 4, 5, 6, 7, 8, 9]).await.unwrap();
        });
        let mut buf = [0u8; 6];
        assert_eq!(read_full(&mut rx, &mut buf).await.unwrap(), 6);
        assert_eq!(buf, [1, 2, 3, 4, 5, 6]);
        let mut rest = [0u8; 6];
        writer.await.unwrap();
        assert_eq!(read_full(&mut rx, &mut rest).await.unwrap(), 3);
        assert_eq!(&rest[..3], &[7, 8, 9]);
    }

    #[test]
    fn decoder_scales_to_requested_size() {
        let args = decode_args(Path::new("clips/portrait.mp4"), 800, 600);
        let args: Vec<&str> = args.iter().map(|a| a.to_str().unwrap()).collect();
        assert!(args.windows(2).any(|w| w == ["-vf", "scale=800:600"]));
        assert!(args.windows(2).any(|w| w == ["-pix_fmt", "rgb24"]));
        assert_eq!(args[4], "clips/portrait.mp4");
        assert_eq!(*args.last().unwrap(), "pipe:1");
    }

    #[tokio::test]
    async fn decoder_exit_failure_is_an_error_at_end_of_stream() {
        // `false` writes nothing and exits 1
        let mut source = FfmpegSource::open("false", Path::new("missing.mp4"), 4, 2).unwrap();
        let err = source.next_frame().await.unwrap_err();
        assert!(matches!(err, MediaError::FfmpegFailed { ref tool, .. } if tool == "false"));
        // the stream stays exhausted afterwards
        assert!(source.next_frame().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_decoder_binary_fails_to_spawn() {
        let err = FfmpegSource::open("/nonexistent/ffmpeg", Path::new("a.mp4"), 4, 2).err().unwrap();
        assert!(matches!(err, MediaError::Spawn { .. }));
    }

    #[tokio::test]
    async fn read_full_reports_clean_eof() {
        let mut empty: &[u8] = &[];
        let mut buf = [0u8; 12];
        assert_eq!(read_full(&mut empty, &mut buf).await.unwrap(), 0);
    }
}
