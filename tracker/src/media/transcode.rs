use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tokio::process::Command;
use tracing::{debug, info};

use super::traits::{AudioHandle, MediaTranscoder, OutputHandle};
use super::MediaError;

/// Audio extraction and remux through the ffmpeg command-line tools.
pub struct FfmpegTranscoder {
    ffmpeg_bin: String,
    /// Where the extracted audio track is written.
    audio_path: PathBuf,
}

impl FfmpegTranscoder {
    pub fn new(ffmpeg_bin: &str, audio_path: PathBuf) -> Self {
        Self {
            ffmpeg_bin: ffmpeg_bin.to_string(),
            audio_path,
        }
    }

    async fn run(&self, args: Vec<OsString>) -> Result<(), MediaError> {
        debug!(bin = %self.ffmpeg_bin, ?args, "running ffmpeg");
        let output = Command::new(&self.ffmpeg_bin)
            .args(&args)
            .output()
            .await
            .map_err(|e| MediaError::spawn(&self.ffmpeg_bin, e))?;
        if !output.status.success() {
            return Err(MediaError::failed(&self.ffmpeg_bin, &output.stderr));
        }
        Ok(())
    }
}

/// Stream-copy the first audio track into a Matroska audio file, which
/// accepts any codec the source carries.
pub fn extract_audio_args(source: &Path, dest: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-v", "error", "-nostdin", "-i"].map(OsString::from).to_vec();
    args.push(source.into());
    args.extend(["-vn", "-map", "0:a:0", "-c:a", "copy", "-y"].map(OsString::from));
    args.push(dest.into());
    args
}

/// Copy the video stream untouched and re-encode audio to AAC.
pub fn mux_args(video: &Path, audio: &Path, output: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-v", "error", "-nostdin", "-i"].map(OsString::from).to_vec();
    args.push(video.into());
    args.push("-i".into());
    args.push(audio.into());
    args.extend(
        ["-map", "0:v:0", "-map", "1:a:0", "-c:v", "copy", "-c:a", "aac", "-y"].map(OsString::from),
    );
    args.push(output.into());
    args
}

async fn ensure_parent(path: &Path) -> Result<(), MediaError> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            tokio::fs::create_dir_all(dir).await.map_err(|e| MediaError::Fs {
                path: dir.display().to_string(),
                reason: e.to_string(),
            })
        }
        _ => Ok(()),
    }
}

/// Move `from` to `to`, falling back to copy + delete across filesystems.
pub async fn move_file(from: &Path, to: &Path) -> Result<(), MediaError> {
    if tokio::fs::rename(from, to).await.is_ok() {
        return Ok(());
    }
    let fs_err = |e: std::io::Error| MediaError::Fs {
        path: from.display().to_string(),
        reason: e.to_string(),
    };
    tokio::fs::copy(from, to).await.map_err(fs_err)?;
    tokio::fs::remove_file(from).await.map_err(fs_err)?;
    Ok(())
}

impl MediaTranscoder for FfmpegTranscoder {
    async fn extract_audio(&self, source: &Path, has_audio: bool) -> Result<Option<AudioHandle>, MediaError> {
        if !has_audio {
            info!(source = %source.display(), "source has no audio stream, output will be silent");
            return Ok(None);
        }
        self.run(extract_audio_args(source, &self.audio_path)).await?;
        info!(audio = %self.audio_path.display(), "extracted source audio");
        Ok(Some(AudioHandle {
            path: self.audio_path.clone(),
        }))
    }

    async fn mux(&self, video: &Path, audio: Option<&AudioHandle>, output: &Path) -> Result<OutputHandle, MediaError> {
        ensure_parent(output).await?;
        match audio {
            Some(audio) => self.run(mux_args(video, &audio.path, output)).await?,
            None => move_file(video, output).await?,
        }
        info!(output = %output.display(), with_audio = audio.is_some(), "final video written");
        Ok(OutputHandle {
            path: output.to_path_buf(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strs(args: &[OsString]) -> Vec<&str> {
        args.iter().map(|a| a.to_str().unwrap()).collect()
    }

    #[test]
    fn extract_copies_audio_only() {
        let args = extract_audio_args(Path::new("in/a.mp4"), Path::new("/tmp/a.mka"));
        let args = strs(&args);
        assert_eq!(args[4], "in/a.mp4");
        assert!(args.windows(2).any(|w| w == ["-c:a", "copy"]));
        assert!(args.contains(&"-vn"));
        assert_eq!(*args.last().unwrap(), "/tmp/a.mka");
    }

    #[test]
    fn mux_copies_video_and_encodes_aac() {
        let args = mux_args(Path::new("v.mp4"), Path::new("a.mka"), Path::new("out/final.mp4"));
        let args = strs(&args);
        assert!(args.windows(2).any(|w| w == ["-c:v", "copy"]));
        assert!(args.windows(2).any(|w| w == ["-c:a", "aac"]));
        assert!(args.windows(2).any(|w| w == ["-i", "v.mp4"]));
        assert!(args.windows(2).any(|w| w == ["-i", "a.mka"]));
        assert_eq!(*args.last().unwrap(), "out/final.mp4");
    }

    #[tokio::test]
    async fn silent_mux_moves_video_into_place() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("silent.mp4");
        tokio::fs::write(&video, b"fake video").await.unwrap();
        let output = dir.path().join("nested/out/final.mp4");

        let transcoder = FfmpegTranscoder::new("ffmpeg", dir.path().join("a.mka"));
        let handle = transcoder.mux(&video, None, &output).await.unwrap();

        assert_eq!(handle.path, output);
        assert!(!video.exists());
        assert_eq!(tokio::fs::read(&output).await.unwrap(), b"fake video");
    }

    #[tokio::test]
    async fn failing_mux_is_ffmpeg_failed() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("silent.mp4");
        let audio = AudioHandle {
            path: dir.path().join("a.mka"),
        };
        let transcoder = FfmpegTranscoder::new("false", audio.path.clone());
        let err = transcoder
            .mux(&video, Some(&audio), &dir.path().join("out.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::FfmpegFailed { ref tool, .. } if tool == "false"));
    }

    #[tokio::test]
    async fn silent_source_skips_extraction() {
        let dir = tempfile::tempdir().unwrap();
        // would fail if it were run
        let transcoder = FfmpegTranscoder::new("false", dir.path().join("a.mka"));
        let audio = transcoder.extract_audio(Path::new("in.mp4"), false).await.unwrap();
        assert!(audio.is_none());

        let err = transcoder.extract_audio(Path::new("in.mp4"), true).await.unwrap_err();
        assert!(matches!(err, MediaError::FfmpegFailed { .. }));
    }
}
