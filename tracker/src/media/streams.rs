use std::path::Path;

use tokio::process::Command;
use tracing::debug;

use super::MediaError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamInfo {
    pub width: u32,
    pub height: u32,
    pub has_audio: bool,
}

/// Ask ffprobe for the first video stream's size and whether any audio stream exists.
pub async fn read_stream_info(ffprobe_bin: &str, path: &Path) -> Result<StreamInfo, MediaError> {
    let output = Command::new(ffprobe_bin)
        .args(["-v", "error", "-show_entries", "stream=codec_type,width,height", "-of", "compact=p=0"])
        .arg(path)
        .output()
        .await
        .map_err(|e| MediaError::spawn(ffprobe_bin, e))?;

    if !output.status.success() {
        return Err(MediaError::failed(ffprobe_bin, &output.stderr));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let info = parse_stream_info(&stdout).map_err(|reason| MediaError::StreamInfo {
        path: path.display().to_string(),
        reason,
    })?;
    debug!(
        path = %path.display(),
        width = info.width,
        height = info.height,
        has_audio = info.has_audio,
        "read source stream info"
    );
    Ok(info)
}

/// Parse `compact=p=0` output, one stream per line:
///
/// ```text
/// codec_type=video|width=1920|height=1080
/// codec_type=audio
/// ```
pub fn parse_stream_info(text: &str) -> Result<StreamInfo, String> {
    let mut video = None;
    let mut has_audio = false;

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let mut codec_type = None;
        let mut width = None;
        let mut height = None;
        for field in line.split('|') {
            match field.split_once('=') {
                Some(("codec_type", v)) => codec_type = Some(v),
                Some(("width", v)) => width = v.parse::<u32>().ok(),
                Some(("height", v)) => height = v.parse::<u32>().ok(),
                _ => {}
            }
        }
        match codec_type {
            Some("audio") => has_audio = true,
            Some("video") if video.is_none() => match (width, height) {
                (Some(w), Some(h)) if w > 0 && h > 0 => video = Some((w, h)),
                _ => return Err(format!("video stream without usable dimensions: {line}")),
            },
            _ => {}
        }
    }

    let (width, height) = video.ok_or_else(|| "no video stream found".to_string())?;
    Ok(StreamInfo {
        width,
        height,
        has_audio,
    })
}
