use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

/// Temp files for one run: the silent encoded video and the extracted audio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntermediatePaths {
    pub video: PathBuf,
    pub audio: PathBuf,
}

fn stem(now: DateTime<Utc>, pid: u32) -> String {
    format!("blobfx_{}_{pid}", now.format("%Y%m%dT%H%M%S%3fZ"))
}

impl IntermediatePaths {
    /// e.g. "/tmp/blobfx_20260218T093000000Z_4242_video.mp4"
    pub fn new(dir: &Path, now: DateTime<Utc>, pid: u32) -> Self {
        let stem = stem(now, pid);
        Self {
            video: dir.join(format!("{stem}_video.mp4")),
            audio: dir.join(format!("{stem}_audio.mka")),
        }
    }

    pub fn in_temp_dir() -> Self {
        Self::new(&std::env::temp_dir(), Utc::now(), std::process::id())
    }

    /// Delete whichever intermediates exist. Failures are logged, not returned.
    pub async fn remove(&self) {
        for path in [&self.video, &self.audio] {
            match tokio::fs::remove_file(path).await {
                Ok(()) => debug!(path = %path.display(), "removed intermediate file"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "failed to delete intermediate file"),
            }
        }
    }
}
