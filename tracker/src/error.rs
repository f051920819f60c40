use crate::media::MediaError;

/// Anything that aborts a run once configuration is loaded.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Media(#[from] MediaError),
}
