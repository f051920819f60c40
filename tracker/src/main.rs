mod effects;
mod error;
mod media;
mod overlay;
mod pipeline;
mod vision;

use std::path::PathBuf;

use blobfx_common::config::Config;
use effects::font::LabelFont;
use error::PipelineError;
use media::encoder::FfmpegEncoder;
use media::paths::IntermediatePaths;
use media::source::FfmpegSource;
use media::streams::read_stream_info;
use media::traits::MediaTranscoder;
use media::transcode::FfmpegTranscoder;
use overlay::OverlaySet;
use pipeline::pacer::Pacer;
use pipeline::{run_frame_loop, CancelFlag, FrameProcessor};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{error, info, warn};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    let config = match Config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {e}", config_path.display());
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.parse().unwrap_or_default()),
        )
        .init();

    info!(
        video = %config.input.video_path.display(),
        overlays = %config.input.overlay_dir.display(),
        output = %config.output_path().display(),
        fps = config.render.target_fps,
        width = config.render.width,
        height = config.render.height,
        "starting blobfx tracker"
    );

    // Warn early; every media step below needs ffmpeg.
    media::check_ffmpeg_available(&config.ffmpeg.ffmpeg_bin).await;

    let paths = IntermediatePaths::in_temp_dir();
    match run(&config, &paths).await {
        Ok(output) => {
            if config.output.keep_intermediates {
                info!(video = %paths.video.display(), audio = %paths.audio.display(), "keeping intermediate files");
            } else {
                paths.remove().await;
            }
            info!(output = %output.display(), "exported video");
        }
        Err(e) => {
            error!(error = %e, "run failed");
            warn!(
                video = %paths.video.display(),
                audio = %paths.audio.display(),
                "intermediate files may be left on disk"
            );
            std::process::exit(1);
        }
    }
}

/// Extract audio, render every frame into the intermediate video, then mux.
async fn run(config: &Config, paths: &IntermediatePaths) -> Result<PathBuf, PipelineError> {
    let ffmpeg = &config.ffmpeg;
    let video_path = &config.input.video_path;

    let overlays = OverlaySet::load(
        &config.input.overlay_dir,
        config.input.overlay_count,
        config.render.decal_size,
    );
    let label_font = LabelFont::load(&config.effects.label_font, config.effects.label_scale);

    let streams = read_stream_info(&ffmpeg.ffprobe_bin, video_path).await?;
    info!(
        width = streams.width,
        height = streams.height,
        has_audio = streams.has_audio,
        "source streams read"
    );

    let transcoder = FfmpegTranscoder::new(&ffmpeg.ffmpeg_bin, paths.audio.clone());
    let audio = transcoder.extract_audio(video_path, streams.has_audio).await?;

    // Decode straight to the working resolution.
    let mut source = FfmpegSource::open(
        &ffmpeg.ffmpeg_bin,
        video_path,
        config.render.width,
        config.render.height,
    )?;
    let mut encoder = FfmpegEncoder::start(
        &ffmpeg.ffmpeg_bin,
        &paths.video,
        config.render.width,
        config.render.height,
        config.render.target_fps,
    )?;

    let cancel = CancelFlag::default();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping after the current frame");
            on_interrupt.cancel();
        }
    });

    let mut processor = FrameProcessor::new(config, &overlays, label_font.as_ref());
    let mut pacer = Pacer::new(config.render.frame_interval());
    let mut rng = StdRng::from_entropy();

    let summary = run_frame_loop(
        &mut processor,
        &mut source,
        &mut encoder,
        &mut pacer,
        &cancel,
        &mut rng,
    )
    .await?;
    if summary.cancelled {
        info!(frames_written = summary.frames_written, "run cancelled, muxing what was rendered");
    }

    let silent_video = encoder.finish().await?;
    let output = transcoder
        .mux(&silent_video, audio.as_ref(), &config.output_path())
        .await?;
    Ok(output.path)
}
