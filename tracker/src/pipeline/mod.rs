pub mod pacer;
pub mod state;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use blobfx_common::config::Config;
use blobfx_common::frame::{BlobPosition, Frame};
use image::RgbImage;
use rand::Rng;
use tracing::{debug, info};

use crate::effects::font::LabelFont;
use crate::effects::{CompositeReport, Compositor};
use crate::error::PipelineError;
use crate::media::traits::{FrameSink, FrameSource};
use crate::overlay::OverlaySet;
use crate::vision::blobs::{BlobDetector, BlobParams};
use crate::vision::motion::MotionMaskBuilder;
use crate::vision::preprocess::Preprocessor;
use pacer::Pacer;
use state::{LoopEvent, LoopState, StopReason};

/// Shared stop request. Set from the signal handler, read by the loop once
/// per iteration.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub frames_read: u64,
    pub frames_written: u64,
    pub blobs_detected: u64,
    pub decals_placed: u64,
    pub cancelled: bool,
}

/// A composited frame ready for the encoder.
#[derive(Debug)]
pub struct ProcessedFrame {
    pub frame: Frame,
    pub positions: Vec<BlobPosition>,
    pub report: CompositeReport,
}

/// The synchronous part of one iteration: preprocess, mask, detect, composite.
pub struct FrameProcessor<'a> {
    preprocessor: Preprocessor,
    motion: MotionMaskBuilder,
    detector: BlobDetector,
    compositor: Compositor<'a>,
}

impl<'a> FrameProcessor<'a> {
    pub fn new(config: &Config, overlays: &'a OverlaySet, label_font: Option<&'a LabelFont>) -> Self {
        let render = &config.render;
        let detection = &config.detection;
        Self {
            preprocessor: Preprocessor::new(render.width, render.height, detection.blur_kernel),
            motion: MotionMaskBuilder::new(detection.diff_threshold, detection.morph_kernel),
            detector: BlobDetector::new(BlobParams::from(detection)),
            compositor: Compositor::new(&config.effects, overlays, label_font),
        }
    }

    /// `None` while the motion history is being seeded; such frames are
    /// neither composited nor encoded.
    pub fn process<R: Rng + ?Sized>(&mut self, raw: &RgbImage, rng: &mut R) -> Option<ProcessedFrame> {
        let (mut frame, preprocessed) = self.preprocessor.process(raw);
        let mask = self.motion.push(preprocessed)?;
        let positions = self.detector.detect(&mask);
        let report = self.compositor.composite(&mut frame, &positions, rng);
        Some(ProcessedFrame {
            frame,
            positions,
            report,
        })
    }
}

/// Drive frames from `source` through `processor` into `sink` at the pacer's
/// rate until the source runs dry or `cancel` is set.
///
/// Cancellation is checked at the end of each iteration, never mid-frame.
/// Any source or sink error aborts the loop.
pub async fn run_frame_loop<S, K, R>(
    processor: &mut FrameProcessor<'_>,
    source: &mut S,
    sink: &mut K,
    pacer: &mut Pacer,
    cancel: &CancelFlag,
    rng: &mut R,
) -> Result<RunSummary, PipelineError>
where
    S: FrameSource,
    K: FrameSink,
    R: Rng + ?Sized,
{
    let mut state = LoopState::Init;
    let mut summary = RunSummary::default();
    info!(period_ms = pacer.period().as_secs_f64() * 1000.0, "frame loop starting");

    while !state.is_done() {
        pacer.wait().await;

        let Some(source_frame) = source.next_frame().await? else {
            state = state.advance(LoopEvent::Stop(StopReason::SourceExhausted));
            continue;
        };
        summary.frames_read += 1;

        let processed = processor.process(&source_frame.image, rng);
        state = state.advance(LoopEvent::Frame {
            mask: processed.is_some(),
        });

        if let Some(p) = processed {
            sink.write_frame(&p.frame).await?;
            summary.frames_written += 1;
            summary.blobs_detected += p.positions.len() as u64;
            if p.report.decal.is_some() {
                summary.decals_placed += 1;
            }
            debug!(
                seq = source_frame.seq,
                blobs = p.positions.len(),
                lines = p.report.lines_drawn,
                boxes = p.report.boxes_drawn,
                glitched_bands = p.report.glitched_bands,
                decal = p.report.decal.is_some(),
                "frame processed"
            );
        }

        if cancel.is_cancelled() {
            summary.cancelled = true;
            state = state.advance(LoopEvent::Stop(StopReason::Cancelled));
        }
    }

    info!(
        frames_read = summary.frames_read,
        frames_written = summary.frames_written,
        blobs_detected = summary.blobs_detected,
        decals_placed = summary.decals_placed,
        cancelled = summary.cancelled,
        sink_frames = sink.frames_written(),
        "frame loop done"
    );
    Ok(summary)
}
