use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Upper bound on the numbered overlay images (`1.jpg` ..= `8.jpg`).
pub const MAX_OVERLAY_IMAGES: u32 = 8;

/// Largest blur or morphology kernel edge accepted.
pub const MAX_KERNEL: u32 = 255;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub effects: EffectsConfig,
    #[serde(default)]
    pub ffmpeg: FfmpegConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InputConfig {
    #[serde(default = "default_video_path")]
    pub video_path: PathBuf,
    #[serde(default = "default_overlay_dir")]
    pub overlay_dir: PathBuf,
    #[serde(default = "default_overlay_count")]
    pub overlay_count: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_output_file_name")]
    pub file_name: String,
    /// Leave the silent video and extracted audio on disk after a successful mux.
    #[serde(default)]
    pub keep_intermediates: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenderConfig {
    #[serde(default = "default_target_fps")]
    pub target_fps: f64,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    /// Edge length of the square decal images.
    #[serde(default = "default_decal_size")]
    pub decal_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DetectionConfig {
    #[serde(default = "default_diff_threshold")]
    pub diff_threshold: u8,
    #[serde(default = "default_blur_kernel")]
    pub blur_kernel: u32,
    #[serde(default = "default_morph_kernel")]
    pub morph_kernel: u32,
    #[serde(default = "default_min_area")]
    pub min_area: f64,
    #[serde(default = "default_max_area")]
    pub max_area: f64,
    #[serde(default = "default_min_circularity")]
    pub min_circularity: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EffectsConfig {
    #[serde(default = "default_glitch_probability")]
    pub glitch_probability: f64,
    #[serde(default = "default_glitch_band_height")]
    pub glitch_band_height: u32,
    #[serde(default = "default_glitch_band_stride")]
    pub glitch_band_stride: u32,
    #[serde(default = "default_glitch_max_shift")]
    pub glitch_max_shift: i32,
    /// Weight of the channel-shifted band when blended over the unshifted rows.
    #[serde(default = "default_glitch_opacity")]
    pub glitch_opacity: f32,
    /// Weight of the decal when blended over the frame.
    #[serde(default = "default_decal_opacity")]
    pub decal_opacity: f32,
    #[serde(default = "default_box_half_size")]
    pub box_half_size: i32,
    /// TrueType font for the `ID:<n>` box labels. Labels are skipped when it
    /// cannot be loaded.
    #[serde(default = "default_label_font")]
    pub label_font: PathBuf,
    /// Label glyph height in pixels.
    #[serde(default = "default_label_scale")]
    pub label_scale: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FfmpegConfig {
    #[serde(default = "default_ffmpeg_bin")]
    pub ffmpeg_bin: String,
    #[serde(default = "default_ffprobe_bin")]
    pub ffprobe_bin: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            video_path: default_video_path(),
            overlay_dir: default_overlay_dir(),
            overlay_count: default_overlay_count(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            file_name: default_output_file_name(),
            keep_intermediates: false,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            target_fps: default_target_fps(),
            width: default_width(),
            height: default_height(),
            decal_size: default_decal_size(),
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            diff_threshold: default_diff_threshold(),
            blur_kernel: default_blur_kernel(),
            morph_kernel: default_morph_kernel(),
            min_area: default_min_area(),
            max_area: default_max_area(),
            min_circularity: default_min_circularity(),
        }
    }
}

impl Default for EffectsConfig {
    fn default() -> Self {
        Self {
            glitch_probability: default_glitch_probability(),
            glitch_band_height: default_glitch_band_height(),
            glitch_band_stride: default_glitch_band_stride(),
            glitch_max_shift: default_glitch_max_shift(),
            glitch_opacity: default_glitch_opacity(),
            decal_opacity: default_decal_opacity(),
            box_half_size: default_box_half_size(),
            label_font: default_label_font(),
            label_scale: default_label_scale(),
        }
    }
}

impl Default for FfmpegConfig {
    fn default() -> Self {
        Self {
            ffmpeg_bin: default_ffmpeg_bin(),
            ffprobe_bin: default_ffprobe_bin(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFile(path.display().to_string(), e))?;
        let config = Self::parse(&content)?;
        debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let render = &self.render;
        if !(render.target_fps.is_finite() && render.target_fps > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "render.target_fps must be positive, got {}",
                render.target_fps
            )));
        }
        if render.width == 0 || render.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "render window must be non-empty, got {}x{}",
                render.width, render.height
            )));
        }
        // libx264 with yuv420p needs even frame dimensions.
        if render.width % 2 != 0 || render.height % 2 != 0 {
            return Err(ConfigError::Invalid(format!(
                "render window must have even dimensions, got {}x{}",
                render.width, render.height
            )));
        }
        if render.decal_size == 0 {
            return Err(ConfigError::Invalid("render.decal_size must be non-zero".into()));
        }

        let detection = &self.detection;
        for (name, k) in [
            ("detection.blur_kernel", detection.blur_kernel),
            ("detection.morph_kernel", detection.morph_kernel),
        ] {
            if k == 0 || k % 2 == 0 || k > MAX_KERNEL {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be an odd number in 1..={MAX_KERNEL}, got {k}"
                )));
            }
        }
        if detection.min_area > detection.max_area {
            return Err(ConfigError::Invalid(format!(
                "detection.min_area ({}) exceeds detection.max_area ({})",
                detection.min_area, detection.max_area
            )));
        }

        let effects = &self.effects;
        if !(0.0..=1.0).contains(&effects.glitch_probability) {
            return Err(ConfigError::Invalid(format!(
                "effects.glitch_probability must be within [0, 1], got {}",
                effects.glitch_probability
            )));
        }
        for (name, v) in [
            ("effects.glitch_opacity", effects.glitch_opacity),
            ("effects.decal_opacity", effects.decal_opacity),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be within [0, 1], got {v}"
                )));
            }
        }
        if effects.glitch_band_stride == 0 {
            return Err(ConfigError::Invalid(
                "effects.glitch_band_stride must be non-zero".into(),
            ));
        }
        if effects.box_half_size < 0 {
            return Err(ConfigError::Invalid(format!(
                "effects.box_half_size must not be negative, got {}",
                effects.box_half_size
            )));
        }
        if !(effects.label_scale.is_finite() && effects.label_scale > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "effects.label_scale must be positive, got {}",
                effects.label_scale
            )));
        }
        if effects.glitch_max_shift < 0 {
            return Err(ConfigError::Invalid(format!(
                "effects.glitch_max_shift must not be negative, got {}",
                effects.glitch_max_shift
            )));
        }

        if self.input.overlay_count > MAX_OVERLAY_IMAGES {
            return Err(ConfigError::Invalid(format!(
                "input.overlay_count must be at most {MAX_OVERLAY_IMAGES}, got {}",
                self.input.overlay_count
            )));
        }
        Ok(())
    }

    /// Final deliverable path: `output.dir/output.file_name`.
    pub fn output_path(&self) -> PathBuf {
        self.output.dir.join(&self.output.file_name)
    }
}

impl RenderConfig {
    /// Minimum spacing between two accepted frames.
    pub fn frame_interval(&self) -> Duration {
        Duration::try_from_secs_f64(1.0 / self.target_fps).unwrap_or(Duration::MAX)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    ReadFile(String, std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

// Default value functions
fn default_video_path() -> PathBuf {
    PathBuf::from("input/test1.mp4")
}
fn default_overlay_dir() -> PathBuf {
    PathBuf::from("img_e")
}
fn default_overlay_count() -> u32 {
    MAX_OVERLAY_IMAGES
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}
fn default_output_file_name() -> String {
    "output_with_audio.mp4".into()
}
fn default_target_fps() -> f64 {
    30.0
}
fn default_width() -> u32 {
    800
}
fn default_height() -> u32 {
    600
}
fn default_decal_size() -> u32 {
    70
}
fn default_diff_threshold() -> u8 {
    20
}
fn default_blur_kernel() -> u32 {
    9
}
fn default_morph_kernel() -> u32 {
    7
}
fn default_min_area() -> f64 {
    70.0
}
fn default_max_area() -> f64 {
    3000.0
}
fn default_min_circularity() -> f64 {
    0.4
}
fn default_glitch_probability() -> f64 {
    0.07
}
fn default_glitch_band_height() -> u32 {
    10
}
fn default_glitch_band_stride() -> u32 {
    20
}
fn default_glitch_max_shift() -> i32 {
    15
}
fn default_glitch_opacity() -> f32 {
    0.3
}
fn default_decal_opacity() -> f32 {
    0.7
}
fn default_box_half_size() -> i32 {
    10
}
fn default_label_font() -> PathBuf {
    PathBuf::from("/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf")
}
fn default_label_scale() -> f32 {
    16.0
}
fn default_ffmpeg_bin() -> String {
    "ffmpeg".into()
}
fn default_ffprobe_bin() -> String {
    "ffprobe".into()
}
fn default_log_level() -> String {
    "info".into()
}
