use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use clap::Parser;
use serde::Deserialize;

use crate::{error::ConfigError, platform::PlatformSetting, topology::PoseModel};

#[derive(Parser, Debug, Default)]
#[command(name = "pose-tryon", about = "Live pose overlays and accessory try-on")]
pub struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Camera device index
    #[arg(long)]
    pub camera: Option<u32>,
    #[arg(long)]
    pub fps: Option<u32>,
    /// Capture size preset, e.g. 640x480
    #[arg(long, value_parser = parse_video_size)]
    pub size: Option<VideoSize>,
    /// movenet, posenet or blazepose
    #[arg(long, value_parser = parse_pose_model)]
    pub model: Option<PoseModel>,
    #[arg(long)]
    pub model_path: Option<PathBuf>,
    #[arg(long)]
    pub score_threshold: Option<f32>,
    #[arg(long)]
    pub tracking: bool,
    #[arg(long = "render-3d")]
    pub render_3d: bool,
    #[arg(long)]
    pub skeleton: bool,
    #[arg(long)]
    pub no_accessories: bool,
    #[arg(long)]
    pub mobile: bool,
}

#[derive(Debug, Default, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub render: RenderConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CameraConfig {
    #[serde(default)]
    pub device_index: u32,
    #[serde(default = "default_target_fps")]
    pub target_fps: u32,
    #[serde(default)]
    pub size: VideoSize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    #[serde(default)]
    pub model: PoseModel,
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,
    /// Falls back to the model's own default when unset.
    #[serde(default)]
    pub score_threshold: Option<f32>,
    #[serde(default)]
    pub enable_tracking: bool,
    #[serde(default)]
    pub render_3d: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RenderConfig {
    #[serde(default)]
    pub show_skeleton: bool,
    #[serde(default = "default_true")]
    pub show_accessories: bool,
    #[serde(default)]
    pub earring_image: Option<PathBuf>,
    #[serde(default)]
    pub necklace_image: Option<PathBuf>,
    #[serde(default)]
    pub platform: PlatformSetting,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
pub enum VideoSize {
    #[default]
    #[serde(rename = "640 X 480")]
    Large,
    #[serde(rename = "640 X 360")]
    Wide,
    #[serde(rename = "360 X 270")]
    Small,
}

impl VideoSize {
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            VideoSize::Large => (640, 480),
            VideoSize::Wide => (640, 360),
            VideoSize::Small => (360, 270),
        }
    }
}

impl FromStr for VideoSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "640x480" => Ok(VideoSize::Large),
            "640x360" => Ok(VideoSize::Wide),
            "360x270" => Ok(VideoSize::Small),
            _ => Err(format!(
                "unknown size preset '{s}' (expected 640x480, 640x360 or 360x270)"
            )),
        }
    }
}

fn parse_video_size(value: &str) -> Result<VideoSize, String> {
    value.parse()
}

fn parse_pose_model(value: &str) -> Result<PoseModel, String> {
    PoseModel::parse(value).ok_or_else(|| format!("unknown pose model '{value}'"))
}

fn default_target_fps() -> u32 { 60 }
fn default_model_path() -> PathBuf { PathBuf::from("models").join("movenet_multipose_lightning.onnx") }
fn default_true() -> bool { true }

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device_index: 0,
            target_fps: default_target_fps(),
            size: VideoSize::default(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: PoseModel::default(),
            model_path: default_model_path(),
            score_threshold: None,
            enable_tracking: false,
            render_3d: false,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            show_skeleton: false,
            show_accessories: default_true(),
            earring_image: None,
            necklace_image: None,
            platform: PlatformSetting::default(),
        }
    }
}

impl ModelConfig {
    pub fn effective_score_threshold(&self) -> f32 {
        self.score_threshold
            .unwrap_or_else(|| self.model.default_score_threshold())
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Loads the file named by `--config` (if any) and applies the remaining flags on top.
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let mut config = match &cli.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_cli(cli);
        config.validate()?;
        Ok(config)
    }

    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(index) = cli.camera {
            self.camera.device_index = index;
        }
        if let Some(fps) = cli.fps {
            self.camera.target_fps = fps;
        }
        if let Some(size) = cli.size {
            self.camera.size = size;
        }
        if let Some(model) = cli.model {
            self.model.model = model;
        }
        if let Some(path) = &cli.model_path {
            self.model.model_path = path.clone();
        }
        if let Some(threshold) = cli.score_threshold {
            self.model.score_threshold = Some(threshold);
        }
        self.model.enable_tracking |= cli.tracking;
        self.model.render_3d |= cli.render_3d;
        self.render.show_skeleton |= cli.skeleton;
        if cli.no_accessories {
            self.render.show_accessories = false;
        }
        if cli.mobile {
            self.render.platform = PlatformSetting::Mobile;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.camera.target_fps == 0 {
            return Err(ConfigError::Invalid("camera.target_fps must be positive".into()));
        }
        if let Some(threshold) = self.model.score_threshold {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(ConfigError::Invalid(format!(
                    "model.score_threshold must be within 0..=1, got {threshold}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.camera.target_fps, 60);
        assert_eq!(config.camera.size, VideoSize::Large);
        assert_eq!(config.model.model, PoseModel::MoveNet);
        assert!((config.model.effective_score_threshold() - 0.3).abs() < 1e-6);
        assert!(config.render.show_accessories);
        assert!(!config.render.show_skeleton);
    }

    #[test]
    fn test_parse_partial_toml() {
        let config = Config::parse(
            r#"
            [camera]
            size = "360 X 270"

            [model]
            model = "blazepose"
            enable_tracking = true
            render_3d = true

            [render]
            platform = "mobile"
            "#,
        )
        .unwrap();
        assert_eq!(config.camera.size, VideoSize::Small);
        assert_eq!(config.camera.target_fps, 60);
        assert_eq!(config.model.model, PoseModel::BlazePose);
        assert!((config.model.effective_score_threshold() - 0.65).abs() < 1e-6);
        assert!(config.model.enable_tracking);
        assert!(config.model.render_3d);
        assert_eq!(config.render.platform, PlatformSetting::Mobile);
    }

    #[test]
    fn test_unknown_size_preset_is_rejected() {
        assert!(Config::parse("[camera]\nsize = \"1920 X 1080\"").is_err());
    }

    #[test]
    fn test_video_size_from_str() {
        assert_eq!("640x360".parse::<VideoSize>(), Ok(VideoSize::Wide));
        assert_eq!("640 X 480".parse::<VideoSize>(), Ok(VideoSize::Large));
        assert!("800x600".parse::<VideoSize>().is_err());
    }

    #[test]
    fn test_cli_overrides_file_values() {
        let mut config = Config::parse("[model]\nscore_threshold = 0.4").unwrap();
        let cli = Cli {
            score_threshold: Some(0.2),
            skeleton: true,
            no_accessories: true,
            mobile: true,
            ..Cli::default()
        };
        config.apply_cli(&cli);
        assert_eq!(config.model.score_threshold, Some(0.2));
        assert!(config.render.show_skeleton);
        assert!(!config.render.show_accessories);
        assert_eq!(config.render.platform, PlatformSetting::Mobile);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.model.score_threshold = Some(1.5);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = Config::default();
        config.camera.target_fps = 0;
        assert!(config.validate().is_err());
    }
}
