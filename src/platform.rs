use serde::Deserialize;

use crate::config::VideoSize;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Platform {
    Desktop,
    Mobile,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformSetting {
    #[default]
    Auto,
    Desktop,
    Mobile,
}

impl PlatformSetting {
    pub fn resolve(self) -> Platform {
        match self {
            PlatformSetting::Auto => Platform::detect(),
            PlatformSetting::Desktop => Platform::Desktop,
            PlatformSetting::Mobile => Platform::Mobile,
        }
    }
}

impl Platform {
    pub fn detect() -> Self {
        if cfg!(any(target_os = "android", target_os = "ios")) {
            Platform::Mobile
        } else {
            Platform::Desktop
        }
    }

    pub fn profile(&self) -> PlatformProfile {
        match self {
            Platform::Desktop => PlatformProfile {
                earring_threshold: 8.0,
                neck_threshold: 6.0,
                ear_offset_y: 16.0,
                forced_video_size: None,
            },
            Platform::Mobile => PlatformProfile {
                earring_threshold: 4.0,
                neck_threshold: 4.0,
                ear_offset_y: 12.0,
                forced_video_size: Some(VideoSize::Small),
            },
        }
    }
}

/// Empirical per-platform constants for overlay placement and capture.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlatformProfile {
    /// Minimum ear movement (px) before a cached earring anchor moves.
    pub earring_threshold: f32,
    /// Minimum shoulder-midpoint movement (px) before the necklace anchor moves.
    pub neck_threshold: f32,
    /// Vertical drop from the ear keypoint to the earring hook.
    pub ear_offset_y: f32,
    pub forced_video_size: Option<VideoSize>,
}
