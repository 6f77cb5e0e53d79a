use std::time::Instant;

#[derive(Clone, Debug)]
pub struct Frame {
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub timestamp: Instant,
}

impl Frame {
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            rgba: vec![0u8; width as usize * height as usize * 4],
            width,
            height,
            timestamp: Instant::now(),
        }
    }
}

/// A named body landmark in frame pixel coordinates.
///
/// `score` is `None` when the model does not report confidence; such points
/// are treated as fully confident.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    pub z: Option<f32>,
    pub score: Option<f32>,
    pub name: Option<String>,
}

impl Keypoint {
    pub fn new(x: f32, y: f32, score: Option<f32>) -> Self {
        Self {
            x,
            y,
            z: None,
            score,
            name: None,
        }
    }

    pub fn named(name: &str, x: f32, y: f32, score: Option<f32>) -> Self {
        Self {
            name: Some(name.to_string()),
            ..Self::new(x, y, score)
        }
    }

    #[cfg(test)]
    pub fn with_z(mut self, z: f32) -> Self {
        self.z = Some(z);
        self
    }

    pub fn effective_score(&self) -> f32 {
        self.score.unwrap_or(1.0)
    }

    pub fn is_visible(&self, threshold: f32) -> bool {
        self.effective_score() >= threshold
    }

    pub fn distance(&self, other: &Keypoint) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Copy of this keypoint shifted by `(dx, dy)`.
    pub fn with_offset(&self, dx: f32, dy: f32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..self.clone()
        }
    }

    pub fn position(&self) -> (f32, f32) {
        (self.x, self.y)
    }
}

/// All keypoints detected for one body in one frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Pose {
    pub keypoints: Vec<Keypoint>,
    pub keypoints_3d: Option<Vec<Keypoint>>,
    pub id: Option<u32>,
    pub score: Option<f32>,
}

impl Pose {
    pub fn new(keypoints: Vec<Keypoint>) -> Self {
        Self {
            keypoints,
            ..Self::default()
        }
    }

    #[cfg(test)]
    pub fn with_id(mut self, id: u32) -> Self {
        self.id = Some(id);
        self
    }

    /// Axis-aligned bounds `[x1, y1, x2, y2]` of the keypoints passing `threshold`.
    pub fn bounds(&self, threshold: f32) -> Option<[f32; 4]> {
        let mut visible = self.keypoints.iter().filter(|k| k.is_visible(threshold));
        let first = visible.next()?;
        let init = [first.x, first.y, first.x, first.y];
        Some(visible.fold(init, |acc, k| {
            [acc[0].min(k.x), acc[1].min(k.y), acc[2].max(k.x), acc[3].max(k.y)]
        }))
    }
}

/// Composited output of one frame-processing pass.
#[derive(Clone, Debug)]
pub struct RenderedFrame {
    pub frame: Frame,
    pub point_cloud: Option<Frame>,
    pub pose_count: usize,
}
