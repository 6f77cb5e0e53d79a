//! 3D keypoint point cloud.

use super::{Color, raster::Raster};
use crate::{
    topology::{KeypointSides, Side},
    types::{Frame, Keypoint},
};

/// Fixed points appended to every dataset so auto-fit scale and rotation
/// centre do not jump with the body.
pub const ANCHOR_POINTS: [[f32; 3]; 4] = [
    [0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0],
    [-1.0, 0.0, 0.0],
    [-1.0, -1.0, 0.0],
];

pub const CENTER_COLOR: Color = Color::rgb(0xff, 0x00, 0x00);
pub const LEFT_COLOR: Color = Color::rgb(0x00, 0xff, 0x00);
pub const RIGHT_COLOR: Color = Color::rgb(0xff, 0xa5, 0x00);
/// Same as the panel background, which hides a point.
pub const HIDDEN_COLOR: Color = Color::rgb(0xff, 0xff, 0xff);

const SEQUENCE_COLOR: Color = Color::rgb(0x9c, 0xa3, 0xaf);
const ROTATION_STEP: f32 = 0.01;
const POINT_RADIUS: f32 = 3.0;
const FIT_MARGIN: f32 = 0.8;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PointDataset {
    pub points: Vec<[f32; 3]>,
}

/// Rendering surface for a 3D point set.
pub trait PointCloudSink {
    fn render(&mut self, dataset: PointDataset);
    fn update_dataset(&mut self, dataset: PointDataset);
    fn set_point_colors(&mut self, colors: Vec<Color>);
    fn set_sequences(&mut self, sequences: &[(usize, usize)]);
}

/// Sign-flips every axis and appends [`ANCHOR_POINTS`].
pub fn build_dataset(keypoints: &[Keypoint]) -> PointDataset {
    let points = keypoints
        .iter()
        .map(|k| [-k.x, -k.y, -k.z.unwrap_or(0.0)])
        .chain(ANCHOR_POINTS)
        .collect();
    PointDataset { points }
}

pub fn point_color(
    index: usize,
    keypoints: &[Keypoint],
    sides: &KeypointSides,
    score_threshold: f32,
) -> Color {
    match keypoints.get(index) {
        Some(k) if k.is_visible(score_threshold) => match sides.side_of(index) {
            Some(Side::Left) => LEFT_COLOR,
            Some(Side::Right) => RIGHT_COLOR,
            Some(Side::Middle) | None => CENTER_COLOR,
        },
        _ => HIDDEN_COLOR,
    }
}

/// Orthographic, auto-fitted view of the point cloud, slowly spinning about
/// the vertical axis.
pub struct ScatterView {
    width: u32,
    height: u32,
    rotate_on_start: bool,
    yaw: f32,
    dataset: PointDataset,
    colors: Vec<Color>,
    sequences: Vec<(usize, usize)>,
    rendered: bool,
}

impl ScatterView {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            rotate_on_start: true,
            yaw: 0.0,
            dataset: PointDataset::default(),
            colors: Vec::new(),
            sequences: Vec::new(),
            rendered: false,
        }
    }

    #[cfg(test)]
    pub fn has_rendered(&self) -> bool {
        self.rendered
    }

    fn project(&self, point: &[f32; 3], center: [f32; 3], scale: f32) -> (f32, f32) {
        let (sin, cos) = self.yaw.sin_cos();
        let x = point[0] - center[0];
        let y = point[1] - center[1];
        let z = point[2] - center[2];
        let rx = x * cos + z * sin;
        (
            self.width as f32 / 2.0 + rx * scale,
            self.height as f32 / 2.0 - y * scale,
        )
    }

    fn fit(&self) -> Option<([f32; 3], f32)> {
        let first = self.dataset.points.first()?;
        let (min, max) = self.dataset.points.iter().fold((*first, *first), |(lo, hi), p| {
            (
                [lo[0].min(p[0]), lo[1].min(p[1]), lo[2].min(p[2])],
                [hi[0].max(p[0]), hi[1].max(p[1]), hi[2].max(p[2])],
            )
        });
        let center = [
            (min[0] + max[0]) / 2.0,
            (min[1] + max[1]) / 2.0,
            (min[2] + max[2]) / 2.0,
        ];
        // Rotation about y mixes x and z, so fit against the larger of the two.
        let horizontal = (max[0] - min[0]).max(max[2] - min[2]);
        let extent = horizontal.max(max[1] - min[1]).max(f32::EPSILON);
        let scale = FIT_MARGIN * self.width.min(self.height) as f32 / extent;
        Some((center, scale))
    }

    /// Rasterises the current dataset, advancing the rotation one step.
    pub fn render_image(&mut self) -> Frame {
        let mut frame = Frame::blank(self.width, self.height);
        frame.rgba.fill(255);
        if !self.rendered {
            return frame;
        }
        if self.rotate_on_start {
            self.yaw = (self.yaw + ROTATION_STEP) % std::f32::consts::TAU;
        }
        let Some((center, scale)) = self.fit() else {
            return frame;
        };

        let projected: Vec<(f32, f32)> = self
            .dataset
            .points
            .iter()
            .map(|p| self.project(p, center, scale))
            .collect();
        let color_of = |i: usize| self.colors.get(i).copied().unwrap_or(HIDDEN_COLOR);

        let mut raster = Raster::new(&mut frame.rgba, self.width, self.height, false);
        for &(a, b) in &self.sequences {
            if color_of(a) == HIDDEN_COLOR || color_of(b) == HIDDEN_COLOR {
                continue;
            }
            if let (Some(&pa), Some(&pb)) = (projected.get(a), projected.get(b)) {
                raster.line(pa, pb, SEQUENCE_COLOR.rgba(), 1);
            }
        }
        for (i, &p) in projected.iter().enumerate() {
            let color = color_of(i);
            if color != HIDDEN_COLOR {
                raster.disk(p, POINT_RADIUS, color.rgba());
            }
        }
        frame
    }
}

impl PointCloudSink for ScatterView {
    fn render(&mut self, dataset: PointDataset) {
        self.dataset = dataset;
        self.yaw = 0.0;
        self.rendered = true;
    }

    fn update_dataset(&mut self, dataset: PointDataset) {
        self.dataset = dataset;
    }

    fn set_point_colors(&mut self, colors: Vec<Color>) {
        self.colors = colors;
    }

    fn set_sequences(&mut self, sequences: &[(usize, usize)]) {
        self.sequences = sequences.to_vec();
    }
}
