use std::path::Path;

use anyhow::{Context, Result, anyhow};
use fast_image_resize as fir;
use ndarray::Array4;
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::Tensor;

use super::tracker::PoseTracker;
use crate::{
    topology::{KeypointTopology, PoseModel},
    types::{Frame, Keypoint, Pose},
};

const COCO_KEYPOINTS: usize = 17;
const MULTIPOSE_ROW: usize = 56;
const MIN_POSE_SCORE: f32 = 0.25;

/// Source of poses for one camera frame.
pub trait PoseDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Pose>>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveNetVariant {
    Lightning,
    Thunder,
    MultiPose,
}

impl MoveNetVariant {
    /// Guesses the variant from the published model file names.
    pub fn from_path(path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if name.contains("multipose") {
            Self::MultiPose
        } else if name.contains("thunder") {
            Self::Thunder
        } else {
            Self::Lightning
        }
    }

    pub fn input_size(self) -> u32 {
        match self {
            Self::Lightning => 192,
            Self::Thunder => 256,
            Self::MultiPose => 256,
        }
    }
}

/// Maps model-space coordinates back to the source frame.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Letterbox {
    scale: f32,
    pad_x: f32,
    pad_y: f32,
    size: f32,
}

impl Letterbox {
    fn project(&self, nx: f32, ny: f32) -> (f32, f32) {
        (
            (nx * self.size - self.pad_x) / self.scale,
            (ny * self.size - self.pad_y) / self.scale,
        )
    }
}

pub struct MoveNetDetector {
    session: Session,
    variant: MoveNetVariant,
    tracker: Option<PoseTracker>,
}

impl MoveNetDetector {
    pub fn new(model_path: &Path, enable_tracking: bool) -> Result<Self> {
        if !model_path.exists() {
            return Err(anyhow!("model file not found at {}", model_path.display()));
        }
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(2)?
            .commit_from_file(model_path)
            .with_context(|| format!("failed to load ORT session from {}", model_path.display()))?;
        let variant = MoveNetVariant::from_path(model_path);
        log::info!(
            "MoveNet {variant:?} ready ({}px input) using {}",
            variant.input_size(),
            model_path.display()
        );

        Ok(Self {
            session,
            variant,
            tracker: enable_tracking.then(PoseTracker::new),
        })
    }
}

impl PoseDetector for MoveNetDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Pose>> {
        let (input, letterbox) = prepare_input(frame, self.variant.input_size())?;
        let tensor = Tensor::from_array(input)?;
        let outputs = self
            .session
            .run(ort::inputs![tensor])
            .context("failed to run ORT session")?;
        if outputs.len() < 1 {
            return Err(anyhow!("model returned no outputs"));
        }
        let raw = outputs[0].try_extract_array::<f32>()?;
        let flat: Vec<f32> = raw.iter().copied().collect();

        let mut poses = decode_poses(&flat, &letterbox)?;
        if let Some(tracker) = self.tracker.as_mut() {
            tracker.apply(&mut poses);
        }
        Ok(poses)
    }
}

/// Letterboxes the frame into a square RGB tensor, values kept in 0..=255.
fn prepare_input(frame: &Frame, target_size: u32) -> Result<(Array4<f32>, Letterbox)> {
    let expected_len = (frame.width as usize)
        .saturating_mul(frame.height as usize)
        .saturating_mul(4);
    if frame.rgba.len() != expected_len || expected_len == 0 {
        return Err(anyhow!(
            "frame buffer size mismatch: got {}, expected {}",
            frame.rgba.len(),
            expected_len
        ));
    }

    let scale = target_size as f32 / frame.width.max(frame.height) as f32;
    let new_w = ((frame.width as f32 * scale).round() as u32).clamp(1, target_size);
    let new_h = ((frame.height as f32 * scale).round() as u32).clamp(1, target_size);

    let src = fir::images::Image::from_vec_u8(
        frame.width,
        frame.height,
        frame.rgba.clone(),
        fir::PixelType::U8x4,
    )?;
    let mut dst = fir::images::Image::new(new_w, new_h, fir::PixelType::U8x4);
    let options = fir::ResizeOptions::new()
        .resize_alg(fir::ResizeAlg::Interpolation(fir::FilterType::Bilinear));
    fir::Resizer::new()
        .resize(&src, &mut dst, Some(&options))
        .context("fast resize failed")?;
    let resized = dst.into_vec();

    let size = target_size as usize;
    let pad_x = (size - new_w as usize) / 2;
    let pad_y = (size - new_h as usize) / 2;
    let mut input = Array4::<f32>::zeros((1, size, size, 3));
    for (row, line) in resized.chunks_exact(new_w as usize * 4).enumerate() {
        for (col, px) in line.chunks_exact(4).enumerate() {
            for c in 0..3 {
                input[[0, pad_y + row, pad_x + col, c]] = f32::from(px[c]);
            }
        }
    }

    Ok((
        input,
        Letterbox {
            scale,
            pad_x: pad_x as f32,
            pad_y: pad_y as f32,
            size: target_size as f32,
        },
    ))
}

/// Decodes either `[1,1,17,3]` (single pose) or `[1,6,56]` (multi pose) output.
fn decode_poses(flat: &[f32], letterbox: &Letterbox) -> Result<Vec<Pose>> {
    let single_len = COCO_KEYPOINTS * 3;
    if flat.len() == single_len {
        return Ok(vec![decode_pose(flat, letterbox)]);
    }
    if flat.is_empty() || flat.len() % MULTIPOSE_ROW != 0 {
        return Err(anyhow!(
            "unexpected MoveNet output length {}, need {single_len} or a multiple of {MULTIPOSE_ROW}",
            flat.len()
        ));
    }

    Ok(flat
        .chunks_exact(MULTIPOSE_ROW)
        .filter(|row| row[MULTIPOSE_ROW - 1] >= MIN_POSE_SCORE)
        .map(|row| {
            let mut pose = decode_pose(&row[..single_len], letterbox);
            pose.score = Some(row[MULTIPOSE_ROW - 1]);
            pose
        })
        .collect())
}

fn decode_pose(triplets: &[f32], letterbox: &Letterbox) -> Pose {
    let names = PoseModel::MoveNet.keypoint_names();
    let keypoints = triplets
        .chunks_exact(3)
        .zip(names)
        .map(|(yxs, name)| {
            let (x, y) = letterbox.project(yxs[1], yxs[0]);
            Keypoint::named(name, x, y, Some(yxs[2]))
        })
        .collect();
    Pose::new(keypoints)
}
