//! Jitter suppression and sizing for accessory anchors.

use super::Rect;
use crate::types::Keypoint;

pub const EARRING_SIZE: (f32, f32) = (40.0, 50.0);
pub const EARRING_OFFSET_X: f32 = -15.0;

const NECKLACE_BAND: f32 = 20.0;
const NECKLACE_STEP: f32 = 35.0;

/// Hysteresis filter: moves to `detected` only once it is more than
/// `threshold` pixels from `cached`.
pub fn smooth_anchor(cached: &Keypoint, detected: &Keypoint, threshold: f32) -> Keypoint {
    if detected.distance(cached) > threshold {
        detected.clone()
    } else {
        cached.clone()
    }
}

/// Last accepted positions of the accessory anchors.
#[derive(Clone, Debug, PartialEq)]
pub struct AnchorState {
    pub left_ear: Keypoint,
    pub right_ear: Keypoint,
    pub neck_center: Keypoint,
}

impl Default for AnchorState {
    fn default() -> Self {
        Self {
            left_ear: Keypoint::named("left_ear", 0.0, 0.0, Some(0.0)),
            right_ear: Keypoint::named("right_ear", 0.0, 0.0, Some(0.0)),
            neck_center: Keypoint::named("neck_center", 0.0, 0.0, Some(0.0)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NecklaceSize {
    /// Stepped shoulder span, `35 * floor(distance / 20)`.
    pub span: f32,
    pub width: f32,
    pub height: f32,
}

impl NecklaceSize {
    pub fn is_empty(&self) -> bool {
        self.span <= 0.0
    }
}

pub fn necklace_size(shoulder_distance: f32) -> NecklaceSize {
    let span = NECKLACE_STEP * (shoulder_distance / NECKLACE_BAND).floor();
    let height = (2.0 * span) / (3.0 * 1.5);
    NecklaceSize {
        span,
        width: span / 2.0,
        height,
    }
}

pub fn necklace_rect(anchor: &Keypoint, size: &NecklaceSize) -> Rect {
    Rect::new(
        anchor.x - size.span / 4.0,
        anchor.y - size.height / 3.0,
        size.width,
        size.height,
    )
}

pub fn earring_rect(anchor: &Keypoint) -> Rect {
    Rect::new(
        anchor.x + EARRING_OFFSET_X,
        anchor.y,
        EARRING_SIZE.0,
        EARRING_SIZE.1,
    )
}

pub fn midpoint(a: &Keypoint, b: &Keypoint, name: &str) -> Keypoint {
    let score = a.effective_score().min(b.effective_score());
    Keypoint::named(name, (a.x + b.x) / 2.0, (a.y + b.y) / 2.0, Some(score))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kp(x: f32, y: f32) -> Keypoint {
        Keypoint::new(x, y, Some(0.9))
    }

    #[test]
    fn test_small_moves_keep_cached_anchor() {
        let mut cached = smooth_anchor(&AnchorState::default().left_ear, &kp(100.0, 100.0), 8.0);
        assert_eq!(cached.position(), (100.0, 100.0));
        for (x, y) in [(103.0, 101.0), (96.0, 99.0), (100.0, 107.9), (105.0, 104.0)] {
            cached = smooth_anchor(&cached, &kp(x, y), 8.0);
            assert_eq!(cached.position(), (100.0, 100.0));
        }
    }

    #[test]
    fn test_large_move_replaces_anchor_exactly() {
        let cached = kp(100.0, 100.0);
        let detected = Keypoint::named("left_ear", 110.0, 100.5, Some(0.7));
        let next = smooth_anchor(&cached, &detected, 8.0);
        assert_eq!(next, detected);
        let after = smooth_anchor(&next, &kp(112.0, 101.0), 8.0);
        assert_eq!(after.position(), (110.0, 100.5));
    }

    #[test]
    fn test_distance_equal_to_threshold_does_not_move() {
        let cached = kp(0.0, 0.0);
        assert_eq!(smooth_anchor(&cached, &kp(3.0, 4.0), 5.0).position(), (0.0, 0.0));
        assert_eq!(smooth_anchor(&cached, &kp(3.0, 4.1), 5.0).position(), (3.0, 4.1));
    }

    #[test]
    fn test_necklace_size_is_stepped() {
        assert_eq!(necklace_size(21.0), necklace_size(38.0));
        assert_ne!(necklace_size(39.0), necklace_size(40.0));
        let size = necklace_size(45.0);
        assert_eq!(size.span, 70.0);
        assert_eq!(size.width, 35.0);
        assert!((size.height - 140.0 / 4.5).abs() < 1e-4);
        assert!(necklace_size(19.9).is_empty());
    }

    #[test]
    fn test_necklace_rect_placement() {
        let size = necklace_size(100.0);
        let rect = necklace_rect(&kp(200.0, 300.0), &size);
        assert_eq!(rect.x, 200.0 - 175.0 / 4.0);
        assert!((rect.y - (300.0 - size.height / 3.0)).abs() < 1e-4);
        assert_eq!(rect.width, 87.5);
    }

    #[test]
    fn test_earring_rect() {
        let rect = earring_rect(&kp(50.0, 60.0));
        assert_eq!(rect, Rect::new(35.0, 60.0, 40.0, 50.0));
    }

    #[test]
    fn test_midpoint_takes_lower_score() {
        let a = Keypoint::new(0.0, 10.0, Some(0.8));
        let b = Keypoint::new(20.0, 30.0, None);
        let mid = midpoint(&a, &b, "neck_center");
        assert_eq!(mid.position(), (10.0, 20.0));
        assert_eq!(mid.score, Some(0.8));
        assert_eq!(mid.name.as_deref(), Some("neck_center"));
    }
}
