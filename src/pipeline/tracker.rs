use crate::types::Pose;

const MIN_SIMILARITY: f32 = 0.15;
const MAX_MISSED_FRAMES: u32 = 30;
const BOX_KEYPOINT_SCORE: f32 = 0.2;

#[derive(Clone, Debug)]
struct Track {
    id: u32,
    bbox: [f32; 4],
    missed: u32,
}

/// Assigns stable ids to poses across frames by bounding-box overlap.
#[derive(Debug, Default)]
pub struct PoseTracker {
    tracks: Vec<Track>,
    next_id: u32,
}

impl PoseTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, poses: &mut [Pose]) {
        let mut claimed = vec![false; self.tracks.len()];

        for pose in poses.iter_mut() {
            let Some(bbox) = pose.bounds(BOX_KEYPOINT_SCORE) else {
                continue;
            };

            let best = self
                .tracks
                .iter()
                .enumerate()
                .filter(|(i, _)| !claimed[*i])
                .map(|(i, t)| (i, iou(&t.bbox, &bbox)))
                .filter(|(_, sim)| *sim >= MIN_SIMILARITY)
                .max_by(|a, b| a.1.total_cmp(&b.1));

            match best {
                Some((i, _)) => {
                    claimed[i] = true;
                    let track = &mut self.tracks[i];
                    track.bbox = bbox;
                    track.missed = 0;
                    pose.id = Some(track.id);
                }
                None => {
                    let id = self.next_id;
                    self.next_id = self.next_id.wrapping_add(1);
                    self.tracks.push(Track {
                        id,
                        bbox,
                        missed: 0,
                    });
                    claimed.push(true);
                    pose.id = Some(id);
                }
            }
        }

        for (track, seen) in self.tracks.iter_mut().zip(&claimed) {
            if !seen {
                track.missed += 1;
            }
        }
        self.tracks.retain(|t| t.missed <= MAX_MISSED_FRAMES);
    }
}

fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let ix = (a[2].min(b[2]) - a[0].max(b[0])).max(0.0);
    let iy = (a[3].min(b[3]) - a[1].max(b[1])).max(0.0);
    let inter = ix * iy;
    let area = |r: &[f32; 4]| (r[2] - r[0]).max(0.0) * (r[3] - r[1]).max(0.0);
    let union = area(a) + area(b) - inter;
    if union <= 0.0 { 0.0 } else { inter / union }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Keypoint;

    fn boxed_pose(x: f32, y: f32) -> Pose {
        Pose::new(vec![
            Keypoint::new(x, y, Some(0.9)),
            Keypoint::new(x + 100.0, y + 200.0, Some(0.9)),
        ])
    }

    #[test]
    fn test_ids_persist_across_frames() {
        let mut tracker = PoseTracker::new();
        let mut frame1 = vec![boxed_pose(0.0, 0.0), boxed_pose(300.0, 0.0)];
        tracker.apply(&mut frame1);
        assert_eq!(frame1[0].id, Some(0));
        assert_eq!(frame1[1].id, Some(1));

        let mut frame2 = vec![boxed_pose(305.0, 4.0), boxed_pose(6.0, 2.0)];
        tracker.apply(&mut frame2);
        assert_eq!(frame2[0].id, Some(1));
        assert_eq!(frame2[1].id, Some(0));
    }

    #[test]
    fn test_new_person_gets_fresh_id() {
        let mut tracker = PoseTracker::new();
        let mut frame1 = vec![boxed_pose(0.0, 0.0)];
        tracker.apply(&mut frame1);
        let mut frame2 = vec![boxed_pose(0.0, 0.0), boxed_pose(600.0, 0.0)];
        tracker.apply(&mut frame2);
        assert_eq!(frame2[1].id, Some(1));
    }

    #[test]
    fn test_stale_tracks_expire() {
        let mut tracker = PoseTracker::new();
        tracker.apply(&mut [boxed_pose(0.0, 0.0)]);
        for _ in 0..=MAX_MISSED_FRAMES {
            tracker.apply(&mut []);
        }
        let mut again = vec![boxed_pose(0.0, 0.0)];
        tracker.apply(&mut again);
        assert_eq!(again[0].id, Some(1));
    }

    #[test]
    fn test_iou() {
        assert_eq!(iou(&[0.0, 0.0, 10.0, 10.0], &[0.0, 0.0, 10.0, 10.0]), 1.0);
        assert_eq!(iou(&[0.0, 0.0, 10.0, 10.0], &[20.0, 20.0, 30.0, 30.0]), 0.0);
        assert!((iou(&[0.0, 0.0, 10.0, 10.0], &[5.0, 0.0, 15.0, 10.0]) - 1.0 / 3.0).abs() < 1e-6);
    }
}
