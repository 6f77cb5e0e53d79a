use super::{
    Accessory, Color, DEFAULT_LINE_WIDTH, DEFAULT_RADIUS, Surface,
    scatter::{self, PointCloudSink},
    skeleton_color,
    smoothing::{self, AnchorState},
};
use crate::{
    config::Config,
    platform::PlatformProfile,
    topology::KeypointTopology,
    types::{Keypoint, Pose},
};

#[derive(Clone, Copy, Debug)]
pub struct OverlayOptions {
    pub score_threshold: f32,
    pub enable_tracking: bool,
    pub render_3d: bool,
    pub profile: PlatformProfile,
}

impl OverlayOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            score_threshold: config.model.effective_score_threshold(),
            enable_tracking: config.model.enable_tracking,
            render_3d: config.model.render_3d,
            profile: config.render.platform.resolve().profile(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Ear {
    Left,
    Right,
}

/// Turns per-frame poses into draw calls, keeping the accessory anchors
/// smoothed across frames.
pub struct OverlayRenderer<T, P> {
    topology: T,
    options: OverlayOptions,
    anchors: AnchorState,
    point_cloud: Option<P>,
    point_cloud_initialized: bool,
}

impl<T: KeypointTopology, P: PointCloudSink> OverlayRenderer<T, P> {
    pub fn new(topology: T, options: OverlayOptions) -> Self {
        Self {
            topology,
            options,
            anchors: AnchorState::default(),
            point_cloud: None,
            point_cloud_initialized: false,
        }
    }

    pub fn with_point_cloud(mut self, sink: P) -> Self {
        self.point_cloud = Some(sink);
        self
    }

    #[cfg(test)]
    pub fn anchors(&self) -> &AnchorState {
        &self.anchors
    }

    #[cfg(test)]
    pub fn point_cloud(&self) -> Option<&P> {
        self.point_cloud.as_ref()
    }

    pub fn point_cloud_mut(&mut self) -> Option<&mut P> {
        self.point_cloud.as_mut()
    }

    pub fn draw_results<S: Surface>(&mut self, surface: &mut S, poses: &[Pose]) {
        for pose in poses {
            self.draw_result(surface, pose);
        }
    }

    /// Keypoint markers and skeleton, plus the 3D cloud when enabled.
    pub fn draw_result<S: Surface>(&mut self, surface: &mut S, pose: &Pose) {
        if !pose.keypoints.is_empty() {
            self.draw_keypoints(surface, &pose.keypoints);
            self.draw_skeleton(surface, &pose.keypoints, pose.id);
        }
        if let Some(keypoints_3d) = &pose.keypoints_3d {
            if self.options.render_3d {
                self.draw_keypoints_3d(keypoints_3d);
            }
        }
    }

    /// Feeds the 3D cloud without drawing any 2D overlay.
    pub fn update_point_cloud(&mut self, poses: &[Pose]) {
        if !self.options.render_3d {
            return;
        }
        for keypoints_3d in poses.iter().filter_map(|p| p.keypoints_3d.as_deref()) {
            self.draw_keypoints_3d(keypoints_3d);
        }
    }

    pub fn draw_ear_results<S: Surface>(&mut self, surface: &mut S, poses: &[Pose]) {
        for pose in poses {
            self.draw_ear_result(surface, pose);
        }
    }

    /// Earrings and necklace for one pose.
    pub fn draw_ear_result<S: Surface>(&mut self, surface: &mut S, pose: &Pose) {
        if pose.keypoints.is_empty() {
            return;
        }
        self.draw_earrings(surface, &pose.keypoints);
        self.draw_necklace(surface, &pose.keypoints);
    }

    fn named<'k>(&self, keypoints: &'k [Keypoint], name: &str) -> Option<&'k Keypoint> {
        self.topology
            .index_of(name)
            .and_then(|index| keypoints.get(index))
    }

    fn draw_keypoints<S: Surface>(&self, surface: &mut S, keypoints: &[Keypoint]) {
        let sides = self.topology.keypoint_index_by_side();
        let groups = [
            (sides.middle, Color::RED),
            (sides.left, Color::GREEN),
            (sides.right, Color::ORANGE),
        ];
        for (indices, fill) in groups {
            for keypoint in indices.iter().filter_map(|&i| keypoints.get(i)) {
                self.draw_keypoint(surface, keypoint, fill);
            }
        }
    }

    fn draw_keypoint<S: Surface>(&self, surface: &mut S, keypoint: &Keypoint, fill: Color) {
        if !keypoint.is_visible(self.options.score_threshold) {
            return;
        }
        surface.draw_marker(
            keypoint.position(),
            DEFAULT_RADIUS,
            fill,
            Color::WHITE,
            DEFAULT_LINE_WIDTH,
        );
    }

    fn draw_skeleton<S: Surface>(&self, surface: &mut S, keypoints: &[Keypoint], pose_id: Option<u32>) {
        let color = skeleton_color(pose_id, self.options.enable_tracking);
        let threshold = self.options.score_threshold;
        for &(i, j) in self.topology.adjacent_pairs() {
            let (Some(kp1), Some(kp2)) = (keypoints.get(i), keypoints.get(j)) else {
                continue;
            };
            if kp1.is_visible(threshold) && kp2.is_visible(threshold) {
                surface.draw_line(kp1.position(), kp2.position(), color, DEFAULT_LINE_WIDTH);
            }
        }
    }

    fn draw_earrings<S: Surface>(&mut self, surface: &mut S, keypoints: &[Keypoint]) {
        let offset = self.options.profile.ear_offset_y;
        if let Some(ear) = self.named(keypoints, "left_ear") {
            let hook = ear.with_offset(0.0, offset);
            self.draw_earring(surface, &hook, Ear::Left);
        }
        if let Some(ear) = self.named(keypoints, "right_ear") {
            let hook = ear.with_offset(0.0, offset);
            self.draw_earring(surface, &hook, Ear::Right);
        }
    }

    fn draw_earring<S: Surface>(&mut self, surface: &mut S, hook: &Keypoint, ear: Ear) {
        if !hook.is_visible(self.options.score_threshold) {
            return;
        }
        let threshold = self.options.profile.earring_threshold;
        let cached = match ear {
            Ear::Left => &mut self.anchors.left_ear,
            Ear::Right => &mut self.anchors.right_ear,
        };
        *cached = smoothing::smooth_anchor(cached, hook, threshold);
        surface.draw_accessory(Accessory::Earring, smoothing::earring_rect(cached));
    }

    fn draw_necklace<S: Surface>(&mut self, surface: &mut S, keypoints: &[Keypoint]) {
        let (Some(left), Some(right)) = (
            self.named(keypoints, "left_shoulder"),
            self.named(keypoints, "right_shoulder"),
        ) else {
            return;
        };
        let score = left.effective_score().min(right.effective_score());
        if score < self.options.score_threshold {
            return;
        }

        let target = smoothing::midpoint(left, right, "neck_center");
        self.anchors.neck_center = smoothing::smooth_anchor(
            &self.anchors.neck_center,
            &target,
            self.options.profile.neck_threshold,
        );

        let size = smoothing::necklace_size(left.distance(right));
        if size.is_empty() {
            log::trace!("shoulders too close for a necklace");
            return;
        }
        surface.draw_accessory(
            Accessory::Necklace,
            smoothing::necklace_rect(&self.anchors.neck_center, &size),
        );
    }

    fn draw_keypoints_3d(&mut self, keypoints: &[Keypoint]) {
        let Some(sink) = self.point_cloud.as_mut() else {
            return;
        };
        let sides = self.topology.keypoint_index_by_side();
        let dataset = scatter::build_dataset(keypoints);
        let colors = (0..dataset.points.len())
            .map(|i| scatter::point_color(i, keypoints, &sides, self.options.score_threshold))
            .collect();

        sink.set_point_colors(colors);
        if self.point_cloud_initialized {
            sink.update_dataset(dataset);
        } else {
            sink.render(dataset);
        }
        sink.set_sequences(self.topology.adjacent_pairs());
        self.point_cloud_initialized = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        platform::Platform,
        render::{
            COLOR_PALETTE, Rect,
            scatter::{CENTER_COLOR, HIDDEN_COLOR, LEFT_COLOR, PointDataset},
            smoothing::necklace_size,
            testing::{DrawCommand, RecordingSurface},
        },
        topology::PoseModel,
    };

    #[derive(Default)]
    struct RecordingSink {
        renders: usize,
        updates: usize,
        last: PointDataset,
        colors: Vec<Color>,
        sequences: usize,
    }

    impl PointCloudSink for RecordingSink {
        fn render(&mut self, dataset: PointDataset) {
            self.renders += 1;
            self.last = dataset;
        }

        fn update_dataset(&mut self, dataset: PointDataset) {
            self.updates += 1;
            self.last = dataset;
        }

        fn set_point_colors(&mut self, colors: Vec<Color>) {
            self.colors = colors;
        }

        fn set_sequences(&mut self, sequences: &[(usize, usize)]) {
            self.sequences = sequences.len();
        }
    }

    type Renderer = OverlayRenderer<PoseModel, RecordingSink>;

    fn options(platform: Platform) -> OverlayOptions {
        OverlayOptions {
            score_threshold: 0.3,
            enable_tracking: false,
            render_3d: false,
            profile: platform.profile(),
        }
    }

    fn renderer() -> Renderer {
        OverlayRenderer::new(PoseModel::MoveNet, options(Platform::Desktop))
    }

    /// COCO pose with ears at (ear_x, 100) / (ear_x + 60, 100) and shoulders
    /// `shoulder_span` apart at y = 200.
    fn pose(ear_x: f32, shoulder_span: f32) -> Pose {
        let mut keypoints: Vec<Keypoint> = (0..17)
            .map(|i| Keypoint::new(300.0 + i as f32, 300.0, Some(0.9)))
            .collect();
        keypoints[3] = Keypoint::named("left_ear", ear_x, 100.0, Some(0.9));
        keypoints[4] = Keypoint::named("right_ear", ear_x + 60.0, 100.0, Some(0.9));
        keypoints[5] = Keypoint::named("left_shoulder", 100.0, 200.0, Some(0.9));
        keypoints[6] = Keypoint::named("right_shoulder", 100.0 + shoulder_span, 200.0, Some(0.9));
        Pose::new(keypoints)
    }

    #[test]
    fn test_low_score_keypoint_is_never_drawn() {
        let mut renderer = renderer();
        let mut surface = RecordingSurface::default();
        let mut pose = pose(100.0, 120.0);
        pose.keypoints[0] = Keypoint::new(1.0, 2.0, Some(0.1));
        renderer.draw_results(&mut surface, &[pose]);

        assert!(!surface.markers().contains(&(1.0, 2.0)));
        assert_eq!(surface.markers().len(), 16);
        let touches_nose = surface.lines().iter().any(|c| {
            matches!(c, DrawCommand::Line { from, to, .. } if *from == (1.0, 2.0) || *to == (1.0, 2.0))
        });
        assert!(!touches_nose);
    }

    #[test]
    fn test_missing_score_is_always_drawn() {
        let mut renderer = OverlayRenderer::<_, RecordingSink>::new(
            PoseModel::MoveNet,
            OverlayOptions {
                score_threshold: 0.99,
                ..options(Platform::Desktop)
            },
        );
        let mut surface = RecordingSurface::default();
        let keypoints = (0..17)
            .map(|i| Keypoint::new(i as f32, 0.0, if i == 0 { None } else { Some(0.5) }))
            .collect();
        renderer.draw_results(&mut surface, &[Pose::new(keypoints)]);
        assert_eq!(surface.markers(), vec![(0.0, 0.0)]);
    }

    #[test]
    fn test_keypoint_fill_by_side() {
        let mut renderer = renderer();
        let mut surface = RecordingSurface::default();
        renderer.draw_results(&mut surface, &[pose(100.0, 120.0)]);
        let fills: Vec<Color> = surface
            .commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Marker { fill, .. } => Some(*fill),
                _ => None,
            })
            .collect();
        assert_eq!(fills[0], Color::RED);
        assert!(fills[1..9].iter().all(|&c| c == Color::GREEN));
        assert!(fills[9..].iter().all(|&c| c == Color::ORANGE));
    }

    #[test]
    fn test_skeleton_color_follows_tracking() {
        let mut tracked = OverlayRenderer::<_, RecordingSink>::new(
            PoseModel::MoveNet,
            OverlayOptions {
                enable_tracking: true,
                ..options(Platform::Desktop)
            },
        );
        let mut surface = RecordingSurface::default();
        tracked.draw_results(&mut surface, &[pose(100.0, 120.0).with_id(23)]);
        assert_eq!(surface.lines().len(), 16);
        for line in surface.lines() {
            assert!(matches!(line, DrawCommand::Line { color, .. } if *color == COLOR_PALETTE[3]));
        }

        let mut untracked = renderer();
        let mut surface = RecordingSurface::default();
        untracked.draw_results(&mut surface, &[pose(100.0, 120.0).with_id(23)]);
        for line in surface.lines() {
            assert!(matches!(line, DrawCommand::Line { color, .. } if *color == Color::WHITE));
        }
    }

    #[test]
    fn test_earring_holds_position_within_threshold() {
        let mut renderer = renderer();
        let first = {
            let mut surface = RecordingSurface::default();
            renderer.draw_ear_results(&mut surface, &[pose(100.0, 120.0)]);
            surface.accessories(Accessory::Earring)[0]
        };
        assert_eq!(first, Rect::new(85.0, 116.0, 40.0, 50.0));

        for dx in [3.0, -4.0, 7.5, 1.0] {
            let mut surface = RecordingSurface::default();
            renderer.draw_ear_results(&mut surface, &[pose(100.0 + dx, 120.0)]);
            assert_eq!(surface.accessories(Accessory::Earring)[0], first);
        }
        assert_eq!(renderer.anchors().left_ear.position(), (100.0, 116.0));
    }

    #[test]
    fn test_earring_follows_large_move() {
        let mut renderer = renderer();
        let mut surface = RecordingSurface::default();
        renderer.draw_ear_results(&mut surface, &[pose(100.0, 120.0)]);

        let mut surface = RecordingSurface::default();
        renderer.draw_ear_results(&mut surface, &[pose(120.0, 120.0)]);
        assert_eq!(renderer.anchors().left_ear.position(), (120.0, 116.0));
        assert_eq!(
            surface.accessories(Accessory::Earring)[0],
            Rect::new(105.0, 116.0, 40.0, 50.0)
        );

        let mut surface = RecordingSurface::default();
        renderer.draw_ear_results(&mut surface, &[pose(123.0, 120.0)]);
        assert_eq!(
            surface.accessories(Accessory::Earring)[0],
            Rect::new(105.0, 116.0, 40.0, 50.0)
        );
    }

    #[test]
    fn test_ears_are_smoothed_independently() {
        let mut renderer = renderer();
        let mut surface = RecordingSurface::default();
        renderer.draw_ear_results(&mut surface, &[pose(100.0, 120.0)]);

        let mut moved = pose(100.0, 120.0);
        moved.keypoints[4].x += 30.0;
        let mut surface = RecordingSurface::default();
        renderer.draw_ear_results(&mut surface, &[moved]);
        assert_eq!(renderer.anchors().left_ear.position(), (100.0, 116.0));
        assert_eq!(renderer.anchors().right_ear.position(), (190.0, 116.0));
    }

    #[test]
    fn test_mobile_uses_smaller_offset_and_threshold() {
        let mut desktop = renderer();
        let mut mobile = OverlayRenderer::<_, RecordingSink>::new(
            PoseModel::MoveNet,
            options(Platform::Mobile),
        );
        for renderer in [&mut desktop, &mut mobile] {
            let mut surface = RecordingSurface::default();
            renderer.draw_ear_results(&mut surface, &[pose(100.0, 120.0)]);
        }
        assert_eq!(desktop.anchors().left_ear.y, 116.0);
        assert_eq!(mobile.anchors().left_ear.y, 112.0);

        // A 6px move passes the mobile threshold (4) but not the desktop one (8).
        for renderer in [&mut desktop, &mut mobile] {
            let mut surface = RecordingSurface::default();
            renderer.draw_ear_results(&mut surface, &[pose(106.0, 120.0)]);
        }
        assert_eq!(desktop.anchors().left_ear.x, 100.0);
        assert_eq!(mobile.anchors().left_ear.x, 106.0);
    }

    #[test]
    fn test_detections_are_not_mutated() {
        let mut renderer = renderer();
        let mut surface = RecordingSurface::default();
        let poses = [pose(100.0, 120.0)];
        renderer.draw_ear_results(&mut surface, &poses);
        renderer.draw_results(&mut surface, &poses);
        assert_eq!(poses[0].keypoints[3].y, 100.0);
        assert!(surface.markers().contains(&(100.0, 100.0)));
    }

    #[test]
    fn test_necklace_size_is_banded() {
        let mut a = renderer();
        let mut b = renderer();
        let mut sa = RecordingSurface::default();
        let mut sb = RecordingSurface::default();
        a.draw_ear_results(&mut sa, &[pose(100.0, 21.0)]);
        b.draw_ear_results(&mut sb, &[pose(100.0, 38.0)]);
        let ra = sa.accessories(Accessory::Necklace)[0];
        let rb = sb.accessories(Accessory::Necklace)[0];
        assert_eq!((ra.width, ra.height), (rb.width, rb.height));
        assert_eq!(ra.width, necklace_size(21.0).width);
    }

    #[test]
    fn test_necklace_anchor_hysteresis() {
        let mut renderer = renderer();
        let mut surface = RecordingSurface::default();
        renderer.draw_ear_results(&mut surface, &[pose(100.0, 120.0)]);
        assert_eq!(renderer.anchors().neck_center.position(), (160.0, 200.0));

        let mut nudged = pose(100.0, 120.0);
        nudged.keypoints[5].x += 4.0;
        nudged.keypoints[6].x += 4.0;
        let mut surface = RecordingSurface::default();
        renderer.draw_ear_results(&mut surface, &[nudged]);
        assert_eq!(renderer.anchors().neck_center.position(), (160.0, 200.0));
    }

    #[test]
    fn test_necklace_requires_both_shoulders() {
        let mut renderer = renderer();
        let mut surface = RecordingSurface::default();
        let mut hidden = pose(100.0, 120.0);
        hidden.keypoints[6].score = Some(0.2);
        renderer.draw_ear_results(&mut surface, &[hidden]);
        assert!(surface.accessories(Accessory::Necklace).is_empty());
        assert_eq!(surface.accessories(Accessory::Earring).len(), 2);
    }

    #[test]
    fn test_blazepose_resolves_anchors_by_name() {
        let mut renderer = OverlayRenderer::<_, RecordingSink>::new(
            PoseModel::BlazePose,
            options(Platform::Desktop),
        );
        let mut keypoints: Vec<Keypoint> =
            (0..33).map(|_| Keypoint::new(0.0, 0.0, Some(0.9))).collect();
        keypoints[7] = Keypoint::new(50.0, 50.0, Some(0.9));
        keypoints[11] = Keypoint::new(40.0, 150.0, Some(0.9));
        keypoints[12] = Keypoint::new(140.0, 150.0, Some(0.9));
        let mut surface = RecordingSurface::default();
        renderer.draw_ear_results(&mut surface, &[Pose::new(keypoints)]);
        assert_eq!(renderer.anchors().left_ear.position(), (50.0, 66.0));
        assert_eq!(renderer.anchors().neck_center.position(), (90.0, 150.0));
    }

    #[test]
    fn test_point_cloud_renders_once_then_updates() {
        let mut renderer = OverlayRenderer::new(
            PoseModel::MoveNet,
            OverlayOptions {
                render_3d: true,
                ..options(Platform::Desktop)
            },
        )
        .with_point_cloud(RecordingSink::default());

        let mut pose = pose(100.0, 120.0);
        let mut kps3d: Vec<Keypoint> =
            (0..17).map(|i| Keypoint::new(0.1, 0.2, Some(0.9)).with_z(i as f32)).collect();
        kps3d[5].score = Some(0.1);
        pose.keypoints_3d = Some(kps3d);

        let mut surface = RecordingSurface::default();
        renderer.draw_results(&mut surface, &[pose.clone()]);
        renderer.draw_results(&mut surface, &[pose]);

        let sink = renderer.point_cloud().unwrap();
        assert_eq!(sink.renders, 1);
        assert_eq!(sink.updates, 1);
        assert_eq!(sink.last.points.len(), 21);
        assert_eq!(sink.last.points[2], [-0.1, -0.2, -2.0]);
        assert_eq!(sink.colors[0], CENTER_COLOR);
        assert_eq!(sink.colors[3], LEFT_COLOR);
        assert_eq!(sink.colors[5], HIDDEN_COLOR);
        assert_eq!(sink.colors[20], HIDDEN_COLOR);
        assert_eq!(sink.sequences, 16);
    }

    #[test]
    fn test_update_point_cloud_draws_nothing_2d() {
        let mut renderer = OverlayRenderer::new(
            PoseModel::MoveNet,
            OverlayOptions {
                render_3d: true,
                ..options(Platform::Desktop)
            },
        )
        .with_point_cloud(RecordingSink::default());
        let mut pose = pose(100.0, 120.0);
        pose.keypoints_3d = Some(vec![Keypoint::new(0.0, 0.0, None).with_z(0.0)]);
        renderer.update_point_cloud(&[pose.clone(), pose]);
        let sink = renderer.point_cloud().unwrap();
        assert_eq!((sink.renders, sink.updates), (1, 1));
    }

    #[test]
    fn test_point_cloud_skipped_when_disabled() {
        let mut renderer = renderer().with_point_cloud(RecordingSink::default());
        let mut pose = pose(100.0, 120.0);
        pose.keypoints_3d = Some(vec![Keypoint::new(0.0, 0.0, None).with_z(0.0)]);
        let mut surface = RecordingSurface::default();
        renderer.draw_results(&mut surface, &[pose]);
        assert_eq!(renderer.point_cloud().unwrap().renders, 0);
    }
}
