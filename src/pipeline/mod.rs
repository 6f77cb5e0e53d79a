pub mod camera;
pub mod detector;
#[cfg(feature = "camera-nokhwa")]
pub mod rgba_converter;
pub mod tracker;

use std::thread;

use crossbeam_channel::{Receiver, Sender};

use crate::{
    config::Config,
    render::{FrameCanvas, OverlayOptions, OverlayRenderer, ScatterView, SpriteSet, Surface},
    topology::PoseModel,
    types::{Frame, Pose, RenderedFrame},
};

pub use camera::{CameraStream, VideoRequest, setup_camera};
use detector::{MoveNetDetector, PoseDetector};

const POINT_CLOUD_SIZE: (u32, u32) = (360, 360);

fn load_detector(config: &Config) -> Option<Box<dyn PoseDetector>> {
    let model = config.model.model;
    if model != PoseModel::MoveNet {
        log::error!(
            "no built-in detector for {}; rendering camera frames only",
            model.label()
        );
        return None;
    }

    let path = &config.model.model_path;
    match MoveNetDetector::new(path, config.model.enable_tracking) {
        Ok(detector) => Some(Box::new(detector)),
        Err(err) => {
            log::error!("failed to load pose model at {}: {err:?}", path.display());
            None
        }
    }
}

/// Spawns the worker that detects poses and composites every overlay onto
/// the latest camera frame.
pub fn start_render_worker(
    config: Config,
    frame_rx: Receiver<Frame>,
    rendered_tx: Sender<RenderedFrame>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let detector = load_detector(&config);
        run_render_loop(detector, &config, frame_rx, rendered_tx);
    })
}

fn run_render_loop(
    mut detector: Option<Box<dyn PoseDetector>>,
    config: &Config,
    frame_rx: Receiver<Frame>,
    rendered_tx: Sender<RenderedFrame>,
) {
    let options = OverlayOptions::from_config(config);
    let mut renderer = OverlayRenderer::new(config.model.model, options);
    if options.render_3d {
        let (w, h) = POINT_CLOUD_SIZE;
        renderer = renderer.with_point_cloud(ScatterView::new(w, h));
    }
    let (width, height) = config.camera.size.dimensions();
    let mut canvas = FrameCanvas::new(width, height, SpriteSet::from_config(&config.render));

    while let Some(frame) = recv_latest_frame(&frame_rx) {
        let poses = match detector.as_mut() {
            Some(detector) => detector.detect(&frame).unwrap_or_else(|err| {
                log::warn!("pose detection failed: {err:?}");
                Vec::new()
            }),
            None => Vec::new(),
        };

        let rendered = render_frame(&mut canvas, &mut renderer, config, &frame, &poses);
        if rendered_tx.try_send(rendered).is_err() {
            log::trace!("ui busy, dropping rendered frame");
        }
    }
    log::info!("camera channel closed, render worker exiting");
}

/// One complete frame pass: camera image, accessories, skeleton, 3D cloud.
fn render_frame(
    canvas: &mut FrameCanvas,
    renderer: &mut OverlayRenderer<PoseModel, ScatterView>,
    config: &Config,
    frame: &Frame,
    poses: &[Pose],
) -> RenderedFrame {
    canvas.resize(frame.width, frame.height);
    if frame.rgba.len() < frame.width as usize * frame.height as usize * 4 {
        // Truncated capture: show nothing rather than last frame's pixels.
        canvas.clear();
        return RenderedFrame {
            frame: canvas.snapshot(frame),
            point_cloud: None,
            pose_count: 0,
        };
    }
    canvas.draw_frame(frame);

    if config.render.show_accessories {
        renderer.draw_ear_results(canvas, poses);
    }
    if config.render.show_skeleton {
        renderer.draw_results(canvas, poses);
    } else {
        renderer.update_point_cloud(poses);
    }

    let point_cloud = renderer.point_cloud_mut().map(ScatterView::render_image);

    RenderedFrame {
        frame: canvas.snapshot(frame),
        point_cloud,
        pose_count: poses.len(),
    }
}

fn recv_latest_frame(frame_rx: &Receiver<Frame>) -> Option<Frame> {
    let mut frame = frame_rx.recv().ok()?;
    // Drop stale frames while detection was running.
    while let Ok(newer) = frame_rx.try_recv() {
        frame = newer;
    }
    Some(frame)
}
