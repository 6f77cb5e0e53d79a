use std::{sync::Arc, thread};

use crossbeam_channel::Receiver;
use gpui::{
    AnyElement, App, AppContext, Context, IntoElement, ObjectFit, ParentElement, Render,
    RenderImage, Styled, StyledImage, TitlebarOptions, Window, WindowOptions, div, img, px,
};
use gpui_component::{ActiveTheme, Root, StyledExt, h_flex, v_flex};
use image::{Frame as ImageFrame, ImageBuffer, Rgba};

use crate::{config::Config, pipeline::CameraStream, types::RenderedFrame};

mod main_view;
mod render_util;

const DEFAULT_CAMERA_RATIO: f32 = 4.0 / 3.0;
const CAMERA_PANEL_WIDTH: f32 = 640.0;
const CLOUD_PANEL_WIDTH: f32 = 320.0;

/// What the window shows once started.
pub enum Session {
    Running {
        stream: CameraStream,
        rendered_rx: Receiver<RenderedFrame>,
        worker: thread::JoinHandle<()>,
    },
    /// Camera could not be opened; there is no retry.
    CameraFailed { message: String },
}

pub fn launch_ui(app: &mut App, config: Config, session: Session) -> gpui::Result<()> {
    let window_options = WindowOptions {
        titlebar: Some(TitlebarOptions {
            title: Some("Pose Try-On".into()),
            appears_transparent: false,
            traffic_light_position: None,
        }),
        ..Default::default()
    };

    app.open_window(window_options, move |window, app| {
        let view = app.new(|_| AppView::new(config, session));
        app.new(|cx| Root::new(view, window, cx))
    })?;

    Ok(())
}

struct AppView {
    config: Config,
    session: Session,
    latest_image: Option<Arc<RenderImage>>,
    latest_cloud: Option<Arc<RenderImage>>,
    frame_size: Option<(u32, u32)>,
    pose_count: usize,
}

impl AppView {
    fn new(config: Config, session: Session) -> Self {
        Self {
            config,
            session,
            latest_image: None,
            latest_cloud: None,
            frame_size: None,
            pose_count: 0,
        }
    }

    fn worker_running(&self) -> bool {
        match &self.session {
            Session::Running { worker, .. } => !worker.is_finished(),
            Session::CameraFailed { .. } => false,
        }
    }

    fn camera_resolution(&self) -> Option<(u32, u32)> {
        match &self.session {
            Session::Running { stream, .. } => Some(stream.resolution()),
            Session::CameraFailed { .. } => None,
        }
    }
}

impl Render for AppView {
    fn render(&mut self, window: &mut Window, cx: &mut Context<'_, Self>) -> impl IntoElement {
        cx.defer_in(window, |_, _, cx| {
            cx.notify();
        });

        if let Session::CameraFailed { message } = &self.session {
            return self.render_camera_error(message.clone(), cx);
        }
        self.render_main(window, cx)
    }
}
