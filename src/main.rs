#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod config;
mod error;
mod pipeline;
mod platform;
mod render;
mod topology;
mod types;
mod ui;

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam_channel::bounded;
use gpui::Application;

use config::{Cli, Config};
use pipeline::VideoRequest;
use ui::Session;

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = Config::from_cli(&cli).context("failed to load configuration")?;
    let platform = config.render.platform.resolve();
    log::info!(
        "starting with {} on {platform:?}, score threshold {:.2}",
        config.model.model.label(),
        config.model.effective_score_threshold()
    );

    let (camera_frame_tx, camera_frame_rx) = bounded(1);
    let (rendered_tx, rendered_rx) = bounded(1);

    let request = VideoRequest::new(&config.camera, platform);
    let session = match pipeline::setup_camera(request, camera_frame_tx) {
        Ok(stream) => {
            let worker =
                pipeline::start_render_worker(config.clone(), camera_frame_rx, rendered_tx);
            Session::Running {
                stream,
                rendered_rx,
                worker,
            }
        }
        Err(err) => {
            log::error!("camera setup failed: {err}");
            Session::CameraFailed {
                message: err.to_string(),
            }
        }
    };

    Application::new()
        .with_assets(gpui_component_assets::Assets)
        .run(move |app| {
            gpui_component::init(app);

            if let Err(err) = ui::launch_ui(app, config, session) {
                log::error!("failed to launch ui: {err:?}");
            }
        });

    Ok(())
}
