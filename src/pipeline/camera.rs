use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
};

use crossbeam_channel::Sender;

use crate::{config::CameraConfig, error::CameraError, platform::Platform, types::Frame};

/// Capture parameters after applying the platform profile.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VideoRequest {
    pub device_index: u32,
    pub width: u32,
    pub height: u32,
    pub target_fps: u32,
}

impl VideoRequest {
    /// Mobile devices always capture at the small preset.
    pub fn new(config: &CameraConfig, platform: Platform) -> Self {
        let size = platform
            .profile()
            .forced_video_size
            .unwrap_or(config.size);
        let (width, height) = size.dimensions();
        Self {
            device_index: config.device_index,
            width,
            height,
            target_fps: config.target_fps,
        }
    }
}

#[derive(Debug)]
pub struct CameraStream {
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
    resolution: (u32, u32),
}

impl CameraStream {
    /// Negotiated frame size; the canvas is sized to match.
    pub fn resolution(&self) -> (u32, u32) {
        self.resolution
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for CameraStream {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(feature = "camera-nokhwa")]
mod native {
    use std::{sync::atomic::Ordering, thread, time::Instant};

    use nokhwa::{
        Camera, NokhwaError,
        pixel_format::RgbFormat,
        query,
        utils::{
            ApiBackend, CameraFormat, CameraIndex, FrameFormat, RequestedFormat,
            RequestedFormatType, Resolution,
        },
    };

    use super::{Arc, AtomicBool, CameraError, CameraStream, Frame, Sender, VideoRequest};
    use crate::pipeline::rgba_converter;

    const PREFERRED_PIXEL_FORMATS: &[FrameFormat] = &[
        FrameFormat::MJPEG,
        FrameFormat::YUYV,
        FrameFormat::NV12,
        FrameFormat::RAWRGB,
        FrameFormat::RAWBGR,
        FrameFormat::GRAY,
    ];

    fn requested_formats(request: &VideoRequest) -> Vec<RequestedFormat<'static>> {
        let resolution = Resolution::new(request.width, request.height);
        let closest = |format| {
            RequestedFormat::with_formats(
                RequestedFormatType::Closest(CameraFormat::new(
                    resolution,
                    format,
                    request.target_fps,
                )),
                PREFERRED_PIXEL_FORMATS,
            )
        };
        vec![
            closest(FrameFormat::MJPEG),
            closest(FrameFormat::YUYV),
            RequestedFormat::with_formats(
                RequestedFormatType::HighestFrameRate(request.target_fps),
                PREFERRED_PIXEL_FORMATS,
            ),
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::None),
        ]
    }

    fn open_camera(request: &VideoRequest) -> Result<Camera, CameraError> {
        let index = CameraIndex::Index(request.device_index);
        let mut last_err: Option<NokhwaError> = None;

        for requested in requested_formats(request) {
            match Camera::new(index.clone(), requested) {
                Ok(mut camera) => match camera.open_stream() {
                    Ok(()) => return Ok(camera),
                    Err(err) => last_err = Some(err),
                },
                Err(err) => last_err = Some(err),
            }
        }

        Err(CameraError::Open {
            device: index.to_string(),
            reason: last_err
                .map(|err| err.to_string())
                .unwrap_or_else(|| "no supported format".to_string()),
        })
    }

    pub fn setup_camera(
        request: VideoRequest,
        frame_tx: Sender<Frame>,
    ) -> Result<CameraStream, CameraError> {
        let devices = query(ApiBackend::Auto)
            .map_err(|err| CameraError::Unavailable(err.to_string()))?;
        if devices.is_empty() {
            return Err(CameraError::NoDevice);
        }

        // Fail fast before spawning the capture thread.
        let probe = open_camera(&request)?;
        let negotiated = probe.resolution();
        log::info!(
            "camera {} ready at {}x{} @ {} fps (requested {}x{} @ {})",
            request.device_index,
            negotiated.width(),
            negotiated.height(),
            probe.frame_rate(),
            request.width,
            request.height,
            request.target_fps
        );
        drop(probe);

        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();

        let handle = thread::spawn(move || {
            let mut camera = match open_camera(&request) {
                Ok(camera) => camera,
                Err(err) => {
                    log::error!("failed to reopen camera: {err}");
                    return;
                }
            };

            while !stop_flag.load(Ordering::Relaxed) {
                let read_start = Instant::now();
                let buffer = match camera.frame() {
                    Ok(buffer) => buffer,
                    Err(err) => {
                        log::warn!(
                            "camera frame read failed (after {:?}): {err:?}",
                            read_start.elapsed()
                        );
                        continue;
                    }
                };

                match rgba_converter::decode_frame(&buffer) {
                    // Drop the frame if the renderer is still busy.
                    Ok(frame) => {
                        let _ = frame_tx.try_send(frame);
                    }
                    Err(err) => log::warn!("failed to decode camera frame: {err:?}"),
                }
            }
        });

        Ok(CameraStream {
            stop,
            handle: Some(handle),
            resolution: (negotiated.width(), negotiated.height()),
        })
    }
}

/// Opens the configured camera and starts streaming frames into `frame_tx`.
///
/// No retry: any failure is returned to the caller.
#[cfg(feature = "camera-nokhwa")]
pub fn setup_camera(request: VideoRequest, frame_tx: Sender<Frame>) -> Result<CameraStream, CameraError> {
    native::setup_camera(request, frame_tx)
}

#[cfg(not(feature = "camera-nokhwa"))]
pub fn setup_camera(
    _request: VideoRequest,
    _frame_tx: Sender<Frame>,
) -> Result<CameraStream, CameraError> {
    Err(CameraError::Unavailable(
        "built without the camera-nokhwa feature".to_string(),
    ))
}
