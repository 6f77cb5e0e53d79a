use std::sync::Arc;

use super::render_util::{aspect_ratio, frame_to_image};
use super::{
    ActiveTheme, AnyElement, AppView, CAMERA_PANEL_WIDTH, CLOUD_PANEL_WIDTH, Context,
    DEFAULT_CAMERA_RATIO, IntoElement, ObjectFit, ParentElement, RenderImage, Session, Styled,
    StyledExt, StyledImage, Window, div, h_flex, img, px, v_flex,
};

impl AppView {
    pub(super) fn render_main(&mut self, window: &mut Window, cx: &mut Context<'_, Self>) -> AnyElement {
        self.poll_rendered_frames(window, cx);

        let theme = cx.theme();
        let (camera_icon, camera_text, camera_color) = match (self.frame_size, self.camera_resolution()) {
            (Some((w, h)), _) => ("●", format!("camera {w}x{h}"), theme.success),
            (None, Some((w, h))) => ("○", format!("camera {w}x{h}, waiting for frames"), theme.muted_foreground),
            (None, None) => ("○", "camera offline".to_string(), theme.muted_foreground),
        };
        let (worker_icon, worker_text, worker_color) = if self.worker_running() {
            ("●", format!("{} poses", self.pose_count), theme.success)
        } else {
            ("○", "renderer stopped".to_string(), theme.danger)
        };

        let status = |icon: &str, text: String, color| {
            div()
                .px_2()
                .py_0p5()
                .rounded_md()
                .bg(gpui::rgba(0x00000033))
                .text_xs()
                .text_color(color)
                .child(format!("{icon} {text}"))
        };

        let model = &self.config.model;
        let header = h_flex()
            .gap_3()
            .items_center()
            .child(
                div()
                    .text_sm()
                    .font_semibold()
                    .text_color(gpui::rgb(0xe2e8f0))
                    .child(format!("{} · threshold {:.2}", model.model.label(), model.effective_score_threshold())),
            )
            .child(status(camera_icon, camera_text, camera_color))
            .child(status(worker_icon, worker_text, worker_color));

        let ratio = aspect_ratio(self.frame_size, DEFAULT_CAMERA_RATIO);
        let camera_panel = self.image_panel(
            self.latest_image.clone(),
            "waiting for camera...",
            CAMERA_PANEL_WIDTH,
            CAMERA_PANEL_WIDTH / ratio,
            gpui::rgb(0x000000),
        );

        let mut body = h_flex().gap_3().items_start().child(camera_panel);
        if model.render_3d {
            body = body.child(self.image_panel(
                self.latest_cloud.clone(),
                "no 3D keypoints yet",
                CLOUD_PANEL_WIDTH,
                CLOUD_PANEL_WIDTH,
                gpui::rgb(0xffffff),
            ));
        }

        v_flex()
            .size_full()
            .gap_3()
            .p_4()
            .bg(gpui::rgb(0x1a2332))
            .child(header)
            .child(body)
            .into_any_element()
    }

    pub(super) fn render_camera_error(&self, message: String, _cx: &mut Context<'_, Self>) -> AnyElement {
        v_flex()
            .size_full()
            .items_center()
            .justify_center()
            .bg(gpui::rgb(0x1a2332))
            .child(
                h_flex()
                    .gap_2()
                    .items_start()
                    .p_3()
                    .rounded_lg()
                    .bg(gpui::rgba(0x7f1d1d33))
                    .border_1()
                    .border_color(gpui::rgba(0xef4444aa))
                    .child(div().text_sm().text_color(gpui::rgb(0xfca5a5)).child("!"))
                    .child(
                        v_flex()
                            .gap_1()
                            .child(
                                div()
                                    .text_sm()
                                    .font_semibold()
                                    .text_color(gpui::rgb(0xe2e8f0))
                                    .child("Camera unavailable"),
                            )
                            .child(div().text_xs().text_color(gpui::rgb(0xfca5a5)).child(message)),
                    ),
            )
            .into_any_element()
    }

    fn poll_rendered_frames(&mut self, window: &mut Window, cx: &mut Context<'_, Self>) {
        let Session::Running { rendered_rx, .. } = &self.session else {
            return;
        };
        let Some(rendered) = rendered_rx.try_iter().last() else {
            return;
        };

        self.frame_size = Some((rendered.frame.width, rendered.frame.height));
        self.pose_count = rendered.pose_count;
        if let Some(image) = frame_to_image(&rendered.frame) {
            if let Some(old) = self.latest_image.replace(image) {
                // Free the previous texture or the sprite atlas grows every frame.
                cx.drop_image(old, Some(window));
            }
        }
        if let Some(image) = rendered.point_cloud.as_ref().and_then(frame_to_image) {
            if let Some(old) = self.latest_cloud.replace(image) {
                cx.drop_image(old, Some(window));
            }
        }
    }

    fn image_panel(
        &self,
        image: Option<Arc<RenderImage>>,
        placeholder: &'static str,
        width: f32,
        height: f32,
        background: gpui::Rgba,
    ) -> AnyElement {
        let content: AnyElement = match image {
            Some(image) => img(image)
                .size_full()
                .object_fit(ObjectFit::Contain)
                .into_any_element(),
            None => div()
                .size_full()
                .flex()
                .items_center()
                .justify_center()
                .text_sm()
                .text_color(gpui::rgb(0x8b95a5))
                .child(placeholder)
                .into_any_element(),
        };

        div()
            .w(px(width))
            .h(px(height))
            .overflow_hidden()
            .rounded_lg()
            .bg(background)
            .child(content)
            .into_any_element()
    }
}
