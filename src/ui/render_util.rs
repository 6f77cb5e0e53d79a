use super::{Arc, ImageBuffer, ImageFrame, RenderImage, Rgba};
use crate::types::Frame;

pub(super) fn frame_to_image(frame: &Frame) -> Option<Arc<RenderImage>> {
    let mut bgra = frame.rgba.clone();
    // GPUI textures are BGRA.
    for px in bgra.chunks_exact_mut(4) {
        px.swap(0, 2);
    }

    let buffer = ImageBuffer::<Rgba<u8>, Vec<u8>>::from_raw(frame.width, frame.height, bgra)?;
    Some(Arc::new(RenderImage::new(vec![ImageFrame::new(buffer)])))
}

pub(super) fn aspect_ratio(size: Option<(u32, u32)>, fallback: f32) -> f32 {
    match size {
        Some((w, h)) if w > 0 && h > 0 => w as f32 / h as f32,
        _ => fallback,
    }
}
