use rayon::prelude::*;

use super::{Accessory, Color, Rect, Surface, raster::Raster, sprite::SpriteSet};
use crate::types::Frame;

/// RGBA drawing surface sized to the camera frame.
///
/// The camera image is mirrored, so the canvas flips every draw horizontally:
/// callers keep using unmirrored frame coordinates.
pub struct FrameCanvas {
    rgba: Vec<u8>,
    width: u32,
    height: u32,
    mirror: bool,
    sprites: SpriteSet,
}

impl FrameCanvas {
    pub fn new(width: u32, height: u32, sprites: SpriteSet) -> Self {
        Self {
            rgba: vec![0u8; width as usize * height as usize * 4],
            width,
            height,
            mirror: true,
            sprites,
        }
    }

    #[cfg(test)]
    pub fn without_mirror(mut self) -> Self {
        self.mirror = false;
        self
    }

    #[cfg(test)]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Reallocates when the stream resolution changes; contents are discarded.
    pub fn resize(&mut self, width: u32, height: u32) {
        if (width, height) == (self.width, self.height) {
            return;
        }
        log::info!(
            "canvas resized from {}x{} to {width}x{height}",
            self.width,
            self.height
        );
        self.width = width;
        self.height = height;
        self.rgba = vec![0u8; width as usize * height as usize * 4];
    }

    #[cfg(test)]
    pub fn pixels(&self) -> &[u8] {
        &self.rgba
    }

    pub fn snapshot(&self, source: &Frame) -> Frame {
        Frame {
            rgba: self.rgba.clone(),
            width: self.width,
            height: self.height,
            timestamp: source.timestamp,
        }
    }

    fn raster(&mut self) -> Raster<'_> {
        Raster::new(&mut self.rgba, self.width, self.height, self.mirror)
    }
}

impl Surface for FrameCanvas {
    fn draw_frame(&mut self, frame: &Frame) {
        let expected = frame.width as usize * frame.height as usize * 4;
        if frame.rgba.len() < expected {
            log::warn!(
                "skipping short frame buffer: got {}, expected {expected}",
                frame.rgba.len()
            );
            return;
        }
        let row_len = self.width as usize * 4;
        let copy_w = self.width.min(frame.width) as usize;
        let src_stride = frame.width as usize * 4;
        let mirror = self.mirror;
        let width = self.width as usize;

        self.rgba
            .par_chunks_mut(row_len)
            .take(frame.height as usize)
            .enumerate()
            .for_each(|(y, dst_row)| {
                let src_row = &frame.rgba[y * src_stride..];
                for x in 0..copy_w {
                    let dx = if mirror { width - 1 - x } else { x };
                    dst_row[dx * 4..dx * 4 + 4].copy_from_slice(&src_row[x * 4..x * 4 + 4]);
                }
            });
    }

    fn clear(&mut self) {
        self.rgba.fill(0);
    }

    fn draw_marker(
        &mut self,
        center: (f32, f32),
        radius: f32,
        fill: Color,
        stroke: Color,
        line_width: f32,
    ) {
        let mut raster = self.raster();
        raster.disk(center, radius, fill.rgba());
        raster.ring(center, radius, stroke.rgba(), line_width);
    }

    fn draw_line(&mut self, from: (f32, f32), to: (f32, f32), color: Color, line_width: f32) {
        self.raster()
            .line(from, to, color.rgba(), line_width.round() as i32);
    }

    fn draw_accessory(&mut self, accessory: Accessory, rect: Rect) {
        if rect.is_empty() {
            return;
        }
        let (w, h) = (rect.width.round() as u32, rect.height.round() as u32);
        let Some(sprite) = self.sprites.get(accessory, w, h) else {
            return;
        };
        let (ox, oy) = (rect.x.round() as i32, rect.y.round() as i32);
        let mut raster = Raster::new(&mut self.rgba, self.width, self.height, self.mirror);
        for sy in 0..sprite.height {
            for sx in 0..sprite.width {
                raster.blend(ox + sx as i32, oy + sy as i32, sprite.pixel(sx, sy));
            }
        }
    }
}
