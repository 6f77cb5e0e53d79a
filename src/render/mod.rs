pub mod canvas;
pub mod overlay;
pub mod raster;
pub mod scatter;
pub mod smoothing;
pub mod sprite;

pub use canvas::FrameCanvas;
pub use overlay::{OverlayOptions, OverlayRenderer};
pub use scatter::{PointCloudSink, ScatterView};
pub use sprite::SpriteSet;

use crate::types::Frame;

pub const DEFAULT_LINE_WIDTH: f32 = 2.0;
pub const DEFAULT_RADIUS: f32 = 4.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Color(pub [u8; 4]);

impl Color {
    pub const WHITE: Color = Color::rgb(0xff, 0xff, 0xff);
    pub const RED: Color = Color::rgb(0xff, 0x00, 0x00);
    pub const GREEN: Color = Color::rgb(0x00, 0x80, 0x00);
    pub const ORANGE: Color = Color::rgb(0xff, 0xa5, 0x00);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color([r, g, b, 255])
    }

    /// Parses `#rrggbb`.
    #[cfg(test)]
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#')?;
        if digits.len() != 6 {
            return None;
        }
        let value = u32::from_str_radix(digits, 16).ok()?;
        Some(Color::rgb((value >> 16) as u8, (value >> 8) as u8, value as u8))
    }

    pub fn rgba(&self) -> [u8; 4] {
        self.0
    }
}

/// One color per tracked person, indexed by `id % 20`.
pub const COLOR_PALETTE: [Color; 20] = [
    Color::rgb(0xff, 0xff, 0xff),
    Color::rgb(0x80, 0x00, 0x00),
    Color::rgb(0x46, 0x99, 0x90),
    Color::rgb(0xe6, 0x19, 0x4b),
    Color::rgb(0x42, 0xd4, 0xf4),
    Color::rgb(0xfa, 0xbe, 0xd4),
    Color::rgb(0xaa, 0xff, 0xc3),
    Color::rgb(0x9a, 0x63, 0x24),
    Color::rgb(0x00, 0x00, 0x75),
    Color::rgb(0xf5, 0x82, 0x31),
    Color::rgb(0x43, 0x63, 0xd8),
    Color::rgb(0xff, 0xd8, 0xb1),
    Color::rgb(0xdc, 0xbe, 0xff),
    Color::rgb(0x80, 0x80, 0x00),
    Color::rgb(0xff, 0xe1, 0x19),
    Color::rgb(0x91, 0x1e, 0xb4),
    Color::rgb(0xbf, 0xef, 0x45),
    Color::rgb(0xf0, 0x32, 0xe6),
    Color::rgb(0x3c, 0xb4, 0x4b),
    Color::rgb(0xa9, 0xa9, 0xa9),
];

pub fn skeleton_color(pose_id: Option<u32>, enable_tracking: bool) -> Color {
    match pose_id {
        Some(id) if enable_tracking => COLOR_PALETTE[id as usize % COLOR_PALETTE.len()],
        _ => Color::WHITE,
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Accessory {
    Earring,
    Necklace,
}

/// 2D drawing target for one frame-processing pass.
pub trait Surface {
    fn draw_frame(&mut self, frame: &Frame);
    fn clear(&mut self);
    fn draw_marker(
        &mut self,
        center: (f32, f32),
        radius: f32,
        fill: Color,
        stroke: Color,
        line_width: f32,
    );
    fn draw_line(&mut self, from: (f32, f32), to: (f32, f32), color: Color, line_width: f32);
    fn draw_accessory(&mut self, accessory: Accessory, rect: Rect);
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracking_color_uses_palette_modulo() {
        assert_eq!(skeleton_color(Some(23), true), COLOR_PALETTE[3]);
        assert_eq!(skeleton_color(Some(23), true), Color::from_hex("#e6194b").unwrap());
        assert_eq!(skeleton_color(Some(0), true), Color::WHITE);
    }

    #[test]
    fn test_color_is_fixed_without_tracking() {
        assert_eq!(skeleton_color(Some(23), false), Color::WHITE);
        assert_eq!(skeleton_color(Some(7), false), Color::WHITE);
        assert_eq!(skeleton_color(None, true), Color::WHITE);
    }

    #[test]
    fn test_from_hex() {
        assert_eq!(Color::from_hex("#ffa500"), Some(Color::ORANGE));
        assert_eq!(Color::from_hex("ffa500"), None);
        assert_eq!(Color::from_hex("#ffa5"), None);
    }
}
