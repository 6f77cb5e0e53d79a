//! Pixel primitives over a tightly packed RGBA8 buffer.

/// Mutable view of an RGBA buffer, optionally mirrored horizontally.
///
/// All coordinates are logical; the mirror is applied when a pixel is written.
pub struct Raster<'a> {
    buffer: &'a mut [u8],
    width: u32,
    height: u32,
    mirror: bool,
}

impl<'a> Raster<'a> {
    pub fn new(buffer: &'a mut [u8], width: u32, height: u32, mirror: bool) -> Self {
        Self {
            buffer,
            width,
            height,
            mirror,
        }
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 {
            return None;
        }
        let (ux, uy) = (x as u32, y as u32);
        if ux >= self.width || uy >= self.height {
            return None;
        }
        let dx = if self.mirror { self.width - 1 - ux } else { ux };
        let idx = ((uy * self.width + dx) as usize) * 4;
        (idx + 3 < self.buffer.len()).then_some(idx)
    }

    pub fn put(&mut self, x: i32, y: i32, color: [u8; 4]) {
        if let Some(idx) = self.index(x, y) {
            self.buffer[idx..idx + 4].copy_from_slice(&color);
        }
    }

    /// Source-over compositing of a non-premultiplied pixel.
    pub fn blend(&mut self, x: i32, y: i32, color: [u8; 4]) {
        let alpha = color[3] as u32;
        if alpha == 0 {
            return;
        }
        if alpha == 255 {
            self.put(x, y, color);
            return;
        }
        if let Some(idx) = self.index(x, y) {
            let dst = &mut self.buffer[idx..idx + 4];
            let inv = 255 - alpha;
            for c in 0..3 {
                dst[c] = ((color[c] as u32 * alpha + dst[c] as u32 * inv + 127) / 255) as u8;
            }
            dst[3] = dst[3].max(color[3]);
        }
    }

    pub fn line(&mut self, p0: (f32, f32), p1: (f32, f32), color: [u8; 4], thickness: i32) {
        let (mut x0, mut y0) = (p0.0.round() as i32, p0.1.round() as i32);
        let (x1, y1) = (p1.0.round() as i32, p1.1.round() as i32);
        let dx = (x1 - x0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let dy = -(y1 - y0).abs();
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        let radius = (thickness.max(1) - 1) / 2;

        loop {
            self.put(x0, y0, color);
            for ox in -radius..=radius {
                for oy in -radius..=radius {
                    if (ox != 0 || oy != 0) && ox.abs() + oy.abs() <= radius {
                        self.put(x0 + ox, y0 + oy, color);
                    }
                }
            }
            if x0 == x1 && y0 == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x0 += sx;
            }
            if e2 <= dx {
                err += dx;
                y0 += sy;
            }
        }
    }

    pub fn disk(&mut self, center: (f32, f32), radius: f32, color: [u8; 4]) {
        let (cx, cy) = (center.0.round() as i32, center.1.round() as i32);
        let r = radius.round().max(0.0) as i32;
        for dy in -r..=r {
            for dx in -r..=r {
                if dx * dx + dy * dy <= r * r {
                    self.put(cx + dx, cy + dy, color);
                }
            }
        }
    }

    /// Circle outline of the given stroke width centred on `radius`.
    pub fn ring(&mut self, center: (f32, f32), radius: f32, color: [u8; 4], line_width: f32) {
        let half = (line_width / 2.0).max(0.5);
        let outer = radius + half;
        let inner = (radius - half).max(0.0);
        let (cx, cy) = (center.0.round() as i32, center.1.round() as i32);
        let r = outer.ceil() as i32;
        for dy in -r..=r {
            for dx in -r..=r {
                let d = ((dx * dx + dy * dy) as f32).sqrt();
                if d >= inner && d <= outer {
                    self.put(cx + dx, cy + dy, color);
                }
            }
        }
    }
}
