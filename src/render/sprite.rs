use std::{collections::HashMap, path::Path};

use anyhow::{Context, Result, anyhow};
use fast_image_resize as fir;

use super::Accessory;
use crate::config::RenderConfig;

// Necklace sizes are quantized, so only a handful of scaled variants exist.
const MAX_CACHED_VARIANTS: usize = 32;

#[derive(Clone, Debug)]
pub struct Sprite {
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Sprite {
    pub fn load(path: &Path) -> Result<Self> {
        let decoded = image::open(path)
            .with_context(|| format!("failed to decode sprite {}", path.display()))?
            .to_rgba8();
        let (width, height) = decoded.dimensions();
        Ok(Self {
            rgba: decoded.into_raw(),
            width,
            height,
        })
    }

    pub fn resized(&self, width: u32, height: u32) -> Result<Self> {
        if width == self.width && height == self.height {
            return Ok(self.clone());
        }
        let src = fir::images::Image::from_vec_u8(
            self.width,
            self.height,
            self.rgba.clone(),
            fir::PixelType::U8x4,
        )?;
        let mut dst = fir::images::Image::new(width, height, fir::PixelType::U8x4);
        let options = fir::ResizeOptions::new()
            .resize_alg(fir::ResizeAlg::Interpolation(fir::FilterType::Bilinear));
        fir::Resizer::new()
            .resize(&src, &mut dst, Some(&options))
            .map_err(|err| anyhow!("sprite resize failed: {err:?}"))?;
        Ok(Self {
            rgba: dst.into_vec(),
            width,
            height,
        })
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let idx = ((y * self.width + x) * 4) as usize;
        [
            self.rgba[idx],
            self.rgba[idx + 1],
            self.rgba[idx + 2],
            self.rgba[idx + 3],
        ]
    }

    /// Gold drop hanging from a small hook ring.
    pub fn placeholder_earring() -> Self {
        let (width, height) = (40u32, 50u32);
        let mut rgba = vec![0u8; (width * height * 4) as usize];
        let gold = [212u8, 175, 55, 255];
        let hook = [230u8, 230, 230, 255];
        for y in 0..height {
            for x in 0..width {
                let fx = x as f32 + 0.5;
                let fy = y as f32 + 0.5;
                let hook_d = ((fx - 15.0).powi(2) + (fy - 5.0).powi(2)).sqrt();
                let drop_d = ((fx - 15.0).powi(2) / 64.0 + (fy - 30.0).powi(2) / 196.0).sqrt();
                let color = if (3.0..=5.0).contains(&hook_d) {
                    Some(hook)
                } else if drop_d <= 1.0 {
                    Some(gold)
                } else {
                    None
                };
                if let Some(color) = color {
                    let idx = ((y * width + x) * 4) as usize;
                    rgba[idx..idx + 4].copy_from_slice(&color);
                }
            }
        }
        Self {
            rgba,
            width,
            height,
        }
    }

    /// Chain of beads along a lower half-ellipse.
    pub fn placeholder_necklace() -> Self {
        let (width, height) = (160u32, 120u32);
        let mut rgba = vec![0u8; (width * height * 4) as usize];
        let pearl = [240u8, 234, 214, 255];
        let (cx, cy) = (width as f32 / 2.0, height as f32 * 0.2);
        let (rx, ry) = (width as f32 * 0.42, height as f32 * 0.65);
        let beads = 21;
        for i in 0..beads {
            let t = std::f32::consts::PI * (i as f32 / (beads - 1) as f32);
            let bx = cx + rx * t.cos();
            let by = cy + ry * t.sin();
            for y in 0..height {
                for x in 0..width {
                    let d = ((x as f32 + 0.5 - bx).powi(2) + (y as f32 + 0.5 - by).powi(2)).sqrt();
                    if d <= 5.0 {
                        let idx = ((y * width + x) * 4) as usize;
                        rgba[idx..idx + 4].copy_from_slice(&pearl);
                    }
                }
            }
        }
        Self {
            rgba,
            width,
            height,
        }
    }
}

/// A source sprite plus scaled copies keyed by output size.
#[derive(Debug)]
pub struct SpriteCache {
    source: Sprite,
    variants: HashMap<(u32, u32), Sprite>,
}

impl SpriteCache {
    pub fn new(source: Sprite) -> Self {
        Self {
            source,
            variants: HashMap::new(),
        }
    }

    pub fn at_size(&mut self, width: u32, height: u32) -> Option<&Sprite> {
        if width == 0 || height == 0 {
            return None;
        }
        if !self.variants.contains_key(&(width, height)) {
            if self.variants.len() >= MAX_CACHED_VARIANTS {
                self.variants.clear();
            }
            match self.source.resized(width, height) {
                Ok(sprite) => {
                    self.variants.insert((width, height), sprite);
                }
                Err(err) => {
                    log::warn!("failed to scale sprite to {width}x{height}: {err:?}");
                    return None;
                }
            }
        }
        self.variants.get(&(width, height))
    }
}

#[derive(Debug)]
pub struct SpriteSet {
    earring: SpriteCache,
    necklace: SpriteCache,
}

impl SpriteSet {
    pub fn new(earring: Sprite, necklace: Sprite) -> Self {
        Self {
            earring: SpriteCache::new(earring),
            necklace: SpriteCache::new(necklace),
        }
    }

    pub fn placeholders() -> Self {
        Self::new(Sprite::placeholder_earring(), Sprite::placeholder_necklace())
    }

    /// Loads configured images, falling back to placeholders for missing ones.
    pub fn from_config(config: &RenderConfig) -> Self {
        let load = |path: Option<&Path>, fallback: fn() -> Sprite, label: &str| match path {
            Some(path) => Sprite::load(path).unwrap_or_else(|err| {
                log::warn!("using placeholder {label}: {err:#}");
                fallback()
            }),
            None => fallback(),
        };
        Self::new(
            load(
                config.earring_image.as_deref(),
                Sprite::placeholder_earring,
                "earring",
            ),
            load(
                config.necklace_image.as_deref(),
                Sprite::placeholder_necklace,
                "necklace",
            ),
        )
    }

    pub fn get(&mut self, accessory: Accessory, width: u32, height: u32) -> Option<&Sprite> {
        match accessory {
            Accessory::Earring => self.earring.at_size(width, height),
            Accessory::Necklace => self.necklace.at_size(width, height),
        }
    }
}
