use bevy::prelude::*;
use image::{GrayImage, Luma};

use crate::error::{MeadowError, Result};

/// Single-channel intensity image, one `f32` per texel in [0, 1].
#[derive(Debug, Clone)]
pub struct TrailBuffer {
    width: u32,
    height: u32,
    texels: Vec<f32>,
}

impl TrailBuffer {
    /// Allocates a `width` x `height` target filled with `fill`.
    pub fn allocate(width: u32, height: u32, max_dimension: u32, fill: f32) -> Result<Self> {
        let fail = |reason: String| MeadowError::ResourceAllocation { width, height, reason };
        if width == 0 || height == 0 {
            return Err(fail("zero-sized target".into()));
        }
        if width > max_dimension || height > max_dimension {
            return Err(fail(format!("exceeds device limit of {max_dimension}")));
        }
        let len = (width as usize)
            .checked_mul(height as usize)
            .ok_or_else(|| fail("size overflow".into()))?;
        let mut texels = Vec::new();
        texels.try_reserve_exact(len).map_err(|e| fail(e.to_string()))?;
        texels.resize(len, fill);
        Ok(Self { width, height, texels })
    }

    pub fn width(&self) -> u32 { self.width }
    pub fn height(&self) -> u32 { self.height }
    pub fn texels(&self) -> &[f32] { &self.texels }

    #[inline]
    pub fn texel(&self, x: u32, y: u32) -> f32 {
        self.texels[(y * self.width + x) as usize]
    }

    /// Texture coordinate of the centre of texel `(x, y)`.
    #[inline]
    pub fn texel_uv(&self, x: u32, y: u32) -> Vec2 {
        Vec2::new((x as f32 + 0.5) / self.width as f32, (y as f32 + 0.5) / self.height as f32)
    }

    pub fn to_gray_image(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            // row 0 holds v = 0, the bottom of the map
            let v = self.texel(x, self.height - 1 - y);
            Luma([(v.clamp(0.0, 1.0) * 255.0).round() as u8])
        })
    }
}

/// Read-only view of the buffer the deformer samples this frame.
#[derive(Debug, Clone, Copy)]
pub struct ReadTexture<'a>(&'a TrailBuffer);

impl<'a> ReadTexture<'a> {
    pub(crate) fn new(buffer: &'a TrailBuffer) -> Self { Self(buffer) }

    pub fn buffer(&self) -> &'a TrailBuffer { self.0 }

    /// Bilinear sample; `u` repeats, `v` clamps to the edge. Non-finite
    /// coordinates read as zero.
    pub fn sample(&self, uv: Vec2) -> f32 {
        if !uv.is_finite() {
            return 0.0;
        }
        let b = self.0;
        let (w, h) = (b.width as i64, b.height as i64);
        let x = uv.x.rem_euclid(1.0) * b.width as f32 - 0.5;
        let y = (uv.y * b.height as f32 - 0.5).clamp(0.0, (h - 1) as f32);
        let (x0, y0) = (x.floor(), y.floor());
        let (fx, fy) = (x - x0, y - y0);
        let (x0, y0) = (x0 as i64, y0 as i64);

        let at = |xi: i64, yi: i64| {
            let xi = xi.rem_euclid(w) as u32;
            let yi = yi.clamp(0, h - 1) as u32;
            b.texel(xi, yi)
        };
        let top = at(x0, y0) * (1.0 - fx) + at(x0 + 1, y0) * fx;
        let bottom = at(x0, y0 + 1) * (1.0 - fx) + at(x0 + 1, y0 + 1) * fx;
        top * (1.0 - fy) + bottom * fy
    }
}

/// Exclusive handle on the buffer being written this frame.
#[derive(Debug)]
pub struct WriteTarget<'a>(&'a mut TrailBuffer);

impl<'a> WriteTarget<'a> {
    pub(crate) fn new(buffer: &'a mut TrailBuffer) -> Self { Self(buffer) }

    pub fn width(&self) -> u32 { self.0.width }
    pub fn height(&self) -> u32 { self.0.height }

    pub fn texels_mut(&mut self) -> &mut [f32] { &mut self.0.texels }
}
