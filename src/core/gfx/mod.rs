mod backends;

use crate::core::gfx::backends::software;
use crate::ui::color::Rgb;
use std::{error::Error, sync::Arc};
use winit::window::Window;

/// CPU framebuffer that persists between frames, so trails can accumulate when the
/// per-frame wipe is off. Pixels are packed `0RGB`.
pub struct Canvas {
    width: usize,
    height: usize,
    pixels: Vec<u32>,
}

impl Canvas {
    pub fn new(width: u32, height: u32, background: Rgb) -> Self {
        let (width, height) = (width as usize, height as usize);
        Self {
            width,
            height,
            pixels: vec![background.to_u32(); width * height],
        }
    }

    #[inline(always)]
    pub const fn width(&self) -> usize {
        self.width
    }

    #[inline(always)]
    pub const fn height(&self) -> usize {
        self.height
    }

    #[inline(always)]
    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    #[cfg(test)]
    pub fn pixel(&self, x: i32, y: i32) -> Option<Rgb> {
        self.index(x, y).map(|i| Rgb::from_u32(self.pixels[i]))
    }

    pub fn clear(&mut self, color: Rgb) {
        self.pixels.fill(color.to_u32());
    }

    #[inline(always)]
    fn index(&self, x: i32, y: i32) -> Option<usize> {
        let x = usize::try_from(x).ok().filter(|x| *x < self.width)?;
        let y = usize::try_from(y).ok().filter(|y| *y < self.height)?;
        Some(y * self.width + x)
    }

    #[inline(always)]
    pub fn put(&mut self, x: i32, y: i32, color: Rgb) {
        if let Some(i) = self.index(x, y) {
            self.pixels[i] = color.to_u32();
        }
    }

    /// Mixes `color` over the existing pixel with coverage `alpha` (0..=1).
    #[inline(always)]
    pub fn blend(&mut self, x: i32, y: i32, color: Rgb, alpha: f32) {
        if alpha <= 0.0 {
            return;
        }
        if let Some(i) = self.index(x, y) {
            let dst = Rgb::from_u32(self.pixels[i]);
            self.pixels[i] = dst.lerp(color, alpha).to_u32();
        }
    }

    /// Axis-aligned rectangle; edges are floored so abutting rectangles tile without gaps.
    pub fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgb) {
        let x0 = (x.floor() as i64).clamp(0, self.width as i64) as usize;
        let x1 = ((x + w).floor() as i64).clamp(0, self.width as i64) as usize;
        let y0 = (y.floor() as i64).clamp(0, self.height as i64) as usize;
        let y1 = ((y + h).floor() as i64).clamp(0, self.height as i64) as usize;
        if x0 >= x1 || y0 >= y1 {
            return;
        }
        let px = color.to_u32();
        for row in y0..y1 {
            let start = row * self.width;
            self.pixels[start + x0..start + x1].fill(px);
        }
    }

    /// 1px Bresenham segment between rounded endpoints, both ends inclusive.
    pub fn line(&mut self, from: (f32, f32), to: (f32, f32), color: Rgb) {
        let (mut x0, mut y0) = (from.0.round() as i32, from.1.round() as i32);
        let (x1, y1) = (to.0.round() as i32, to.1.round() as i32);
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        loop {
            self.put(x0, y0, color);
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

    /// Open polyline through `points`. Fewer than two points draw nothing.
    /// Returns the number of points consumed.
    pub fn polyline<I>(&mut self, points: I, color: Rgb) -> usize
    where
        I: IntoIterator<Item = (f32, f32)>,
    {
        let mut iter = points.into_iter();
        let Some(mut prev) = iter.next() else {
            return 0;
        };
        let mut count = 1;
        for p in iter {
            self.line(prev, p, color);
            prev = p;
            count += 1;
        }
        count
    }

    /// Solid disc: every pixel whose offset from the center satisfies dx² + dy² ≤ r².
    pub fn fill_circle(&mut self, cx: i32, cy: i32, radius: u32, color: Rgb) {
        let r = radius as i32;
        let r2 = i64::from(r) * i64::from(r);
        let y_lo = (cy - r).max(0);
        let y_hi = (cy + r).min(self.height as i32 - 1);
        for y in y_lo..=y_hi {
            let dy = i64::from(y - cy);
            // widest dx on this row
            let span = ((r2 - dy * dy) as f64).sqrt().floor() as i32;
            let x_lo = (cx - span).max(0);
            let x_hi = (cx + span).min(self.width as i32 - 1);
            if x_lo > x_hi {
                continue;
            }
            let start = y as usize * self.width;
            self.pixels[start + x_lo as usize..=start + x_hi as usize].fill(color.to_u32());
        }
    }

    /// Anti-aliased 1px circle outline; coverage falls off linearly with distance from
    /// the ideal radius.
    pub fn aa_circle(&mut self, cx: i32, cy: i32, radius: u32, color: Rgb) {
        let r = radius as f32;
        let reach = radius as i32 + 1;
        for y in (cy - reach)..=(cy + reach) {
            for x in (cx - reach)..=(cx + reach) {
                let dx = (x - cx) as f32;
                let dy = (y - cy) as f32;
                let coverage = 1.0 - (dx.hypot(dy) - r).abs();
                self.blend(x, y, color, coverage);
            }
        }
    }
}

/// A public, opaque wrapper around the window surface the canvas is shown on.
pub struct Backend(software::State);

impl Backend {
    /// Copies the canvas to the window and presents it.
    pub fn present(&mut self, canvas: &Canvas) -> Result<(), Box<dyn Error>> {
        software::present(&mut self.0, canvas)
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        software::resize(&mut self.0, width, height);
    }

    pub fn cleanup(&mut self) {
        software::cleanup(&mut self.0);
    }
}

pub fn create_backend(window: Arc<Window>) -> Result<Backend, Box<dyn Error>> {
    Ok(Backend(software::init(window)?))
}
