//! Playfield → window coordinate mapping.
//!
//! Recorded cursor positions live in the game's 512x384 playfield. The offsets and
//! scale below center that playfield the way the game client does at 1366x768, which
//! makes the output line up when overlaid on a gameplay capture. They are calibrated
//! for that one resolution; a different window size needs new offsets and scale
//! (see `[Display]` in the config file).

use crate::game::replay::Mods;

pub const PLAYFIELD_HEIGHT: f32 = 384.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Playfield {
    pub width: u32,
    pub height: u32,
    pub x_offset: f32,
    pub y_offset: f32,
    pub scale: f32,
}

impl Default for Playfield {
    fn default() -> Self {
        Self::OSU_1366X768
    }
}

impl Playfield {
    pub const OSU_1366X768: Self = Self {
        width: 1366,
        height: 768,
        x_offset: 273.0,
        y_offset: 89.0,
        scale: 1.551,
    };

    /// Maps without clipping.
    #[inline(always)]
    pub fn map(&self, x: f32, y: f32, mods: Mods) -> (f32, f32) {
        let y = if mods.flips_vertically() {
            PLAYFIELD_HEIGHT - y
        } else {
            y
        };
        (
            (x + self.x_offset / self.scale) * self.scale,
            (y + self.y_offset / self.scale) * self.scale,
        )
    }

    /// Strictly inside the window; points on the border count as off-screen.
    #[inline(always)]
    pub fn contains(&self, sx: f32, sy: f32) -> bool {
        0.0 < sx && sx < self.width as f32 && 0.0 < sy && sy < self.height as f32
    }

    /// Maps and drops anything outside the window.
    #[inline(always)]
    pub fn to_screen(&self, x: f32, y: f32, mods: Mods) -> Option<(f32, f32)> {
        let (sx, sy) = self.map(x, y, mods);
        self.contains(sx, sy).then_some((sx, sy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PF: Playfield = Playfield::OSU_1366X768;

    #[test]
    fn playfield_origin_lands_on_offsets() {
        let (sx, sy) = PF.map(0.0, 0.0, Mods::empty());
        assert!((sx - 273.0).abs() < 1e-3, "sx={sx}");
        assert!((sy - 89.0).abs() < 1e-3, "sy={sy}");
    }

    #[test]
    fn playfield_fits_inside_the_window() {
        let (sx, sy) = PF.map(512.0, PLAYFIELD_HEIGHT, Mods::empty());
        assert!(PF.contains(sx, sy), "far corner mapped to {sx},{sy}");
    }

    #[test]
    fn mapping_is_deterministic() {
        let a = PF.map(123.5, 77.25, Mods::HIDDEN);
        let b = PF.map(123.5, 77.25, Mods::HIDDEN);
        assert_eq!(a, b);
    }

    #[test]
    fn hard_rock_mirrors_around_playfield_midline() {
        for y in [0.0, 12.0, 191.5, 192.0, 300.0, 384.0] {
            let flipped = PF.map(100.0, y, Mods::HARD_ROCK);
            let mirrored = PF.map(100.0, PLAYFIELD_HEIGHT - y, Mods::empty());
            assert!((flipped.1 - mirrored.1).abs() < 1e-3, "y={y}: {flipped:?} vs {mirrored:?}");
            assert_eq!(flipped.0, mirrored.0);

            let mid = PF.map(100.0, PLAYFIELD_HEIGHT / 2.0, Mods::empty()).1;
            let plain = PF.map(100.0, y, Mods::empty()).1;
            assert!(((flipped.1 - mid) + (plain - mid)).abs() < 1e-3);
        }
    }

    #[test]
    fn off_screen_points_are_dropped() {
        assert!(PF.to_screen(-1000.0, 10.0, Mods::empty()).is_none());
        assert!(PF.to_screen(10.0, 5000.0, Mods::empty()).is_none());
        assert!(PF.to_screen(256.0, 192.0, Mods::empty()).is_some());
    }

    #[test]
    fn border_counts_as_off_screen() {
        assert!(!PF.contains(0.0, 10.0));
        assert!(!PF.contains(10.0, PF.height as f32));
    }
}
