use crate::ui::color::Rgb;
use bitflags::bitflags;

bitflags! {
    /// Gameplay modifiers as stored in the replay header.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Mods: u32 {
        const NO_FAIL = 1;
        const EASY = 1 << 1;
        const TOUCH_DEVICE = 1 << 2;
        const HIDDEN = 1 << 3;
        const HARD_ROCK = 1 << 4;
        const SUDDEN_DEATH = 1 << 5;
        const DOUBLE_TIME = 1 << 6;
        const RELAX = 1 << 7;
        const HALF_TIME = 1 << 8;
        const NIGHTCORE = 1 << 9;
        const FLASHLIGHT = 1 << 10;
        const AUTOPLAY = 1 << 11;
        const SPUN_OUT = 1 << 12;
        const AUTOPILOT = 1 << 13;
        const PERFECT = 1 << 14;
    }
}

impl Mods {
    /// Hard Rock mirrors the playfield top to bottom.
    #[inline(always)]
    pub const fn flips_vertically(self) -> bool {
        self.contains(Self::HARD_ROCK)
    }
}

bitflags! {
    /// Raw key mask of one replay frame.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Keys: u8 {
        const M1 = 1;
        const M2 = 1 << 1;
        const K1 = 1 << 2;
        const K2 = 1 << 3;
        const SMOKE = 1 << 4;
    }
}

/// Number of indicator squares drawn per session.
pub const BUTTON_COUNT: usize = 4;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct InputSample {
    pub x: f32,
    pub y: f32,
    pub keys: Keys,
}

impl InputSample {
    /// Button states in indicator order: K1, K2, M1, M2.
    ///
    /// A keyboard press also sets the matching mouse bit in the raw mask, so the
    /// mouse flag is only reported when its keyboard twin is up.
    pub fn buttons(&self) -> [bool; BUTTON_COUNT] {
        let k1 = self.keys.contains(Keys::K1);
        let k2 = self.keys.contains(Keys::K2);
        [
            k1,
            k2,
            self.keys.contains(Keys::M1) && !k1,
            self.keys.contains(Keys::M2) && !k2,
        ]
    }
}

/// One decoded replay, indexed by milliseconds since the start of the song.
#[derive(Clone, Debug)]
pub struct ReplaySession {
    pub samples: Vec<InputSample>,
    pub player: String,
    pub score: u32,
    pub mods: Mods,
    pub color: Rgb,
}

impl ReplaySession {
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
