use rand::Rng;

/// 8-bit RGB triple.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Packs into the `0RGB` layout softbuffer expects.
    #[inline(always)]
    pub const fn to_u32(self) -> u32 {
        ((self.0 as u32) << 16) | ((self.1 as u32) << 8) | (self.2 as u32)
    }

    #[inline(always)]
    pub const fn from_u32(px: u32) -> Self {
        Self((px >> 16) as u8, (px >> 8) as u8, px as u8)
    }

    /// Linear blend towards `other`; `t` is clamped to 0..=1.
    #[inline(always)]
    pub fn lerp(self, other: Self, t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (f32::from(b) - f32::from(a)).mul_add(t, f32::from(a)).round() as u8;
        Self(mix(self.0, other.0), mix(self.1, other.1), mix(self.2, other.2))
    }
}

/// Accepts "#rgb" or "#rrggbb" (or without '#').
/// Panics on invalid input; use only with trusted literals.
pub const fn rgb_hex(s: &str) -> Rgb {
    let bytes = s.as_bytes();
    let (bytes, len) = if !bytes.is_empty() && bytes[0] == b'#' {
        let (_, rem) = bytes.split_at(1);
        (rem, s.len() - 1)
    } else {
        (bytes, s.len())
    };

    const fn val(b: u8) -> u8 {
        match b {
            b'0'..=b'9' => b - b'0',
            b'a'..=b'f' => 10 + (b - b'a'),
            b'A'..=b'F' => 10 + (b - b'A'),
            _ => panic!("invalid hex digit in color string"),
        }
    }
    const fn byte2(h: u8, l: u8) -> u8 {
        (val(h) << 4) | val(l)
    }
    const fn rep(n: u8) -> u8 {
        (val(n) << 4) | val(n)
    }

    match len {
        3 => Rgb(rep(bytes[0]), rep(bytes[1]), rep(bytes[2])),
        6 => Rgb(
            byte2(bytes[0], bytes[1]),
            byte2(bytes[2], bytes[3]),
            byte2(bytes[4], bytes[5]),
        ),
        _ => panic!("color hex string must be 3 or 6 digits"),
    }
}

pub const BLACK: Rgb = rgb_hex("#000000");
pub const WHITE: Rgb = rgb_hex("#ffffff");

/// Darkest channel value handed out; anything lower vanishes against the black background.
pub const MIN_CHANNEL: u8 = 64;

/// Random session color, each channel uniform in `[64, 256)`.
pub fn pick_color<R: Rng>(rng: &mut R) -> Rgb {
    Rgb(
        rng.random_range(MIN_CHANNEL..=u8::MAX),
        rng.random_range(MIN_CHANNEL..=u8::MAX),
        rng.random_range(MIN_CHANNEL..=u8::MAX),
    )
}
