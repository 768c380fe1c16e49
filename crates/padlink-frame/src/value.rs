//! Packing of wide values into 7-bit-clean payload bytes.
//!
//! Anything whose natural range exceeds 127 (indices, millisecond durations,
//! 8-bit color channels) is split into a high/low pair of 7-bit bytes,
//! high-order first. Inputs are clamped, so every function here is total.

use serde::{Deserialize, Serialize};

/// Largest value a 14-bit pair can carry.
pub const MAX_14BIT: u16 = 0x3FFF;

/// Split a 0..=16383 value into `(high7, low7)`. Larger values clamp.
pub fn pack14(value: u16) -> (u8, u8) {
    let value = value.min(MAX_14BIT);
    (((value >> 7) & 0x7F) as u8, (value & 0x7F) as u8)
}

/// Join a `(high7, low7)` pair. Bit 7 of either byte is ignored.
pub fn unpack14(hi: u8, lo: u8) -> u16 {
    (((hi & 0x7F) as u16) << 7) | (lo & 0x7F) as u16
}

/// Pack a 14-bit value and return the pair as an array, for `extend_from_slice`.
pub fn pack14_array(value: u16) -> [u8; 2] {
    let (hi, lo) = pack14(value);
    [hi, lo]
}

/// A 24-bit color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Scale every channel by `num / den`, e.g. `dim(1, 8)` for an empty pad.
    pub fn dim(self, num: u8, den: u8) -> Self {
        let den = den.max(1) as u16;
        let scale = |c: u8| ((c as u16 * num as u16) / den).min(255) as u8;
        Self::new(scale(self.r), scale(self.g), scale(self.b))
    }
}

impl From<(u8, u8, u8)> for Rgb {
    fn from((r, g, b): (u8, u8, u8)) -> Self {
        Self::new(r, g, b)
    }
}

/// Full-fidelity color: each channel as a 14-bit pair, six bytes total.
pub fn pack_rgb24(r: u8, g: u8, b: u8) -> [u8; 6] {
    let (rh, rl) = pack14(r as u16);
    let (gh, gl) = pack14(g as u16);
    let (bh, bl) = pack14(b as u16);
    [rh, rl, gh, gl, bh, bl]
}

/// Inverse of [`pack_rgb24`]. Returns `None` when fewer than six bytes are given.
pub fn unpack_rgb24(data: &[u8]) -> Option<Rgb> {
    let data = data.get(..6)?;
    let channel = |hi: u8, lo: u8| unpack14(hi, lo).min(255) as u8;
    Some(Rgb::new(
        channel(data[0], data[1]),
        channel(data[2], data[3]),
        channel(data[4], data[5]),
    ))
}

/// Lossy color: each channel halved into one byte.
///
/// Half the bandwidth of [`pack_rgb24`]; the low bit of every channel is lost.
pub fn pack_rgb_compact(r: u8, g: u8, b: u8) -> [u8; 3] {
    [r >> 1, g >> 1, b >> 1]
}

/// The host's 16-entry color palette.
pub const PALETTE: [Rgb; 16] = [
    Rgb::new(255, 76, 76),
    Rgb::new(255, 165, 76),
    Rgb::new(255, 255, 76),
    Rgb::new(165, 255, 76),
    Rgb::new(76, 255, 76),
    Rgb::new(76, 255, 165),
    Rgb::new(76, 255, 255),
    Rgb::new(76, 165, 255),
    Rgb::new(76, 76, 255),
    Rgb::new(165, 76, 255),
    Rgb::new(255, 76, 255),
    Rgb::new(255, 76, 165),
    Rgb::new(127, 127, 127),
    Rgb::new(255, 255, 255),
    Rgb::new(50, 50, 50),
    Rgb::new(0, 0, 0),
];

/// Index of the palette entry closest to `color` (squared RGB distance).
/// Ties resolve to the lower index.
pub fn nearest_palette_index(color: Rgb) -> u8 {
    let distance = |p: &Rgb| {
        let d = |a: u8, b: u8| (a as i32 - b as i32).pow(2);
        d(color.r, p.r) + d(color.g, p.g) + d(color.b, p.b)
    };
    PALETTE
        .iter()
        .enumerate()
        .min_by_key(|(_, p)| distance(p))
        .map(|(i, _)| i as u8)
        .unwrap_or(0)
}

/// Map a normalized level (0.0..=1.0) onto 0..=127. NaN maps to 0.
pub fn pack_level(level: f32) -> u8 {
    if level.is_nan() {
        return 0;
    }
    (level.clamp(0.0, 1.0) * 127.0).round() as u8
}

/// Inverse of [`pack_level`].
pub fn unpack_level(value: u8) -> f32 {
    (value & 0x7F) as f32 / 127.0
}

pub fn pack_bool(value: bool) -> u8 {
    u8::from(value)
}

/// Text as at most `max_len` ASCII bytes; anything else becomes `?`.
pub fn pack_ascii(text: &str, max_len: usize) -> Vec<u8> {
    text.chars()
        .take(max_len)
        .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
        .collect()
}
