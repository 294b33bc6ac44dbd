//! `.osr` replay reader.
//!
//! Only the fields the renderer needs survive decoding: player name, score, mods and
//! the cursor stream. Judgement counts, hashes and the life bar are read past and
//! dropped.

use crate::game::replay::{InputSample, Keys, Mods, ReplaySession};
use crate::ui::color::WHITE;
use std::io::Cursor;
use std::path::Path;
use thiserror::Error;

/// Frame delta that marks the trailing RNG seed rather than an input frame.
const RNG_SEED_DELTA: i64 = -12345;

/// Longest replay expanded to per-ms samples (six hours).
pub const MAX_REPLAY_MS: i64 = 6 * 60 * 60 * 1000;

#[derive(Debug, Error)]
pub enum OsrError {
    #[error("failed to read replay: {0}")]
    Io(#[from] std::io::Error),
    #[error("replay truncated at byte {offset} (needed {needed} more)")]
    Truncated { offset: usize, needed: usize },
    #[error("invalid string marker 0x{marker:02x} at byte {offset}")]
    BadStringMarker { offset: usize, marker: u8 },
    #[error("string at byte {offset} is not valid UTF-8")]
    BadUtf8 { offset: usize },
    #[error("ULEB128 length at byte {offset} overflows")]
    BadLength { offset: usize },
    #[error("negative compressed length {0}")]
    NegativeLength(i32),
    #[error("LZMA stream: {0}")]
    Lzma(String),
    #[error("malformed frame #{index}: {text:?}")]
    BadFrame { index: usize, text: String },
    #[error("replay runs to {last_ms} ms, longer than {max} ms", max = MAX_REPLAY_MS)]
    TooLong { last_ms: i64 },
}

/// Little-endian cursor over the replay bytes.
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    const fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], OsrError> {
        let remaining = self.data.len() - self.pos;
        if n > remaining {
            return Err(OsrError::Truncated {
                offset: self.pos,
                needed: n - remaining,
            });
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], OsrError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, OsrError> {
        Ok(self.array::<1>()?[0])
    }

    fn u16(&mut self) -> Result<u16, OsrError> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    fn i32(&mut self) -> Result<i32, OsrError> {
        Ok(i32::from_le_bytes(self.array()?))
    }

    fn i64(&mut self) -> Result<i64, OsrError> {
        Ok(i64::from_le_bytes(self.array()?))
    }

    fn uleb128(&mut self) -> Result<usize, OsrError> {
        let offset = self.pos;
        let mut value: usize = 0;
        let mut shift = 0u32;
        loop {
            let byte = self.u8()?;
            if shift >= usize::BITS {
                return Err(OsrError::BadLength { offset });
            }
            value |= usize::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
            shift += 7;
        }
    }

    /// `0x00` is an absent string, `0x0b` precedes a ULEB128 length and UTF-8 bytes.
    fn string(&mut self) -> Result<String, OsrError> {
        let offset = self.pos;
        match self.u8()? {
            0x00 => Ok(String::new()),
            0x0b => {
                let len = self.uleb128()?;
                let bytes = self.take(len)?;
                String::from_utf8(bytes.to_vec()).map_err(|_| OsrError::BadUtf8 { offset })
            }
            marker => Err(OsrError::BadStringMarker { offset, marker }),
        }
    }
}

/// One `w|x|y|z` entry with its delta already accumulated into absolute time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frame {
    pub time: i64,
    pub sample: InputSample,
}

pub fn read_file(path: &Path) -> Result<ReplaySession, OsrError> {
    let bytes = std::fs::read(path)?;
    decode(&bytes)
}

pub fn decode(bytes: &[u8]) -> Result<ReplaySession, OsrError> {
    let mut r = Reader::new(bytes);
    let _mode = r.u8()?;
    let _version = r.i32()?;
    let _beatmap_hash = r.string()?;
    let player = r.string()?;
    let _replay_hash = r.string()?;
    // 300s, 100s, 50s, gekis, katus, misses
    for _ in 0..6 {
        r.u16()?;
    }
    let score = r.i32()?;
    let _max_combo = r.u16()?;
    let _perfect = r.u8()?;
    let mods = Mods::from_bits_truncate(r.i32()? as u32);
    let _life_bar = r.string()?;
    let _timestamp = r.i64()?;
    let compressed_len = r.i32()?;
    let compressed_len =
        usize::try_from(compressed_len).map_err(|_| OsrError::NegativeLength(compressed_len))?;
    let compressed = r.take(compressed_len)?;
    // Anything after the payload (online score id) is not needed.

    let text = decompress(compressed)?;
    let frames = parse_frames(&text)?;
    Ok(ReplaySession {
        samples: expand_frames(&frames)?,
        player,
        score: score.max(0) as u32,
        mods,
        color: WHITE,
    })
}

fn decompress(data: &[u8]) -> Result<String, OsrError> {
    if data.is_empty() {
        return Ok(String::new());
    }
    let mut out = Vec::new();
    lzma_rs::lzma_decompress(&mut Cursor::new(data), &mut out)
        .map_err(|e| OsrError::Lzma(e.to_string()))?;
    Ok(String::from_utf8_lossy(&out).into_owned())
}

/// Parses the decompressed frame list, skipping the seed frame and empty entries.
pub fn parse_frames(text: &str) -> Result<Vec<Frame>, OsrError> {
    let mut frames = Vec::new();
    let mut time: i64 = 0;
    for (index, entry) in text.split(',').enumerate() {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let bad = || OsrError::BadFrame {
            index,
            text: entry.to_string(),
        };
        let mut fields = entry.split('|');
        let (Some(w), Some(x), Some(y), Some(z), None) = (
            fields.next(),
            fields.next(),
            fields.next(),
            fields.next(),
            fields.next(),
        ) else {
            return Err(bad());
        };
        let delta: i64 = w.trim().parse().map_err(|_| bad())?;
        if delta == RNG_SEED_DELTA {
            continue;
        }
        let x: f32 = x.trim().parse().map_err(|_| bad())?;
        let y: f32 = y.trim().parse().map_err(|_| bad())?;
        // Keys are written as integers but some writers emit "5.0".
        let z: f32 = z.trim().parse().map_err(|_| bad())?;
        time = time.checked_add(delta).ok_or_else(bad)?;
        frames.push(Frame {
            time,
            sample: InputSample {
                x,
                y,
                keys: Keys::from_bits_truncate(z as u8),
            },
        });
    }
    Ok(frames)
}

/// One sample per millisecond from 0 through the last frame's time. Each millisecond
/// takes the most recent frame at or before it; the first frame also covers any time
/// before it. Replays longer than [`MAX_REPLAY_MS`] are rejected before allocating.
pub fn expand_frames(frames: &[Frame]) -> Result<Vec<InputSample>, OsrError> {
    let Some(last) = frames.iter().map(|f| f.time).max() else {
        return Ok(Vec::new());
    };
    if last < 0 {
        return Ok(Vec::new());
    }
    if last > MAX_REPLAY_MS {
        return Err(OsrError::TooLong { last_ms: last });
    }
    let len = last as usize + 1;
    let mut samples = Vec::with_capacity(len);
    let mut idx = 0usize;
    for ms in 0..=last {
        while idx + 1 < frames.len() && frames[idx + 1].time <= ms {
            idx += 1;
        }
        samples.push(frames[idx].sample);
    }
    Ok(samples)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    fn push_string(out: &mut Vec<u8>, s: &str) {
        if s.is_empty() {
            out.push(0x00);
            return;
        }
        out.push(0x0b);
        let mut len = s.len();
        loop {
            let mut byte = (len & 0x7f) as u8;
            len >>= 7;
            if len != 0 {
                byte |= 0x80;
            }
            out.push(byte);
            if len == 0 {
                break;
            }
        }
        out.extend_from_slice(s.as_bytes());
    }

    /// Builds a complete replay file around the given frame text.
    pub(crate) fn build_osr(player: &str, score: i32, mods: u32, frames: &str) -> Vec<u8> {
        let mut payload = Vec::new();
        lzma_rs::lzma_compress(&mut Cursor::new(frames.as_bytes()), &mut payload)
            .expect("in-memory LZMA compression should not fail");

        let mut out = vec![0u8];
        out.extend_from_slice(&20_240_101i32.to_le_bytes());
        push_string(&mut out, "d41d8cd98f00b204e9800998ecf8427e");
        push_string(&mut out, player);
        push_string(&mut out, "");
        for n in [300u16, 20, 3, 40, 10, 1] {
            out.extend_from_slice(&n.to_le_bytes());
        }
        out.extend_from_slice(&score.to_le_bytes());
        out.extend_from_slice(&512u16.to_le_bytes());
        out.push(0);
        out.extend_from_slice(&(mods as i32).to_le_bytes());
        push_string(&mut out, "0|1,");
        out.extend_from_slice(&638_000_000_000_000_000i64.to_le_bytes());
        out.extend_from_slice(&(payload.len() as i32).to_le_bytes());
        out.extend_from_slice(&payload);
        out.extend_from_slice(&0i64.to_le_bytes());
        out
    }

    #[test]
    fn decodes_header_and_frames() {
        let bytes = build_osr("cookiezi", 123_456, 16 | 8, "0|256|-500|0,-1|256|-500|0,3|10|20|5,2|30|40|0,-12345|0|0|1337");
        let replay = decode(&bytes).expect("well-formed replay should decode");
        assert_eq!(replay.player, "cookiezi");
        assert_eq!(replay.score, 123_456);
        assert_eq!(replay.mods, Mods::HARD_ROCK | Mods::HIDDEN);
        // frame times: 0, -1, 2, 4
        assert_eq!(replay.len(), 5);
        assert_eq!(replay.samples[1].x, 256.0, "ms 1 still holds the opening frame");
        assert_eq!(replay.samples[2].x, 10.0);
        assert_eq!(replay.samples[2].buttons(), [true, false, false, false]);
        assert_eq!(replay.samples[3].x, 10.0);
        assert_eq!(replay.samples[4].y, 40.0);
    }

    #[test]
    fn truncated_file_reports_offset() {
        let bytes = build_osr("p", 1, 0, "1|1|1|0,");
        let err = decode(&bytes[..30]).expect_err("cut file must not decode");
        assert!(matches!(err, OsrError::Truncated { .. }), "got {err}");
    }

    #[test]
    fn rejects_unknown_string_marker() {
        let mut bytes = build_osr("p", 1, 0, "1|1|1|0,");
        // First string marker sits right after mode + version.
        bytes[5] = 0x07;
        let err = decode(&bytes).expect_err("bad marker");
        assert!(matches!(err, OsrError::BadStringMarker { offset: 5, marker: 0x07 }));
    }

    #[test]
    fn long_strings_use_multi_byte_lengths() {
        let name = "x".repeat(300);
        let bytes = build_osr(&name, 1, 0, "1|1|1|0,");
        assert_eq!(decode(&bytes).expect("decodes").player, name);
    }

    #[test]
    fn frame_parser_accepts_float_keys_and_skips_blanks() {
        let frames = parse_frames("5|1.5|2.5|5.0,,  ,7|3|4|10,").expect("parses");
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].time, 5);
        assert_eq!(frames[1].time, 12);
        assert_eq!(frames[0].sample.keys, Keys::M1 | Keys::K1);
        assert_eq!(frames[1].sample.keys, Keys::M2 | Keys::K2);
    }

    #[test]
    fn frame_parser_rejects_garbage() {
        assert!(matches!(
            parse_frames("1|2|3"),
            Err(OsrError::BadFrame { index: 0, .. })
        ));
        assert!(parse_frames("1|a|3|0").is_err());
        assert!(parse_frames("1|2|3|0|9").is_err());
    }

    #[test]
    fn expansion_holds_previous_frame() {
        let frames = parse_frames("0|0|0|0,3|9|9|0").expect("parses");
        let samples = expand_frames(&frames).expect("short replay expands");
        assert_eq!(samples.len(), 4);
        assert_eq!(samples.iter().map(|s| s.x).collect::<Vec<_>>(), [0.0, 0.0, 0.0, 9.0]);
    }

    #[test]
    fn expansion_of_nothing_is_empty() {
        assert!(expand_frames(&[]).expect("nothing to expand").is_empty());
        let frames = parse_frames("-5|1|1|0").expect("parses");
        assert!(expand_frames(&frames).expect("negative times only").is_empty());
    }

    #[test]
    fn overflowing_frame_time_is_rejected() {
        let err = parse_frames("9223372036854775807|0|0|0,1|0|0|0").expect_err("time overflows");
        assert!(matches!(err, OsrError::BadFrame { index: 1, .. }), "got {err}");
    }

    #[test]
    fn absurdly_long_replay_is_rejected_before_allocating() {
        let frames = parse_frames("0|1|1|0,200000000000|1|1|0").expect("parses");
        let err = expand_frames(&frames).expect_err("too long to expand");
        assert!(matches!(err, OsrError::TooLong { last_ms: 200_000_000_000 }));
    }

    #[test]
    fn oversized_replay_fails_to_decode() {
        let bytes = build_osr("p", 1, 0, "0|1|1|0,200000000000|1|1|0");
        assert!(matches!(decode(&bytes), Err(OsrError::TooLong { .. })));
    }
}
