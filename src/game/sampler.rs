use crate::core::space::Playfield;
use crate::game::replay::{InputSample, Mods, ReplaySession};

/// Sample under the playback cursor, `None` once the replay has run out (or before it starts).
#[inline(always)]
pub fn sample_at(session: &ReplaySession, position: i64) -> Option<&InputSample> {
    usize::try_from(position)
        .ok()
        .and_then(|i| session.samples.get(i))
}

/// Raw sample range covered by a trail of `tail` ms ending just before `position`.
#[inline(always)]
pub fn trail_window(len: usize, position: i64, tail: u32) -> std::ops::Range<usize> {
    if tail == 0 || position <= 0 {
        return 0..0;
    }
    let end = usize::try_from(position).map_or(len, |p| p.min(len));
    let start = usize::try_from(position - i64::from(tail))
        .unwrap_or(0)
        .min(end);
    start..end
}

/// Screen-space trail points, oldest first, with off-screen points and repeats removed.
/// Cloning restarts the walk from the same window.
#[derive(Clone)]
pub struct Trail<'a> {
    samples: &'a [InputSample],
    next: usize,
    end: usize,
    mods: Mods,
    playfield: &'a Playfield,
    last: Option<(f32, f32)>,
}

pub fn trail<'a>(
    session: &'a ReplaySession,
    position: i64,
    tail: u32,
    playfield: &'a Playfield,
) -> Trail<'a> {
    let window = trail_window(session.len(), position, tail);
    Trail {
        samples: &session.samples,
        next: window.start,
        end: window.end,
        mods: session.mods,
        playfield,
        last: None,
    }
}

impl Iterator for Trail<'_> {
    type Item = (f32, f32);

    fn next(&mut self) -> Option<Self::Item> {
        while self.next < self.end {
            let s = &self.samples[self.next];
            self.next += 1;
            let Some(point) = self.playfield.to_screen(s.x, s.y, self.mods) else {
                continue;
            };
            if self.last == Some(point) {
                continue;
            }
            self.last = Some(point);
            return Some(point);
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.end - self.next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::replay::Keys;
    use crate::ui::color::WHITE;

    fn session(samples: Vec<InputSample>) -> ReplaySession {
        ReplaySession {
            samples,
            player: "tester".to_string(),
            score: 0,
            mods: Mods::empty(),
            color: WHITE,
        }
    }

    /// A cursor that moves one playfield unit right every ms, so no two samples collapse.
    fn moving(len: usize) -> ReplaySession {
        session(
            (0..len)
                .map(|i| InputSample {
                    x: (i % 500) as f32,
                    y: 100.0,
                    keys: Keys::empty(),
                })
                .collect(),
        )
    }

    #[test]
    fn sample_at_bounds() {
        let s = moving(10);
        assert!(sample_at(&s, -1).is_none());
        assert!(sample_at(&s, 10).is_none());
        assert!(sample_at(&s, i64::MAX).is_none());
        for p in 0..10 {
            assert_eq!(sample_at(&s, p).map(|x| x.x), Some(p as f32));
        }
    }

    #[test]
    fn zero_tail_is_always_empty() {
        let s = moving(500);
        let pf = Playfield::default();
        for p in [-5, 0, 1, 50, 499, 500, 10_000] {
            assert_eq!(trail(&s, p, 0, &pf).count(), 0, "position {p}");
        }
    }

    #[test]
    fn window_clamps_at_zero() {
        assert_eq!(trail_window(500, 50, 100), 0..50);
        let s = moving(500);
        let pf = Playfield::default();
        assert_eq!(trail(&s, 50, 100, &pf).count(), 50);
    }

    #[test]
    fn window_clamps_at_end_and_never_exceeds_tail() {
        assert_eq!(trail_window(500, 450, 100), 350..450);
        assert_eq!(trail_window(500, 900, 100), 500..500);
        assert_eq!(trail_window(500, 520, 100), 420..500);
        assert_eq!(trail_window(500, -3, 100), 0..0);
        for (len, pos, tail) in [(500usize, 250i64, 30u32), (10, 5, 1000), (0, 10, 10)] {
            let w = trail_window(len, pos, tail);
            assert!(w.len() <= tail as usize);
            assert!(w.end <= len);
        }
    }

    #[test]
    fn held_cursor_collapses_to_one_point() {
        let still = session(vec![
            InputSample {
                x: 50.0,
                y: 50.0,
                keys: Keys::empty(),
            };
            40
        ]);
        let pf = Playfield::default();
        assert_eq!(trail(&still, 40, 100, &pf).count(), 1);
    }

    #[test]
    fn off_screen_samples_are_skipped() {
        let mut samples = vec![
            InputSample {
                x: 10.0,
                y: 10.0,
                keys: Keys::empty(),
            };
            3
        ];
        samples[1].x = -5000.0;
        samples[2].x = 20.0;
        let s = session(samples);
        let pf = Playfield::default();
        let pts: Vec<_> = trail(&s, 3, 10, &pf).collect();
        assert_eq!(pts.len(), 2);
        assert!(pts.iter().all(|&(x, y)| pf.contains(x, y)));
    }

    #[test]
    fn trail_is_restartable() {
        let s = moving(200);
        let pf = Playfield::default();
        let t = trail(&s, 150, 40, &pf);
        let first: Vec<_> = t.clone().collect();
        let second: Vec<_> = t.collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 40);
        assert!(first.windows(2).all(|w| w[0].0 < w[1].0), "points must be oldest first");
    }
}
