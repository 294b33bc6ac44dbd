use crate::config::Config;
use crate::core::gfx::Canvas;
use crate::core::input::{self, InputAction, RenderParams};
use crate::core::space::Playfield;
use crate::game::replay::{BUTTON_COUNT, ReplaySession};
use crate::game::sampler;
use crate::screens::{ExitReason, ScreenAction};
use crate::ui::color::{BLACK, Rgb};

pub const BACKGROUND: Rgb = BLACK;

/// Columns reserved for the key strip; one more than there are buttons.
const KEY_STRIP_COLUMNS: f32 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Playing,
    Stopped(ExitReason),
}

pub struct State {
    pub sessions: Vec<ReplaySession>,
    pub params: RenderParams,
    pub playfield: Playfield,
    /// Edge length of one key indicator square, fixed for the run.
    pub key_size: f32,
    phase: Phase,
}

/// Square size that fits five columns right of `strip_left` and one row per session.
pub fn key_size(width: u32, height: u32, strip_left: u32, sessions: usize) -> f32 {
    let by_width = width.saturating_sub(strip_left) as f32 / KEY_STRIP_COLUMNS;
    let by_height = height as f32 / sessions.max(1) as f32;
    by_width.min(by_height)
}

pub fn init(sessions: Vec<ReplaySession>, params: RenderParams, config: &Config) -> State {
    let playfield = config.playfield;
    let key_size = key_size(
        playfield.width,
        playfield.height,
        config.key_strip_left,
        sessions.len(),
    );
    State {
        sessions,
        params,
        playfield,
        key_size,
        phase: Phase::Playing,
    }
}

impl State {
    #[cfg(test)]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    fn stop(&mut self, reason: ExitReason) -> ScreenAction {
        if self.phase == Phase::Playing {
            self.phase = Phase::Stopped(reason);
        }
        match self.phase {
            Phase::Stopped(reason) => ScreenAction::Exit(reason),
            Phase::Playing => ScreenAction::None,
        }
    }
}

pub fn handle_input(state: &mut State, action: InputAction) -> ScreenAction {
    if action == InputAction::Quit {
        return state.stop(ExitReason::UserQuit);
    }
    if input::apply(&mut state.params, action) {
        ScreenAction::SetTitle(state.params.title())
    } else {
        ScreenAction::None
    }
}

/// Window close behaves like any other quit request.
pub fn handle_close(state: &mut State) -> ScreenAction {
    state.stop(ExitReason::UserQuit)
}

/// Follows the audio clock: once it stops being busy the song is over.
pub fn update(state: &mut State, audio_busy: bool) -> ScreenAction {
    if !audio_busy {
        return state.stop(ExitReason::TrackEnded);
    }
    ScreenAction::None
}

/// Draws one frame for `position` (ms into the song).
pub fn draw(state: &State, position: i64, canvas: &mut Canvas) {
    let params = &state.params;
    if params.wipe_each_frame {
        canvas.clear(BACKGROUND);
    }

    if params.trail_length > 0 {
        for session in &state.sessions {
            let trail = sampler::trail(session, position, params.trail_length, &state.playfield);
            canvas.polyline(trail, session.color);
        }
    }

    if params.marker_radius > 0 {
        for session in &state.sessions {
            let Some(sample) = sampler::sample_at(session, position) else {
                continue;
            };
            let Some((sx, sy)) = state.playfield.to_screen(sample.x, sample.y, session.mods) else {
                continue;
            };
            let (x, y) = (sx.round() as i32, sy.round() as i32);
            canvas.fill_circle(x, y, params.marker_radius, session.color);
            canvas.aa_circle(x, y, params.marker_radius, BACKGROUND);
        }
    }

    draw_key_strip(state, position, canvas);
}

fn draw_key_strip(state: &State, position: i64, canvas: &mut Canvas) {
    let size = state.key_size;
    let left = state.playfield.width as f32 - size * KEY_STRIP_COLUMNS;
    for (row, session) in state.sessions.iter().enumerate() {
        let Some(sample) = sampler::sample_at(session, position) else {
            continue;
        };
        let y = row as f32 * size;
        for (col, pressed) in sample.buttons().into_iter().enumerate().take(BUTTON_COUNT) {
            let x = left + col as f32 * size;
            let color = if pressed { session.color } else { BACKGROUND };
            canvas.fill_rect(x, y, size, size, color);
        }
    }
}
