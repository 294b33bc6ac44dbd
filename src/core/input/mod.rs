//! Mouse/keyboard → live render parameter changes.
//!
//! `RenderParams` is the only state that changes while a replay is playing. It is owned
//! by the playback screen and written exclusively through [`apply`]; drawing only reads
//! it. Everything runs on the event-loop thread, so there is no locking. Moving input
//! polling to another thread would need a lock around it.

use winit::event::{ElementState, KeyEvent, MouseButton, MouseScrollDelta};
use winit::keyboard::{KeyCode, ModifiersState, PhysicalKey};

/// Milliseconds of trail added or removed per wheel notch.
pub const TRAIL_STEP: u32 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderParams {
    pub trail_length: u32,
    pub marker_radius: u32,
    pub wipe_each_frame: bool,
}

impl Default for RenderParams {
    fn default() -> Self {
        Self {
            trail_length: 100,
            marker_radius: 5,
            wipe_each_frame: true,
        }
    }
}

impl RenderParams {
    /// Window title reflecting the adjustable sizes.
    pub fn title(&self) -> String {
        format!("radius={} tail={}", self.marker_radius, self.trail_length)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputAction {
    GrowMarker,
    ShrinkMarker,
    LengthenTrail,
    ShortenTrail,
    ToggleWipe,
    Quit,
}

/// Applies one action. Returns `true` when a parameter changed.
pub fn apply(params: &mut RenderParams, action: InputAction) -> bool {
    let before = *params;
    match action {
        InputAction::GrowMarker => params.marker_radius = params.marker_radius.saturating_add(1),
        InputAction::ShrinkMarker => params.marker_radius = params.marker_radius.saturating_sub(1),
        InputAction::LengthenTrail => {
            params.trail_length = params.trail_length.saturating_add(TRAIL_STEP);
        }
        InputAction::ShortenTrail => {
            params.trail_length = params.trail_length.saturating_sub(TRAIL_STEP);
        }
        InputAction::ToggleWipe => params.wipe_each_frame = !params.wipe_each_frame,
        InputAction::Quit => {}
    }
    *params != before
}

#[inline(always)]
pub fn map_mouse_button(state: ElementState, button: MouseButton) -> Option<InputAction> {
    if state != ElementState::Pressed {
        return None;
    }
    match button {
        MouseButton::Left => Some(InputAction::GrowMarker),
        MouseButton::Right => Some(InputAction::ShrinkMarker),
        MouseButton::Middle => Some(InputAction::ToggleWipe),
        _ => None,
    }
}

/// One wheel event is one notch regardless of how far the device reports it moved.
#[inline(always)]
pub fn map_wheel(delta: MouseScrollDelta) -> Option<InputAction> {
    let dy = match delta {
        MouseScrollDelta::LineDelta(_, y) => f64::from(y),
        MouseScrollDelta::PixelDelta(pos) => pos.y,
    };
    if dy > 0.0 {
        Some(InputAction::LengthenTrail)
    } else if dy < 0.0 {
        Some(InputAction::ShortenTrail)
    } else {
        None
    }
}

pub fn map_key_event(ev: &KeyEvent, modifiers: ModifiersState) -> Option<InputAction> {
    let PhysicalKey::Code(code) = ev.physical_key else {
        return None;
    };
    map_key(code, ev.state, modifiers.control_key())
}

/// Escape or Ctrl+C quits; every other key is ignored.
#[inline(always)]
pub fn map_key(code: KeyCode, state: ElementState, ctrl: bool) -> Option<InputAction> {
    if state != ElementState::Pressed {
        return None;
    }
    match code {
        KeyCode::Escape => Some(InputAction::Quit),
        KeyCode::KeyC if ctrl => Some(InputAction::Quit),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::dpi::PhysicalPosition;

    #[test]
    fn clicks_adjust_marker_radius() {
        let mut p = RenderParams::default();
        assert_eq!(p.marker_radius, 5);
        for _ in 0..3 {
            let a = map_mouse_button(ElementState::Pressed, MouseButton::Left).expect("left maps");
            assert!(apply(&mut p, a));
        }
        let a = map_mouse_button(ElementState::Pressed, MouseButton::Right).expect("right maps");
        apply(&mut p, a);
        assert_eq!(p.marker_radius, 7);
    }

    #[test]
    fn radius_never_goes_negative() {
        let mut p = RenderParams {
            marker_radius: 0,
            ..RenderParams::default()
        };
        assert!(!apply(&mut p, InputAction::ShrinkMarker));
        assert_eq!(p.marker_radius, 0);
    }

    #[test]
    fn scrolling_adjusts_trail_in_steps_of_ten() {
        let mut p = RenderParams::default();
        let down = map_wheel(MouseScrollDelta::LineDelta(0.0, -1.0)).expect("wheel down maps");
        apply(&mut p, down);
        assert_eq!(p.trail_length, 90);

        let up = map_wheel(MouseScrollDelta::PixelDelta(PhysicalPosition::new(0.0, 42.0)))
            .expect("pixel scroll up maps");
        apply(&mut p, up);
        assert_eq!(p.trail_length, 100);
    }

    #[test]
    fn trail_clamps_at_zero() {
        let mut p = RenderParams {
            trail_length: 5,
            ..RenderParams::default()
        };
        for _ in 0..10 {
            apply(&mut p, InputAction::ShortenTrail);
        }
        assert_eq!(p.trail_length, 0);
    }

    #[test]
    fn middle_click_toggles_wipe() {
        let mut p = RenderParams::default();
        let a = map_mouse_button(ElementState::Pressed, MouseButton::Middle).expect("middle maps");
        apply(&mut p, a);
        assert!(!p.wipe_each_frame);
        apply(&mut p, a);
        assert!(p.wipe_each_frame);
    }

    #[test]
    fn releases_and_sideways_scroll_do_nothing() {
        assert_eq!(map_mouse_button(ElementState::Released, MouseButton::Left), None);
        assert_eq!(map_mouse_button(ElementState::Pressed, MouseButton::Back), None);
        assert_eq!(map_wheel(MouseScrollDelta::LineDelta(3.0, 0.0)), None);
    }

    #[test]
    fn quit_keys() {
        assert_eq!(map_key(KeyCode::Escape, ElementState::Pressed, false), Some(InputAction::Quit));
        assert_eq!(map_key(KeyCode::KeyC, ElementState::Pressed, true), Some(InputAction::Quit));
        assert_eq!(map_key(KeyCode::KeyC, ElementState::Pressed, false), None);
        assert_eq!(map_key(KeyCode::Escape, ElementState::Released, false), None);
    }

    #[test]
    fn quit_leaves_params_alone() {
        let mut p = RenderParams::default();
        assert!(!apply(&mut p, InputAction::Quit));
        assert_eq!(p, RenderParams::default());
    }

    #[test]
    fn title_shows_radius_and_tail() {
        assert_eq!(RenderParams::default().title(), "radius=5 tail=100");
    }
}
