use crate::config::Config;
use crate::core::audio::Player;
use crate::core::gfx::{self as renderer, Canvas, create_backend};
use crate::core::input::{self, InputAction, RenderParams};
use crate::game::replay::ReplaySession;
use crate::screens::{ExitReason, ScreenAction, playback};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::ModifiersState,
    window::Window,
};

use log::{error, info};
use std::{
    error::Error,
    io::Write,
    sync::Arc,
    time::{Duration, Instant},
};

/* -------------------- fps reporting -------------------- */
struct FpsCounter {
    frames: u32,
    since: Instant,
    interval: Duration,
}

impl FpsCounter {
    fn new(interval_ms: u64) -> Self {
        Self {
            frames: 0,
            since: Instant::now(),
            interval: Duration::from_millis(interval_ms.max(1)),
        }
    }

    /// Counts a frame; returns the rate once per interval.
    #[inline(always)]
    fn tick(&mut self, now: Instant) -> Option<f32> {
        self.frames += 1;
        let elapsed = now.duration_since(self.since);
        if elapsed < self.interval {
            return None;
        }
        let fps = self.frames as f32 / elapsed.as_secs_f32();
        self.frames = 0;
        self.since = now;
        Some(fps)
    }
}

fn report_fps(fps: f32) {
    let mut err = std::io::stderr().lock();
    let _ = write!(err, "{fps:5.0} fps\r");
    let _ = err.flush();
}

/// Everything the window shell needs besides the window itself.
pub struct AppState {
    screen: playback::State,
    player: Player,
    canvas: Canvas,
    fps: FpsCounter,
    modifiers: ModifiersState,
    exit_reason: Option<ExitReason>,
}

pub struct App {
    window: Option<Arc<Window>>,
    backend: Option<renderer::Backend>,
    startup_error: Option<String>,
    state: AppState,
}

impl AppState {
    fn new(sessions: Vec<ReplaySession>, player: Player, params: RenderParams, config: &Config) -> Self {
        let screen = playback::init(sessions, params, config);
        let canvas = Canvas::new(
            screen.playfield.width,
            screen.playfield.height,
            playback::BACKGROUND,
        );
        Self {
            screen,
            player,
            canvas,
            fps: FpsCounter::new(config.fps_report_ms),
            modifiers: ModifiersState::empty(),
            exit_reason: None,
        }
    }
}

impl App {
    fn new(sessions: Vec<ReplaySession>, player: Player, params: RenderParams, config: &Config) -> Self {
        Self {
            window: None,
            backend: None,
            startup_error: None,
            state: AppState::new(sessions, player, params, config),
        }
    }

    fn handle_action(&mut self, action: ScreenAction, event_loop: &ActiveEventLoop) {
        match action {
            ScreenAction::SetTitle(title) => {
                if let Some(window) = &self.window {
                    window.set_title(&title);
                }
            }
            ScreenAction::Exit(reason) => {
                if self.state.exit_reason.is_none() {
                    info!("Playback stopped: {reason:?}");
                    self.state.exit_reason = Some(reason);
                }
                event_loop.exit();
            }
            ScreenAction::None => {}
        }
    }

    fn route_input(&mut self, event_loop: &ActiveEventLoop, action: Option<InputAction>) {
        if let Some(action) = action {
            let result = playback::handle_input(&mut self.state.screen, action);
            self.handle_action(result, event_loop);
        }
    }

    fn init_graphics(&mut self, event_loop: &ActiveEventLoop) -> Result<(), Box<dyn Error>> {
        let width = self.state.screen.playfield.width;
        let height = self.state.screen.playfield.height;
        let window_attributes = Window::default_attributes()
            .with_title(self.state.screen.params.title())
            .with_inner_size(PhysicalSize::new(width, height))
            .with_resizable(false)
            .with_transparent(false);

        let window = Arc::new(event_loop.create_window(window_attributes)?);
        let backend = create_backend(window.clone())?;

        self.window = Some(window);
        self.backend = Some(backend);
        info!("Starting event loop ({width}x{height})...");
        Ok(())
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let action = playback::update(&mut self.state.screen, self.state.player.is_busy());
        if matches!(action, ScreenAction::Exit(_)) {
            self.handle_action(action, event_loop);
            return;
        }

        let position = self.state.player.position_ms();
        playback::draw(&self.state.screen, position, &mut self.state.canvas);

        if let Some(backend) = &mut self.backend
            && let Err(e) = backend.present(&self.state.canvas)
        {
            error!("Failed to present frame: {e}");
            self.startup_error = Some(e.to_string());
            event_loop.exit();
            return;
        }

        if let Some(fps) = self.state.fps.tick(Instant::now()) {
            report_fps(fps);
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none()
            && let Err(e) = self.init_graphics(event_loop)
        {
            error!("Failed to initialize graphics: {e}");
            self.startup_error = Some(e.to_string());
            event_loop.exit();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let Some(window) = self.window.as_ref().cloned() else { return; };
        if window_id != window.id() { return; }

        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested. Shutting down.");
                let action = playback::handle_close(&mut self.state.screen);
                self.handle_action(action, event_loop);
            }
            WindowEvent::Resized(new_size) => {
                if let Some(backend) = &mut self.backend {
                    backend.resize(new_size.width, new_size.height);
                }
            }
            WindowEvent::ModifiersChanged(modifiers) => {
                self.state.modifiers = modifiers.state();
            }
            WindowEvent::KeyboardInput { event: key_event, .. } => {
                let action = input::map_key_event(&key_event, self.state.modifiers);
                self.route_input(event_loop, action);
            }
            WindowEvent::MouseInput { state, button, .. } => {
                self.route_input(event_loop, input::map_mouse_button(state, button));
            }
            WindowEvent::MouseWheel { delta, .. } => {
                self.route_input(event_loop, input::map_wheel(delta));
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(backend) = &mut self.backend {
            backend.cleanup();
        }
        // Leave the cursor on a fresh line after the carriage-return fps reports.
        eprintln!();
    }
}

/// Opens the window and plays until the track ends or the user quits.
pub fn run(
    sessions: Vec<ReplaySession>,
    player: Player,
    params: RenderParams,
    config: &Config,
) -> Result<ExitReason, Box<dyn Error>> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(sessions, player, params, config);
    event_loop.run_app(&mut app)?;

    if let Some(e) = app.startup_error {
        return Err(e.into());
    }
    Ok(app.state.exit_reason.unwrap_or(ExitReason::UserQuit))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fps_counter_reports_once_per_interval() {
        let mut fps = FpsCounter::new(100);
        let start = fps.since;
        assert_eq!(fps.tick(start + Duration::from_millis(10)), None);
        assert_eq!(fps.tick(start + Duration::from_millis(50)), None);
        let rate = fps.tick(start + Duration::from_millis(100)).unwrap_or_default();
        assert!((rate - 30.0).abs() < 1e-3, "3 frames in 100ms, got {rate}");
        assert_eq!(fps.frames, 0);
        assert_eq!(fps.tick(start + Duration::from_millis(150)), None);
    }

    #[test]
    fn zero_interval_is_clamped() {
        let fps = FpsCounter::new(0);
        assert_eq!(fps.interval, Duration::from_millis(1));
    }
}
