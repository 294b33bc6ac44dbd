use crate::core::gfx::Canvas;
use log::info;
use std::{error::Error, num::NonZeroU32, sync::Arc};
use winit::{dpi::PhysicalSize, window::Window};

pub struct State {
    _context: softbuffer::Context<Arc<Window>>,
    surface: softbuffer::Surface<Arc<Window>, Arc<Window>>,
    window_size: PhysicalSize<u32>,
}

pub fn init(window: Arc<Window>) -> Result<State, Box<dyn Error>> {
    info!("Initializing software presenter (softbuffer)...");

    let window_size = window.inner_size();
    let context = softbuffer::Context::new(window.clone())?;
    let surface = softbuffer::Surface::new(&context, window)?;

    Ok(State {
        _context: context,
        surface,
        window_size,
    })
}

/// Copies the canvas into the surface buffer. A surface larger than the canvas is
/// padded with black; a smaller one shows the top-left part.
pub fn present(state: &mut State, canvas: &Canvas) -> Result<(), Box<dyn Error>> {
    let PhysicalSize { width, height } = state.window_size;
    let (Some(resize_w), Some(resize_h)) = (NonZeroU32::new(width), NonZeroU32::new(height))
    else {
        return Ok(());
    };
    state.surface.resize(resize_w, resize_h)?;

    let mut buffer = state.surface.buffer_mut()?;
    let dst_w = width as usize;
    let copy_w = dst_w.min(canvas.width());
    let src = canvas.pixels();
    for (y, row) in buffer.chunks_exact_mut(dst_w).enumerate() {
        if y < canvas.height() {
            let start = y * canvas.width();
            row[..copy_w].copy_from_slice(&src[start..start + copy_w]);
            row[copy_w..].fill(0);
        } else {
            row.fill(0);
        }
    }
    buffer.present()?;
    Ok(())
}

pub fn resize(state: &mut State, width: u32, height: u32) {
    if width == 0 || height == 0 {
        return;
    }
    state.window_size = PhysicalSize::new(width, height);
}

pub fn cleanup(_state: &mut State) {
    info!("Software presenter cleanup.");
}
