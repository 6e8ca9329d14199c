use crate::bridge::{InputEvent, UserEvent};
use anyhow::{Context, Result, anyhow};
use pixels::{Pixels, SurfaceTexture};
use sart_core::{Digit, Key, KeyPress, Screen, StimulusType};
use sart_experiment::{AbortSignal, SartError, SessionReport};
use sart_render::SkiaRenderer;
use sart_timing::{HighPrecisionTimer, Timer};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};
use winit::{
    application::ApplicationHandler,
    dpi::{LogicalSize, PhysicalSize},
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoopProxy},
    keyboard::{KeyCode, PhysicalKey},
    window::{Fullscreen, Window, WindowId},
};

pub type Engine = Box<dyn FnOnce() -> Result<SessionReport, SartError> + Send>;
pub type EngineHandle = JoinHandle<Result<SessionReport, SartError>>;

/// What the renderer needs once a window exists.
pub struct RenderSetup {
    pub font_data: Vec<u8>,
    pub digit_heights: Vec<f32>,
    pub target: Digit,
    pub screens_dir: Option<PathBuf>,
    pub windowed: bool,
}

pub struct App {
    window: Option<Arc<Window>>,
    pixels: Option<Pixels<'static>>,
    renderer: Option<SkiaRenderer>,
    setup: RenderSetup,
    current: StimulusType,
    current_size: Option<PhysicalSize<u32>>,
    scale_factor: f64,
    refresh_rate: Option<f64>,

    timer: HighPrecisionTimer,
    keys: Sender<InputEvent>,
    abort: AbortSignal,
    proxy: EventLoopProxy<UserEvent>,
    engine: Option<Engine>,
    handle: Option<EngineHandle>,
    failure: Option<anyhow::Error>,
}

impl App {
    pub fn new(
        setup: RenderSetup,
        timer: HighPrecisionTimer,
        keys: Sender<InputEvent>,
        abort: AbortSignal,
        proxy: EventLoopProxy<UserEvent>,
        engine: Engine,
    ) -> Self {
        Self {
            window: None,
            pixels: None,
            renderer: None,
            setup,
            current: StimulusType::Blank,
            current_size: None,
            scale_factor: 1.0,
            refresh_rate: None,
            timer,
            keys,
            abort,
            proxy,
            engine: Some(engine),
            handle: None,
            failure: None,
        }
    }

    /// Tears the window down and hands back the engine thread. Dropping the
    /// key channel here unblocks an engine still waiting for input.
    pub fn into_engine(mut self) -> Result<EngineHandle> {
        let stats = self.timer.calibration_stats();
        if stats.samples > 0 {
            tracing::info!(
                frames = stats.samples,
                avg_ms = stats.average_frame_time_ns / 1e6,
                jitter_ms = stats.jitter_ns / 1e6,
                max_ms = stats.max_frame_time_ns / 1e6,
                "frame statistics"
            );
        }
        if let Some(renderer) = &self.renderer {
            for (stage, s) in renderer.component_stats() {
                tracing::debug!(stage, avg_ms = s.average_frame_time_ns / 1e6, "render stage");
            }
        }
        if let Some(window) = &self.window {
            window.set_cursor_visible(true);
        }

        match (self.handle.take(), self.failure.take()) {
            (_, Some(e)) => {
                self.abort.raise();
                Err(e)
            }
            (Some(handle), None) => Ok(handle),
            (None, None) => Err(anyhow!("window closed before the session started")),
        }
    }

    fn create_window_and_surface(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let primary_monitor = event_loop
            .primary_monitor()
            .or_else(|| event_loop.available_monitors().next())
            .ok_or_else(|| anyhow!("no monitor available"))?;

        self.refresh_rate = primary_monitor
            .refresh_rate_millihertz()
            .map(|rate| rate as f64 / 1000.0);

        let mut window_attributes = Window::default_attributes().with_title("SART");
        window_attributes = if self.setup.windowed {
            window_attributes.with_inner_size(LogicalSize::new(1280.0, 800.0))
        } else {
            window_attributes
                .with_fullscreen(Some(Fullscreen::Borderless(Some(primary_monitor))))
                .with_resizable(false)
        };

        let window = Arc::new(event_loop.create_window(window_attributes)?);
        let physical_size = window.inner_size();
        self.current_size = Some(physical_size);
        self.scale_factor = window.scale_factor();

        tracing::info!(
            width = physical_size.width,
            height = physical_size.height,
            scale = self.scale_factor,
            refresh_hz = self.refresh_rate,
            "display ready"
        );

        let surface_texture =
            SurfaceTexture::new(physical_size.width, physical_size.height, window.clone());
        self.pixels = Some(Pixels::new(
            physical_size.width,
            physical_size.height,
            surface_texture,
        )?);

        let mut renderer = SkiaRenderer::new(
            physical_size.width,
            physical_size.height,
            std::mem::take(&mut self.setup.font_data),
            self.setup.digit_heights.clone(),
            self.setup.target,
        )?;
        if let Some(dir) = &self.setup.screens_dir {
            load_screen_images(&mut renderer, dir)?;
        }
        renderer.warm_cache()?;
        self.renderer = Some(renderer);

        window.set_cursor_visible(false);
        window.request_redraw();
        self.window = Some(window);
        Ok(())
    }

    fn start_engine(&mut self) -> Result<()> {
        let Some(engine) = self.engine.take() else {
            return Ok(());
        };
        let proxy = self.proxy.clone();
        let handle = thread::Builder::new()
            .name("sart-engine".into())
            .spawn(move || {
                let result = engine();
                // The loop may already be gone after a window close.
                let _ = proxy.send_event(UserEvent::Finished);
                result
            })
            .context("cannot spawn the engine thread")?;
        self.handle = Some(handle);
        Ok(())
    }

    fn present(&mut self, stimulus: &StimulusType) -> Result<()> {
        let (Some(pixels), Some(renderer)) = (self.pixels.as_mut(), self.renderer.as_mut()) else {
            return Err(anyhow!("window is not ready"));
        };

        let stats = renderer.render_frame(stimulus, pixels.frame_mut(), &mut self.timer)?;
        let t = self.timer.now();
        pixels.render()?;
        let flip = self.timer.elapsed(t);

        tracing::trace!(
            flip_ms = flip.as_secs_f64() * 1e3,
            clear_ms = stats.clear.as_secs_f64() * 1e3,
            draw_ms = stats.draw.as_secs_f64() * 1e3,
            copy_ms = stats.copy.as_secs_f64() * 1e3,
            dirty = stats.dirty_count,
            "frame presented"
        );
        Ok(())
    }

    fn handle_input(&mut self, key: PhysicalKey) {
        let PhysicalKey::Code(code) = key else {
            return;
        };
        match map_key(code) {
            Some(Key::Escape) => {
                tracing::warn!("escape pressed, aborting session");
                self.abort.raise();
                let _ = self.keys.send(InputEvent::Wake);
            }
            Some(key) => {
                let press = KeyPress::new(key, self.timer.now());
                let _ = self.keys.send(InputEvent::Press(press));
            }
            None => {}
        }
    }

    fn handle_resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 || Some(new_size) == self.current_size {
            return;
        }
        self.current_size = Some(new_size);
        if let Some(pixels) = &mut self.pixels {
            if let Err(e) = pixels.resize_surface(new_size.width, new_size.height) {
                tracing::error!("failed to resize surface: {e}");
            }
            if let Err(e) = pixels.resize_buffer(new_size.width, new_size.height) {
                tracing::error!("failed to resize buffer: {e}");
            }
        }
        if let Some(renderer) = &mut self.renderer {
            if let Err(e) = renderer.resize(new_size.width, new_size.height) {
                tracing::error!("failed to resize renderer: {e:#}");
            }
        }
        tracing::info!(width = new_size.width, height = new_size.height, "display resized");
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        tracing::error!("{error:#}");
        self.failure = Some(error);
        self.abort.raise();
        let _ = self.keys.send(InputEvent::Wake);
        event_loop.exit();
    }
}

impl ApplicationHandler<UserEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let started = self
            .create_window_and_surface(event_loop)
            .context("failed to create window and surface")
            .and_then(|_| self.start_engine());
        if let Err(e) = started {
            self.fail(event_loop, e);
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: UserEvent) {
        match event {
            UserEvent::Frame { stimulus, ack } => {
                let result = self.present(&stimulus);
                self.current = stimulus;
                // A closed ack means the engine has already given up on this frame.
                let _ = ack.send(result.map_err(|e| format!("{e:#}")));
            }
            UserEvent::Finished => event_loop.exit(),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                tracing::warn!("window closed, aborting session");
                self.abort.raise();
                let _ = self.keys.send(InputEvent::Wake);
                event_loop.exit();
            }
            WindowEvent::RedrawRequested => {
                let current = self.current.clone();
                if let Err(e) = self.present(&current) {
                    self.fail(event_loop, e);
                }
            }
            WindowEvent::KeyboardInput { event, .. } if event.state.is_pressed() && !event.repeat => {
                self.handle_input(event.physical_key);
            }
            WindowEvent::Resized(size) => self.handle_resize(size),
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                self.scale_factor = scale_factor;
                if let Some(window) = &self.window {
                    let size = window.inner_size();
                    self.handle_resize(size);
                }
            }
            _ => {}
        }
    }
}

/// Maps the keys the task listens for. Number row and keypad both give ratings.
pub fn map_key(code: KeyCode) -> Option<Key> {
    let key = match code {
        KeyCode::Space => Key::Space,
        KeyCode::Escape => Key::Escape,
        KeyCode::Digit0 | KeyCode::Numpad0 => Key::Number(0),
        KeyCode::Digit1 | KeyCode::Numpad1 => Key::Number(1),
        KeyCode::Digit2 | KeyCode::Numpad2 => Key::Number(2),
        KeyCode::Digit3 | KeyCode::Numpad3 => Key::Number(3),
        KeyCode::Digit4 | KeyCode::Numpad4 => Key::Number(4),
        KeyCode::Digit5 | KeyCode::Numpad5 => Key::Number(5),
        KeyCode::Digit6 | KeyCode::Numpad6 => Key::Number(6),
        KeyCode::Digit7 | KeyCode::Numpad7 => Key::Number(7),
        KeyCode::Digit8 | KeyCode::Numpad8 => Key::Number(8),
        KeyCode::Digit9 | KeyCode::Numpad9 => Key::Number(9),
        _ => return None,
    };
    Some(key)
}

fn load_screen_images(renderer: &mut SkiaRenderer, dir: &std::path::Path) -> Result<()> {
    for screen in Screen::ALL {
        let path = dir.join(format!("{}.png", screen.file_stem()));
        if !path.is_file() {
            tracing::debug!(?screen, path = %path.display(), "no page image, using text");
            continue;
        }
        let image = image::open(&path)
            .with_context(|| format!("cannot decode {}", path.display()))?
            .into_rgba8();
        let (width, height) = image.dimensions();
        renderer.set_screen_image(screen, width, height, image.as_raw())?;
        tracing::debug!(?screen, width, height, "page image loaded");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_row_and_keypad_map_to_the_same_rating() {
        assert_eq!(map_key(KeyCode::Digit4), Some(Key::Number(4)));
        assert_eq!(map_key(KeyCode::Numpad4), Some(Key::Number(4)));
    }

    #[test]
    fn task_keys_map_and_others_do_not() {
        assert_eq!(map_key(KeyCode::Space), Some(Key::Space));
        assert_eq!(map_key(KeyCode::Escape), Some(Key::Escape));
        assert_eq!(map_key(KeyCode::KeyA), None);
        assert_eq!(map_key(KeyCode::Enter), None);
    }
}
