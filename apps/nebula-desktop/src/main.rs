mod hud;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use egui::Context as EguiContext;
use nebula_actors::{GameConfig, Session};
use nebula_engine::{FrameScheduler, GameEngine};
use nebula_input::{Action, Key};
use nebula_render_wgpu::{SurfaceFrame, SurfaceRenderer};
use nebula_scene::Environment;
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, KeyEvent, MouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use crate::hud::{HudView, Screen, UiAction};

#[derive(Parser)]
#[command(name = "nebula-desktop", about = "Nebula Strike desktop game")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Game config (YAML). Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Turns engine frame requests into window redraws.
struct WindowScheduler(Arc<Window>);

impl FrameScheduler for WindowScheduler {
    fn request_frame(&mut self) {
        self.0.request_redraw();
    }
}

fn map_key(code: KeyCode) -> Option<Key> {
    Some(match code {
        KeyCode::KeyW => Key::KeyW,
        KeyCode::KeyA => Key::KeyA,
        KeyCode::KeyS => Key::KeyS,
        KeyCode::KeyD => Key::KeyD,
        KeyCode::ArrowUp => Key::ArrowUp,
        KeyCode::ArrowDown => Key::ArrowDown,
        KeyCode::ArrowLeft => Key::ArrowLeft,
        KeyCode::ArrowRight => Key::ArrowRight,
        KeyCode::Space => Key::Space,
        KeyCode::Escape => Key::Escape,
        KeyCode::Enter | KeyCode::NumpadEnter => Key::Enter,
        _ => return None,
    })
}

/// One engine with its session and the egui painter bound to its device.
struct Game {
    engine: GameEngine<SurfaceRenderer>,
    session: Session,
    overlay: egui_wgpu::Renderer,
}

impl Game {
    fn new(window: Arc<Window>, config: &GameConfig) -> Result<Self> {
        let renderer = SurfaceRenderer::new(window.clone())?;
        let overlay =
            egui_wgpu::Renderer::new(renderer.device(), renderer.format(), None, 1, false);
        let (width, height) = renderer.size();

        let mut engine = GameEngine::with_config(renderer, config.engine)
            .scheduler(WindowScheduler(window))
            .environment(Environment::space(config.seed));
        engine.resize(width, height);
        let session = Session::start(engine.world_mut(), config)?;

        Ok(Self {
            engine,
            session,
            overlay,
        })
    }
}

struct GpuApp {
    config: GameConfig,
    screen: Screen,
    best_score: u64,
    window: Option<Arc<Window>>,
    game: Option<Game>,
    egui_ctx: EguiContext,
    egui_winit: Option<egui_winit::State>,
}

impl GpuApp {
    fn new(config: GameConfig) -> Self {
        Self {
            config,
            screen: Screen::Menu,
            best_score: 0,
            window: None,
            game: None,
            egui_ctx: EguiContext::default(),
            egui_winit: None,
        }
    }

    /// Tear down the current engine, if any, and build a fresh one.
    fn new_game(&mut self) -> Result<()> {
        let Some(window) = self.window.clone() else {
            return Ok(());
        };
        // The old surface must be gone before a new one is created.
        self.game = None;
        self.game = Some(Game::new(window, &self.config)?);
        Ok(())
    }

    fn apply(&mut self, action: UiAction, event_loop: &ActiveEventLoop) {
        match action {
            UiAction::Play => {
                if let Some(game) = &mut self.game {
                    game.engine.start();
                    self.screen = Screen::Playing;
                }
            }
            UiAction::Resume => {
                if let Some(game) = &mut self.game {
                    game.engine.resume();
                    self.screen = Screen::Playing;
                }
            }
            UiAction::Restart => match self.new_game() {
                Ok(()) => self.apply(UiAction::Play, event_loop),
                Err(e) => {
                    tracing::error!("failed to restart: {e:#}");
                    event_loop.exit();
                }
            },
            UiAction::Quit => event_loop.exit(),
        }
    }

    fn toggle_pause(&mut self) {
        let Some(game) = &mut self.game else {
            return;
        };
        match self.screen {
            Screen::Playing => {
                game.engine.pause();
                self.screen = Screen::Paused;
            }
            Screen::Paused => {
                game.engine.resume();
                self.screen = Screen::Playing;
            }
            Screen::Menu | Screen::GameOver => {}
        }
    }

    fn handle_key(&mut self, key: Key, pressed: bool, repeat: bool, event_loop: &ActiveEventLoop) {
        let Some(game) = &mut self.game else {
            return;
        };
        let input = game.engine.input_mut();
        if !pressed {
            input.key_up(key);
            return;
        }
        if repeat {
            return;
        }
        match input.key_down(key) {
            Some(Action::TogglePause) => self.toggle_pause(),
            Some(Action::Confirm) => match self.screen {
                Screen::Menu => self.apply(UiAction::Play, event_loop),
                Screen::GameOver => self.apply(UiAction::Restart, event_loop),
                Screen::Playing | Screen::Paused => {}
            },
            _ => {}
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Self {
            config,
            screen,
            best_score,
            window,
            game,
            egui_ctx,
            egui_winit,
        } = self;
        let (Some(window), Some(game), Some(egui_winit)) = (window, game, egui_winit) else {
            return;
        };

        let rendered = if *screen == Screen::Playing {
            match game.engine.frame() {
                Ok(Some(output)) => Ok(output),
                // Not due yet: repaint the overlay over the last state.
                Ok(None) => game.engine.redraw(),
                Err(e) => Err(e),
            }
        } else {
            game.engine.redraw()
        };
        for event in game.engine.drain_events() {
            tracing::debug!(?event, "world event");
        }
        let frame = match rendered {
            Ok(Some(frame)) => frame,
            Ok(None) => return,
            Err(err) => {
                tracing::error!(%err, "engine halted");
                event_loop.exit();
                return;
            }
        };

        let stats = game.session.stats();
        if *screen == Screen::Playing && game.session.is_over() {
            game.engine.stop();
            *best_score = (*best_score).max(stats.score);
            *screen = Screen::GameOver;
            tracing::info!(score = stats.score, kills = stats.kills, "game over");
        }

        let view = HudView {
            screen: *screen,
            stats: &stats,
            max_health: config.player.health,
            best_score: *best_score,
        };
        let action = paint_overlay(window, egui_winit, egui_ctx, game, &view, &frame);
        frame.present();

        if let Some(action) = action {
            self.apply(action, event_loop);
        }
    }
}

/// Run egui for this frame and draw it on top of the rendered scene.
fn paint_overlay(
    window: &Window,
    egui_winit: &mut egui_winit::State,
    egui_ctx: &EguiContext,
    game: &mut Game,
    view: &HudView<'_>,
    frame: &SurfaceFrame,
) -> Option<UiAction> {
    let raw_input = egui_winit.take_egui_input(window);
    let mut action = None;
    let full_output = egui_ctx.run(raw_input, |ctx| {
        action = hud::draw(ctx, view);
    });
    egui_winit.handle_platform_output(window, full_output.platform_output);

    let paint_jobs = egui_ctx.tessellate(full_output.shapes, full_output.pixels_per_point);
    let renderer = game.engine.renderer();
    let (device, queue) = (renderer.device(), renderer.queue());
    let (width, height) = renderer.size();
    let screen_descriptor = egui_wgpu::ScreenDescriptor {
        size_in_pixels: [width, height],
        pixels_per_point: full_output.pixels_per_point,
    };

    let overlay = &mut game.overlay;
    for (id, image_delta) in &full_output.textures_delta.set {
        overlay.update_texture(device, queue, *id, image_delta);
    }
    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("egui_encoder"),
    });
    overlay.update_buffers(device, queue, &mut encoder, &paint_jobs, &screen_descriptor);
    {
        let mut pass = encoder
            .begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("egui_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: frame.view(),
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                ..Default::default()
            })
            .forget_lifetime();
        overlay.render(&mut pass, &paint_jobs, &screen_descriptor);
    }
    queue.submit(std::iter::once(encoder.finish()));
    for id in &full_output.textures_delta.free {
        overlay.free_texture(id);
    }
    action
}

impl ApplicationHandler for GpuApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attrs = Window::default_attributes()
            .with_title("Nebula Strike")
            .with_inner_size(PhysicalSize::new(1280u32, 720));
        let window = match event_loop.create_window(attrs) {
            Ok(w) => Arc::new(w),
            Err(e) => {
                tracing::error!("failed to create window: {e}");
                event_loop.exit();
                return;
            }
        };

        self.egui_winit = Some(egui_winit::State::new(
            self.egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        ));
        self.window = Some(window);

        if let Err(e) = self.new_game() {
            tracing::error!("failed to initialize: {e:#}");
            event_loop.exit();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if let (Some(egui_winit), Some(window)) = (&mut self.egui_winit, &self.window) {
            let response = egui_winit.on_window_event(window, &event);
            if response.consumed {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                if let Some(game) = &mut self.game {
                    game.engine.dispose();
                }
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                if let Some(game) = &mut self.game {
                    game.engine.resize(new_size.width, new_size.height);
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state,
                        repeat,
                        ..
                    },
                ..
            } => {
                if let Some(key) = map_key(code) {
                    self.handle_key(key, state == ElementState::Pressed, repeat, event_loop);
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                if let (Some(game), Some(window)) = (&mut self.game, &self.window) {
                    let size = window.inner_size();
                    game.engine.input_mut().pointer_moved(
                        position.x as f32,
                        position.y as f32,
                        size.width as f32,
                        size.height as f32,
                    );
                }
            }
            WindowEvent::MouseInput {
                button: MouseButton::Left,
                state: ElementState::Pressed,
                ..
            } => {
                if self.screen == Screen::Playing {
                    if let Some(game) = &mut self.game {
                        game.engine.input_mut().click();
                    }
                }
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        // A running engine schedules its own redraws.
        let idle = self.game.as_ref().is_none_or(|g| !g.engine.is_running());
        if idle {
            if let Some(window) = &self.window {
                window.request_redraw();
            }
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let config = match &cli.config {
        Some(path) => GameConfig::load(path)?,
        None => GameConfig::default(),
    };
    tracing::info!(seed = config.seed, "nebula-desktop starting");

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = GpuApp::new(config);
    event_loop.run_app(&mut app)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn movement_and_menu_keys_are_mapped() {
        assert_eq!(map_key(KeyCode::KeyW), Some(Key::KeyW));
        assert_eq!(map_key(KeyCode::ArrowLeft), Some(Key::ArrowLeft));
        assert_eq!(map_key(KeyCode::NumpadEnter), Some(Key::Enter));
        assert_eq!(map_key(KeyCode::Escape), Some(Key::Escape));
        assert_eq!(map_key(KeyCode::KeyQ), None);
    }

    #[test]
    fn cli_accepts_config_path() {
        let cli = Cli::parse_from(["nebula-desktop", "-v", "--config", "game.yaml"]);
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("game.yaml")));
    }
}
