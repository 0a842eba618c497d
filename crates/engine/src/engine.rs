use nebula_common::ObjectId;
use nebula_input::InputState;
use nebula_physics::PhysicsConfig;
use nebula_scene::{Camera, Environment, RenderError, Renderer, Scene};
use serde::{Deserialize, Serialize};

use crate::clock::{Clock, TimeSource};
use crate::error::EngineError;
use crate::inspector::EngineSummary;
use crate::object::{GameObject, ObjectRef};
use crate::world::{World, WorldEvent};

/// Loop timing and physics settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Physics sub-step length in seconds.
    pub fixed_step: f32,
    /// Upper bound on physics sub-steps per tick.
    pub max_substeps: u32,
    /// Longest frame delta handed to physics and behaviours, in seconds.
    pub max_frame_delta: f32,
    pub physics: PhysicsConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fixed_step: 1.0 / 60.0,
            max_substeps: 3,
            max_frame_delta: 0.1,
            physics: PhysicsConfig::default(),
        }
    }
}

/// Run state of a [`GameEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EngineState {
    /// Constructed, never started.
    Idle,
    Running,
    Paused,
    Stopped,
    /// The render backend failed. Only `dispose` is meaningful afterwards.
    Failed,
    Disposed,
}

/// Asks the host for the next frame callback.
pub trait FrameScheduler {
    fn request_frame(&mut self);

    fn cancel_frame(&mut self) {}
}

/// Scheduler for hosts that call [`GameEngine::frame`] in their own loop.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopScheduler;

impl FrameScheduler for NoopScheduler {
    fn request_frame(&mut self) {}
}

/// The engine: owns the world, the frame clock and the render backend, and
/// drives the tick loop.
///
/// The host calls [`frame`](Self::frame) on every display refresh. A tick
/// runs only when the engine is running and a frame was scheduled.
pub struct GameEngine<R: Renderer> {
    world: World,
    renderer: R,
    clock: Clock,
    config: EngineConfig,
    state: EngineState,
    frame_pending: bool,
    scheduler: Box<dyn FrameScheduler>,
}

impl<R: Renderer> GameEngine<R> {
    pub fn new(renderer: R) -> Self {
        Self::with_config(renderer, EngineConfig::default())
    }

    pub fn with_config(renderer: R, config: EngineConfig) -> Self {
        Self {
            world: World::new(Scene::default(), config.physics),
            renderer,
            clock: Clock::default(),
            config,
            state: EngineState::Idle,
            frame_pending: false,
            scheduler: Box::new(NoopScheduler),
        }
    }

    pub fn time_source(mut self, source: impl TimeSource + 'static) -> Self {
        self.clock = Clock::new(source);
        self
    }

    pub fn scheduler(mut self, scheduler: impl FrameScheduler + 'static) -> Self {
        self.scheduler = Box::new(scheduler);
        self
    }

    pub fn environment(mut self, environment: Environment) -> Self {
        self.world.set_environment(environment);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == EngineState::Running
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn camera(&self) -> &Camera {
        self.world.camera()
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        self.world.camera_mut()
    }

    pub fn input_mut(&mut self) -> &mut InputState {
        self.world.input_mut()
    }

    pub fn add_game_object(&mut self, object: GameObject) -> Result<(), EngineError> {
        self.world.add_game_object(object)
    }

    pub fn remove_game_object(&mut self, id: &ObjectId) -> bool {
        self.world.remove_game_object(id)
    }

    pub fn get_game_object(&self, id: &ObjectId) -> Option<ObjectRef<'_>> {
        self.world.get_game_object(id)
    }

    pub fn drain_events(&mut self) -> Vec<WorldEvent> {
        self.world.drain_events()
    }

    pub fn summary(&self) -> EngineSummary {
        EngineSummary::of(self.state, self.clock.elapsed(), &self.world)
    }

    /// Begin ticking. Ignored once the engine has failed or been disposed.
    pub fn start(&mut self) {
        match self.state {
            EngineState::Running => return,
            EngineState::Failed | EngineState::Disposed => {
                tracing::warn!(state = ?self.state, "start ignored");
                return;
            }
            _ => {}
        }
        self.clock.start();
        self.state = EngineState::Running;
        tracing::info!("engine started");
        self.schedule();
    }

    /// Stop ticking. A pending frame is cancelled.
    pub fn stop(&mut self) {
        if matches!(self.state, EngineState::Disposed | EngineState::Stopped) {
            return;
        }
        self.state = EngineState::Stopped;
        self.cancel();
        self.clock.stop();
        tracing::info!("engine stopped");
    }

    pub fn pause(&mut self) {
        if self.state != EngineState::Running {
            return;
        }
        self.state = EngineState::Paused;
        self.cancel();
        tracing::info!("engine paused");
    }

    /// Continue after [`pause`](Self::pause). The paused interval is not
    /// charged to the next tick.
    pub fn resume(&mut self) {
        if self.state != EngineState::Paused {
            return;
        }
        self.clock.rebase();
        self.state = EngineState::Running;
        tracing::info!("engine resumed");
        self.schedule();
    }

    /// Stop, dispose every object, release the backend. Safe to call twice.
    pub fn dispose(&mut self) {
        if self.state == EngineState::Disposed {
            return;
        }
        self.stop();
        let objects = self.world.object_count();
        self.world.close();
        self.renderer.release();
        self.state = EngineState::Disposed;
        tracing::info!(objects, "engine disposed");
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.world.camera_mut().set_viewport(width, height);
        self.renderer.resize(width, height);
    }

    /// Host frame callback. Runs one tick when one is due and returns the
    /// renderer's output for it.
    pub fn frame(&mut self) -> Result<Option<R::Output>, EngineError> {
        if self.world.is_closed() {
            return Err(EngineError::Disposed);
        }
        if !(self.frame_pending && self.is_running()) {
            return Ok(None);
        }
        self.frame_pending = false;
        let output = self.tick()?;
        if self.is_running() {
            self.schedule();
        }
        Ok(Some(output))
    }

    fn tick(&mut self) -> Result<R::Output, EngineError> {
        let _span = tracing::info_span!("tick", tick = self.world.tick() + 1).entered();
        let dt = self.clock.delta(self.config.max_frame_delta);

        let substeps =
            self.world
                .step_physics(self.config.fixed_step, dt, self.config.max_substeps);
        self.world.run_updates(dt);
        self.world.sync_visuals();
        self.world.finish_tick(dt, substeps);

        self.render()
    }

    /// Render the current scene without advancing time. Hosts use this to
    /// repaint while paused or behind a menu.
    pub fn redraw(&mut self) -> Result<R::Output, EngineError> {
        if self.world.is_closed() {
            return Err(EngineError::Disposed);
        }
        if self.state == EngineState::Failed {
            return Err(EngineError::Render(RenderError::ContextLost(
                "engine halted after a render failure".into(),
            )));
        }
        self.render()
    }

    fn render(&mut self) -> Result<R::Output, EngineError> {
        match self.renderer.render(self.world.scene(), self.world.camera()) {
            Ok(output) => Ok(output),
            Err(err) => {
                tracing::error!(%err, "render failed, engine halted");
                self.state = EngineState::Failed;
                self.cancel();
                Err(err.into())
            }
        }
    }

    fn schedule(&mut self) {
        if !self.frame_pending {
            self.frame_pending = true;
            self.scheduler.request_frame();
        }
    }

    fn cancel(&mut self) {
        if self.frame_pending {
            self.frame_pending = false;
            self.scheduler.cancel_frame();
        }
    }
}

impl<R: Renderer> Drop for GameEngine<R> {
    fn drop(&mut self) {
        self.dispose();
    }
}
