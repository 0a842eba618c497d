//! Game engine core: object registry, fixed-step physics, update pass,
//! physics-to-visual sync and rendering, driven one tick per host frame.
//!
//! # Invariants
//! - An object is registered for one contiguous interval; `update` only
//!   runs while it is registered.
//! - `dispose` runs exactly once per object, on removal or engine dispose.
//! - After every tick, each body-backed node has its body's pose.
//! - Time spent paused is never charged to a tick.
//! - The event log never holds more than `EVENT_LOG_CAPACITY` entries.

mod clock;
mod engine;
mod error;
pub mod inspector;
mod object;
mod world;

pub use clock::{Clock, ManualTime, TimeSource, WallClock};
pub use engine::{EngineConfig, EngineState, FrameScheduler, GameEngine, NoopScheduler};
pub use error::EngineError;
pub use inspector::EngineSummary;
pub use nebula_physics::BodyMut;
pub use object::{Behavior, FnBehavior, GameObject, Inert, ObjectRef, from_fn};
pub use world::{EVENT_LOG_CAPACITY, UpdateContext, World, WorldEvent};

pub fn crate_info() -> &'static str {
    concat!(env!("CARGO_PKG_NAME"), " v", env!("CARGO_PKG_VERSION"))
}
