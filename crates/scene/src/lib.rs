//! Render scene: visual node graph, camera, environment, renderer interface.
//!
//! # Invariants
//! - Renderers read the scene; they never mutate it.
//! - A node is owned by the scene only while its game object is registered.

mod camera;
mod environment;
mod graph;
mod node;
mod renderer;

pub use camera::Camera;
pub use environment::{Environment, Light, LightKind};
pub use graph::{NodeId, Scene};
pub use node::{Color, Mesh, Part, SceneNode, Trail, hex};
pub use renderer::{DebugTextRenderer, RenderError, Renderer};

pub fn crate_info() -> &'static str {
    concat!(env!("CARGO_PKG_NAME"), " v", env!("CARGO_PKG_VERSION"))
}
