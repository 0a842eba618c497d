//! wgpu render backend for the nebula engine.
//!
//! Draws every visible scene node as instanced, lit primitive meshes over a
//! point star field. [`SurfaceRenderer`] binds the painter to a window
//! surface and implements the engine's `Renderer` trait.
//!
//! # Invariants
//! - The renderer never mutates the scene.
//! - One draw call per mesh kind per frame, regardless of node count.
//! - A lost or outdated surface is reconfigured and the frame skipped; only
//!   unrecoverable device errors surface as `RenderError`.

mod gpu;
mod mesh;
mod shaders;
mod surface;

pub use gpu::WgpuRenderer;
pub use surface::{SurfaceFrame, SurfaceRenderer};
