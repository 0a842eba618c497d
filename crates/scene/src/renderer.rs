use std::fmt::Write as _;

use crate::camera::Camera;
use crate::graph::Scene;

/// Errors a render backend can surface to the engine.
///
/// Both variants are fatal to the engine instance that owns the backend;
/// recovery means building a new engine.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("render backend failed to initialize: {0}")]
    Init(String),
    #[error("render context lost: {0}")]
    ContextLost(String),
}

/// Renderer-agnostic interface. All backends implement this trait.
///
/// The renderer reads the scene and camera, then produces output. It never
/// mutates the scene: visual state is owned by the engine.
pub trait Renderer {
    /// The output type produced by this renderer.
    type Output;

    /// Render one frame of the scene from the camera.
    fn render(&mut self, scene: &Scene, camera: &Camera) -> Result<Self::Output, RenderError>;

    /// Resize the render target.
    fn resize(&mut self, _width: u32, _height: u32) {}

    /// Release backend resources. Called once when the engine is disposed.
    fn release(&mut self) {}
}

/// Debug text renderer.
///
/// Produces a human-readable description of the scene. Used by the
/// headless runner and by tests that need a backend.
#[derive(Debug, Default)]
pub struct DebugTextRenderer {
    frames: u64,
}

impl DebugTextRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames rendered so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl Renderer for DebugTextRenderer {
    type Output = String;

    fn render(&mut self, scene: &Scene, camera: &Camera) -> Result<String, RenderError> {
        self.frames += 1;
        let mut out = String::new();
        let _ = writeln!(out, "=== Frame {} ===", self.frames);
        let _ = writeln!(
            out,
            "Nodes: {} ({} visible)",
            scene.len(),
            scene.visible_nodes().count()
        );
        let _ = writeln!(
            out,
            "Camera: eye=({:.1}, {:.1}, {:.1}) target=({:.1}, {:.1}, {:.1}) fov={:.0}",
            camera.position.x,
            camera.position.y,
            camera.position.z,
            camera.target.x,
            camera.target.y,
            camera.target.z,
            camera.fov.to_degrees()
        );

        for node in scene.visible_nodes() {
            let p = node.transform.position;
            let _ = writeln!(
                out,
                "  parts={} pos=({:.2}, {:.2}, {:.2}){}",
                node.parts.len(),
                p.x,
                p.y,
                p.z,
                if node.tint.is_some() { " [tinted]" } else { "" }
            );
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Mesh, Part, SceneNode, hex};
    use glam::Vec3;

    #[test]
    fn debug_renderer_empty_scene() {
        let scene = Scene::default();
        let mut renderer = DebugTextRenderer::new();
        let output = renderer
            .render(&scene, &Camera::default())
            .expect("text render cannot fail");

        assert!(output.contains("Frame 1"));
        assert!(output.contains("Nodes: 0"));
        assert!(output.contains("fov=75"));
    }

    #[test]
    fn debug_renderer_lists_visible_nodes() {
        let mut scene = Scene::default();
        scene.add(SceneNode::new(vec![Part::new(Mesh::Sphere, hex(0x00ff00))]));
        scene.add(
            SceneNode::new(vec![Part::new(Mesh::Cube, hex(0xff0000))])
                .with_position(Vec3::new(1.0, 2.0, 3.0)),
        );
        scene.add(SceneNode::empty());

        let mut renderer = DebugTextRenderer::new();
        let output = renderer.render(&scene, &Camera::default()).unwrap();

        assert!(output.contains("Nodes: 3 (2 visible)"));
        assert!(output.contains("pos=(1.00, 2.00, 3.00)"));
        assert_eq!(renderer.frames(), 1);
    }
}
