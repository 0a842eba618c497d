use std::collections::VecDeque;

use glam::Vec3;
use nebula_common::Transform;

/// Linear RGBA color.
pub type Color = [f32; 4];

/// Converts a `0xRRGGBB` hex value to an opaque color.
pub const fn hex(rgb: u32) -> Color {
    [
        ((rgb >> 16) & 0xff) as f32 / 255.0,
        ((rgb >> 8) & 0xff) as f32 / 255.0,
        (rgb & 0xff) as f32 / 255.0,
        1.0,
    ]
}

/// Unit primitive meshes. Parts scale them through their local transform.
///
/// Every mesh fits the unit cube centred on the origin: a sphere has radius
/// 0.5, cones and cylinders stand along +Y with radius 0.5 and height 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Mesh {
    Cube,
    Sphere,
    Cone,
    Cylinder,
    Octahedron,
}

/// One primitive inside a node, positioned relative to the node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Part {
    pub mesh: Mesh,
    pub local: Transform,
    pub color: Color,
    pub emissive: Color,
}

impl Part {
    pub fn new(mesh: Mesh, color: Color) -> Self {
        Self {
            mesh,
            local: Transform::default(),
            color,
            emissive: [0.0, 0.0, 0.0, 1.0],
        }
    }

    pub fn at(mut self, position: Vec3) -> Self {
        self.local.position = position;
        self
    }

    pub fn scaled(mut self, scale: Vec3) -> Self {
        self.local.scale = scale;
        self
    }

    pub fn rotated(mut self, rotation: glam::Quat) -> Self {
        self.local.rotation = rotation;
        self
    }

    pub fn glowing(mut self, emissive: Color) -> Self {
        self.emissive = emissive;
        self
    }
}

/// Fading points left behind a moving node, newest first.
///
/// Points are in world space; the node's transform does not apply to them.
#[derive(Debug, Clone, PartialEq)]
pub struct Trail {
    points: VecDeque<Vec3>,
    capacity: usize,
    pub color: Color,
}

impl Trail {
    pub fn new(capacity: usize, color: Color) -> Self {
        Self {
            points: VecDeque::with_capacity(capacity),
            capacity,
            color,
        }
    }

    /// Record a new head point, dropping the oldest once full.
    pub fn push(&mut self, point: Vec3) {
        if self.capacity == 0 {
            return;
        }
        if self.points.len() == self.capacity {
            self.points.pop_back();
        }
        self.points.push_front(point);
    }

    pub fn points(&self) -> impl ExactSizeIterator<Item = Vec3> + '_ {
        self.points.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Color of the `i`-th point from the head; alpha falls off linearly.
    pub fn point_color(&self, i: usize) -> Color {
        let fade = 1.0 - i as f32 / self.capacity.max(1) as f32;
        let [r, g, b, a] = self.color;
        [r, g, b, a * fade]
    }
}

/// A visual node: a world transform and the parts drawn at it.
///
/// A node with no parts is a valid, invisible anchor (used by controller
/// objects that only exist to run behaviour).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneNode {
    pub transform: Transform,
    pub parts: Vec<Part>,
    pub visible: bool,
    /// When set, replaces every part's color (damage flash).
    pub tint: Option<Color>,
    pub trail: Option<Trail>,
}

impl SceneNode {
    pub fn new(parts: Vec<Part>) -> Self {
        Self {
            transform: Transform::default(),
            parts,
            visible: true,
            tint: None,
            trail: None,
        }
    }

    /// A node with nothing to draw.
    pub fn empty() -> Self {
        Self {
            visible: false,
            ..Self::default()
        }
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.transform.position = position;
        self
    }

    pub fn with_trail(mut self, trail: Trail) -> Self {
        self.trail = Some(trail);
        self
    }

    /// Color a part is drawn with, after tinting.
    pub fn part_color(&self, part: &Part) -> Color {
        self.tint.unwrap_or(part.color)
    }
}
