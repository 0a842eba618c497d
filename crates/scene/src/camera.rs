use glam::{Mat4, Vec3};

/// Perspective camera described by an eye point and a look-at target.
///
/// Actors move it freely; it is not part of the physics world.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view in radians.
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 5.0, 10.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov: 75.0_f32.to_radians(),
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl Camera {
    pub fn look_at(&mut self, target: Vec3) {
        self.target = target;
    }

    /// Move the eye a fraction `t` of the way towards `goal`.
    pub fn lerp_towards(&mut self, goal: Vec3, t: f32) {
        self.position = self.position.lerp(goal, t.clamp(0.0, 1.0));
    }

    /// Update aspect from a viewport size. Zero heights are ignored.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        if height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    pub fn forward(&self) -> Vec3 {
        (self.target - self.position).normalize_or(Vec3::NEG_Z)
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov, self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_camera_looks_at_origin() {
        let cam = Camera::default();
        assert!(cam.position.y > 0.0);
        assert!(cam.forward().z < 0.0);
        let vp = cam.view_projection();
        assert!(!vp.col(0).x.is_nan());
    }

    #[test]
    fn lerp_is_clamped() {
        let mut cam = Camera::default();
        cam.lerp_towards(Vec3::new(0.0, 8.0, 12.0), 5.0);
        assert_eq!(cam.position, Vec3::new(0.0, 8.0, 12.0));
    }

    #[test]
    fn viewport_sets_aspect() {
        let mut cam = Camera::default();
        cam.set_viewport(800, 400);
        assert_eq!(cam.aspect, 2.0);
        cam.set_viewport(800, 0);
        assert_eq!(cam.aspect, 2.0);
    }

    #[test]
    fn degenerate_forward_falls_back() {
        let mut cam = Camera::default();
        cam.look_at(cam.position);
        assert_eq!(cam.forward(), Vec3::NEG_Z);
    }
}
