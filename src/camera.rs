//! Orbit camera driven by mouse drag and scroll.

use glam::{Mat4, Vec3};

use crate::component::{Component, InputEvent, MouseButton};
use crate::params::{OrbitControls, RenderConfig};

/// Camera orbiting a target point at a given distance
pub struct OrbitCamera {
    target: Vec3,
    distance: f32,
    yaw: f32,
    pitch: f32,
    fov_y: f32,
    near: f32,
    far: f32,
    viewport: (u32, u32),
    controls: OrbitControls,
    dragging: bool,
    last_cursor: Option<(f32, f32)>,
}

impl OrbitCamera {
    /// Camera looking down -Z at the origin, far enough back that a
    /// viewport-sized area fills the view
    pub fn new(render_config: &RenderConfig, controls: OrbitControls) -> Self {
        let viewport = (render_config.window_width, render_config.window_height);
        Self {
            target: Vec3::ZERO,
            distance: framing_distance(render_config.fov_degrees, viewport.1),
            yaw: 0.0,
            pitch: 0.0,
            fov_y: render_config.fov_degrees.to_radians(),
            near: render_config.near_plane,
            far: render_config.far_plane,
            viewport,
            controls,
            dragging: false,
            last_cursor: None,
        }
    }

    /// Eye position on the orbit sphere
    pub fn eye(&self) -> Vec3 {
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        self.target
            + Vec3::new(cos_pitch * sin_yaw, sin_pitch, cos_pitch * cos_yaw) * self.distance
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye(), self.target, Vec3::Y)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        let (width, height) = self.viewport;
        let aspect = width.max(1) as f32 / height.max(1) as f32;
        Mat4::perspective_rh(self.fov_y, aspect, self.near, self.far)
    }

    pub fn view_proj(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Rotate by a cursor delta in pixels
    pub fn orbit(&mut self, dx: f32, dy: f32) {
        let limit = self.controls.max_pitch;
        self.yaw -= dx * self.controls.orbit_sensitivity;
        self.pitch = (self.pitch + dy * self.controls.orbit_sensitivity).clamp(-limit, limit);
    }

    /// Move toward (positive) or away from (negative) the target
    pub fn zoom(&mut self, lines: f32) {
        let factor = (1.0 - lines * self.controls.zoom_sensitivity).max(0.1);
        self.distance = (self.distance * factor).clamp(self.controls.min_distance, self.far * 0.5);
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = (width, height);
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }
}

/// Distance at which a vertical span of `height` units exactly fills a
/// `fov_degrees` vertical field of view
pub fn framing_distance(fov_degrees: f32, height: u32) -> f32 {
    let half_fov = (fov_degrees.to_radians() * 0.5).max(1e-3);
    (height.max(1) as f32 * 0.5) / half_fov.tan()
}

impl Component for OrbitCamera {
    fn name(&self) -> &'static str {
        "camera"
    }

    fn handle_input(&mut self, event: &InputEvent) {
        match *event {
            InputEvent::MousePressed(MouseButton::Left) => self.dragging = true,
            InputEvent::MouseReleased(MouseButton::Left) => self.dragging = false,
            InputEvent::CursorMoved { x, y } => {
                if let Some((last_x, last_y)) = self.last_cursor {
                    if self.dragging {
                        self.orbit(x - last_x, y - last_y);
                    }
                }
                self.last_cursor = Some((x, y));
            }
            InputEvent::Scroll { lines } => self.zoom(lines),
            _ => {}
        }
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.set_viewport(width, height);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> OrbitCamera {
        OrbitCamera::new(&RenderConfig::default(), OrbitControls::default())
    }

    #[test]
    fn test_initial_eye_on_positive_z() {
        let camera = camera();
        let eye = camera.eye();
        assert!(eye.x.abs() < 1e-3 && eye.y.abs() < 1e-3);
        assert!((eye.z - camera.distance()).abs() < 1e-3);
    }

    #[test]
    fn test_framing_distance() {
        // tan(45deg) = 1, so the distance equals half the height
        let d = framing_distance(90.0, 200);
        assert!((d - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_drag_orbits_only_while_pressed() {
        let mut camera = camera();
        let start = camera.eye();

        camera.handle_input(&InputEvent::CursorMoved { x: 0.0, y: 0.0 });
        camera.handle_input(&InputEvent::CursorMoved { x: 100.0, y: 0.0 });
        assert_eq!(camera.eye(), start);

        camera.handle_input(&InputEvent::MousePressed(MouseButton::Left));
        camera.handle_input(&InputEvent::CursorMoved { x: 200.0, y: 50.0 });
        let moved = camera.eye();
        assert_ne!(moved, start);
        // Orbiting keeps the distance
        assert!((moved.length() - start.length()).abs() < 1e-2);

        camera.handle_input(&InputEvent::MouseReleased(MouseButton::Left));
        camera.handle_input(&InputEvent::CursorMoved { x: 400.0, y: 80.0 });
        assert_eq!(camera.eye(), moved);
    }

    #[test]
    fn test_pitch_clamped() {
        let mut camera = camera();
        camera.orbit(0.0, 1.0e6);
        assert!(camera.pitch() <= OrbitControls::default().max_pitch);
        camera.orbit(0.0, -1.0e7);
        assert!(camera.pitch() >= -OrbitControls::default().max_pitch);
    }

    #[test]
    fn test_zoom_respects_min_distance() {
        let mut camera = camera();
        let start = camera.distance();
        camera.handle_input(&InputEvent::Scroll { lines: 1.0 });
        assert!(camera.distance() < start);

        for _ in 0..500 {
            camera.zoom(5.0);
        }
        assert!(camera.distance() >= OrbitControls::default().min_distance);
    }

    #[test]
    fn test_view_proj_is_finite() {
        let mut camera = camera();
        camera.resize(800, 0);
        let m = camera.view_proj();
        assert!(m.to_cols_array().iter().all(|v| v.is_finite()));
        assert_ne!(m, Mat4::IDENTITY);
    }
}
