//! Drag-to-orbit camera controls.
//!
//! The camera orbits a fixed target on a sphere. Input accumulates into a
//! spherical delta that [`OrbitControls::update`] applies once per frame; with
//! damping enabled only a fraction of the delta is applied per frame and the
//! rest decays, which gives the drag its inertia.

use std::f32::consts::PI;

use cgmath::{InnerSpace, Point3, Vector3};
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};

use crate::{camera::Camera, config::ControlsConfig};

const EPS: f32 = 0.000001;
/// Browsers report one wheel notch as roughly 100 pixels.
const PIXELS_PER_LINE: f32 = 100.0;

/// Polar coordinates around the orbit target. `phi` is measured from +Y,
/// `theta` around +Y starting at +Z.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct Spherical {
    radius: f32,
    phi: f32,
    theta: f32,
}

impl Spherical {
    fn from_offset(offset: Vector3<f32>) -> Self {
        let radius = offset.magnitude();
        if radius == 0.0 {
            return Self::default();
        }
        Self {
            radius,
            theta: offset.x.atan2(offset.z),
            phi: (offset.y / radius).clamp(-1.0, 1.0).acos(),
        }
    }

    fn to_offset(self) -> Vector3<f32> {
        let sin_phi_radius = self.phi.sin() * self.radius;
        Vector3::new(
            sin_phi_radius * self.theta.sin(),
            self.phi.cos() * self.radius,
            sin_phi_radius * self.theta.cos(),
        )
    }
}

#[derive(Debug)]
pub struct OrbitControls {
    config: ControlsConfig,
    delta: Spherical,
    scale: f32,
    rotating: bool,
    cursor: Option<(f64, f64)>,
    viewport_height: f32,
}

impl OrbitControls {
    pub fn new(config: ControlsConfig, viewport_height: u32) -> Self {
        Self {
            config,
            delta: Spherical::default(),
            scale: 1.0,
            rotating: false,
            cursor: None,
            viewport_height: viewport_height.max(1) as f32,
        }
    }

    pub fn target(&self) -> Point3<f32> {
        self.config.target
    }

    pub fn resize(&mut self, viewport_height: u32) {
        self.viewport_height = viewport_height.max(1) as f32;
    }

    /// Queue a rotation for a pointer drag of `dx`/`dy` pixels.
    pub fn rotate(&mut self, dx: f32, dy: f32) {
        let speed = self.config.rotate_speed;
        self.rotate_left(2.0 * PI * dx * speed / self.viewport_height);
        self.rotate_up(2.0 * PI * dy * speed / self.viewport_height);
    }

    /// Queue a zoom for a wheel movement of `delta_y` pixels. Negative values
    /// (wheel away from the user) move the camera closer.
    pub fn zoom(&mut self, delta_y: f32) {
        if !self.config.enable_zoom || delta_y == 0.0 {
            return;
        }
        let step = 0.95f32.powf(self.config.zoom_speed * (delta_y * 0.01).abs());
        if delta_y < 0.0 {
            self.scale *= step;
        } else {
            self.scale /= step;
        }
    }

    fn rotate_left(&mut self, angle: f32) {
        self.delta.theta -= angle;
    }

    fn rotate_up(&mut self, angle: f32) {
        self.delta.phi -= angle;
    }

    pub fn handle_window_events(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                self.rotating = *state == ElementState::Pressed;
            }
            WindowEvent::CursorMoved { position, .. } => {
                if let Some((x, y)) = self.cursor {
                    if self.rotating {
                        self.rotate((position.x - x) as f32, (position.y - y) as f32);
                    }
                }
                self.cursor = Some((position.x, position.y));
            }
            WindowEvent::CursorLeft { .. } => {
                self.cursor = None;
                self.rotating = false;
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let delta_y = match delta {
                    MouseScrollDelta::LineDelta(_, lines) => -lines * PIXELS_PER_LINE,
                    MouseScrollDelta::PixelDelta(position) => -position.y as f32,
                };
                self.zoom(delta_y);
            }
            WindowEvent::Resized(size) => self.resize(size.height),
            _ => (),
        }
    }

    /// Apply queued input to `camera`. `dt` is only used by auto-rotation.
    pub fn update(&mut self, camera: &mut Camera, dt: f32) {
        let target = self.config.target;
        let mut spherical = Spherical::from_offset(camera.position - target);

        if self.config.auto_rotate {
            let angle: cgmath::Rad<f32> = self.config.auto_rotate_speed.into();
            self.rotate_left(angle.0 * dt);
        }

        if self.config.enable_damping {
            spherical.theta += self.delta.theta * self.config.damping_factor;
            spherical.phi += self.delta.phi * self.config.damping_factor;
        } else {
            spherical.theta += self.delta.theta;
            spherical.phi += self.delta.phi;
        }

        spherical.phi = spherical
            .phi
            .clamp(self.config.min_polar_angle.0, self.config.max_polar_angle.0)
            .clamp(EPS, PI - EPS);
        spherical.radius = (spherical.radius * self.scale)
            .clamp(self.config.min_distance, self.config.max_distance);

        camera.position = target + spherical.to_offset();
        camera.target = target;

        if self.config.enable_damping {
            let decay = 1.0 - self.config.damping_factor;
            self.delta.theta *= decay;
            self.delta.phi *= decay;
        } else {
            self.delta = Spherical::default();
        }
        self.scale = 1.0;
    }
}

#[cfg(test)]
mod tests {
    use cgmath::MetricSpace;
    use winit::dpi::PhysicalPosition;

    use super::*;

    fn controls() -> OrbitControls {
        OrbitControls::new(ControlsConfig::default(), 720)
    }

    fn polar(camera: &Camera) -> Spherical {
        Spherical::from_offset(camera.position - camera.target)
    }

    #[test]
    fn idle_update_keeps_a_valid_position() {
        let mut controls = controls();
        let mut camera = Camera::new((4.0, 5.0, 11.0), (0.0, 1.0, 0.0));
        controls.update(&mut camera, 0.016);
        assert!(camera.position.distance(Point3::new(4.0, 5.0, 11.0)) < 1e-4);
        assert_eq!(camera.target, Point3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn polar_angle_is_clamped() {
        let mut controls = controls();
        let mut camera = Camera::new((0.0, 15.0, 0.01), (0.0, 1.0, 0.0));
        controls.update(&mut camera, 0.0);
        assert!((polar(&camera).phi - 0.5).abs() < 1e-4);

        let mut camera = Camera::new((0.0, -10.0, 1.0), (0.0, 1.0, 0.0));
        controls.update(&mut camera, 0.0);
        assert!((polar(&camera).phi - 1.5).abs() < 1e-4);
    }

    #[test]
    fn zoom_distance_is_clamped() {
        let mut controls = controls();
        let mut camera = Camera::new((4.0, 5.0, 11.0), (0.0, 1.0, 0.0));
        for _ in 0..200 {
            controls.zoom(-100.0);
            controls.update(&mut camera, 0.0);
        }
        assert!((polar(&camera).radius - 5.0).abs() < 1e-4);
        for _ in 0..200 {
            controls.zoom(100.0);
            controls.update(&mut camera, 0.0);
        }
        assert!((polar(&camera).radius - 20.0).abs() < 1e-3);
    }

    #[test]
    fn one_wheel_notch_scales_radius() {
        let mut controls = controls();
        let mut camera = Camera::new((0.0, 1.0, 10.0), (0.0, 1.0, 0.0));
        controls.zoom(-100.0);
        controls.update(&mut camera, 0.0);
        assert!((polar(&camera).radius - 9.5).abs() < 1e-4);
    }

    #[test]
    fn damped_rotation_decays() {
        let mut controls = controls();
        let mut camera = Camera::new((0.0, 1.0, 10.0), (0.0, 1.0, 0.0));
        controls.rotate(72.0, 0.0);
        let mut steps = Vec::new();
        let mut last = polar(&camera).theta;
        for _ in 0..4 {
            controls.update(&mut camera, 0.016);
            let theta = polar(&camera).theta;
            steps.push(theta - last);
            last = theta;
        }
        assert!(steps[0] < 0.0);
        for pair in steps.windows(2) {
            assert!((pair[1] / pair[0] - 0.95).abs() < 1e-3);
        }
    }

    #[test]
    fn drag_only_rotates_while_left_button_is_down() {
        let mut controls = controls();
        let moved = |x: f64| WindowEvent::CursorMoved {
            device_id: unsafe { winit::event::DeviceId::dummy() },
            position: PhysicalPosition::new(x, 100.0),
        };
        controls.handle_window_events(&moved(10.0));
        controls.handle_window_events(&moved(60.0));
        assert_eq!(controls.delta, Spherical::default());

        controls.handle_window_events(&WindowEvent::MouseInput {
            device_id: unsafe { winit::event::DeviceId::dummy() },
            state: ElementState::Pressed,
            button: MouseButton::Left,
        });
        controls.handle_window_events(&moved(96.0));
        assert!((controls.delta.theta + 2.0 * PI * 36.0 / 720.0).abs() < 1e-6);
    }

    #[test]
    fn pan_is_never_applied() {
        let mut controls = controls();
        let mut camera = Camera::new((4.0, 5.0, 11.0), (0.0, 1.0, 0.0));
        controls.rotate(300.0, -120.0);
        for _ in 0..100 {
            controls.update(&mut camera, 0.016);
            assert_eq!(camera.target, Point3::new(0.0, 1.0, 0.0));
        }
    }
}
