//! Perspective camera, pointer rays, orbit controls and the intro flight.

use glam::{Mat4, Vec2, Vec3, Vec4Swizzles};
use std::f32::consts::{PI, TAU};

use crate::geometry::Ray;


#[derive(Clone, Debug)]
pub struct Camera {
	pub fov_y_degrees: f32,
	pub aspect: f32,
	pub near: f32,
	pub far: f32,
	pub position: Vec3,
	target: Vec3,
}

impl Camera {
	pub fn new(fov_y_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
		Self {
			fov_y_degrees,
			aspect,
			near,
			far,
			position: Vec3::new(0.0, 0.0, 1.0),
			target: Vec3::ZERO,
		}
	}

	pub fn look_at(&mut self, target: Vec3) {
		self.target = target;
	}

	pub fn target(&self) -> Vec3 {
		self.target
	}

	pub fn set_aspect(&mut self, aspect: f32) {
		if aspect.is_finite() && aspect > 0.0 {
			self.aspect = aspect;
		}
	}

	pub fn view_matrix(&self) -> Mat4 {
		Mat4::look_at_rh(self.position, self.target, Vec3::Y)
	}

	pub fn projection_matrix(&self) -> Mat4 {
		Mat4::perspective_rh_gl(self.fov_y_degrees.to_radians(), self.aspect, self.near, self.far)
	}

	pub fn view_projection(&self) -> Mat4 {
		self.projection_matrix() * self.view_matrix()
	}

	/// World-space ray from the eye through normalised device coordinates
	/// (`x`, `y` in `[-1, 1]`, `y` up).
	pub fn ray_from_ndc(&self, ndc: Vec2) -> Ray {
		let inverse = self.view_projection().inverse();
		let near = inverse * ndc.extend(-1.0).extend(1.0);
		let far = inverse * ndc.extend(1.0).extend(1.0);
		let near = near.xyz() / near.w;
		let far = far.xyz() / far.w;
		Ray::new(self.position, (far - near).normalize_or_zero())
	}

	/// Camera-space right and up axes in world coordinates.
	fn basis(&self) -> (Vec3, Vec3) {
		let view = self.view_matrix().inverse();
		(view.x_axis.xyz(), view.y_axis.xyz())
	}
}


/// Orbit-style camera controls: drag to rotate around a target, drag with
/// the secondary button to pan, wheel to zoom. Input accumulates into deltas
/// that decay by `damping` each update.
#[derive(Clone, Debug)]
pub struct OrbitControls {
	pub target: Vec3,
	pub damping: f32,
	pub max_polar_angle: f32,
	pub min_distance: f32,
	pub max_distance: f32,
	pub rotate_speed: f32,
	pub zoom_step: f32,
	theta_delta: f32,
	phi_delta: f32,
	pan_offset: Vec3,
	scale: f32,
}

impl OrbitControls {
	pub fn new(target: Vec3) -> Self {
		Self {
			target,
			damping: 0.05,
			max_polar_angle: PI * 0.48,
			min_distance: 0.0,
			max_distance: f32::INFINITY,
			rotate_speed: 1.0,
			zoom_step: 0.95,
			theta_delta: 0.0,
			phi_delta: 0.0,
			pan_offset: Vec3::ZERO,
			scale: 1.0,
		}
	}

	pub fn rotate(&mut self, dx_px: f32, dy_px: f32, viewport_height: f32) {
		let height = viewport_height.max(1.0);
		self.theta_delta -= TAU * dx_px / height * self.rotate_speed;
		self.phi_delta -= TAU * dy_px / height * self.rotate_speed;
	}

	pub fn pan(&mut self, camera: &Camera, dx_px: f32, dy_px: f32, viewport_height: f32) {
		let height = viewport_height.max(1.0);
		let distance = (camera.position - self.target).length() * (camera.fov_y_degrees.to_radians() * 0.5).tan();
		let (right, up) = camera.basis();
		self.pan_offset += right * (-2.0 * dx_px * distance / height);
		self.pan_offset += up * (2.0 * dy_px * distance / height);
	}

	/// Negative wheel deltas zoom in.
	pub fn zoom(&mut self, wheel_delta: f32) {
		if wheel_delta < 0.0 {
			self.scale *= self.zoom_step;
		} else if wheel_delta > 0.0 {
			self.scale /= self.zoom_step;
		}
	}

	/// Applies one damped step of accumulated input to `camera`.
	pub fn update(&mut self, camera: &mut Camera) {
		let offset = camera.position - self.target;
		let mut radius = offset.length();
		let mut theta = offset.x.atan2(offset.z);
		let mut phi = if radius > 0.0 { (offset.y / radius).clamp(-1.0, 1.0).acos() } else { 0.0 };

		theta += self.theta_delta * self.damping;
		phi += self.phi_delta * self.damping;
		phi = phi.clamp(1e-6, self.max_polar_angle);

		radius = (radius * self.scale).clamp(self.min_distance, self.max_distance);
		self.target += self.pan_offset * self.damping;

		let sin_phi = phi.sin();
		let offset = Vec3::new(radius * sin_phi * theta.sin(), radius * phi.cos(), radius * sin_phi * theta.cos());
		camera.position = self.target + offset;
		camera.look_at(self.target);

		let decay = 1.0 - self.damping;
		self.theta_delta *= decay;
		self.phi_delta *= decay;
		self.pan_offset *= decay;
		self.scale = 1.0;
	}
}


/// The scripted flight around the castle played once before free orbit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CameraMode {
	Intro { elapsed: f32 },
	Free,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IntroPath {
	pub duration: f32,
	pub start_radius: f32,
	pub end_radius: f32,
	pub start_angle: f32,
	pub end_angle: f32,
	pub base_height: f32,
	pub bob_height: f32,
	pub look_at: Vec3,
}

impl Default for IntroPath {
	fn default() -> Self {
		Self {
			duration: 6.0,
			start_radius: 160.0,
			end_radius: 110.0,
			start_angle: 0.6,
			end_angle: 2.4,
			base_height: 40.0,
			bob_height: 20.0,
			look_at: Vec3::new(0.0, 12.0, 0.0),
		}
	}
}

impl IntroPath {
	/// Smoothstep of progress after `elapsed` seconds.
	pub fn ease(&self, elapsed: f32) -> f32 {
		let k = if self.duration > 0.0 { (elapsed / self.duration).clamp(0.0, 1.0) } else { 1.0 };
		k * k * (3.0 - 2.0 * k)
	}

	pub fn position(&self, elapsed: f32) -> Vec3 {
		let e = self.ease(elapsed);
		let radius = self.start_radius + (self.end_radius - self.start_radius) * e;
		let angle = self.start_angle + (self.end_angle - self.start_angle) * e;
		Vec3::new(angle.cos() * radius, self.base_height + self.bob_height * (e * PI).sin(), angle.sin() * radius)
	}
}


#[cfg(test)]
mod tests {
	use super::*;

	fn camera() -> Camera {
		let mut camera = Camera::new(55.0, 1.5, 0.1, 2000.0);
		camera.position = Vec3::new(0.0, 12.0, 50.0);
		camera.look_at(Vec3::new(0.0, 12.0, 0.0));
		camera
	}

	#[test]
	fn centre_ray_points_at_target() {
		let camera = camera();
		let ray = camera.ray_from_ndc(Vec2::ZERO);
		assert_eq!(ray.origin, camera.position);
		assert!((ray.direction - Vec3::NEG_Z).length() < 1e-4);
		assert!((ray.direction.length() - 1.0).abs() < 1e-5);
	}

	#[test]
	fn right_edge_ray_leans_right() {
		let ray = camera().ray_from_ndc(Vec2::new(1.0, 0.0));
		assert!(ray.direction.x > 0.0);
		assert!(ray.direction.y.abs() < 1e-4);
	}

	#[test]
	fn intro_eases_between_endpoints() {
		let path = IntroPath::default();
		assert_eq!(path.ease(0.0), 0.0);
		assert_eq!(path.ease(3.0), 0.5);
		assert_eq!(path.ease(6.0), 1.0);
		assert_eq!(path.ease(60.0), 1.0);

		let start = path.position(0.0);
		assert!((start.length_squared() - start.y * start.y - 160.0 * 160.0).abs() < 1e-1);
		assert!((start.y - 40.0).abs() < 1e-5);

		let end = path.position(6.0);
		assert!((end.x - 2.4f32.cos() * 110.0).abs() < 1e-3);
		assert!((end.z - 2.4f32.sin() * 110.0).abs() < 1e-3);
		assert!((end.y - 40.0).abs() < 1e-3);

		let middle = path.position(3.0);
		assert!((middle.y - 60.0).abs() < 1e-3);
	}

	#[test]
	fn orbit_keeps_camera_above_the_horizon() {
		let mut camera = camera();
		let mut controls = OrbitControls::new(Vec3::new(0.0, 12.0, 0.0));
		for _ in 0..500 {
			controls.rotate(0.0, -400.0, 600.0);
			controls.update(&mut camera);
		}
		let offset = camera.position - controls.target;
		let phi = (offset.y / offset.length()).acos();
		assert!(phi <= controls.max_polar_angle + 1e-4);
		assert!(camera.position.y > controls.target.y);
	}

	#[test]
	fn orbit_input_is_damped() {
		let mut camera = camera();
		let mut controls = OrbitControls::new(Vec3::new(0.0, 12.0, 0.0));
		controls.rotate(100.0, 0.0, 600.0);
		let before = camera.position;
		controls.update(&mut camera);
		let first_step = (camera.position - before).length();
		let mid = camera.position;
		controls.update(&mut camera);
		let second_step = (camera.position - mid).length();
		assert!(first_step > 0.0);
		assert!(second_step < first_step);
	}

	#[test]
	fn zoom_changes_distance() {
		let mut camera = camera();
		let mut controls = OrbitControls::new(Vec3::new(0.0, 12.0, 0.0));
		controls.zoom(-1.0);
		controls.update(&mut camera);
		assert!((camera.position - controls.target).length() < 50.0);
		controls.zoom(1.0);
		controls.zoom(1.0);
		controls.update(&mut camera);
		assert!((camera.position - controls.target).length() > 50.0);
	}

	#[test]
	fn pan_moves_target() {
		let mut camera = camera();
		let mut controls = OrbitControls::new(Vec3::new(0.0, 12.0, 0.0));
		controls.pan(&camera, 50.0, 0.0, 600.0);
		controls.update(&mut camera);
		assert!(controls.target.x < 0.0);
	}
}
