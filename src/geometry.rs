//! Primitive shapes used by the castle scene.
//!
//! A [`Shape`] knows two things about itself: how to turn into an indexed
//! triangle list for the renderer, and which local-space box (or sphere) to
//! use when a pointer ray is tested against it. All meshes are centred on the
//! local origin, matching the usual `y`-up convention (cylinders and cones
//! stand along `y`, planes lie in the `xy` plane).

use glam::Vec3;
use std::f32::consts::{PI, TAU};

use crate::scene::Color;


#[derive(Clone, Debug, PartialEq)]
pub enum Shape {
	Box { width: f32, height: f32, depth: f32 },
	Cylinder { radius_top: f32, radius_bottom: f32, height: f32, segments: u32 },
	Cone { radius: f32, height: f32, segments: u32 },
	Sphere { radius: f32, segments: u32 },
	Plane { width: f32, height: f32 },
	Points { positions: Vec<Vec3>, colors: Vec<Color>, size: f32 },
}

/// Hashable identity of a triangle mesh, used to share GPU buffers between
/// nodes with the same shape parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MeshKey {
	Box([u32; 3]),
	Cylinder([u32; 3], u32),
	Cone([u32; 2], u32),
	Sphere(u32, u32),
	Plane([u32; 2]),
}

#[derive(Clone, Debug, Default)]
pub struct MeshData {
	pub positions: Vec<[f32; 3]>,
	pub normals: Vec<[f32; 3]>,
	pub indices: Vec<u16>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Bounds {
	Aabb { min: Vec3, max: Vec3 },
	Sphere { radius: f32 },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
	pub origin: Vec3,
	pub direction: Vec3,
}


impl Shape {
	pub fn cuboid(width: f32, height: f32, depth: f32) -> Self {
		Shape::Box { width, height, depth }
	}

	pub fn cylinder(radius_top: f32, radius_bottom: f32, height: f32, segments: u32) -> Self {
		Shape::Cylinder {
			radius_top,
			radius_bottom,
			height,
			segments,
		}
	}

	pub fn cone(radius: f32, height: f32, segments: u32) -> Self {
		Shape::Cone { radius, height, segments }
	}

	pub fn sphere(radius: f32, segments: u32) -> Self {
		Shape::Sphere { radius, segments }
	}

	pub fn plane(width: f32, height: f32) -> Self {
		Shape::Plane { width, height }
	}

	pub fn is_points(&self) -> bool {
		matches!(self, Shape::Points { .. })
	}

	pub fn mesh_key(&self) -> Option<MeshKey> {
		match *self {
			Shape::Box { width, height, depth } => Some(MeshKey::Box([width.to_bits(), height.to_bits(), depth.to_bits()])),
			Shape::Cylinder {
				radius_top,
				radius_bottom,
				height,
				segments,
			} => Some(MeshKey::Cylinder([radius_top.to_bits(), radius_bottom.to_bits(), height.to_bits()], segments)),
			Shape::Cone { radius, height, segments } => Some(MeshKey::Cone([radius.to_bits(), height.to_bits()], segments)),
			Shape::Sphere { radius, segments } => Some(MeshKey::Sphere(radius.to_bits(), segments)),
			Shape::Plane { width, height } => Some(MeshKey::Plane([width.to_bits(), height.to_bits()])),
			Shape::Points { .. } => None,
		}
	}

	/// Triangle mesh for the renderer. Point clouds have no triangles.
	pub fn triangulate(&self) -> MeshData {
		match *self {
			Shape::Box { width, height, depth } => box_mesh(Vec3::new(width, height, depth) * 0.5),
			Shape::Cylinder {
				radius_top,
				radius_bottom,
				height,
				segments,
			} => cylinder_mesh(radius_top, radius_bottom, height, segments),
			Shape::Cone { radius, height, segments } => cylinder_mesh(0.0, radius, height, segments),
			Shape::Sphere { radius, segments } => sphere_mesh(radius, segments, segments),
			Shape::Plane { width, height } => plane_mesh(width, height),
			Shape::Points { .. } => MeshData::default(),
		}
	}

	/// Local-space pick volume, or `None` for shapes that can't be clicked.
	pub fn bounds(&self) -> Option<Bounds> {
		match *self {
			Shape::Box { width, height, depth } => {
				let half = Vec3::new(width, height, depth) * 0.5;
				Some(Bounds::Aabb { min: -half, max: half })
			},
			Shape::Cylinder {
				radius_top,
				radius_bottom,
				height,
				..
			} => {
				let r = radius_top.max(radius_bottom);
				let half = Vec3::new(r, height * 0.5, r);
				Some(Bounds::Aabb { min: -half, max: half })
			},
			Shape::Cone { radius, height, .. } => {
				let half = Vec3::new(radius, height * 0.5, radius);
				Some(Bounds::Aabb { min: -half, max: half })
			},
			Shape::Sphere { radius, .. } => Some(Bounds::Sphere { radius }),
			Shape::Plane { width, height } => {
				let half = Vec3::new(width * 0.5, height * 0.5, 0.0);
				Some(Bounds::Aabb { min: -half, max: half })
			},
			Shape::Points { .. } => None,
		}
	}
}


impl Ray {
	pub fn new(origin: Vec3, direction: Vec3) -> Self {
		Self { origin, direction }
	}

	pub fn at(&self, t: f32) -> Vec3 {
		self.origin + self.direction * t
	}

	/// Ray parameter of the first hit against `bounds`, if in front of the
	/// origin. The direction need not be normalised, which lets callers test
	/// in a node's local space and keep the world-space parameter.
	pub fn intersect(&self, bounds: &Bounds) -> Option<f32> {
		match *bounds {
			Bounds::Aabb { min, max } => self.intersect_aabb(min, max),
			Bounds::Sphere { radius } => self.intersect_sphere(Vec3::ZERO, radius),
		}
	}

	pub fn intersect_aabb(&self, min: Vec3, max: Vec3) -> Option<f32> {
		let mut t_min = 0.0f32;
		let mut t_max = f32::INFINITY;
		for axis in 0..3 {
			let origin = self.origin[axis];
			let dir = self.direction[axis];
			if dir.abs() < 1e-8 {
				if origin < min[axis] || origin > max[axis] {
					return None;
				}
				continue;
			}
			let inv = 1.0 / dir;
			let mut t0 = (min[axis] - origin) * inv;
			let mut t1 = (max[axis] - origin) * inv;
			if t0 > t1 {
				std::mem::swap(&mut t0, &mut t1);
			}
			t_min = t_min.max(t0);
			t_max = t_max.min(t1);
			if t_min > t_max {
				return None;
			}
		}
		Some(t_min)
	}

	pub fn intersect_sphere(&self, center: Vec3, radius: f32) -> Option<f32> {
		let m = self.origin - center;
		let a = self.direction.dot(self.direction);
		if a <= f32::EPSILON {
			return None;
		}
		let b = m.dot(self.direction);
		let c = m.dot(m) - radius * radius;
		let disc = b * b - a * c;
		if disc < 0.0 {
			return None;
		}
		let root = disc.sqrt();
		let near = (-b - root) / a;
		if near >= 0.0 {
			return Some(near);
		}
		// origin inside the sphere
		let far = (-b + root) / a;
		(far >= 0.0).then_some(0.0)
	}
}


fn box_mesh(half: Vec3) -> MeshData {
	let mut mesh = MeshData::default();
	// (normal, u axis, v axis) per face
	let faces = [
		(Vec3::X, Vec3::Z, Vec3::Y),
		(Vec3::NEG_X, Vec3::NEG_Z, Vec3::Y),
		(Vec3::Y, Vec3::X, Vec3::Z),
		(Vec3::NEG_Y, Vec3::X, Vec3::NEG_Z),
		(Vec3::Z, Vec3::NEG_X, Vec3::Y),
		(Vec3::NEG_Z, Vec3::X, Vec3::Y),
	];
	for (normal, u, v) in faces {
		let base = mesh.positions.len() as u16;
		let center = normal * half;
		let du = u * half;
		let dv = v * half;
		for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
			mesh.positions.push((center + du * su + dv * sv).to_array());
			mesh.normals.push(normal.to_array());
		}
		mesh.indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
	}
	mesh
}

fn cylinder_mesh(radius_top: f32, radius_bottom: f32, height: f32, segments: u32) -> MeshData {
	let segments = segments.max(3);
	let half = height * 0.5;
	let slope = (radius_bottom - radius_top) / height.max(f32::EPSILON);
	let mut mesh = MeshData::default();

	for i in 0..=segments {
		let theta = i as f32 / segments as f32 * TAU;
		let (sin, cos) = theta.sin_cos();
		let normal = Vec3::new(sin, slope, cos).normalize();
		mesh.positions.push([radius_top * sin, half, radius_top * cos]);
		mesh.normals.push(normal.to_array());
		mesh.positions.push([radius_bottom * sin, -half, radius_bottom * cos]);
		mesh.normals.push(normal.to_array());
	}
	for i in 0..segments as u16 {
		let top = i * 2;
		let bottom = top + 1;
		mesh.indices.extend_from_slice(&[top, bottom, top + 2, bottom, bottom + 2, top + 2]);
	}

	for (radius, y, normal) in [(radius_top, half, Vec3::Y), (radius_bottom, -half, Vec3::NEG_Y)] {
		if radius <= 0.0 {
			continue;
		}
		let center = mesh.positions.len() as u16;
		mesh.positions.push([0.0, y, 0.0]);
		mesh.normals.push(normal.to_array());
		for i in 0..=segments {
			let theta = i as f32 / segments as f32 * TAU;
			mesh.positions.push([radius * theta.sin(), y, radius * theta.cos()]);
			mesh.normals.push(normal.to_array());
		}
		for i in 0..segments as u16 {
			let a = center + 1 + i;
			if y > 0.0 {
				mesh.indices.extend_from_slice(&[center, a, a + 1]);
			} else {
				mesh.indices.extend_from_slice(&[center, a + 1, a]);
			}
		}
	}
	mesh
}

fn sphere_mesh(radius: f32, longitude_segments: u32, latitude_segments: u32) -> MeshData {
	let lon = longitude_segments.max(3);
	let lat = latitude_segments.max(2);
	let mut mesh = MeshData::default();

	for y in 0..=lat {
		let phi = y as f32 / lat as f32 * PI;
		let (sin_phi, cos_phi) = phi.sin_cos();
		for x in 0..=lon {
			let theta = x as f32 / lon as f32 * TAU;
			let n = Vec3::new(sin_phi * theta.cos(), cos_phi, sin_phi * theta.sin());
			mesh.positions.push((n * radius).to_array());
			mesh.normals.push(n.to_array());
		}
	}

	let row = lon + 1;
	for y in 0..lat {
		for x in 0..lon {
			let i0 = (y * row + x) as u16;
			let i1 = i0 + 1;
			let i2 = i0 + row as u16;
			let i3 = i2 + 1;
			mesh.indices.extend_from_slice(&[i0, i1, i2, i1, i3, i2]);
		}
	}
	mesh
}

fn plane_mesh(width: f32, height: f32) -> MeshData {
	let (hw, hh) = (width * 0.5, height * 0.5);
	MeshData {
		positions: vec![[-hw, -hh, 0.0], [hw, -hh, 0.0], [hw, hh, 0.0], [-hw, hh, 0.0]],
		normals: vec![[0.0, 0.0, 1.0]; 4],
		indices: vec![0, 1, 2, 0, 2, 3],
	}
}


#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn sphere_hit_distance() {
		let ray = Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::NEG_Z);
		let t = ray.intersect_sphere(Vec3::ZERO, 1.0).expect("should hit");
		assert!((t - 9.0).abs() < 1e-5);
		assert!(ray.intersect_sphere(Vec3::new(5.0, 0.0, 0.0), 1.0).is_none());
	}

	#[test]
	fn sphere_behind_origin_is_missed() {
		let ray = Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::Z);
		assert!(ray.intersect_sphere(Vec3::ZERO, 1.0).is_none());
	}

	#[test]
	fn aabb_hit_and_miss() {
		let ray = Ray::new(Vec3::new(-10.0, 0.5, 0.0), Vec3::X);
		let t = ray.intersect_aabb(Vec3::splat(-1.0), Vec3::splat(1.0)).expect("should hit");
		assert!((t - 9.0).abs() < 1e-5);

		let above = Ray::new(Vec3::new(-10.0, 3.0, 0.0), Vec3::X);
		assert!(above.intersect_aabb(Vec3::splat(-1.0), Vec3::splat(1.0)).is_none());
	}

	#[test]
	fn unnormalised_direction_keeps_world_parameter() {
		// a ray scaled by 2 reaches the same point at half the parameter
		let ray = Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::new(0.0, 0.0, -2.0));
		let t = ray.intersect(&Bounds::Sphere { radius: 1.0 }).unwrap();
		assert!((ray.at(t).z - 1.0).abs() < 1e-5);
	}

	#[test]
	fn meshes_have_consistent_buffers() {
		for shape in [
			Shape::cuboid(1.0, 2.0, 3.0),
			Shape::cylinder(1.0, 2.0, 4.0, 12),
			Shape::cone(1.0, 2.0, 8),
			Shape::sphere(1.0, 16),
			Shape::plane(4.0, 2.0),
		] {
			let mesh = shape.triangulate();
			assert_eq!(mesh.positions.len(), mesh.normals.len());
			assert_eq!(mesh.indices.len() % 3, 0);
			assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.positions.len()));
		}
	}

	#[test]
	fn equal_shapes_share_a_mesh_key() {
		assert_eq!(Shape::sphere(1.0, 16).mesh_key(), Shape::sphere(1.0, 16).mesh_key());
		assert_ne!(Shape::sphere(1.0, 16).mesh_key(), Shape::sphere(0.5, 16).mesh_key());
		let points = Shape::Points {
			positions: vec![Vec3::ZERO],
			colors: vec![Color::WHITE],
			size: 0.1,
		};
		assert!(points.mesh_key().is_none());
		assert!(points.bounds().is_none());
	}
}
