//! Builds Highspire Keep: mountain, castle, crowd, balloons, characters and
//! clouds. Everything except the returned handles is decoration.

use glam::{Quat, Vec3};
use rand::Rng;
use std::f32::consts::{FRAC_PI_2, PI, TAU};

use crate::crowd::Crowd;
use crate::dialogue::Character;
use crate::geometry::Shape;
use crate::scene::{Color, Material, Node, NodeId, Role, Scene, SceneError};

pub const SKY: u32 = 0x87c6ff;
pub const FOG_DENSITY: f32 = 0.012;

const STONE: u32 = 0xddd7cc;
const STONE_SHADOW: u32 = 0xbfb8ab;
const ROOF_RED: u32 = 0xc64a4a;
const ROOF_BLUE: u32 = 0x4662d6;
const WOOD: u32 = 0x7a5a3a;
const GRASS: u32 = 0x7dc77a;
const BALLOON_COLORS: [u32; 5] = [0xff5e5e, 0x7ec8e3, 0xffd166, 0x95d27a, 0xd6a2e8];

const WALL_RADIUS: f32 = 38.0;
const WALL_HEIGHT: f32 = 16.0;
const SEGMENTS: usize = 6;
const TOWER_RADIUS: f32 = 5.0;


/// The interactive parts of the scene.
#[derive(Debug, Default)]
pub struct CastleHandles {
	pub characters: Vec<Character>,
	pub balloons: Vec<NodeId>,
	pub cannons: Vec<NodeId>,
	pub crowd: Option<Crowd>,
}

pub fn new_scene() -> Scene {
	Scene::new(Color::hex(SKY), FOG_DENSITY)
}

pub fn build_castle_scene<R: Rng>(scene: &mut Scene, rng: &mut R, balloon_count: usize) -> Result<CastleHandles, SceneError> {
	build_mountain(scene);
	let castle = scene.add(Node::group());
	let (flags, cannons) = build_walls(scene, castle, rng)?;
	build_keep(scene, castle)?;
	let mut crowd = build_crowd(scene, rng)?;
	crowd.flags = flags;
	let balloons = build_balloons(scene, rng, balloon_count);
	let characters = build_characters(scene);
	build_clouds(scene, rng);

	Ok(CastleHandles {
		characters,
		balloons,
		cannons,
		crowd: Some(crowd),
	})
}

fn build_mountain(scene: &mut Scene) {
	scene.add(Node::mesh(Shape::cylinder(150.0, 260.0, 80.0, 24), Material::solid(0x8fa3b7)).at(Vec3::new(0.0, -30.0, 0.0)));
	scene.add(Node::mesh(Shape::cylinder(120.0, 140.0, 12.0, 24), Material::solid(GRASS)).at(Vec3::new(0.0, 6.0, 0.0)));
}

/// Towers, roofs, flags, walls, crenellations and one cannon per wall.
fn build_walls<R: Rng>(scene: &mut Scene, castle: NodeId, rng: &mut R) -> Result<(Vec<(NodeId, f32)>, Vec<NodeId>), SceneError> {
	let stone = Material::solid(STONE);
	let roofs = [Material::solid(ROOF_RED), Material::solid(ROOF_BLUE)];
	let tower_height = WALL_HEIGHT + 6.0;

	let towers: Vec<Vec3> = (0..SEGMENTS)
		.map(|i| {
			let angle = i as f32 / SEGMENTS as f32 * TAU;
			Vec3::new(angle.cos() * WALL_RADIUS, 0.0, angle.sin() * WALL_RADIUS)
		})
		.collect();

	let mut flags = Vec::new();
	for (i, pos) in towers.iter().enumerate() {
		let pos = *pos;
		scene.add_child(
			castle,
			Node::mesh(Shape::cylinder(TOWER_RADIUS, TOWER_RADIUS, tower_height, 16), stone).at(pos.with_y(tower_height / 2.0)),
		)?;
		scene.add_child(
			castle,
			Node::mesh(Shape::cone(TOWER_RADIUS + 1.5, 8.0, 16), roofs[i % roofs.len()]).at(pos.with_y(tower_height + 4.0)),
		)?;
		scene.add_child(
			castle,
			Node::mesh(Shape::cylinder(0.15, 0.15, 6.0, 6), Material::solid(0xe7e7e7)).at(pos.with_y(tower_height + 8.0)),
		)?;
		let flag = scene.add_child(
			castle,
			Node::mesh(Shape::cuboid(3.0, 1.2, 0.05), Material::solid(0xffffff)).at(pos + Vec3::new(1.8, tower_height + 8.0, 0.0)),
		)?;
		flags.push((flag, rng.random::<f32>() * 10.0));
	}

	let mut cannons = Vec::new();
	for i in 0..SEGMENTS {
		let a = towers[i];
		let b = towers[(i + 1) % SEGMENTS];
		let dir = b - a;
		let len = dir.length() - TOWER_RADIUS * 2.0;
		let mid = (a + b) * 0.5;
		let facing = Quat::from_rotation_y((-dir.z).atan2(dir.x));

		scene.add_child(
			castle,
			Node::mesh(Shape::cuboid(len, WALL_HEIGHT, 3.0), stone)
				.at(mid.with_y(WALL_HEIGHT / 2.0))
				.rotated(facing),
		)?;

		let slots = ((len / 3.0).floor() as usize).max(6);
		for s in 0..slots {
			let t = s as f32 / (slots - 1) as f32;
			let at = a.lerp(b, t).with_y(WALL_HEIGHT + 1.2);
			scene.add_child(castle, Node::mesh(Shape::cuboid(1.2, 2.0, 2.0), Material::solid(STONE_SHADOW)).at(at).rotated(facing))?;
		}

		let cannon = scene.add_child(
			castle,
			Node::mesh(Shape::cylinder(0.7, 0.9, 6.0, 12), Material::solid(0x222222))
				.at(mid.with_y(WALL_HEIGHT + 1.8))
				.rotated(facing * Quat::from_rotation_z(FRAC_PI_2))
				.with_role(Role::Cannon),
		)?;
		cannons.push(cannon);
	}
	Ok((flags, cannons))
}

fn build_keep(scene: &mut Scene, castle: NodeId) -> Result<(), SceneError> {
	let stone = Material::solid(STONE);
	scene.add_child(castle, Node::mesh(Shape::cylinder(12.0, 14.0, 28.0, 20), stone).at(Vec3::new(0.0, 14.0, 0.0)))?;
	scene.add_child(castle, Node::mesh(Shape::cone(14.0, 10.0, 20), Material::solid(ROOF_RED)).at(Vec3::new(0.0, 33.0, 0.0)))?;
	scene.add_child(
		castle,
		Node::mesh(Shape::cuboid(10.0, 14.0, 6.0), stone)
			.at(Vec3::new(WALL_RADIUS, 7.0, 0.0))
			.rotated(Quat::from_rotation_y(FRAC_PI_2)),
	)?;
	scene.add_child(castle, Node::mesh(Shape::cuboid(3.5, 6.0, 0.5), Material::solid(WOOD)).at(Vec3::new(WALL_RADIUS + 0.5, 3.0, 0.0)))?;
	Ok(())
}

fn build_crowd<R: Rng>(scene: &mut Scene, rng: &mut R) -> Result<Crowd, SceneError> {
	let group = scene.add(Node::group());
	let mut crowd = Crowd::default();
	for _ in 0..18 {
		let tint = Color::hsl(0.1 + 0.7 * rng.random::<f32>(), 0.55, 0.55);
		let material = Material {
			color: tint,
			..Material::default()
		};
		let at = Vec3::new((rng.random::<f32>() - 0.5) * 40.0, 0.8, (rng.random::<f32>() - 0.5) * 40.0);
		crowd.people.push(scene.add_child(group, Node::mesh(Shape::cuboid(0.8, 1.6, 0.8), material).at(at))?);
	}
	for _ in 0..8 {
		let at = Vec3::new((rng.random::<f32>() - 0.5) * 40.0, 0.9, (rng.random::<f32>() - 0.5) * 40.0);
		crowd.horses.push(scene.add_child(
			group,
			Node::mesh(Shape::cylinder(0.5, 0.5, 1.8, 8), Material::solid(0x7b4a2f))
				.at(at)
				.rotated(Quat::from_rotation_z(FRAC_PI_2)),
		)?);
	}
	Ok(crowd)
}

fn build_balloons<R: Rng>(scene: &mut Scene, rng: &mut R, count: usize) -> Vec<NodeId> {
	(0..count)
		.map(|i| {
			let material = Material {
				color: Color::hex(BALLOON_COLORS[i % BALLOON_COLORS.len()]),
				..Material::default()
			};
			let at = Vec3::new(
				(rng.random::<f32>() - 0.5) * 70.0,
				10.0 + rng.random::<f32>() * 24.0,
				(rng.random::<f32>() - 0.5) * 70.0,
			);
			scene.add(Node::mesh(Shape::sphere(1.0, 16), material).at(at).with_role(Role::Balloon))
		})
		.collect()
}

fn build_characters(scene: &mut Scene) -> Vec<Character> {
	let marker = Shape::cone(1.0, 2.0, 8);
	let elowen = scene.add(
		Node::mesh(marker.clone(), Material::solid(0x3344ff))
			.at(Vec3::new(WALL_RADIUS - 4.0, 1.0, -6.0))
			.with_role(Role::Character),
	);
	let brann = scene.add(
		Node::mesh(marker, Material::solid(0xff3366))
			.at(Vec3::new(-8.0, 1.0, 8.0))
			.with_role(Role::Character),
	);
	vec![
		Character::new(
			"Captain Elowen",
			elowen,
			&["Welcome to Highspire Keep!", "Our lookouts and cannons keep the skies safe."],
		),
		Character::new(
			"Stablemaster Brann",
			brann,
			&["The horses are spirited today.", "Pop a few balloons to entertain the squires!"],
		),
	]
}

fn build_clouds<R: Rng>(scene: &mut Scene, rng: &mut R) {
	let cloud = Material::solid(0xffffff).with_opacity(0.55);
	for _ in 0..6 {
		let at = Vec3::new(
			(rng.random::<f32>() - 0.5) * 180.0,
			55.0 + rng.random::<f32>() * 20.0,
			(rng.random::<f32>() - 0.5) * 180.0,
		);
		scene.add(Node::mesh(Shape::plane(120.0, 60.0), cloud).at(at).rotated(Quat::from_rotation_x(-PI / 2.0)));
	}
}
