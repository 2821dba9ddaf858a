//! The per-frame controller: camera, cannons, projectiles, clicks.
//!
//! `Game` owns the scene and everything that reads or writes it. The web
//! shell only forwards events and frame timestamps; the headless runner and
//! the tests drive the same type directly.

use glam::{Vec2, Vec3};
use indexmap::IndexMap;
use log::{debug, info, warn};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::rc::Rc;

use crate::builder::{self, CastleHandles};
use crate::camera::{Camera, CameraMode, IntroPath, OrbitControls};
use crate::clock::WallClock;
use crate::config::GameConfig;
use crate::crowd::Crowd;
use crate::dialogue::{Character, DialogueSystem, DialogueView};
use crate::geometry::{Ray, Shape};
use crate::minigame::{BalloonMinigame, Scoreboard};
use crate::render::SceneRenderer;
use crate::scene::{Material, Node, NodeId, Scene, SceneError};
use crate::sound::PopSound;

const FOV_Y: f32 = 55.0;
const NEAR: f32 = 0.1;
const FAR: f32 = 2000.0;
const SHOT_RADIUS: f32 = 0.5;
const SHOT_COLOR: u32 = 0xffa500;
const CANNONBALL_COLOR: u32 = 0x555555;


/// Everything the game talks to outside the scene.
pub struct Services {
	pub dialogue_view: Box<dyn DialogueView>,
	pub scoreboard: Box<dyn Scoreboard>,
	pub sound: Box<dyn PopSound>,
	pub clock: Rc<dyn WallClock>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cannon {
	pub node: NodeId,
	pub cooldown: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projectile {
	pub node: NodeId,
	pub velocity: Vec3,
	pub life: f32,
}

/// What a click ended up doing. Exactly one per click.
#[derive(Clone, Debug, PartialEq)]
pub enum ClickOutcome {
	Talked { name: String },
	Popped(NodeId),
	Shot(NodeId),
}

/// Pointer input for the orbit camera, in CSS pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum OrbitGesture {
	Rotate { dx: f32, dy: f32 },
	Pan { dx: f32, dy: f32 },
	Zoom { delta: f32 },
}


pub struct Game {
	config: GameConfig,
	scene: Scene,
	camera: Camera,
	controls: OrbitControls,
	intro: IntroPath,
	mode: CameraMode,
	characters: IndexMap<NodeId, Rc<Character>>,
	cannons: Vec<Cannon>,
	projectiles: Vec<Projectile>,
	crowd: Option<Crowd>,
	minigame: BalloonMinigame,
	dialogue: DialogueSystem,
	sound: Box<dyn PopSound>,
	rng: ChaCha8Rng,
	viewport: (f32, f32),
}

impl Game {
	/// Builds Highspire Keep from `config` and wires it to `services`.
	pub fn new(config: GameConfig, aspect: f32, services: Services) -> Result<Self, SceneError> {
		let mut rng = rng_for(&config);
		let mut scene = builder::new_scene();
		let handles = builder::build_castle_scene(&mut scene, &mut rng, config.balloon_count)?;
		Ok(Self::assemble(config, scene, handles, aspect, services, rng))
	}

	/// Wraps an already built scene. `handles` names the interactive nodes in
	/// it; balloons are found by their role tag.
	pub fn from_parts(config: GameConfig, scene: Scene, handles: CastleHandles, aspect: f32, services: Services) -> Self {
		let rng = rng_for(&config);
		Self::assemble(config, scene, handles, aspect, services, rng)
	}

	fn assemble(config: GameConfig, scene: Scene, handles: CastleHandles, aspect: f32, services: Services, mut rng: ChaCha8Rng) -> Self {
		let intro = IntroPath {
			duration: config.intro_duration,
			..IntroPath::default()
		};
		let mut camera = Camera::new(FOV_Y, aspect, NEAR, FAR);
		let controls = OrbitControls::new(intro.look_at);
		let mode = if config.skip_intro {
			camera.position = intro.position(intro.duration);
			CameraMode::Free
		} else {
			camera.position = intro.position(0.0);
			CameraMode::Intro { elapsed: 0.0 }
		};
		camera.look_at(intro.look_at);

		let minigame = BalloonMinigame::new(&scene, services.scoreboard, services.clock, &mut rng)
			.with_confetti(config.confetti_particles, config.confetti_lifetime_ms);
		let characters = handles
			.characters
			.into_iter()
			.map(|c| (c.node, Rc::new(c)))
			.collect::<IndexMap<_, _>>();
		let cannons = handles.cannons.into_iter().map(|node| Cannon { node, cooldown: 0.0 }).collect::<Vec<_>>();
		info!(
			"Highspire Keep ready: {} characters, {} cannons, {} balloons",
			characters.len(),
			cannons.len(),
			minigame.balloons().count()
		);

		Self {
			config,
			scene,
			camera,
			controls,
			intro,
			mode,
			characters,
			cannons,
			projectiles: Vec::new(),
			crowd: handles.crowd,
			minigame,
			dialogue: DialogueSystem::new(services.dialogue_view),
			sound: services.sound,
			rng,
			viewport: (1.0, 1.0),
		}
	}

	/// One animation frame: simulate, then draw exactly once.
	pub fn frame(&mut self, dt: f32, t: f32, renderer: &mut dyn SceneRenderer) {
		self.update(dt, t);
		renderer.render(&self.scene, &self.camera);
	}

	pub fn update(&mut self, dt: f32, t: f32) {
		self.update_camera(dt);
		self.fire_cannons(dt);
		self.integrate_projectiles(dt);

		if let Err(err) = self.minigame.update(&mut self.scene, dt, t) {
			warn!("minigame update skipped: {err}");
		}
		if let Some(crowd) = &self.crowd {
			if let Err(err) = crowd.update(&mut self.scene, dt, t) {
				warn!("crowd update skipped: {err}");
			}
		}
	}

	fn update_camera(&mut self, dt: f32) {
		match self.mode {
			CameraMode::Intro { elapsed } => {
				let elapsed = elapsed + dt;
				self.camera.position = self.intro.position(elapsed);
				self.camera.look_at(self.intro.look_at);
				self.controls.target = self.intro.look_at;
				self.mode = if elapsed >= self.intro.duration {
					debug!("intro finished");
					CameraMode::Free
				} else {
					CameraMode::Intro { elapsed }
				};
			},
			CameraMode::Free => self.controls.update(&mut self.camera),
		}
	}

	fn fire_cannons(&mut self, dt: f32) {
		let mut muzzles = Vec::new();
		for (i, cannon) in self.cannons.iter_mut().enumerate() {
			cannon.cooldown -= dt;
			if cannon.cooldown > 0.0 {
				continue;
			}
			cannon.cooldown = self.config.cannon_cooldown(i);
			match self.scene.world_position(cannon.node) {
				Ok(at) => muzzles.push(at + Vec3::Y * self.config.cannon_muzzle_height),
				Err(err) => warn!("cannon {i} can't fire: {err}"),
			}
		}

		for muzzle in muzzles {
			let direction = Vec3::new(
				self.rng.random_range(-0.3..0.3),
				0.3 + self.rng.random_range(0.0..0.2),
				self.rng.random_range(-0.3..0.3),
			)
			.normalize();
			let velocity = direction * self.config.cannon_shot_speed;
			self.spawn_projectile(muzzle, velocity, self.config.cannon_shot_life, CANNONBALL_COLOR);
		}
	}

	/// Moves every projectile and pops the balloons it touches. Shots keep
	/// flying after a hit.
	fn integrate_projectiles(&mut self, dt: f32) {
		let gravity = self.config.gravity;
		let pop_radius = self.config.pop_radius;

		for i in (0..self.projectiles.len()).rev() {
			let projectile = &mut self.projectiles[i];
			projectile.velocity.y -= gravity * dt;
			projectile.life -= dt;
			let velocity = projectile.velocity;
			let node = projectile.node;

			let position = match self.scene.node_mut(node) {
				Ok(n) => {
					n.transform.translation += velocity * dt;
					n.transform.translation
				},
				Err(err) => {
					warn!("dropping projectile: {err}");
					self.projectiles.remove(i);
					continue;
				},
			};

			if self.projectiles[i].life <= 0.0 {
				let _ = self.scene.remove(node);
				self.projectiles.remove(i);
				continue;
			}

			let hits = self
				.minigame
				.balloons()
				.filter(|b| self.scene.world_position(*b).is_ok_and(|p| p.distance(position) < pop_radius))
				.collect::<Vec<_>>();
			for balloon in hits {
				self.pop(balloon);
			}
		}
	}

	fn pop(&mut self, balloon: NodeId) -> bool {
		let popped = self.minigame.pop(&mut self.scene, balloon, &mut self.rng);
		if popped && self.sound.is_ready() {
			self.sound.play();
		}
		popped
	}

	pub fn spawn_projectile(&mut self, at: Vec3, velocity: Vec3, life: f32, color: u32) -> NodeId {
		let node = self
			.scene
			.add(Node::mesh(Shape::sphere(SHOT_RADIUS, 8), Material::solid(color)).at(at));
		self.projectiles.push(Projectile { node, velocity, life });
		node
	}

	/// Resolves a click at `ndc`: talk beats pop beats shoot.
	pub fn click(&mut self, ndc: Vec2) -> ClickOutcome {
		let ray = self.camera.ray_from_ndc(ndc);

		if let Some(hit) = self.pick(&ray) {
			let speaker = self.characters.values().find(|c| self.scene.is_within(hit, c.node)).cloned();
			if let Some(character) = speaker {
				let name = character.name.clone();
				self.dialogue.open(character);
				return ClickOutcome::Talked { name };
			}
			if self.pop(hit) {
				return ClickOutcome::Popped(hit);
			}
		}

		let velocity = ray.direction * self.config.shot_speed;
		let node = self.spawn_projectile(ray.origin, velocity, self.config.shot_life, SHOT_COLOR);
		ClickOutcome::Shot(node)
	}

	/// Nearest clickable node under `ray`: any part of a character, or a live
	/// balloon.
	fn pick(&self, ray: &Ray) -> Option<NodeId> {
		let candidates = self
			.characters
			.keys()
			.flat_map(|node| self.scene.subtree(*node))
			.chain(self.minigame.balloons());

		let mut nearest: Option<(f32, NodeId)> = None;
		for id in candidates {
			let Some(t) = self.hit_distance(ray, id) else { continue };
			if nearest.is_none_or(|(best, _)| t < best) {
				nearest = Some((t, id));
			}
		}
		nearest.map(|(_, id)| id)
	}

	/// Tests in the node's local space so rotated and scaled shapes pick
	/// correctly.
	fn hit_distance(&self, ray: &Ray, id: NodeId) -> Option<f32> {
		let node = self.scene.get(id)?;
		if !node.visible {
			return None;
		}
		let bounds = node.shape.as_ref()?.bounds()?;
		let inverse = self.scene.world_matrix(id).ok()?.inverse();
		let local = Ray::new(inverse.transform_point3(ray.origin), inverse.transform_vector3(ray.direction));
		local.intersect(&bounds)
	}

	pub fn orbit(&mut self, gesture: OrbitGesture) {
		if matches!(self.mode, CameraMode::Intro { .. }) {
			return;
		}
		let height = self.viewport.1;
		match gesture {
			OrbitGesture::Rotate { dx, dy } => self.controls.rotate(dx, dy, height),
			OrbitGesture::Pan { dx, dy } => self.controls.pan(&self.camera, dx, dy, height),
			OrbitGesture::Zoom { delta } => self.controls.zoom(delta),
		}
	}

	/// The dialogue panel's action button.
	pub fn advance_dialogue(&mut self) {
		self.dialogue.advance();
	}

	pub fn close_dialogue(&mut self) {
		self.dialogue.close();
	}

	/// New output size in device pixels.
	pub fn resize(&mut self, width: u32, height: u32, renderer: &mut dyn SceneRenderer) {
		self.viewport = (width as f32, height as f32);
		self.camera.set_aspect(width as f32 / height as f32);
		renderer.set_size(width, height);
	}

	pub fn config(&self) -> &GameConfig {
		&self.config
	}

	pub fn scene(&self) -> &Scene {
		&self.scene
	}

	pub fn camera(&self) -> &Camera {
		&self.camera
	}

	pub fn mode(&self) -> CameraMode {
		self.mode
	}

	pub fn dialogue(&self) -> &DialogueSystem {
		&self.dialogue
	}

	pub fn minigame(&self) -> &BalloonMinigame {
		&self.minigame
	}

	pub fn characters(&self) -> impl Iterator<Item = &Character> {
		self.characters.values().map(|c| c.as_ref())
	}

	pub fn cannons(&self) -> &[Cannon] {
		&self.cannons
	}

	pub fn projectiles(&self) -> &[Projectile] {
		&self.projectiles
	}
}

fn rng_for(config: &GameConfig) -> ChaCha8Rng {
	ChaCha8Rng::seed_from_u64(config.seed.unwrap_or_default())
}
