//! Pop-the-balloon minigame: score, bobbing floaters and confetti.

use glam::Vec3;
use log::{debug, info};
use rand::Rng;
use std::rc::Rc;
use thiserror::Error;

use crate::clock::WallClock;
use crate::geometry::Shape;
use crate::scene::{Color, Node, NodeId, Role, Scene, SceneError};

const BOB_AMPLITUDE: f32 = 0.6;
const DRIFT_RATE: f32 = 0.2;
const DRIFT_STEP: f32 = 0.02;
const CONFETTI_SIZE: f32 = 0.1;


#[derive(Debug, Error, PartialEq, Eq)]
pub enum MinigameError {
	#[error("balloon vanished from the scene: {0}")]
	Scene(#[from] SceneError),
}

/// Where the score is shown.
pub trait Scoreboard {
	fn show_score(&mut self, score: u32);
}

#[derive(Default)]
pub struct LogScoreboard;

impl Scoreboard for LogScoreboard {
	fn show_score(&mut self, score: u32) {
		info!("score: {score}");
	}
}


#[derive(Clone, Copy, Debug, PartialEq)]
struct Floater {
	balloon: NodeId,
	base_y: f32,
	speed: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Burst {
	node: NodeId,
	expires_at_ms: f64,
}

pub struct BalloonMinigame {
	score: u32,
	floaters: Vec<Floater>,
	bursts: Vec<Burst>,
	confetti_particles: usize,
	confetti_lifetime_ms: f64,
	scoreboard: Box<dyn Scoreboard>,
	clock: Rc<dyn WallClock>,
}

impl BalloonMinigame {
	/// Picks up every balloon already in `scene`; balloons added later are
	/// not tracked.
	pub fn new<R: Rng>(
		scene: &Scene,
		scoreboard: Box<dyn Scoreboard>,
		clock: Rc<dyn WallClock>,
		rng: &mut R,
	) -> Self {
		let floaters = scene
			.nodes_with_role(Role::Balloon)
			.into_iter()
			.filter_map(|balloon| {
				let base_y = scene.get(balloon)?.position().y;
				Some(Floater {
					balloon,
					base_y,
					speed: 0.6 + rng.random::<f32>() * 0.6,
				})
			})
			.collect::<Vec<_>>();
		debug!("tracking {} balloons", floaters.len());

		let mut this = Self {
			score: 0,
			floaters,
			bursts: Vec::new(),
			confetti_particles: 40,
			confetti_lifetime_ms: 600.0,
			scoreboard,
			clock,
		};
		this.set_score(0);
		this
	}

	pub fn with_confetti(mut self, particles: usize, lifetime_ms: f64) -> Self {
		self.confetti_particles = particles;
		self.confetti_lifetime_ms = lifetime_ms;
		self
	}

	pub fn score(&self) -> u32 {
		self.score
	}

	/// Balloons that haven't been popped yet.
	pub fn balloons(&self) -> impl Iterator<Item = NodeId> + '_ {
		self.floaters.iter().map(|f| f.balloon)
	}

	pub fn is_live(&self, balloon: NodeId) -> bool {
		self.floaters.iter().any(|f| f.balloon == balloon)
	}

	/// Confetti bursts still on screen.
	pub fn bursts(&self) -> impl Iterator<Item = NodeId> + '_ {
		self.bursts.iter().map(|b| b.node)
	}

	/// Pops `balloon` if it is still live: removes it from the scene and from
	/// tracking, scores a point and throws confetti. Returns `false` for
	/// balloons already popped or never tracked.
	pub fn pop<R: Rng>(&mut self, scene: &mut Scene, balloon: NodeId, rng: &mut R) -> bool {
		let Some(index) = self.floaters.iter().position(|f| f.balloon == balloon) else {
			return false;
		};
		self.floaters.swap_remove(index);

		let Ok(position) = scene.world_position(balloon) else {
			return false;
		};
		if scene.remove(balloon).is_err() {
			return false;
		}
		self.set_score(self.score + 1);
		debug!("popped balloon {:?} at {position}", balloon);

		let colors = (0..self.confetti_particles)
			.map(|_| Color::hsl(rng.random::<f32>(), 0.9, 0.6))
			.collect();
		let confetti = Node::mesh(
			Shape::Points {
				positions: vec![Vec3::ZERO; self.confetti_particles],
				colors,
				size: CONFETTI_SIZE,
			},
			Default::default(),
		)
		.at(position);
		let node = scene.add(confetti);
		self.bursts.push(Burst {
			node,
			expires_at_ms: self.clock.now_ms() + self.confetti_lifetime_ms,
		});
		true
	}

	/// Bobs the floaters and clears confetti whose wall-clock time is up.
	pub fn update(&mut self, scene: &mut Scene, _dt: f32, t: f32) -> Result<(), MinigameError> {
		let now = self.clock.now_ms();
		self.bursts.retain(|burst| {
			if now < burst.expires_at_ms {
				return true;
			}
			// already gone is fine, the burst only needs to leave the scene
			let _ = scene.remove(burst.node);
			false
		});

		for floater in &self.floaters {
			let node = scene.node_mut(floater.balloon)?;
			let position = &mut node.transform.translation;
			let drift = (t + floater.base_y) * DRIFT_RATE;
			position.y = floater.base_y + (t * floater.speed).sin() * BOB_AMPLITUDE;
			position.x += drift.sin() * DRIFT_STEP;
			position.z += drift.cos() * DRIFT_STEP;
		}
		Ok(())
	}

	fn set_score(&mut self, score: u32) {
		self.score = score;
		self.scoreboard.show_score(score);
	}
}
