//! Tunables for the vignette, with page query-string overrides.

use log::Level;
use thiserror::Error;


#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
	#[error("invalid value '{value}' for '{key}'")]
	InvalidValue { key: String, value: String },
}


#[derive(Clone, Debug, PartialEq)]
pub struct GameConfig {
	/// RNG seed for layout, cannon spread and confetti. `None` lets the host
	/// pick one.
	pub seed: Option<u64>,
	pub skip_intro: bool,
	pub intro_duration: f32,
	pub gravity: f32,
	pub shot_speed: f32,
	pub shot_life: f32,
	pub cannon_shot_speed: f32,
	pub cannon_shot_life: f32,
	pub cannon_muzzle_height: f32,
	pub cannon_base_cooldown: f32,
	pub cannon_cooldown_step: f32,
	pub pop_radius: f32,
	pub balloon_count: usize,
	pub confetti_particles: usize,
	pub confetti_lifetime_ms: f64,
	pub log_level: Level,
}

impl Default for GameConfig {
	fn default() -> Self {
		Self {
			seed: None,
			skip_intro: false,
			intro_duration: 6.0,
			gravity: 25.0,
			shot_speed: 120.0,
			shot_life: 2.5,
			cannon_shot_speed: 40.0,
			cannon_shot_life: 6.0,
			cannon_muzzle_height: 1.5,
			cannon_base_cooldown: 2.0,
			cannon_cooldown_step: 0.3,
			pop_radius: 1.2,
			balloon_count: 14,
			confetti_particles: 40,
			confetti_lifetime_ms: 600.0,
			log_level: Level::Info,
		}
	}
}

impl GameConfig {
	/// Cooldown a cannon is reset to after firing; staggered by index so the
	/// walls don't all fire together.
	pub fn cannon_cooldown(&self, index: usize) -> f32 {
		self.cannon_base_cooldown + (index % 3) as f32 * self.cannon_cooldown_step
	}

	/// Builds a config from a `location.search` string such as
	/// `?seed=7&skip_intro=1`. Unknown keys are ignored.
	pub fn from_query(query: &str) -> Result<Self, ConfigError> {
		let mut config = Self::default();
		config.apply_query(query)?;
		Ok(config)
	}

	pub fn apply_query(&mut self, query: &str) -> Result<(), ConfigError> {
		let query = query.strip_prefix('?').unwrap_or(query);
		for pair in query.split('&').filter(|p| !p.is_empty()) {
			let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
			let invalid = || ConfigError::InvalidValue {
				key: key.to_string(),
				value: value.to_string(),
			};
			match key {
				"seed" => self.seed = Some(value.parse().map_err(|_| invalid())?),
				"skip_intro" => self.skip_intro = parse_flag(value).ok_or_else(invalid)?,
				"debug" => {
					self.log_level = if parse_flag(value).ok_or_else(invalid)? { Level::Debug } else { Level::Info };
				},
				"balloons" => self.balloon_count = value.parse().map_err(|_| invalid())?,
				_ => {},
			}
		}
		Ok(())
	}
}

fn parse_flag(value: &str) -> Option<bool> {
	match value {
		"" | "1" | "true" | "yes" => Some(true),
		"0" | "false" | "no" => Some(false),
		_ => None,
	}
}
