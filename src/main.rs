//! Runs Highspire Keep without a browser: fixed 60 Hz frames, a counting
//! renderer, and a scripted visitor who talks to the captain and then pops
//! balloons once a second.

use anyhow::{Context, Result};
use glam::{Vec2, Vec3};
use highspire::camera::CameraMode;
use highspire::clock::ManualClock;
use highspire::dialogue::LogDialogueView;
use highspire::minigame::LogScoreboard;
use highspire::render::HeadlessRenderer;
use highspire::sound::Silence;
use highspire::{ClickOutcome, Game, GameConfig, Services, init_logging};
use log::{Level, info};
use std::{env, rc::Rc};

const DT: f32 = 1.0 / 60.0;


fn main() -> Result<()> {
	let mut args = env::args().skip(1);
	let seconds: f32 = match args.next() {
		Some(raw) => raw.parse().with_context(|| format!("invalid duration '{raw}'"))?,
		None => 20.0,
	};
	let seed: u64 = match args.next() {
		Some(raw) => raw.parse().with_context(|| format!("invalid seed '{raw}'"))?,
		None => 1,
	};
	init_logging(Level::Info);

	let clock = Rc::new(ManualClock::new(0.0));
	let services = Services {
		dialogue_view: Box::new(LogDialogueView),
		scoreboard: Box::new(LogScoreboard),
		sound: Box::new(Silence),
		clock: clock.clone(),
	};
	let config = GameConfig {
		seed: Some(seed),
		..GameConfig::default()
	};
	let mut game = Game::new(config, 16.0 / 9.0, services)?;
	let mut renderer = HeadlessRenderer::default();
	game.resize(1280, 720, &mut renderer);

	let frames = (seconds / DT).ceil() as u64;
	let mut talked = false;
	for frame in 0..frames {
		clock.advance(DT as f64 * 1000.0);
		game.frame(DT, (frame + 1) as f32 * DT, &mut renderer);

		if game.mode() != CameraMode::Free || frame % 60 != 0 {
			continue;
		}
		if !talked {
			talked = true;
			talk_to_captain(&mut game);
			continue;
		}
		let Some(balloon) = game.minigame().balloons().next() else {
			continue;
		};
		let ndc = ndc_of(&game, game.scene().world_position(balloon)?);
		let outcome = game.click(ndc);
		info!("clicked a balloon: {outcome:?}");
	}

	println!(
		"{} frames, score {}, {} projectiles in flight, {} scene nodes",
		renderer.frames,
		game.minigame().score(),
		game.projectiles().len(),
		game.scene().len()
	);
	Ok(())
}

fn talk_to_captain(game: &mut Game) {
	let Some(node) = game.characters().next().map(|c| c.node) else {
		return;
	};
	let Ok(at) = game.scene().world_position(node) else {
		return;
	};
	let ndc = ndc_of(game, at);
	if let ClickOutcome::Talked { name } = game.click(ndc) {
		info!("talking to {name}");
		while game.dialogue().is_open() {
			game.advance_dialogue();
		}
	}
}

fn ndc_of(game: &Game, at: Vec3) -> Vec2 {
	let clip = game.camera().view_projection().project_point3(at);
	Vec2::new(clip.x, clip.y)
}
