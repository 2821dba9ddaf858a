mod app;
pub mod builder;
pub mod camera;
pub mod clock;
pub mod config;
pub mod crowd;
pub mod dialogue;
pub mod dom;
pub mod game;
pub mod geometry;
pub mod minigame;
pub mod render;
pub mod scene;
pub mod sound;
#[cfg(test)]
mod testing;

pub use app::StartupError;
pub use config::{ConfigError, GameConfig};
pub use game::{ClickOutcome, Game, OrbitGesture, Services};

use log::{error, info, warn};
use wasm_bindgen::prelude::*;


#[wasm_bindgen]
pub fn start() {
	set_panic_hook();

	let query = window().location().search().unwrap_or_default();
	let (mut config, config_error) = match GameConfig::from_query(&query) {
		Ok(config) => (config, None),
		Err(err) => (GameConfig::default(), Some(err)),
	};
	init_logging(config.log_level);
	if let Some(err) = config_error {
		warn!("ignoring query '{query}': {err}");
	}
	if config.seed.is_none() {
		config.seed = Some(js_sys::Date::now() as u64);
	}

	info!("Starting Highspire Keep (seed {:?})...", config.seed);
	if let Err(err) = app::run(config) {
		error!("Startup failed: {err:#}");
	}
}


fn window() -> web_sys::Window {
	web_sys::window().expect("no global `window` exists")
}

fn request_animation_frame(f: &Closure<dyn FnMut()>) {
	window()
		.request_animation_frame(f.as_ref().unchecked_ref())
		.expect("should register `requestAnimationFrame` OK");
}


pub fn set_panic_hook() {
	// When the `console_error_panic_hook` feature is enabled, we can call the
	// `set_panic_hook` function at least once during initialization, and then
	// we will get better error messages if our code ever panics.
	//
	// For more details see
	// https://github.com/rustwasm/console_error_panic_hook#readme
	#[cfg(feature = "console_error_panic_hook")]
	console_error_panic_hook::set_once();
}

/// Routes `log` output to the browser console or, natively, to stderr.
/// Calling it again keeps the first logger.
pub fn init_logging(level: log::Level) {
	#[cfg(target_arch = "wasm32")]
	{
		let _ = console_log::init_with_level(level);
	}

	#[cfg(not(target_arch = "wasm32"))]
	{
		let _ = env_logger::Builder::from_default_env().filter_level(level.to_level_filter()).try_init();
	}
}
