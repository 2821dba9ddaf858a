//! The balloon pop sound.
//!
//! Loading is best effort: until the buffer has been fetched and decoded (or
//! forever, if that fails) `is_ready` is false and the game stays silent.

use js_sys::ArrayBuffer;
use log::debug;
use std::cell::RefCell;
use std::rc::Rc;
use thiserror::Error;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{JsFuture, spawn_local};
use web_sys::{AudioBuffer, AudioContext, GainNode, Response};

const VOLUME: f32 = 0.7;


#[derive(Debug, Error)]
pub enum SoundError {
	#[error("audio: {0}")]
	Js(String),
	#[error("fetching {url} failed with HTTP {status}")]
	Http { url: String, status: u16 },
}

impl From<JsValue> for SoundError {
	fn from(value: JsValue) -> Self {
		SoundError::Js(format!("{value:?}"))
	}
}


pub trait PopSound {
	fn is_ready(&self) -> bool;
	fn play(&self);
}

/// Used when there is no audio device, or headless.
pub struct Silence;

impl PopSound for Silence {
	fn is_ready(&self) -> bool {
		false
	}

	fn play(&self) {}
}


pub struct WebAudioPop {
	context: AudioContext,
	gain: GainNode,
	buffer: Rc<RefCell<Option<AudioBuffer>>>,
}

impl WebAudioPop {
	/// Sets up the audio graph and starts fetching `url` in the background.
	pub fn load(url: &str) -> Result<Self, SoundError> {
		let context = AudioContext::new()?;
		let gain = context.create_gain()?;
		gain.gain().set_value(VOLUME);
		gain.connect_with_audio_node(&context.destination())?;

		let buffer = Rc::new(RefCell::new(None));
		let slot = buffer.clone();
		let decoder = context.clone();
		let url = url.to_string();
		spawn_local(async move {
			match fetch_and_decode(&decoder, &url).await {
				Ok(decoded) => {
					debug!("loaded {url}");
					*slot.borrow_mut() = Some(decoded);
				},
				Err(err) => debug!("pop sound unavailable: {err}"),
			}
		});

		Ok(Self { context, gain, buffer })
	}

	fn start(&self, buffer: &AudioBuffer) -> Result<(), SoundError> {
		// autoplay policy keeps the context suspended until a user gesture
		let _ = self.context.resume()?;
		let source = self.context.create_buffer_source()?;
		source.set_buffer(Some(buffer));
		source.connect_with_audio_node(&self.gain)?;
		source.start()?;
		Ok(())
	}
}

impl PopSound for WebAudioPop {
	fn is_ready(&self) -> bool {
		self.buffer.borrow().is_some()
	}

	fn play(&self) {
		if let Some(buffer) = self.buffer.borrow().as_ref() {
			if let Err(err) = self.start(buffer) {
				debug!("pop sound failed: {err}");
			}
		}
	}
}

async fn fetch_and_decode(context: &AudioContext, url: &str) -> Result<AudioBuffer, SoundError> {
	let window = web_sys::window().ok_or_else(|| SoundError::Js("no window".into()))?;
	let response: Response = JsFuture::from(window.fetch_with_str(url)).await?.dyn_into()?;
	if !response.ok() {
		return Err(SoundError::Http {
			url: url.to_string(),
			status: response.status(),
		});
	}
	let bytes: ArrayBuffer = JsFuture::from(response.array_buffer()?).await?.dyn_into()?;
	let decoded = JsFuture::from(context.decode_audio_data(&bytes)?).await?;
	Ok(decoded.dyn_into()?)
}
