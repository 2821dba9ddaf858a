//! Browser shell: mounts the canvas, wires DOM events into [`Game`] and runs
//! the animation loop.

use anyhow::Result;
use glam::Vec2;
use log::{debug, info, warn};
use std::cell::RefCell;
use std::rc::Rc;
use thiserror::Error;
use wasm_bindgen::prelude::*;
use web_sys::{Document, Element, EventTarget, HtmlCanvasElement, MouseEvent, WheelEvent};

use crate::clock::{FrameClock, PerformanceClock};
use crate::config::GameConfig;
use crate::dialogue::{DialogueView, LogDialogueView};
use crate::dom::{DomDialogueView, DomScoreboard};
use crate::game::{Game, OrbitGesture, Services};
use crate::minigame::{LogScoreboard, Scoreboard};
use crate::render::WebGlRenderer;
use crate::sound::{PopSound, Silence, WebAudioPop};
use crate::{request_animation_frame, window};

const POP_SOUND_URL: &str = "/pop.mp3";
const MAX_PIXEL_RATIO: f64 = 2.0;
/// Pointer travel, in CSS pixels, after which a press is an orbit drag.
const DRAG_THRESHOLD: f32 = 5.0;


#[derive(Debug, Error)]
pub enum StartupError {
	#[error("missing #{0} element")]
	MissingElement(&'static str),
	#[error("no document")]
	NoDocument,
	#[error("no performance timer")]
	NoPerformance,
	#[error("DOM: {0}")]
	Js(String),
}

impl From<JsValue> for StartupError {
	fn from(value: JsValue) -> Self {
		StartupError::Js(format!("{value:?}"))
	}
}


/// Mouse state between `mousedown` and the `click` that follows it.
#[derive(Debug, Default)]
struct Pointer {
	button: Option<i16>,
	last: Vec2,
	travelled: f32,
	dragged: bool,
}

pub fn run(config: GameConfig) -> Result<()> {
	let window = window();
	let document = window.document().ok_or(StartupError::NoDocument)?;
	let app = document.get_element_by_id("app").ok_or(StartupError::MissingElement("app"))?;
	let performance = window.performance().ok_or(StartupError::NoPerformance)?;

	let canvas = mount_canvas(&document, &app)?;
	let renderer = Rc::new(RefCell::new(WebGlRenderer::new(canvas.clone())?));

	let (dialogue_view, buttons): (Box<dyn DialogueView>, _) = match DomDialogueView::find(&document) {
		Ok(view) => {
			let buttons = (view.action_button().clone(), view.close_button().clone());
			(Box::new(view), Some(buttons))
		},
		Err(err) => {
			warn!("{err}, dialogue goes to the log");
			(Box::new(LogDialogueView), None)
		},
	};
	let scoreboard: Box<dyn Scoreboard> = match DomScoreboard::find(&document) {
		Ok(board) => Box::new(board),
		Err(err) => {
			warn!("{err}, score goes to the log");
			Box::new(LogScoreboard)
		},
	};
	let sound: Box<dyn PopSound> = match WebAudioPop::load(POP_SOUND_URL) {
		Ok(sound) => Box::new(sound),
		Err(err) => {
			debug!("no audio: {err}");
			Box::new(Silence)
		},
	};
	let services = Services {
		dialogue_view,
		scoreboard,
		sound,
		clock: Rc::new(PerformanceClock::new(performance.clone())),
	};

	let (width, height) = pixel_size(&app);
	let mut game = Game::new(config, width as f32 / height.max(1) as f32, services)?;
	game.resize(width, height, &mut *renderer.borrow_mut());
	let game = Rc::new(RefCell::new(game));

	listen_resize(&game, &renderer, &app)?;
	listen_pointer(&game, &canvas)?;
	if let Some((action, close)) = buttons {
		on_click(&action, &game, |game| game.advance_dialogue())?;
		on_click(&close, &game, |game| game.close_dialogue())?;
	}

	let mut frame_clock = FrameClock::new(performance.now());
	let f = Rc::new(RefCell::new(None::<Closure<dyn FnMut()>>));
	let g = f.clone();
	*g.borrow_mut() = Some(Closure::new(move || {
		let (dt, t) = frame_clock.tick(performance.now());
		game.borrow_mut().frame(dt, t, &mut *renderer.borrow_mut());
		if let Some(next) = f.borrow().as_ref() {
			request_animation_frame(next);
		}
	}));
	if let Some(first) = g.borrow().as_ref() {
		request_animation_frame(first);
	}

	info!("Highspire Keep is running");
	Ok(())
}

fn mount_canvas(document: &Document, app: &Element) -> Result<HtmlCanvasElement, StartupError> {
	let canvas: HtmlCanvasElement = document.create_element("canvas")?.dyn_into().map_err(JsValue::from)?;
	canvas.set_id("scene");
	app.append_child(&canvas)?;
	Ok(canvas)
}

/// The container's size in device pixels, with the pixel ratio capped.
fn pixel_size(app: &Element) -> (u32, u32) {
	let ratio = window().device_pixel_ratio().min(MAX_PIXEL_RATIO);
	let width = (app.client_width() as f64 * ratio).round() as u32;
	let height = (app.client_height() as f64 * ratio).round() as u32;
	(width.max(1), height.max(1))
}

fn listen_resize(game: &Rc<RefCell<Game>>, renderer: &Rc<RefCell<WebGlRenderer>>, app: &Element) -> Result<(), StartupError> {
	let game = game.clone();
	let renderer = renderer.clone();
	let app = app.clone();
	let closure = Closure::<dyn FnMut()>::new(move || {
		let (width, height) = pixel_size(&app);
		game.borrow_mut().resize(width, height, &mut *renderer.borrow_mut());
	});
	window().add_event_listener_with_callback("resize", closure.as_ref().unchecked_ref())?;
	closure.forget();
	Ok(())
}

fn listen_pointer(game: &Rc<RefCell<Game>>, canvas: &HtmlCanvasElement) -> Result<(), StartupError> {
	let pointer = Rc::new(RefCell::new(Pointer::default()));

	{
		let pointer = pointer.clone();
		let closure = Closure::<dyn FnMut(MouseEvent)>::new(move |event: MouseEvent| {
			*pointer.borrow_mut() = Pointer {
				button: Some(event.button()),
				last: client_position(&event),
				..Pointer::default()
			};
		});
		canvas.add_event_listener_with_callback("mousedown", closure.as_ref().unchecked_ref())?;
		closure.forget();
	}

	{
		let pointer = pointer.clone();
		let game = game.clone();
		let closure = Closure::<dyn FnMut(MouseEvent)>::new(move |event: MouseEvent| {
			let mut pointer = pointer.borrow_mut();
			let Some(button) = pointer.button else { return };
			let position = client_position(&event);
			let delta = position - pointer.last;
			pointer.last = position;
			pointer.travelled += delta.length();
			if pointer.travelled > DRAG_THRESHOLD {
				pointer.dragged = true;
			}
			let gesture = if button == 2 {
				OrbitGesture::Pan { dx: delta.x, dy: delta.y }
			} else {
				OrbitGesture::Rotate { dx: delta.x, dy: delta.y }
			};
			game.borrow_mut().orbit(gesture);
		});
		canvas.add_event_listener_with_callback("mousemove", closure.as_ref().unchecked_ref())?;
		closure.forget();
	}

	{
		let pointer = pointer.clone();
		let closure = Closure::<dyn FnMut(MouseEvent)>::new(move |_event: MouseEvent| {
			pointer.borrow_mut().button = None;
		});
		window().add_event_listener_with_callback("mouseup", closure.as_ref().unchecked_ref())?;
		closure.forget();
	}

	{
		let game = game.clone();
		let target = canvas.clone();
		let closure = Closure::<dyn FnMut(MouseEvent)>::new(move |event: MouseEvent| {
			// the click that ends an orbit drag
			if std::mem::take(&mut pointer.borrow_mut().dragged) {
				return;
			}
			let rect = target.get_bounding_client_rect();
			if rect.width() <= 0.0 || rect.height() <= 0.0 {
				return;
			}
			let ndc = Vec2::new(
				((event.client_x() as f64 - rect.left()) / rect.width() * 2.0 - 1.0) as f32,
				-(((event.client_y() as f64 - rect.top()) / rect.height()) * 2.0 - 1.0) as f32,
			);
			let outcome = game.borrow_mut().click(ndc);
			debug!("click at {ndc}: {outcome:?}");
		});
		canvas.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref())?;
		closure.forget();
	}

	{
		let game = game.clone();
		let closure = Closure::<dyn FnMut(WheelEvent)>::new(move |event: WheelEvent| {
			event.prevent_default();
			game.borrow_mut().orbit(OrbitGesture::Zoom {
				delta: event.delta_y() as f32,
			});
		});
		canvas.add_event_listener_with_callback("wheel", closure.as_ref().unchecked_ref())?;
		closure.forget();
	}

	// right-drag pans; keep the browser menu out of the way
	let closure = Closure::<dyn FnMut(MouseEvent)>::new(|event: MouseEvent| event.prevent_default());
	canvas.add_event_listener_with_callback("contextmenu", closure.as_ref().unchecked_ref())?;
	closure.forget();
	Ok(())
}

fn on_click<F>(target: &EventTarget, game: &Rc<RefCell<Game>>, action: F) -> Result<(), StartupError>
where
	F: Fn(&mut Game) + 'static,
{
	let game = game.clone();
	let closure = Closure::<dyn FnMut()>::new(move || action(&mut game.borrow_mut()));
	target.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref())?;
	closure.forget();
	Ok(())
}

fn client_position(event: &MouseEvent) -> Vec2 {
	Vec2::new(event.client_x() as f32, event.client_y() as f32)
}
