//! The host page's dialogue panel and score counter.

use log::warn;
use thiserror::Error;
use wasm_bindgen::prelude::*;
use web_sys::{Document, Element, HtmlButtonElement};

use crate::dialogue::{DialogueAction, DialogueView};
use crate::minigame::Scoreboard;

const HIDDEN: &str = "hidden";


#[derive(Debug, Error)]
pub enum DomError {
	#[error("missing #{0} element")]
	MissingElement(String),
	#[error("DOM: {0}")]
	Js(String),
}

impl From<JsValue> for DomError {
	fn from(value: JsValue) -> Self {
		DomError::Js(format!("{value:?}"))
	}
}

pub fn element(document: &Document, id: &str) -> Result<Element, DomError> {
	document.get_element_by_id(id).ok_or_else(|| DomError::MissingElement(id.to_string()))
}


/// `#dialogue` with its speaker, content and action row. The action button
/// is created here; the page only provides the row it lives in.
pub struct DomDialogueView {
	panel: Element,
	speaker: Element,
	content: Element,
	action: HtmlButtonElement,
	close: Element,
}

impl DomDialogueView {
	pub fn find(document: &Document) -> Result<Self, DomError> {
		let panel = element(document, "dialogue")?;
		let speaker = element(document, "speaker-name")?;
		let content = element(document, "dialogue-content")?;
		let actions = element(document, "dialogue-actions")?;
		let close = element(document, "dialogue-close")?;

		let action: HtmlButtonElement = document.create_element("button")?.dyn_into().map_err(JsValue::from)?;
		action.set_class_name("dialogue-btn");
		actions.set_inner_html("");
		actions.append_child(&action)?;

		Ok(Self {
			panel,
			speaker,
			content,
			action,
			close,
		})
	}

	/// Clicking it should advance the conversation.
	pub fn action_button(&self) -> &HtmlButtonElement {
		&self.action
	}

	pub fn close_button(&self) -> &Element {
		&self.close
	}
}

impl DialogueView for DomDialogueView {
	fn show(&mut self, speaker: &str, line: &str, action: DialogueAction) {
		self.speaker.set_text_content(Some(speaker));
		self.content.set_text_content(Some(line));
		self.action.set_text_content(Some(action.label()));
		if let Err(err) = self.panel.class_list().remove_1(HIDDEN) {
			warn!("can't show dialogue: {err:?}");
		}
	}

	fn hide(&mut self) {
		if let Err(err) = self.panel.class_list().add_1(HIDDEN) {
			warn!("can't hide dialogue: {err:?}");
		}
	}
}


pub struct DomScoreboard {
	counter: Element,
}

impl DomScoreboard {
	pub fn find(document: &Document) -> Result<Self, DomError> {
		Ok(Self {
			counter: element(document, "score")?,
		})
	}
}

impl Scoreboard for DomScoreboard {
	fn show_score(&mut self, score: u32) {
		self.counter.set_text_content(Some(&score.to_string()));
	}
}
