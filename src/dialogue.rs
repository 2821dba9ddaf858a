//! NPC conversations.
//!
//! A conversation is a straight run through a character's lines: open at the
//! first line, `Continue` until the last, `Goodbye` closes. Rendering goes
//! through [`DialogueView`] so the state machine doesn't care whether it is
//! drawn into the page or into a log.

use log::{debug, info};
use std::rc::Rc;

use crate::scene::NodeId;


#[derive(Clone, Debug, PartialEq)]
pub struct Character {
	pub name: String,
	pub node: NodeId,
	pub lines: Vec<String>,
}

impl Character {
	pub fn new(name: &str, node: NodeId, lines: &[&str]) -> Self {
		Self {
			name: name.to_string(),
			node,
			lines: lines.iter().map(|l| l.to_string()).collect(),
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DialogueAction {
	Continue,
	Goodbye,
}

impl DialogueAction {
	pub fn label(self) -> &'static str {
		match self {
			DialogueAction::Continue => "Continue",
			DialogueAction::Goodbye => "Goodbye",
		}
	}
}

pub trait DialogueView {
	fn show(&mut self, speaker: &str, line: &str, action: DialogueAction);
	fn hide(&mut self);
}

/// Writes conversations to the log instead of a panel.
#[derive(Default)]
pub struct LogDialogueView;

impl DialogueView for LogDialogueView {
	fn show(&mut self, speaker: &str, line: &str, action: DialogueAction) {
		info!("{speaker}: \"{line}\" [{}]", action.label());
	}

	fn hide(&mut self) {
		debug!("dialogue closed");
	}
}


#[derive(Clone, Debug, PartialEq)]
pub enum DialogueState {
	Closed,
	Open { character: Rc<Character>, line: usize },
}

pub struct DialogueSystem {
	state: DialogueState,
	view: Box<dyn DialogueView>,
}

impl DialogueSystem {
	pub fn new(view: Box<dyn DialogueView>) -> Self {
		Self {
			state: DialogueState::Closed,
			view,
		}
	}

	pub fn state(&self) -> &DialogueState {
		&self.state
	}

	pub fn is_open(&self) -> bool {
		matches!(self.state, DialogueState::Open { .. })
	}

	pub fn current(&self) -> Option<&Character> {
		match &self.state {
			DialogueState::Open { character, .. } => Some(character),
			DialogueState::Closed => None,
		}
	}

	pub fn line_index(&self) -> Option<usize> {
		match self.state {
			DialogueState::Open { line, .. } => Some(line),
			DialogueState::Closed => None,
		}
	}

	pub fn current_line(&self) -> Option<&str> {
		match &self.state {
			DialogueState::Open { character, line } => character.lines.get(*line).map(String::as_str),
			DialogueState::Closed => None,
		}
	}

	pub fn action(&self) -> Option<DialogueAction> {
		match &self.state {
			DialogueState::Open { character, line } => Some(action_for(character, *line)),
			DialogueState::Closed => None,
		}
	}

	/// Starts a conversation from the first line, dropping any other one.
	pub fn open(&mut self, character: Rc<Character>) {
		debug!("talking to {}", character.name);
		self.state = DialogueState::Open { character, line: 0 };
		self.render();
	}

	/// The action button: next line, or close on the last one.
	pub fn advance(&mut self) {
		let DialogueState::Open { character, line } = &mut self.state else {
			return;
		};
		if *line + 1 < character.lines.len() {
			*line += 1;
			self.render();
		} else {
			self.close();
		}
	}

	pub fn close(&mut self) {
		self.state = DialogueState::Closed;
		self.view.hide();
	}

	fn render(&mut self) {
		if let DialogueState::Open { character, line } = &self.state {
			let text = character.lines.get(*line).map(String::as_str).unwrap_or("");
			self.view.show(&character.name, text, action_for(character, *line));
		}
	}
}

fn action_for(character: &Character, line: usize) -> DialogueAction {
	if line + 1 < character.lines.len() {
		DialogueAction::Continue
	} else {
		DialogueAction::Goodbye
	}
}


#[cfg(test)]
mod tests {
	use super::*;
	use crate::scene::{Node, Scene};
	use crate::testing::{RecordingView, Shown};

	fn character(lines: &[&str]) -> Rc<Character> {
		let mut scene = Scene::new(crate::scene::Color::WHITE, 0.0);
		let node = scene.add(Node::group());
		Rc::new(Character::new("Captain Elowen", node, lines))
	}

	#[test]
	fn walks_lines_then_closes() {
		let view = RecordingView::default();
		let mut dialogue = DialogueSystem::new(Box::new(view.clone()));
		let lines = ["one", "two", "three", "four"];
		dialogue.open(character(&lines));

		for expected in 0..lines.len() - 1 {
			assert_eq!(dialogue.line_index(), Some(expected));
			assert_eq!(dialogue.action(), Some(DialogueAction::Continue));
			dialogue.advance();
		}
		assert_eq!(dialogue.line_index(), Some(lines.len() - 1));
		assert_eq!(dialogue.current_line(), Some("four"));
		assert_eq!(dialogue.action(), Some(DialogueAction::Goodbye));

		dialogue.advance();
		assert!(!dialogue.is_open());
		assert!(dialogue.current().is_none());
		assert_eq!(view.0.borrow().last(), Some(&Shown::Hidden));
	}

	#[test]
	fn opening_resets_previous_conversation() {
		let mut dialogue = DialogueSystem::new(Box::new(LogDialogueView));
		let elowen = character(&["a", "b", "c"]);
		dialogue.open(elowen.clone());
		dialogue.advance();
		assert_eq!(dialogue.line_index(), Some(1));
		dialogue.open(elowen);
		assert_eq!(dialogue.line_index(), Some(0));
	}

	#[test]
	fn close_at_any_time() {
		let mut dialogue = DialogueSystem::new(Box::new(LogDialogueView));
		dialogue.open(character(&["a", "b", "c"]));
		dialogue.close();
		assert_eq!(dialogue.state(), &DialogueState::Closed);
		// advancing a closed dialogue does nothing
		dialogue.advance();
		assert!(!dialogue.is_open());
	}

	#[test]
	fn single_line_says_goodbye() {
		let view = RecordingView::default();
		let mut dialogue = DialogueSystem::new(Box::new(view.clone()));
		dialogue.open(character(&["only"]));
		assert_eq!(
			view.0.borrow()[0],
			Shown::Line {
				speaker: "Captain Elowen".into(),
				line: "only".into(),
				action: DialogueAction::Goodbye
			}
		);
	}

	#[test]
	fn no_lines_renders_empty_text() {
		let view = RecordingView::default();
		let mut dialogue = DialogueSystem::new(Box::new(view.clone()));
		dialogue.open(character(&[]));
		assert_eq!(
			view.0.borrow()[0],
			Shown::Line {
				speaker: "Captain Elowen".into(),
				line: String::new(),
				action: DialogueAction::Goodbye
			}
		);
		dialogue.advance();
		assert!(!dialogue.is_open());
	}
}
