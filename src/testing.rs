//! Recording doubles for the view, scoreboard and sound seams.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::dialogue::{DialogueAction, DialogueView};
use crate::minigame::Scoreboard;
use crate::sound::PopSound;


#[derive(Clone, Debug, PartialEq)]
pub enum Shown {
	Line { speaker: String, line: String, action: DialogueAction },
	Hidden,
}

#[derive(Clone, Default)]
pub struct RecordingView(pub Rc<RefCell<Vec<Shown>>>);

impl DialogueView for RecordingView {
	fn show(&mut self, speaker: &str, line: &str, action: DialogueAction) {
		self.0.borrow_mut().push(Shown::Line {
			speaker: speaker.to_string(),
			line: line.to_string(),
			action,
		});
	}

	fn hide(&mut self) {
		self.0.borrow_mut().push(Shown::Hidden);
	}
}


#[derive(Clone, Default)]
pub struct RecordingScoreboard(Rc<RefCell<Vec<u32>>>);

impl RecordingScoreboard {
	pub fn last(&self) -> Option<u32> {
		self.0.borrow().last().copied()
	}

	pub fn shown(&self) -> Vec<u32> {
		self.0.borrow().clone()
	}
}

impl Scoreboard for RecordingScoreboard {
	fn show_score(&mut self, score: u32) {
		self.0.borrow_mut().push(score);
	}
}


#[derive(Clone, Default)]
pub struct CountingSound {
	pub ready: bool,
	pub plays: Rc<Cell<u32>>,
}

impl CountingSound {
	pub fn ready() -> Self {
		Self {
			ready: true,
			..Default::default()
		}
	}
}

impl PopSound for CountingSound {
	fn is_ready(&self) -> bool {
		self.ready
	}

	fn play(&self) {
		self.plays.set(self.plays.get() + 1);
	}
}
