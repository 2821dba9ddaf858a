//! Courtyard bustle: people milling in circles, bobbing horses, waving flags.

use glam::Vec3;

use crate::scene::{NodeId, Scene, SceneError};

const FOLLOW: f32 = 0.08;


#[derive(Clone, Debug, Default)]
pub struct Crowd {
	pub people: Vec<NodeId>,
	pub horses: Vec<NodeId>,
	/// Flags with their phase offset.
	pub flags: Vec<(NodeId, f32)>,
}

impl Crowd {
	pub fn update(&self, scene: &mut Scene, _dt: f32, t: f32) -> Result<(), SceneError> {
		for (i, person) in self.people.iter().enumerate() {
			let radius = 10.0 + (i % 10) as f32;
			let angle = 0.22 * t + i as f32 * 0.35;
			let goal = Vec3::new(angle.cos() * radius, 0.8, angle.sin() * radius);
			let node = scene.node_mut(*person)?;
			node.transform.translation = node.transform.translation.lerp(goal, FOLLOW);
		}

		for (i, horse) in self.horses.iter().enumerate() {
			scene.node_mut(*horse)?.transform.translation.y = 0.9 + (t * 3.0 + i as f32).sin() * 0.1;
		}

		for (flag, wave) in &self.flags {
			scene.node_mut(*flag)?.transform.translation.x += (t * 3.0 + wave).sin() * 0.01;
		}
		Ok(())
	}
}


#[cfg(test)]
mod tests {
	use super::*;
	use crate::scene::{Color, Node};

	#[test]
	fn people_close_in_on_their_circle() {
		let mut scene = Scene::new(Color::WHITE, 0.0);
		let person = scene.add(Node::group().at(Vec3::new(30.0, 0.8, 30.0)));
		let crowd = Crowd {
			people: vec![person],
			..Default::default()
		};
		let goal = Vec3::new(10.0, 0.8, 0.0);
		let before = scene.get(person).unwrap().position().distance(goal);
		crowd.update(&mut scene, 0.016, 0.0).unwrap();
		let after = scene.get(person).unwrap().position().distance(goal);
		assert!((after - before * (1.0 - FOLLOW)).abs() < 1e-3);
	}

	#[test]
	fn horses_bob_within_a_tenth() {
		let mut scene = Scene::new(Color::WHITE, 0.0);
		let horse = scene.add(Node::group());
		let crowd = Crowd {
			horses: vec![horse],
			..Default::default()
		};
		for step in 0..100 {
			crowd.update(&mut scene, 0.05, step as f32 * 0.05).unwrap();
			let y = scene.get(horse).unwrap().position().y;
			assert!((y - 0.9).abs() <= 0.1 + 1e-6);
		}
	}

	#[test]
	fn missing_member_is_an_error() {
		let mut scene = Scene::new(Color::WHITE, 0.0);
		let flag = scene.add(Node::group());
		scene.remove(flag).unwrap();
		let crowd = Crowd {
			flags: vec![(flag, 1.0)],
			..Default::default()
		};
		assert_eq!(crowd.update(&mut scene, 0.1, 1.0), Err(SceneError::MissingNode(flag)));
	}
}
