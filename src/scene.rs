//! Scene graph.
//!
//! Nodes live in a generational arena: a [`NodeId`] is an index plus the
//! generation of the slot it was issued for. Removing a node bumps the slot's
//! generation, so handles held elsewhere (projectile lists, floaters, the
//! cannon table) go stale instead of pointing at whatever reuses the slot.

use glam::{Mat4, Quat, Vec3};
use thiserror::Error;

use crate::geometry::Shape;


#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct NodeId {
	index: u32,
	generation: u32,
}

impl NodeId {
	pub fn index(self) -> u32 {
		self.index
	}
}

/// What a node is for, as far as game logic is concerned.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
	Character,
	Balloon,
	Cannon,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SceneError {
	#[error("node {0:?} is not in the scene")]
	MissingNode(NodeId),
}


#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
	pub r: f32,
	pub g: f32,
	pub b: f32,
}

impl Color {
	pub const WHITE: Color = Color { r: 1.0, g: 1.0, b: 1.0 };
	pub const BLACK: Color = Color { r: 0.0, g: 0.0, b: 0.0 };

	pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
		Self { r, g, b }
	}

	pub fn hex(value: u32) -> Self {
		Self {
			r: ((value >> 16) & 0xff) as f32 / 255.0,
			g: ((value >> 8) & 0xff) as f32 / 255.0,
			b: (value & 0xff) as f32 / 255.0,
		}
	}

	/// `h`, `s` and `l` all in `[0, 1]`; hue wraps.
	pub fn hsl(h: f32, s: f32, l: f32) -> Self {
		let h = h.rem_euclid(1.0);
		if s <= 0.0 {
			return Self::rgb(l, l, l);
		}
		let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
		let p = 2.0 * l - q;
		Self {
			r: hue_to_rgb(p, q, h + 1.0 / 3.0),
			g: hue_to_rgb(p, q, h),
			b: hue_to_rgb(p, q, h - 1.0 / 3.0),
		}
	}

	pub fn to_array(self) -> [f32; 3] {
		[self.r, self.g, self.b]
	}
}

fn hue_to_rgb(p: f32, q: f32, t: f32) -> f32 {
	let t = t.rem_euclid(1.0);
	if t < 1.0 / 6.0 {
		p + (q - p) * 6.0 * t
	} else if t < 0.5 {
		q
	} else if t < 2.0 / 3.0 {
		p + (q - p) * 6.0 * (2.0 / 3.0 - t)
	} else {
		p
	}
}


#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Material {
	pub color: Color,
	pub emissive: Color,
	pub opacity: f32,
}

impl Material {
	pub fn solid(hex: u32) -> Self {
		Self {
			color: Color::hex(hex),
			emissive: Color::BLACK,
			opacity: 1.0,
		}
	}

	pub fn with_emissive(mut self, hex: u32) -> Self {
		self.emissive = Color::hex(hex);
		self
	}

	pub fn with_opacity(mut self, opacity: f32) -> Self {
		self.opacity = opacity;
		self
	}

	pub fn is_transparent(&self) -> bool {
		self.opacity < 1.0
	}
}

impl Default for Material {
	fn default() -> Self {
		Self {
			color: Color::WHITE,
			emissive: Color::BLACK,
			opacity: 1.0,
		}
	}
}


#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
	pub translation: Vec3,
	pub rotation: Quat,
	pub scale: Vec3,
}

impl Transform {
	pub fn matrix(&self) -> Mat4 {
		Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
	}
}

impl Default for Transform {
	fn default() -> Self {
		Self {
			translation: Vec3::ZERO,
			rotation: Quat::IDENTITY,
			scale: Vec3::ONE,
		}
	}
}


#[derive(Clone, Debug)]
pub struct Node {
	/// `None` for pure grouping nodes.
	pub shape: Option<Shape>,
	pub material: Material,
	pub transform: Transform,
	pub role: Option<Role>,
	pub visible: bool,
	parent: Option<NodeId>,
	children: Vec<NodeId>,
}

impl Node {
	pub fn group() -> Self {
		Self {
			shape: None,
			material: Material::default(),
			transform: Transform::default(),
			role: None,
			visible: true,
			parent: None,
			children: Vec::new(),
		}
	}

	pub fn mesh(shape: Shape, material: Material) -> Self {
		Self {
			shape: Some(shape),
			material,
			..Self::group()
		}
	}

	pub fn at(mut self, translation: Vec3) -> Self {
		self.transform.translation = translation;
		self
	}

	pub fn rotated(mut self, rotation: Quat) -> Self {
		self.transform.rotation = rotation;
		self
	}

	pub fn with_role(mut self, role: Role) -> Self {
		self.role = Some(role);
		self
	}

	pub fn parent(&self) -> Option<NodeId> {
		self.parent
	}

	pub fn children(&self) -> &[NodeId] {
		&self.children
	}

	pub fn position(&self) -> Vec3 {
		self.transform.translation
	}
}


#[derive(Debug)]
struct Slot {
	generation: u32,
	node: Option<Node>,
}

/// A node ready to draw, with its resolved world matrix.
pub struct Drawable<'a> {
	pub id: NodeId,
	pub node: &'a Node,
	pub world: Mat4,
}

#[derive(Debug)]
pub struct Scene {
	slots: Vec<Slot>,
	free: Vec<u32>,
	roots: Vec<NodeId>,
	pub background: Color,
	pub fog_density: f32,
}

impl Scene {
	pub fn new(background: Color, fog_density: f32) -> Self {
		Self {
			slots: Vec::new(),
			free: Vec::new(),
			roots: Vec::new(),
			background,
			fog_density,
		}
	}

	fn insert(&mut self, node: Node) -> NodeId {
		if let Some(index) = self.free.pop() {
			let slot = &mut self.slots[index as usize];
			slot.node = Some(node);
			NodeId {
				index,
				generation: slot.generation,
			}
		} else {
			let index = self.slots.len() as u32;
			self.slots.push(Slot {
				generation: 0,
				node: Some(node),
			});
			NodeId { index, generation: 0 }
		}
	}

	/// Adds `node` at the top level of the scene.
	pub fn add(&mut self, mut node: Node) -> NodeId {
		node.parent = None;
		node.children.clear();
		let id = self.insert(node);
		self.roots.push(id);
		id
	}

	pub fn add_child(&mut self, parent: NodeId, mut node: Node) -> Result<NodeId, SceneError> {
		if !self.contains(parent) {
			return Err(SceneError::MissingNode(parent));
		}
		node.parent = Some(parent);
		node.children.clear();
		let id = self.insert(node);
		if let Some(p) = self.get_mut(parent) {
			p.children.push(id);
		}
		Ok(id)
	}

	pub fn contains(&self, id: NodeId) -> bool {
		self.get(id).is_some()
	}

	pub fn get(&self, id: NodeId) -> Option<&Node> {
		self.slots
			.get(id.index as usize)
			.filter(|slot| slot.generation == id.generation)
			.and_then(|slot| slot.node.as_ref())
	}

	pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
		self.slots
			.get_mut(id.index as usize)
			.filter(|slot| slot.generation == id.generation)
			.and_then(|slot| slot.node.as_mut())
	}

	pub fn node(&self, id: NodeId) -> Result<&Node, SceneError> {
		self.get(id).ok_or(SceneError::MissingNode(id))
	}

	pub fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, SceneError> {
		self.get_mut(id).ok_or(SceneError::MissingNode(id))
	}

	/// Detaches `id` and everything below it. Every handle into the removed
	/// subtree becomes stale.
	pub fn remove(&mut self, id: NodeId) -> Result<(), SceneError> {
		let parent = self.node(id)?.parent;
		match parent {
			Some(parent) => {
				if let Some(p) = self.get_mut(parent) {
					p.children.retain(|c| *c != id);
				}
			},
			None => self.roots.retain(|r| *r != id),
		}

		let mut pending = vec![id];
		while let Some(current) = pending.pop() {
			let slot = &mut self.slots[current.index as usize];
			if let Some(node) = slot.node.take() {
				pending.extend(node.children);
				slot.generation = slot.generation.wrapping_add(1);
				self.free.push(current.index);
			}
		}
		Ok(())
	}

	/// Number of live nodes.
	pub fn len(&self) -> usize {
		self.slots.iter().filter(|s| s.node.is_some()).count()
	}

	pub fn is_empty(&self) -> bool {
		self.roots.is_empty()
	}

	pub fn world_matrix(&self, id: NodeId) -> Result<Mat4, SceneError> {
		let mut node = self.node(id)?;
		let mut matrix = node.transform.matrix();
		while let Some(parent) = node.parent {
			node = self.node(parent)?;
			matrix = node.transform.matrix() * matrix;
		}
		Ok(matrix)
	}

	pub fn world_position(&self, id: NodeId) -> Result<Vec3, SceneError> {
		Ok(self.world_matrix(id)?.w_axis.truncate())
	}

	/// True when `id` is `ancestor` itself or lives somewhere below it.
	pub fn is_within(&self, id: NodeId, ancestor: NodeId) -> bool {
		let mut current = Some(id);
		while let Some(node_id) = current {
			if node_id == ancestor {
				return true;
			}
			current = self.get(node_id).and_then(|n| n.parent);
		}
		false
	}

	/// `root` and all its descendants, depth first.
	pub fn subtree(&self, root: NodeId) -> Vec<NodeId> {
		let mut out = Vec::new();
		let mut pending = vec![root];
		while let Some(id) = pending.pop() {
			if let Some(node) = self.get(id) {
				out.push(id);
				pending.extend(node.children.iter().rev().copied());
			}
		}
		out
	}

	/// Every live node carrying `role`, in traversal order.
	pub fn nodes_with_role(&self, role: Role) -> Vec<NodeId> {
		self.roots
			.iter()
			.flat_map(|root| self.subtree(*root))
			.filter(|id| self.get(*id).is_some_and(|n| n.role == Some(role)))
			.collect()
	}

	/// Visible nodes with a shape, with world matrices resolved. Hidden
	/// groups hide their whole subtree.
	pub fn drawables(&self) -> Vec<Drawable<'_>> {
		let mut out = Vec::new();
		let mut pending: Vec<(NodeId, Mat4)> = self.roots.iter().rev().map(|id| (*id, Mat4::IDENTITY)).collect();
		while let Some((id, parent_world)) = pending.pop() {
			let Some(node) = self.get(id) else { continue };
			if !node.visible {
				continue;
			}
			let world = parent_world * node.transform.matrix();
			if node.shape.is_some() {
				out.push(Drawable { id, node, world });
			}
			pending.extend(node.children.iter().rev().map(|c| (*c, world)));
		}
		out
	}
}


#[cfg(test)]
mod tests {
	use super::*;

	fn scene() -> Scene {
		Scene::new(Color::hex(0x87c6ff), 0.012)
	}

	#[test]
	fn removed_handles_go_stale() {
		let mut scene = scene();
		let a = scene.add(Node::group());
		scene.remove(a).unwrap();
		assert!(!scene.contains(a));

		// the slot is reused, the old handle must not see the new node
		let b = scene.add(Node::group());
		assert_eq!(a.index(), b.index());
		assert!(scene.contains(b));
		assert!(!scene.contains(a));
		assert_eq!(scene.remove(a), Err(SceneError::MissingNode(a)));
	}

	#[test]
	fn removing_a_group_removes_children() {
		let mut scene = scene();
		let group = scene.add(Node::group());
		let child = scene.add_child(group, Node::mesh(Shape::cuboid(1.0, 1.0, 1.0), Material::default())).unwrap();
		assert_eq!(scene.len(), 2);
		scene.remove(group).unwrap();
		assert!(!scene.contains(child));
		assert_eq!(scene.len(), 0);
		assert!(scene.is_empty());
	}

	#[test]
	fn removing_a_child_unlinks_it_from_the_parent() {
		let mut scene = scene();
		let group = scene.add(Node::group());
		let child = scene.add_child(group, Node::group()).unwrap();
		scene.remove(child).unwrap();
		assert!(scene.get(group).unwrap().children().is_empty());
	}

	#[test]
	fn world_position_composes_parents() {
		let mut scene = scene();
		let group = scene.add(Node::group().at(Vec3::new(10.0, 0.0, 0.0)));
		let child = scene.add_child(group, Node::group().at(Vec3::new(0.0, 2.0, 0.0))).unwrap();
		let pos = scene.world_position(child).unwrap();
		assert!((pos - Vec3::new(10.0, 2.0, 0.0)).length() < 1e-6);
	}

	#[test]
	fn roles_are_found_anywhere_in_the_tree() {
		let mut scene = scene();
		let group = scene.add(Node::group());
		let nested = scene.add_child(group, Node::group().with_role(Role::Cannon)).unwrap();
		let top = scene.add(Node::group().with_role(Role::Balloon));
		assert_eq!(scene.nodes_with_role(Role::Cannon), vec![nested]);
		assert_eq!(scene.nodes_with_role(Role::Balloon), vec![top]);
		assert!(scene.nodes_with_role(Role::Character).is_empty());
	}

	#[test]
	fn is_within_walks_up_the_parent_chain() {
		let mut scene = scene();
		let root = scene.add(Node::group());
		let mid = scene.add_child(root, Node::group()).unwrap();
		let leaf = scene.add_child(mid, Node::group()).unwrap();
		let other = scene.add(Node::group());
		assert!(scene.is_within(leaf, root));
		assert!(scene.is_within(root, root));
		assert!(!scene.is_within(other, root));
	}

	#[test]
	fn hidden_groups_are_not_drawn() {
		let mut scene = scene();
		let group = scene.add(Node::group());
		scene.add_child(group, Node::mesh(Shape::sphere(1.0, 8), Material::default())).unwrap();
		scene.add(Node::mesh(Shape::sphere(1.0, 8), Material::default()));
		assert_eq!(scene.drawables().len(), 2);
		scene.get_mut(group).unwrap().visible = false;
		assert_eq!(scene.drawables().len(), 1);
	}

	#[test]
	fn hsl_primaries() {
		let red = Color::hsl(0.0, 1.0, 0.5);
		assert!((red.r - 1.0).abs() < 1e-6 && red.g.abs() < 1e-6 && red.b.abs() < 1e-6);
		let grey = Color::hsl(0.3, 0.0, 0.25);
		assert_eq!(grey, Color::rgb(0.25, 0.25, 0.25));
	}
}
