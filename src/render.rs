//! Drawing the scene.
//!
//! [`WebGlRenderer`] is a small WebGL2 forward renderer: one lit program for
//! triangle meshes (hemisphere + sun, exponential-squared fog) and one for
//! confetti point clouds. GPU meshes are cached per [`MeshKey`], so the
//! hundreds of crenellations share a handful of buffers.

use glam::{Mat3, Vec3};
use js_sys::{Float32Array, Uint16Array};
use log::debug;
use std::collections::HashMap;
use thiserror::Error;
use wasm_bindgen::prelude::*;
use web_sys::{
	HtmlCanvasElement, WebGl2RenderingContext as GL, WebGlBuffer, WebGlProgram, WebGlShader, WebGlUniformLocation, WebGlVertexArrayObject,
};

use crate::camera::Camera;
use crate::geometry::{MeshKey, Shape};
use crate::scene::{Color, Drawable, Scene};


pub trait SceneRenderer {
	/// Draws the whole scene from `camera`. Called once per frame.
	fn render(&mut self, scene: &Scene, camera: &Camera);
	/// Output size in device pixels.
	fn set_size(&mut self, width: u32, height: u32);
}


/// Counts frames instead of drawing them.
#[derive(Debug, Default, Clone)]
pub struct HeadlessRenderer {
	pub frames: u64,
	pub last_drawn: usize,
	pub size: (u32, u32),
}

impl SceneRenderer for HeadlessRenderer {
	fn render(&mut self, scene: &Scene, _camera: &Camera) {
		self.frames += 1;
		self.last_drawn = scene.drawables().len();
	}

	fn set_size(&mut self, width: u32, height: u32) {
		self.size = (width, height);
	}
}


#[derive(Debug, Error)]
pub enum RenderError {
	#[error("WebGL2 is not available")]
	NoContext,
	#[error("shader error: {0}")]
	Shader(String),
	#[error("WebGL: {0}")]
	Js(String),
}

impl From<JsValue> for RenderError {
	fn from(value: JsValue) -> Self {
		RenderError::Js(format!("{value:?}"))
	}
}


#[derive(Clone, Copy, Debug)]
pub struct Lighting {
	pub sky: Color,
	pub ground: Color,
	pub hemisphere_intensity: f32,
	pub sun_direction: Vec3,
	pub sun_color: Color,
	pub sun_intensity: f32,
}

impl Default for Lighting {
	fn default() -> Self {
		Self {
			sky: Color::hex(0xcfe9ff),
			ground: Color::hex(0x667788),
			hemisphere_intensity: 0.85,
			sun_direction: Vec3::new(60.0, 100.0, 20.0).normalize(),
			sun_color: Color::hex(0xfff3d7),
			sun_intensity: 1.2,
		}
	}
}


const MESH_VERTEX: &str = r#"#version 300 es
layout(location = 0) in vec3 a_position;
layout(location = 1) in vec3 a_normal;
uniform mat4 u_view_proj;
uniform mat4 u_model;
uniform mat3 u_normal_matrix;
out vec3 v_normal;
out vec3 v_world;
void main() {
	vec4 world = u_model * vec4(a_position, 1.0);
	v_world = world.xyz;
	v_normal = u_normal_matrix * a_normal;
	gl_Position = u_view_proj * world;
}
"#;

const MESH_FRAGMENT: &str = r#"#version 300 es
precision highp float;
in vec3 v_normal;
in vec3 v_world;
uniform vec3 u_color;
uniform vec3 u_emissive;
uniform float u_opacity;
uniform vec3 u_camera;
uniform vec3 u_fog_color;
uniform float u_fog_density;
uniform vec3 u_sky;
uniform vec3 u_ground;
uniform float u_hemi_intensity;
uniform vec3 u_sun_dir;
uniform vec3 u_sun_color;
uniform float u_sun_intensity;
out vec4 frag;
void main() {
	vec3 n = normalize(v_normal);
	if (!gl_FrontFacing) n = -n;
	vec3 hemi = mix(u_ground, u_sky, 0.5 * n.y + 0.5) * u_hemi_intensity;
	vec3 sun = u_sun_color * max(dot(n, u_sun_dir), 0.0) * u_sun_intensity;
	vec3 color = u_color * (hemi + sun) + u_emissive;
	float dist = length(v_world - u_camera);
	float fog = 1.0 - exp(-u_fog_density * u_fog_density * dist * dist);
	frag = vec4(mix(color, u_fog_color, clamp(fog, 0.0, 1.0)), u_opacity);
}
"#;

const POINT_VERTEX: &str = r#"#version 300 es
layout(location = 0) in vec3 a_position;
layout(location = 1) in vec3 a_color;
uniform mat4 u_view_proj;
uniform float u_size;
uniform float u_scale;
out vec3 v_color;
void main() {
	vec4 clip = u_view_proj * vec4(a_position, 1.0);
	gl_Position = clip;
	gl_PointSize = max(1.0, u_size * u_scale / clip.w);
	v_color = a_color;
}
"#;

const POINT_FRAGMENT: &str = r#"#version 300 es
precision mediump float;
in vec3 v_color;
out vec4 frag;
void main() {
	frag = vec4(v_color, 1.0);
}
"#;

const MESH_UNIFORMS: &[&str] = &[
	"u_view_proj",
	"u_model",
	"u_normal_matrix",
	"u_color",
	"u_emissive",
	"u_opacity",
	"u_camera",
	"u_fog_color",
	"u_fog_density",
	"u_sky",
	"u_ground",
	"u_hemi_intensity",
	"u_sun_dir",
	"u_sun_color",
	"u_sun_intensity",
];

const POINT_UNIFORMS: &[&str] = &["u_view_proj", "u_size", "u_scale"];


struct Program {
	program: WebGlProgram,
	uniforms: HashMap<&'static str, WebGlUniformLocation>,
}

impl Program {
	fn new(gl: &GL, vertex: &str, fragment: &str, names: &[&'static str]) -> Result<Self, RenderError> {
		let vs = compile_shader(gl, GL::VERTEX_SHADER, vertex)?;
		let fs = compile_shader(gl, GL::FRAGMENT_SHADER, fragment)?;
		let program = gl.create_program().ok_or_else(|| RenderError::Shader("cannot create program".into()))?;
		gl.attach_shader(&program, &vs);
		gl.attach_shader(&program, &fs);
		gl.link_program(&program);
		if !gl.get_program_parameter(&program, GL::LINK_STATUS).as_bool().unwrap_or(false) {
			return Err(RenderError::Shader(gl.get_program_info_log(&program).unwrap_or_default()));
		}
		let uniforms = names
			.iter()
			.filter_map(|name| gl.get_uniform_location(&program, name).map(|loc| (*name, loc)))
			.collect();
		Ok(Self { program, uniforms })
	}

	fn uniform(&self, name: &str) -> Option<&WebGlUniformLocation> {
		self.uniforms.get(name)
	}
}

fn compile_shader(gl: &GL, kind: u32, source: &str) -> Result<WebGlShader, RenderError> {
	let shader = gl.create_shader(kind).ok_or_else(|| RenderError::Shader("cannot create shader".into()))?;
	gl.shader_source(&shader, source);
	gl.compile_shader(&shader);
	if gl.get_shader_parameter(&shader, GL::COMPILE_STATUS).as_bool().unwrap_or(false) {
		Ok(shader)
	} else {
		Err(RenderError::Shader(gl.get_shader_info_log(&shader).unwrap_or_default()))
	}
}


struct GpuMesh {
	vao: WebGlVertexArrayObject,
	index_count: i32,
}

pub struct WebGlRenderer {
	gl: GL,
	canvas: HtmlCanvasElement,
	meshes_program: Program,
	points_program: Program,
	meshes: HashMap<MeshKey, GpuMesh>,
	points_vao: WebGlVertexArrayObject,
	points_positions: WebGlBuffer,
	points_colors: WebGlBuffer,
	pub lighting: Lighting,
	size: (u32, u32),
}

impl WebGlRenderer {
	pub fn new(canvas: HtmlCanvasElement) -> Result<Self, RenderError> {
		let gl: GL = canvas
			.get_context("webgl2")?
			.ok_or(RenderError::NoContext)?
			.dyn_into()
			.map_err(|_| RenderError::NoContext)?;

		let meshes_program = Program::new(&gl, MESH_VERTEX, MESH_FRAGMENT, MESH_UNIFORMS)?;
		let points_program = Program::new(&gl, POINT_VERTEX, POINT_FRAGMENT, POINT_UNIFORMS)?;

		let points_vao = gl.create_vertex_array().ok_or_else(|| RenderError::Js("cannot create vertex array".into()))?;
		gl.bind_vertex_array(Some(&points_vao));
		let points_positions = attribute_buffer(&gl, 0)?;
		let points_colors = attribute_buffer(&gl, 1)?;
		gl.bind_vertex_array(None);

		gl.enable(GL::DEPTH_TEST);
		gl.blend_func(GL::SRC_ALPHA, GL::ONE_MINUS_SRC_ALPHA);
		let size = (canvas.width(), canvas.height());
		debug!("WebGL2 renderer ready at {}x{}", size.0, size.1);

		Ok(Self {
			gl,
			canvas,
			meshes_program,
			points_program,
			meshes: HashMap::new(),
			points_vao,
			points_positions,
			points_colors,
			lighting: Lighting::default(),
			size,
		})
	}

	fn upload(&self, shape: &Shape) -> Result<GpuMesh, RenderError> {
		let data = shape.triangulate();
		let gl = &self.gl;
		let vao = gl.create_vertex_array().ok_or_else(|| RenderError::Js("cannot create vertex array".into()))?;
		gl.bind_vertex_array(Some(&vao));

		let positions: Vec<f32> = data.positions.iter().flatten().copied().collect();
		let normals: Vec<f32> = data.normals.iter().flatten().copied().collect();
		// the vertex array keeps the buffers alive on the GL side
		attribute_buffer(gl, 0)?;
		gl.buffer_data_with_array_buffer_view(GL::ARRAY_BUFFER, &Float32Array::from(&positions[..]), GL::STATIC_DRAW);
		attribute_buffer(gl, 1)?;
		gl.buffer_data_with_array_buffer_view(GL::ARRAY_BUFFER, &Float32Array::from(&normals[..]), GL::STATIC_DRAW);

		let index_buffer = gl.create_buffer().ok_or_else(|| RenderError::Js("cannot create buffer".into()))?;
		gl.bind_buffer(GL::ELEMENT_ARRAY_BUFFER, Some(&index_buffer));
		gl.buffer_data_with_array_buffer_view(GL::ELEMENT_ARRAY_BUFFER, &Uint16Array::from(&data.indices[..]), GL::STATIC_DRAW);

		gl.bind_vertex_array(None);
		Ok(GpuMesh {
			vao,
			index_count: data.indices.len() as i32,
		})
	}

	fn draw_mesh(&mut self, drawable: &Drawable<'_>) {
		let Some(shape) = &drawable.node.shape else { return };
		let Some(key) = shape.mesh_key() else { return };
		if !self.meshes.contains_key(&key) {
			match self.upload(shape) {
				Ok(mesh) => {
					self.meshes.insert(key, mesh);
				},
				Err(err) => {
					debug!("skipping mesh {key:?}: {err}");
					return;
				},
			}
		}
		let Some(mesh) = self.meshes.get(&key) else { return };

		let gl = &self.gl;
		let program = &self.meshes_program;
		let material = &drawable.node.material;
		let normal_matrix = Mat3::from_mat4(drawable.world).inverse().transpose();
		gl.uniform_matrix4fv_with_f32_array(program.uniform("u_model"), false, &drawable.world.to_cols_array());
		gl.uniform_matrix3fv_with_f32_array(program.uniform("u_normal_matrix"), false, &normal_matrix.to_cols_array());
		gl.uniform3fv_with_f32_array(program.uniform("u_color"), &material.color.to_array());
		gl.uniform3fv_with_f32_array(program.uniform("u_emissive"), &material.emissive.to_array());
		gl.uniform1f(program.uniform("u_opacity"), material.opacity);
		gl.bind_vertex_array(Some(&mesh.vao));
		gl.draw_elements_with_i32(GL::TRIANGLES, mesh.index_count, GL::UNSIGNED_SHORT, 0);
	}

	fn draw_points(&self, clouds: &[&Drawable<'_>], camera: &Camera) {
		let mut positions = Vec::new();
		let mut colors = Vec::new();
		let mut size = 0.0f32;
		for drawable in clouds {
			if let Some(Shape::Points {
				positions: local,
				colors: tint,
				size: point_size,
			}) = &drawable.node.shape
			{
				size = size.max(*point_size);
				for (p, c) in local.iter().zip(tint) {
					positions.extend_from_slice(&drawable.world.transform_point3(*p).to_array());
					colors.extend_from_slice(&c.to_array());
				}
			}
		}
		if positions.is_empty() {
			return;
		}

		let gl = &self.gl;
		let program = &self.points_program;
		gl.use_program(Some(&program.program));
		gl.uniform_matrix4fv_with_f32_array(program.uniform("u_view_proj"), false, &camera.view_projection().to_cols_array());
		gl.uniform1f(program.uniform("u_size"), size);
		gl.uniform1f(program.uniform("u_scale"), self.size.1 as f32 * 0.5);
		gl.bind_vertex_array(Some(&self.points_vao));
		gl.bind_buffer(GL::ARRAY_BUFFER, Some(&self.points_positions));
		gl.buffer_data_with_array_buffer_view(GL::ARRAY_BUFFER, &Float32Array::from(&positions[..]), GL::DYNAMIC_DRAW);
		gl.bind_buffer(GL::ARRAY_BUFFER, Some(&self.points_colors));
		gl.buffer_data_with_array_buffer_view(GL::ARRAY_BUFFER, &Float32Array::from(&colors[..]), GL::DYNAMIC_DRAW);
		gl.draw_arrays(GL::POINTS, 0, (positions.len() / 3) as i32);
	}

	fn bind_frame_uniforms(&self, scene: &Scene, camera: &Camera) {
		let gl = &self.gl;
		let program = &self.meshes_program;
		let light = &self.lighting;
		gl.use_program(Some(&program.program));
		gl.uniform_matrix4fv_with_f32_array(program.uniform("u_view_proj"), false, &camera.view_projection().to_cols_array());
		gl.uniform3fv_with_f32_array(program.uniform("u_camera"), &camera.position.to_array());
		gl.uniform3fv_with_f32_array(program.uniform("u_fog_color"), &scene.background.to_array());
		gl.uniform1f(program.uniform("u_fog_density"), scene.fog_density);
		gl.uniform3fv_with_f32_array(program.uniform("u_sky"), &light.sky.to_array());
		gl.uniform3fv_with_f32_array(program.uniform("u_ground"), &light.ground.to_array());
		gl.uniform1f(program.uniform("u_hemi_intensity"), light.hemisphere_intensity);
		gl.uniform3fv_with_f32_array(program.uniform("u_sun_dir"), &light.sun_direction.to_array());
		gl.uniform3fv_with_f32_array(program.uniform("u_sun_color"), &light.sun_color.to_array());
		gl.uniform1f(program.uniform("u_sun_intensity"), light.sun_intensity);
	}
}

impl SceneRenderer for WebGlRenderer {
	fn render(&mut self, scene: &Scene, camera: &Camera) {
		let background = scene.background;
		self.gl.viewport(0, 0, self.size.0 as i32, self.size.1 as i32);
		self.gl.clear_color(background.r, background.g, background.b, 1.0);
		self.gl.clear(GL::COLOR_BUFFER_BIT | GL::DEPTH_BUFFER_BIT);

		let drawables = scene.drawables();
		let (clouds, meshes): (Vec<&Drawable<'_>>, Vec<&Drawable<'_>>) =
			drawables.iter().partition(|d| d.node.shape.as_ref().is_some_and(Shape::is_points));
		let (transparent, opaque): (Vec<&Drawable<'_>>, Vec<&Drawable<'_>>) =
			meshes.into_iter().partition(|d| d.node.material.is_transparent());

		self.bind_frame_uniforms(scene, camera);
		for drawable in opaque {
			self.draw_mesh(drawable);
		}

		self.gl.enable(GL::BLEND);
		self.gl.depth_mask(false);
		for drawable in transparent {
			self.draw_mesh(drawable);
		}
		self.gl.depth_mask(true);
		self.gl.disable(GL::BLEND);

		self.draw_points(&clouds, camera);
		self.gl.bind_vertex_array(None);
	}

	fn set_size(&mut self, width: u32, height: u32) {
		let (width, height) = (width.max(1), height.max(1));
		self.canvas.set_width(width);
		self.canvas.set_height(height);
		self.size = (width, height);
	}
}

/// Creates a buffer bound to `ARRAY_BUFFER` and wires it to attribute
/// `location` of the currently bound vertex array.
fn attribute_buffer(gl: &GL, location: u32) -> Result<WebGlBuffer, RenderError> {
	let buffer = gl.create_buffer().ok_or_else(|| RenderError::Js("cannot create buffer".into()))?;
	gl.bind_buffer(GL::ARRAY_BUFFER, Some(&buffer));
	gl.enable_vertex_attrib_array(location);
	gl.vertex_attrib_pointer_with_i32(location, 3, GL::FLOAT, false, 0, 0);
	Ok(buffer)
}


#[cfg(test)]
mod tests {
	use super::*;
	use crate::scene::{Material, Node};

	#[test]
	fn headless_counts_frames_and_drawables() {
		let mut scene = Scene::new(Color::WHITE, 0.0);
		scene.add(Node::mesh(Shape::sphere(1.0, 8), Material::default()));
		scene.add(Node::group());
		let camera = Camera::new(55.0, 1.0, 0.1, 100.0);
		let mut renderer = HeadlessRenderer::default();
		renderer.render(&scene, &camera);
		renderer.render(&scene, &camera);
		renderer.set_size(640, 480);
		assert_eq!(renderer.frames, 2);
		assert_eq!(renderer.last_drawn, 1);
		assert_eq!(renderer.size, (640, 480));
	}

	#[test]
	fn default_sun_points_down_onto_the_scene() {
		let light = Lighting::default();
		assert!(light.sun_direction.y > 0.0);
		assert!((light.sun_direction.length() - 1.0).abs() < 1e-5);
	}
}
