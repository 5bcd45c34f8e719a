use nalgebra::{Matrix4, Point3};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{HtmlCanvasElement, WebGlBuffer, WebGlProgram, WebGlRenderingContext, WebGlShader, WebGlUniformLocation};

use crate::engine::mesh::{Mesh, FLOATS_PER_VERTEX};
use crate::sim::catalog::{hex_to_rgb, Catalog, RING_INNER_RADIUS, RING_OUTER_RADIUS};
use crate::sim::{FrameRenderer, SimulationContext};

const VERTEX_SHADER: &str = r#"
    attribute vec3 aPosition;
    attribute vec3 aNormal;
    uniform mat4 uModelViewProjection;
    uniform mat4 uModel;
    uniform float uPointSize;
    varying vec3 vWorldPos;
    varying vec3 vNormal;
    void main() {
        gl_Position = uModelViewProjection * vec4(aPosition, 1.0);
        gl_PointSize = uPointSize;
        vWorldPos = (uModel * vec4(aPosition, 1.0)).xyz;
        vNormal = mat3(uModel) * aNormal;
    }
"#;

const FRAGMENT_SHADER: &str = r#"
    precision mediump float;
    varying vec3 vWorldPos;
    varying vec3 vNormal;
    uniform vec3 uColor;
    uniform bool uEmissive;
    uniform float uOpacity;
    uniform vec3 uAmbient;
    uniform vec3 uLightPosition;
    uniform float uLightIntensity;
    uniform float uLightRange;

    void main() {
        if (uEmissive) {
            gl_FragColor = vec4(uColor, uOpacity);
            return;
        }

        // Point light at the star with linear falloff to zero at uLightRange
        vec3 toLight = uLightPosition - vWorldPos;
        float dist = length(toLight);
        float falloff = clamp(1.0 - dist / uLightRange, 0.0, 1.0);
        float diffuse = max(dot(normalize(vNormal), toLight / dist), 0.0);

        vec3 color = uColor * (uAmbient + vec3(diffuse * uLightIntensity * falloff));
        gl_FragColor = vec4(color, uOpacity);
    }
"#;

const AMBIENT_LIGHT: u32 = 0x333333;
const LIGHT_INTENSITY: f32 = 2.0;
const LIGHT_RANGE: f32 = 200.0;
const ORBIT_PATH_COLOR: u32 = 0x444444;
const ORBIT_PATH_HALF_WIDTH: f32 = 0.1;
const ORBIT_PATH_OPACITY: f32 = 0.3;
const PLANET_RING_COLOR: u32 = 0xC9B18A;
const PLANET_RING_OPACITY: f32 = 0.7;
const STAR_POINT_SIZE: f32 = 1.5;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("no WebGL context available")]
    NoContext,

    #[error("shader compilation failed: {0}")]
    Shader(String),

    #[error("program link failed: {0}")]
    Link(String),

    #[error("failed to create {0}")]
    Resource(&'static str),

    #[error("DOM error: {0}")]
    Dom(String),
}

impl From<RenderError> for JsValue {
    fn from(err: RenderError) -> Self {
        JsValue::from_str(&err.to_string())
    }
}

struct Uniforms {
    mvp: WebGlUniformLocation,
    model: WebGlUniformLocation,
    point_size: WebGlUniformLocation,
    color: WebGlUniformLocation,
    emissive: WebGlUniformLocation,
    opacity: WebGlUniformLocation,
    ambient: WebGlUniformLocation,
    light_position: WebGlUniformLocation,
    light_intensity: WebGlUniformLocation,
    light_range: WebGlUniformLocation,
}

impl Uniforms {
    fn locate(gl: &WebGlRenderingContext, program: &WebGlProgram) -> Result<Self, RenderError> {
        let get = |name: &'static str| {
            gl.get_uniform_location(program, name).ok_or(RenderError::Resource(name))
        };
        Ok(Uniforms {
            mvp: get("uModelViewProjection")?,
            model: get("uModel")?,
            point_size: get("uPointSize")?,
            color: get("uColor")?,
            emissive: get("uEmissive")?,
            opacity: get("uOpacity")?,
            ambient: get("uAmbient")?,
            light_position: get("uLightPosition")?,
            light_intensity: get("uLightIntensity")?,
            light_range: get("uLightRange")?,
        })
    }
}

/// Index + vertex buffers uploaded once.
struct GpuMesh {
    vertex_buffer: WebGlBuffer,
    index_buffer: WebGlBuffer,
    index_count: i32,
}

impl GpuMesh {
    fn upload(gl: &WebGlRenderingContext, mesh: &Mesh) -> Result<Self, RenderError> {
        let vertex_buffer = gl.create_buffer().ok_or(RenderError::Resource("vertex buffer"))?;
        let index_buffer = gl.create_buffer().ok_or(RenderError::Resource("index buffer"))?;

        gl.bind_buffer(WebGlRenderingContext::ARRAY_BUFFER, Some(&vertex_buffer));
        unsafe {
            let vert_array = js_sys::Float32Array::view(&mesh.vertices);
            gl.buffer_data_with_array_buffer_view(
                WebGlRenderingContext::ARRAY_BUFFER,
                &vert_array,
                WebGlRenderingContext::STATIC_DRAW,
            );
        }

        gl.bind_buffer(WebGlRenderingContext::ELEMENT_ARRAY_BUFFER, Some(&index_buffer));
        unsafe {
            let idx_array = js_sys::Uint16Array::view(&mesh.indices);
            gl.buffer_data_with_array_buffer_view(
                WebGlRenderingContext::ELEMENT_ARRAY_BUFFER,
                &idx_array,
                WebGlRenderingContext::STATIC_DRAW,
            );
        }

        Ok(GpuMesh { vertex_buffer, index_buffer, index_count: mesh.indices.len() as i32 })
    }

    fn delete(&self, gl: &WebGlRenderingContext) {
        gl.delete_buffer(Some(&self.vertex_buffer));
        gl.delete_buffer(Some(&self.index_buffer));
    }
}

/// WebGL 1 backend: starfield, star, planets, orbit bands and planetary rings.
/// GL objects are released on drop.
pub struct WebGlRenderer {
    gl: WebGlRenderingContext,
    program: WebGlProgram,
    shaders: [WebGlShader; 2],
    uniforms: Uniforms,
    position_attrib: u32,
    normal_attrib: u32,
    sphere: GpuMesh,
    planet_ring: GpuMesh,
    orbit_paths: Vec<GpuMesh>,
    star_buffer: WebGlBuffer,
    star_count: i32,
    clear_color: [f32; 3],
}

impl WebGlRenderer {
    pub fn new(
        gl: WebGlRenderingContext,
        catalog: &Catalog,
        starfield: &[f32],
        clear_color: [f32; 3],
    ) -> Result<Self, RenderError> {
        let vertex_shader = compile_shader(&gl, WebGlRenderingContext::VERTEX_SHADER, VERTEX_SHADER)?;
        let fragment_shader = compile_shader(&gl, WebGlRenderingContext::FRAGMENT_SHADER, FRAGMENT_SHADER)?;
        let program = link_program(&gl, &vertex_shader, &fragment_shader)?;
        gl.use_program(Some(&program));

        let uniforms = Uniforms::locate(&gl, &program)?;
        let position_attrib = attrib_location(&gl, &program, "aPosition")?;
        let normal_attrib = attrib_location(&gl, &program, "aNormal")?;

        let sphere = GpuMesh::upload(&gl, &Mesh::sphere(1.0, 32, 32))?;
        let planet_ring = GpuMesh::upload(&gl, &Mesh::ring(RING_INNER_RADIUS, RING_OUTER_RADIUS, 32))?;
        let orbit_paths = catalog
            .planets()
            .map(|(_, descriptor)| {
                let d = descriptor.orbital_distance;
                GpuMesh::upload(&gl, &Mesh::ring(d - ORBIT_PATH_HALF_WIDTH, d + ORBIT_PATH_HALF_WIDTH, 64))
            })
            .collect::<Result<Vec<_>, RenderError>>()?;

        let star_buffer = gl.create_buffer().ok_or(RenderError::Resource("starfield buffer"))?;
        gl.bind_buffer(WebGlRenderingContext::ARRAY_BUFFER, Some(&star_buffer));
        unsafe {
            let star_array = js_sys::Float32Array::view(starfield);
            gl.buffer_data_with_array_buffer_view(
                WebGlRenderingContext::ARRAY_BUFFER,
                &star_array,
                WebGlRenderingContext::STATIC_DRAW,
            );
        }

        let (ar, ag, ab) = hex_to_rgb(AMBIENT_LIGHT);
        gl.uniform3f(Some(&uniforms.ambient), ar, ag, ab);
        gl.uniform3f(Some(&uniforms.light_position), 0.0, 0.0, 0.0);
        gl.uniform1f(Some(&uniforms.light_intensity), LIGHT_INTENSITY);
        gl.uniform1f(Some(&uniforms.light_range), LIGHT_RANGE);
        gl.enable(WebGlRenderingContext::DEPTH_TEST);
        gl.blend_func(WebGlRenderingContext::SRC_ALPHA, WebGlRenderingContext::ONE_MINUS_SRC_ALPHA);

        log::info!(
            "WebGL renderer initialized ({} orbit paths, {} stars)",
            orbit_paths.len(),
            starfield.len() / 3
        );

        Ok(WebGlRenderer {
            gl,
            program,
            shaders: [vertex_shader, fragment_shader],
            uniforms,
            position_attrib,
            normal_attrib,
            sphere,
            planet_ring,
            orbit_paths,
            star_buffer,
            star_count: (starfield.len() / 3) as i32,
            clear_color,
        })
    }

    pub fn canvas(&self) -> Option<HtmlCanvasElement> {
        self.gl.canvas()?.dyn_into::<HtmlCanvasElement>().ok()
    }

    fn set_material(&self, color: (f32, f32, f32), emissive: bool, opacity: f32) {
        self.gl.uniform3f(Some(&self.uniforms.color), color.0, color.1, color.2);
        self.gl.uniform1i(Some(&self.uniforms.emissive), emissive as i32);
        self.gl.uniform1f(Some(&self.uniforms.opacity), opacity);
    }

    fn set_transform(&self, view_projection: &Matrix4<f32>, model: &Matrix4<f32>) {
        let mvp = view_projection * model;
        self.gl.uniform_matrix4fv_with_f32_array(Some(&self.uniforms.mvp), false, mvp.as_slice());
        self.gl.uniform_matrix4fv_with_f32_array(Some(&self.uniforms.model), false, model.as_slice());
    }

    fn draw_mesh(&self, mesh: &GpuMesh) {
        let stride = (FLOATS_PER_VERTEX * 4) as i32;
        self.gl.bind_buffer(WebGlRenderingContext::ARRAY_BUFFER, Some(&mesh.vertex_buffer));
        self.gl.bind_buffer(WebGlRenderingContext::ELEMENT_ARRAY_BUFFER, Some(&mesh.index_buffer));

        self.gl.vertex_attrib_pointer_with_i32(self.position_attrib, 3, WebGlRenderingContext::FLOAT, false, stride, 0);
        self.gl.enable_vertex_attrib_array(self.position_attrib);
        self.gl.vertex_attrib_pointer_with_i32(self.normal_attrib, 3, WebGlRenderingContext::FLOAT, false, stride, 12);
        self.gl.enable_vertex_attrib_array(self.normal_attrib);

        self.gl.draw_elements_with_i32(
            WebGlRenderingContext::TRIANGLES,
            mesh.index_count,
            WebGlRenderingContext::UNSIGNED_SHORT,
            0,
        );
    }

    fn draw_starfield(&self, view_projection: &Matrix4<f32>) {
        self.gl.bind_buffer(WebGlRenderingContext::ARRAY_BUFFER, Some(&self.star_buffer));
        self.gl.vertex_attrib_pointer_with_i32(self.position_attrib, 3, WebGlRenderingContext::FLOAT, false, 0, 0);
        self.gl.enable_vertex_attrib_array(self.position_attrib);
        // Normals are unused for emissive points
        self.gl.disable_vertex_attrib_array(self.normal_attrib);

        self.set_material((1.0, 1.0, 1.0), true, 1.0);
        self.gl.uniform1f(Some(&self.uniforms.point_size), STAR_POINT_SIZE);
        self.set_transform(view_projection, &Matrix4::identity());
        self.gl.draw_arrays(WebGlRenderingContext::POINTS, 0, self.star_count);
        self.gl.uniform1f(Some(&self.uniforms.point_size), 1.0);
    }
}

impl FrameRenderer for WebGlRenderer {
    fn resize(&mut self, width: u32, height: u32) {
        if let Some(canvas) = self.canvas() {
            canvas.set_width(width);
            canvas.set_height(height);
        }
        self.gl.viewport(0, 0, width as i32, height as i32);
    }

    fn draw(&mut self, scene: &SimulationContext) {
        let [r, g, b] = self.clear_color;
        self.gl.clear_color(r, g, b, 1.0);
        self.gl.clear(WebGlRenderingContext::COLOR_BUFFER_BIT | WebGlRenderingContext::DEPTH_BUFFER_BIT);

        let view_projection = scene.camera().view_projection();
        self.draw_starfield(&view_projection);

        let body_model = |position: &Point3<f32>, spin: f64, radius: f32| {
            Matrix4::new_translation(&position.coords)
                * Matrix4::from_euler_angles(0.0, spin as f32, 0.0)
                * Matrix4::new_scaling(radius)
        };

        for pose in scene.poses() {
            let model = body_model(&pose.position, pose.spin, pose.descriptor.radius);
            self.set_material(pose.descriptor.rgb(), pose.descriptor.is_star(), 1.0);
            self.set_transform(&view_projection, &model);
            self.draw_mesh(&self.sphere);
        }

        // Translucent geometry last, without depth writes
        self.gl.enable(WebGlRenderingContext::BLEND);
        self.gl.depth_mask(false);

        self.set_material(hex_to_rgb(ORBIT_PATH_COLOR), true, ORBIT_PATH_OPACITY);
        self.set_transform(&view_projection, &Matrix4::identity());
        for path in &self.orbit_paths {
            self.draw_mesh(path);
        }

        self.set_material(hex_to_rgb(PLANET_RING_COLOR), true, PLANET_RING_OPACITY);
        for pose in scene.poses().filter(|p| p.descriptor.has_ring_system) {
            let model = body_model(&pose.position, pose.spin, pose.descriptor.radius);
            self.set_transform(&view_projection, &model);
            self.draw_mesh(&self.planet_ring);
        }

        self.gl.depth_mask(true);
        self.gl.disable(WebGlRenderingContext::BLEND);
    }
}

impl Drop for WebGlRenderer {
    fn drop(&mut self) {
        self.sphere.delete(&self.gl);
        self.planet_ring.delete(&self.gl);
        for path in &self.orbit_paths {
            path.delete(&self.gl);
        }
        self.gl.delete_buffer(Some(&self.star_buffer));
        for shader in &self.shaders {
            self.gl.detach_shader(&self.program, shader);
            self.gl.delete_shader(Some(shader));
        }
        self.gl.delete_program(Some(&self.program));
        log::info!("WebGL renderer released");
    }
}

fn attrib_location(gl: &WebGlRenderingContext, program: &WebGlProgram, name: &'static str) -> Result<u32, RenderError> {
    let location = gl.get_attrib_location(program, name);
    if location < 0 {
        return Err(RenderError::Resource(name));
    }
    Ok(location as u32)
}

fn link_program(
    gl: &WebGlRenderingContext,
    vert_shader: &WebGlShader,
    frag_shader: &WebGlShader,
) -> Result<WebGlProgram, RenderError> {
    let program = gl.create_program().ok_or(RenderError::Resource("program"))?;
    gl.attach_shader(&program, vert_shader);
    gl.attach_shader(&program, frag_shader);
    gl.link_program(&program);

    if gl.get_program_parameter(&program, WebGlRenderingContext::LINK_STATUS).as_bool().unwrap_or(false) {
        Ok(program)
    } else {
        let log = gl.get_program_info_log(&program).unwrap_or_default();
        gl.delete_program(Some(&program));
        Err(RenderError::Link(log))
    }
}

fn compile_shader(gl: &WebGlRenderingContext, shader_type: u32, source: &str) -> Result<WebGlShader, RenderError> {
    let shader = gl.create_shader(shader_type).ok_or(RenderError::Resource("shader"))?;
    gl.shader_source(&shader, source);
    gl.compile_shader(&shader);

    if gl.get_shader_parameter(&shader, WebGlRenderingContext::COMPILE_STATUS).as_bool().unwrap_or(false) {
        Ok(shader)
    } else {
        let log = gl.get_shader_info_log(&shader).unwrap_or_default();
        gl.delete_shader(Some(&shader));
        Err(RenderError::Shader(log))
    }
}

/// Look up the canvas by id and obtain its WebGL context.
pub fn webgl_context(canvas_id: &str) -> Result<WebGlRenderingContext, RenderError> {
    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| RenderError::Dom("no document".to_string()))?;
    let canvas = document
        .get_element_by_id(canvas_id)
        .ok_or_else(|| RenderError::Dom(format!("no element with id '{canvas_id}'")))?
        .dyn_into::<HtmlCanvasElement>()
        .map_err(|_| RenderError::Dom(format!("element '{canvas_id}' is not a canvas")))?;

    canvas
        .get_context("webgl")
        .map_err(|_| RenderError::NoContext)?
        .ok_or(RenderError::NoContext)?
        .dyn_into::<WebGlRenderingContext>()
        .map_err(|_| RenderError::NoContext)
}
