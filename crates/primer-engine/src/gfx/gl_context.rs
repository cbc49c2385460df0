use std::collections::HashMap;

use glow::HasContext;

use super::color::Color;
use super::context::{GraphicsContext, Primitive, ShaderStage, UniformKind, UniformValue};
use super::mesh::VertexLayout;

/// Resolved uniform plus the type the linker reported for it.
#[derive(Debug, Clone)]
pub struct GlowLocation {
    location: glow::UniformLocation,
    kind: UniformKind,
}

impl GlowLocation {
    #[inline]
    pub fn kind(&self) -> UniformKind {
        self.kind
    }
}

#[derive(Debug)]
struct MeshBuffers {
    vertices: glow::Buffer,
    indices: Option<glow::Buffer>,
}

/// [`GraphicsContext`] over a live OpenGL 3.3 core context.
///
/// Only constructible from a loaded `glow::Context`, so every handle it hands
/// out belongs to a context that exists. The GL context must be current on
/// this thread for every call.
pub struct GlowContext {
    gl: glow::Context,
    active: Option<glow::Program>,
    /// Active uniform name -> type, per program, captured at link time.
    uniform_kinds: HashMap<glow::Program, HashMap<String, UniformKind>>,
    meshes: HashMap<glow::VertexArray, MeshBuffers>,
}

impl GlowContext {
    pub fn new(gl: glow::Context) -> Self {
        // SAFETY: string queries have no preconditions beyond a current context.
        let (version, renderer) = unsafe {
            (gl.get_parameter_string(glow::VERSION), gl.get_parameter_string(glow::RENDERER))
        };
        log::info!("OpenGL {version} on {renderer}");

        Self {
            gl,
            active: None,
            uniform_kinds: HashMap::new(),
            meshes: HashMap::new(),
        }
    }

    fn kind_of(&self, program: glow::Program, name: &str) -> UniformKind {
        let Some(kinds) = self.uniform_kinds.get(&program) else {
            return UniformKind::Other;
        };
        // Arrays are reported as `name[0]`; every element shares its type.
        let base = name.split_once('[').map_or(name, |(base, _)| base);
        kinds
            .get(name)
            .or_else(|| kinds.get(&format!("{base}[0]")))
            .copied()
            .unwrap_or(UniformKind::Other)
    }

    fn collect_uniform_kinds(&self, program: glow::Program) -> HashMap<String, UniformKind> {
        // SAFETY: `program` was just linked successfully on this context.
        unsafe {
            (0..self.gl.get_active_uniforms(program))
                .filter_map(|index| self.gl.get_active_uniform(program, index))
                .map(|u| (u.name, uniform_kind(u.utype)))
                .collect()
        }
    }

    /// Runs `f` with `program` bound, restoring the tracked active program.
    fn with_program<R>(&self, program: glow::Program, f: impl FnOnce(&glow::Context) -> R) -> R {
        let rebind = self.active != Some(program);
        // SAFETY: `program` is a live program object of this context.
        unsafe {
            if rebind {
                self.gl.use_program(Some(program));
            }
            let out = f(&self.gl);
            if rebind {
                self.gl.use_program(self.active);
            }
            out
        }
    }
}

/// Every sampler type a 3.3 to 4.6 core linker reports, float, signed and unsigned.
const SAMPLER_TYPES: [u32; 40] = [
    glow::SAMPLER_1D,
    glow::SAMPLER_2D,
    glow::SAMPLER_3D,
    glow::SAMPLER_CUBE,
    glow::SAMPLER_1D_SHADOW,
    glow::SAMPLER_2D_SHADOW,
    glow::SAMPLER_1D_ARRAY,
    glow::SAMPLER_2D_ARRAY,
    glow::SAMPLER_1D_ARRAY_SHADOW,
    glow::SAMPLER_2D_ARRAY_SHADOW,
    glow::SAMPLER_2D_MULTISAMPLE,
    glow::SAMPLER_2D_MULTISAMPLE_ARRAY,
    glow::SAMPLER_CUBE_SHADOW,
    glow::SAMPLER_BUFFER,
    glow::SAMPLER_2D_RECT,
    glow::SAMPLER_2D_RECT_SHADOW,
    glow::SAMPLER_CUBE_MAP_ARRAY,
    glow::SAMPLER_CUBE_MAP_ARRAY_SHADOW,
    glow::INT_SAMPLER_1D,
    glow::INT_SAMPLER_2D,
    glow::INT_SAMPLER_3D,
    glow::INT_SAMPLER_CUBE,
    glow::INT_SAMPLER_1D_ARRAY,
    glow::INT_SAMPLER_2D_ARRAY,
    glow::INT_SAMPLER_2D_MULTISAMPLE,
    glow::INT_SAMPLER_2D_MULTISAMPLE_ARRAY,
    glow::INT_SAMPLER_BUFFER,
    glow::INT_SAMPLER_2D_RECT,
    glow::INT_SAMPLER_CUBE_MAP_ARRAY,
    glow::UNSIGNED_INT_SAMPLER_1D,
    glow::UNSIGNED_INT_SAMPLER_2D,
    glow::UNSIGNED_INT_SAMPLER_3D,
    glow::UNSIGNED_INT_SAMPLER_CUBE,
    glow::UNSIGNED_INT_SAMPLER_1D_ARRAY,
    glow::UNSIGNED_INT_SAMPLER_2D_ARRAY,
    glow::UNSIGNED_INT_SAMPLER_2D_MULTISAMPLE,
    glow::UNSIGNED_INT_SAMPLER_2D_MULTISAMPLE_ARRAY,
    glow::UNSIGNED_INT_SAMPLER_BUFFER,
    glow::UNSIGNED_INT_SAMPLER_2D_RECT,
    glow::UNSIGNED_INT_SAMPLER_CUBE_MAP_ARRAY,
];

fn uniform_kind(gl_type: u32) -> UniformKind {
    if SAMPLER_TYPES.contains(&gl_type) {
        return UniformKind::Sampler;
    }
    match gl_type {
        glow::BOOL => UniformKind::Bool,
        glow::INT => UniformKind::Int,
        glow::UNSIGNED_INT => UniformKind::UInt,
        glow::FLOAT => UniformKind::Float,
        glow::FLOAT_VEC2 => UniformKind::Vec2,
        glow::FLOAT_VEC3 => UniformKind::Vec3,
        glow::FLOAT_VEC4 => UniformKind::Vec4,
        glow::FLOAT_MAT2 => UniformKind::Mat2,
        glow::FLOAT_MAT3 => UniformKind::Mat3,
        glow::FLOAT_MAT4 => UniformKind::Mat4,
        // bvec, ivec, uvec, doubles and non-square matrices.
        _ => UniformKind::Other,
    }
}

/// Whether a write goes to GL. Known kinds are checked here; for `Other`
/// the driver has the final say.
fn forwards(kind: UniformKind, value: &UniformValue) -> bool {
    kind == UniformKind::Other || kind.accepts(value)
}

fn gl_primitive(primitive: Primitive) -> u32 {
    match primitive {
        Primitive::Triangles => glow::TRIANGLES,
        Primitive::Lines => glow::LINES,
        Primitive::Points => glow::POINTS,
    }
}

impl GraphicsContext for GlowContext {
    type Stage = glow::Shader;
    type Program = glow::Program;
    type Location = GlowLocation;
    type VertexArray = glow::VertexArray;

    fn compile_stage(&mut self, stage: ShaderStage, source: &str) -> Result<glow::Shader, String> {
        let kind = match stage {
            ShaderStage::Vertex => glow::VERTEX_SHADER,
            ShaderStage::Fragment => glow::FRAGMENT_SHADER,
        };
        // SAFETY: the shader is created, queried and (on failure) deleted here.
        unsafe {
            let shader = self.gl.create_shader(kind)?;
            self.gl.shader_source(shader, source);
            self.gl.compile_shader(shader);
            if !self.gl.get_shader_compile_status(shader) {
                let log = self.gl.get_shader_info_log(shader);
                self.gl.delete_shader(shader);
                return Err(log);
            }
            Ok(shader)
        }
    }

    fn delete_stage(&mut self, stage: glow::Shader) {
        // SAFETY: deleting an unknown name only raises a GL error.
        unsafe { self.gl.delete_shader(stage) }
    }

    fn link_program(&mut self, stages: &[glow::Shader]) -> Result<glow::Program, String> {
        // SAFETY: stages are detached before returning; the program is
        // deleted if the link fails.
        let program = unsafe {
            let program = self.gl.create_program()?;
            for &stage in stages {
                self.gl.attach_shader(program, stage);
            }
            self.gl.link_program(program);
            for &stage in stages {
                self.gl.detach_shader(program, stage);
            }
            if !self.gl.get_program_link_status(program) {
                let log = self.gl.get_program_info_log(program);
                self.gl.delete_program(program);
                return Err(log);
            }
            program
        };

        let kinds = self.collect_uniform_kinds(program);
        log::debug!("program {program:?} has {} active uniforms", kinds.len());
        self.uniform_kinds.insert(program, kinds);
        Ok(program)
    }

    fn delete_program(&mut self, program: glow::Program) {
        if self.active == Some(program) {
            self.use_program(None);
        }
        self.uniform_kinds.remove(&program);
        // SAFETY: see `delete_stage`.
        unsafe { self.gl.delete_program(program) }
    }

    fn use_program(&mut self, program: Option<glow::Program>) {
        // SAFETY: binding `None` is always valid; other names are checked by GL.
        unsafe { self.gl.use_program(program) }
        self.active = program;
    }

    fn active_program(&self) -> Option<glow::Program> {
        self.active
    }

    fn uniform_location(&mut self, program: glow::Program, name: &str) -> Option<GlowLocation> {
        // SAFETY: location queries have no side effects.
        let location = unsafe { self.gl.get_uniform_location(program, name) }?;
        Some(GlowLocation {
            location,
            kind: self.kind_of(program, name),
        })
    }

    fn write_uniform(&mut self, program: glow::Program, location: &GlowLocation, value: UniformValue) {
        if !forwards(location.kind, &value) {
            // GL rejects it with INVALID_OPERATION; report it here where it is visible.
            log::warn!("{value:?} does not fit a {:?} uniform; write ignored", location.kind);
            return;
        }
        let loc = Some(&location.location);
        self.with_program(program, |gl| unsafe {
            match value {
                UniformValue::Bool(b) => gl.uniform_1_i32(loc, b as i32),
                UniformValue::Int(i) => gl.uniform_1_i32(loc, i),
                UniformValue::Float(f) => gl.uniform_1_f32(loc, f),
                UniformValue::Vec2([x, y]) => gl.uniform_2_f32(loc, x, y),
                UniformValue::Vec3([x, y, z]) => gl.uniform_3_f32(loc, x, y, z),
                UniformValue::Vec4([x, y, z, w]) => gl.uniform_4_f32(loc, x, y, z, w),
            }
        });
    }

    fn read_uniform(&mut self, program: glow::Program, location: &GlowLocation) -> Option<UniformValue> {
        let loc = &location.location;
        // SAFETY: the output slices match the uniform's declared width.
        unsafe {
            let floats = |n: usize| {
                let mut out = [0.0f32; 4];
                self.gl.get_uniform_f32(program, loc, &mut out[..n]);
                out
            };
            let int = || {
                let mut out = [0i32; 1];
                self.gl.get_uniform_i32(program, loc, &mut out);
                out[0]
            };
            match location.kind {
                UniformKind::Bool => Some(UniformValue::Bool(int() != 0)),
                UniformKind::Int | UniformKind::Sampler => Some(UniformValue::Int(int())),
                UniformKind::Float => Some(UniformValue::Float(floats(1)[0])),
                UniformKind::Vec2 => {
                    let v = floats(2);
                    Some(UniformValue::Vec2([v[0], v[1]]))
                }
                UniformKind::Vec3 => {
                    let v = floats(3);
                    Some(UniformValue::Vec3([v[0], v[1], v[2]]))
                }
                UniformKind::Vec4 => Some(UniformValue::Vec4(floats(4))),
                _ => None,
            }
        }
    }

    fn upload_mesh(
        &mut self,
        vertices: &[f32],
        indices: Option<&[u32]>,
        layout: &VertexLayout,
    ) -> Result<glow::VertexArray, String> {
        const FLOAT_SIZE: usize = std::mem::size_of::<f32>();
        let stride = (layout.stride() * FLOAT_SIZE) as i32;

        // SAFETY: buffers are bound to the new VAO before any pointer setup,
        // and all bindings are reset before returning.
        unsafe {
            let vao = self.gl.create_vertex_array()?;
            self.gl.bind_vertex_array(Some(vao));

            let vbo = self.gl.create_buffer()?;
            self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
            self.gl
                .buffer_data_u8_slice(glow::ARRAY_BUFFER, bytemuck::cast_slice(vertices), glow::STATIC_DRAW);

            let ebo = match indices {
                Some(indices) => {
                    let ebo = self.gl.create_buffer()?;
                    self.gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(ebo));
                    self.gl.buffer_data_u8_slice(
                        glow::ELEMENT_ARRAY_BUFFER,
                        bytemuck::cast_slice(indices),
                        glow::STATIC_DRAW,
                    );
                    Some(ebo)
                }
                None => None,
            };

            for attr in layout.attributes() {
                self.gl.vertex_attrib_pointer_f32(
                    attr.location,
                    attr.components as i32,
                    glow::FLOAT,
                    false,
                    stride,
                    (attr.offset * FLOAT_SIZE) as i32,
                );
                self.gl.enable_vertex_attrib_array(attr.location);
            }

            // The element binding is VAO state, so unbind the VAO first.
            self.gl.bind_vertex_array(None);
            self.gl.bind_buffer(glow::ARRAY_BUFFER, None);
            self.gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, None);

            self.meshes.insert(vao, MeshBuffers { vertices: vbo, indices: ebo });
            Ok(vao)
        }
    }

    fn draw(&mut self, vertex_array: glow::VertexArray, primitive: Primitive, count: usize, indexed: bool) {
        let mode = gl_primitive(primitive);
        // SAFETY: `vertex_array` came from `upload_mesh`; element draws only
        // happen for meshes that own an index buffer.
        unsafe {
            self.gl.bind_vertex_array(Some(vertex_array));
            if indexed {
                self.gl.draw_elements(mode, count as i32, glow::UNSIGNED_INT, 0);
            } else {
                self.gl.draw_arrays(mode, 0, count as i32);
            }
            self.gl.bind_vertex_array(None);
        }
    }

    fn delete_mesh(&mut self, vertex_array: glow::VertexArray) {
        let Some(buffers) = self.meshes.remove(&vertex_array) else {
            log::warn!("delete_mesh: unknown vertex array {vertex_array:?}");
            return;
        };
        // SAFETY: the objects were created together in `upload_mesh`.
        unsafe {
            self.gl.delete_vertex_array(vertex_array);
            self.gl.delete_buffer(buffers.vertices);
            if let Some(ebo) = buffers.indices {
                self.gl.delete_buffer(ebo);
            }
        }
    }

    fn clear(&mut self, color: Color) {
        // SAFETY: plain state calls.
        unsafe {
            self.gl.clear_color(color.r, color.g, color.b, color.a);
            self.gl.clear(glow::COLOR_BUFFER_BIT);
        }
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        // SAFETY: plain state call.
        unsafe { self.gl.viewport(0, 0, width as i32, height as i32) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gl_types_map_to_uniform_kinds() {
        assert_eq!(uniform_kind(glow::FLOAT_VEC3), UniformKind::Vec3);
        assert_eq!(uniform_kind(glow::SAMPLER_2D), UniformKind::Sampler);
        assert_eq!(uniform_kind(glow::BOOL), UniformKind::Bool);
        assert_eq!(uniform_kind(glow::DOUBLE), UniformKind::Other);
    }

    #[test]
    fn every_sampler_family_is_a_sampler() {
        for ty in [
            glow::SAMPLER_BUFFER,
            glow::SAMPLER_2D_RECT,
            glow::SAMPLER_CUBE_MAP_ARRAY,
            glow::SAMPLER_2D_MULTISAMPLE,
            glow::INT_SAMPLER_3D,
            glow::UNSIGNED_INT_SAMPLER_CUBE,
            glow::INT_SAMPLER_2D_ARRAY,
        ] {
            assert_eq!(uniform_kind(ty), UniformKind::Sampler, "{ty:#x}");
        }
    }

    #[test]
    fn integer_and_bool_vectors_are_other() {
        for ty in [glow::BOOL_VEC2, glow::INT_VEC3, glow::UNSIGNED_INT_VEC4] {
            assert_eq!(uniform_kind(ty), UniformKind::Other);
        }
    }

    #[test]
    fn writes_to_other_kinds_reach_the_driver() {
        assert!(forwards(UniformKind::Other, &UniformValue::Int(1)));
        assert!(forwards(UniformKind::Other, &UniformValue::Vec2([0.0; 2])));
        assert!(forwards(UniformKind::Sampler, &UniformValue::Int(0)));
        assert!(!forwards(UniformKind::Float, &UniformValue::Vec3([0.0; 3])));
        assert!(!forwards(UniformKind::Sampler, &UniformValue::Float(0.0)));
    }

    #[test]
    fn primitives_map_to_gl_modes() {
        assert_eq!(gl_primitive(Primitive::Triangles), glow::TRIANGLES);
        assert_eq!(gl_primitive(Primitive::Points), glow::POINTS);
    }
}
