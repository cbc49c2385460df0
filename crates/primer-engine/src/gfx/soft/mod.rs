//! Headless [`GraphicsContext`].
//!
//! Compiles GLSL with a declaration-level front end, links stage interfaces,
//! keeps uniform storage in memory and records draws instead of rasterizing.
//! Misuse sets a sticky error flag the way a GL driver does.

mod expr;
mod front;
mod lexer;
mod link;
mod preprocess;
mod types;

use std::collections::HashMap;
use std::fmt;

use self::front::StageInterface;
use self::link::LinkedProgram;
use super::color::Color;
use super::context::{GraphicsContext, Primitive, ShaderStage, UniformKind, UniformValue};
use super::mesh::VertexLayout;

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
        pub struct $name(u32);

        impl $name {
            /// Raw object name. Never zero.
            pub fn get(self) -> u32 {
                self.0
            }
        }
    };
}

handle!(
    /// Compiled stage object.
    StageId
);
handle!(
    /// Linked program object.
    ProgramId
);
handle!(
    /// Uploaded mesh.
    VertexArrayId
);

/// Index of a uniform slot inside one program.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct SoftLocation(usize);

/// Error flag, kept until [`SoftContext::take_error`] reads it.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum GlError {
    /// A handle that names no live object.
    InvalidValue,
    /// A call the object's current state does not allow.
    InvalidOperation,
}

impl fmt::Display for GlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GlError::InvalidValue => f.write_str("invalid value"),
            GlError::InvalidOperation => f.write_str("invalid operation"),
        }
    }
}

/// One recorded draw.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct DrawCall {
    /// Program active when the draw was issued.
    pub program: Option<ProgramId>,
    pub vertex_array: VertexArrayId,
    pub primitive: Primitive,
    pub count: usize,
    pub indexed: bool,
}

#[derive(Debug)]
struct SoftMesh {
    vertices: Vec<f32>,
    indices: Option<Vec<u32>>,
    layout: VertexLayout,
}

#[derive(Debug)]
pub struct SoftContext {
    next_name: u32,
    stages: HashMap<StageId, StageInterface>,
    programs: HashMap<ProgramId, LinkedProgram>,
    meshes: HashMap<VertexArrayId, SoftMesh>,
    active: Option<ProgramId>,
    error: Option<GlError>,
    draws: Vec<DrawCall>,
    clear_color: Option<Color>,
    viewport: (u32, u32),
}

impl Default for SoftContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SoftContext {
    pub fn new() -> Self {
        Self {
            next_name: 1,
            stages: HashMap::new(),
            programs: HashMap::new(),
            meshes: HashMap::new(),
            active: None,
            error: None,
            draws: Vec::new(),
            clear_color: None,
            viewport: (0, 0),
        }
    }

    fn next_name(&mut self) -> u32 {
        let name = self.next_name;
        self.next_name += 1;
        name
    }

    // The first error sticks until read.
    fn fail(&mut self, error: GlError, what: &str) {
        log::debug!("soft context: {error} in {what}");
        self.error.get_or_insert(error);
    }

    /// Returns and clears the error flag.
    pub fn take_error(&mut self) -> Option<GlError> {
        self.error.take()
    }

    /// Draws recorded so far, oldest first.
    pub fn draws(&self) -> &[DrawCall] {
        &self.draws
    }

    pub fn clear_draws(&mut self) {
        self.draws.clear();
    }

    /// Color of the last `clear`, if any.
    pub fn clear_color(&self) -> Option<Color> {
        self.clear_color
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    /// Live stage objects.
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Live program objects.
    pub fn program_count(&self) -> usize {
        self.programs.len()
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    /// Active uniforms of `program` in location order.
    pub fn active_uniforms(&self, program: ProgramId) -> Vec<(&str, UniformKind)> {
        self.programs
            .get(&program)
            .map(|p| p.uniforms.iter().map(|u| (u.name.as_str(), u.kind)).collect())
            .unwrap_or_default()
    }

    /// Location assigned to an active vertex input.
    pub fn attribute_location(&self, program: ProgramId, name: &str) -> Option<u32> {
        let program = self.programs.get(&program)?;
        program
            .attributes
            .iter()
            .find(|(attr, _)| attr == name)
            .map(|&(_, location)| location)
    }

    /// Vertex data of a live mesh.
    pub fn mesh_vertices(&self, vertex_array: VertexArrayId) -> Option<&[f32]> {
        self.meshes.get(&vertex_array).map(|m| m.vertices.as_slice())
    }

    pub fn mesh_indices(&self, vertex_array: VertexArrayId) -> Option<&[u32]> {
        self.meshes.get(&vertex_array)?.indices.as_deref()
    }

    pub fn mesh_layout(&self, vertex_array: VertexArrayId) -> Option<&VertexLayout> {
        self.meshes.get(&vertex_array).map(|m| &m.layout)
    }
}

impl GraphicsContext for SoftContext {
    type Stage = StageId;
    type Program = ProgramId;
    type Location = SoftLocation;
    type VertexArray = VertexArrayId;

    fn compile_stage(&mut self, stage: ShaderStage, source: &str) -> Result<StageId, String> {
        let iface = front::compile(stage, source).map_err(|d| d.to_string())?;
        let id = StageId(self.next_name());
        self.stages.insert(id, iface);
        Ok(id)
    }

    fn delete_stage(&mut self, stage: StageId) {
        if self.stages.remove(&stage).is_none() {
            self.fail(GlError::InvalidValue, "delete_stage");
        }
    }

    fn link_program(&mut self, stages: &[StageId]) -> Result<ProgramId, String> {
        if let Some(id) = stages.iter().find(|id| !self.stages.contains_key(*id)) {
            self.fail(GlError::InvalidValue, "link_program");
            return Err(format!("error: {id:?} is not a shader object"));
        }

        let ifaces: Vec<&StageInterface> = stages.iter().filter_map(|id| self.stages.get(id)).collect();
        let linked = link::link(&ifaces)?;
        let id = ProgramId(self.next_name());
        self.programs.insert(id, linked);
        Ok(id)
    }

    fn delete_program(&mut self, program: ProgramId) {
        if self.programs.remove(&program).is_none() {
            self.fail(GlError::InvalidValue, "delete_program");
            return;
        }
        if self.active == Some(program) {
            self.active = None;
        }
    }

    fn use_program(&mut self, program: Option<ProgramId>) {
        match program {
            Some(p) if !self.programs.contains_key(&p) => self.fail(GlError::InvalidValue, "use_program"),
            _ => self.active = program,
        }
    }

    fn active_program(&self) -> Option<ProgramId> {
        self.active
    }

    fn uniform_location(&mut self, program: ProgramId, name: &str) -> Option<SoftLocation> {
        let Some(linked) = self.programs.get(&program) else {
            self.fail(GlError::InvalidValue, "uniform_location");
            return None;
        };
        linked.uniform_index(name).map(SoftLocation)
    }

    fn write_uniform(&mut self, program: ProgramId, location: &SoftLocation, value: UniformValue) {
        let Some(linked) = self.programs.get_mut(&program) else {
            self.fail(GlError::InvalidValue, "write_uniform");
            return;
        };
        let Some(slot) = linked.uniforms.get_mut(location.0) else {
            self.fail(GlError::InvalidOperation, "write_uniform");
            return;
        };
        match slot.kind.coerce(value) {
            Some(stored) => slot.value = Some(stored),
            None => {
                log::debug!("uniform `{}` ({:?}) rejects {value:?}", slot.name, slot.kind);
                self.fail(GlError::InvalidOperation, "write_uniform");
            }
        }
    }

    fn read_uniform(&mut self, program: ProgramId, location: &SoftLocation) -> Option<UniformValue> {
        let Some(linked) = self.programs.get(&program) else {
            self.fail(GlError::InvalidValue, "read_uniform");
            return None;
        };
        linked.uniforms.get(location.0)?.value
    }

    fn upload_mesh(
        &mut self,
        vertices: &[f32],
        indices: Option<&[u32]>,
        layout: &VertexLayout,
    ) -> Result<VertexArrayId, String> {
        let id = VertexArrayId(self.next_name());
        self.meshes.insert(
            id,
            SoftMesh {
                vertices: vertices.to_vec(),
                indices: indices.map(<[u32]>::to_vec),
                layout: layout.clone(),
            },
        );
        Ok(id)
    }

    fn draw(&mut self, vertex_array: VertexArrayId, primitive: Primitive, count: usize, indexed: bool) {
        let Some(mesh) = self.meshes.get(&vertex_array) else {
            self.fail(GlError::InvalidOperation, "draw");
            return;
        };
        if indexed && mesh.indices.is_none() {
            self.fail(GlError::InvalidOperation, "draw");
            return;
        }
        self.draws.push(DrawCall {
            program: self.active,
            vertex_array,
            primitive,
            count,
            indexed,
        });
    }

    fn delete_mesh(&mut self, vertex_array: VertexArrayId) {
        if self.meshes.remove(&vertex_array).is_none() {
            self.fail(GlError::InvalidValue, "delete_mesh");
        }
    }

    fn clear(&mut self, color: Color) {
        self.clear_color = Some(color);
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = (width, height);
    }
}
