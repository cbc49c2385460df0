use std::fmt;

use super::color::Color;
use super::mesh::VertexLayout;

/// One compilable unit of a program.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub const fn name(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Declared type of an active uniform, as reported by the linked program.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum UniformKind {
    Bool,
    Int,
    UInt,
    Float,
    Vec2,
    Vec3,
    Vec4,
    Mat2,
    Mat3,
    Mat4,
    Sampler,
    Other,
}

/// Value written to, or read back from, a uniform.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum UniformValue {
    Bool(bool),
    Int(i32),
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
}

impl UniformKind {
    /// Returns whether a `glUniform*` call carrying `value` is legal for this kind.
    ///
    /// Booleans are written through the integer entry point, so `Bool` values
    /// follow the `Int` row.
    pub fn accepts(self, value: &UniformValue) -> bool {
        match value {
            UniformValue::Bool(_) | UniformValue::Int(_) => {
                matches!(self, UniformKind::Int | UniformKind::Bool | UniformKind::Sampler)
            }
            UniformValue::Float(_) => matches!(self, UniformKind::Float | UniformKind::Bool),
            UniformValue::Vec2(_) => self == UniformKind::Vec2,
            UniformValue::Vec3(_) => self == UniformKind::Vec3,
            UniformValue::Vec4(_) => self == UniformKind::Vec4,
        }
    }

    /// Converts an accepted write into the value the uniform ends up holding.
    ///
    /// Returns `None` when [`accepts`](Self::accepts) would reject the write.
    pub fn coerce(self, value: UniformValue) -> Option<UniformValue> {
        if !self.accepts(&value) {
            return None;
        }
        Some(match (self, value) {
            (UniformKind::Bool, UniformValue::Bool(b)) => UniformValue::Bool(b),
            (UniformKind::Bool, UniformValue::Int(i)) => UniformValue::Bool(i != 0),
            (UniformKind::Bool, UniformValue::Float(f)) => UniformValue::Bool(f != 0.0),
            (_, UniformValue::Bool(b)) => UniformValue::Int(b as i32),
            (_, other) => other,
        })
    }

    /// Zero value a freshly linked uniform holds, if it is representable.
    pub fn zero(self) -> Option<UniformValue> {
        match self {
            UniformKind::Bool => Some(UniformValue::Bool(false)),
            UniformKind::Int | UniformKind::Sampler => Some(UniformValue::Int(0)),
            UniformKind::Float => Some(UniformValue::Float(0.0)),
            UniformKind::Vec2 => Some(UniformValue::Vec2([0.0; 2])),
            UniformKind::Vec3 => Some(UniformValue::Vec3([0.0; 3])),
            UniformKind::Vec4 => Some(UniformValue::Vec4([0.0; 4])),
            UniformKind::UInt
            | UniformKind::Mat2
            | UniformKind::Mat3
            | UniformKind::Mat4
            | UniformKind::Other => None,
        }
    }
}

/// Primitive assembly mode for a draw call.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum Primitive {
    #[default]
    Triangles,
    Lines,
    Points,
}

/// Graphics state owned as an explicit value.
///
/// The "currently active program" slot lives here rather than in process-wide
/// state, so every operation that reads or changes it takes `&mut self`.
///
/// Contract shared by all implementations:
/// - a failed `compile_stage` / `link_program` leaves no object behind; the
///   error string is the driver diagnostic
/// - uniform writes target the given program, whether or not it is active,
///   and leave the active slot unchanged
/// - operations on unknown handles change nothing
pub trait GraphicsContext {
    type Stage: Copy + fmt::Debug;
    type Program: Copy + Eq + fmt::Debug;
    type Location: Clone + fmt::Debug;
    type VertexArray: Copy + Eq + fmt::Debug;

    fn compile_stage(&mut self, stage: ShaderStage, source: &str) -> Result<Self::Stage, String>;

    fn delete_stage(&mut self, stage: Self::Stage);

    fn link_program(&mut self, stages: &[Self::Stage]) -> Result<Self::Program, String>;

    /// Releases a program. Clears the active slot if it held `program`.
    fn delete_program(&mut self, program: Self::Program);

    fn use_program(&mut self, program: Option<Self::Program>);

    fn active_program(&self) -> Option<Self::Program>;

    /// Resolves an active uniform by name. Inactive or unknown names yield `None`.
    fn uniform_location(&mut self, program: Self::Program, name: &str) -> Option<Self::Location>;

    fn write_uniform(&mut self, program: Self::Program, location: &Self::Location, value: UniformValue);

    fn read_uniform(&mut self, program: Self::Program, location: &Self::Location) -> Option<UniformValue>;

    fn upload_mesh(
        &mut self,
        vertices: &[f32],
        indices: Option<&[u32]>,
        layout: &VertexLayout,
    ) -> Result<Self::VertexArray, String>;

    /// Issues a draw with whatever program is active.
    fn draw(&mut self, vertex_array: Self::VertexArray, primitive: Primitive, count: usize, indexed: bool);

    fn delete_mesh(&mut self, vertex_array: Self::VertexArray);

    fn clear(&mut self, color: Color);

    fn set_viewport(&mut self, width: u32, height: u32);
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── accepts ───────────────────────────────────────────────────────────

    #[test]
    fn int_writes_reach_int_bool_and_sampler() {
        let v = UniformValue::Int(3);
        assert!(UniformKind::Int.accepts(&v));
        assert!(UniformKind::Bool.accepts(&v));
        assert!(UniformKind::Sampler.accepts(&v));
        assert!(!UniformKind::Float.accepts(&v));
        assert!(!UniformKind::UInt.accepts(&v));
    }

    #[test]
    fn float_writes_reach_float_and_bool() {
        let v = UniformValue::Float(0.5);
        assert!(UniformKind::Float.accepts(&v));
        assert!(UniformKind::Bool.accepts(&v));
        assert!(!UniformKind::Int.accepts(&v));
        assert!(!UniformKind::Vec4.accepts(&v));
    }

    #[test]
    fn vector_writes_need_matching_width() {
        assert!(UniformKind::Vec3.accepts(&UniformValue::Vec3([0.0; 3])));
        assert!(!UniformKind::Vec4.accepts(&UniformValue::Vec3([0.0; 3])));
        assert!(!UniformKind::Mat4.accepts(&UniformValue::Vec4([0.0; 4])));
    }

    // ── coerce ────────────────────────────────────────────────────────────

    #[test]
    fn bool_storage_normalizes_non_zero() {
        assert_eq!(UniformKind::Bool.coerce(UniformValue::Int(7)), Some(UniformValue::Bool(true)));
        assert_eq!(UniformKind::Bool.coerce(UniformValue::Float(0.0)), Some(UniformValue::Bool(false)));
    }

    #[test]
    fn bool_written_to_int_is_stored_as_int() {
        assert_eq!(UniformKind::Int.coerce(UniformValue::Bool(true)), Some(UniformValue::Int(1)));
    }

    #[test]
    fn rejected_write_coerces_to_none() {
        assert_eq!(UniformKind::Int.coerce(UniformValue::Float(1.0)), None);
    }

    #[test]
    fn stage_display_is_lowercase() {
        assert_eq!(ShaderStage::Vertex.to_string(), "vertex");
        assert_eq!(ShaderStage::Fragment.to_string(), "fragment");
    }
}
