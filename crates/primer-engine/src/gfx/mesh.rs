use super::context::{GraphicsContext, Primitive};
use super::error::MeshError;

/// One float attribute inside an interleaved vertex.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct VertexAttribute {
    /// Shader input location (`layout (location = N)`).
    pub location: u32,
    /// Float components, 1 to 4.
    pub components: u8,
    /// Offset from the start of the vertex, in floats.
    pub offset: usize,
}

/// Interleaved float vertex layout.
///
/// Attributes are packed in the order they are added; offsets and stride
/// follow from that order.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct VertexLayout {
    attributes: Vec<VertexAttribute>,
    stride: usize,
}

impl VertexLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an attribute of `components` floats bound to `location`.
    pub fn with(mut self, location: u32, components: u8) -> Self {
        self.attributes.push(VertexAttribute {
            location,
            components,
            offset: self.stride,
        });
        self.stride += components as usize;
        self
    }

    /// Floats per vertex.
    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    #[inline]
    pub fn attributes(&self) -> &[VertexAttribute] {
        &self.attributes
    }

    fn validate(&self) -> Result<(), MeshError> {
        if self.attributes.is_empty() {
            return Err(MeshError::EmptyLayout);
        }
        for (i, a) in self.attributes.iter().enumerate() {
            if !(1..=4).contains(&a.components) {
                return Err(MeshError::InvalidComponents {
                    location: a.location,
                    components: a.components,
                });
            }
            if self.attributes[..i].iter().any(|b| b.location == a.location) {
                return Err(MeshError::DuplicateLocation(a.location));
            }
        }
        Ok(())
    }
}

/// Vertex data (and optional element indices) uploaded to the context.
#[derive(Debug)]
pub struct Mesh<C: GraphicsContext> {
    vertex_array: C::VertexArray,
    primitive: Primitive,
    count: usize,
    indexed: bool,
}

impl<C: GraphicsContext> Mesh<C> {
    /// Validates and uploads `vertices` laid out as `layout`.
    ///
    /// With `indices`, draws go through the element buffer and issue one
    /// vertex per index; without, every vertex is drawn once in order.
    pub fn new(
        ctx: &mut C,
        vertices: &[f32],
        indices: Option<&[u32]>,
        layout: &VertexLayout,
        primitive: Primitive,
    ) -> Result<Self, MeshError> {
        layout.validate()?;

        let stride = layout.stride();
        if vertices.is_empty() {
            return Err(MeshError::Empty);
        }
        if vertices.len() % stride != 0 {
            return Err(MeshError::Misaligned { len: vertices.len(), stride });
        }
        let vertex_count = vertices.len() / stride;

        if let Some(indices) = indices {
            if indices.is_empty() {
                return Err(MeshError::Empty);
            }
            if let Some(&index) = indices.iter().find(|&&i| i as usize >= vertex_count) {
                return Err(MeshError::IndexOutOfRange { index, vertex_count });
            }
        }

        let vertex_array = ctx
            .upload_mesh(vertices, indices, layout)
            .map_err(MeshError::Backend)?;

        let count = indices.map_or(vertex_count, <[u32]>::len);
        log::debug!(
            "uploaded mesh {vertex_array:?}: {vertex_count} vertices, {count} drawn, indexed={}",
            indices.is_some()
        );

        Ok(Self {
            vertex_array,
            primitive,
            count,
            indexed: indices.is_some(),
        })
    }

    /// Draws with the context's active program.
    pub fn draw(&self, ctx: &mut C) {
        ctx.draw(self.vertex_array, self.primitive, self.count, self.indexed);
    }

    /// Vertices issued per draw.
    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_indexed(&self) -> bool {
        self.indexed
    }

    #[inline]
    pub fn vertex_array(&self) -> C::VertexArray {
        self.vertex_array
    }

    pub fn delete(self, ctx: &mut C) {
        ctx.delete_mesh(self.vertex_array);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::SoftContext;

    const SQUARE: [f32; 12] = [
        0.1, -0.4, 0.0, //
        0.1, 0.4, 0.0, //
        0.9, -0.4, 0.0, //
        0.9, 0.4, 0.0,
    ];

    fn position() -> VertexLayout {
        VertexLayout::new().with(0, 3)
    }

    // ── layout ────────────────────────────────────────────────────────────

    #[test]
    fn layout_offsets_follow_insertion_order() {
        let layout = VertexLayout::new().with(0, 3).with(1, 3);
        assert_eq!(layout.stride(), 6);
        assert_eq!(layout.attributes()[0].offset, 0);
        assert_eq!(layout.attributes()[1].offset, 3);
    }

    #[test]
    fn layout_rejects_five_components() {
        let mut ctx = SoftContext::new();
        let err = Mesh::new(&mut ctx, &[0.0; 5], None, &VertexLayout::new().with(0, 5), Primitive::Points)
            .unwrap_err();
        assert_eq!(err, MeshError::InvalidComponents { location: 0, components: 5 });
    }

    #[test]
    fn layout_rejects_duplicate_location() {
        let mut ctx = SoftContext::new();
        let layout = VertexLayout::new().with(0, 3).with(0, 3);
        let err = Mesh::new(&mut ctx, &[0.0; 6], None, &layout, Primitive::Triangles).unwrap_err();
        assert_eq!(err, MeshError::DuplicateLocation(0));
    }

    #[test]
    fn empty_layout_is_rejected() {
        let mut ctx = SoftContext::new();
        let err = Mesh::new(&mut ctx, &[0.0; 3], None, &VertexLayout::new(), Primitive::Triangles)
            .unwrap_err();
        assert_eq!(err, MeshError::EmptyLayout);
    }

    // ── data validation ───────────────────────────────────────────────────

    #[test]
    fn misaligned_vertex_data_is_rejected() {
        let mut ctx = SoftContext::new();
        let err = Mesh::new(&mut ctx, &SQUARE[..10], None, &position(), Primitive::Triangles).unwrap_err();
        assert_eq!(err, MeshError::Misaligned { len: 10, stride: 3 });
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let mut ctx = SoftContext::new();
        let err = Mesh::new(&mut ctx, &SQUARE, Some(&[0, 1, 4]), &position(), Primitive::Triangles)
            .unwrap_err();
        assert_eq!(err, MeshError::IndexOutOfRange { index: 4, vertex_count: 4 });
    }

    #[test]
    fn empty_vertices_are_rejected() {
        let mut ctx = SoftContext::new();
        let err = Mesh::new(&mut ctx, &[], None, &position(), Primitive::Triangles).unwrap_err();
        assert_eq!(err, MeshError::Empty);
    }

    // ── counts ────────────────────────────────────────────────────────────

    #[test]
    fn indexed_mesh_draws_one_vertex_per_index() {
        let mut ctx = SoftContext::new();
        let mesh = Mesh::new(&mut ctx, &SQUARE, Some(&[0, 1, 2, 1, 2, 3]), &position(), Primitive::Triangles)
            .unwrap();
        assert_eq!(mesh.count(), 6);
        assert!(mesh.is_indexed());
    }

    #[test]
    fn plain_mesh_draws_every_vertex() {
        let mut ctx = SoftContext::new();
        let mesh = Mesh::new(&mut ctx, &SQUARE, None, &position(), Primitive::Points).unwrap();
        assert_eq!(mesh.count(), 4);
        assert!(!mesh.is_indexed());
    }

    #[test]
    fn draw_is_recorded_with_mesh_parameters() {
        let mut ctx = SoftContext::new();
        let mesh = Mesh::new(&mut ctx, &SQUARE, Some(&[0, 1, 2]), &position(), Primitive::Lines).unwrap();
        mesh.draw(&mut ctx);

        let call = ctx.draws()[0];
        assert_eq!(call.vertex_array, mesh.vertex_array());
        assert_eq!(call.primitive, Primitive::Lines);
        assert_eq!(call.count, 3);
        assert!(call.indexed);
        assert_eq!(call.program, None);
    }

    #[test]
    fn deleted_mesh_no_longer_draws() {
        let mut ctx = SoftContext::new();
        let mesh = Mesh::new(&mut ctx, &SQUARE, None, &position(), Primitive::Triangles).unwrap();
        let va = mesh.vertex_array();
        mesh.delete(&mut ctx);

        ctx.draw(va, Primitive::Triangles, 4, false);
        assert!(ctx.draws().is_empty());
        assert!(ctx.take_error().is_some());
    }
}
