/// Straight-alpha RGBA color, components in `[0, 1]`.
///
/// Used as the clear color; the lessons never blend, so no premultiplication
/// policy is attached to it.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    #[inline]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// The dark teal every lesson clears to.
    #[inline]
    pub const fn slate() -> Self {
        Self::new(0.2, 0.3, 0.3, 1.0)
    }
}
