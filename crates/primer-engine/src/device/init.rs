/// Initialization parameters for the GL layer.
///
/// Keep this structure small. The lessons all target the same 3.3 core
/// context, so most fields exist for platforms that need a nudge.
#[derive(Debug, Clone)]
pub struct GlInit {
    /// Requested context version as `(major, minor)`.
    pub version: (u8, u8),

    /// Synchronize buffer swaps with the display refresh.
    pub vsync: bool,

    /// Minimum MSAA sample count; `0` accepts any framebuffer config.
    pub samples: u8,
}

impl Default for GlInit {
    fn default() -> Self {
        Self {
            version: (3, 3),
            vsync: true,
            samples: 0,
        }
    }
}
