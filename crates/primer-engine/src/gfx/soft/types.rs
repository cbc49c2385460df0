use std::fmt;

use crate::gfx::UniformKind;

/// GLSL type as far as declarations are concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum GlslType {
    Void,
    Bool,
    Int,
    UInt,
    Float,
    Double,
    BVec(u8),
    IVec(u8),
    UVec(u8),
    Vec(u8),
    DVec(u8),
    /// Columns x rows.
    Mat(u8, u8),
    Sampler(String),
    Struct(String),
}

impl GlslType {
    /// Resolves a builtin type name.
    pub(crate) fn builtin(name: &str) -> Option<Self> {
        let ty = match name {
            "void" => GlslType::Void,
            "bool" => GlslType::Bool,
            "int" => GlslType::Int,
            "uint" => GlslType::UInt,
            "float" => GlslType::Float,
            "double" => GlslType::Double,
            _ => return Self::vector_or_matrix(name).or_else(|| Self::sampler(name)),
        };
        Some(ty)
    }

    fn vector_or_matrix(name: &str) -> Option<Self> {
        let dim = |s: &str| match s {
            "2" => Some(2u8),
            "3" => Some(3),
            "4" => Some(4),
            _ => None,
        };

        if let Some(rest) = name.strip_prefix("bvec") {
            return dim(rest).map(GlslType::BVec);
        }
        if let Some(rest) = name.strip_prefix("ivec") {
            return dim(rest).map(GlslType::IVec);
        }
        if let Some(rest) = name.strip_prefix("uvec") {
            return dim(rest).map(GlslType::UVec);
        }
        if let Some(rest) = name.strip_prefix("dvec") {
            return dim(rest).map(GlslType::DVec);
        }
        if let Some(rest) = name.strip_prefix("vec") {
            return dim(rest).map(GlslType::Vec);
        }
        if let Some(rest) = name.strip_prefix("mat") {
            return match rest.split_once('x') {
                Some((c, r)) => Some(GlslType::Mat(dim(c)?, dim(r)?)),
                None => dim(rest).map(|n| GlslType::Mat(n, n)),
            };
        }
        None
    }

    fn sampler(name: &str) -> Option<Self> {
        const SHAPES: [&str; 12] = [
            "1D", "2D", "3D", "Cube", "2DRect", "1DArray", "2DArray", "CubeArray", "Buffer",
            "2DMS", "2DMSArray", "2DShadow",
        ];
        let shape = ["sampler", "isampler", "usampler"]
            .iter()
            .find_map(|prefix| name.strip_prefix(prefix))?;
        let known = SHAPES.contains(&shape)
            || matches!(shape, "1DShadow" | "CubeShadow" | "2DArrayShadow" | "2DRectShadow");
        known.then(|| GlslType::Sampler(name.to_string()))
    }

    /// Kind reported for a uniform of this type.
    pub(crate) fn uniform_kind(&self) -> UniformKind {
        match self {
            GlslType::Bool => UniformKind::Bool,
            GlslType::Int => UniformKind::Int,
            GlslType::UInt => UniformKind::UInt,
            GlslType::Float => UniformKind::Float,
            GlslType::Vec(2) => UniformKind::Vec2,
            GlslType::Vec(3) => UniformKind::Vec3,
            GlslType::Vec(4) => UniformKind::Vec4,
            GlslType::Mat(2, 2) => UniformKind::Mat2,
            GlslType::Mat(3, 3) => UniformKind::Mat3,
            GlslType::Mat(4, 4) => UniformKind::Mat4,
            GlslType::Sampler(_) => UniformKind::Sampler,
            _ => UniformKind::Other,
        }
    }
}

impl fmt::Display for GlslType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GlslType::Void => f.write_str("void"),
            GlslType::Bool => f.write_str("bool"),
            GlslType::Int => f.write_str("int"),
            GlslType::UInt => f.write_str("uint"),
            GlslType::Float => f.write_str("float"),
            GlslType::Double => f.write_str("double"),
            GlslType::BVec(n) => write!(f, "bvec{n}"),
            GlslType::IVec(n) => write!(f, "ivec{n}"),
            GlslType::UVec(n) => write!(f, "uvec{n}"),
            GlslType::Vec(n) => write!(f, "vec{n}"),
            GlslType::DVec(n) => write!(f, "dvec{n}"),
            GlslType::Mat(c, r) if c == r => write!(f, "mat{c}"),
            GlslType::Mat(c, r) => write!(f, "mat{c}x{r}"),
            GlslType::Sampler(name) | GlslType::Struct(name) => f.write_str(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_scalars_and_vectors() {
        assert_eq!(GlslType::builtin("float"), Some(GlslType::Float));
        assert_eq!(GlslType::builtin("vec3"), Some(GlslType::Vec(3)));
        assert_eq!(GlslType::builtin("ivec2"), Some(GlslType::IVec(2)));
    }

    #[test]
    fn resolves_matrices() {
        assert_eq!(GlslType::builtin("mat4"), Some(GlslType::Mat(4, 4)));
        assert_eq!(GlslType::builtin("mat2x3"), Some(GlslType::Mat(2, 3)));
        assert_eq!(GlslType::builtin("mat5"), None);
    }

    #[test]
    fn resolves_samplers() {
        assert_eq!(GlslType::builtin("sampler2D").map(|t| t.uniform_kind()), Some(UniformKind::Sampler));
        assert_eq!(GlslType::builtin("usamplerCube").map(|t| t.uniform_kind()), Some(UniformKind::Sampler));
        assert_eq!(GlslType::builtin("sampler9D"), None);
    }

    #[test]
    fn rejects_unknown_names() {
        assert_eq!(GlslType::builtin("vec5"), None);
        assert_eq!(GlslType::builtin("color"), None);
    }

    #[test]
    fn display_round_trips_builtin_names() {
        for name in ["vec4", "mat3", "mat2x4", "uint", "sampler2D"] {
            assert_eq!(GlslType::builtin(name).unwrap().to_string(), name);
        }
    }
}
