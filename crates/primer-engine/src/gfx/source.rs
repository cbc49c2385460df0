use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Vertex and fragment source text for one program.
///
/// `ShaderProgram` never touches the filesystem; callers either embed the
/// sources or read them here first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSources {
    pub vertex: String,
    pub fragment: String,
}

impl ShaderSources {
    pub fn new(vertex: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self {
            vertex: vertex.into(),
            fragment: fragment.into(),
        }
    }

    /// Reads both stages from UTF-8 files.
    pub fn load(vertex_path: impl AsRef<Path>, fragment_path: impl AsRef<Path>) -> Result<Self> {
        let vertex_path = vertex_path.as_ref();
        let fragment_path = fragment_path.as_ref();

        let vertex = fs::read_to_string(vertex_path)
            .with_context(|| format!("failed to read vertex shader {}", vertex_path.display()))?;
        let fragment = fs::read_to_string(fragment_path).with_context(|| {
            format!("failed to read fragment shader {}", fragment_path.display())
        })?;

        log::debug!(
            "loaded shader sources {} ({} bytes), {} ({} bytes)",
            vertex_path.display(),
            vertex.len(),
            fragment_path.display(),
            fragment.len()
        );

        Ok(Self { vertex, fragment })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_reports_the_missing_path() {
        let err = ShaderSources::load("/nonexistent/primer.vs", "/nonexistent/primer.fs").unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/primer.vs"));
    }

    #[test]
    fn load_reads_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let vs = dir.path().join("a.vs");
        let fs_path = dir.path().join("a.fs");
        fs::write(&vs, "#version 330 core\nvoid main() {}\n").unwrap();
        fs::write(&fs_path, "#version 330 core\nout vec4 c;\nvoid main() { c = vec4(1.0); }\n").unwrap();

        let sources = ShaderSources::load(&vs, &fs_path).unwrap();
        assert!(sources.vertex.starts_with("#version 330 core"));
        assert!(sources.fragment.contains("out vec4 c;"));
    }
}
