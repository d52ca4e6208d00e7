//! Model names and the source/destination paths derived from them

use anyhow::{bail, Result};
use std::fmt;
use std::path::{Path, PathBuf};

/// Extension of input models
pub const SOURCE_EXT: &str = "glb";

/// Extension of exported AR packages
pub const TARGET_EXT: &str = "usdz";

/// Models exported when no manifest lists any
pub const DEFAULT_MODELS: [&str; 4] = ["Drum.glb", "Cymbal.glb", "Drum stick.glb", "Note.glb"];

/// Basename of a model file inside the source directory (e.g. `Drum stick.glb`)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelName(String);

impl ModelName {
    /// Create a model name, rejecting anything that is not a plain file name
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            bail!("Model name is empty");
        }
        if name == "." || name == ".." {
            bail!("Model name {:?} is not a file name", name);
        }
        if name.contains('/') || name.contains('\\') {
            bail!("Model name {:?} must not contain path separators", name);
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path of the input model inside `source_dir`
    pub fn source_path(&self, source_dir: &Path) -> PathBuf {
        source_dir.join(&self.0)
    }

    /// Path of the exported package inside `dest_dir`
    pub fn dest_path(&self, dest_dir: &Path) -> PathBuf {
        dest_dir.join(target_file_name(&self.0))
    }
}

impl fmt::Display for ModelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Substitute the `.glb` extension with `.usdz`.
///
/// Names without a `.glb` extension keep their full name and gain `.usdz`,
/// so `scene.gltf` becomes `scene.gltf.usdz` rather than colliding with a
/// `scene.glb` sibling.
pub fn target_file_name(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && ext.eq_ignore_ascii_case(SOURCE_EXT) => {
            format!("{}.{}", stem, TARGET_EXT)
        }
        _ => format!("{}.{}", name, TARGET_EXT),
    }
}

/// Default output path for a single input file
pub fn default_output_for(input: &Path) -> PathBuf {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    input.with_file_name(target_file_name(&name))
}

/// The built-in model list
pub fn default_models() -> Vec<ModelName> {
    DEFAULT_MODELS
        .iter()
        .map(|name| ModelName(name.to_string()))
        .collect()
}
