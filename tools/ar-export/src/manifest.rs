//! ar-export.toml manifest parsing
//!
//! Every field is optional:
//!
//! ```toml
//! models = ["Drum.glb", "Cymbal.glb", "Drum stick.glb", "Note.glb"]
//!
//! [paths]
//! source = "../public/models"
//! output = "../public/ar"
//!
//! [converter]
//! mode = "auto"          # or "copy"
//! tool = "usdzconvert"   # optional: pin a converter program
//! ```
//!
//! Relative paths resolve against the manifest's directory.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::converter::{ConversionMode, Converter};
use crate::model::{self, ModelName};

/// Manifest file looked up in the working directory
pub const DEFAULT_MANIFEST: &str = "ar-export.toml";

/// Default input directory
pub const DEFAULT_SOURCE_DIR: &str = "../public/models";

/// Default output directory
pub const DEFAULT_OUTPUT_DIR: &str = "../public/ar";

/// ar-export.toml manifest structure
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExportManifest {
    /// Model file names inside the source directory
    #[serde(default)]
    pub models: Option<Vec<String>>,
    #[serde(default)]
    pub paths: PathsSection,
    #[serde(default)]
    pub converter: ConverterSection,
}

/// Input and output directories
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathsSection {
    pub source: Option<PathBuf>,
    pub output: Option<PathBuf>,
}

/// Conversion settings
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConverterSection {
    #[serde(default)]
    pub mode: ConversionMode,
    /// Converter program (name on PATH or path to an executable)
    pub tool: Option<String>,
}

/// Fully resolved export configuration
#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub models: Vec<ModelName>,
    pub source_dir: PathBuf,
    pub output_dir: PathBuf,
    pub mode: ConversionMode,
    pub tool: Option<String>,
}

impl ExportConfig {
    pub fn converter(&self) -> Converter {
        Converter::new(self.mode, self.tool.clone())
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            models: model::default_models(),
            source_dir: PathBuf::from(DEFAULT_SOURCE_DIR),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            mode: ConversionMode::Auto,
            tool: None,
        }
    }
}

impl ExportManifest {
    /// Load manifest from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest: {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Resolve against `base_dir` (the manifest's directory) and fill defaults
    pub fn resolve(self, base_dir: &Path) -> Result<ExportConfig> {
        let defaults = ExportConfig::default();

        let models = match self.models {
            Some(names) => names
                .into_iter()
                .map(ModelName::new)
                .collect::<Result<Vec<_>>>()?,
            None => defaults.models,
        };

        let source_dir = base_dir.join(self.paths.source.unwrap_or(defaults.source_dir));
        let output_dir = base_dir.join(self.paths.output.unwrap_or(defaults.output_dir));

        let config = ExportConfig {
            models,
            source_dir,
            output_dir,
            mode: self.converter.mode,
            tool: self.converter.tool,
        };
        validate(&config)?;
        Ok(config)
    }
}

/// Load the manifest at `path`, or the default manifest when `path` is `None`.
///
/// A missing default manifest yields the built-in configuration; an
/// explicitly named manifest must exist.
pub fn load_config(path: Option<&Path>) -> Result<ExportConfig> {
    let (path, explicit) = match path {
        Some(p) => (p.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_MANIFEST), false),
    };

    if !explicit && !path.exists() {
        tracing::debug!("No {} found, using built-in model list", DEFAULT_MANIFEST);
        return Ok(ExportConfig::default());
    }

    let manifest = ExportManifest::load(&path)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
    manifest.resolve(base_dir)
}

/// Validate a resolved configuration
pub fn validate(config: &ExportConfig) -> Result<()> {
    if config.models.is_empty() {
        bail!("Manifest lists no models");
    }

    let mut seen = HashSet::new();
    for name in &config.models {
        if !seen.insert(name.as_str()) {
            bail!("Model {:?} is listed more than once", name.as_str());
        }
    }

    let mut targets = HashSet::new();
    for name in &config.models {
        let target = model::target_file_name(name.as_str());
        if !targets.insert(target.clone()) {
            bail!("Several models would be exported as {:?}", target);
        }
    }

    if let Some(tool) = &config.tool {
        if tool.trim().is_empty() {
            bail!("converter.tool is empty");
        }
    }

    Ok(())
}
