//! ar-export library
//!
//! Converts GLB models to USDZ packages for AR Quick Look, copying the GLB
//! bytes under the `.usdz` name when no USD converter is available.

pub mod converter;
pub mod glb;
pub mod manifest;
pub mod model;
pub mod toolkit;

pub use converter::{ConversionMode, ConversionResult, Converter, Outcome, RunReport};
pub use glb::GlbSummary;
pub use manifest::{load_config, ExportConfig, ExportManifest};
pub use model::ModelName;
pub use toolkit::{Toolkit, ToolkitError};
