//! GLB header checks and scene summaries

use anyhow::{bail, Context, Result};
use std::fmt;
use std::path::Path;

/// GLB header size: magic, version, total length
const GLB_HEADER_SIZE: usize = 12;

/// Scene contents of a GLB file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlbSummary {
    pub byte_size: u64,
    pub scenes: usize,
    pub nodes: usize,
    pub meshes: usize,
    pub materials: usize,
    pub animations: usize,
}

impl fmt::Display for GlbSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} bytes, {} scene(s), {} node(s), {} mesh(es), {} material(s), {} animation(s)",
            self.byte_size, self.scenes, self.nodes, self.meshes, self.materials, self.animations
        )
    }
}

/// Read and summarize a GLB file
pub fn probe(path: &Path) -> Result<GlbSummary> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read model: {:?}", path))?;
    summarize(&bytes).with_context(|| format!("Invalid GLB: {:?}", path))
}

/// Summarize GLB bytes already in memory
pub fn summarize(bytes: &[u8]) -> Result<GlbSummary> {
    validate_header(bytes)?;

    let gltf = gltf::Gltf::from_slice(bytes).context("Failed to parse glTF document")?;
    let document = &gltf.document;

    Ok(GlbSummary {
        byte_size: bytes.len() as u64,
        scenes: document.scenes().len(),
        nodes: document.nodes().len(),
        meshes: document.meshes().len(),
        materials: document.materials().len(),
        animations: document.animations().len(),
    })
}

/// Check the 12-byte GLB header:
/// - Magic bytes (glTF)
/// - Container version 2
/// - Declared length not past end of data
fn validate_header(bytes: &[u8]) -> Result<()> {
    if bytes.len() < GLB_HEADER_SIZE {
        bail!("Too small for a GLB header ({} bytes)", bytes.len());
    }

    if &bytes[0..4] != b"glTF" {
        bail!(
            "Bad magic bytes (expected glTF, got {:?})",
            &bytes[0..4]
        );
    }

    let version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    if version != 2 {
        bail!("Unsupported GLB version {} (expected 2)", version);
    }

    let length = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize;
    if length > bytes.len() {
        bail!(
            "Truncated GLB: header declares {} bytes, file has {}",
            length,
            bytes.len()
        );
    }

    Ok(())
}
