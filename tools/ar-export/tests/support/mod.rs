//! Test asset generation helpers

use std::path::Path;

/// Assemble a JSON-only GLB around a glTF document
pub fn assemble_glb(document: &serde_json::Value) -> Vec<u8> {
    let json_string = serde_json::to_string(document).expect("Failed to serialize JSON");
    let json_bytes = json_string.as_bytes();

    // Pad JSON to 4-byte alignment
    let json_padding = (4 - (json_bytes.len() % 4)) % 4;
    let json_chunk_length = json_bytes.len() + json_padding;
    let total_length = 12 + 8 + json_chunk_length;

    let mut glb = Vec::with_capacity(total_length);

    // Header
    glb.extend_from_slice(b"glTF"); // magic
    glb.extend_from_slice(&2u32.to_le_bytes()); // version
    glb.extend_from_slice(&(total_length as u32).to_le_bytes()); // length

    // JSON chunk
    glb.extend_from_slice(&(json_chunk_length as u32).to_le_bytes());
    glb.extend_from_slice(&0x4E4F534Au32.to_le_bytes()); // chunk type "JSON"
    glb.extend_from_slice(json_bytes);
    glb.extend(std::iter::repeat_n(0x20u8, json_padding)); // pad with spaces

    glb
}

/// Write a GLB holding a single named node
pub fn write_named_glb(path: &Path, node_name: &str) -> std::io::Result<()> {
    let document = serde_json::json!({
        "asset": { "version": "2.0", "generator": "ar-export tests" },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [{ "name": node_name }],
    });
    std::fs::write(path, assemble_glb(&document))
}
