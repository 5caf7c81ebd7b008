//! Descriptor encoding, decoding and validation
//!
//! Uses RON (Rusty Object Notation) for human-readable level files.
//! Decoding never attempts partial recovery: malformed input is an error.

use std::path::Path;

use thiserror::Error;

use super::{CameraSettings, Descriptor, ItemEntry, Vec3};
use crate::storage::{LocalStorage, StorageError};

/// Validation limits to prevent resource exhaustion from malicious files
pub mod limits {
    /// Maximum number of placed items in a level
    pub const MAX_ITEMS: usize = 4096;
    /// Maximum string length for template, layer and target names
    pub const MAX_STRING_LEN: usize = 256;
    /// Maximum coordinate value (prevents overflow issues)
    pub const MAX_COORD: f32 = 1_000_000.0;
}

/// Error type for descriptor encoding and decoding
#[derive(Debug, Error)]
pub enum DescriptorError {
    #[error("I/O error: {0}")]
    Io(#[from] StorageError),
    #[error("parse error at {line}:{col}: {message}")]
    Parse {
        line: usize,
        col: usize,
        message: String,
    },
    #[error("serialize error: {0}")]
    Serialize(#[from] ron::Error),
    #[error("validation error: {0}")]
    Invalid(String),
}

/// Check if a float is valid (not NaN or Inf)
fn is_valid_float(f: f32) -> bool {
    f.is_finite() && f.abs() <= limits::MAX_COORD
}

fn validate_vec3(v: &Vec3, context: &str) -> Result<(), String> {
    if !is_valid_float(v.x) || !is_valid_float(v.y) || !is_valid_float(v.z) {
        return Err(format!("{}: invalid vector ({}, {}, {})", context, v.x, v.y, v.z));
    }
    Ok(())
}

fn validate_name(name: &str, context: &str) -> Result<(), String> {
    if name.len() > limits::MAX_STRING_LEN {
        return Err(format!("{}: name too long ({} > {})",
            context, name.len(), limits::MAX_STRING_LEN));
    }
    Ok(())
}

fn validate_item(item: &ItemEntry, context: &str) -> Result<(), String> {
    if item.template_name.is_empty() {
        return Err(format!("{}: empty template name", context));
    }
    validate_name(&item.template_name, context)?;
    validate_vec3(&item.position, &format!("{} position", context))?;
    validate_vec3(&item.rotation, &format!("{} rotation", context))?;
    validate_vec3(&item.scale, &format!("{} scale", context))?;

    if let Some(visual) = &item.visual {
        validate_name(&visual.layer, &format!("{} layer", context))?;
        let c = &visual.color;
        if ![c.r, c.g, c.b, c.a].iter().all(|ch| ch.is_finite()) {
            return Err(format!("{}: invalid color", context));
        }
    }
    Ok(())
}

fn validate_camera(camera: &CameraSettings) -> Result<(), String> {
    validate_name(&camera.track_target_name, "camera target")?;
    let fields = [
        camera.z_depth,
        camera.min_x,
        camera.min_y,
        camera.max_x,
        camera.max_y,
        camera.tracking_speed,
    ];
    if !fields.iter().all(|f| is_valid_float(*f)) {
        return Err("camera: invalid settings".to_string());
    }
    Ok(())
}

/// Validate an entire descriptor
pub fn validate_descriptor(descriptor: &Descriptor) -> Result<(), DescriptorError> {
    if descriptor.items.len() > limits::MAX_ITEMS {
        return Err(DescriptorError::Invalid(format!(
            "too many items ({} > {})", descriptor.items.len(), limits::MAX_ITEMS
        )));
    }

    for (i, item) in descriptor.items.iter().enumerate() {
        validate_item(item, &format!("item[{}]", i)).map_err(DescriptorError::Invalid)?;
    }

    validate_vec3(&descriptor.player_start, "player_start").map_err(DescriptorError::Invalid)?;

    if let Some(camera) = &descriptor.camera {
        validate_camera(camera).map_err(DescriptorError::Invalid)?;
    }

    Ok(())
}

/// Encode a descriptor as pretty-printed RON
pub fn encode_string(descriptor: &Descriptor) -> Result<String, DescriptorError> {
    validate_descriptor(descriptor)?;

    let config = ron::ser::PrettyConfig::new()
        .depth_limit(4)
        .indentor("  ".to_string());

    Ok(ron::ser::to_string_pretty(descriptor, config)?)
}

/// Encode a descriptor to bytes
pub fn encode(descriptor: &Descriptor) -> Result<Vec<u8>, DescriptorError> {
    encode_string(descriptor).map(String::into_bytes)
}

/// Decode a descriptor from RON text
pub fn decode_str(contents: &str) -> Result<Descriptor, DescriptorError> {
    let descriptor: Descriptor = match ron::from_str(contents) {
        Ok(d) => d,
        Err(e) => {
            let pos = e.position;
            log::warn!("RON parse error at {}:{}: {}", pos.line, pos.col, e.code);
            let lines: Vec<&str> = contents.lines().collect();
            let line_idx = pos.line.saturating_sub(1);
            if let Some(line) = lines.get(line_idx) {
                log::warn!("  Line {}: {}", pos.line, line.trim_end());
            }
            return Err(DescriptorError::Parse {
                line: pos.line,
                col: pos.col,
                message: e.code.to_string(),
            });
        }
    };

    validate_descriptor(&descriptor)?;
    Ok(descriptor)
}

/// Decode a descriptor from bytes
pub fn decode(bytes: &[u8]) -> Result<Descriptor, DescriptorError> {
    let contents = std::str::from_utf8(bytes).map_err(|e| DescriptorError::Parse {
        line: 0,
        col: 0,
        message: format!("invalid UTF-8: {}", e),
    })?;
    decode_str(contents)
}

/// Read and decode the descriptor stored at `path`
pub fn read_descriptor(storage: &LocalStorage, path: impl AsRef<Path>) -> Result<Descriptor, DescriptorError> {
    let bytes = storage.read(path)?;
    decode(&bytes)
}

/// Encode a descriptor and write it to `path`, replacing any previous file
pub fn write_descriptor(storage: &LocalStorage, path: impl AsRef<Path>, descriptor: &Descriptor) -> Result<(), DescriptorError> {
    let data = encode(descriptor)?;
    storage.write(path, &data)?;
    Ok(())
}
