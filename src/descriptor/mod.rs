//! Level Descriptor
//!
//! The portable representation of one authored level:
//! - Placed items (template name + transform + optional sprite attributes)
//! - Where the player starts
//! - Optional camera-follow configuration
//!
//! Descriptors are written as RON so that a level file stays readable and
//! diffable. Fields are named, so optional sections may simply be absent.

mod io;

pub use io::*;

use serde::{Deserialize, Serialize};

/// Three-component float vector used for positions, Euler rotations and scales.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };
    pub const ONE: Vec3 = Vec3 { x: 1.0, y: 1.0, z: 1.0 };

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Component-wise comparison within `epsilon`
    pub fn approx_eq(&self, other: &Vec3, epsilon: f32) -> bool {
        (self.x - other.x).abs() <= epsilon
            && (self.y - other.y).abs() <= epsilon
            && (self.z - other.z).abs() <= epsilon
    }
}

/// Linear RGBA color, each channel in 0..=1
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const WHITE: Rgba = Rgba { r: 1.0, g: 1.0, b: 1.0, a: 1.0 };

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }
}

impl Default for Rgba {
    fn default() -> Self {
        Self::WHITE
    }
}

/// Sprite attributes of a placed item (sorting layer, order within layer, tint)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visual {
    pub layer: String,
    pub order: i32,
    pub color: Rgba,
}

/// One placed object in a level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemEntry {
    /// Template to instantiate; never empty
    pub template_name: String,
    pub position: Vec3,
    /// Euler angles in degrees
    pub rotation: Vec3,
    pub scale: Vec3,
    /// Only present when the source object carried a sprite
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visual: Option<Visual>,
}

impl ItemEntry {
    /// Item at a position with identity rotation and unit scale
    pub fn at(template_name: impl Into<String>, position: Vec3) -> Self {
        Self {
            template_name: template_name.into(),
            position,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
            visual: None,
        }
    }

    pub fn with_visual(mut self, visual: Visual) -> Self {
        self.visual = Some(visual);
        self
    }
}

/// Camera-follow configuration captured alongside the level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraSettings {
    /// Name of the object the camera tracks (empty if the rig had no target)
    pub track_target_name: String,
    pub z_depth: f32,
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
    pub tracking_speed: f32,
}

/// A complete level
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Descriptor {
    /// Placed items, in capture traversal order
    #[serde(default)]
    pub items: Vec<ItemEntry>,
    pub player_start: Vec3,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera: Option<CameraSettings>,
}

impl Descriptor {
    /// Empty level with the player at `player_start`
    pub fn new(player_start: Vec3) -> Self {
        Self {
            items: Vec::new(),
            player_start,
            camera: None,
        }
    }
}

/// Derive a template name from an object's display name.
///
/// Editor duplicates are named like `"Crate (3)"`, so everything from the
/// first space on is dropped.
pub fn template_name_from(display_name: &str) -> &str {
    match display_name.find(' ') {
        Some(idx) => &display_name[..idx],
        None => display_name,
    }
}
