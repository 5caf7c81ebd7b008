//! Level Capture
//!
//! Walks the placed objects under the level container and produces a
//! [`Descriptor`]. Capture only reads the world (apart from zeroing the
//! container's own transform) and is deterministic: an unchanged world
//! always encodes to the same bytes.

use std::path::Path;

use thiserror::Error;

use crate::descriptor::{
    template_name_from, write_descriptor, CameraSettings, Descriptor, DescriptorError, ItemEntry, Vec3,
};
use crate::scene::{CameraFollowAccessor, VisualAccessor, WorldHost};
use crate::settings::SceneNames;
use crate::storage::LocalStorage;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CaptureError {
    #[error("level container '{name}' not found")]
    MissingRoot { name: String },
    #[error("player object '{name}' not found")]
    MissingPlayer { name: String },
}

/// Captures live arrangements into descriptors
#[derive(Debug, Clone, Default)]
pub struct LevelCapture {
    names: SceneNames,
}

impl LevelCapture {
    pub fn new(names: SceneNames) -> Self {
        Self { names }
    }

    /// Capture the level under the configured container.
    ///
    /// The container's position and rotation are reset first so every item
    /// is measured from the origin.
    pub fn capture_level<W>(&self, world: &mut W) -> Result<Descriptor, CaptureError>
    where
        W: WorldHost + VisualAccessor + CameraFollowAccessor,
    {
        let root = world.find(&self.names.container).ok_or_else(|| CaptureError::MissingRoot {
            name: self.names.container.clone(),
        })?;
        world.set_position(root, Vec3::ZERO);
        world.set_rotation(root, Vec3::ZERO);
        self.capture(world, root)
    }

    /// Capture the direct children of `root`, the player start and the camera rig
    pub fn capture<W>(&self, world: &W, root: W::Handle) -> Result<Descriptor, CaptureError>
    where
        W: WorldHost + VisualAccessor + CameraFollowAccessor,
    {
        let mut items = Vec::new();

        for child in world.children(root) {
            let Some(transform) = world.transform(child) else {
                continue;
            };
            let display_name = world.name(child).unwrap_or_default();
            let template_name = template_name_from(&display_name);
            if template_name.is_empty() {
                log::warn!("Skipping object {:?} with unusable name '{}'", child, display_name);
                continue;
            }

            items.push(ItemEntry {
                template_name: template_name.to_string(),
                position: transform.position,
                rotation: transform.rotation,
                scale: transform.scale,
                visual: world.visual(child),
            });
        }

        let player_start = world
            .find(&self.names.player)
            .and_then(|player| world.transform(player))
            .map(|t| t.position)
            .ok_or_else(|| CaptureError::MissingPlayer {
                name: self.names.player.clone(),
            })?;

        let camera = world.camera_follow().map(|rig| {
            let track_target_name = match rig.target.and_then(|t| world.name(t)) {
                Some(name) => name,
                None => {
                    log::warn!("Camera follow has no target; saving an empty target name");
                    String::new()
                }
            };
            CameraSettings {
                track_target_name,
                z_depth: rig.z_depth,
                min_x: rig.bounds.min_x,
                min_y: rig.bounds.min_y,
                max_x: rig.bounds.max_x,
                max_y: rig.bounds.max_y,
                tracking_speed: rig.tracking_speed,
            }
        });

        log::debug!("Captured {} items", items.len());

        Ok(Descriptor {
            items,
            player_start,
            camera,
        })
    }

    /// Encode `descriptor` and write it to `path`, replacing any previous file.
    ///
    /// Failures are returned as-is; saving is never retried.
    pub fn save(&self, storage: &LocalStorage, descriptor: &Descriptor, path: impl AsRef<Path>) -> Result<(), DescriptorError> {
        let path = path.as_ref();
        match write_descriptor(storage, path, descriptor) {
            Ok(()) => {
                log::info!("Level saved to {}", storage.resolve(path).display());
                Ok(())
            }
            Err(e) => {
                log::error!("Failed to save level to {}: {}", path.display(), e);
                Err(e)
            }
        }
    }
}
