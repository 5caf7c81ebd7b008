//! Level Loader
//!
//! Rebuilds a live arrangement from a descriptor:
//! 1. Decode the descriptor (a parse failure aborts before the world is touched)
//! 2. Replace the level container with a fresh, empty one
//! 3. Instantiate every item whose template resolves; unresolved ones are
//!    recorded in the [`LoadReport`] and skipped
//! 4. Move the player to the start position (fatal if there is no player)
//! 5. Move the view anchor onto the player, keeping its depth
//! 6. Push camera-follow settings, if the level has any and the world has a rig
//!
//! Loading is not transactional: a fatal error in step 4 leaves the items of
//! step 3 in place.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::descriptor::{read_descriptor, CameraSettings, Descriptor, DescriptorError, Vec3};
use crate::scene::{CameraFollowAccessor, ClampRect, ContentResolver, VisualAccessor, WorldHost};
use crate::settings::SceneNames;
use crate::storage::LocalStorage;

/// A non-fatal problem found while loading
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoadIssue {
    #[error("template '{template_name}' could not be resolved")]
    MissingAsset { template_name: String },
    #[error("camera target '{target_name}' not found")]
    MissingTarget { target_name: String },
}

/// Outcome of a load that got past decoding
#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport<H> {
    /// Descriptor file the level came from, if it was read from storage
    pub path: Option<PathBuf>,
    /// The freshly created level container
    pub container: Option<H>,
    /// Instantiated objects, in descriptor order
    pub instantiated: Vec<H>,
    pub issues: Vec<LoadIssue>,
}

impl<H> LoadReport<H> {
    fn new() -> Self {
        Self {
            path: None,
            container: None,
            instantiated: Vec::new(),
            issues: Vec::new(),
        }
    }

    /// True when every item and the camera target were resolved
    pub fn is_faithful(&self) -> bool {
        self.issues.is_empty()
    }

    /// Template names that could not be resolved
    pub fn missing_assets(&self) -> impl Iterator<Item = &str> {
        self.issues.iter().filter_map(|issue| match issue {
            LoadIssue::MissingAsset { template_name } => Some(template_name.as_str()),
            _ => None,
        })
    }
}

#[derive(Debug, Error)]
pub enum LoadError<H: std::fmt::Debug> {
    #[error("failed to read level: {0}")]
    Descriptor(#[from] DescriptorError),
    /// Items instantiated before the failure stay in the world; `report` lists them
    #[error("player object '{name}' not found")]
    MissingPlayerTarget { name: String, report: LoadReport<H> },
}

/// Rebuilds levels into a world host
#[derive(Debug, Clone, Default)]
pub struct LevelLoader {
    names: SceneNames,
}

impl LevelLoader {
    pub fn new(names: SceneNames) -> Self {
        Self { names }
    }

    /// Read, decode and rebuild the level stored at `path`
    pub fn load<W, R>(
        &self,
        storage: &LocalStorage,
        path: impl AsRef<Path>,
        resolver: &R,
        world: &mut W,
    ) -> Result<LoadReport<W::Handle>, LoadError<W::Handle>>
    where
        W: WorldHost + VisualAccessor + CameraFollowAccessor,
        R: ContentResolver<W> + ?Sized,
    {
        let path = path.as_ref();
        let descriptor = read_descriptor(storage, path).map_err(|e| {
            log::error!("Failed to load level {}: {}", path.display(), e);
            e
        })?;

        let mut result = self.apply(&descriptor, resolver, world);
        match &mut result {
            Ok(report) | Err(LoadError::MissingPlayerTarget { report, .. }) => {
                report.path = Some(path.to_path_buf());
            }
            Err(LoadError::Descriptor(_)) => {}
        }
        if let Ok(report) = &result {
            log::info!(
                "Loaded {} ({} items, {} issues)",
                path.display(),
                report.instantiated.len(),
                report.issues.len()
            );
        }
        result
    }

    /// Rebuild an already decoded descriptor
    pub fn apply<W, R>(
        &self,
        descriptor: &Descriptor,
        resolver: &R,
        world: &mut W,
    ) -> Result<LoadReport<W::Handle>, LoadError<W::Handle>>
    where
        W: WorldHost + VisualAccessor + CameraFollowAccessor,
        R: ContentResolver<W> + ?Sized,
    {
        let mut report = LoadReport::new();

        if let Some(previous) = world.find(&self.names.container) {
            world.destroy(previous);
        }
        let container = world.create_root(&self.names.container);
        report.container = Some(container);

        for item in &descriptor.items {
            let Some(template) = resolver.resolve(&item.template_name) else {
                log::warn!("Missing template '{}', skipping item", item.template_name);
                report.issues.push(LoadIssue::MissingAsset {
                    template_name: item.template_name.clone(),
                });
                continue;
            };

            let object = world.instantiate(&template, container, item.position, item.rotation);
            world.set_scale(object, item.scale);

            if let Some(visual) = &item.visual {
                if !world.set_visual(object, visual) {
                    log::debug!("'{}' has no sprite; visual attributes ignored", item.template_name);
                }
            }
            report.instantiated.push(object);
        }

        let Some(player) = world.find(&self.names.player) else {
            log::error!("Player '{}' not found; level left partially loaded", self.names.player);
            return Err(LoadError::MissingPlayerTarget {
                name: self.names.player.clone(),
                report,
            });
        };
        world.set_position(player, descriptor.player_start);
        let player_pos = world
            .transform(player)
            .map(|t| t.position)
            .unwrap_or(descriptor.player_start);

        match world.find(&self.names.view_anchor) {
            Some(anchor) => {
                let depth = world.transform(anchor).map(|t| t.position.z).unwrap_or(0.0);
                world.set_position(anchor, Vec3::new(player_pos.x, player_pos.y, depth));
            }
            None => log::debug!("No view anchor '{}'", self.names.view_anchor),
        }

        if let Some(camera) = &descriptor.camera {
            self.apply_camera(camera, world, &mut report);
        }

        Ok(report)
    }

    fn apply_camera<W>(&self, camera: &CameraSettings, world: &mut W, report: &mut LoadReport<W::Handle>)
    where
        W: WorldHost + CameraFollowAccessor,
    {
        let Some(mut rig) = world.camera_follow() else {
            log::debug!("Level has camera settings but the world has no camera follow");
            return;
        };

        rig.z_depth = camera.z_depth;
        rig.bounds = ClampRect {
            min_x: camera.min_x,
            min_y: camera.min_y,
            max_x: camera.max_x,
            max_y: camera.max_y,
        };
        rig.tracking_speed = camera.tracking_speed;

        // An empty name means the level was saved without a target; keep the current one
        if !camera.track_target_name.is_empty() {
            match world.find(&camera.track_target_name) {
                Some(target) => rig.target = Some(target),
                None => {
                    log::warn!("Camera target '{}' not found", camera.track_target_name);
                    report.issues.push(LoadIssue::MissingTarget {
                        target_name: camera.track_target_name.clone(),
                    });
                }
            }
        }

        world.set_camera_follow(rig);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{write_descriptor, ItemEntry, Rgba, Visual};
    use crate::scene::{Entity, FollowRig, SceneWorld, Template, TemplateLibrary};

    /// Play-mode world: player, main camera at depth -10 and a camera rig
    fn play_world() -> (SceneWorld, Entity) {
        let mut world = SceneWorld::new();
        let player = world.spawn("SoyBoy", Vec3::new(9.0, 9.0, 0.0));
        world.spawn("Main Camera", Vec3::new(0.0, 0.0, -10.0));
        let decoy = world.spawn("Decoy", Vec3::ZERO);
        world.set_camera_rig(Some(FollowRig {
            target: Some(decoy),
            z_depth: -1.0,
            bounds: ClampRect::default(),
            tracking_speed: 1.0,
        }));
        (world, player)
    }

    fn library() -> TemplateLibrary {
        let mut lib = TemplateLibrary::new();
        lib.register(Template::new("Crate"));
        lib.register(Template::new("Saw").with_visual(Visual {
            layer: "Default".to_string(),
            order: 0,
            color: Rgba::WHITE,
        }));
        lib
    }

    fn crate_level() -> Descriptor {
        let mut d = Descriptor::new(Vec3::ZERO);
        d.items.push(ItemEntry::at("Crate", Vec3::new(1.0, 2.0, 0.0)));
        d
    }

    #[test]
    fn test_single_crate_level() {
        let (mut world, player) = play_world();
        let report = LevelLoader::default().apply(&crate_level(), &library(), &mut world).unwrap();

        assert!(report.is_faithful());
        assert_eq!(report.instantiated.len(), 1);
        let obj = report.instantiated[0];
        assert_eq!(world.name(obj).as_deref(), Some("Crate"));
        assert_eq!(world.position(obj), Some(Vec3::new(1.0, 2.0, 0.0)));
        assert_eq!(world.parent(obj), report.container);
        assert_eq!(world.position(player), Some(Vec3::ZERO));
    }

    #[test]
    fn test_unresolvable_template_is_skipped() {
        let (mut world, _) = play_world();
        let mut d = crate_level();
        d.items.push(ItemEntry::at("Ghost", Vec3::new(3.0, 0.0, 0.0)));

        let report = LevelLoader::default().apply(&d, &library(), &mut world).unwrap();

        assert_eq!(report.instantiated.len(), 1);
        assert_eq!(world.name(report.instantiated[0]).as_deref(), Some("Crate"));
        assert_eq!(
            report.issues,
            vec![LoadIssue::MissingAsset { template_name: "Ghost".to_string() }]
        );
        assert_eq!(report.missing_assets().collect::<Vec<_>>(), vec!["Ghost"]);
        assert!(!report.is_faithful());
    }

    #[test]
    fn test_transform_and_visual_applied() {
        let (mut world, _) = play_world();
        let tint = Visual {
            layer: "Hazards".to_string(),
            order: 7,
            color: Rgba::new(1.0, 0.0, 0.0, 0.5),
        };
        let mut d = Descriptor::new(Vec3::ZERO);
        d.items.push(
            ItemEntry {
                rotation: Vec3::new(0.0, 0.0, 30.0),
                scale: Vec3::new(3.0, 1.0, 1.0),
                ..ItemEntry::at("Saw", Vec3::new(2.0, 0.0, 0.0))
            }
            .with_visual(tint.clone()),
        );
        // Crate template has no sprite, so its visual attributes are ignored
        d.items.push(ItemEntry::at("Crate", Vec3::ZERO).with_visual(tint.clone()));

        let report = LevelLoader::default().apply(&d, &library(), &mut world).unwrap();
        let saw = report.instantiated[0];
        let t = world.transform(saw).unwrap();
        assert_eq!(t.rotation, Vec3::new(0.0, 0.0, 30.0));
        assert_eq!(t.scale, Vec3::new(3.0, 1.0, 1.0));
        assert_eq!(world.visual(saw), Some(tint));
        assert_eq!(world.visual(report.instantiated[1]), None);
        assert!(report.is_faithful());
    }

    #[test]
    fn test_reload_replaces_previous_container() {
        let (mut world, _) = play_world();
        let loader = LevelLoader::default();
        let first = loader.apply(&crate_level(), &library(), &mut world).unwrap();
        let second = loader.apply(&crate_level(), &library(), &mut world).unwrap();

        assert!(!world.is_alive(first.container.unwrap()));
        assert!(!world.is_alive(first.instantiated[0]));
        let container = second.container.unwrap();
        assert_eq!(world.children(container).len(), 1);
        assert_eq!(world.find("Level"), Some(container));
    }

    #[test]
    fn test_missing_player_keeps_instantiated_items() {
        let mut world = SceneWorld::new();
        let result = LevelLoader::default().apply(&crate_level(), &library(), &mut world);

        match result {
            Err(LoadError::MissingPlayerTarget { name, report }) => {
                assert_eq!(name, "SoyBoy");
                assert_eq!(report.instantiated.len(), 1);
                assert!(world.is_alive(report.instantiated[0]));
            }
            other => panic!("expected MissingPlayerTarget, got {:?}", other),
        }
    }

    #[test]
    fn test_view_anchor_follows_player_keeping_depth() {
        let (mut world, _) = play_world();
        let d = Descriptor::new(Vec3::new(4.0, 5.0, 0.0));
        LevelLoader::default().apply(&d, &library(), &mut world).unwrap();

        let anchor = world.find("Main Camera").unwrap();
        assert_eq!(world.position(anchor), Some(Vec3::new(4.0, 5.0, -10.0)));
    }

    #[test]
    fn test_camera_settings_pushed_to_rig() {
        let (mut world, player) = play_world();
        let mut d = crate_level();
        d.camera = Some(CameraSettings {
            track_target_name: "SoyBoy".to_string(),
            z_depth: -10.0,
            min_x: 0.0,
            min_y: 1.0,
            max_x: 20.0,
            max_y: 6.0,
            tracking_speed: 4.0,
        });

        let report = LevelLoader::default().apply(&d, &library(), &mut world).unwrap();
        assert!(report.is_faithful());

        let rig = world.camera_follow().unwrap();
        assert_eq!(rig.target, Some(player));
        assert_eq!(rig.z_depth, -10.0);
        assert_eq!(rig.bounds, ClampRect { min_x: 0.0, min_y: 1.0, max_x: 20.0, max_y: 6.0 });
        assert_eq!(rig.tracking_speed, 4.0);
    }

    #[test]
    fn test_unresolved_camera_target_keeps_previous_target() {
        let (mut world, _) = play_world();
        let decoy = world.find("Decoy").unwrap();
        let mut d = crate_level();
        d.camera = Some(CameraSettings {
            track_target_name: "Nobody".to_string(),
            z_depth: -12.0,
            min_x: 0.0,
            min_y: 0.0,
            max_x: 1.0,
            max_y: 1.0,
            tracking_speed: 2.0,
        });

        let report = LevelLoader::default().apply(&d, &library(), &mut world).unwrap();
        assert_eq!(
            report.issues,
            vec![LoadIssue::MissingTarget { target_name: "Nobody".to_string() }]
        );

        let rig = world.camera_follow().unwrap();
        assert_eq!(rig.target, Some(decoy));
        assert_eq!(rig.z_depth, -12.0);
        assert_eq!(rig.tracking_speed, 2.0);
    }

    #[test]
    fn test_camera_settings_ignored_without_rig() {
        let (mut world, _) = play_world();
        world.set_camera_rig(None);
        let mut d = crate_level();
        d.camera = Some(CameraSettings {
            track_target_name: "SoyBoy".to_string(),
            z_depth: -10.0,
            min_x: 0.0,
            min_y: 0.0,
            max_x: 1.0,
            max_y: 1.0,
            tracking_speed: 1.0,
        });
        let report = LevelLoader::default().apply(&d, &library(), &mut world).unwrap();
        assert!(report.is_faithful());
        assert!(world.camera_follow().is_none());
    }

    #[test]
    fn test_load_from_storage_records_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let storage = LocalStorage::with_base_dir(dir.path());
        write_descriptor(&storage, "Level1.ron", &crate_level()).unwrap();

        let (mut world, _) = play_world();
        let report = LevelLoader::default()
            .load(&storage, "Level1.ron", &library(), &mut world)
            .unwrap();
        assert_eq!(report.path, Some(PathBuf::from("Level1.ron")));
        assert_eq!(report.instantiated.len(), 1);
    }

    #[test]
    fn test_parse_error_leaves_world_untouched() {
        let dir = tempfile::TempDir::new().unwrap();
        let storage = LocalStorage::with_base_dir(dir.path());
        storage.write("Broken.ron", b"(items: [ oops").unwrap();

        let (mut world, _) = play_world();
        let loader = LevelLoader::default();
        let previous = loader.apply(&crate_level(), &library(), &mut world).unwrap();
        let count = world.entity_count();

        let result = loader.load(&storage, "Broken.ron", &library(), &mut world);
        assert!(matches!(result, Err(LoadError::Descriptor(DescriptorError::Parse { .. }))));
        assert_eq!(world.entity_count(), count);
        assert!(world.is_alive(previous.instantiated[0]));
    }
}
