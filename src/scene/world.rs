//! In-memory scene world
//!
//! A minimal object hierarchy that implements the collaborator traits:
//! - Generational entity handles
//! - Sparse storages for names, transforms, sprites and hierarchy links
//! - An optional camera-follow rig
//!
//! Transforms are stored flat in world space; parenting only affects
//! traversal and destruction.

use super::component::ComponentStorage;
use super::entity::{Entity, EntityAllocator};
use super::library::Template;
use super::{CameraFollowAccessor, FollowRig, Transform, VisualAccessor, WorldHost};
use crate::descriptor::{Vec3, Visual};

/// The scene world containing all objects and their components.
#[derive(Debug, Default)]
pub struct SceneWorld {
    entities: EntityAllocator,

    /// Top-level objects in creation order
    roots: Vec<Entity>,

    pub names: ComponentStorage<String>,
    pub transforms: ComponentStorage<Transform>,
    pub visuals: ComponentStorage<Visual>,
    parents: ComponentStorage<Entity>,
    children: ComponentStorage<Vec<Entity>>,

    camera_rig: Option<FollowRig<Entity>>,
}

impl SceneWorld {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Entity Management
    // =========================================================================

    /// Spawn a named top-level object at a position.
    pub fn spawn(&mut self, name: &str, position: Vec3) -> Entity {
        let entity = self.entities.allocate();
        self.names.insert(entity, name.to_string());
        self.transforms.insert(entity, Transform::from_position(position));
        self.roots.push(entity);
        entity
    }

    /// Spawn a named object as the last child of `parent`.
    pub fn spawn_child(&mut self, parent: Entity, name: &str, transform: Transform) -> Entity {
        let entity = self.spawn(name, transform.position);
        self.transforms.insert(entity, transform);
        self.set_parent(entity, parent);
        entity
    }

    /// Immediately destroy an object, its components and its subtree.
    pub fn despawn(&mut self, entity: Entity) {
        if !self.entities.free(entity) {
            return; // Already dead
        }

        let idx = entity.index();

        if let Some(parent) = self.parents.remove(entity) {
            if let Some(siblings) = self.children.get_mut(parent) {
                siblings.retain(|&e| e != entity);
            }
        } else {
            self.roots.retain(|&e| e != entity);
        }

        if let Some(child_list) = self.children.remove(entity) {
            for child in child_list {
                self.despawn(child);
            }
        }

        self.names.clear_slot(idx);
        self.transforms.clear_slot(idx);
        self.visuals.clear_slot(idx);

        if let Some(rig) = &mut self.camera_rig {
            if rig.target == Some(entity) {
                rig.target = None;
            }
        }
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.entities.is_alive(entity)
    }

    pub fn entity_count(&self) -> u32 {
        self.entities.alive_count()
    }

    // =========================================================================
    // Hierarchy Helpers
    // =========================================================================

    /// Set an entity's parent, updating both parent and children components.
    pub fn set_parent(&mut self, child: Entity, parent: Entity) {
        if let Some(old_parent) = self.parents.get(child).copied() {
            if let Some(siblings) = self.children.get_mut(old_parent) {
                siblings.retain(|&e| e != child);
            }
        } else {
            self.roots.retain(|&e| e != child);
        }

        self.parents.insert(child, parent);

        if let Some(children) = self.children.get_mut(parent) {
            children.push(child);
        } else {
            self.children.insert(parent, vec![child]);
        }
    }

    pub fn get_children(&self, entity: Entity) -> &[Entity] {
        self.children.get(entity).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn parent(&self, entity: Entity) -> Option<Entity> {
        self.parents.get(entity).copied()
    }

    pub fn position(&self, entity: Entity) -> Option<Vec3> {
        self.transforms.get(entity).map(|t| t.position)
    }

    // =========================================================================
    // Camera Rig
    // =========================================================================

    /// Install or remove the camera-follow rig
    pub fn set_camera_rig(&mut self, rig: Option<FollowRig<Entity>>) {
        self.camera_rig = rig;
    }

    pub fn camera_rig(&self) -> Option<&FollowRig<Entity>> {
        self.camera_rig.as_ref()
    }

    /// Depth-first, pre-order search from the roots
    fn find_in(&self, entities: &[Entity], name: &str) -> Option<Entity> {
        for &entity in entities {
            if self.names.get(entity).map(|n| n == name).unwrap_or(false) {
                return Some(entity);
            }
            if let Some(found) = self.find_in(self.get_children(entity), name) {
                return Some(found);
            }
        }
        None
    }

    /// Name for a new instance of `template` under `parent`: the bare template
    /// name first, then `"Name (n)"` with `n` one past the largest suffix in use
    fn instance_name(&self, template: &str, parent: Entity) -> String {
        let taken = self
            .get_children(parent)
            .iter()
            .filter_map(|&e| self.names.get(e))
            .filter_map(|n| {
                if n == template {
                    return Some(0);
                }
                n.strip_prefix(template)?
                    .strip_prefix(" (")?
                    .strip_suffix(')')?
                    .parse::<u32>()
                    .ok()
            })
            .max();
        match taken {
            None => template.to_string(),
            Some(n) => format!("{} ({})", template, n + 1),
        }
    }
}

impl WorldHost for SceneWorld {
    type Handle = Entity;
    type Template = Template;

    fn find(&self, name: &str) -> Option<Entity> {
        self.find_in(&self.roots, name)
    }

    fn children(&self, container: Entity) -> Vec<Entity> {
        self.get_children(container).to_vec()
    }

    fn name(&self, object: Entity) -> Option<String> {
        if !self.is_alive(object) {
            return None;
        }
        self.names.get(object).cloned()
    }

    fn transform(&self, object: Entity) -> Option<Transform> {
        if !self.is_alive(object) {
            return None;
        }
        self.transforms.get(object).copied()
    }

    fn create_root(&mut self, name: &str) -> Entity {
        self.spawn(name, Vec3::ZERO)
    }

    fn instantiate(&mut self, template: &Template, parent: Entity, position: Vec3, rotation: Vec3) -> Entity {
        let name = self.instance_name(&template.name, parent);
        let entity = self.spawn_child(
            parent,
            &name,
            Transform {
                position,
                rotation,
                scale: Vec3::ONE,
            },
        );
        if let Some(visual) = &template.visual {
            self.visuals.insert(entity, visual.clone());
        }
        entity
    }

    fn destroy(&mut self, object: Entity) {
        self.despawn(object);
    }

    fn set_position(&mut self, object: Entity, position: Vec3) {
        if let Some(t) = self.transforms.get_mut(object) {
            t.position = position;
        }
    }

    fn set_rotation(&mut self, object: Entity, rotation: Vec3) {
        if let Some(t) = self.transforms.get_mut(object) {
            t.rotation = rotation;
        }
    }

    fn set_scale(&mut self, object: Entity, scale: Vec3) {
        if let Some(t) = self.transforms.get_mut(object) {
            t.scale = scale;
        }
    }
}

impl VisualAccessor for SceneWorld {
    fn visual(&self, object: Entity) -> Option<Visual> {
        if !self.is_alive(object) {
            return None;
        }
        self.visuals.get(object).cloned()
    }

    fn set_visual(&mut self, object: Entity, visual: &Visual) -> bool {
        match self.visuals.get_mut(object) {
            Some(slot) => {
                *slot = visual.clone();
                true
            }
            None => false,
        }
    }
}

impl CameraFollowAccessor for SceneWorld {
    fn camera_follow(&self) -> Option<FollowRig<Entity>> {
        self.camera_rig
    }

    fn set_camera_follow(&mut self, rig: FollowRig<Entity>) -> bool {
        match &mut self.camera_rig {
            Some(slot) => {
                *slot = rig;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::Rgba;

    fn crate_template() -> Template {
        Template::new("Crate")
    }

    #[test]
    fn test_spawn_and_despawn_subtree() {
        let mut world = SceneWorld::new();

        let parent = world.create_root("Level");
        let child1 = world.spawn_child(parent, "Crate", Transform::IDENTITY);
        let child2 = world.spawn_child(parent, "Saw", Transform::IDENTITY);
        assert_eq!(world.entity_count(), 3);

        world.destroy(parent);
        assert_eq!(world.entity_count(), 0);
        assert!(!world.is_alive(child1));
        assert!(!world.is_alive(child2));
        assert_eq!(world.find("Level"), None);
    }

    #[test]
    fn test_children_keep_insertion_order() {
        let mut world = SceneWorld::new();
        let root = world.create_root("Level");
        let a = world.spawn_child(root, "B", Transform::IDENTITY);
        let b = world.spawn_child(root, "A", Transform::IDENTITY);
        assert_eq!(world.children(root), vec![a, b]);
    }

    #[test]
    fn test_find_searches_nested_objects() {
        let mut world = SceneWorld::new();
        let root = world.create_root("Level");
        let nested = world.spawn_child(root, "Goal", Transform::IDENTITY);
        assert_eq!(world.find("Goal"), Some(nested));
        assert_eq!(world.find("Missing"), None);
    }

    #[test]
    fn test_instance_names_follow_duplicate_convention() {
        let mut world = SceneWorld::new();
        let root = world.create_root("Level");
        let t = crate_template();
        let a = world.instantiate(&t, root, Vec3::ZERO, Vec3::ZERO);
        let b = world.instantiate(&t, root, Vec3::ZERO, Vec3::ZERO);
        let c = world.instantiate(&t, root, Vec3::ZERO, Vec3::ZERO);
        assert_eq!(world.name(a).as_deref(), Some("Crate"));
        assert_eq!(world.name(b).as_deref(), Some("Crate (1)"));
        assert_eq!(world.name(c).as_deref(), Some("Crate (2)"));
    }

    #[test]
    fn test_instance_names_skip_past_destroyed_duplicates() {
        let mut world = SceneWorld::new();
        let level = world.create_root("Level");
        let crates: Vec<Entity> = (0..3)
            .map(|_| world.instantiate(&crate_template(), level, Vec3::ZERO, Vec3::ZERO))
            .collect();
        world.destroy(crates[1]);

        let next = world.instantiate(&crate_template(), level, Vec3::ZERO, Vec3::ZERO);
        assert_eq!(world.name(next).as_deref(), Some("Crate (3)"));

        let mut names: Vec<String> = world.children(level).iter().filter_map(|&e| world.name(e)).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 3);
    }

    #[test]
    fn test_set_visual_requires_component() {
        let mut world = SceneWorld::new();
        let root = world.create_root("Level");
        let plain = world.instantiate(&crate_template(), root, Vec3::ZERO, Vec3::ZERO);

        let visual = Visual {
            layer: "Default".to_string(),
            order: 0,
            color: Rgba::WHITE,
        };
        assert!(!world.set_visual(plain, &visual));
        assert_eq!(world.visual(plain), None);

        let sprite = Template::new("Saw").with_visual(visual.clone());
        let e = world.instantiate(&sprite, root, Vec3::ZERO, Vec3::ZERO);
        let tinted = Visual { order: 5, ..visual };
        assert!(world.set_visual(e, &tinted));
        assert_eq!(world.visual(e), Some(tinted));
    }

    #[test]
    fn test_camera_follow_requires_rig() {
        let mut world = SceneWorld::new();
        let rig = FollowRig {
            target: None,
            z_depth: -10.0,
            bounds: Default::default(),
            tracking_speed: 1.0,
        };
        assert!(!world.set_camera_follow(rig));
        assert!(world.camera_follow().is_none());

        world.set_camera_rig(Some(rig));
        let updated = FollowRig { tracking_speed: 4.0, ..rig };
        assert!(world.set_camera_follow(updated));
        assert_eq!(world.camera_follow(), Some(updated));
    }

    #[test]
    fn test_despawning_target_clears_rig_target() {
        let mut world = SceneWorld::new();
        let player = world.spawn("SoyBoy", Vec3::ZERO);
        world.set_camera_rig(Some(FollowRig {
            target: Some(player),
            z_depth: -10.0,
            bounds: Default::default(),
            tracking_speed: 1.0,
        }));
        world.destroy(player);
        assert_eq!(world.camera_follow().unwrap().target, None);
    }
}
