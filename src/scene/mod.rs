//! Scene collaborators
//!
//! The capture and load algorithms never touch an engine directly. They talk
//! to whatever owns the live object arrangement through these traits:
//! - [`WorldHost`]: hierarchy traversal, lookup, instantiate/destroy, transforms
//! - [`VisualAccessor`]: optional sprite component on an object
//! - [`CameraFollowAccessor`]: the optional camera-follow rig
//! - [`ContentResolver`]: maps template names to instantiable templates
//!
//! [`SceneWorld`] and [`TemplateLibrary`] are in-memory implementations used
//! by the command-line tool and the tests.

mod component;
mod entity;
mod library;
mod world;

pub use entity::Entity;
pub use library::{Template, TemplateLibrary};
pub use world::SceneWorld;

use std::fmt;

use crate::descriptor::{Vec3, Visual};

/// Placement of an object: position, Euler rotation (degrees) and scale
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        position: Vec3::ZERO,
        rotation: Vec3::ZERO,
        scale: Vec3::ONE,
    };

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Rectangle the camera is clamped to
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ClampRect {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

/// Live state of the camera-follow rig
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FollowRig<H> {
    /// Object being tracked, if any
    pub target: Option<H>,
    pub z_depth: f32,
    pub bounds: ClampRect,
    pub tracking_speed: f32,
}

/// Owner of the live object arrangement.
///
/// Handles are opaque; the host decides what they mean and in which order
/// children are reported.
pub trait WorldHost {
    type Handle: Copy + Eq + fmt::Debug;
    type Template;

    /// Find an object anywhere in the world by display name
    fn find(&self, name: &str) -> Option<Self::Handle>;

    /// Direct children of `container`, in traversal order
    fn children(&self, container: Self::Handle) -> Vec<Self::Handle>;

    /// Display name of an object
    fn name(&self, object: Self::Handle) -> Option<String>;

    /// Current world-space transform of an object
    fn transform(&self, object: Self::Handle) -> Option<Transform>;

    /// Create an empty top-level object
    fn create_root(&mut self, name: &str) -> Self::Handle;

    /// Instantiate `template` under `parent`
    fn instantiate(
        &mut self,
        template: &Self::Template,
        parent: Self::Handle,
        position: Vec3,
        rotation: Vec3,
    ) -> Self::Handle;

    /// Destroy an object together with its children
    fn destroy(&mut self, object: Self::Handle);

    fn set_position(&mut self, object: Self::Handle, position: Vec3);
    fn set_rotation(&mut self, object: Self::Handle, rotation: Vec3);
    fn set_scale(&mut self, object: Self::Handle, scale: Vec3);
}

/// Access to an object's sprite component
pub trait VisualAccessor: WorldHost {
    /// `None` when the object has no sprite component
    fn visual(&self, object: Self::Handle) -> Option<Visual>;

    /// Returns false when the object has no sprite component to write into
    fn set_visual(&mut self, object: Self::Handle, visual: &Visual) -> bool;
}

/// Access to the singleton camera-follow rig, which may not exist
pub trait CameraFollowAccessor: WorldHost {
    fn camera_follow(&self) -> Option<FollowRig<Self::Handle>>;

    /// Returns false when the world has no rig
    fn set_camera_follow(&mut self, rig: FollowRig<Self::Handle>) -> bool;
}

/// Maps template names to templates the world can instantiate
pub trait ContentResolver<W: WorldHost + ?Sized> {
    fn resolve(&self, template_name: &str) -> Option<W::Template>;
}
