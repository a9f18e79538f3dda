//! Renderable object kinds and the tag-name registry built from them.
use crate::object::Object3D;
use crate::slots::SlotTable;
use log::debug;
use std::collections::HashMap;
use std::rc::Rc;

/// Tag reserved for the rendering surface; never converted to an object.
pub const SURFACE_TAG: &str = "canvas";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Scene,
    Group,
    Object3D,
    Mesh,
    Points,
    Line,
    Sprite,
    PerspectiveCamera,
    OrthographicCamera,
    AmbientLight,
    DirectionalLight,
    PointLight,
    SpotLight,
    HemisphereLight,
}

const EXPORTED: [ObjectKind; 14] = [
    ObjectKind::Scene,
    ObjectKind::Group,
    ObjectKind::Object3D,
    ObjectKind::Mesh,
    ObjectKind::Points,
    ObjectKind::Line,
    ObjectKind::Sprite,
    ObjectKind::PerspectiveCamera,
    ObjectKind::OrthographicCamera,
    ObjectKind::AmbientLight,
    ObjectKind::DirectionalLight,
    ObjectKind::PointLight,
    ObjectKind::SpotLight,
    ObjectKind::HemisphereLight,
];

/// Every kind this backend can construct.
pub const fn exported_kinds() -> &'static [ObjectKind] {
    &EXPORTED
}

impl ObjectKind {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Scene => "scene",
            Self::Group => "group",
            Self::Object3D => "object3d",
            Self::Mesh => "mesh",
            Self::Points => "points",
            Self::Line => "line",
            Self::Sprite => "sprite",
            Self::PerspectiveCamera => "perspective-camera",
            Self::OrthographicCamera => "orthographic-camera",
            Self::AmbientLight => "ambient-light",
            Self::DirectionalLight => "directional-light",
            Self::PointLight => "point-light",
            Self::SpotLight => "spot-light",
            Self::HemisphereLight => "hemisphere-light",
        }
    }

    pub const fn is_camera(self) -> bool {
        matches!(self, Self::PerspectiveCamera | Self::OrthographicCamera)
    }

    pub const fn is_light(self) -> bool {
        matches!(
            self,
            Self::AmbientLight
                | Self::DirectionalLight
                | Self::PointLight
                | Self::SpotLight
                | Self::HemisphereLight
        )
    }

    /// Kinds that draw geometry and can therefore be hit by a ray.
    pub const fn is_drawable(self) -> bool {
        matches!(self, Self::Mesh | Self::Points | Self::Line | Self::Sprite)
    }
}

/// Lowercase and drop separators so `PerspectiveCamera`, `perspective-camera`
/// and `perspective_camera` all meet.
fn normalize(tag: &str) -> String {
    tag.chars()
        .filter(|ch| !matches!(ch, '-' | '_'))
        .map(|ch| ch.to_ascii_lowercase())
        .collect()
}

/// Maps tag names to object kinds and constructs objects with their slot table.
#[derive(Debug)]
pub struct TypeRegistry {
    by_name: HashMap<String, ObjectKind>,
    slots: HashMap<ObjectKind, Rc<SlotTable>>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::from_kinds(exported_kinds())
    }
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_kinds(kinds: &[ObjectKind]) -> Self {
        let mut by_name = HashMap::with_capacity(kinds.len());
        let mut slots = HashMap::with_capacity(kinds.len());
        for kind in kinds {
            by_name.insert(normalize(kind.name()), *kind);
            slots.insert(*kind, Rc::new(SlotTable::for_kind(*kind)));
        }
        debug!("Type registry built with {} kinds", by_name.len());
        Self { by_name, slots }
    }

    /// Case- and hyphen-insensitive lookup. The surface tag never resolves.
    pub fn lookup(&self, tag: &str) -> Option<ObjectKind> {
        let key = normalize(tag);
        if key == SURFACE_TAG {
            return None;
        }
        self.by_name.get(&key).copied()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Build a fresh object of `kind`, or `None` when the kind is not registered.
    pub fn construct(&self, kind: ObjectKind) -> Option<Object3D> {
        let table = self.slots.get(&kind)?;
        Some(Object3D::new(kind, Rc::clone(table)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_ignores_case_and_separators() {
        let registry = TypeRegistry::new();
        assert_eq!(registry.len(), 14);
        assert_eq!(registry.lookup("Mesh"), Some(ObjectKind::Mesh));
        assert_eq!(registry.lookup("perspective-camera"), Some(ObjectKind::PerspectiveCamera));
        assert_eq!(registry.lookup("PerspectiveCamera"), Some(ObjectKind::PerspectiveCamera));
        assert_eq!(registry.lookup("hemisphere_light"), Some(ObjectKind::HemisphereLight));
        assert_eq!(registry.lookup("div"), None);
        assert_eq!(registry.lookup("canvas"), None);
    }

    #[test]
    fn unregistered_kinds_do_not_construct() {
        let registry = TypeRegistry::from_kinds(&[ObjectKind::Group]);
        assert!(registry.construct(ObjectKind::Group).is_some());
        assert!(registry.construct(ObjectKind::Mesh).is_none());
        assert_eq!(registry.lookup("mesh"), None);
    }
}
