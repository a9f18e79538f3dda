//! Per-kind assignment strategies.
//!
//! Every object kind carries a small table mapping a dash path to how a value
//! written to that path is applied. Paths missing from the table are plain
//! fields. Tables are built once per kind by the [`TypeRegistry`] and shared
//! by every object of that kind.
//!
//! [`TypeRegistry`]: crate::kinds::TypeRegistry
use crate::kinds::ObjectKind;
use std::collections::HashMap;

const XYZ: &[&str] = &["x", "y", "z"];

/// Operations exposed as callable slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvokeOp {
    LookAt,
    TranslateX,
    TranslateY,
    TranslateZ,
    RotateX,
    RotateY,
    RotateZ,
    UpdateProjection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    /// Positional components stored as `<path>-<component>`; a scalar sets all of them.
    Vector { components: &'static [&'static str] },
    /// Stored as an `[r, g, b]` array in `0..=1`.
    Color,
    Invoke(InvokeOp),
    Field,
}

#[derive(Debug, Clone, Default)]
pub struct SlotTable {
    entries: HashMap<&'static str, SlotKind>,
}

impl SlotTable {
    pub fn for_kind(kind: ObjectKind) -> Self {
        let mut entries = HashMap::from([
            ("position", SlotKind::Vector { components: XYZ }),
            ("rotation", SlotKind::Vector { components: XYZ }),
            ("scale", SlotKind::Vector { components: XYZ }),
            ("up", SlotKind::Vector { components: XYZ }),
            ("look-at", SlotKind::Invoke(InvokeOp::LookAt)),
            ("translate-x", SlotKind::Invoke(InvokeOp::TranslateX)),
            ("translate-y", SlotKind::Invoke(InvokeOp::TranslateY)),
            ("translate-z", SlotKind::Invoke(InvokeOp::TranslateZ)),
            ("rotate-x", SlotKind::Invoke(InvokeOp::RotateX)),
            ("rotate-y", SlotKind::Invoke(InvokeOp::RotateY)),
            ("rotate-z", SlotKind::Invoke(InvokeOp::RotateZ)),
        ]);
        match kind {
            ObjectKind::Scene => {
                entries.insert("background", SlotKind::Color);
            }
            ObjectKind::Mesh | ObjectKind::Points | ObjectKind::Line | ObjectKind::Sprite => {
                entries.insert("material-color", SlotKind::Color);
                entries.insert("material-emissive", SlotKind::Color);
            }
            ObjectKind::PerspectiveCamera | ObjectKind::OrthographicCamera => {
                entries.insert("update-projection", SlotKind::Invoke(InvokeOp::UpdateProjection));
            }
            ObjectKind::HemisphereLight => {
                entries.insert("color", SlotKind::Color);
                entries.insert("ground-color", SlotKind::Color);
            }
            ObjectKind::AmbientLight
            | ObjectKind::DirectionalLight
            | ObjectKind::PointLight
            | ObjectKind::SpotLight => {
                entries.insert("color", SlotKind::Color);
            }
            ObjectKind::Group | ObjectKind::Object3D => {}
        }
        Self { entries }
    }

    pub fn resolve(&self, path: &str) -> SlotKind {
        self.entries.get(path).copied().unwrap_or(SlotKind::Field)
    }

    /// True when `path` has an explicit entry.
    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_extend_the_common_table() {
        let mesh = SlotTable::for_kind(ObjectKind::Mesh);
        assert_eq!(mesh.resolve("material-color"), SlotKind::Color);
        assert_eq!(mesh.resolve("position"), SlotKind::Vector { components: XYZ });
        assert_eq!(mesh.resolve("position-x"), SlotKind::Field);

        let camera = SlotTable::for_kind(ObjectKind::PerspectiveCamera);
        assert_eq!(
            camera.resolve("update-projection"),
            SlotKind::Invoke(InvokeOp::UpdateProjection)
        );
        assert_eq!(mesh.resolve("update-projection"), SlotKind::Field);
    }
}
