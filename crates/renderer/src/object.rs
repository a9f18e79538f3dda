use crate::camera::Projection;
use crate::kinds::ObjectKind;
use crate::slots::{InvokeOp, SlotKind, SlotTable};
use crate::value::{Geometry, MaterialPreset, Resource, Value};
use anyhow::{Context as _, Result as AnyResult, anyhow, bail};
use csscolorparser::Color;
use glam::{EulerRot, Mat4, Quat, Vec3};
use std::collections::BTreeMap;
use std::rc::Rc;

/// Bit set of render layers an object belongs to. Objects start on layer 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layers(u32);

impl Default for Layers {
    fn default() -> Self {
        Self(1)
    }
}

const fn layer_bit(layer: u8) -> u32 {
    if layer < 32 { 1 << layer } else { 0 }
}

impl Layers {
    /// A set holding only `layer`.
    pub const fn only(layer: u8) -> Self {
        Self(layer_bit(layer))
    }

    pub const fn enable(&mut self, layer: u8) {
        self.0 |= layer_bit(layer);
    }

    pub const fn disable(&mut self, layer: u8) {
        self.0 &= !layer_bit(layer);
    }

    pub const fn is_enabled(self, layer: u8) -> bool {
        self.0 & layer_bit(layer) != 0
    }

    /// True when the two sets share at least one layer.
    pub const fn test(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }
}

/// One backend object: a kind, its fields and the slot table that governs writes.
#[derive(Debug, Clone)]
pub struct Object3D {
    kind: ObjectKind,
    pub name: String,
    pub layers: Layers,
    fields: BTreeMap<String, Value>,
    slots: Rc<SlotTable>,
    projection: Option<Mat4>,
}

fn seed_vector(fields: &mut BTreeMap<String, Value>, prefix: &str, values: [f64; 3]) {
    for (component, value) in ["x", "y", "z"].into_iter().zip(values) {
        fields.insert(format!("{prefix}-{component}"), Value::Number(value));
    }
}

fn seed_defaults(kind: ObjectKind) -> BTreeMap<String, Value> {
    let mut fields = BTreeMap::new();
    seed_vector(&mut fields, "position", [0.0, 0.0, 0.0]);
    seed_vector(&mut fields, "rotation", [0.0, 0.0, 0.0]);
    seed_vector(&mut fields, "scale", [1.0, 1.0, 1.0]);
    seed_vector(&mut fields, "up", [0.0, 1.0, 0.0]);
    fields.insert("visible".into(), Value::Bool(true));
    let mut set = |key: &str, value: Value| {
        fields.insert(key.to_owned(), value);
    };
    match kind {
        ObjectKind::PerspectiveCamera => {
            set("fov", Value::Number(50.0));
            set("aspect", Value::Number(1.0));
            set("near", Value::Number(0.1));
            set("far", Value::Number(2000.0));
            set("zoom", Value::Number(1.0));
        }
        ObjectKind::OrthographicCamera => {
            set("left", Value::Number(-1.0));
            set("right", Value::Number(1.0));
            set("top", Value::Number(1.0));
            set("bottom", Value::Number(-1.0));
            set("near", Value::Number(0.1));
            set("far", Value::Number(2000.0));
            set("zoom", Value::Number(1.0));
        }
        ObjectKind::Mesh | ObjectKind::Points | ObjectKind::Line | ObjectKind::Sprite => {
            let preset = if kind == ObjectKind::Mesh {
                MaterialPreset::Standard
            } else {
                MaterialPreset::Basic
            };
            set("material", Value::Resource(Rc::new(Resource::Material(preset))));
            set("material-color", Value::Array(vec![1.0, 1.0, 1.0]));
            set("material-opacity", Value::Number(1.0));
            set("material-transparent", Value::Bool(false));
            if kind == ObjectKind::Mesh {
                set("material-emissive", Value::Array(vec![0.0, 0.0, 0.0]));
            }
        }
        ObjectKind::HemisphereLight => {
            set("color", Value::Array(vec![1.0, 1.0, 1.0]));
            set("ground-color", Value::Array(vec![1.0, 1.0, 1.0]));
            set("intensity", Value::Number(1.0));
        }
        ObjectKind::AmbientLight
        | ObjectKind::DirectionalLight
        | ObjectKind::PointLight
        | ObjectKind::SpotLight => {
            set("color", Value::Array(vec![1.0, 1.0, 1.0]));
            set("intensity", Value::Number(1.0));
        }
        ObjectKind::Scene | ObjectKind::Group | ObjectKind::Object3D => {}
    }
    fields
}

/// Resolve a color-like value to `[r, g, b]` in `0..=1`.
fn color_components(value: &Value) -> AnyResult<Vec<f64>> {
    match value {
        Value::Array(items) if items.len() >= 3 => Ok(items.iter().take(3).copied().collect()),
        Value::Number(packed) if *packed >= 0.0 => {
            let packed = *packed as u32;
            Ok([16, 8, 0]
                .into_iter()
                .map(|shift| f64::from((packed >> shift) & 0xff) / 255.0)
                .collect())
        }
        Value::Text(text) => {
            let color: Color = text
                .parse()
                .with_context(|| format!("`{text}` is not a color"))?;
            let channels = color.to_rgba8();
            Ok(channels
                .iter()
                .take(3)
                .map(|channel| f64::from(*channel) / 255.0)
                .collect())
        }
        other => bail!("{other:?} is not a color"),
    }
}

fn number_arg(op: InvokeOp, value: &Value) -> AnyResult<f32> {
    value
        .as_number()
        .map(|number| number as f32)
        .ok_or_else(|| anyhow!("{op:?} expects a number, got {value:?}"))
}

impl Object3D {
    pub(crate) fn new(kind: ObjectKind, slots: Rc<SlotTable>) -> Self {
        let mut object = Self {
            kind,
            name: String::new(),
            layers: Layers::default(),
            fields: seed_defaults(kind),
            slots,
            projection: None,
        };
        object.update_projection();
        object
    }

    pub const fn kind(&self) -> ObjectKind {
        self.kind
    }

    pub fn slots(&self) -> &SlotTable {
        &self.slots
    }

    /// Raw stored field.
    pub fn get(&self, path: &str) -> Option<&Value> {
        self.fields.get(path)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn number(&self, path: &str) -> Option<f64> {
        self.fields.get(path).and_then(Value::as_number)
    }

    /// Current value at `path`. Vector slots read back as an array of their components.
    pub fn read(&self, path: &str) -> Option<Value> {
        if let SlotKind::Vector { components } = self.slots.resolve(path) {
            let items = components
                .iter()
                .map(|component| self.number(&format!("{path}-{component}")))
                .collect::<Option<Vec<f64>>>()?;
            return Some(Value::Array(items));
        }
        self.fields.get(path).cloned()
    }

    /// Write `value` to `path` using the slot's assignment strategy.
    ///
    /// # Errors
    /// Fails when the value does not fit the slot, or when a plain field's
    /// parent chain does not exist on this object.
    pub fn assign(&mut self, path: &str, value: &Value) -> AnyResult<()> {
        match self.slots.resolve(path) {
            SlotKind::Vector { components } => match value {
                Value::Array(items) => {
                    for (component, item) in components.iter().zip(items) {
                        self.fields
                            .insert(format!("{path}-{component}"), Value::Number(*item));
                    }
                }
                Value::Number(number) => {
                    for component in components {
                        self.fields
                            .insert(format!("{path}-{component}"), Value::Number(*number));
                    }
                }
                other => bail!("`{path}` takes numbers, got {other:?}"),
            },
            SlotKind::Color => {
                let rgb = color_components(value).with_context(|| format!("assigning `{path}`"))?;
                self.fields.insert(path.to_owned(), Value::Array(rgb));
            }
            SlotKind::Invoke(op) => self.invoke(op, value)?,
            SlotKind::Field => {
                if !self.has_parent_chain(path) {
                    bail!("`{path}` does not exist on {}", self.kind.name());
                }
                self.fields.insert(path.to_owned(), value.clone());
            }
        }
        Ok(())
    }

    /// A top-level path always resolves; a nested one needs its parent to exist.
    fn has_parent_chain(&self, path: &str) -> bool {
        let Some((parent, _)) = path.rsplit_once('-') else {
            return true;
        };
        if self.fields.contains_key(path)
            || self.fields.contains_key(parent)
            || self.slots.contains(parent)
        {
            return true;
        }
        let prefix = format!("{parent}-");
        self.fields.keys().any(|key| key.starts_with(&prefix))
    }

    fn vec3(&self, prefix: &str, fallback: f32) -> Vec3 {
        let component = |axis: &str| {
            self.number(&format!("{prefix}-{axis}"))
                .map_or(fallback, |number| number as f32)
        };
        Vec3::new(component("x"), component("y"), component("z"))
    }

    fn store_vec3(&mut self, prefix: &str, vector: Vec3) {
        seed_vector(
            &mut self.fields,
            prefix,
            [f64::from(vector.x), f64::from(vector.y), f64::from(vector.z)],
        );
    }

    pub fn position(&self) -> Vec3 {
        self.vec3("position", 0.0)
    }

    pub fn scale(&self) -> Vec3 {
        self.vec3("scale", 1.0)
    }

    /// Rotation from the `rotation-*` Euler angles (radians, XYZ order).
    pub fn rotation(&self) -> Quat {
        let euler = self.vec3("rotation", 0.0);
        Quat::from_euler(EulerRot::XYZ, euler.x, euler.y, euler.z)
    }

    fn store_rotation(&mut self, rotation: Quat) {
        let (x_angle, y_angle, z_angle) = rotation.to_euler(EulerRot::XYZ);
        self.store_vec3("rotation", Vec3::new(x_angle, y_angle, z_angle));
    }

    pub fn local_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale(), self.rotation(), self.position())
    }

    pub fn visible(&self) -> bool {
        !matches!(self.fields.get("visible"), Some(Value::Bool(false)))
    }

    /// The `geometry` field when it holds a resource.
    pub fn geometry(&self) -> Option<&Resource> {
        self.fields.get("geometry").and_then(Value::as_resource)
    }

    pub fn primitive(&self) -> Option<Geometry> {
        match self.geometry() {
            Some(Resource::Geometry(geometry)) => Some(*geometry),
            _ => None,
        }
    }

    /// Projection matrix as of the last [`Object3D::update_projection`].
    pub const fn projection(&self) -> Option<Mat4> {
        self.projection
    }

    /// Recompute the projection matrix from the camera fields. No-op for non-cameras.
    pub fn update_projection(&mut self) {
        self.projection = Projection::from_object(self).map(|projection| projection.matrix());
    }

    /// Set a perspective camera's aspect ratio and refresh its projection.
    pub fn set_aspect(&mut self, aspect: f64) {
        if self.kind != ObjectKind::PerspectiveCamera || !aspect.is_finite() || aspect <= 0.0 {
            return;
        }
        self.fields.insert("aspect".into(), Value::Number(aspect));
        self.update_projection();
    }

    fn invoke(&mut self, op: InvokeOp, value: &Value) -> AnyResult<()> {
        match op {
            InvokeOp::LookAt => {
                let target = match value {
                    Value::Array(items) if items.len() >= 3 => {
                        Vec3::new(items[0] as f32, items[1] as f32, items[2] as f32)
                    }
                    other => bail!("look-at expects (x, y, z), got {other:?}"),
                };
                self.look_at(target);
            }
            InvokeOp::TranslateX | InvokeOp::TranslateY | InvokeOp::TranslateZ => {
                let distance = number_arg(op, value)?;
                let axis = match op {
                    InvokeOp::TranslateX => Vec3::X,
                    InvokeOp::TranslateY => Vec3::Y,
                    _ => Vec3::Z,
                };
                let moved = self.position() + self.rotation() * axis * distance;
                self.store_vec3("position", moved);
            }
            InvokeOp::RotateX | InvokeOp::RotateY | InvokeOp::RotateZ => {
                let angle = number_arg(op, value)?;
                let axis = match op {
                    InvokeOp::RotateX => Vec3::X,
                    InvokeOp::RotateY => Vec3::Y,
                    _ => Vec3::Z,
                };
                let rotated = self.rotation() * Quat::from_axis_angle(axis, angle);
                self.store_rotation(rotated);
            }
            InvokeOp::UpdateProjection => self.update_projection(),
        }
        Ok(())
    }

    /// Cameras and lights point -Z at the target; other objects point +Z.
    fn look_at(&mut self, target: Vec3) {
        let eye = self.position();
        if eye.distance_squared(target) <= f32::EPSILON {
            return;
        }
        let up = self.vec3("up", 0.0).try_normalize().unwrap_or(Vec3::Y);
        let view = if self.kind.is_camera() || self.kind.is_light() {
            Mat4::look_at_rh(eye, target, up)
        } else {
            Mat4::look_at_rh(target, eye, up)
        };
        let (_, rotation, _) = view.inverse().to_scale_rotation_translation();
        self.store_rotation(rotation);
    }
}
