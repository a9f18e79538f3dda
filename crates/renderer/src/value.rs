//! Field values stored on scene objects.
use animation::{Animatable, lerp_array, lerp_number};
use core::fmt;
use std::path::Path;
use std::rc::Rc;

/// Built-in primitive geometry. Dimensions are in scene units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Geometry {
    Box { width: f64, height: f64, depth: f64 },
    Sphere { radius: f64 },
    /// Lies in the local XY plane, facing +Z.
    Plane { width: f64, height: f64 },
    Cylinder { radius_top: f64, radius_bottom: f64, height: f64 },
    Cone { radius: f64, height: f64 },
    Torus { radius: f64, tube: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterialPreset {
    Standard,
    Basic,
}

/// Media kind of an external asset, keyed by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Model,
    Texture,
    Audio,
    Material,
    Unknown,
}

impl AssetKind {
    pub fn from_path(path: &str) -> Self {
        let extension = Path::new(path.split(['?', '#']).next().unwrap_or(path))
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("gltf" | "glb" | "obj" | "fbx" | "stl" | "ply" | "dae") => Self::Model,
            Some("png" | "jpg" | "jpeg" | "webp" | "gif" | "bmp" | "ktx2" | "hdr" | "exr") => {
                Self::Texture
            }
            Some("mp3" | "ogg" | "wav" | "flac" | "m4a") => Self::Audio,
            Some("mtl" | "json") => Self::Material,
            _ => Self::Unknown,
        }
    }
}

/// A loaded or built-in resource. Decoding of encoded payloads belongs to the backend.
#[derive(Clone, PartialEq)]
pub enum Resource {
    Geometry(Geometry),
    Material(MaterialPreset),
    Encoded {
        kind: AssetKind,
        source: String,
        bytes: Rc<[u8]>,
    },
}

impl fmt::Debug for Resource {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Geometry(geometry) => formatter.debug_tuple("Geometry").field(geometry).finish(),
            Self::Material(preset) => formatter.debug_tuple("Material").field(preset).finish(),
            Self::Encoded { kind, source, bytes } => formatter
                .debug_struct("Encoded")
                .field("kind", kind)
                .field("source", source)
                .field("len", &bytes.len())
                .finish(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Array(Vec<f64>),
    Bool(bool),
    Text(String),
    Resource(Rc<Resource>),
}

impl Value {
    pub const fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(number) => Some(*number),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[f64]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_resource(&self) -> Option<&Resource> {
        match self {
            Self::Resource(resource) => Some(resource),
            _ => None,
        }
    }

    pub const fn is_numeric(&self) -> bool {
        matches!(self, Self::Number(_) | Self::Array(_))
    }
}

impl Animatable for Value {
    /// Numbers and arrays interpolate; a scalar against an array is broadcast.
    fn interpolate(from: &Self, to: &Self, progress: f64) -> Option<Self> {
        match (from, to) {
            (Self::Number(start), Self::Number(end)) => {
                Some(Self::Number(lerp_number(*start, *end, progress)))
            }
            (Self::Array(start), Self::Array(end)) => {
                Some(Self::Array(lerp_array(start, end, progress)))
            }
            (Self::Number(start), Self::Array(end)) => Some(Self::Array(lerp_array(
                &vec![*start; end.len()],
                end,
                progress,
            ))),
            (Self::Array(start), Self::Number(end)) => Some(Self::Array(lerp_array(
                start,
                &vec![*end; start.len()],
                progress,
            ))),
            _ => None,
        }
    }
}
