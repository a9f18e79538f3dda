//! Retained 3D scene graph behind a swappable rendering backend.
//!
//! Objects carry a flat map of dash-path fields (`position-x`, `material-color`)
//! and a per-kind slot table that decides how a path is assigned. Backends only
//! read the graph; they never mutate it.

pub mod backend;
pub mod camera;
pub mod graph;
pub mod headless;
pub mod kinds;
pub mod object;
pub mod raycast;
pub mod slots;
pub mod value;

pub use backend::{BackendFactory, BackendMetrics, RenderBackend, SurfaceDescriptor};
pub use camera::{Projection, Ray, ray_from_ndc};
pub use graph::{ObjectId, SceneGraph};
pub use headless::{FrameLog, FrameRecord, HeadlessBackend, HeadlessFactory};
pub use kinds::{ObjectKind, SURFACE_TAG, TypeRegistry, exported_kinds};
pub use object::{Layers, Object3D};
pub use raycast::{Bound, Intersection, PICK_LAYER, Raycaster};
pub use slots::{InvokeOp, SlotKind, SlotTable};
pub use value::{AssetKind, Geometry, MaterialPreset, Resource, Value};
