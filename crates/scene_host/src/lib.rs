//! Live synchronization between a styled document and retained 3D scenes.
//!
//! An [`Engine`] owns the process-wide registries (object kinds, assets,
//! picking) and any number of [`SceneHost`]s. Each host mirrors one document
//! subtree onto its own scene graph, repaints nodes from stylesheet and inline
//! rules, and renders once per [`Engine::frame`]. The embedder drives time and
//! feeds pointer input through [`Engine::dispatch_pointer`].

pub mod config;
pub mod engine;
pub mod events;
pub mod host;
pub mod mutations;
pub mod picking;
/// Coalesced repaint scheduling
pub mod scheduler;
pub mod state;
pub mod style;
pub mod telemetry;

pub use config::HostConfig;
pub use engine::Engine;
pub use events::{PickEvent, PickKind, PointerAction, PointerInput};
pub use host::{CameraSource, HostEnv, HostId, Rect, SceneHost};
pub use picking::PickingDispatcher;
pub use state::{HostNotice, HostScene, SceneNode};
pub use style::StyleResolver;
