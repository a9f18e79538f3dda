//! Rendering backend abstraction.
//!
//! Defines the `RenderBackend` trait that lets the scene host draw through any
//! graphics implementation, and the factory that creates one per surface.

use crate::graph::{ObjectId, SceneGraph};
use anyhow::Result as AnyResult;
use core::fmt::Debug;

/// The drawing surface a backend is created for.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceDescriptor {
    /// Label used in diagnostics (usually the host element's key).
    pub label: String,
    /// Size in CSS pixels.
    pub width: u32,
    pub height: u32,
    pub pixel_ratio: f64,
}

/// Backend-agnostic rendering interface.
pub trait RenderBackend: Debug {
    /// Draw `graph` as seen from `camera`.
    ///
    /// # Errors
    /// Returns an error if rendering or presentation fails.
    fn render(&mut self, graph: &SceneGraph, camera: ObjectId) -> AnyResult<()>;

    /// Resize the drawing buffer to `width` x `height` CSS pixels at `pixel_ratio`.
    fn resize(&mut self, width: u32, height: u32, pixel_ratio: f64);

    /// Current size in CSS pixels.
    fn size(&self) -> (u32, u32);

    fn pixel_ratio(&self) -> f64;

    fn metrics(&self) -> BackendMetrics;
}

/// Creates a backend for a surface.
pub trait BackendFactory {
    /// # Errors
    /// Fails when no graphics context can be obtained for `surface`.
    fn create(&self, surface: &SurfaceDescriptor) -> AnyResult<Box<dyn RenderBackend>>;
}

/// Rendering counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackendMetrics {
    /// Frames rendered since creation.
    pub frames: u64,
    /// Objects submitted in the last frame.
    pub objects: u32,
}
