//! A backend that draws nothing and records what it was asked to draw.
use crate::backend::{BackendFactory, BackendMetrics, RenderBackend, SurfaceDescriptor};
use crate::graph::{ObjectId, SceneGraph};
use anyhow::{Result as AnyResult, bail};
use core::cell::RefCell;
use log::debug;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
pub struct FrameRecord {
    pub surface: String,
    pub camera: ObjectId,
    /// Visible objects in the frame, the scene root included.
    pub objects: usize,
    pub width: u32,
    pub height: u32,
}

/// Frames recorded by every backend a [`HeadlessFactory`] created.
#[derive(Debug, Clone, Default)]
pub struct FrameLog(Rc<RefCell<Vec<FrameRecord>>>);

impl FrameLog {
    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    pub fn last(&self) -> Option<FrameRecord> {
        self.0.borrow().last().cloned()
    }

    pub fn snapshot(&self) -> Vec<FrameRecord> {
        self.0.borrow().clone()
    }

    fn push(&self, record: FrameRecord) {
        self.0.borrow_mut().push(record);
    }
}

#[derive(Debug)]
pub struct HeadlessBackend {
    surface: String,
    width: u32,
    height: u32,
    pixel_ratio: f64,
    metrics: BackendMetrics,
    log: FrameLog,
}

impl HeadlessBackend {
    pub fn new(surface: &SurfaceDescriptor, log: FrameLog) -> Self {
        Self {
            surface: surface.label.clone(),
            width: surface.width,
            height: surface.height,
            pixel_ratio: surface.pixel_ratio,
            metrics: BackendMetrics::default(),
            log,
        }
    }
}

impl RenderBackend for HeadlessBackend {
    fn render(&mut self, graph: &SceneGraph, camera: ObjectId) -> AnyResult<()> {
        if !graph.contains(camera) {
            bail!("camera {camera:?} is not in the scene graph");
        }
        let objects = graph.traverse().filter(|(id, _)| graph.is_visible(*id)).count();
        self.metrics.frames += 1;
        self.metrics.objects = u32::try_from(objects).unwrap_or(u32::MAX);
        self.log.push(FrameRecord {
            surface: self.surface.clone(),
            camera,
            objects,
            width: self.width,
            height: self.height,
        });
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32, pixel_ratio: f64) {
        debug!("Headless surface {} resized to {width}x{height}@{pixel_ratio}", self.surface);
        self.width = width;
        self.height = height;
        self.pixel_ratio = pixel_ratio;
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }

    fn metrics(&self) -> BackendMetrics {
        self.metrics
    }
}

/// Creates [`HeadlessBackend`]s sharing one [`FrameLog`]. A failing factory
/// models an environment without a graphics context.
#[derive(Debug, Clone, Default)]
pub struct HeadlessFactory {
    fail: bool,
    log: FrameLog,
}

impl HeadlessFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            log: FrameLog::default(),
        }
    }

    pub fn log(&self) -> FrameLog {
        self.log.clone()
    }
}

impl BackendFactory for HeadlessFactory {
    fn create(&self, surface: &SurfaceDescriptor) -> AnyResult<Box<dyn RenderBackend>> {
        if self.fail {
            bail!("no graphics context available for surface `{}`", surface.label);
        }
        Ok(Box::new(HeadlessBackend::new(surface, self.log.clone())))
    }
}
