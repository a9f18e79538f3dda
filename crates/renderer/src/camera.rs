//! Camera projections and picking rays.
use crate::graph::{ObjectId, SceneGraph};
use crate::kinds::ObjectKind;
use crate::object::Object3D;
use glam::{Mat4, Vec2, Vec3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    Perspective {
        fov_degrees: f32,
        aspect: f32,
        near: f32,
        far: f32,
        zoom: f32,
    },
    Orthographic {
        left: f32,
        right: f32,
        top: f32,
        bottom: f32,
        near: f32,
        far: f32,
        zoom: f32,
    },
}

impl Projection {
    /// Read the projection parameters from a camera object's fields.
    pub fn from_object(object: &Object3D) -> Option<Self> {
        let field = |name: &str, fallback: f32| {
            object
                .number(name)
                .map_or(fallback, |number| number as f32)
        };
        match object.kind() {
            ObjectKind::PerspectiveCamera => Some(Self::Perspective {
                fov_degrees: field("fov", 50.0),
                aspect: field("aspect", 1.0),
                near: field("near", 0.1),
                far: field("far", 2000.0),
                zoom: field("zoom", 1.0),
            }),
            ObjectKind::OrthographicCamera => Some(Self::Orthographic {
                left: field("left", -1.0),
                right: field("right", 1.0),
                top: field("top", 1.0),
                bottom: field("bottom", -1.0),
                near: field("near", 0.1),
                far: field("far", 2000.0),
                zoom: field("zoom", 1.0),
            }),
            _ => None,
        }
    }

    /// OpenGL-style clip space (`z` in `-1..=1`).
    pub fn matrix(&self) -> Mat4 {
        match *self {
            Self::Perspective { fov_degrees, aspect, near, far, zoom } => {
                let zoom = if zoom > 0.0 { zoom } else { 1.0 };
                let half = (fov_degrees.to_radians() * 0.5).tan() / zoom;
                Mat4::perspective_rh_gl(2.0 * half.atan(), aspect.max(f32::EPSILON), near, far)
            }
            Self::Orthographic { left, right, top, bottom, near, far, zoom } => {
                let zoom = if zoom > 0.0 { zoom } else { 1.0 };
                let center_x = (left + right) * 0.5;
                let center_y = (top + bottom) * 0.5;
                let half_width = (right - left) * 0.5 / zoom;
                let half_height = (top - bottom) * 0.5 / zoom;
                Mat4::orthographic_rh_gl(
                    center_x - half_width,
                    center_x + half_width,
                    center_y - half_height,
                    center_y + half_height,
                    near,
                    far,
                )
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit length.
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    pub fn at(&self, distance: f32) -> Vec3 {
        self.origin + self.direction * distance
    }
}

/// Ray through normalized device coordinates `ndc` (`-1..=1`, +Y up) from `camera`.
///
/// Returns `None` when `camera` is not a camera or its projection is degenerate.
pub fn ray_from_ndc(graph: &SceneGraph, camera: ObjectId, ndc: Vec2) -> Option<Ray> {
    let object = graph.get(camera)?;
    let projection = object.projection()?;
    if projection.determinant().abs() <= f32::EPSILON {
        return None;
    }
    let clip_to_world = graph.world_matrix(camera) * projection.inverse();
    let near = clip_to_world.project_point3(Vec3::new(ndc.x, ndc.y, -1.0));
    let far = clip_to_world.project_point3(Vec3::new(ndc.x, ndc.y, 1.0));
    let ray = Ray::new(near, far - near);
    (ray.direction != Vec3::ZERO).then_some(ray)
}
