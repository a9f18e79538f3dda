//! Layer-filtered ray intersection against object bounds.
use crate::camera::{Ray, ray_from_ndc};
use crate::graph::{ObjectId, SceneGraph};
use crate::kinds::ObjectKind;
use crate::object::{Layers, Object3D};
use crate::value::{Geometry, Resource};
use glam::{Vec2, Vec3};

/// Layer reserved for objects that take part in picking.
pub const PICK_LAYER: u8 = 1;

/// Local-space hit volume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bound {
    Box { half: Vec3 },
    Sphere { radius: f32 },
    /// In the local XY plane.
    Plane { half: Vec2 },
}

const UNIT_BOX: Bound = Bound::Box { half: Vec3::splat(0.5) };

impl Bound {
    pub fn from_geometry(geometry: Geometry) -> Self {
        match geometry {
            Geometry::Box { width, height, depth } => Self::Box {
                half: Vec3::new(width as f32, height as f32, depth as f32) * 0.5,
            },
            Geometry::Sphere { radius } => Self::Sphere { radius: radius as f32 },
            Geometry::Plane { width, height } => Self::Plane {
                half: Vec2::new(width as f32, height as f32) * 0.5,
            },
            Geometry::Cylinder { radius_top, radius_bottom, height } => {
                let radius = radius_top.max(radius_bottom) as f32;
                Self::Box { half: Vec3::new(radius, height as f32 * 0.5, radius) }
            }
            Geometry::Cone { radius, height } => Self::Box {
                half: Vec3::new(radius as f32, height as f32 * 0.5, radius as f32),
            },
            Geometry::Torus { radius, tube } => {
                let outer = (radius + tube) as f32;
                Self::Box { half: Vec3::new(outer, outer, tube as f32) }
            }
        }
    }

    /// Bound of a drawable object: its primitive geometry, or a unit box for
    /// sprites and loaded models. Non-drawables have none.
    pub fn of(object: &Object3D) -> Option<Self> {
        if !object.kind().is_drawable() {
            return None;
        }
        match object.geometry() {
            Some(Resource::Geometry(geometry)) => Some(Self::from_geometry(*geometry)),
            Some(Resource::Encoded { .. }) => Some(UNIT_BOX),
            _ if object.kind() == ObjectKind::Sprite => Some(UNIT_BOX),
            _ => None,
        }
    }

    /// Distance along `ray` (local space) to the nearest hit in front of the origin.
    pub fn intersect(&self, ray: &Ray) -> Option<f32> {
        match *self {
            Self::Box { half } => slab_hit(ray, -half, half),
            Self::Sphere { radius } => sphere_hit(ray, radius),
            Self::Plane { half } => {
                if ray.direction.z.abs() <= f32::EPSILON {
                    return None;
                }
                let distance = -ray.origin.z / ray.direction.z;
                let point = ray.at(distance);
                (distance >= 0.0 && point.x.abs() <= half.x && point.y.abs() <= half.y)
                    .then_some(distance)
            }
        }
    }
}

fn slab_hit(ray: &Ray, min: Vec3, max: Vec3) -> Option<f32> {
    let mut near = f32::NEG_INFINITY;
    let mut far = f32::INFINITY;
    for axis in 0..3 {
        let origin = ray.origin[axis];
        let direction = ray.direction[axis];
        if direction.abs() <= f32::EPSILON {
            if origin < min[axis] || origin > max[axis] {
                return None;
            }
            continue;
        }
        let first = (min[axis] - origin) / direction;
        let second = (max[axis] - origin) / direction;
        near = near.max(first.min(second));
        far = far.min(first.max(second));
        if near > far {
            return None;
        }
    }
    if far < 0.0 {
        return None;
    }
    Some(near.max(0.0))
}

fn sphere_hit(ray: &Ray, radius: f32) -> Option<f32> {
    let along = -ray.origin.dot(ray.direction);
    let closest_sq = ray.origin.length_squared() - along * along;
    let radius_sq = radius * radius;
    if closest_sq > radius_sq {
        return None;
    }
    let half_chord = (radius_sq - closest_sq).sqrt();
    let entry = along - half_chord;
    let exit = along + half_chord;
    if exit < 0.0 {
        return None;
    }
    Some(entry.max(0.0))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intersection {
    pub object: ObjectId,
    /// World-space distance from the ray origin.
    pub distance: f32,
    pub point: Vec3,
}

#[derive(Debug, Clone, Copy)]
pub struct Raycaster {
    pub ray: Ray,
    pub layers: Layers,
}

impl Default for Raycaster {
    fn default() -> Self {
        Self {
            ray: Ray::new(Vec3::ZERO, Vec3::NEG_Z),
            layers: Layers::only(PICK_LAYER),
        }
    }
}

impl Raycaster {
    pub fn new(ray: Ray) -> Self {
        Self {
            ray,
            ..Self::default()
        }
    }

    /// Aim through `ndc` from `camera`. Returns false and keeps the old ray
    /// when no ray can be built.
    pub fn set_from_camera(&mut self, graph: &SceneGraph, camera: ObjectId, ndc: Vec2) -> bool {
        ray_from_ndc(graph, camera, ndc).is_some_and(|ray| {
            self.ray = ray;
            true
        })
    }

    /// Hits on visible objects sharing a layer with the caster, nearest first.
    pub fn intersect(&self, graph: &SceneGraph) -> Vec<Intersection> {
        let mut hits: Vec<Intersection> = graph
            .traverse()
            .filter(|(_, object)| object.layers.test(self.layers))
            .filter_map(|(id, object)| {
                let bound = Bound::of(object)?;
                if !graph.is_visible(id) {
                    return None;
                }
                self.hit(graph, id, bound)
            })
            .collect();
        hits.sort_by(|left, right| left.distance.total_cmp(&right.distance));
        hits
    }

    fn hit(&self, graph: &SceneGraph, id: ObjectId, bound: Bound) -> Option<Intersection> {
        let world = graph.world_matrix(id);
        if world.determinant().abs() <= f32::EPSILON {
            return None;
        }
        let to_local = world.inverse();
        let local_origin = to_local.transform_point3(self.ray.origin);
        let local_direction = to_local.transform_vector3(self.ray.direction);
        let local = Ray::new(local_origin, local_direction);
        let local_distance = bound.intersect(&local)?;
        let point = world.transform_point3(local.at(local_distance));
        Some(Intersection {
            object: id,
            distance: point.distance(self.ray.origin),
            point,
        })
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, reason = "test assertions")]
mod tests {
    use super::*;
    use crate::kinds::TypeRegistry;
    use crate::value::Value;
    use std::rc::Rc;

    fn cube_at(registry: &TypeRegistry, z_offset: f64, pickable: bool) -> Object3D {
        let mut mesh = registry.construct(ObjectKind::Mesh).expect("mesh");
        let cube = Geometry::Box { width: 1.0, height: 1.0, depth: 1.0 };
        mesh.assign("geometry", &Value::Resource(Rc::new(Resource::Geometry(cube))))
            .expect("geometry");
        mesh.assign("position-z", &Value::Number(z_offset)).expect("position");
        if pickable {
            mesh.layers.enable(PICK_LAYER);
        }
        mesh
    }

    #[test]
    fn only_pick_layer_objects_are_hit() {
        let registry = TypeRegistry::new();
        let mut graph = SceneGraph::new();
        let near = graph.add(graph.root(), cube_at(&registry, 0.0, false)).expect("attach");
        let far = graph.add(graph.root(), cube_at(&registry, -5.0, true)).expect("attach");

        let caster = Raycaster::new(Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::NEG_Z));
        let hits = caster.intersect(&graph);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].object, far);
        assert!((hits[0].point.z - -4.5).abs() < 1e-4);
        assert!(hits.iter().all(|hit| hit.object != near));
    }

    #[test]
    fn hits_are_sorted_nearest_first() {
        let registry = TypeRegistry::new();
        let mut graph = SceneGraph::new();
        let back = graph.add(graph.root(), cube_at(&registry, -3.0, true)).expect("attach");
        let front = graph.add(graph.root(), cube_at(&registry, 2.0, true)).expect("attach");
        let caster = Raycaster::new(Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::NEG_Z));
        let order: Vec<ObjectId> = caster.intersect(&graph).iter().map(|hit| hit.object).collect();
        assert_eq!(order, vec![front, back]);
        assert!(Raycaster::new(Ray::new(Vec3::new(3.0, 0.0, 10.0), Vec3::NEG_Z))
            .intersect(&graph)
            .is_empty());
    }

    #[test]
    fn sphere_and_plane_bounds() {
        let down_z = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z);
        let sphere = Bound::from_geometry(Geometry::Sphere { radius: 2.0 });
        assert!((sphere.intersect(&down_z).expect("sphere hit") - 3.0).abs() < 1e-5);
        let plane = Bound::from_geometry(Geometry::Plane { width: 2.0, height: 2.0 });
        assert!((plane.intersect(&down_z).expect("plane hit") - 5.0).abs() < 1e-5);
        let sideways = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::X);
        assert_eq!(plane.intersect(&sideways), None);
    }
}
