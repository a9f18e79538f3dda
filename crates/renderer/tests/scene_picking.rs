use glam::Vec2;
use renderer::{
    BackendFactory as _, Geometry, HeadlessFactory, ObjectKind, PICK_LAYER, Raycaster, Resource,
    SURFACE_TAG, SceneGraph, SurfaceDescriptor, TypeRegistry, Value,
};
use std::rc::Rc;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn surface() -> SurfaceDescriptor {
    SurfaceDescriptor { label: "main".into(), width: 800, height: 600, pixel_ratio: 1.0 }
}

#[test]
fn camera_ray_skips_unpickable_overlap() -> anyhow::Result<()> {
    init_logger();
    let registry = TypeRegistry::new();
    let mut graph = SceneGraph::new();
    let mut camera = registry
        .construct(ObjectKind::PerspectiveCamera)
        .ok_or_else(|| anyhow::anyhow!("camera kind"))?;
    camera.assign("position", &Value::Array(vec![0.0, 0.0, 10.0]))?;
    camera.set_aspect(800.0 / 600.0);
    let camera_id = graph.add(graph.root(), camera)?;

    let sphere = Value::Resource(Rc::new(Resource::Geometry(Geometry::Sphere { radius: 1.0 })));
    let mut decoration = registry
        .construct(ObjectKind::Mesh)
        .ok_or_else(|| anyhow::anyhow!("mesh kind"))?;
    decoration.assign("geometry", &sphere)?;
    decoration.assign("position-z", &Value::Number(3.0))?;
    graph.add(graph.root(), decoration)?;

    let mut target = registry
        .construct(ObjectKind::Mesh)
        .ok_or_else(|| anyhow::anyhow!("mesh kind"))?;
    target.assign("geometry", &sphere)?;
    target.layers.enable(PICK_LAYER);
    let target_id = graph.add(graph.root(), target)?;

    let mut caster = Raycaster::default();
    assert!(caster.set_from_camera(&graph, camera_id, Vec2::ZERO));
    let hits = caster.intersect(&graph);
    assert_eq!(hits.len(), 1, "the decoration sits in front but is not pickable");
    assert_eq!(hits[0].object, target_id);
    assert!((hits[0].point.z - 1.0).abs() < 1e-3);

    assert!(caster.set_from_camera(&graph, camera_id, Vec2::new(0.9, 0.9)));
    assert!(caster.intersect(&graph).is_empty());
    Ok(())
}

#[test]
fn headless_backend_records_frames() -> anyhow::Result<()> {
    init_logger();
    let factory = HeadlessFactory::new();
    let log = factory.log();
    let registry = TypeRegistry::new();
    let mut graph = SceneGraph::new();
    let camera = graph.add(
        graph.root(),
        registry
            .construct(ObjectKind::PerspectiveCamera)
            .ok_or_else(|| anyhow::anyhow!("camera kind"))?,
    )?;

    let mut backend = factory.create(&surface())?;
    backend.render(&graph, camera)?;
    backend.resize(400, 300, 2.0);
    backend.render(&graph, camera)?;
    assert_eq!(log.len(), 2);
    let last = log.last().ok_or_else(|| anyhow::anyhow!("frame"))?;
    assert_eq!((last.width, last.height, last.objects), (400, 300, 2));
    assert_eq!(backend.metrics().frames, 2);

    assert!(HeadlessFactory::failing().create(&surface()).is_err());
    Ok(())
}

#[test]
fn surface_tag_never_maps_to_an_object() {
    let registry = TypeRegistry::new();
    assert_eq!(SURFACE_TAG, "canvas");
    assert!(registry.lookup(SURFACE_TAG).is_none());
    assert_eq!(registry.lookup("mesh"), Some(ObjectKind::Mesh));
}
