use anyhow::anyhow;
use assets::ManualLoader;
use html::{Document, NodeKey, parse_markup};
use renderer::{AssetKind, HeadlessFactory, Resource, Value};
use scene_host::{Engine, HostConfig, HostId, HostNotice};
use std::rc::Rc;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn element(doc: &Document, id: &str) -> anyhow::Result<NodeKey> {
    doc.get_element_by_id(id)
        .ok_or_else(|| anyhow!("no element #{id}"))
}

fn stage(sheet: &str, body: &str) -> String {
    format!(
        r#"<style>{sheet}</style>
        <scene id="stage">
          <canvas></canvas>
          <perspective-camera style="--position-z: 10"></perspective-camera>
          {body}
        </scene>"#
    )
}

fn attach(markup: &str, loader: &ManualLoader) -> anyhow::Result<(Document, Engine, HostId)> {
    init_logger();
    let doc = parse_markup(markup)?;
    let mut engine = Engine::new(
        HostConfig::default(),
        Box::new(HeadlessFactory::new()),
        Box::new(loader.clone()),
    );
    let id = engine.attach(&doc, element(&doc, "stage")?)?;
    Ok((doc, engine, id))
}

fn number(engine: &Engine, host: HostId, element: NodeKey, path: &str) -> anyhow::Result<f64> {
    engine
        .read(host, element, path)
        .and_then(|value| value.as_number())
        .ok_or_else(|| anyhow!("`{path}` is not a number"))
}

#[test]
fn later_layers_override_earlier_ones() -> anyhow::Result<()> {
    let markup = stage(
        "mesh { --position-x: 1; --position-y: 1; --position-z: 1; }
         .box { --position-x: 2; --position-y: 2; }
         #left { --position-x: 3; }",
        r#"<mesh class="box" id="left" style="--position-y: 4"></mesh>"#,
    );
    let (doc, engine, id) = attach(&markup, &ManualLoader::new())?;
    let left = element(&doc, "left")?;
    assert!((number(&engine, id, left, "position-x")? - 3.0).abs() < f64::EPSILON);
    assert!((number(&engine, id, left, "position-y")? - 4.0).abs() < f64::EPSILON);
    assert!((number(&engine, id, left, "position-z")? - 1.0).abs() < f64::EPSILON);
    Ok(())
}

#[test]
fn transitions_interpolate_then_settle() -> anyhow::Result<()> {
    let markup = stage(
        "#left { --transition: 1000ms linear; }",
        r#"<mesh id="left"></mesh>"#,
    );
    let (mut doc, mut engine, id) = attach(&markup, &ManualLoader::new())?;
    let left = element(&doc, "left")?;
    engine.frame(&doc, 0.0);

    doc.set_attribute(left, "style", "--position-x: 10")?;
    doc.commit();
    engine.frame(&doc, 100.0);
    engine.frame(&doc, 600.0);
    let midway = number(&engine, id, left, "position-x")?;
    assert!(midway > 0.0 && midway < 10.0, "midway value {midway}");
    assert!(engine.drain_notices(id).is_empty());

    engine.frame(&doc, 1100.0);
    assert!((number(&engine, id, left, "position-x")? - 10.0).abs() < f64::EPSILON);
    assert!(engine.drain_notices(id).contains(&HostNotice::TransitionFinished {
        node: left,
        property: "position-x".into(),
    }));
    Ok(())
}

#[test]
fn non_numeric_values_skip_the_transition() -> anyhow::Result<()> {
    let markup = stage(
        "#left { --transition: 1s; --material-color: red; }",
        r#"<mesh id="left"></mesh>"#,
    );
    let (mut doc, mut engine, id) = attach(&markup, &ManualLoader::new())?;
    let left = element(&doc, "left")?;
    doc.set_attribute(left, "style", "--material-color: #0000ff")?;
    doc.commit();
    engine.frame(&doc, 16.0);
    assert_eq!(
        engine.read(id, left, "material-color"),
        Some(Value::Array(vec![0.0, 0.0, 1.0]))
    );
    Ok(())
}

#[test]
fn keyframes_run_every_iteration_then_report() -> anyhow::Result<()> {
    let markup = stage(
        "@keyframes slide { from { --position-x: 0; } to { --position-x: 10; } }
         #left { --animation: slide 1000ms 2 linear; }",
        r#"<mesh id="left"></mesh>"#,
    );
    let (doc, mut engine, id) = attach(&markup, &ManualLoader::new())?;
    let left = element(&doc, "left")?;
    let mut finished = Vec::new();
    for step in 0..=21 {
        engine.frame(&doc, f64::from(step) * 100.0);
        let value = number(&engine, id, left, "position-x")?;
        assert!((0.0..=10.0).contains(&value), "{value} at step {step}");
        finished.extend(engine.drain_notices(id));
    }
    assert!((number(&engine, id, left, "position-x")? - 10.0).abs() < f64::EPSILON);
    assert_eq!(
        finished
            .iter()
            .filter(|notice| matches!(notice, HostNotice::KeyframesFinished { name, .. } if name == "slide"))
            .count(),
        1
    );
    Ok(())
}

#[test]
fn declared_assets_assign_once_loaded() -> anyhow::Result<()> {
    let loader = ManualLoader::new();
    let markup = stage(
        r#"@robot { url: "models/robot.glb"; }
           .bot { --geometry: @robot; }"#,
        r#"<mesh class="bot" id="left"></mesh>"#,
    );
    let (doc, mut engine, id) = attach(&markup, &loader)?;
    let left = element(&doc, "left")?;
    engine.frame(&doc, 16.0);
    assert_eq!(loader.issued(), vec!["models/robot.glb".to_owned()]);
    assert!(engine.read(id, left, "geometry").is_none());
    let host = engine.host(id).ok_or_else(|| anyhow!("host"))?;
    assert_eq!(host.scene().deferred_len(), 1);

    assert!(loader.complete(
        "models/robot.glb",
        Ok(Resource::Encoded {
            kind: AssetKind::Model,
            source: "models/robot.glb".into(),
            bytes: Rc::from(&b"glTF"[..]),
        }),
    ));
    engine.frame(&doc, 32.0);
    let Some(Value::Resource(resource)) = engine.read(id, left, "geometry") else {
        return Err(anyhow!("geometry was not assigned"));
    };
    assert!(matches!(resource.as_ref(), Resource::Encoded { kind: AssetKind::Model, .. }));
    let host = engine.host(id).ok_or_else(|| anyhow!("host"))?;
    assert_eq!(host.scene().deferred_len(), 0);
    Ok(())
}

#[test]
fn failed_assets_leave_the_property_alone() -> anyhow::Result<()> {
    let loader = ManualLoader::new();
    let markup = stage(
        r#"@robot { url: "models/robot.glb"; }
           .bot { --geometry: @robot; }"#,
        r#"<mesh class="bot" id="left"></mesh>"#,
    );
    let (doc, mut engine, id) = attach(&markup, &loader)?;
    assert!(loader.complete("models/robot.glb", Err(anyhow!("404"))));
    engine.frame(&doc, 16.0);
    assert!(engine.read(id, element(&doc, "left")?, "geometry").is_none());
    let host = engine.host(id).ok_or_else(|| anyhow!("host"))?;
    assert_eq!(host.scene().deferred_len(), 0);
    Ok(())
}

#[test]
fn node_references_copy_live_values() -> anyhow::Result<()> {
    let markup = stage(
        "#left { --position-y: 2; --rotation-z: 0.25; }
         #right { --position-x: #left-position-y; --rotation-z: #left; }",
        r#"<mesh id="left"></mesh><mesh id="right"></mesh>"#,
    );
    let (doc, engine, id) = attach(&markup, &ManualLoader::new())?;
    let right = element(&doc, "right")?;
    assert!((number(&engine, id, right, "position-x")? - 2.0).abs() < f64::EPSILON);
    assert!((number(&engine, id, right, "rotation-z")? - 0.25).abs() < f64::EPSILON);
    assert_eq!(
        engine.resolve_reference(id, "#left-position-y", "position-x"),
        Some(Value::Number(2.0))
    );
    assert!(engine.resolve_reference(id, "#nobody", "position-x").is_none());
    Ok(())
}

#[test]
fn hex_colors_fall_back_to_color_literals() -> anyhow::Result<()> {
    let markup = stage(
        ".box { --material-color: #ff0000; }",
        r#"<mesh class="box" id="left"></mesh>"#,
    );
    let (doc, engine, id) = attach(&markup, &ManualLoader::new())?;
    assert_eq!(
        engine.read(id, element(&doc, "left")?, "material-color"),
        Some(Value::Array(vec![1.0, 0.0, 0.0]))
    );
    Ok(())
}

#[test]
fn always_rules_repaint_every_frame() -> anyhow::Result<()> {
    let markup = stage(
        "#left:always { --rotation-y: #right-position-x; }",
        r#"<mesh id="left"></mesh><mesh id="right"></mesh>"#,
    );
    let (doc, mut engine, id) = attach(&markup, &ManualLoader::new())?;
    let left = element(&doc, "left")?;
    let right = element(&doc, "right")?;
    for step in 1..=3 {
        let moved = engine.host_mut(id).ok_or_else(|| anyhow!("host"))?;
        let object = moved
            .node_for_element(right)
            .map(|node| node.object)
            .ok_or_else(|| anyhow!("right"))?;
        moved
            .scene_mut()
            .graph_mut()
            .get_mut(object)
            .ok_or_else(|| anyhow!("right object"))?
            .assign("position-x", &Value::Number(f64::from(step)))?;
        engine.frame(&doc, f64::from(step) * 16.0);
        assert!((number(&engine, id, left, "rotation-y")? - f64::from(step)).abs() < f64::EPSILON);
    }
    Ok(())
}

fn style_text(doc: &Document, index: usize) -> anyhow::Result<(NodeKey, NodeKey)> {
    let style = doc
        .get_elements_by_tag_name("style")
        .get(index)
        .copied()
        .ok_or_else(|| anyhow!("no style #{index}"))?;
    let text = doc.children(style).first().copied().ok_or_else(|| anyhow!("empty style"))?;
    Ok((style, text))
}

fn rebuilds(engine: &Engine, host: HostId) -> anyhow::Result<u64> {
    let host = engine.host(host).ok_or_else(|| anyhow!("host"))?;
    Ok(host.counters().stylesheet_rebuilds)
}

#[test]
fn several_style_edits_in_one_frame_rebuild_once() -> anyhow::Result<()> {
    init_logger();
    let mut doc = parse_markup(
        r#"<style>.box { --position-x: 1; }</style>
        <style>.box { --position-y: 1; }</style>
        <scene id="stage">
          <canvas></canvas>
          <mesh class="box" id="left"></mesh>
        </scene>"#,
    )?;
    let mut engine = Engine::new(
        HostConfig::default(),
        Box::new(HeadlessFactory::new()),
        Box::new(ManualLoader::new()),
    );
    let id = engine.attach(&doc, element(&doc, "stage")?)?;
    let left = element(&doc, "left")?;
    let before = rebuilds(&engine, id)?;

    let (_, first) = style_text(&doc, 0)?;
    let (_, second) = style_text(&doc, 1)?;
    doc.set_text(first, ".box { --position-x: 5; }")?;
    doc.set_text(second, ".box { --position-y: 6; }")?;
    doc.set_text(first, ".box { --position-x: 7; }")?;
    doc.commit();
    engine.frame(&doc, 16.0);

    assert_eq!(rebuilds(&engine, id)?, before + 1);
    assert!((number(&engine, id, left, "position-x")? - 7.0).abs() < f64::EPSILON);
    assert!((number(&engine, id, left, "position-y")? - 6.0).abs() < f64::EPSILON);

    engine.frame(&doc, 32.0);
    assert_eq!(rebuilds(&engine, id)?, before + 1, "quiet frames do not rebuild");
    Ok(())
}

#[test]
fn emptying_or_removing_a_style_drops_its_rules() -> anyhow::Result<()> {
    init_logger();
    let mut doc = parse_markup(
        r#"<style>.box:hover { --scale: 2; }</style>
        <style>#left:always { --rotation-y: 1; }</style>
        <scene id="stage">
          <canvas></canvas>
          <mesh class="box" id="left" style="--geometry: @box"></mesh>
        </scene>"#,
    )?;
    let mut engine = Engine::new(
        HostConfig::default(),
        Box::new(HeadlessFactory::new()),
        Box::new(ManualLoader::new()),
    );
    let id = engine.attach(&doc, element(&doc, "stage")?)?;
    let left = element(&doc, "left")?;
    let pickable = |running: &Engine| {
        running
            .host(id)
            .and_then(|host| host.node_for_element(left))
            .is_some_and(|node| node.pickable)
    };
    let always = |running: &Engine| {
        running
            .host(id)
            .is_some_and(|host| host.scene().always().contains(&left))
    };
    let before = rebuilds(&engine, id)?;
    assert!(pickable(&engine));
    assert!(always(&engine));

    let (hover_sheet, hover_text) = style_text(&doc, 0)?;
    let (always_sheet, _) = style_text(&doc, 1)?;
    doc.remove(hover_text)?;
    doc.commit();
    engine.frame(&doc, 16.0);
    assert!(doc.children(hover_sheet).is_empty());
    assert_eq!(rebuilds(&engine, id)?, before + 1);
    assert!(!pickable(&engine));
    assert!(always(&engine));

    doc.remove(always_sheet)?;
    doc.commit();
    engine.frame(&doc, 32.0);
    assert_eq!(rebuilds(&engine, id)?, before + 2);
    assert!(!always(&engine));
    Ok(())
}

#[test]
fn animations_started_before_a_late_first_frame_run_their_full_length() -> anyhow::Result<()> {
    let markup = stage(
        "@keyframes slide { from { --position-x: 0; } to { --position-x: 10; } }
         #left { --animation: slide 1000ms linear; }
         #right { --transition: 1000ms linear; }",
        r#"<mesh id="left"></mesh><mesh id="right"></mesh>"#,
    );
    let (mut doc, mut engine, id) = attach(&markup, &ManualLoader::new())?;
    let left = element(&doc, "left")?;
    let right = element(&doc, "right")?;
    doc.set_attribute(right, "style", "--position-y: 10")?;
    doc.commit();

    engine.frame(&doc, 5000.0);
    assert!(number(&engine, id, left, "position-x")? < 10.0);
    assert!(number(&engine, id, right, "position-y")? < 10.0);

    engine.frame(&doc, 5500.0);
    let slid = number(&engine, id, left, "position-x")?;
    let moved = number(&engine, id, right, "position-y")?;
    assert!(slid > 0.0 && slid < 10.0, "keyframe value {slid}");
    assert!(moved > 0.0 && moved < 10.0, "transition value {moved}");
    assert!(engine.drain_notices(id).is_empty());

    engine.frame(&doc, 6000.0);
    assert!((number(&engine, id, left, "position-x")? - 10.0).abs() < f64::EPSILON);
    assert!((number(&engine, id, right, "position-y")? - 10.0).abs() < f64::EPSILON);
    let notices = engine.drain_notices(id);
    assert!(notices.iter().any(|notice| matches!(notice, HostNotice::KeyframesFinished { name, .. } if name == "slide")));
    assert!(notices.contains(&HostNotice::TransitionFinished {
        node: right,
        property: "position-y".into(),
    }));
    Ok(())
}
