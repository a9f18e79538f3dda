use anyhow::anyhow;
use assets::ManualLoader;
use core::cell::RefCell;
use css::PseudoState;
use html::{Document, NodeKey, parse_markup};
use renderer::{HeadlessFactory, Value};
use scene_host::{Engine, HostConfig, HostId, PickEvent, PickKind, PointerAction, PointerInput};
use std::rc::Rc;

// Camera at z=10 looking down -Z on a 200x100 surface: the center pixel
// hits `left` at the origin, (120, 50) hits `right` at x=3.
const STAGE: &str = r#"
<style>
  .box { --geometry: @box; }
  .box:hover { --scale: 2; }
  #right { --position-x: 3; }
  #left:focus { --position-y: 1; }
</style>
<scene id="stage">
  <canvas width="200" height="100"></canvas>
  <perspective-camera style="--position-z: 10"></perspective-camera>
  <mesh id="left" onclick="spin" style="--geometry: @box"></mesh>
  <mesh id="right" class="box"></mesh>
  <mesh id="idle" class="plain" style="--geometry: @box; --position-x: -3"></mesh>
</scene>
"#;

const LEFT: (f64, f64) = (100.0, 50.0);
const RIGHT: (f64, f64) = (120.0, 50.0);
const IDLE: (f64, f64) = (80.0, 50.0);
const EMPTY: (f64, f64) = (5.0, 5.0);

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn element(doc: &Document, id: &str) -> anyhow::Result<NodeKey> {
    doc.get_element_by_id(id)
        .ok_or_else(|| anyhow!("no element #{id}"))
}

fn attach() -> anyhow::Result<(Document, Engine, HostId)> {
    init_logger();
    let doc = parse_markup(STAGE)?;
    let mut engine = Engine::new(
        HostConfig::default(),
        Box::new(HeadlessFactory::new()),
        Box::new(ManualLoader::new()),
    );
    let id = engine.attach(&doc, element(&doc, "stage")?)?;
    engine.frame(&doc, 16.0);
    Ok((doc, engine, id))
}

fn send(
    engine: &mut Engine,
    doc: &Document,
    host: HostId,
    action: PointerAction,
    (x, y): (f64, f64),
) -> Vec<(PickKind, NodeKey)> {
    engine
        .dispatch_pointer(doc, host, PointerInput::new(action, x, y))
        .iter()
        .map(|event| (event.kind, event.source_element))
        .collect()
}

fn has_flag(engine: &Engine, host: HostId, element: NodeKey, flag: PseudoState) -> bool {
    engine
        .host(host)
        .and_then(|target| target.node_for_element(element))
        .is_some_and(|node| node.has_flag(flag))
}

#[test]
fn moving_between_nodes_leaves_before_entering() -> anyhow::Result<()> {
    let (doc, mut engine, id) = attach()?;
    let left = element(&doc, "left")?;
    let right = element(&doc, "right")?;

    assert_eq!(
        send(&mut engine, &doc, id, PointerAction::Move, LEFT),
        vec![(PickKind::PointerEnter, left), (PickKind::PointerHover, left)]
    );
    assert_eq!(
        send(&mut engine, &doc, id, PointerAction::Move, LEFT),
        vec![(PickKind::PointerHover, left)]
    );
    assert_eq!(
        send(&mut engine, &doc, id, PointerAction::Move, RIGHT),
        vec![
            (PickKind::PointerLeave, left),
            (PickKind::PointerEnter, right),
            (PickKind::PointerHover, right),
        ]
    );
    assert_eq!(
        send(&mut engine, &doc, id, PointerAction::Move, EMPTY),
        vec![(PickKind::PointerLeave, right)]
    );
    assert!(send(&mut engine, &doc, id, PointerAction::Move, EMPTY).is_empty());
    Ok(())
}

#[test]
fn nodes_without_interaction_are_not_pickable() -> anyhow::Result<()> {
    let (doc, mut engine, id) = attach()?;
    let idle = element(&doc, "idle")?;
    let host = engine.host(id).ok_or_else(|| anyhow!("host"))?;
    assert!(!host.node_for_element(idle).is_some_and(|node| node.pickable));
    assert!(send(&mut engine, &doc, id, PointerAction::Move, IDLE).is_empty());
    Ok(())
}

#[test]
fn hover_rules_apply_and_revert_with_the_pointer() -> anyhow::Result<()> {
    let (doc, mut engine, id) = attach()?;
    let right = element(&doc, "right")?;
    send(&mut engine, &doc, id, PointerAction::Move, RIGHT);
    assert!(has_flag(&engine, id, right, PseudoState::Hover));
    assert_eq!(engine.read(id, right, "scale-x"), Some(Value::Number(2.0)));

    send(&mut engine, &doc, id, PointerAction::Move, EMPTY);
    assert!(!has_flag(&engine, id, right, PseudoState::Hover));
    // Leaving does not undo a property the base layer never sets.
    assert_eq!(engine.read(id, right, "scale-x"), Some(Value::Number(2.0)));
    Ok(())
}

#[test]
fn click_focuses_and_calls_both_handler_kinds() -> anyhow::Result<()> {
    let (doc, mut engine, id) = attach()?;
    let left = element(&doc, "left")?;
    let right = element(&doc, "right")?;
    let named: Rc<RefCell<Vec<NodeKey>>> = Rc::default();
    let direct: Rc<RefCell<Vec<PickKind>>> = Rc::default();

    let sink = Rc::clone(&named);
    assert!(engine.register_callback(
        "spin",
        Box::new(move |event: &PickEvent| sink.borrow_mut().push(event.source_element)),
    ));
    let sink = Rc::clone(&direct);
    engine.set_handler(
        left,
        PickKind::Click,
        Box::new(move |event: &PickEvent| sink.borrow_mut().push(event.kind)),
    );

    send(&mut engine, &doc, id, PointerAction::Move, RIGHT);
    assert_eq!(
        send(&mut engine, &doc, id, PointerAction::Click, RIGHT),
        vec![(PickKind::Click, right)]
    );
    assert!(has_flag(&engine, id, right, PseudoState::Focus));

    send(&mut engine, &doc, id, PointerAction::Move, LEFT);
    assert_eq!(
        send(&mut engine, &doc, id, PointerAction::Click, LEFT),
        vec![(PickKind::Click, left)]
    );
    assert!(has_flag(&engine, id, left, PseudoState::Focus));
    assert!(!has_flag(&engine, id, right, PseudoState::Focus));
    assert_eq!(engine.read(id, left, "position-y"), Some(Value::Number(1.0)));

    assert_eq!(*named.borrow(), vec![left]);
    assert_eq!(*direct.borrow(), vec![PickKind::Click]);
    Ok(())
}

#[test]
fn press_and_release_toggle_active() -> anyhow::Result<()> {
    let (doc, mut engine, id) = attach()?;
    let left = element(&doc, "left")?;
    send(&mut engine, &doc, id, PointerAction::Move, LEFT);

    assert_eq!(
        send(&mut engine, &doc, id, PointerAction::Down, LEFT),
        vec![(PickKind::MouseDown, left)]
    );
    assert!(has_flag(&engine, id, left, PseudoState::Active));

    // Releasing elsewhere still clears the pressed node.
    send(&mut engine, &doc, id, PointerAction::Move, EMPTY);
    assert!(send(&mut engine, &doc, id, PointerAction::Up, EMPTY).is_empty());
    assert!(!has_flag(&engine, id, left, PseudoState::Active));
    Ok(())
}

#[test]
fn context_menu_suppresses_the_default_action() -> anyhow::Result<()> {
    let (doc, mut engine, id) = attach()?;
    send(&mut engine, &doc, id, PointerAction::Move, LEFT);
    let events = engine.dispatch_pointer(
        &doc,
        id,
        PointerInput::new(PointerAction::ContextMenu, LEFT.0, LEFT.1),
    );
    let event = events.first().ok_or_else(|| anyhow!("no context-menu event"))?;
    assert_eq!(event.kind, PickKind::ContextMenu);
    assert!(event.suppress_default);
    assert_eq!(event.host, id);
    assert!(event.point.z > 0.0, "hit the front face, got {:?}", event.point);
    Ok(())
}

#[test]
fn handlers_installed_later_make_nodes_pickable() -> anyhow::Result<()> {
    let (doc, mut engine, id) = attach()?;
    let idle = element(&doc, "idle")?;
    engine.set_handler(idle, PickKind::PointerEnter, Box::new(|_: &PickEvent| {}));
    engine.frame(&doc, 32.0);
    assert_eq!(
        send(&mut engine, &doc, id, PointerAction::Move, IDLE),
        vec![(PickKind::PointerEnter, idle), (PickKind::PointerHover, idle)]
    );

    assert!(engine.remove_handler(idle, PickKind::PointerEnter));
    engine.frame(&doc, 48.0);
    send(&mut engine, &doc, id, PointerAction::Move, EMPTY);
    assert!(send(&mut engine, &doc, id, PointerAction::Move, IDLE).is_empty());
    Ok(())
}
