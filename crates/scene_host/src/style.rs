//! Applies stylesheet and inline rules to scene nodes.
//!
//! A node's rules apply in layers, each able to overwrite the one before:
//!
//! ```text
//! tag -> classes (class-list order) -> id -> :always -> pseudo states (flag order) -> inline
//! ```
//!
//! Within a layer, rules apply in stylesheet source order.

use crate::events::{HandlerTable, PickKind};
use crate::state::{DeferredAssignment, HostNotice, HostScene};
use animation::{
    Animator, Easing, IterationCount, KeyframePoint, KeyframeRunSpec, PropertyWriter, TweenSpec,
    ValueSource,
};
use assets::{AssetFuture, AssetPoll, AssetRegistry};
use core::cell::RefCell;
use core::mem;
use core::task::Poll;
use csscolorparser::Color;
use css::values::node_ref_candidates;
use css::{
    ControlUpdate, Declaration, Iterations, PropertyKind, PropertyValue, PseudoState, RuleDB,
    parse_animation, parse_inline, parse_transition, parse_value,
};
use html::{Document, NodeKey};
use log::{debug, warn};
use renderer::Value;
use std::rc::Rc;

pub type HostAnimator = Animator<HostScene, Value>;

/// A raw value after resolution.
enum Resolved {
    Now(Value),
    /// An asset still loading; assigned once it settles.
    Deferred { name: String, pending: AssetFuture },
    Unresolved,
}

fn tween_key(element: NodeKey, path: &str) -> String {
    format!("{}:{path}", element.0)
}

fn literal(value: PropertyValue) -> Option<Value> {
    match value {
        PropertyValue::Array(items) => Some(Value::Array(items)),
        PropertyValue::Number(number) => Some(Value::Number(number)),
        PropertyValue::Bool(flag) => Some(Value::Bool(flag)),
        PropertyValue::Text(text) => Some(Value::Text(text)),
        PropertyValue::AssetRef(_) | PropertyValue::NodeRef(_) => None,
    }
}

/// `#rrggbb` and friends parse as node references; fall back to a color literal.
fn color_literal(reference: &str) -> Option<Value> {
    let text = format!("#{reference}");
    text.parse::<Color>().is_ok().then(|| Value::Text(text))
}

/// Read a property of another node in the same host: `#id` or `#id-path`.
/// Without a path the referencing property's own path is read.
pub fn resolve_reference(scene: &HostScene, reference: &str, own_path: &str) -> Option<Value> {
    for (id, path) in node_ref_candidates(reference) {
        let Some(target) = scene.ids(id).first().copied() else {
            continue;
        };
        return scene.read(target, path.unwrap_or(own_path));
    }
    None
}

/// True when the element declares any `on*` handler attribute.
pub fn has_handler_attribute(doc: &Document, element: NodeKey) -> bool {
    PickKind::ALL
        .iter()
        .any(|kind| doc.attr(element, kind.attribute()).is_some())
}

/// Borrowed context for painting nodes of one host.
pub struct StyleResolver<'ctx> {
    pub doc: &'ctx Document,
    pub rules: &'ctx RuleDB,
    pub assets: &'ctx Rc<RefCell<AssetRegistry>>,
    pub handlers: &'ctx HandlerTable,
}

impl StyleResolver<'_> {
    /// Declaration blocks that apply to `element`, lowest layer first.
    pub fn cascade(&self, scene: &HostScene, element: NodeKey) -> Vec<Rc<[Declaration]>> {
        let Some(node) = scene.node(element) else {
            return Vec::new();
        };
        let keys = node.selector_keys();
        let mut blocks: Vec<Rc<[Declaration]>> = Vec::new();
        let mut layer = |pseudo: Option<PseudoState>| {
            for key in &keys {
                blocks.extend(
                    self.rules
                        .rules_for(key, pseudo)
                        .iter()
                        .map(|entry| Rc::clone(&entry.declarations)),
                );
            }
        };
        layer(None);
        layer(Some(PseudoState::Always));
        for flag in &node.flags {
            if *flag != PseudoState::Always {
                layer(Some(*flag));
            }
        }
        if let Some(inline) = self.inline_block(element) {
            blocks.push(inline);
        }
        blocks
    }

    fn inline_block(&self, element: NodeKey) -> Option<Rc<[Declaration]>> {
        let style = self.doc.attr(element, "style")?;
        let rule = parse_inline(style);
        (!rule.is_empty()).then(|| Rc::from(rule.declarations))
    }

    /// Repaint every layer of `element`.
    pub fn paint_node(&self, scene: &mut HostScene, animator: &mut HostAnimator, element: NodeKey) {
        if scene.node(element).is_none() {
            return;
        }
        self.refresh_membership(scene, element);
        for block in self.cascade(scene, element) {
            self.apply_declarations(scene, animator, element, &block);
        }
        self.start_keyframes(scene, animator, element);
    }

    /// Apply one rule to `element`.
    pub fn paint_rule(
        &self,
        scene: &mut HostScene,
        animator: &mut HostAnimator,
        element: NodeKey,
        declarations: &[Declaration],
    ) {
        if scene.node(element).is_none() {
            return;
        }
        self.refresh_membership(scene, element);
        self.apply_declarations(scene, animator, element, declarations);
        self.start_keyframes(scene, animator, element);
    }

    /// Re-apply only the inline declarations of `element`.
    pub fn paint_inline(&self, scene: &mut HostScene, animator: &mut HostAnimator, element: NodeKey) {
        let block = self.inline_block(element);
        self.paint_rule(scene, animator, element, block.as_deref().unwrap_or_default());
    }

    /// Re-apply the `:always` rules of every flagged node.
    pub fn paint_always(&self, scene: &mut HostScene, animator: &mut HostAnimator) -> usize {
        let flagged: Vec<NodeKey> = scene.always().iter().copied().collect();
        for element in &flagged {
            let Some(node) = scene.node(*element) else {
                continue;
            };
            let blocks: Vec<Rc<[Declaration]>> = node
                .selector_keys()
                .iter()
                .flat_map(|key| self.rules.rules_for(key, Some(PseudoState::Always)))
                .map(|entry| Rc::clone(&entry.declarations))
                .collect();
            for block in blocks {
                self.paint_rule(scene, animator, *element, &block);
            }
        }
        flagged.len()
    }

    /// Recompute pickability and always-set membership from the loaded rules.
    pub fn refresh_membership(&self, scene: &mut HostScene, element: NodeKey) {
        let Some(node) = scene.node(element) else {
            return;
        };
        let keys = node.selector_keys();
        let pickable = has_handler_attribute(self.doc, element)
            || self.handlers.has_any(element)
            || self.rules.has_interaction_rule(&keys);
        let always = self.rules.has_always_rule(&keys);
        scene.set_pickable(element, pickable);
        scene.set_always(element, always);
    }

    fn apply_declarations(
        &self,
        scene: &mut HostScene,
        animator: &mut HostAnimator,
        element: NodeKey,
        declarations: &[Declaration],
    ) {
        for declaration in declarations {
            match declaration.kind() {
                PropertyKind::Transition => {
                    let update = parse_transition(&declaration.value);
                    let Some(node) = scene.nodes.get_mut(&element) else {
                        return;
                    };
                    match update {
                        ControlUpdate::Set(spec) => node.transition = Some(spec),
                        ControlUpdate::Clear => node.transition = None,
                        ControlUpdate::Invalid => {}
                    }
                }
                PropertyKind::Animation => {
                    let update = parse_animation(&declaration.value);
                    let Some(node) = scene.nodes.get_mut(&element) else {
                        return;
                    };
                    match update {
                        ControlUpdate::Set(spec) => node.animation = Some(spec),
                        ControlUpdate::Clear => node.animation = None,
                        ControlUpdate::Invalid => {}
                    }
                }
                PropertyKind::Path(path) => {
                    self.apply_property(scene, animator, element, path, &declaration.value);
                }
            }
        }
    }

    fn apply_property(
        &self,
        scene: &mut HostScene,
        animator: &mut HostAnimator,
        element: NodeKey,
        path: &str,
        raw: &str,
    ) {
        match self.resolve(scene, path, raw) {
            Resolved::Now(value) => assign(scene, animator, element, path, value),
            Resolved::Deferred { name, pending } => {
                debug!("`--{path}` on {element:?} waits for asset `{name}`");
                scene
                    .deferred
                    .retain(|waiting| waiting.node != element || waiting.property != path);
                scene.deferred.push(DeferredAssignment {
                    node: element,
                    property: path.to_owned(),
                    name,
                    pending,
                });
            }
            Resolved::Unresolved => {}
        }
    }

    fn resolve(&self, scene: &HostScene, path: &str, raw: &str) -> Resolved {
        match parse_value(raw) {
            PropertyValue::AssetRef(name) => {
                let requested = self.assets.borrow_mut().request(&name);
                let Some(pending) = requested else {
                    return Resolved::Unresolved;
                };
                let polled = self.assets.borrow_mut().poll(&name, &pending);
                match polled {
                    AssetPoll::Ready(value) => Resolved::Now(Value::Resource(value)),
                    AssetPoll::Pending => Resolved::Deferred { name, pending },
                    AssetPoll::Failed => Resolved::Unresolved,
                }
            }
            PropertyValue::NodeRef(reference) => {
                match resolve_reference(scene, &reference, path).or_else(|| color_literal(&reference)) {
                    Some(value) => Resolved::Now(value),
                    None => {
                        warn!("Cannot resolve `#{reference}` for `--{path}`");
                        Resolved::Unresolved
                    }
                }
            }
            other => literal(other).map_or(Resolved::Unresolved, Resolved::Now),
        }
    }

    /// Assign settled asset loads; failed loads leave their property untouched.
    pub fn resolve_deferred(&self, scene: &mut HostScene, animator: &mut HostAnimator) -> usize {
        let waiting = mem::take(&mut scene.deferred);
        for assignment in waiting {
            let polled = self
                .assets
                .borrow_mut()
                .poll(&assignment.name, &assignment.pending);
            match polled {
                AssetPoll::Ready(value) => assign(
                    scene,
                    animator,
                    assignment.node,
                    &assignment.property,
                    Value::Resource(value),
                ),
                AssetPoll::Pending => scene.deferred.push(assignment),
                AssetPoll::Failed => warn!(
                    "`--{}` on {:?} stays unresolved: asset `{}` failed",
                    assignment.property, assignment.node, assignment.name
                ),
            }
        }
        scene.deferred.len()
    }

    fn value_source(&self, path: &str, raw: &str) -> ValueSource<HostScene, Value> {
        match parse_value(raw) {
            PropertyValue::AssetRef(name) => {
                let requested = self.assets.borrow_mut().request(&name);
                let Some(pending) = requested else {
                    return Rc::new(|_: &mut HostScene| Poll::Ready(None));
                };
                let assets = Rc::clone(self.assets);
                Rc::new(move |_: &mut HostScene| {
                    match assets.borrow_mut().poll(&name, &pending) {
                        AssetPoll::Ready(value) => Poll::Ready(Some(Value::Resource(value))),
                        AssetPoll::Pending => Poll::Pending,
                        AssetPoll::Failed => Poll::Ready(None),
                    }
                })
            }
            PropertyValue::NodeRef(reference) => {
                let own_path = path.to_owned();
                Rc::new(move |scene: &mut HostScene| {
                    Poll::Ready(
                        resolve_reference(scene, &reference, &own_path)
                            .or_else(|| color_literal(&reference)),
                    )
                })
            }
            other => {
                let value = literal(other);
                Rc::new(move |_: &mut HostScene| Poll::Ready(value.clone()))
            }
        }
    }

    /// Start the node's keyframe run unless one is already going.
    fn start_keyframes(&self, scene: &mut HostScene, animator: &mut HostAnimator, element: NodeKey) {
        let Some(node) = scene.node(element) else {
            return;
        };
        let Some(spec) = node.animation.clone() else {
            return;
        };
        if node.is_running() {
            return;
        }
        let Some(sequence) = self.rules.keyframes(&spec.name) else {
            warn!("No @keyframes named `{}` for {element:?}", spec.name);
            return;
        };
        let frames: Vec<KeyframePoint<HostScene, Value>> = sequence
            .resolve(spec.duration_ms)
            .into_iter()
            .map(|frame| KeyframePoint {
                offset_ms: frame.offset_ms,
                values: frame
                    .declarations
                    .iter()
                    .filter_map(|declaration| match declaration.kind() {
                        PropertyKind::Path(path) => {
                            Some((path.to_owned(), self.value_source(path, &declaration.value)))
                        }
                        PropertyKind::Transition | PropertyKind::Animation => None,
                    })
                    .collect(),
            })
            .collect();
        let writer: PropertyWriter<HostScene, Value> =
            Rc::new(move |ctx: &mut HostScene, path: &str, value: &Value| {
                ctx.write(element, path, value);
            });
        let name = spec.name.clone();
        let handle = animator.start_run(
            scene,
            KeyframeRunSpec {
                frames,
                iterations: match spec.iterations {
                    Iterations::Count(count) => IterationCount::Count(count),
                    Iterations::Infinite => IterationCount::Infinite,
                },
                easing: Easing::parse(&spec.easing),
                writer,
                key_prefix: tween_key(element, ""),
                on_complete: Some(Box::new(move |ctx: &mut HostScene| {
                    ctx.notices
                        .push(HostNotice::KeyframesFinished { node: element, name });
                })),
            },
        );
        debug!("Started keyframes `{}` on {element:?}", spec.name);
        if let Some(entry) = scene.nodes.get_mut(&element) {
            entry.run = Some(handle);
        }
    }
}

/// Write `value` to `path`, animating when the node has an active transition
/// and both ends are numeric.
fn assign(
    scene: &mut HostScene,
    animator: &mut HostAnimator,
    element: NodeKey,
    path: &str,
    value: Value,
) {
    scene
        .deferred
        .retain(|waiting| waiting.node != element || waiting.property != path);
    let key = tween_key(element, path);
    let Some(node) = scene.node(element) else {
        return;
    };
    let transition = node
        .transition
        .clone()
        .filter(|spec| spec.duration_ms.is_finite() && spec.duration_ms > 0.0);
    let heading_there = node.targets.get(path) == Some(&value);
    let current = scene.read(element, path);
    if let Some(transition) = transition
        && value.is_numeric()
        && let Some(current) = current.filter(Value::is_numeric)
        && current != value
    {
        if heading_there && animator.is_animating(&key) {
            return;
        }
        if let Some(entry) = scene.nodes.get_mut(&element) {
            entry.targets.insert(path.to_owned(), value.clone());
        }
        let write_path = path.to_owned();
        let done_path = path.to_owned();
        animator.animate(
            scene,
            TweenSpec {
                from: current,
                to: value,
                duration_ms: transition.duration_ms,
                easing: Easing::parse(&transition.easing),
                key: Some(key),
            },
            Box::new(move |ctx: &mut HostScene, sample: &Value, _: f64| {
                ctx.write(element, &write_path, sample);
            }),
            Some(Box::new(move |ctx: &mut HostScene, last: &Value| {
                if let Some(entry) = ctx.nodes.get_mut(&element)
                    && entry.targets.get(&done_path) == Some(last)
                {
                    entry.targets.remove(&done_path);
                }
                ctx.notices.push(HostNotice::TransitionFinished {
                    node: element,
                    property: done_path,
                });
            })),
        );
        return;
    }
    animator.supersede(&key);
    if let Some(entry) = scene.nodes.get_mut(&element) {
        entry.targets.remove(path);
    }
    scene.write(element, path, &value);
}
