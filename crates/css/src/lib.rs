//! Typed stylesheet layer for scene markup.
//!
//! Turns raw `css_syntax` output into selectors, custom-property rules, keyframe
//! sequences and asset declarations, and indexes them in a [`RuleDB`].

pub mod keyframes;
pub mod parser;
pub mod ruledb;
pub mod selector;
pub mod sheet_set;
pub mod types;
pub mod values;

pub use html::NodeKey;
pub use keyframes::{KeyframeBlock, KeyframeSelector, KeyframeSequence, ResolvedFrame};
pub use parser::{RESERVED_AT_RULES, parse_inline, parse_stylesheet};
pub use ruledb::{RuleDB, RuleEntry};
pub use selector::{CompoundSelector, PseudoState, SelectorKey, selector_keys};
pub use sheet_set::StyleSheetSet;
pub use types::{AssetDeclaration, Declaration, PropertyKind, Rule, Stylesheet};
pub use values::{
    AnimationSpec, ControlUpdate, Iterations, PropertyValue, TransitionSpec, parse_animation,
    parse_transition, parse_value,
};
