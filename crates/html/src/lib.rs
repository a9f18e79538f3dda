#![allow(
    clippy::missing_docs_in_private_items,
    reason = "Internal implementation details don't need public documentation"
)]
#![allow(
    clippy::missing_inline_in_public_items,
    reason = "Inlining decisions left to compiler for this crate"
)]
#![allow(
    clippy::min_ident_chars,
    reason = "Short variable names acceptable in parsing context"
)]
//! Source document tree observed by the scene engine.
//!
//! The [`dom::Document`] owns every element; consumers only hold [`dom::NodeKey`]s
//! and learn about changes through committed [`dom::DOMUpdate`] batches.

pub mod dom;
pub mod parser;

pub use dom::{
    DOMMirror, DOMNode, DOMSubscriber, DOMUpdate, Document, MirrorStatus, NodeKey, NodeKind,
};
pub use parser::parse_markup;
