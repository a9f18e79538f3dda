//! Markup ingestion through html5ever.
//!
//! The tree builder always synthesizes `html`/`head`/`body` wrappers; they are
//! flattened away so authored elements land directly under the target parent.

use crate::dom::{Document, NodeKey};
use anyhow::{Context as _, Result};
use html5ever::tendril::TendrilSink as _;
use html5ever::tree_builder::TreeBuilderOpts;
use html5ever::{ParseOpts, parse_document};
use markup5ever_rcdom::{Handle, NodeData, RcDom};

const WRAPPER_TAGS: [&str; 3] = ["html", "head", "body"];

fn parse_rcdom(markup: &str) -> Result<RcDom> {
    let opts = ParseOpts {
        tree_builder: TreeBuilderOpts {
            exact_errors: false,
            scripting_enabled: false,
            ..TreeBuilderOpts::default()
        },
        ..ParseOpts::default()
    };
    parse_document(RcDom::default(), opts)
        .from_utf8()
        .read_from(&mut markup.as_bytes())
        .context("Failed to parse markup")
}

/// Build detached document nodes for `handle`, pushing top-level keys into `out`.
fn build_into(doc: &mut Document, handle: &Handle, out: &mut Vec<NodeKey>) -> Result<()> {
    match &handle.data {
        NodeData::Document => {
            for child in handle.children.borrow().iter() {
                build_into(doc, child, out)?;
            }
        }
        NodeData::Element { name, attrs, .. } => {
            let tag = name.local.to_string();
            if WRAPPER_TAGS.contains(&tag.as_str()) {
                for child in handle.children.borrow().iter() {
                    build_into(doc, child, out)?;
                }
                return Ok(());
            }
            let node = doc.create_element(&tag);
            for attr in attrs.borrow().iter() {
                doc.set_attribute(node, &attr.name.local, &attr.value)?;
            }
            let mut kids = Vec::new();
            for child in handle.children.borrow().iter() {
                build_into(doc, child, &mut kids)?;
            }
            for kid in kids {
                doc.append_child(node, kid)?;
            }
            out.push(node);
        }
        NodeData::Text { contents } => {
            let text = contents.borrow().to_string();
            if !text.trim().is_empty() {
                out.push(doc.create_text(&text));
            }
        }
        _ => {
            // Comments, doctypes and processing instructions carry nothing for the scene.
        }
    }
    Ok(())
}

impl Document {
    /// Parse `markup` and append the resulting nodes under `parent`.
    /// Returns the keys of the appended top-level nodes.
    ///
    /// # Errors
    /// Returns an error if the markup cannot be read or `parent` is unknown.
    pub fn append_markup(&mut self, parent: NodeKey, markup: &str) -> Result<Vec<NodeKey>> {
        let dom = parse_rcdom(markup)?;
        let mut top = Vec::new();
        build_into(self, &dom.document, &mut top)?;
        for node in &top {
            self.append_child(parent, *node)?;
        }
        Ok(top)
    }
}

/// Parse a complete markup document. The construction batch is committed before
/// returning, so subscribers only observe later mutations.
///
/// # Errors
/// Returns an error if the markup cannot be read.
pub fn parse_markup(markup: &str) -> Result<Document> {
    let mut doc = Document::new();
    doc.append_markup(NodeKey::ROOT, markup)?;
    doc.end_of_document();
    doc.commit();
    Ok(doc)
}
