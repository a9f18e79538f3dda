use core::fmt;

use super::{DOMNode, Document, NodeKind};
use indextree::NodeId;

use serde_json::{Map, Value, json};

fn flush_text(children: &mut Vec<Value>, text_buf: &mut String) {
    if !text_buf.trim().is_empty() {
        children.push(json!({ "type": "text", "text": text_buf.clone() }));
    }
    text_buf.clear();
}

fn coalesce_children(doc: &Document, id: NodeId) -> Vec<Value> {
    let mut children: Vec<Value> = Vec::new();
    let mut text_buf = String::new();
    for child in id.children(&doc.dom) {
        let Some(child_ref) = doc.dom.get(child) else {
            continue;
        };
        if let NodeKind::Text { text } = &child_ref.get().kind {
            text_buf.push_str(text);
            continue;
        }
        flush_text(&mut children, &mut text_buf);
        let value = node_to_json(doc, child);
        if !value.is_null() {
            children.push(value);
        }
    }
    flush_text(&mut children, &mut text_buf);
    children
}

fn node_to_json(doc: &Document, id: NodeId) -> Value {
    let Some(node_ref) = doc.dom.get(id) else {
        return Value::Null;
    };
    let DOMNode { kind, attrs, .. } = node_ref.get();
    match kind {
        NodeKind::Document => json!({ "type": "document", "children": coalesce_children(doc, id) }),
        NodeKind::Element { tag } => {
            // Sorted for deterministic snapshots
            let mut pairs: Vec<&(String, String)> = attrs.iter().collect();
            pairs.sort_by(|left, right| left.0.cmp(&right.0));
            let mut attrs_obj = Map::new();
            for (name, value) in pairs {
                attrs_obj.insert(name.clone(), Value::String(value.clone()));
            }
            json!({
                "type": "element",
                "tag": tag.to_lowercase(),
                "attrs": Value::Object(attrs_obj),
                "children": coalesce_children(doc, id),
            })
        }
        NodeKind::Text { text } => {
            if text.trim().is_empty() {
                Value::Null
            } else {
                json!({ "type": "text", "text": text })
            }
        }
    }
}

fn write_indent(out: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
    for _ in 0..depth {
        out.write_str("  ")?;
    }
    Ok(())
}

fn fmt_node(doc: &Document, id: NodeId, out: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
    let Some(node_ref) = doc.dom.get(id) else {
        return Ok(());
    };
    let DOMNode { kind, attrs, .. } = node_ref.get();
    match kind {
        NodeKind::Document => {
            writeln!(out, "#document")?;
        }
        NodeKind::Element { tag } => {
            write_indent(out, depth)?;
            write!(out, "<{}", tag.to_lowercase())?;
            for (name, value) in attrs {
                write!(out, " {name}={value:?}")?;
            }
            writeln!(out, ">")?;
        }
        NodeKind::Text { text } => {
            if text.chars().all(char::is_whitespace) {
                return Ok(());
            }
            write_indent(out, depth)?;
            writeln!(out, "{text:?}")?;
        }
    }
    for child in id.children(&doc.dom) {
        fmt_node(doc, child, out, depth + 1)?;
    }
    Ok(())
}

impl fmt::Debug for Document {
    fn fmt(&self, out: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_node(self, self.root, out, 0)
    }
}

impl Document {
    /// Deterministic JSON snapshot of the connected tree.
    /// - Document: `{ "type":"document", "children":[ ... ] }`
    /// - Element: `{ "type":"element", "tag": "mesh", "attrs": {..}, "children":[ ... ] }`
    /// - Text: `{ "type":"text", "text":"..." }`
    pub fn to_json_value(&self) -> Value {
        node_to_json(self, self.root)
    }

    /// Pretty JSON string for snapshots and test comparisons.
    pub fn to_json_string(&self) -> String {
        serde_json::to_string_pretty(&self.to_json_value()).unwrap_or_else(|_| String::from("{}"))
    }
}
