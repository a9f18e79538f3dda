//! Typed stylesheet construction on top of `css_syntax`.

use crate::keyframes::KeyframeSequence;
use crate::selector::parse_selector_list;
use crate::types::{AssetDeclaration, Declaration, Rule, Stylesheet};
use css_syntax::{AtBlock, parse_declaration_list, parse_stylesheet as parse_syntax_stylesheet};
use log::{debug, warn};

/// At-rule identifiers with structural meaning; never treated as asset declarations.
pub const RESERVED_AT_RULES: [&str; 15] = [
    "keyframes",
    "media",
    "import",
    "font-face",
    "supports",
    "page",
    "charset",
    "namespace",
    "layer",
    "container",
    "property",
    "counter-style",
    "font-feature-values",
    "document",
    "viewport",
];

/// Internal top-level state used when emitting `Rule`s from a parsed stylesheet.
struct EmitState {
    /// Next source order to assign; monotonically increases per produced rule.
    order: u32,
}

fn custom_declarations(raw: &[css_syntax::Declaration]) -> Vec<Declaration> {
    raw.iter()
        .filter_map(|decl| {
            let parsed = Declaration::from_raw(&decl.name, &decl.value);
            if parsed.is_none() {
                debug!("Ignoring non-custom property `{}`", decl.name);
            }
            parsed
        })
        .collect()
}

fn unquote(value: &str) -> &str {
    let value = value.trim();
    value
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .or_else(|| {
            value
                .strip_prefix('\'')
                .and_then(|rest| rest.strip_suffix('\''))
        })
        .unwrap_or(value)
}

/// Interpret a non-reserved block at-rule as an asset declaration.
pub fn asset_from_block(block: &AtBlock) -> Option<AssetDeclaration> {
    if RESERVED_AT_RULES.contains(&block.name.as_str()) {
        return None;
    }
    let field = |key: &str| {
        block
            .declarations
            .iter()
            .rev()
            .find(|decl| decl.name == key)
            .map(|decl| unquote(&decl.value).to_owned())
    };
    let Some(url) = field("url").filter(|url| !url.is_empty()) else {
        warn!("Asset declaration @{} has no url; skipped", block.name);
        return None;
    };
    let name = field("name")
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| block.name.clone());
    Some(AssetDeclaration { name, url })
}

/// Parse a stylesheet string and return it together with the next source order.
pub fn parse_stylesheet_with_next(css: &str, base_rule_idx: u32) -> (Stylesheet, u32) {
    let parsed = parse_syntax_stylesheet(css);
    let mut state = EmitState {
        order: base_rule_idx,
    };
    let mut sheet = Stylesheet::default();
    for style_rule in parsed.rules {
        let selectors = parse_selector_list(&style_rule.prelude);
        if selectors.is_empty() {
            continue;
        }
        sheet.rules.push(Rule {
            selectors,
            declarations: custom_declarations(&style_rule.declarations),
            source_order: state.order,
        });
        state.order = state.order.saturating_add(1);
    }
    sheet.keyframes = parsed
        .keyframes
        .iter()
        .map(KeyframeSequence::from_syntax)
        .collect();
    for block in &parsed.blocks {
        if RESERVED_AT_RULES.contains(&block.name.as_str()) {
            debug!("Ignoring @{} block", block.name);
            continue;
        }
        if let Some(asset) = asset_from_block(block) {
            sheet.assets.push(asset);
        }
    }
    (sheet, state.order)
}

/// Parse a stylesheet string starting at source order `base_rule_idx`.
pub fn parse_stylesheet(css: &str, base_rule_idx: u32) -> Stylesheet {
    parse_stylesheet_with_next(css, base_rule_idx).0
}

/// Parse an inline `style` attribute into a selector-less rule.
pub fn parse_inline(style: &str) -> Rule {
    Rule {
        selectors: Vec::new(),
        declarations: custom_declarations(&parse_declaration_list(style)),
        source_order: u32::MAX,
    }
}
