use crate::keyframes::KeyframeSequence;
use crate::selector::CompoundSelector;
use core::fmt;

/// Control property holding the transition settings.
pub const TRANSITION_PROPERTY: &str = "transition";
/// Control property holding the keyframe animation settings.
pub const ANIMATION_PROPERTY: &str = "animation";

/// A custom-property declaration, stored without its leading `--`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Declaration {
    /// Dash path into the scene node (`position-x`), or a control property name.
    pub name: String,
    /// Raw value text.
    pub value: String,
}

/// What a declaration addresses.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PropertyKind<'decl> {
    Transition,
    Animation,
    Path(&'decl str),
}

impl Declaration {
    /// Build from a raw stylesheet declaration; `None` for non-custom properties.
    pub fn from_raw(name: &str, value: &str) -> Option<Self> {
        let path = name.strip_prefix("--")?;
        if path.is_empty() {
            return None;
        }
        Some(Self {
            name: path.to_owned(),
            value: value.trim().to_owned(),
        })
    }

    pub fn kind(&self) -> PropertyKind<'_> {
        match self.name.as_str() {
            TRANSITION_PROPERTY => PropertyKind::Transition,
            ANIMATION_PROPERTY => PropertyKind::Animation,
            path => PropertyKind::Path(path),
        }
    }
}

impl fmt::Display for Declaration {
    fn fmt(&self, out: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(out, "--{}: {}", self.name, self.value)
    }
}

/// An ordered list of property assignments, optionally tied to a selector list.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Rule {
    /// Empty for inline declaration blocks.
    pub selectors: Vec<CompoundSelector>,
    pub declarations: Vec<Declaration>,
    /// Source order for stability across sheets.
    pub source_order: u32,
}

impl Rule {
    /// Last declared raw value for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.declarations
            .iter()
            .rev()
            .find(|decl| decl.name == name)
            .map(|decl| decl.value.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }
}

/// A stylesheet-declared external asset.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AssetDeclaration {
    pub name: String,
    pub url: String,
}

/// One parsed `<style>` source.
#[derive(Clone, Debug, Default)]
pub struct Stylesheet {
    pub rules: Vec<Rule>,
    pub keyframes: Vec<KeyframeSequence>,
    pub assets: Vec<AssetDeclaration>,
}
