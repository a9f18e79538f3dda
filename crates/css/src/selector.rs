//! Selector subset understood by the scene engine: `<base>[:<state>]`.
//!
//! The base is `.class`, `#id` or a tag name. Combinators, attribute selectors and
//! unknown pseudo classes are rejected.
use log::warn;

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum SelectorKey {
    Tag(String),
    Class(String),
    Id(String),
}

/// Pseudo-state qualifiers. `Always` marks rules re-applied on every frame.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum PseudoState {
    Hover,
    Focus,
    Active,
    Always,
}

impl PseudoState {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "hover" => Some(Self::Hover),
            "focus" => Some(Self::Focus),
            "active" => Some(Self::Active),
            "always" => Some(Self::Always),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Hover => "hover",
            Self::Focus => "focus",
            Self::Active => "active",
            Self::Always => "always",
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct CompoundSelector {
    pub key: SelectorKey,
    pub pseudo: Option<PseudoState>,
}

fn is_ident(text: &str) -> bool {
    !text.is_empty()
        && text
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
}

/// Parse one compound selector, e.g. `.wheel:hover`.
pub fn parse_compound(text: &str) -> Option<CompoundSelector> {
    let text = text.trim();
    let (base, pseudo) = match text.split_once(':') {
        Some((base, state)) => {
            let pseudo = PseudoState::from_name(state)?;
            (base, Some(pseudo))
        }
        None => (text, None),
    };
    let key = if let Some(class) = base.strip_prefix('.') {
        SelectorKey::Class(class.to_owned())
    } else if let Some(id) = base.strip_prefix('#') {
        SelectorKey::Id(id.to_owned())
    } else {
        SelectorKey::Tag(base.to_ascii_lowercase())
    };
    let name = match &key {
        SelectorKey::Tag(name) | SelectorKey::Class(name) | SelectorKey::Id(name) => name,
    };
    if !is_ident(name) {
        return None;
    }
    Some(CompoundSelector { key, pseudo })
}

/// Parse a comma-separated selector list, dropping unsupported entries with a warning.
pub fn parse_selector_list(prelude: &str) -> Vec<CompoundSelector> {
    prelude
        .split(',')
        .filter_map(|part| {
            let parsed = parse_compound(part);
            if parsed.is_none() {
                warn!("Unsupported selector `{}` ignored", part.trim());
            }
            parsed
        })
        .collect()
}

/// Keys an element can match on, lowest precedence first: tag, classes in order, id.
pub fn selector_keys(tag: &str, classes: &[String], id: Option<&str>) -> Vec<SelectorKey> {
    let mut keys = Vec::with_capacity(classes.len() + 2);
    keys.push(SelectorKey::Tag(tag.to_ascii_lowercase()));
    keys.extend(classes.iter().cloned().map(SelectorKey::Class));
    if let Some(id) = id {
        keys.push(SelectorKey::Id(id.to_owned()));
    }
    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_supported_forms() {
        let list = parse_selector_list(".wheel, #hub:hover, Mesh:always");
        assert_eq!(
            list,
            vec![
                CompoundSelector { key: SelectorKey::Class("wheel".into()), pseudo: None },
                CompoundSelector {
                    key: SelectorKey::Id("hub".into()),
                    pseudo: Some(PseudoState::Hover)
                },
                CompoundSelector {
                    key: SelectorKey::Tag("mesh".into()),
                    pseudo: Some(PseudoState::Always)
                },
            ]
        );
    }

    #[test]
    fn rejects_combinators_and_unknown_states() {
        assert!(parse_selector_list(".a .b").is_empty());
        assert!(parse_selector_list(".a > .b").is_empty());
        assert!(parse_selector_list(".a:visited").is_empty());
        assert!(parse_selector_list(".a:hover:focus").is_empty());
        assert_eq!(parse_selector_list(".a .b, .c").len(), 1);
    }
}
