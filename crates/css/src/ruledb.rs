use crate::keyframes::KeyframeSequence;
use crate::selector::{PseudoState, SelectorKey};
use crate::types::{AssetDeclaration, Declaration, Stylesheet};
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Clone, Debug)]
pub struct RuleEntry {
    pub source_order: u32,
    pub declarations: Rc<[Declaration]>,
}

type BucketKey = (SelectorKey, Option<PseudoState>);

/// Index over the currently loaded stylesheets.
///
/// Rules are flattened to one entry per selector and bucketed by
/// `(selector key, pseudo state)` in source order. The index never updates
/// incrementally; [`RuleDB::rebuild`] replaces it and bumps [`RuleDB::epoch`].
#[derive(Clone, Debug, Default)]
pub struct RuleDB {
    epoch: u64,
    buckets: HashMap<BucketKey, Vec<RuleEntry>>,
    keyframes: HashMap<String, KeyframeSequence>,
    assets: Vec<AssetDeclaration>,
}

impl RuleDB {
    /// Flatten stylesheets into a fresh index (epoch 1).
    pub fn from_stylesheets<'sheet>(sheets: impl IntoIterator<Item = &'sheet Stylesheet>) -> Self {
        let mut db = Self::default();
        db.rebuild(sheets);
        db
    }

    /// Replace the index contents with `sheets`, in order.
    pub fn rebuild<'sheet>(&mut self, sheets: impl IntoIterator<Item = &'sheet Stylesheet>) {
        self.buckets.clear();
        self.keyframes.clear();
        self.assets.clear();
        for sheet in sheets {
            for rule in &sheet.rules {
                let declarations: Rc<[Declaration]> = Rc::from(rule.declarations.as_slice());
                for selector in &rule.selectors {
                    self.buckets
                        .entry((selector.key.clone(), selector.pseudo))
                        .or_default()
                        .push(RuleEntry {
                            source_order: rule.source_order,
                            declarations: Rc::clone(&declarations),
                        });
                }
            }
            for sequence in &sheet.keyframes {
                // Later definitions win.
                self.keyframes.insert(sequence.name.clone(), sequence.clone());
            }
            self.assets.extend(sheet.assets.iter().cloned());
        }
        for entries in self.buckets.values_mut() {
            entries.sort_by_key(|entry| entry.source_order);
        }
        self.epoch += 1;
    }

    pub const fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn rules_for(&self, key: &SelectorKey, pseudo: Option<PseudoState>) -> &[RuleEntry] {
        self.buckets
            .get(&(key.clone(), pseudo))
            .map_or(&[], Vec::as_slice)
    }

    fn has_rule(&self, keys: &[SelectorKey], pseudo: PseudoState) -> bool {
        keys.iter()
            .any(|key| !self.rules_for(key, Some(pseudo)).is_empty())
    }

    /// True if a hover or focus rule targets any of `keys`.
    pub fn has_interaction_rule(&self, keys: &[SelectorKey]) -> bool {
        self.has_rule(keys, PseudoState::Hover) || self.has_rule(keys, PseudoState::Focus)
    }

    pub fn has_always_rule(&self, keys: &[SelectorKey]) -> bool {
        self.has_rule(keys, PseudoState::Always)
    }

    pub fn keyframes(&self, name: &str) -> Option<&KeyframeSequence> {
        self.keyframes.get(name)
    }

    pub fn assets(&self) -> &[AssetDeclaration] {
        &self.assets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_stylesheet;

    #[test]
    fn buckets_by_key_and_state() {
        let first = parse_stylesheet(".a { --x: 1; } .a:hover { --x: 2; } #b:always { --y: 1; }", 0);
        let second = parse_stylesheet(".a { --x: 3; } @keyframes k { to { --x: 1; } }", 3);
        let db = RuleDB::from_stylesheets([&first, &second]);
        assert_eq!(db.epoch(), 1);

        let class_a = SelectorKey::Class("a".into());
        let base: Vec<u32> = db.rules_for(&class_a, None).iter().map(|entry| entry.source_order).collect();
        assert_eq!(base, vec![0, 3]);
        assert!(db.has_interaction_rule(&[class_a.clone()]));
        assert!(!db.has_always_rule(&[class_a]));
        assert!(db.has_always_rule(&[SelectorKey::Id("b".into())]));
        assert!(db.keyframes("k").is_some());
    }

    #[test]
    fn rebuild_replaces_contents_and_bumps_epoch() {
        let sheet = parse_stylesheet(".a:focus { --x: 1; }", 0);
        let mut db = RuleDB::from_stylesheets([&sheet]);
        db.rebuild([]);
        assert_eq!(db.epoch(), 2);
        assert!(!db.has_interaction_rule(&[SelectorKey::Class("a".into())]));
    }
}
