use crate::parser::parse_stylesheet_with_next;
use crate::ruledb::RuleDB;
use crate::types::Stylesheet;
use html::NodeKey;
use log::debug;

/// The ordered set of `<style>` sources feeding one [`RuleDB`].
#[derive(Debug, Default)]
pub struct StyleSheetSet {
    /// Style nodes and their text in the order they apply.
    sources: Vec<(NodeKey, String)>,
    sheets: Vec<Stylesheet>,
}

impl StyleSheetSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the tracked sources. Returns true when the set or any text changed,
    /// in which case every sheet is re-parsed with monotonic source order.
    pub fn sync(&mut self, current: Vec<(NodeKey, String)>) -> bool {
        if current == self.sources {
            return false;
        }
        self.sources = current;
        self.sheets.clear();
        let mut base: u32 = 0;
        for (node, text) in &self.sources {
            let (sheet, next) = parse_stylesheet_with_next(text, base);
            debug!(
                "Parsed stylesheet {node:?}: {} rules, {} keyframes, {} assets",
                sheet.rules.len(),
                sheet.keyframes.len(),
                sheet.assets.len()
            );
            base = next;
            self.sheets.push(sheet);
        }
        true
    }

    pub fn contains(&self, node: NodeKey) -> bool {
        self.sources.iter().any(|(key, _)| *key == node)
    }

    pub fn sheets(&self) -> &[Stylesheet] {
        &self.sheets
    }

    /// Rebuild `db` from the tracked sheets.
    pub fn rebuild_into(&self, db: &mut RuleDB) {
        db.rebuild(&self.sheets);
    }
}
