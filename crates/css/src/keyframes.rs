//! `@keyframes` sequences.
use crate::types::Declaration;
use crate::values::parse_duration_ms;
use log::warn;

/// A single keyframe selector.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum KeyframeSelector {
    From,
    To,
    /// Percentage of the total duration, `0..=100`.
    Percent(f64),
    /// Absolute offset in milliseconds.
    Millis(f64),
}

impl KeyframeSelector {
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim().to_ascii_lowercase();
        match text.as_str() {
            "from" => return Some(Self::From),
            "to" => return Some(Self::To),
            _ => {}
        }
        if let Some(pct) = text.strip_suffix('%') {
            return pct
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|pct| pct.is_finite())
                .map(Self::Percent);
        }
        parse_duration_ms(&text).map(Self::Millis)
    }

    /// Offset in milliseconds for a sequence lasting `total_ms`.
    pub fn resolve(self, total_ms: f64) -> f64 {
        match self {
            Self::From => 0.0,
            Self::To => total_ms,
            Self::Percent(pct) => total_ms * pct / 100.0,
            Self::Millis(ms) => ms,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct KeyframeBlock {
    pub selectors: Vec<KeyframeSelector>,
    pub declarations: Vec<Declaration>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct KeyframeSequence {
    pub name: String,
    pub frames: Vec<KeyframeBlock>,
}

/// A keyframe placed on the timeline.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedFrame<'seq> {
    pub offset_ms: f64,
    pub declarations: &'seq [Declaration],
}

impl KeyframeSequence {
    /// Build from a raw `@keyframes` rule; frames with no valid selector are dropped.
    pub fn from_syntax(rule: &css_syntax::KeyframesRule) -> Self {
        let frames = rule
            .frames
            .iter()
            .filter_map(|frame| {
                let selectors: Vec<KeyframeSelector> = frame
                    .selector
                    .split(',')
                    .filter_map(|part| {
                        let parsed = KeyframeSelector::parse(part);
                        if parsed.is_none() {
                            warn!("Invalid keyframe selector `{}` in `{}`", part.trim(), rule.name);
                        }
                        parsed
                    })
                    .collect();
                if selectors.is_empty() {
                    return None;
                }
                let declarations = frame
                    .declarations
                    .iter()
                    .filter_map(|decl| Declaration::from_raw(&decl.name, &decl.value))
                    .collect();
                Some(KeyframeBlock {
                    selectors,
                    declarations,
                })
            })
            .collect();
        Self {
            name: rule.name.clone(),
            frames,
        }
    }

    /// Frames resolved against `total_ms` and sorted by offset (stable for ties).
    pub fn resolve(&self, total_ms: f64) -> Vec<ResolvedFrame<'_>> {
        let mut out: Vec<ResolvedFrame<'_>> = self
            .frames
            .iter()
            .flat_map(|block| {
                block.selectors.iter().map(|selector| ResolvedFrame {
                    offset_ms: selector.resolve(total_ms),
                    declarations: &block.declarations,
                })
            })
            .collect();
        out.sort_by(|left, right| left.offset_ms.total_cmp(&right.offset_ms));
        out
    }
}
