//! Declarative value grammar for scene properties plus the two control properties.

use core::mem;
use log::warn;

/// A raw property value classified by the value grammar.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// `(x, y, z)`
    Array(Vec<f64>),
    Number(f64),
    /// `@name`
    AssetRef(String),
    /// `#domId[-subpath]`, kept raw; split against live ids at resolution time.
    NodeRef(String),
    Bool(bool),
    Text(String),
}

fn parse_number(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    text.parse::<f64>().ok().filter(|num| num.is_finite())
}

fn strip_quotes(text: &str) -> Option<&str> {
    for quote in ['"', '\''] {
        if let Some(inner) = text
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return Some(inner);
        }
    }
    None
}

/// Classify a raw value string.
pub fn parse_value(input: &str) -> PropertyValue {
    let text = input.trim();
    if let Some(inner) = text.strip_prefix('(').and_then(|rest| rest.strip_suffix(')')) {
        let parts: Option<Vec<f64>> = inner.split(',').map(parse_number).collect();
        if let Some(parts) = parts {
            return PropertyValue::Array(parts);
        }
        return PropertyValue::Text(text.to_owned());
    }
    if let Some(num) = parse_number(text) {
        return PropertyValue::Number(num);
    }
    if let Some(name) = text.strip_prefix('@')
        && !name.is_empty()
    {
        return PropertyValue::AssetRef(name.to_owned());
    }
    if let Some(reference) = text.strip_prefix('#')
        && !reference.is_empty()
    {
        return PropertyValue::NodeRef(reference.to_owned());
    }
    match text {
        "true" => return PropertyValue::Bool(true),
        "false" => return PropertyValue::Bool(false),
        _ => {}
    }
    PropertyValue::Text(strip_quotes(text).unwrap_or(text).to_owned())
}

/// Possible `(id, remaining path)` splits of a `#domId-subpath` reference, longest id first.
pub fn node_ref_candidates(reference: &str) -> Vec<(&str, Option<&str>)> {
    let mut out = vec![(reference, None)];
    for (idx, ch) in reference.char_indices().rev() {
        if ch != '-' {
            continue;
        }
        let (id, rest) = reference.split_at(idx);
        let path = &rest[1..];
        if !id.is_empty() && !path.is_empty() {
            out.push((id, Some(path)));
        }
    }
    out
}

/// Parse `<n>s`, `<n>ms`, or a bare `<n>` (milliseconds) into milliseconds.
pub fn parse_duration_ms(token: &str) -> Option<f64> {
    let token = token.trim().to_ascii_lowercase();
    if let Some(ms) = token.strip_suffix("ms") {
        return parse_number(ms);
    }
    if let Some(secs) = token.strip_suffix('s') {
        return parse_number(secs).map(|secs| secs * 1000.0);
    }
    parse_number(&token)
}

/// Split on whitespace outside parentheses, so `cubic-bezier(0, 0, 1, 1)` stays one token.
fn split_tokens(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut depth = 0_usize;
    for ch in text.chars() {
        match ch {
            '(' => {
                depth += 1;
                current.push(ch);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            ch if ch.is_whitespace() && depth == 0 => {
                if !current.is_empty() {
                    out.push(mem::take(&mut current));
                }
            }
            _ => current.push(ch),
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

pub const DEFAULT_EASING: &str = "linear";
pub const DEFAULT_ANIMATION_DURATION_MS: f64 = 1000.0;

#[derive(Debug, Clone, PartialEq)]
pub struct TransitionSpec {
    pub duration_ms: f64,
    pub easing: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Iterations {
    Count(u32),
    Infinite,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimationSpec {
    pub name: String,
    pub duration_ms: f64,
    pub iterations: Iterations,
    pub easing: String,
}

/// Result of reading a control property.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlUpdate<T> {
    Set(T),
    /// `none` or an empty value.
    Clear,
    /// Malformed; the previous setting stays in place.
    Invalid,
}

fn is_clear(text: &str) -> bool {
    let text = text.trim();
    text.is_empty() || text.eq_ignore_ascii_case("none")
}

/// `<duration>[ms|s] [<easing>]`
pub fn parse_transition(raw: &str) -> ControlUpdate<TransitionSpec> {
    if is_clear(raw) {
        return ControlUpdate::Clear;
    }
    let tokens = split_tokens(raw);
    let Some(duration_ms) = tokens.first().and_then(|token| parse_duration_ms(token)) else {
        warn!("Malformed --transition value `{raw}`");
        return ControlUpdate::Invalid;
    };
    let easing = tokens.get(1..).map(|rest| rest.join(" ")).unwrap_or_default();
    ControlUpdate::Set(TransitionSpec {
        duration_ms,
        easing: if easing.is_empty() {
            DEFAULT_EASING.to_owned()
        } else {
            easing
        },
    })
}

/// `<name> [<duration>[ms|s]] [infinite|<count>] [<easing...>]`
pub fn parse_animation(raw: &str) -> ControlUpdate<AnimationSpec> {
    if is_clear(raw) {
        return ControlUpdate::Clear;
    }
    let tokens = split_tokens(raw);
    let mut rest = tokens.iter().map(String::as_str).peekable();
    let Some(name) = rest.next() else {
        return ControlUpdate::Clear;
    };
    let mut spec = AnimationSpec {
        name: name.to_owned(),
        duration_ms: DEFAULT_ANIMATION_DURATION_MS,
        iterations: Iterations::Count(1),
        easing: DEFAULT_EASING.to_owned(),
    };
    if let Some(duration_ms) = rest.peek().and_then(|token| parse_duration_ms(token)) {
        spec.duration_ms = duration_ms;
        rest.next();
    }
    if let Some(token) = rest.peek().copied() {
        if token.eq_ignore_ascii_case("infinite") {
            spec.iterations = Iterations::Infinite;
            rest.next();
        } else if let Ok(count) = token.parse::<u32>() {
            spec.iterations = Iterations::Count(count);
            rest.next();
        }
    }
    let easing: Vec<&str> = rest.collect();
    if !easing.is_empty() {
        spec.easing = easing.join(" ");
    }
    ControlUpdate::Set(spec)
}
