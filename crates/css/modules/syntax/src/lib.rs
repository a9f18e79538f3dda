//! Stylesheet tokenization on top of `cssparser`.
//!
//! Produces raw, untyped items: style rules, `@keyframes` sequences and any other
//! block at-rule as a declaration block. Interpretation happens in the `css` crate.
use cssparser::AtRuleParser as CssAtRuleParser;
use cssparser::CowRcStr;
use cssparser::DeclarationParser as CssDeclarationParser;
use cssparser::ParseError;
use cssparser::Parser;
use cssparser::ParserInput;
use cssparser::ParserState;
use cssparser::QualifiedRuleParser as CssQualifiedRuleParser;
use cssparser::RuleBodyItemParser as CssRuleBodyItemParser;
use cssparser::RuleBodyParser as CssRuleBodyParser;
use cssparser::StyleSheetParser;

/// `name: value [!important]`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Declaration {
    /// ASCII-lowercased.
    pub name: String,
    /// Source text of the value, trimmed, with any `!important` removed.
    pub value: String,
    pub important: bool,
}

/// `<selectors> { <declarations> }`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StyleRule {
    /// Selector list, untouched.
    pub prelude: String,
    pub declarations: Vec<Declaration>,
}

/// One `<selector> { ... }` entry of a `@keyframes` block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyframeFrame {
    /// Raw keyframe selector list, e.g. `from`, `50%`, `0%, 100%`.
    pub selector: String,
    pub declarations: Vec<Declaration>,
}

/// `@keyframes <name> { ... }`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyframesRule {
    pub name: String,
    pub frames: Vec<KeyframeFrame>,
}

/// Any other at-rule carrying a declaration block, e.g. `@robot { url: "a.glb"; }`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AtBlock {
    /// Lowercased at-rule identifier without the `@`.
    pub name: String,
    /// Raw prelude text between the identifier and the block.
    pub prelude: String,
    pub declarations: Vec<Declaration>,
}

/// Everything a stylesheet yields, split by kind.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Stylesheet {
    /// Source order is kept; later rules win ties in the cascade.
    pub rules: Vec<StyleRule>,
    pub keyframes: Vec<KeyframesRule>,
    pub blocks: Vec<AtBlock>,
}

enum SheetItem {
    Style(StyleRule),
    Keyframes(KeyframesRule),
    Block(AtBlock),
}

enum AtPrelude {
    Keyframes(String),
    Block { name: String, prelude: String },
}

/// Strip a trailing `!important`.
fn strip_important(value: &str) -> (String, bool) {
    let value = value.trim();
    match value.rfind("!important").and_then(|at| value.get(..at)) {
        Some(head) => (head.trim_end().to_owned(), true),
        None => (value.to_owned(), false),
    }
}

/// Consume the rest of `input` and return its trimmed source text.
fn consume_raw(input: &mut Parser<'_, '_>) -> String {
    let start = input.position();
    while input.next_including_whitespace_and_comments().is_ok() {}
    input.slice_from(start).trim().to_owned()
}

struct DeclarationsOnly;

impl CssDeclarationParser<'_> for DeclarationsOnly {
    type Declaration = Declaration;
    type Error = ();

    fn parse_value<'input>(
        &mut self,
        name: CowRcStr<'input>,
        input: &mut Parser<'input, '_>,
        _decl_start: &ParserState,
    ) -> Result<Self::Declaration, ParseError<'input, Self::Error>> {
        let raw = consume_raw(input);
        let (value, important) = strip_important(&raw);
        Ok(Declaration {
            name: name.to_ascii_lowercase(),
            value,
            important,
        })
    }
}

// Nested rules are not allowed in a declaration block; the trait defaults reject them.
impl CssAtRuleParser<'_> for DeclarationsOnly {
    type Prelude = ();
    type AtRule = Declaration;
    type Error = ();
}

impl CssQualifiedRuleParser<'_> for DeclarationsOnly {
    type Prelude = ();
    type QualifiedRule = Declaration;
    type Error = ();
}

impl CssRuleBodyItemParser<'_, Declaration, ()> for DeclarationsOnly {
    fn parse_declarations(&self) -> bool {
        true
    }
    fn parse_qualified(&self) -> bool {
        false
    }
}

/// Parser for the body of `@keyframes`: only `<selector> { decls }` entries.
struct FrameList;

impl CssDeclarationParser<'_> for FrameList {
    type Declaration = KeyframeFrame;
    type Error = ();

    fn parse_value<'input>(
        &mut self,
        _name: CowRcStr<'input>,
        input: &mut Parser<'input, '_>,
        _decl_start: &ParserState,
    ) -> Result<Self::Declaration, ParseError<'input, Self::Error>> {
        Err(input.new_custom_error(()))
    }
}

impl CssAtRuleParser<'_> for FrameList {
    type Prelude = ();
    type AtRule = KeyframeFrame;
    type Error = ();
}

impl CssQualifiedRuleParser<'_> for FrameList {
    type Prelude = String;
    type QualifiedRule = KeyframeFrame;
    type Error = ();

    fn parse_prelude<'input>(
        &mut self,
        input: &mut Parser<'input, '_>,
    ) -> Result<Self::Prelude, ParseError<'input, Self::Error>> {
        Ok(consume_raw(input).to_ascii_lowercase())
    }

    fn parse_block<'input>(
        &mut self,
        prelude: Self::Prelude,
        _state: &ParserState,
        input: &mut Parser<'input, '_>,
    ) -> Result<Self::QualifiedRule, ParseError<'input, Self::Error>> {
        Ok(KeyframeFrame {
            selector: prelude,
            declarations: declarations_in(input),
        })
    }
}

impl CssRuleBodyItemParser<'_, KeyframeFrame, ()> for FrameList {
    fn parse_declarations(&self) -> bool {
        false
    }
    fn parse_qualified(&self) -> bool {
        true
    }
}

/// Statement at-rules such as `@import` fall through to the default rejection.
struct SheetItems;

impl CssAtRuleParser<'_> for SheetItems {
    type Prelude = AtPrelude;
    type AtRule = SheetItem;
    type Error = ();

    fn parse_prelude<'input>(
        &mut self,
        name: CowRcStr<'input>,
        input: &mut Parser<'input, '_>,
    ) -> Result<Self::Prelude, ParseError<'input, Self::Error>> {
        let name = name.to_ascii_lowercase();
        let prelude = consume_raw(input);
        if name == "keyframes" || name == "-webkit-keyframes" {
            let sequence = prelude.trim_matches(|ch| ch == '"' || ch == '\'').to_owned();
            return Ok(AtPrelude::Keyframes(sequence));
        }
        Ok(AtPrelude::Block { name, prelude })
    }

    fn parse_block<'input>(
        &mut self,
        prelude: Self::Prelude,
        _state: &ParserState,
        input: &mut Parser<'input, '_>,
    ) -> Result<Self::AtRule, ParseError<'input, Self::Error>> {
        match prelude {
            AtPrelude::Keyframes(name) => {
                let mut list = FrameList;
                let frames = CssRuleBodyParser::new(input, &mut list)
                    .flatten()
                    .collect();
                Ok(SheetItem::Keyframes(KeyframesRule { name, frames }))
            }
            AtPrelude::Block { name, prelude } => Ok(SheetItem::Block(AtBlock {
                name,
                prelude,
                declarations: declarations_in(input),
            })),
        }
    }
}

impl CssQualifiedRuleParser<'_> for SheetItems {
    type Prelude = String;
    type QualifiedRule = SheetItem;
    type Error = ();

    fn parse_prelude<'input>(
        &mut self,
        input: &mut Parser<'input, '_>,
    ) -> Result<Self::Prelude, ParseError<'input, Self::Error>> {
        Ok(consume_raw(input))
    }

    fn parse_block<'input>(
        &mut self,
        prelude: Self::Prelude,
        _state: &ParserState,
        input: &mut Parser<'input, '_>,
    ) -> Result<Self::QualifiedRule, ParseError<'input, Self::Error>> {
        Ok(SheetItem::Style(StyleRule {
            prelude,
            declarations: declarations_in(input),
        }))
    }
}

fn declarations_in(block: &mut Parser) -> Vec<Declaration> {
    CssRuleBodyParser::new(block, &mut DeclarationsOnly).flatten().collect()
}

/// Parse a full stylesheet. Malformed items are skipped.
pub fn parse_stylesheet(css: &str) -> Stylesheet {
    let mut input = ParserInput::new(css);
    let mut parser = Parser::new(&mut input);
    let mut top = SheetItems;
    let mut sheet = Stylesheet::default();
    for item in StyleSheetParser::new(&mut parser, &mut top).flatten() {
        match item {
            SheetItem::Style(rule) => sheet.rules.push(rule),
            SheetItem::Keyframes(rule) => sheet.keyframes.push(rule),
            SheetItem::Block(block) => sheet.blocks.push(block),
        }
    }
    sheet
}

/// Parse a bare declaration list such as an inline `style` attribute.
pub fn parse_declaration_list(text: &str) -> Vec<Declaration> {
    let mut input = ParserInput::new(text);
    let mut parser = Parser::new(&mut input);
    declarations_in(&mut parser)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_rules_keyframes_and_blocks() {
        let sheet = parse_stylesheet(
            r#"
            @import "other.css";
            .spin { --rotation-y: 0; --animation: turn 2s infinite; }
            @keyframes turn {
                from { --rotation-y: 0; }
                50%, 75% { --rotation-y: 3.14; }
                to { --rotation-y: 6.28 !important; }
            }
            @robot { url: "models/robot.glb"; name: "bot"; }
            "#,
        );
        assert_eq!(sheet.rules.len(), 1);
        assert_eq!(sheet.rules[0].prelude, ".spin");
        assert_eq!(sheet.rules[0].declarations[1].value, "turn 2s infinite");

        assert_eq!(sheet.keyframes.len(), 1);
        let turn = &sheet.keyframes[0];
        assert_eq!(turn.name, "turn");
        let selectors: Vec<&str> = turn.frames.iter().map(|frame| frame.selector.as_str()).collect();
        assert_eq!(selectors, vec!["from", "50%, 75%", "to"]);
        assert!(turn.frames[2].declarations[0].important);
        assert_eq!(turn.frames[2].declarations[0].value, "6.28");

        assert_eq!(sheet.blocks.len(), 1);
        assert_eq!(sheet.blocks[0].name, "robot");
        assert_eq!(sheet.blocks[0].declarations[0].value, "\"models/robot.glb\"");
    }

    #[test]
    fn custom_property_values_are_kept_raw() {
        let decls = parse_declaration_list("--position: (1, 2.5, -3); --map: @brick; --target: #arm-position-x");
        let values: Vec<&str> = decls.iter().map(|decl| decl.value.as_str()).collect();
        assert_eq!(values, vec!["(1, 2.5, -3)", "@brick", "#arm-position-x"]);
        assert_eq!(decls[0].name, "--position");
    }

    #[test]
    fn malformed_declarations_are_skipped() {
        let decls = parse_declaration_list("--a 1; --b: 2");
        assert_eq!(decls.len(), 1);
        assert_eq!(decls[0].name, "--b");
    }
}
