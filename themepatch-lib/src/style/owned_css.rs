// src/style/owned_css.rs: persisted CSS held as an ordered list of segments
// that keep their exact source text, so untouched rules render byte-for-byte.
use cssparser::{
    AtRuleParser, CowRcStr, DeclarationParser, ParseError, Parser, ParserInput, ParserState,
    QualifiedRuleParser, RuleBodyItemParser, RuleBodyParser, SourcePosition, StyleSheetParser,
    Token,
};
use std::fmt;

/// A fully-owned stylesheet: top-level rule blocks plus everything else
/// (comments, at-rules, whitespace) kept verbatim.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OwnedStylesheet {
    pub segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Rule(OwnedRule),
    Verbatim(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct OwnedRule {
    /// Selector text as written, e.g. ".footer-main, .footer-secondary"
    pub selector: String,
    /// Text between the braces.
    pub body: String,
    /// Exact source, including trailing whitespace up to the first newline.
    pub source: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OwnedDeclaration {
    pub property: String,
    pub value: String,
}

/// Canonical form used to compare selectors: trimmed, whitespace runs collapsed.
pub fn selector_key(selector: &str) -> String {
    selector.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Render a fresh rule block: `selector { prop: value; prop2: value2; }`.
pub fn render_rule(selector: &str, declarations: &[(&str, String)]) -> String {
    let body = declarations
        .iter()
        .map(|(property, value)| format!("{property}: {value};"))
        .collect::<Vec<_>>()
        .join(" ");
    format!("{} {{ {} }}\n", selector.trim(), body)
}

/// True when `property: value` reads back unchanged from a rendered block.
///
/// Fails for values that would end the block or the declaration early
/// (`red}`, `a; b`) or leave a string, comment or function open.
pub fn declaration_round_trips(property: &str, value: &str) -> bool {
    let rendered = render_rule("a", &[(property, value.to_string())]);
    let sheet = OwnedStylesheet::parse(&rendered);
    let expected = OwnedDeclaration {
        property: property.trim().to_string(),
        value: value.trim().to_string(),
    };
    match sheet.segments.as_slice() {
        [Segment::Rule(rule)] => rule.source == rendered && rule.declarations() == [expected],
        _ => false,
    }
}

impl OwnedRule {
    pub fn matches(&self, selector: &str) -> bool {
        self.selector
            .split_whitespace()
            .eq(selector.split_whitespace())
    }

    /// Declarations of the body, as written. Semicolons inside strings,
    /// comments or functions (e.g. `url(data:...;base64,...)`) do not split.
    pub fn declarations(&self) -> Vec<OwnedDeclaration> {
        let mut input = ParserInput::new(&self.body);
        let mut parser = Parser::new(&mut input);
        let mut collector = DeclarationCollector;
        RuleBodyParser::new(&mut parser, &mut collector)
            .flatten()
            .collect()
    }
}

impl OwnedStylesheet {
    /// Split CSS text into segments. Never fails: anything that is not a
    /// well-formed top-level rule is carried along verbatim.
    pub fn parse(text: &str) -> Self {
        let mut input = ParserInput::new(text);
        let mut parser = Parser::new(&mut input);
        let mut collector = RuleCollector;
        let mut rules = StyleSheetParser::new(&mut parser, &mut collector);

        let mut segments = Vec::new();
        let mut verbatim_start = 0;
        while let Some(item) = rules.next() {
            let block_end = rules.input.position().byte_index();
            // At-rules and rules cssparser rejected stay in the verbatim run.
            let Ok(ParsedRule {
                start,
                selector,
                body,
            }) = item
            else {
                continue;
            };
            let start = start.byte_index();
            let start = start + text[start..].len() - text[start..].trim_start().len();
            // A block closed by the end of input is not a rule we can rewrite.
            if !text[..block_end].ends_with('}') {
                break;
            }

            let end = absorb_line_end(text.as_bytes(), block_end);
            if verbatim_start < start {
                segments.push(Segment::Verbatim(text[verbatim_start..start].to_string()));
            }
            segments.push(Segment::Rule(OwnedRule {
                selector,
                body,
                source: text[start..end].to_string(),
            }));
            verbatim_start = end;
        }

        if verbatim_start < text.len() {
            segments.push(Segment::Verbatim(text[verbatim_start..].to_string()));
        }
        OwnedStylesheet { segments }
    }

    pub fn rules(&self) -> impl Iterator<Item = &OwnedRule> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Rule(rule) => Some(rule),
            Segment::Verbatim(_) => None,
        })
    }

    /// Every block for `selector`, in source order.
    pub fn find(&self, selector: &str) -> Vec<&OwnedRule> {
        self.rules().filter(|rule| rule.matches(selector)).collect()
    }

    /// Remove every block written for `selector`; returns how many went away.
    pub fn remove_selector(&mut self, selector: &str) -> usize {
        let before = self.segments.len();
        self.segments.retain(|segment| match segment {
            Segment::Rule(rule) => !rule.matches(selector),
            Segment::Verbatim(_) => true,
        });
        before - self.segments.len()
    }

    /// Append a freshly rendered block at the end of the sheet.
    pub fn push_rule(&mut self, selector: &str, declarations: &[(&str, String)]) {
        let ends_with_newline = self.segments.last().map_or(true, |segment| {
            let source = match segment {
                Segment::Rule(rule) => &rule.source,
                Segment::Verbatim(text) => text,
            };
            source.ends_with('\n')
        });
        if !ends_with_newline {
            self.segments.push(Segment::Verbatim("\n".to_string()));
        }

        let source = render_rule(selector, declarations);
        let body = source
            .find('{')
            .zip(source.rfind('}'))
            .map(|(open, close)| source[open + 1..close].to_string())
            .unwrap_or_default();
        self.segments.push(Segment::Rule(OwnedRule {
            selector: selector.trim().to_string(),
            body,
            source,
        }));
    }
}

impl fmt::Display for OwnedStylesheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            match segment {
                Segment::Rule(rule) => f.write_str(&rule.source)?,
                Segment::Verbatim(text) => f.write_str(text)?,
            }
        }
        Ok(())
    }
}

impl fmt::Display for OwnedRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Selector: {}", self.selector)?;
        for decl in self.declarations() {
            writeln!(f, "  {}: {}", decl.property, decl.value)?;
        }
        Ok(())
    }
}

struct ParsedRule {
    start: SourcePosition,
    selector: String,
    body: String,
}

/// Collects top-level qualified rules with their raw selector and body text.
/// At-rules use the default (rejecting) handlers and end up verbatim.
struct RuleCollector;

impl<'i> AtRuleParser<'i> for RuleCollector {
    type Prelude = ();
    type AtRule = ParsedRule;
    type Error = ();
}

impl<'i> QualifiedRuleParser<'i> for RuleCollector {
    type Prelude = (SourcePosition, String);
    type QualifiedRule = ParsedRule;
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, ParseError<'i, Self::Error>> {
        let mut start = input.position();
        while let Ok(token) = input.next_including_whitespace_and_comments() {
            // A stray `}` is left to the verbatim text before the rule.
            if matches!(*token, Token::CloseCurlyBracket) {
                start = input.position();
            }
        }
        let selector = input.slice_from(start).trim().to_string();
        if selector.is_empty() {
            return Err(input.new_custom_error(()));
        }
        Ok((start, selector))
    }

    fn parse_block<'t>(
        &mut self,
        (start, selector): Self::Prelude,
        _state: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::QualifiedRule, ParseError<'i, Self::Error>> {
        let body_start = input.position();
        while input.next_including_whitespace_and_comments().is_ok() {}
        Ok(ParsedRule {
            start,
            selector,
            body: input.slice_from(body_start).to_string(),
        })
    }
}

/// Records each declaration's name and raw value text.
struct DeclarationCollector;

impl<'i> DeclarationParser<'i> for DeclarationCollector {
    type Declaration = OwnedDeclaration;
    type Error = ();

    fn parse_value<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
        _declaration_start: &ParserState,
    ) -> Result<Self::Declaration, ParseError<'i, Self::Error>> {
        let start = input.position();
        while input.next_including_whitespace_and_comments().is_ok() {}
        let value = input.slice_from(start).trim();
        if value.is_empty() {
            return Err(input.new_custom_error(()));
        }
        Ok(OwnedDeclaration {
            property: name.to_string(),
            value: value.to_string(),
        })
    }
}

impl<'i> AtRuleParser<'i> for DeclarationCollector {
    type Prelude = ();
    type AtRule = OwnedDeclaration;
    type Error = ();
}

impl<'i> QualifiedRuleParser<'i> for DeclarationCollector {
    type Prelude = ();
    type QualifiedRule = OwnedDeclaration;
    type Error = ();
}

impl<'i> RuleBodyItemParser<'i, OwnedDeclaration, ()> for DeclarationCollector {
    fn parse_declarations(&self) -> bool {
        true
    }

    fn parse_qualified(&self) -> bool {
        false
    }
}

fn absorb_line_end(bytes: &[u8], mut pos: usize) -> usize {
    while pos < bytes.len() && matches!(bytes[pos], b' ' | b'\t' | b'\r') {
        pos += 1;
    }
    if pos < bytes.len() && bytes[pos] == b'\n' {
        pos += 1;
    }
    pos
}
