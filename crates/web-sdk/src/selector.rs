//! Selector language for interaction bindings.
//!
//! Covers the subset of CSS the page bindings need: comma groups,
//! descendant and child combinators, tag / `#id` / `.class` / `[attr]` /
//! `[attr=value]` compounds, plus the jQuery positional filter `:eq(n)`
//! on the final compound of a group. Selectors are parsed once, when a
//! binding is registered, so a malformed selector fails at initialization
//! rather than on the first click.

use std::fmt;

use ga_events_core::{TrackingError, TrackingResult};

use crate::dom::Element;

/// How a compound relates to the compound on its left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeMatch {
    pub name: String,
    pub value: Option<String>,
}

/// A run of simple selectors that all apply to one element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Compound {
    pub tag: Option<String>,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attributes: Vec<AttributeMatch>,
}

impl Compound {
    fn is_empty(&self) -> bool {
        self.tag.is_none() && self.id.is_none() && self.classes.is_empty() && self.attributes.is_empty()
    }

    pub fn matches(&self, element: &dyn Element) -> bool {
        if let Some(tag) = &self.tag {
            if !element.tag().eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if element.attribute("id").as_deref() != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.iter().all(|c| element.has_class(c)) {
            return false;
        }
        self.attributes.iter().all(|attr| match (&attr.value, element.attribute(&attr.name)) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some(expected), Some(actual)) => *expected == actual,
        })
    }
}

impl fmt::Display for Compound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("*");
        }
        if let Some(tag) = &self.tag {
            f.write_str(tag)?;
        }
        if let Some(id) = &self.id {
            write!(f, "#{id}")?;
        }
        for class in &self.classes {
            write!(f, ".{class}")?;
        }
        for attr in &self.attributes {
            match &attr.value {
                Some(value) => write!(f, "[{}=\"{}\"]", attr.name, escape_css_string(value))?,
                None => write!(f, "[{}]", attr.name)?,
            }
        }
        Ok(())
    }
}

/// Escape a value for a double-quoted CSS string.
fn escape_css_string(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// One comma-separated alternative of a selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplexSelector {
    /// Left to right. The combinator of the first part is ignored.
    parts: Vec<(Combinator, Compound)>,
    eq: Option<usize>,
}

impl ComplexSelector {
    /// Positional `:eq(n)` filter over the matched set, if any.
    pub fn position(&self) -> Option<usize> {
        self.eq
    }

    /// Plain CSS without the positional filter, for `querySelectorAll`.
    pub fn css(&self) -> String {
        let mut out = String::new();
        for (i, (combinator, compound)) in self.parts.iter().enumerate() {
            if i > 0 {
                out.push_str(match combinator {
                    Combinator::Descendant => " ",
                    Combinator::Child => " > ",
                });
            }
            out.push_str(&compound.to_string());
        }
        out
    }

    /// Whether the element at `chain[0]` matches, where `chain` lists the
    /// element followed by its ancestors, nearest first. Ignores `:eq`.
    pub fn matches_chain(&self, chain: &[&dyn Element]) -> bool {
        let Some(last) = self.parts.len().checked_sub(1) else {
            return false;
        };
        match chain.first() {
            Some(el) if self.parts[last].1.matches(*el) => self.match_left(last, 0, chain),
            _ => false,
        }
    }

    fn match_left(&self, part: usize, pos: usize, chain: &[&dyn Element]) -> bool {
        if part == 0 {
            return true;
        }
        let (combinator, _) = &self.parts[part];
        let left = &self.parts[part - 1].1;
        match combinator {
            Combinator::Child => chain
                .get(pos + 1)
                .is_some_and(|el| left.matches(*el) && self.match_left(part - 1, pos + 1, chain)),
            Combinator::Descendant => (pos + 1..chain.len())
                .any(|j| left.matches(chain[j]) && self.match_left(part - 1, j, chain)),
        }
    }
}

/// A parsed, validated selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    groups: Vec<ComplexSelector>,
}

impl Selector {
    pub fn parse(source: &str) -> TrackingResult<Self> {
        if source.trim().is_empty() {
            return Err(TrackingError::invalid_selector(source, "empty selector"));
        }
        let groups = Parser::new(source).parse_groups()?;
        Ok(Self {
            source: source.to_string(),
            groups,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn groups(&self) -> &[ComplexSelector] {
        &self.groups
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

struct Parser<'a> {
    source: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.chars().collect(),
            pos: 0,
        }
    }

    fn error(&self, reason: impl Into<String>) -> TrackingError {
        TrackingError::invalid_selector(self.source, reason)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn expect(&mut self, expected: char) -> TrackingResult<()> {
        match self.peek() {
            Some(c) if c == expected => {
                self.pos += 1;
                Ok(())
            }
            Some(c) => Err(self.error(format!("expected '{expected}', found '{c}' at {}", self.pos))),
            None => Err(self.error(format!("expected '{expected}', found end of input"))),
        }
    }

    fn parse_groups(&mut self) -> TrackingResult<Vec<ComplexSelector>> {
        let mut groups = vec![self.parse_complex()?];
        while self.peek() == Some(',') {
            self.pos += 1;
            groups.push(self.parse_complex()?);
        }
        if let Some(c) = self.peek() {
            return Err(self.error(format!("unexpected '{c}' at {}", self.pos)));
        }
        Ok(groups)
    }

    fn parse_complex(&mut self) -> TrackingResult<ComplexSelector> {
        self.skip_whitespace();
        let mut parts = Vec::new();
        let mut combinator = Combinator::Descendant;
        loop {
            let (compound, eq) = self.parse_compound()?;
            parts.push((combinator, compound));

            let had_space = self.skip_whitespace();
            match self.peek() {
                None | Some(',') => {
                    return Ok(ComplexSelector { parts, eq });
                }
                Some('>') => {
                    self.pos += 1;
                    self.skip_whitespace();
                    combinator = Combinator::Child;
                }
                Some(_) if had_space => combinator = Combinator::Descendant,
                Some(c) => return Err(self.error(format!("unexpected '{c}' at {}", self.pos))),
            }
            if eq.is_some() {
                return Err(self.error(":eq() is only supported on the last compound"));
            }
        }
    }

    fn parse_compound(&mut self) -> TrackingResult<(Compound, Option<usize>)> {
        let mut compound = Compound::default();
        let mut eq = None;
        let mut any = false;

        if self.peek() == Some('*') {
            self.pos += 1;
            any = true;
        } else if self.peek().is_some_and(is_ident_char) {
            compound.tag = Some(self.parse_ident()?.to_ascii_lowercase());
            any = true;
        }

        while let Some(c) = self.peek() {
            if eq.is_some() && matches!(c, '#' | '.' | '[' | ':') {
                return Err(self.error(":eq() must end its compound"));
            }
            match c {
                '#' => {
                    self.pos += 1;
                    if compound.id.is_some() {
                        return Err(self.error("more than one #id in a compound"));
                    }
                    compound.id = Some(self.parse_ident()?);
                }
                '.' => {
                    self.pos += 1;
                    compound.classes.push(self.parse_ident()?);
                }
                '[' => {
                    self.pos += 1;
                    compound.attributes.push(self.parse_attribute()?);
                }
                ':' => {
                    self.pos += 1;
                    eq = Some(self.parse_eq()?);
                }
                _ => break,
            }
            any = true;
        }

        if !any {
            return match self.peek() {
                Some(c) => Err(self.error(format!("unexpected '{c}' at {}", self.pos))),
                None => Err(self.error("expected a selector, found end of input")),
            };
        }
        Ok((compound, eq))
    }

    fn parse_ident(&mut self) -> TrackingResult<String> {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_char) {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.error(format!("expected an identifier at {start}")));
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn parse_attribute(&mut self) -> TrackingResult<AttributeMatch> {
        self.skip_whitespace();
        let name = self.parse_ident()?;
        self.skip_whitespace();
        let value = match self.peek() {
            Some('=') => {
                self.pos += 1;
                self.skip_whitespace();
                let value = match self.peek() {
                    Some(quote @ ('"' | '\'')) => {
                        self.pos += 1;
                        let start = self.pos;
                        while self.peek().is_some_and(|c| c != quote) {
                            self.pos += 1;
                        }
                        if self.peek().is_none() {
                            return Err(self.error("unterminated attribute value"));
                        }
                        let value: String = self.chars[start..self.pos].iter().collect();
                        self.pos += 1;
                        value
                    }
                    _ => self.parse_ident()?,
                };
                self.skip_whitespace();
                Some(value)
            }
            _ => None,
        };
        if self.peek().is_none() {
            return Err(self.error("unterminated attribute selector"));
        }
        self.expect(']')?;
        Ok(AttributeMatch { name, value })
    }

    fn parse_eq(&mut self) -> TrackingResult<usize> {
        let name = self.parse_ident()?;
        if name != "eq" {
            return Err(self.error(format!("unsupported pseudo-class ':{name}'")));
        }
        self.expect('(')?;
        self.skip_whitespace();
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        let digits: String = self.chars[start..self.pos].iter().collect();
        let index = digits
            .parse::<usize>()
            .map_err(|_| self.error(format!("invalid :eq() index '{digits}'")))?;
        self.skip_whitespace();
        self.expect(')')?;
        Ok(index)
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fake {
        tag: &'static str,
        attrs: Vec<(&'static str, &'static str)>,
    }

    impl Element for Fake {
        fn tag(&self) -> String {
            self.tag.to_string()
        }

        fn attribute(&self, name: &str) -> Option<String> {
            self.attrs
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.to_string())
        }

        fn resolved_href(&self) -> Option<String> {
            None
        }
    }

    fn fake(tag: &'static str, attrs: &[(&'static str, &'static str)]) -> Fake {
        Fake {
            tag,
            attrs: attrs.to_vec(),
        }
    }

    #[test]
    fn test_parse_catalog_selectors() {
        let download = Selector::parse("a.resource-url-analytics, a.btn-download").unwrap();
        assert_eq!(download.groups().len(), 2);
        assert_eq!(download.groups()[0].css(), "a.resource-url-analytics");
        assert_eq!(download.groups()[1].css(), "a.btn-download");

        let heading = Selector::parse(".dataset-heading a").unwrap();
        assert_eq!(heading.groups()[0].css(), ".dataset-heading a");

        let text = Selector::parse(".dataset-resource-text a:eq(1)").unwrap();
        assert_eq!(text.groups()[0].position(), Some(1));
        assert_eq!(text.groups()[0].css(), ".dataset-resource-text a");
    }

    #[test]
    fn test_parse_attributes_and_child() {
        let sel = Selector::parse("ul#list > li[data-kind='file'][hidden]").unwrap();
        let group = &sel.groups()[0];
        assert_eq!(group.css(), "ul#list > li[data-kind=\"file\"][hidden]");
        assert_eq!(group.position(), None);
    }

    #[test]
    fn test_attribute_values_escaped_in_css() {
        let sel = Selector::parse(r#"a[title='say "hi"'], a[data-path='c:\tmp']"#).unwrap();
        assert_eq!(sel.groups()[0].css(), r#"a[title="say \"hi\""]"#);
        assert_eq!(sel.groups()[1].css(), r#"a[data-path="c:\\tmp"]"#);
    }

    #[test]
    fn test_rejects_malformed() {
        for bad in ["", "   ", "a,", ",a", "a..b", "a[href", "a[x='y]", "a:hover", "a:eq(x)", "a:eq(1) b", "a:eq(1).c", "a >", "a $b"] {
            let err = Selector::parse(bad).unwrap_err();
            assert!(
                matches!(err, TrackingError::InvalidSelector { .. }),
                "expected InvalidSelector for {bad:?}, got {err:?}"
            );
        }
    }

    #[test]
    fn test_compound_matching() {
        let sel = Selector::parse("a.btn-download[resource_id]").unwrap();
        let group = &sel.groups()[0];
        let hit = fake("A", &[("class", "btn btn-download"), ("resource_id", "7")]);
        let no_attr = fake("a", &[("class", "btn-download")]);
        let wrong_tag = fake("span", &[("class", "btn-download"), ("resource_id", "7")]);
        assert!(group.matches_chain(&[&hit]));
        assert!(!group.matches_chain(&[&no_attr]));
        assert!(!group.matches_chain(&[&wrong_tag]));
    }

    #[test]
    fn test_descendant_and_child_matching() {
        let anchor = fake("a", &[]);
        let heading = fake("h3", &[("class", "dataset-heading")]);
        let item = fake("li", &[("class", "dataset-item")]);

        let descendant = Selector::parse(".dataset-item a").unwrap();
        assert!(descendant.groups()[0].matches_chain(&[&anchor, &heading, &item]));

        let child = Selector::parse(".dataset-item > a").unwrap();
        assert!(!child.groups()[0].matches_chain(&[&anchor, &heading, &item]));
        assert!(child.groups()[0].matches_chain(&[&anchor, &item]));

        let nested = Selector::parse("li .dataset-heading > a").unwrap();
        assert!(nested.groups()[0].matches_chain(&[&anchor, &heading, &item]));
    }
}
