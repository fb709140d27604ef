// Path template parsing and matching
//
// Templates are literal segments separated by `/`; a segment may embed one
// or more `<:name>` placeholders. A template of exactly `*` matches any
// path. Placeholder values are captured by separator inference: each value
// runs up to the first occurrence of the literal text that follows the
// placeholder, and the final placeholder of a segment consumes the rest.

use crate::Error;
use smallvec::SmallVec;
use std::collections::HashMap;

/// Captured placeholder values for one match, owned per request
pub type PathParams = HashMap<String, String>;

/// One token inside a pattern segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Literal(String),
    Param(String),
}

/// One parsed template segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Plain literal segment, compared whole
    Literal(String),
    /// Segment with embedded placeholders
    Pattern(Vec<Token>),
}

/// A parsed, validated path template
#[derive(Debug, Clone)]
pub struct PathTemplate {
    raw: String,
    segments: Vec<Segment>,
    wildcard: bool,
}

/// Split a request path into segments, dropping empties
pub fn split_segments(path: &str) -> SmallVec<[&str; 8]> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

impl PathTemplate {
    /// Parse and validate a template. Malformed placeholders, duplicate
    /// names, adjacent placeholders, and empty non-wildcard templates are
    /// all registration-time errors.
    pub fn parse(raw: &str) -> Result<Self, Error> {
        if raw.trim() == "*" {
            return Ok(Self {
                raw: "*".to_string(),
                segments: Vec::new(),
                wildcard: true,
            });
        }

        let mut segments = Vec::new();
        let mut seen_names: Vec<String> = Vec::new();

        for part in raw.split('/').filter(|s| !s.is_empty()) {
            segments.push(parse_segment(part, raw, &mut seen_names)?);
        }

        if segments.is_empty() {
            return Err(Error::InvalidTemplate(format!(
                "route path must not be empty: {raw:?}"
            )));
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
            wildcard: false,
        })
    }

    /// The template text as registered
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn is_wildcard(&self) -> bool {
        self.wildcard
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Match against the segments of a request path, returning captured
    /// params on success. Matching is total: it never fails other than by
    /// returning `None`.
    pub fn capture(&self, path: &[&str], case_sensitive: bool) -> Option<PathParams> {
        if self.wildcard {
            return Some(PathParams::new());
        }
        if self.segments.len() != path.len() {
            return None;
        }

        let mut params = PathParams::new();
        for (segment, actual) in self.segments.iter().zip(path.iter()) {
            match segment {
                Segment::Literal(expected) => {
                    if !eq_text(expected, actual, case_sensitive) {
                        return None;
                    }
                }
                Segment::Pattern(tokens) => {
                    match_segment(tokens, actual, case_sensitive, &mut params)?;
                }
            }
        }

        Some(params)
    }
}

fn parse_segment(
    part: &str,
    raw: &str,
    seen_names: &mut Vec<String>,
) -> Result<Segment, Error> {
    if !part.contains("<:") {
        return Ok(Segment::Literal(part.to_string()));
    }

    let mut tokens = Vec::new();
    let mut rest = part;

    while let Some(open) = rest.find("<:") {
        if open > 0 {
            tokens.push(Token::Literal(rest[..open].to_string()));
        }
        let after_open = &rest[open + 2..];
        let close = after_open.find('>').ok_or_else(|| {
            Error::InvalidTemplate(format!("unterminated placeholder in {raw:?}"))
        })?;
        let name = &after_open[..close];
        if name.is_empty() {
            return Err(Error::InvalidTemplate(format!(
                "empty placeholder name in {raw:?}"
            )));
        }
        if seen_names.iter().any(|seen| seen == name) {
            return Err(Error::InvalidTemplate(format!(
                "duplicate placeholder {name:?} in {raw:?}"
            )));
        }
        seen_names.push(name.to_string());
        tokens.push(Token::Param(name.to_string()));
        rest = &after_open[close + 1..];
    }
    if !rest.is_empty() {
        tokens.push(Token::Literal(rest.to_string()));
    }

    // Two placeholders with no literal between them leave nothing to infer
    // the boundary from.
    let adjacent = tokens
        .windows(2)
        .any(|pair| matches!(pair, [Token::Param(_), Token::Param(_)]));
    if adjacent {
        return Err(Error::InvalidTemplate(format!(
            "adjacent placeholders without separator in {raw:?}"
        )));
    }

    Ok(Segment::Pattern(tokens))
}

/// Match one pattern segment against one request segment, appending captures.
fn match_segment(
    tokens: &[Token],
    actual: &str,
    case_sensitive: bool,
    params: &mut PathParams,
) -> Option<()> {
    let mut pos = 0;
    let mut i = 0;

    while i < tokens.len() {
        match &tokens[i] {
            Token::Literal(lit) => {
                if !starts_with_at(actual, pos, lit, case_sensitive) {
                    return None;
                }
                pos += lit.len();
            }
            Token::Param(name) => match tokens.get(i + 1) {
                // Separator inference: the value runs up to the next
                // occurrence of the following literal.
                Some(Token::Literal(sep)) => {
                    let idx = find_from(actual, sep, pos, case_sensitive)?;
                    params.insert(name.clone(), actual.get(pos..idx)?.to_string());
                    pos = idx + sep.len();
                    i += 1; // separator consumed here
                }
                // Final placeholder takes the remainder of the segment
                None => {
                    params.insert(name.clone(), actual.get(pos..)?.to_string());
                    pos = actual.len();
                }
                // Rejected at parse time
                Some(Token::Param(_)) => return None,
            },
        }
        i += 1;
    }

    if pos == actual.len() {
        Some(())
    } else {
        None
    }
}

fn eq_text(a: &str, b: &str, case_sensitive: bool) -> bool {
    if case_sensitive {
        a == b
    } else {
        a.eq_ignore_ascii_case(b)
    }
}

fn starts_with_at(haystack: &str, pos: usize, needle: &str, case_sensitive: bool) -> bool {
    match haystack.get(pos..) {
        Some(rest) if case_sensitive => rest.starts_with(needle),
        Some(rest) => {
            rest.len() >= needle.len()
                && rest.as_bytes()[..needle.len()].eq_ignore_ascii_case(needle.as_bytes())
        }
        None => false,
    }
}

/// Byte offset of the first occurrence of `needle` at or after `from`
fn find_from(haystack: &str, needle: &str, from: usize, case_sensitive: bool) -> Option<usize> {
    let hay = haystack.as_bytes().get(from..)?;
    let needle = needle.as_bytes();
    if needle.is_empty() {
        return Some(from);
    }
    if needle.len() > hay.len() {
        return None;
    }
    (0..=hay.len() - needle.len())
        .find(|&i| {
            let window = &hay[i..i + needle.len()];
            if case_sensitive {
                window == needle
            } else {
                window.eq_ignore_ascii_case(needle)
            }
        })
        .map(|i| i + from)
}
