use serde::Serialize;
use std::str::FromStr;
use tracing::debug;

use super::matcher::PatternMatcher;
use crate::errors::PatternError;

/// Wraps a pattern body to mark it as a regular expression: `/^report\d+\.pdf$/`
pub const REGEX_DELIMITER: char = '/';

const AND_TOKEN: &str = "&&";
const OR_TOKEN: &str = "||";

/// How the individual patterns of a query combine into one decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Combinator {
    /// Exactly one pattern, no operator in the input
    Single,
    /// Every pattern must match (`&&`)
    All,
    /// At least one pattern must match (`||`)
    Any,
}

/// Matching algorithm applied to each pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternKind {
    /// Case-insensitive containment
    Substring,
    /// Case-insensitive regular expression, anchored to the whole name
    Regex,
}

/// A parsed and validated file name query.
///
/// Built once per run and shared read-only by every worker. Regular expressions
/// are compiled during parsing, so a `Query` that exists is always usable.
#[derive(Debug, Clone)]
pub struct Query {
    patterns: Vec<String>,
    combinator: Combinator,
    kind: PatternKind,
    matcher: PatternMatcher,
}

impl Query {
    /// Parses raw query text.
    ///
    /// * Surrounding whitespace is ignored.
    /// * `/body/` selects regex matching for every pattern in `body`.
    /// * `a&&b` requires all patterns, `a||b` requires any; mixing both is rejected.
    /// * Empty segments are dropped; a query with no patterns left is rejected.
    pub fn parse(raw: &str) -> Result<Self, PatternError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(PatternError::EmptyPattern);
        }

        let (body, kind) = match strip_delimiters(trimmed) {
            Some(body) => (body, PatternKind::Regex),
            None => (trimmed, PatternKind::Substring),
        };

        let (combinator, segments): (Combinator, Vec<&str>) =
            match (body.contains(AND_TOKEN), body.contains(OR_TOKEN)) {
                (true, true) => return Err(PatternError::AmbiguousCombinator),
                (true, false) => (Combinator::All, body.split(AND_TOKEN).collect()),
                (false, true) => (Combinator::Any, body.split(OR_TOKEN).collect()),
                (false, false) => (Combinator::Single, vec![body]),
            };

        let patterns: Vec<String> = segments
            .into_iter()
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .map(String::from)
            .collect();

        if patterns.is_empty() {
            return Err(PatternError::EmptyPattern);
        }

        let matcher = PatternMatcher::new(&patterns, kind, combinator)?;
        debug!(
            "Parsed query: {} {:?} pattern(s) combined as {:?}",
            patterns.len(),
            kind,
            combinator
        );

        Ok(Self {
            patterns,
            combinator,
            kind,
            matcher,
        })
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn combinator(&self) -> Combinator {
        self.combinator
    }

    pub fn kind(&self) -> PatternKind {
        self.kind
    }

    /// Returns true if `name` satisfies this query
    pub fn matches(&self, name: &str) -> bool {
        self.matcher.is_match(name)
    }
}

impl FromStr for Query {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn strip_delimiters(text: &str) -> Option<&str> {
    if text.len() >= 2 && text.starts_with(REGEX_DELIMITER) && text.ends_with(REGEX_DELIMITER) {
        Some(&text[1..text.len() - 1])
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_substring() {
        let query = Query::parse("  hello  ").unwrap();
        assert_eq!(query.patterns(), ["hello"]);
        assert_eq!(query.combinator(), Combinator::Single);
        assert_eq!(query.kind(), PatternKind::Substring);
    }

    #[test]
    fn test_all_combinator_trims_segments() {
        let query = Query::parse("hello && world").unwrap();
        assert_eq!(query.patterns(), ["hello", "world"]);
        assert_eq!(query.combinator(), Combinator::All);
    }

    #[test]
    fn test_any_combinator() {
        let query = Query::parse("hello||world").unwrap();
        assert_eq!(query.patterns(), ["hello", "world"]);
        assert_eq!(query.combinator(), Combinator::Any);
    }

    #[test]
    fn test_empty_segments_are_dropped() {
        let query = Query::parse("a&&&& &&b").unwrap();
        assert_eq!(query.patterns(), ["a", "b"]);

        // An operator was seen, so this is not a SINGLE query even with one survivor
        let query = Query::parse("report&&").unwrap();
        assert_eq!(query.patterns(), ["report"]);
        assert_eq!(query.combinator(), Combinator::All);
    }

    #[test]
    fn test_mixed_combinators_rejected() {
        assert_eq!(
            Query::parse("a&&b||c").unwrap_err(),
            PatternError::AmbiguousCombinator
        );
        assert_eq!(
            Query::parse("/a&&b||c/").unwrap_err(),
            PatternError::AmbiguousCombinator
        );
    }

    #[test]
    fn test_empty_inputs_rejected() {
        assert_eq!(Query::parse("").unwrap_err(), PatternError::EmptyPattern);
        assert_eq!(Query::parse("   ").unwrap_err(), PatternError::EmptyPattern);
        assert_eq!(Query::parse("//").unwrap_err(), PatternError::EmptyPattern);
        assert_eq!(Query::parse("/  /").unwrap_err(), PatternError::EmptyPattern);
        assert_eq!(Query::parse("&& ||").unwrap_err(), PatternError::AmbiguousCombinator);
        assert_eq!(Query::parse(" && ").unwrap_err(), PatternError::EmptyPattern);
    }

    #[test]
    fn test_regex_delimiters() {
        let query = Query::parse(r"/^test[0-9]+\.exe$/").unwrap();
        assert_eq!(query.kind(), PatternKind::Regex);
        assert_eq!(query.patterns(), [r"^test[0-9]+\.exe$"]);

        let query = Query::parse(r"/\.rs$ || \.toml$/").unwrap();
        assert_eq!(query.kind(), PatternKind::Regex);
        assert_eq!(query.combinator(), Combinator::Any);
        assert_eq!(query.patterns(), [r"\.rs$", r"\.toml$"]);
    }

    #[test]
    fn test_lone_delimiter_is_substring() {
        let query = Query::parse("/").unwrap();
        assert_eq!(query.kind(), PatternKind::Substring);
        assert_eq!(query.patterns(), ["/"]);

        let query = Query::parse("/half").unwrap();
        assert_eq!(query.kind(), PatternKind::Substring);
    }

    #[test]
    fn test_invalid_regex_fails_fast() {
        let err = Query::parse("/valid||(unclosed/").unwrap_err();
        match err {
            PatternError::InvalidRegex { pattern, .. } => assert_eq!(pattern, "(unclosed"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_is_deterministic() {
        let a = Query::parse("x || y").unwrap();
        let b: Query = "x || y".parse().unwrap();
        assert_eq!(a.patterns(), b.patterns());
        assert_eq!(a.combinator(), b.combinator());
        assert_eq!(a.kind(), b.kind());
    }
}
