use regex::{Regex, RegexBuilder};

use super::query::{Combinator, PatternKind, Query};
use crate::errors::PatternError;

/// Strategy for matching a single pattern against a file name
#[derive(Debug, Clone)]
pub enum MatchStrategy {
    /// Lowercased needle, compared against the lowercased name
    Substring(String),
    /// Case-insensitive regex anchored at both ends
    Regex(Regex),
}

impl MatchStrategy {
    fn compile(pattern: &str, kind: PatternKind) -> Result<Self, PatternError> {
        match kind {
            PatternKind::Substring => Ok(Self::Substring(pattern.to_lowercase())),
            PatternKind::Regex => {
                // The bare pattern must compile on its own so it cannot close the anchoring group
                build_regex(pattern)
                    .and_then(|_| build_regex(&format!("^(?:{pattern})$")))
                    .map(Self::Regex)
                    .map_err(|e| PatternError::invalid_regex(pattern, e.to_string()))
            }
        }
    }

    fn is_match(&self, name: &str, folded: &str) -> bool {
        match self {
            Self::Substring(needle) => folded.contains(needle.as_str()),
            Self::Regex(regex) => regex.is_match(name),
        }
    }
}

fn build_regex(source: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(source).case_insensitive(true).build()
}

/// Decides whether a file name satisfies a set of compiled patterns.
///
/// Holds no mutable state, so one instance is shared by every worker without locking.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    strategies: Vec<MatchStrategy>,
    combinator: Combinator,
    folds_case: bool,
}

impl PatternMatcher {
    /// Compiles every pattern up front; the first regex that fails to compile
    /// rejects the whole set.
    pub fn new(
        patterns: &[String],
        kind: PatternKind,
        combinator: Combinator,
    ) -> Result<Self, PatternError> {
        let strategies = patterns
            .iter()
            .map(|pattern| MatchStrategy::compile(pattern, kind))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            strategies,
            combinator,
            folds_case: kind == PatternKind::Substring,
        })
    }

    pub fn is_match(&self, name: &str) -> bool {
        let folded = if self.folds_case {
            name.to_lowercase()
        } else {
            String::new()
        };

        match self.combinator {
            Combinator::Single | Combinator::All => self
                .strategies
                .iter()
                .all(|strategy| strategy.is_match(name, &folded)),
            Combinator::Any => self
                .strategies
                .iter()
                .any(|strategy| strategy.is_match(name, &folded)),
        }
    }
}

/// Returns true if `name` satisfies `query`
pub fn matches(name: &str, query: &Query) -> bool {
    query.matches(name)
}
