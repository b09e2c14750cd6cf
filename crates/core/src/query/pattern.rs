use regex::Regex;
use typescout_api::{DiscoveryError, Result};

/// How a pattern must cover the subject string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchStyle {
    /// Any substring may match.
    #[default]
    Find,
    /// The whole string must match.
    Match,
}

/// A user-supplied regular expression, compiled for both partial and
/// whole-string use.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    partial: Regex,
    whole: Regex,
}

impl Pattern {
    pub fn compile(source: &str) -> Result<Self> {
        let invalid = |source_err| DiscoveryError::InvalidPattern {
            pattern: source.to_string(),
            source: source_err,
        };
        let partial = Regex::new(source).map_err(invalid)?;
        // A trailing verbose-mode comment would swallow the closing group.
        let whole = Regex::new(&format!("^(?:{source})$"))
            .or_else(|_| Regex::new(&format!("^(?:{source}\n)$")))
            .map_err(invalid)?;
        Ok(Self {
            source: source.to_string(),
            partial,
            whole,
        })
    }

    pub fn compile_all<'a>(sources: impl IntoIterator<Item = &'a String>) -> Result<Vec<Self>> {
        sources.into_iter().map(|s| Self::compile(s)).collect()
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, subject: &str, style: MatchStyle) -> bool {
        match style {
            MatchStyle::Find => self.partial.is_match(subject),
            MatchStyle::Match => self.whole.is_match(subject),
        }
    }
}

/// True when no patterns are given or at least one of them matches.
pub fn any_matches(patterns: &[Pattern], subject: &str, style: MatchStyle) -> bool {
    patterns.is_empty() || patterns.iter().any(|p| p.is_match(subject, style))
}
