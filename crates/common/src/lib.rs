pub mod config;

pub use config::{ConfigError, FileConfig, LintConfig, RuleConfig, RunnerSet};

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// A region of an analysed source file.
///
/// `start_byte..end_byte` indexes the source buffer; `line` and `column` locate
/// the first byte (both 1-indexed, column counted in bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Span {
    pub start_byte: u32,
    pub end_byte: u32,
    pub line: u32,
    pub column: u32,
}

impl Span {
    pub fn new(start_byte: u32, end_byte: u32, line: u32, column: u32) -> Self {
        Self {
            start_byte,
            end_byte,
            line,
            column,
        }
    }

    /// Slices `source` to the bytes covered by this span, if they are in bounds.
    pub fn slice<'s>(&self, source: &'s [u8]) -> Option<&'s [u8]> {
        source.get(self.start_byte as usize..self.end_byte as usize)
    }
}

/// How loudly an offense is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Convention,
    Warning,
    Error,
}

impl Severity {
    /// Single-letter code used in text reports (`C`, `W`, `E`).
    pub fn code(self) -> char {
        match self {
            Severity::Convention => 'C',
            Severity::Warning => 'W',
            Severity::Error => 'E',
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Convention => "convention",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        f.write_str(s)
    }
}

/// A single reported rule violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Offense {
    /// Identifier of the rule that produced the offense (e.g. `RSpec/ExpectationTargetMethod`).
    pub rule: &'static str,
    pub severity: Severity,
    pub span: Span,
    pub message: &'static str,
}

/// Caller-owned offense collection for one file.
///
/// Offenses keep insertion order. A second offense with the same rule and span
/// is rejected, so one misuse is never reported twice.
#[derive(Debug, Default)]
pub struct Offenses {
    items: Vec<Offense>,
    seen: HashSet<(&'static str, Span)>,
}

impl Offenses {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an offense. Returns `false` if the same rule already reported this span.
    pub fn add(
        &mut self,
        rule: &'static str,
        severity: Severity,
        span: Span,
        message: &'static str,
    ) -> bool {
        if !self.seen.insert((rule, span)) {
            return false;
        }
        self.items.push(Offense {
            rule,
            severity,
            span,
            message,
        });
        true
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Offense> {
        self.items.iter()
    }

    pub fn into_vec(self) -> Vec<Offense> {
        self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RULE: &str = "Test/Rule";

    #[test]
    fn test_span_slice() {
        let source = b"expect(x).kind_of? Foo";
        let span = Span::new(10, 18, 1, 11);
        assert_eq!(span.slice(source), Some(&b"kind_of?"[..]));
        assert_eq!(Span::new(10, 99, 1, 11).slice(source), None);
    }

    #[test]
    fn test_offenses_keep_insertion_order() {
        let mut offenses = Offenses::new();
        assert!(offenses.add(RULE, Severity::Convention, Span::new(20, 22, 2, 1), "b"));
        assert!(offenses.add(RULE, Severity::Convention, Span::new(0, 2, 1, 1), "a"));

        let messages: Vec<&str> = offenses.iter().map(|o| o.message).collect();
        assert_eq!(messages, vec!["b", "a"]);
    }

    #[test]
    fn test_offenses_reject_duplicate_span() {
        let mut offenses = Offenses::new();
        let span = Span::new(10, 18, 1, 11);
        assert!(offenses.add(RULE, Severity::Convention, span, "msg"));
        assert!(!offenses.add(RULE, Severity::Convention, span, "msg"));
        assert_eq!(offenses.len(), 1);

        // Another rule may still report the same location.
        assert!(offenses.add("Other/Rule", Severity::Warning, span, "msg"));
        assert_eq!(offenses.len(), 2);
    }

    #[derive(Serialize)]
    struct Wrapper {
        severity: Severity,
    }

    #[test]
    fn test_severity_serializes_lowercase() {
        let text = toml::to_string(&Wrapper {
            severity: Severity::Convention,
        })
        .unwrap();
        assert_eq!(text.trim(), "severity = \"convention\"");
    }

    #[test]
    fn test_severity_code() {
        assert_eq!(Severity::Convention.code(), 'C');
        assert_eq!(Severity::Warning.code(), 'W');
        assert_eq!(Severity::Error.code(), 'E');
        assert_eq!(Severity::Error.to_string(), "error");
    }
}
