//! Rule interface and the registered rules.
//!
//! # Adding a Rule
//!
//! 1. Create `crates/inspector/src/rules/<your_rule>.rs` with a unit struct implementing [`Rule`].
//! 2. Add `pub mod your_rule;` below.
//! 3. Push `Box::new(your_rule::YourRule)` into [`all_rules`].

pub mod expectation_target_method;

use common::{Offenses, RunnerSet, Severity, Span};

use crate::tree::{NodeId, SyntaxTree};

/// Read-only data shared by every rule invocation in one pass.
#[derive(Clone, Copy)]
pub struct RuleContext<'a> {
    pub tree: &'a SyntaxTree,
    pub runners: &'a RunnerSet,
}

/// Appends offenses for one rule to the caller's collection.
///
/// Offenses are attributed to the rule name and carry the severity resolved
/// from configuration.
pub struct Reporter<'s> {
    rule: &'static str,
    severity: Severity,
    sink: &'s mut Offenses,
}

impl<'s> Reporter<'s> {
    pub fn new(rule: &'static str, severity: Severity, sink: &'s mut Offenses) -> Self {
        Self {
            rule,
            severity,
            sink,
        }
    }

    /// Records an offense at `span`. Repeated reports of the same span are dropped.
    pub fn add_offense(&mut self, span: Span, message: &'static str) {
        if self.sink.add(self.rule, self.severity, span, message) {
            tracing::trace!(rule = self.rule, line = span.line, column = span.column, "offense");
        }
    }
}

/// A check over call nodes.
///
/// Implementations must be stateless: all working data lives in the
/// [`RuleContext`] and the local variables of `on_send`.
pub trait Rule: Send + Sync {
    /// Identifier used in reports and configuration (e.g. `RSpec/ExpectationTargetMethod`).
    fn name(&self) -> &'static str;

    /// Method names whose call nodes this rule inspects.
    fn restrict_on_send(&self) -> &'static [&'static str];

    fn default_severity(&self) -> Severity {
        Severity::Convention
    }

    /// Inspects the `Send` node `node`, whose method name is in [`restrict_on_send`](Self::restrict_on_send).
    fn on_send(&self, cx: RuleContext<'_>, node: NodeId, reporter: &mut Reporter<'_>);
}

/// Every rule shipped with the crate, in registration order.
pub fn all_rules() -> Vec<Box<dyn Rule>> {
    vec![Box::new(
        expectation_target_method::ExpectationTargetMethod,
    )]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reporter_attributes_rule_and_severity() {
        let mut offenses = Offenses::new();
        let span = Span::new(10, 18, 1, 11);
        {
            let mut reporter = Reporter::new("Test/Rule", Severity::Warning, &mut offenses);
            reporter.add_offense(span, "message");
            reporter.add_offense(span, "message");
        }

        assert_eq!(offenses.len(), 1);
        let offense = offenses.iter().next().unwrap();
        assert_eq!(offense.rule, "Test/Rule");
        assert_eq!(offense.severity, Severity::Warning);
        assert_eq!(offense.span, span);
    }

    #[test]
    fn test_rule_names_are_unique() {
        let rules = all_rules();
        let mut names: Vec<&str> = rules.iter().map(|r| r.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), rules.len());
    }
}
