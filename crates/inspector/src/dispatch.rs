//! Routes call nodes to the rules interested in them.
//!
//! The interest index (method name → rule indices) is built once per
//! [`Dispatcher`], so a pass touches each `Send` node with a single hash
//! lookup instead of asking every rule about every node.

use std::collections::HashMap;

use common::{LintConfig, Offenses, RunnerSet, Severity};
use tracing::debug;

use crate::rules::{Reporter, Rule, RuleContext};
use crate::tree::SyntaxTree;

struct ActiveRule {
    rule: Box<dyn Rule>,
    severity: Severity,
}

pub struct Dispatcher {
    rules: Vec<ActiveRule>,
    interest: HashMap<&'static str, Vec<usize>>,
    runners: RunnerSet,
}

impl Dispatcher {
    /// Builds the interest index for the enabled subset of `rules`.
    ///
    /// Rules disabled in `config` are dropped; the rest keep registration order
    /// and take their configured severity, or their default.
    pub fn new(rules: Vec<Box<dyn Rule>>, config: &LintConfig) -> Self {
        let mut active = Vec::with_capacity(rules.len());
        let mut interest: HashMap<&'static str, Vec<usize>> = HashMap::new();

        for rule in rules {
            let settings = config.rule(rule.name());
            if !settings.enabled {
                debug!(rule = rule.name(), "rule disabled by config");
                continue;
            }
            let index = active.len();
            for &method in rule.restrict_on_send() {
                interest.entry(method).or_default().push(index);
            }
            let severity = settings.severity.unwrap_or_else(|| rule.default_severity());
            active.push(ActiveRule { rule, severity });
        }

        Self {
            rules: active,
            interest,
            runners: config.runners.clone(),
        }
    }

    /// Runs every interested rule over `tree` in depth-first pre-order.
    pub fn run(&self, tree: &SyntaxTree) -> Offenses {
        let mut offenses = Offenses::new();
        if self.interest.is_empty() {
            return offenses;
        }

        let cx = RuleContext {
            tree,
            runners: &self.runners,
        };
        for id in tree.preorder() {
            let Some(call) = tree.send(id) else {
                continue;
            };
            let Some(indices) = self.interest.get(call.method.as_str()) else {
                continue;
            };
            for &index in indices {
                let active = &self.rules[index];
                let mut reporter = Reporter::new(active.rule.name(), active.severity, &mut offenses);
                active.rule.on_send(cx, id, &mut reporter);
            }
        }
        offenses
    }

    /// Method names at least one active rule listens for, sorted.
    pub fn interesting_methods(&self) -> Vec<&'static str> {
        let mut methods: Vec<&'static str> = self.interest.keys().copied().collect();
        methods.sort_unstable();
        methods
    }

    /// Active rules with their resolved severities, in registration order.
    pub fn rules(&self) -> impl Iterator<Item = (&dyn Rule, Severity)> + '_ {
        self.rules.iter().map(|a| (a.rule.as_ref(), a.severity))
    }

    pub fn runners(&self) -> &RunnerSet {
        &self.runners
    }
}
