//! `RSpec/ExpectationTargetMethod`: an expectation target must be followed by a runner.
//!
//! ```ruby
//! # bad
//! expect(something).kind_of? Foo
//! is_expected == 42
//! expect { run }.kind_of?(Proc)
//!
//! # good
//! expect(something).to be_a Foo
//! is_expected.to eq 42
//! expect { run }.to raise_error
//! ```
//!
//! The method chained directly onto `expect(...)` / `is_expected` (or onto the
//! `expect { ... }` block) must be one of the configured runners. Any other
//! method is reported at its own name token.

use crate::rules::{Reporter, Rule, RuleContext};
use crate::tree::{MethodCall, NodeId, NodeKind, SyntaxTree};
use common::RunnerSet;

pub const NAME: &str = "RSpec/ExpectationTargetMethod";
pub const MSG: &str = "Use `.to`, `.not_to` or `.to_not` to set an expectation.";

const RESTRICT_ON_SEND: &[&str] = &["expect", "is_expected"];

pub struct ExpectationTargetMethod;

impl Rule for ExpectationTargetMethod {
    fn name(&self) -> &'static str {
        NAME
    }

    fn restrict_on_send(&self) -> &'static [&'static str] {
        RESTRICT_ON_SEND
    }

    fn on_send(&self, cx: RuleContext<'_>, node: NodeId, reporter: &mut Reporter<'_>) {
        if !is_expectation_call(cx.tree, node) {
            return;
        }
        let target = effective_node(cx.tree, node);
        if let Some(call) = offending_call(cx.tree, target, cx.runners) {
            reporter.add_offense(call.selector, MSG);
        }
    }
}

/// `expect(...)` with any arguments, or bare `is_expected`, both without a receiver.
pub fn is_expectation_call(tree: &SyntaxTree, node: NodeId) -> bool {
    let Some(call) = tree.send(node) else {
        return false;
    };
    if call.receiver.is_some() {
        return false;
    }
    match call.method.as_str() {
        "expect" => true,
        "is_expected" => call.arguments.is_empty(),
        _ => false,
    }
}

/// The node the runner is chained onto: the enclosing parameterless block for
/// `expect { ... }`, otherwise `node` itself.
pub fn effective_node(tree: &SyntaxTree, node: NodeId) -> NodeId {
    tree.parent(node)
        .filter(|&parent| is_bare_block_of(tree, parent, node))
        .unwrap_or(node)
}

/// `block` is a block whose invoked call is `call` and whose parameter list is empty.
fn is_bare_block_of(tree: &SyntaxTree, block: NodeId, call: NodeId) -> bool {
    let Some(block) = tree.block(block) else {
        return false;
    };
    block.call == call
        && matches!(
            tree.get(block.params).map(|n| &n.kind),
            Some(NodeKind::Args(params)) if params.is_empty()
        )
}

/// The call chained onto `target` when its method is not a runner.
///
/// Only a plain `target.method` send counts; `target&.method`, or `target`
/// appearing as an argument, is not a chained call.
pub fn offending_call<'t>(
    tree: &'t SyntaxTree,
    target: NodeId,
    runners: &RunnerSet,
) -> Option<&'t MethodCall> {
    let parent = tree.parent(target)?;
    let call = tree.send(parent)?;
    if call.safe_navigation || call.receiver != Some(target) {
        return None;
    }
    (!runners.is_runner(&call.method)).then_some(call)
}
