//! Tree-sitter Ruby front end.
//!
//! Parses spec files with the tree-sitter Ruby grammar and lowers the concrete
//! syntax tree into the arena [`SyntaxTree`]. Lowering produces the node shapes
//! the parser gem uses, which is what the rules are written against:
//!
//! - `call` becomes `Send`; an attached `{ }` / `do end` block wraps the send in
//!   `Block { call, params, body }`.
//! - Operators (`a == b`, `!a`, `a[i]`) become `Send` with the operator token as
//!   the selector.
//! - A receiverless identifier is a `Send` unless it names a local variable in
//!   the current scope, in which case it is an `Lvar`.
//! - A parameterless block whose body reads `_1`..`_9` or `it` is a `NumBlock`.
//!
//! Everything else is kept as `Other` so traversal still reaches nested calls.

use std::collections::HashSet;

use tree_sitter::{Node as TsNode, Parser};

use crate::tree::{Block, MethodCall, NodeId, NodeKind, SyntaxTree};
use crate::InspectorError;
use common::Span;

/// Node kinds that become a `Begin` statement sequence.
const SEQUENCE_KINDS: &[&str] = &[
    "program",
    "body_statement",
    "block_body",
    "parenthesized_statements",
];

/// Node kinds that start a fresh local-variable scope.
const SCOPE_GATES: &[&str] = &[
    "method",
    "singleton_method",
    "class",
    "module",
    "singleton_class",
];

/// Parameter-list node kinds.
const PARAMETER_LISTS: &[&str] = &["block_parameters", "method_parameters", "lambda_parameters"];

/// Node kinds whose nested identifiers are binding targets.
const BINDING_CONTAINERS: &[&str] = &[
    "left_assignment_list",
    "destructured_left_assignment",
    "rest_assignment",
    "destructured_parameter",
    "optional_parameter",
    "keyword_parameter",
    "splat_parameter",
    "hash_splat_parameter",
    "block_parameter",
];

/// Binary operators that are control flow rather than method calls.
const LOGICAL_OPERATORS: &[&str] = &["and", "or", "&&", "||"];

/// Deepest node nesting lowered before the source is rejected.
const MAX_NESTING_DEPTH: usize = 256;

/// `_1`..`_9` and `it`, the implicit parameters of a parameterless block.
fn is_implicit_parameter(name: &str) -> bool {
    match name.as_bytes() {
        b"it" => true,
        [b'_', digit] => (b'1'..=b'9').contains(digit),
        _ => false,
    }
}

/// Owns the tree-sitter parser for Ruby sources.
///
/// # Example
/// ```
/// use inspector::ParserHost;
///
/// let mut host = ParserHost::new().unwrap();
/// let tree = host.parse_bytes(b"expect(value).to eq 42").unwrap();
/// assert!(!tree.is_empty());
/// ```
pub struct ParserHost {
    parser: Parser,
}

impl ParserHost {
    /// Creates a parser host with the Ruby grammar loaded.
    ///
    /// # Errors
    /// Returns `InspectorError::ParseFailure` if the grammar cannot be loaded
    /// (tree-sitter ABI mismatch).
    pub fn new() -> Result<Self, InspectorError> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_ruby::LANGUAGE.into())
            .map_err(|e| {
                InspectorError::ParseFailure(format!("Failed to load Ruby grammar: {}", e))
            })?;
        Ok(Self { parser })
    }

    /// Parses a source buffer and lowers it into a [`SyntaxTree`].
    ///
    /// Ruby syntax errors are not reported: tree-sitter recovers and the
    /// unparseable region ends up as `Other` nodes.
    ///
    /// # Errors
    /// - `ByteRangeOverflow`: buffer larger than 4GB (tree-sitter u32 limit)
    /// - `NestingTooDeep`: calls, groups or blocks nested past the lowering limit
    /// - `ParseFailure`: tree-sitter returned no tree, or an identifier is not UTF-8
    pub fn parse_bytes(&mut self, source: &[u8]) -> Result<SyntaxTree, InspectorError> {
        if source.len() > u32::MAX as usize {
            return Err(InspectorError::ByteRangeOverflow);
        }
        if source.is_empty() {
            return Ok(SyntaxTree::new());
        }

        let cst = self.parser.parse(source, None).ok_or_else(|| {
            InspectorError::ParseFailure("Tree-sitter parse returned None".to_string())
        })?;

        let mut lowering = Lowering::new(source);
        let root = lowering.lower(cst.root_node())?;
        let mut tree = lowering.tree;
        tree.set_root(root);
        Ok(tree)
    }
}

/// Converts a tree-sitter node's extent into a [`Span`].
fn span_of(node: &TsNode<'_>) -> Span {
    span_until(node, node.end_byte())
}

/// A span starting at `node` and ending at byte `end`.
fn span_until(node: &TsNode<'_>, end: usize) -> Span {
    let start = node.start_position();
    Span::new(
        node.start_byte() as u32,
        end as u32,
        start.row as u32 + 1,
        start.column as u32 + 1,
    )
}

/// Named, non-comment children of `node`, skipping those attached to any of `skip_fields`.
fn named_children<'t>(node: TsNode<'t>, skip_fields: &[&str]) -> Vec<TsNode<'t>> {
    let mut out = Vec::new();
    let mut cursor = node.walk();
    if !cursor.goto_first_child() {
        return out;
    }
    loop {
        let child = cursor.node();
        let skipped = cursor
            .field_name()
            .is_some_and(|field| skip_fields.contains(&field));
        if child.is_named() && child.kind() != "comment" && !skipped {
            out.push(child);
        }
        if !cursor.goto_next_sibling() {
            break;
        }
    }
    out
}

/// First anonymous token child of `node` with the given text (e.g. `"&."`, `"["`).
fn find_token<'t>(node: TsNode<'t>, token: &str) -> Option<TsNode<'t>> {
    let mut cursor = node.walk();
    let found = node
        .children(&mut cursor)
        .find(|c| !c.is_named() && c.kind() == token);
    found
}

struct Lowering<'s> {
    source: &'s [u8],
    tree: SyntaxTree,
    /// Local variable names visible at the current position, innermost last.
    scopes: Vec<HashSet<String>>,
    /// One entry per enclosing block, innermost last: `Some(used)` for a block
    /// that may take implicit parameters, `None` for one that cannot.
    implicit_params: Vec<Option<bool>>,
    depth: usize,
}

impl<'s> Lowering<'s> {
    fn new(source: &'s [u8]) -> Self {
        Self {
            source,
            tree: SyntaxTree::new(),
            scopes: vec![HashSet::new()],
            implicit_params: Vec::new(),
            depth: 0,
        }
    }

    fn text(&self, node: TsNode<'_>) -> Result<&'s str, InspectorError> {
        node.utf8_text(self.source)
            .map_err(|_| InspectorError::ParseFailure("Non-UTF-8 identifier".to_string()))
    }

    fn is_local(&self, name: &str) -> bool {
        self.scopes.last().is_some_and(|scope| scope.contains(name))
    }

    /// Runs `f` inside a new scope. Blocks inherit the enclosing locals; `def`,
    /// `class` and `module` start empty.
    fn with_scope<T>(&mut self, inherit: bool, f: impl FnOnce(&mut Self) -> T) -> T {
        let scope = if inherit {
            self.scopes.last().cloned().unwrap_or_default()
        } else {
            HashSet::new()
        };
        self.scopes.push(scope);
        let out = f(self);
        self.scopes.pop();
        out
    }

    fn descend(&mut self) -> Result<(), InspectorError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(InspectorError::NestingTooDeep(MAX_NESTING_DEPTH));
        }
        self.depth += 1;
        Ok(())
    }

    /// Runs `f` with `frame` as the innermost block's implicit-parameter state
    /// and returns it alongside `f`'s result.
    fn with_block_frame<T>(
        &mut self,
        frame: Option<bool>,
        f: impl FnOnce(&mut Self) -> T,
    ) -> (T, Option<bool>) {
        self.implicit_params.push(frame);
        let out = f(self);
        let frame = self.implicit_params.pop().flatten();
        (out, frame)
    }

    fn lower(&mut self, node: TsNode<'_>) -> Result<NodeId, InspectorError> {
        self.descend()?;
        let lowered = self.lower_node(node);
        self.depth -= 1;
        lowered
    }

    fn lower_node(&mut self, node: TsNode<'_>) -> Result<NodeId, InspectorError> {
        let kind = node.kind();
        match kind {
            "call" => self.lower_call(node),
            "identifier" => self.lower_identifier(node),
            "binary" => self.lower_binary(node),
            "unary" => self.lower_unary(node),
            "element_reference" => self.lower_element_reference(node),
            "assignment" | "operator_assignment" => {
                // The target is a local from here on, including on the right-hand side.
                if let Some(left) = node.child_by_field_name("left") {
                    self.declare_targets(left)?;
                }
                self.lower_other(node)
            }
            "block" | "do_block" | "lambda" => {
                let (lowered, _) = self.with_block_frame(None, |this| {
                    this.with_scope(true, |this| this.lower_other(node))
                });
                lowered
            }
            _ if SEQUENCE_KINDS.contains(&kind) => {
                let items = self.lower_all(named_children(node, &[]))?;
                Ok(self.tree.push(NodeKind::Begin(items), span_of(&node)))
            }
            _ if PARAMETER_LISTS.contains(&kind) => self.lower_parameters(node),
            _ if SCOPE_GATES.contains(&kind) => self.with_scope(false, |this| this.lower_other(node)),
            _ => self.lower_other(node),
        }
    }

    fn lower_all(&mut self, nodes: Vec<TsNode<'_>>) -> Result<Vec<NodeId>, InspectorError> {
        nodes.into_iter().map(|n| self.lower(n)).collect()
    }

    /// Keeps an unmodelled node, lowering its children. Definition names are dropped.
    fn lower_other(&mut self, node: TsNode<'_>) -> Result<NodeId, InspectorError> {
        let children = self.lower_all(named_children(node, &["name"]))?;
        Ok(self.tree.push(
            NodeKind::Other {
                kind: node.kind(),
                children,
            },
            span_of(&node),
        ))
    }

    fn lower_call(&mut self, node: TsNode<'_>) -> Result<NodeId, InspectorError> {
        let receiver = match node.child_by_field_name("receiver") {
            Some(r) => Some(self.lower(r)?),
            None => None,
        };
        let safe_navigation = find_token(node, "&.").is_some();

        let method_node = node.child_by_field_name("method");
        let (method, selector) = match method_node {
            Some(m) => (self.text(m)?.to_string(), span_of(&m)),
            None => {
                // `recv.()` is sugar for `recv.call()`; the dot stands in for the selector.
                let dot = find_token(node, ".").or_else(|| find_token(node, "&."));
                let selector = dot.map(|d| span_of(&d)).unwrap_or_else(|| span_of(&node));
                ("call".to_string(), selector)
            }
        };

        let args_node = node.child_by_field_name("arguments");
        let arguments = match args_node {
            Some(a) => self.lower_all(named_children(a, &[]))?,
            None => Vec::new(),
        };

        // Without the block, the send ends after its arguments (or its name).
        let end = args_node
            .or(method_node)
            .map(|n| n.end_byte())
            .unwrap_or_else(|| node.end_byte());
        let call = MethodCall {
            receiver,
            method,
            arguments,
            selector,
            safe_navigation,
        };
        let call_id = self.tree.push(NodeKind::Send(call), span_until(&node, end));

        match node.child_by_field_name("block") {
            Some(block) => self.lower_attached_block(call_id, block, span_of(&node)),
            None => Ok(call_id),
        }
    }

    fn lower_attached_block(
        &mut self,
        call: NodeId,
        block: TsNode<'_>,
        span: Span,
    ) -> Result<NodeId, InspectorError> {
        let explicit = block.child_by_field_name("parameters");
        let frame = if explicit.is_some() { None } else { Some(false) };

        let (lowered, frame) = self.with_block_frame(frame, |this| {
            this.with_scope(true, |this| {
                let params = match explicit {
                    Some(p) => this.lower_parameters(p)?,
                    None => {
                        let at = span_until(&block, block.start_byte());
                        this.tree.push(NodeKind::Args(Vec::new()), at)
                    }
                };

                let body = match block.child_by_field_name("body") {
                    Some(b) => Some(this.lower(b)?),
                    None => {
                        let items = this.lower_all(named_children(block, &["parameters"]))?;
                        if items.is_empty() {
                            None
                        } else {
                            Some(this.tree.push(NodeKind::Begin(items), span_of(&block)))
                        }
                    }
                };
                Ok::<_, InspectorError>(Block { call, params, body })
            })
        });

        let block = lowered?;
        let kind = if frame == Some(true) {
            NodeKind::NumBlock(block)
        } else {
            NodeKind::Block(block)
        };
        Ok(self.tree.push(kind, span))
    }

    fn lower_parameters(&mut self, node: TsNode<'_>) -> Result<NodeId, InspectorError> {
        let mut params = Vec::new();
        for child in named_children(node, &[]) {
            self.declare_targets(child)?;
            params.push(self.tree.push(
                NodeKind::Other {
                    kind: child.kind(),
                    children: Vec::new(),
                },
                span_of(&child),
            ));
        }
        Ok(self.tree.push(NodeKind::Args(params), span_of(&node)))
    }

    /// Records the local variables bound by an assignment target or parameter.
    fn declare_targets(&mut self, node: TsNode<'_>) -> Result<(), InspectorError> {
        self.descend()?;
        let declared = self.declare_targets_in(node);
        self.depth -= 1;
        declared
    }

    fn declare_targets_in(&mut self, node: TsNode<'_>) -> Result<(), InspectorError> {
        if node.kind() == "identifier" {
            let name = self.text(node)?.to_string();
            if let Some(scope) = self.scopes.last_mut() {
                scope.insert(name);
            }
        } else if BINDING_CONTAINERS.contains(&node.kind()) {
            for child in named_children(node, &["value"]) {
                self.declare_targets(child)?;
            }
        }
        Ok(())
    }

    fn lower_identifier(&mut self, node: TsNode<'_>) -> Result<NodeId, InspectorError> {
        let name = self.text(node)?;
        let span = span_of(&node);
        let kind = if self.is_local(name) {
            NodeKind::Lvar(name.to_string())
        } else {
            if is_implicit_parameter(name) {
                if let Some(Some(used)) = self.implicit_params.last_mut() {
                    *used = true;
                }
            }
            NodeKind::Send(MethodCall::new(None, name, Vec::new(), span))
        };
        Ok(self.tree.push(kind, span))
    }

    fn lower_binary(&mut self, node: TsNode<'_>) -> Result<NodeId, InspectorError> {
        let (Some(left), Some(op), Some(right)) = (
            node.child_by_field_name("left"),
            node.child_by_field_name("operator"),
            node.child_by_field_name("right"),
        ) else {
            return self.lower_other(node);
        };
        let operator = self.text(op)?;
        if LOGICAL_OPERATORS.contains(&operator) {
            return self.lower_other(node);
        }

        let receiver = self.lower(left)?;
        let argument = self.lower(right)?;
        let call = MethodCall::new(Some(receiver), operator, vec![argument], span_of(&op));
        Ok(self.tree.push(NodeKind::Send(call), span_of(&node)))
    }

    fn lower_unary(&mut self, node: TsNode<'_>) -> Result<NodeId, InspectorError> {
        let (Some(op), Some(operand)) = (
            node.child_by_field_name("operator"),
            node.child_by_field_name("operand"),
        ) else {
            return self.lower_other(node);
        };
        let method = match self.text(op)? {
            "!" | "not" => "!",
            "-" => "-@",
            "+" => "+@",
            "~" => "~",
            // defined?
            _ => return self.lower_other(node),
        };

        let receiver = self.lower(operand)?;
        let call = MethodCall::new(Some(receiver), method, Vec::new(), span_of(&op));
        Ok(self.tree.push(NodeKind::Send(call), span_of(&node)))
    }

    fn lower_element_reference(&mut self, node: TsNode<'_>) -> Result<NodeId, InspectorError> {
        let Some(object) = node.child_by_field_name("object") else {
            return self.lower_other(node);
        };
        let receiver = self.lower(object)?;
        let arguments = self.lower_all(named_children(node, &["object"]))?;
        let selector = match find_token(node, "[") {
            Some(open) => span_until(&open, node.end_byte()),
            None => span_of(&node),
        };
        let call = MethodCall::new(Some(receiver), "[]", arguments, selector);
        Ok(self.tree.push(NodeKind::Send(call), span_of(&node)))
    }
}
