//! Arena-backed syntax tree.
//!
//! Nodes live in one `Vec` and refer to each other by [`NodeId`]. Child links
//! are stored in the node kind; the upward `parent` link is filled in when the
//! parent is pushed, so trees are built bottom-up and never form ownership cycles.

use common::Span;

/// Index of a node inside its [`SyntaxTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A method call: `recv.meth(args)`, `meth args`, `a == b`, `!a`, `a[i]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodCall {
    /// `None` for receiverless calls (`expect(x)`, `is_expected`).
    pub receiver: Option<NodeId>,
    pub method: String,
    pub arguments: Vec<NodeId>,
    /// Location of the method-name token only, not the whole call.
    pub selector: Span,
    /// `true` for `recv&.meth`.
    pub safe_navigation: bool,
}

impl MethodCall {
    pub fn new(
        receiver: Option<NodeId>,
        method: impl Into<String>,
        arguments: Vec<NodeId>,
        selector: Span,
    ) -> Self {
        Self {
            receiver,
            method: method.into(),
            arguments,
            selector,
            safe_navigation: false,
        }
    }
}

/// A call with a literal block attached: `call { |params| body }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// The invoked call (always a `Send` node).
    pub call: NodeId,
    /// Parameter list (always an `Args` node, possibly empty).
    pub params: NodeId,
    pub body: Option<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Send(MethodCall),
    Block(Block),
    /// A parameterless block whose body uses `_1`..`_9` or `it`.
    NumBlock(Block),
    /// Block parameter list.
    Args(Vec<NodeId>),
    /// Statement sequence or parenthesised group.
    Begin(Vec<NodeId>),
    /// Read of a local variable.
    Lvar(String),
    /// Any construct the analysis does not model; children kept for traversal.
    Other {
        kind: &'static str,
        children: Vec<NodeId>,
    },
}

impl NodeKind {
    /// Direct children in source order.
    pub fn children(&self) -> Vec<NodeId> {
        match self {
            NodeKind::Send(call) => call
                .receiver
                .into_iter()
                .chain(call.arguments.iter().copied())
                .collect(),
            NodeKind::Block(block) | NodeKind::NumBlock(block) => std::iter::once(block.call)
                .chain(std::iter::once(block.params))
                .chain(block.body)
                .collect(),
            NodeKind::Args(items) | NodeKind::Begin(items) => items.clone(),
            NodeKind::Other { children, .. } => children.clone(),
            NodeKind::Lvar(_) => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    /// Location of the whole node.
    pub span: Span,
}

impl Node {
    pub fn as_send(&self) -> Option<&MethodCall> {
        match &self.kind {
            NodeKind::Send(call) => Some(call),
            _ => None,
        }
    }

    pub fn as_block(&self) -> Option<&Block> {
        match &self.kind {
            NodeKind::Block(block) => Some(block),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SyntaxTree {
    nodes: Vec<Node>,
    root: Option<NodeId>,
}

impl SyntaxTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a node and points the `parent` of each of its children at it.
    ///
    /// Children must already be in the tree. A child that is claimed twice keeps
    /// the most recent parent.
    pub fn push(&mut self, kind: NodeKind, span: Span) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        for child in kind.children() {
            if let Some(node) = self.nodes.get_mut(child.index()) {
                node.parent = Some(id);
            }
        }
        self.nodes.push(Node {
            kind,
            parent: None,
            span,
        });
        id
    }

    pub fn set_root(&mut self, root: NodeId) {
        self.root = Some(root);
    }

    /// The root node: the one passed to [`set_root`](Self::set_root), or else the
    /// last node pushed (bottom-up construction finishes with the root).
    pub fn root(&self) -> Option<NodeId> {
        self.root
            .or_else(|| self.nodes.len().checked_sub(1).map(|i| NodeId(i as u32)))
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    pub fn send(&self, id: NodeId) -> Option<&MethodCall> {
        self.get(id).and_then(Node::as_send)
    }

    pub fn block(&self, id: NodeId) -> Option<&Block> {
        self.get(id).and_then(Node::as_block)
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.get(id).map(|n| n.kind.children()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Depth-first pre-order walk from the root, children in source order.
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<NodeId> = self.root().into_iter().collect();
        while let Some(id) = stack.pop() {
            order.push(id);
            let mut children = self.children(id);
            children.reverse();
            stack.extend(children);
        }
        order
    }
}
