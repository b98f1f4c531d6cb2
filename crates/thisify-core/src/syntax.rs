//! Mutable arena syntax tree.
//!
//! A [`SyntaxTree`] represents one source file. Nodes live in an arena and are
//! addressed by [`NodeId`]; parents own their children through the `children`
//! list while the `parent` link is a plain id used only for upward lookups.
//!
//! # Text and Spans
//!
//! Only leaves carry text. The rendered text of a node is the concatenation of
//! its leaves in pre-order, so the tree is lossless: rendering the root gives
//! back exactly the text the host parsed, plus whatever mutations were applied.
//!
//! Spans are never stored on nodes. They are derived from the live tree through
//! a layout cache that is dropped on every mutation, which means a span read
//! after a mutation always reflects the mutated text. Callers that hold on to a
//! span across mutations can detect staleness with [`SyntaxTree::revision`].
//!
//! # Mutation
//!
//! The only structural mutation is [`SyntaxTree::replace_prefixed`], which swaps
//! a node for a freshly built one. Replacement does not renumber anything: all
//! other [`NodeId`]s stay valid, and the replaced node becomes detached.
//!
//! # Building
//!
//! Host parsers build trees with [`TreeBuilder`], which supports checkpoints so
//! a parser can decide the kind of a node after consuming its first tokens.

use std::cell::OnceCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;

use crate::patch::Span;

// ============================================================================
// Node Identity and Kinds
// ============================================================================

/// A stable identifier for a node in a [`SyntaxTree`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Node kinds inspected by the qualification operation.
///
/// Everything the operation does not look at is [`NodeKind::Other`]; the
/// attached [`OtherKind`] is host detail (used by parsers and indexes) and is
/// opaque to the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Root of a source file.
    File,
    /// A class, interface, enum, record, or anonymous class body.
    ClassDeclaration,
    /// A field declaration, possibly declaring several variables.
    FieldDeclaration,
    /// A method or constructor declaration.
    MethodDeclaration,
    /// Modifiers and annotations preceding a declaration.
    ModifierList,
    /// A (possibly qualified) name used as an expression.
    ReferenceExpression,
    /// A name token.
    Identifier,
    /// Anything else.
    Other(OtherKind),
}

/// Host-side detail for nodes the core treats as opaque.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OtherKind {
    Whitespace,
    Comment,
    Keyword,
    Literal,
    Punct,
    Annotation,
    TypeRef,
    ClassBody,
    EnumConstant,
    ParameterList,
    Parameter,
    Declarator,
    Block,
    Statement,
    LocalVariable,
    MethodCall,
    ArgumentList,
    ArrayInitializer,
    NewExpression,
    Lambda,
    QualifiedThis,
    Initializer,
    Error,
}

impl NodeKind {
    /// Whitespace and comments.
    pub fn is_trivia(self) -> bool {
        matches!(
            self,
            NodeKind::Other(OtherKind::Whitespace) | NodeKind::Other(OtherKind::Comment)
        )
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Structural errors raised by tree reads and mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    /// The id does not name a node of this tree.
    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    /// The node exists but is no longer reachable from the root.
    #[error("node {0} is detached from the tree")]
    Detached(NodeId),

    /// A node of a different kind was expected.
    #[error("expected {expected:?} at node {node}, found {found:?}")]
    UnexpectedKind {
        node: NodeId,
        expected: NodeKind,
        found: NodeKind,
    },

    /// The root cannot be replaced.
    #[error("cannot replace the root node")]
    RootReplacement,

    /// The builder was finished with open nodes or without a single root.
    #[error("unbalanced tree builder: {0}")]
    Unbalanced(String),
}

/// Result type for tree operations.
pub type TreeResult<T> = Result<T, TreeError>;

// ============================================================================
// Tree
// ============================================================================

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    text: Option<Box<str>>,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
}

static NEXT_FINGERPRINT: AtomicU64 = AtomicU64::new(1);

fn next_fingerprint() -> u64 {
    NEXT_FINGERPRINT.fetch_add(1, Ordering::Relaxed)
}

/// An owned, mutable syntax tree for one source file.
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    nodes: Vec<NodeData>,
    root: NodeId,
    revision: u64,
    fingerprint: u64,
    layout: OnceCell<HashMap<NodeId, Span>>,
}

impl SyntaxTree {
    /// The root node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes in the arena, including detached ones.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Mutation counter, incremented once per structural mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Whether data derived at `revision` still describes this tree.
    pub fn is_current(&self, revision: u64) -> bool {
        self.revision == revision
    }

    /// Opaque identity of this exact tree state.
    ///
    /// Every build and every mutation draws a process-unique value; clones
    /// share it. Two trees with equal fingerprints have identical structure
    /// and node ids, so analysis results can be cached by fingerprint.
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    fn node(&self, id: NodeId) -> TreeResult<&NodeData> {
        self.nodes.get(id.index()).ok_or(TreeError::UnknownNode(id))
    }

    /// Kind of a node.
    pub fn kind(&self, id: NodeId) -> TreeResult<NodeKind> {
        Ok(self.node(id)?.kind)
    }

    /// Ordered children of a node.
    pub fn children(&self, id: NodeId) -> TreeResult<&[NodeId]> {
        Ok(&self.node(id)?.children)
    }

    /// Syntactic parent of a node, `None` for the root and detached nodes.
    pub fn parent(&self, id: NodeId) -> TreeResult<Option<NodeId>> {
        Ok(self.node(id)?.parent)
    }

    /// Text of a leaf node, `None` for interior nodes.
    pub fn token_text(&self, id: NodeId) -> TreeResult<Option<&str>> {
        Ok(self.node(id)?.text.as_deref())
    }

    /// Strict ancestors of a node, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        let next = self.nodes.get(id.index()).and_then(|n| n.parent);
        Ancestors { tree: self, next }
    }

    /// Nearest strict ancestor of the given kind.
    pub fn parent_of_type(&self, id: NodeId, kind: NodeKind) -> Option<NodeId> {
        self.ancestors(id)
            .find(|&ancestor| self.nodes[ancestor.index()].kind == kind)
    }

    /// First direct child of the given kind.
    pub fn child_of_kind(&self, id: NodeId, kind: NodeKind) -> TreeResult<Option<NodeId>> {
        Ok(self
            .children(id)?
            .iter()
            .copied()
            .find(|&child| self.nodes[child.index()].kind == kind))
    }

    /// Pre-order traversal of a subtree, starting with `id` itself.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        let stack = if id.index() < self.nodes.len() {
            vec![id]
        } else {
            Vec::new()
        };
        Descendants { tree: self, stack }
    }

    /// Whether the node is reachable from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        if id == self.root {
            return true;
        }
        if id.index() >= self.nodes.len() {
            return false;
        }
        self.ancestors(id).last() == Some(self.root)
    }

    /// Rendered text of a subtree.
    pub fn text(&self, id: NodeId) -> TreeResult<String> {
        self.node(id)?;
        let mut out = String::new();
        for node in self.descendants(id) {
            if let Some(text) = &self.nodes[node.index()].text {
                out.push_str(text);
            }
        }
        Ok(out)
    }

    /// Rendered text of the whole file.
    pub fn render(&self) -> String {
        self.text(self.root).unwrap_or_default()
    }

    /// Byte span of an attached node in the rendered file text.
    pub fn text_range(&self, id: NodeId) -> TreeResult<Span> {
        self.node(id)?;
        self.layout()
            .get(&id)
            .copied()
            .ok_or(TreeError::Detached(id))
    }

    /// Start offset of an attached node in the rendered file text.
    pub fn text_offset(&self, id: NodeId) -> TreeResult<usize> {
        Ok(self.text_range(id)?.start)
    }

    /// Leaf containing the byte at `offset`, if any.
    pub fn leaf_at_offset(&self, offset: usize) -> Option<NodeId> {
        let layout = self.layout();
        let mut current = self.root;
        loop {
            let node = &self.nodes[current.index()];
            if node.text.is_some() {
                return Some(current);
            }
            current = node.children.iter().copied().find(|child| {
                layout
                    .get(child)
                    .is_some_and(|span| span.contains_offset(offset))
            })?;
        }
    }

    fn layout(&self) -> &HashMap<NodeId, Span> {
        self.layout.get_or_init(|| {
            let mut spans = HashMap::with_capacity(self.nodes.len());
            self.lay_out(self.root, 0, &mut spans);
            spans
        })
    }

    fn lay_out(&self, id: NodeId, start: usize, spans: &mut HashMap<NodeId, Span>) -> usize {
        let node = &self.nodes[id.index()];
        let end = match &node.text {
            Some(text) => start + text.len(),
            None => node
                .children
                .iter()
                .fold(start, |offset, &child| self.lay_out(child, offset, spans)),
        };
        spans.insert(id, Span::new(start, end));
        end
    }

    fn alloc(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(data);
        id
    }

    fn touch(&mut self) {
        self.revision += 1;
        self.fingerprint = next_fingerprint();
        self.layout.take();
    }

    /// Replace `target` with a new node of `kind`.
    ///
    /// The new node's children are fresh leaves built from `prefix`, followed by
    /// the children of `target` (moved, keeping their ids). A leaf target is
    /// moved as a whole instead. `target` ends up detached. This is a single
    /// mutation: the revision advances by exactly one.
    pub fn replace_prefixed(
        &mut self,
        target: NodeId,
        kind: NodeKind,
        prefix: &[(NodeKind, &str)],
    ) -> TreeResult<NodeId> {
        let parent = self.parent(target)?.ok_or(if target == self.root {
            TreeError::RootReplacement
        } else {
            TreeError::Detached(target)
        })?;
        if !self.is_attached(target) {
            return Err(TreeError::Detached(target));
        }
        let slot = self.nodes[parent.index()]
            .children
            .iter()
            .position(|&child| child == target)
            .ok_or(TreeError::Detached(target))?;

        let replacement = self.alloc(NodeData {
            kind,
            text: None,
            children: Vec::new(),
            parent: Some(parent),
        });

        let mut children = Vec::with_capacity(prefix.len() + 1);
        for &(leaf_kind, text) in prefix {
            let leaf = self.alloc(NodeData {
                kind: leaf_kind,
                text: Some(text.into()),
                children: Vec::new(),
                parent: Some(replacement),
            });
            children.push(leaf);
        }

        let moved = if self.nodes[target.index()].text.is_some() {
            vec![target]
        } else {
            std::mem::take(&mut self.nodes[target.index()].children)
        };
        for &child in &moved {
            self.nodes[child.index()].parent = Some(replacement);
        }
        children.extend(moved);

        self.nodes[replacement.index()].children = children;
        self.nodes[parent.index()].children[slot] = replacement;
        if self.nodes[target.index()].parent == Some(parent) {
            self.nodes[target.index()].parent = None;
        }
        self.touch();
        Ok(replacement)
    }
}

/// Iterator over strict ancestors; see [`SyntaxTree::ancestors`].
pub struct Ancestors<'t> {
    tree: &'t SyntaxTree,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self
            .tree
            .nodes
            .get(current.index())
            .and_then(|n| n.parent);
        Some(current)
    }
}

/// Pre-order iterator over a subtree; see [`SyntaxTree::descendants`].
pub struct Descendants<'t> {
    tree: &'t SyntaxTree,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.stack.pop()?;
        let children = &self.tree.nodes[current.index()].children;
        self.stack.extend(children.iter().rev().copied());
        Some(current)
    }
}

// ============================================================================
// Builder
// ============================================================================

/// A position in the builder to which a node can later be retroactively opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    depth: usize,
    index: usize,
}

/// Incremental builder for [`SyntaxTree`]s.
///
/// ```
/// use thisify_core::syntax::{NodeKind, OtherKind, TreeBuilder};
///
/// let mut builder = TreeBuilder::new();
/// builder.start_node(NodeKind::File);
/// let checkpoint = builder.checkpoint();
/// builder.token(NodeKind::Identifier, "bar");
/// builder.start_node_at(checkpoint, NodeKind::ReferenceExpression);
/// builder.finish_node();
/// builder.token(NodeKind::Other(OtherKind::Punct), ";");
/// builder.finish_node();
/// let tree = builder.finish().unwrap();
/// assert_eq!(tree.render(), "bar;");
/// ```
#[derive(Debug, Default)]
pub struct TreeBuilder {
    nodes: Vec<NodeData>,
    open: Vec<(NodeKind, Vec<NodeId>)>,
    roots: Vec<NodeId>,
}

impl TreeBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    fn current_children(&mut self) -> &mut Vec<NodeId> {
        match self.open.last_mut() {
            Some((_, children)) => children,
            None => &mut self.roots,
        }
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(data);
        id
    }

    /// Open a new interior node.
    pub fn start_node(&mut self, kind: NodeKind) {
        self.open.push((kind, Vec::new()));
    }

    /// Remember the current position so a node can be opened there later.
    pub fn checkpoint(&mut self) -> Checkpoint {
        let depth = self.open.len();
        let index = self.current_children().len();
        Checkpoint { depth, index }
    }

    /// Open a node that adopts everything added since `checkpoint`.
    ///
    /// A checkpoint from a different nesting depth opens an empty node.
    pub fn start_node_at(&mut self, checkpoint: Checkpoint, kind: NodeKind) {
        let adopted = if checkpoint.depth == self.open.len() {
            let children = self.current_children();
            let index = checkpoint.index.min(children.len());
            children.split_off(index)
        } else {
            Vec::new()
        };
        self.open.push((kind, adopted));
    }

    /// Add a leaf to the currently open node.
    pub fn token(&mut self, kind: NodeKind, text: &str) -> NodeId {
        let id = self.push(NodeData {
            kind,
            text: Some(text.into()),
            children: Vec::new(),
            parent: None,
        });
        self.current_children().push(id);
        id
    }

    /// Close the currently open node and return its id.
    pub fn finish_node(&mut self) -> Option<NodeId> {
        let (kind, children) = self.open.pop()?;
        let id = self.push(NodeData {
            kind,
            text: None,
            children,
            parent: None,
        });
        let children = self.nodes[id.index()].children.clone();
        for child in children {
            self.nodes[child.index()].parent = Some(id);
        }
        self.current_children().push(id);
        Some(id)
    }

    /// Finish building. Exactly one root node must have been produced.
    pub fn finish(self) -> TreeResult<SyntaxTree> {
        if !self.open.is_empty() {
            return Err(TreeError::Unbalanced(format!(
                "{} node(s) still open",
                self.open.len()
            )));
        }
        match self.roots.as_slice() {
            [root] if self.nodes[root.index()].text.is_none() => Ok(SyntaxTree {
                nodes: self.nodes,
                root: *root,
                revision: 0,
                fingerprint: next_fingerprint(),
                layout: OnceCell::new(),
            }),
            roots => Err(TreeError::Unbalanced(format!(
                "expected a single root node, found {} top-level element(s)",
                roots.len()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KW: NodeKind = NodeKind::Other(OtherKind::Keyword);
    const WS: NodeKind = NodeKind::Other(OtherKind::Whitespace);
    const PUNCT: NodeKind = NodeKind::Other(OtherKind::Punct);

    /// Builds `class Foo { int x = bar; }` with `bar` as a reference.
    fn sample() -> (SyntaxTree, NodeId) {
        let mut b = TreeBuilder::new();
        b.start_node(NodeKind::File);
        b.start_node(NodeKind::ClassDeclaration);
        b.start_node(NodeKind::ModifierList);
        b.finish_node();
        b.token(KW, "class");
        b.token(WS, " ");
        b.token(NodeKind::Identifier, "Foo");
        b.token(WS, " ");
        b.token(PUNCT, "{");
        b.token(WS, " ");
        b.start_node(NodeKind::FieldDeclaration);
        b.start_node(NodeKind::ModifierList);
        b.finish_node();
        b.token(KW, "int");
        b.token(WS, " ");
        b.token(NodeKind::Identifier, "x");
        b.token(WS, " ");
        b.token(PUNCT, "=");
        b.token(WS, " ");
        let cp = b.checkpoint();
        b.token(NodeKind::Identifier, "bar");
        b.start_node_at(cp, NodeKind::ReferenceExpression);
        let reference = b.finish_node().unwrap();
        b.token(PUNCT, ";");
        b.finish_node();
        b.token(WS, " ");
        b.token(PUNCT, "}");
        b.finish_node();
        b.finish_node();
        (b.finish().unwrap(), reference)
    }

    #[test]
    fn renders_losslessly() {
        let (tree, _) = sample();
        assert_eq!(tree.render(), "class Foo { int x = bar; }");
    }

    #[test]
    fn spans_are_derived_from_leaves() {
        let (tree, reference) = sample();
        assert_eq!(tree.text_range(reference).unwrap(), Span::new(20, 23));
        assert_eq!(tree.text_offset(reference).unwrap(), 20);
        assert_eq!(tree.text(reference).unwrap(), "bar");
    }

    #[test]
    fn parent_of_type_skips_self_and_finds_nearest() {
        let (tree, reference) = sample();
        let field = tree
            .parent_of_type(reference, NodeKind::FieldDeclaration)
            .unwrap();
        let class = tree
            .parent_of_type(reference, NodeKind::ClassDeclaration)
            .unwrap();
        assert_eq!(tree.kind(field).unwrap(), NodeKind::FieldDeclaration);
        assert_eq!(tree.parent_of_type(class, NodeKind::ClassDeclaration), None);
        assert_eq!(tree.parent_of_type(reference, NodeKind::ReferenceExpression), None);
    }

    #[test]
    fn leaf_at_offset_finds_token() {
        let (tree, reference) = sample();
        let leaf = tree.leaf_at_offset(21).unwrap();
        assert_eq!(tree.token_text(leaf).unwrap(), Some("bar"));
        assert_eq!(tree.parent(leaf).unwrap(), Some(reference));
        assert_eq!(tree.leaf_at_offset(1000), None);
    }

    #[test]
    fn replace_prefixed_is_one_mutation_and_keeps_ids() {
        let (mut tree, reference) = sample();
        let identifier = tree.children(reference).unwrap()[0];
        assert_eq!(tree.revision(), 0);
        let snapshot = tree.clone();
        assert_eq!(snapshot.fingerprint(), tree.fingerprint());

        let replacement = tree
            .replace_prefixed(
                reference,
                NodeKind::ReferenceExpression,
                &[(KW, "this"), (PUNCT, ".")],
            )
            .unwrap();

        assert_eq!(tree.revision(), 1);
        assert!(!tree.is_current(0));
        assert_ne!(snapshot.fingerprint(), tree.fingerprint());
        assert_eq!(snapshot.render(), "class Foo { int x = bar; }");
        assert_eq!(tree.render(), "class Foo { int x = this.bar; }");
        assert!(!tree.is_attached(reference));
        assert!(tree.is_attached(identifier));
        assert_eq!(tree.parent(identifier).unwrap(), Some(replacement));
        assert_eq!(tree.text(replacement).unwrap(), "this.bar");
        // Spans re-derive after mutation.
        assert_eq!(tree.text_range(identifier).unwrap(), Span::new(25, 28));
        assert_eq!(
            tree.text_range(reference),
            Err(TreeError::Detached(reference))
        );
    }

    #[test]
    fn replacing_detached_or_root_fails() {
        let (mut tree, reference) = sample();
        tree.replace_prefixed(reference, NodeKind::ReferenceExpression, &[])
            .unwrap();
        assert_eq!(
            tree.replace_prefixed(reference, NodeKind::ReferenceExpression, &[]),
            Err(TreeError::Detached(reference))
        );
        let root = tree.root();
        assert_eq!(
            tree.replace_prefixed(root, NodeKind::File, &[]),
            Err(TreeError::RootReplacement)
        );
        assert_eq!(tree.revision(), 1);
    }

    #[test]
    fn unknown_nodes_are_reported() {
        let (tree, _) = sample();
        let bogus = NodeId(9999);
        assert_eq!(tree.kind(bogus), Err(TreeError::UnknownNode(bogus)));
        assert_eq!(tree.descendants(bogus).count(), 0);
        assert!(!tree.is_attached(bogus));
    }

    #[test]
    fn builder_rejects_unbalanced_input() {
        let mut b = TreeBuilder::new();
        b.start_node(NodeKind::File);
        assert!(matches!(b.finish(), Err(TreeError::Unbalanced(_))));

        let mut b = TreeBuilder::new();
        b.token(NodeKind::Identifier, "x");
        assert!(matches!(b.finish(), Err(TreeError::Unbalanced(_))));
    }

    #[test]
    fn descendants_are_pre_order() {
        let (tree, _) = sample();
        let kinds: Vec<NodeKind> = tree
            .descendants(tree.root())
            .map(|id| tree.kind(id).unwrap())
            .filter(|kind| !matches!(kind, NodeKind::Other(_)))
            .collect();
        assert_eq!(
            kinds,
            vec![
                NodeKind::File,
                NodeKind::ClassDeclaration,
                NodeKind::ModifierList,
                NodeKind::Identifier,
                NodeKind::FieldDeclaration,
                NodeKind::ModifierList,
                NodeKind::Identifier,
                NodeKind::ReferenceExpression,
                NodeKind::Identifier,
            ]
        );
    }
}
