//! Member and reference facts.
//!
//! These are the values exchanged between the qualification operation and a
//! host's reference index:
//! - [`ClassScope`]: a class declaration node and its (optional) name
//! - [`MemberDescriptor`]: one field or method declared by a class
//! - [`MemberKey`]: the identity of a declared member
//! - [`ReferenceSite`]: one syntactic occurrence resolved to a member
//!
//! All of them are derived from a tree at a given revision and discarded at
//! the end of one invocation. A [`ReferenceSite`]'s span is only meaningful
//! while [`SyntaxTree::is_current`](crate::syntax::SyntaxTree::is_current)
//! holds for its `revision`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::patch::{FileId, Span};
use crate::syntax::NodeId;

/// Field or method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberKind {
    Field,
    Method,
}

impl fmt::Display for MemberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberKind::Field => write!(f, "field"),
            MemberKind::Method => write!(f, "method"),
        }
    }
}

/// A class declaration.
///
/// `name` is `None` for anonymous class bodies.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassScope {
    pub node: NodeId,
    pub name: Option<String>,
}

impl ClassScope {
    pub fn new(node: NodeId, name: Option<String>) -> Self {
        ClassScope { node, name }
    }

    pub fn named(node: NodeId, name: impl Into<String>) -> Self {
        ClassScope {
            node,
            name: Some(name.into()),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.name.is_none()
    }
}

/// Identity of a declared member: the file and the name identifier node of
/// its declaration.
///
/// The name identifier is used rather than the declaration node because a
/// single field declaration can declare several variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemberKey {
    pub file: FileId,
    pub name_node: NodeId,
}

impl fmt::Display for MemberKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.file, self.name_node)
    }
}

/// One field or method declared directly by a class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberDescriptor {
    pub kind: MemberKind,
    /// Declared name.
    pub name: String,
    /// Fixed when the member is collected.
    pub is_static: bool,
    /// Constructors are collected as methods.
    pub is_constructor: bool,
    /// Name identifier node of the declaration.
    pub name_node: NodeId,
    /// The `FieldDeclaration` or `MethodDeclaration` node.
    pub declaration: NodeId,
    pub owner: ClassScope,
    pub file: FileId,
}

impl MemberDescriptor {
    pub fn key(&self) -> MemberKey {
        MemberKey {
            file: self.file,
            name_node: self.name_node,
        }
    }
}

impl fmt::Display for MemberDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let owner = self.owner.name.as_deref().unwrap_or("<anonymous>");
        write!(f, "{} {}.{}", self.kind, owner, self.name)
    }
}

/// One syntactic occurrence that the reference index resolved to a member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceSite {
    /// File the occurrence was found in.
    pub file: FileId,
    /// The reference expression node.
    pub node: NodeId,
    /// The member the index resolved the occurrence to.
    pub target: MemberKey,
    /// Span of `node` at `revision`.
    pub span: Span,
    /// Nearest class declaration strictly enclosing `node`.
    pub enclosing_class: Option<ClassScope>,
    /// Raw source text of the reference expression.
    pub text: String,
    /// Text of the referenced name (the last identifier of the expression).
    pub identifier: String,
    /// Whether the expression carries an explicit receiver.
    pub qualified: bool,
    /// Tree revision the site was derived at.
    pub revision: u64,
}

impl ReferenceSite {
    /// Sort key: ascending span start, then node id.
    pub fn sort_key(&self) -> (usize, NodeId) {
        (self.span.start, self.node)
    }
}
