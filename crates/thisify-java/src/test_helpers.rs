//! Test helpers for building sessions and fake indexes.
//!
//! Used by unit tests in this crate and, through the `test-helpers`
//! feature, by the integration tests under `tests/`. The fake indexes let
//! tests feed the classifier sites a real index would never produce:
//! foreign, stale, duplicated or misnamed ones.

use std::cell::Cell;

use thisify_core::facts::{ClassScope, MemberDescriptor, ReferenceSite};
use thisify_core::host::{HostError, ReferenceIndex};
use thisify_core::patch::FileId;
use thisify_core::syntax::{NodeKind, SyntaxTree};

use crate::editor::EditorSession;
use crate::index::JavaReferenceIndex;
use crate::lookup::class_scope;
use crate::ops::collect::collect_instance_members;
use crate::parser::parse_java;

/// Parse `source` and return its tree with the first class declared in it.
///
/// # Panics
///
/// Panics if the source contains no class.
pub fn single_file(source: &str) -> (SyntaxTree, ClassScope) {
    let tree = parse_java(source)
        .unwrap_or_else(|e| panic!("failed to parse test source: {e}"))
        .tree;
    let class = tree
        .descendants(tree.root())
        .find(|&id| tree.kind(id).ok() == Some(NodeKind::ClassDeclaration))
        .unwrap_or_else(|| panic!("test source declares no class"));
    let scope = class_scope(&tree, class).unwrap_or_else(|e| panic!("{e}"));
    (tree, scope)
}

/// The instance member `name` of `class`, as the collector sees it.
///
/// # Panics
///
/// Panics if the class has no such instance member.
pub fn member_named(tree: &SyntaxTree, class: &ClassScope, name: &str) -> MemberDescriptor {
    collect_instance_members(tree, FileId::new(0), class)
        .unwrap_or_else(|e| panic!("{e}"))
        .into_iter()
        .find(|m| m.name == name)
        .unwrap_or_else(|| panic!("no instance member named {name}"))
}

/// Open `source` as `path` with the caret at the first occurrence of
/// `marker`.
///
/// # Panics
///
/// Panics if `marker` does not occur in `source`.
pub fn session_at(path: &str, source: &str, marker: &str) -> (EditorSession, FileId) {
    let offset = source
        .find(marker)
        .unwrap_or_else(|| panic!("marker {marker:?} not found in source"));
    let mut session = EditorSession::new();
    let file = session
        .open(path, source)
        .unwrap_or_else(|e| panic!("failed to open {path}: {e}"));
    session.select(file, offset);
    (session, file)
}

/// A real index with `others` registered as extra project files.
///
/// Each entry is opened in `session` so it gets its own file id.
pub fn project_index(session: &mut EditorSession, others: &[(&str, &str)]) -> JavaReferenceIndex {
    let mut index = JavaReferenceIndex::new();
    for (path, source) in others {
        let file = session
            .open(*path, source)
            .unwrap_or_else(|e| panic!("failed to open {path}: {e}"));
        let tree = session
            .tree(file)
            .cloned()
            .unwrap_or_else(|| panic!("{path} was not opened"));
        index.add_file(file, tree);
    }
    index
}

/// An index that returns the same sites for every member.
#[derive(Debug, Default)]
pub struct StaticIndex {
    sites: Vec<ReferenceSite>,
}

impl StaticIndex {
    pub fn new(sites: Vec<ReferenceSite>) -> Self {
        StaticIndex { sites }
    }
}

impl ReferenceIndex for StaticIndex {
    fn find_all_references(
        &self,
        _tree: &SyntaxTree,
        _member: &MemberDescriptor,
    ) -> Result<Vec<ReferenceSite>, HostError> {
        Ok(self.sites.clone())
    }
}

/// Wraps the real index and rewrites every site it returns.
///
/// Lets tests turn genuine sites into ones a resolver would not produce,
/// such as a reference whose text no longer matches the field name.
pub struct MappedIndex<F> {
    inner: JavaReferenceIndex,
    map: F,
}

impl<F> MappedIndex<F>
where
    F: Fn(ReferenceSite) -> ReferenceSite,
{
    pub fn new(inner: JavaReferenceIndex, map: F) -> Self {
        MappedIndex { inner, map }
    }
}

impl<F> ReferenceIndex for MappedIndex<F>
where
    F: Fn(ReferenceSite) -> ReferenceSite,
{
    fn find_all_references(
        &self,
        tree: &SyntaxTree,
        member: &MemberDescriptor,
    ) -> Result<Vec<ReferenceSite>, HostError> {
        Ok(self
            .inner
            .find_all_references(tree, member)?
            .into_iter()
            .map(&self.map)
            .collect())
    }
}

/// Wraps the real index and fails on the `n`-th query (1-based).
pub struct FailingIndex {
    inner: JavaReferenceIndex,
    fail_at: usize,
    calls: Cell<usize>,
}

impl FailingIndex {
    pub fn new(inner: JavaReferenceIndex, fail_at: usize) -> Self {
        FailingIndex {
            inner,
            fail_at,
            calls: Cell::new(0),
        }
    }
}

impl ReferenceIndex for FailingIndex {
    fn find_all_references(
        &self,
        tree: &SyntaxTree,
        member: &MemberDescriptor,
    ) -> Result<Vec<ReferenceSite>, HostError> {
        let call = self.calls.get() + 1;
        self.calls.set(call);
        if call == self.fail_at {
            return Err(HostError::Index(format!(
                "index unavailable while searching {member}"
            )));
        }
        self.inner.find_all_references(tree, member)
    }
}
