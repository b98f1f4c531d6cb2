//! Reference classification and qualification.
//!
//! For one member, [`rewrite_references`] fetches the member's reference
//! sites from the index, decides per site whether it must be qualified
//! ([`classify_site`]) and rewrites the accepted ones by structural
//! replacement: each accepted `name` node is swapped for a new reference
//! expression `this` `.` `name` that adopts the original children.
//!
//! All sites are classified against the tree revision they were derived at,
//! before the first mutation. Rewrites address nodes, not offsets, so applying
//! them in ascending order is safe.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::Serialize;
use thisify_core::facts::{ClassScope, MemberDescriptor, MemberKind, ReferenceSite};
use thisify_core::host::{HostError, ReferenceIndex};
use thisify_core::syntax::{NodeKind, OtherKind, SyntaxTree};
use tracing::{info, trace};

use crate::ops::insert_this::{ClassBoundary, InsertThisOptions};

/// Why a reference site was left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The site is in a different file than the member.
    OtherFile,
    /// The index resolved the site to a different declaration.
    ForeignMember,
    /// The site was derived from an older tree revision.
    Stale,
    /// The site's node is no longer part of the tree.
    Detached,
    /// The site is not a reference expression (for example `new Foo()`).
    NotAnExpression,
    /// The index reported the same node twice.
    Duplicate,
    /// The site is inside a different class than the one at the caret.
    NestedClass,
    /// `this(..)`, `super(..)` or the class name used as a call.
    ConstructorDelegation,
    /// The site already has an explicit receiver.
    AlreadyQualified,
    /// The site's text is not the field's declared name.
    NameMismatch,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::OtherFile => "other_file",
            SkipReason::ForeignMember => "foreign_member",
            SkipReason::Stale => "stale",
            SkipReason::Detached => "detached",
            SkipReason::NotAnExpression => "not_an_expression",
            SkipReason::Duplicate => "duplicate",
            SkipReason::NestedClass => "nested_class",
            SkipReason::ConstructorDelegation => "constructor_delegation",
            SkipReason::AlreadyQualified => "already_qualified",
            SkipReason::NameMismatch => "name_mismatch",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    Skip(SkipReason),
}

/// Outcome of rewriting one member's references.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteSummary {
    pub rewritten: usize,
    pub skipped: BTreeMap<SkipReason, usize>,
}

impl RewriteSummary {
    fn skip(&mut self, reason: SkipReason) {
        *self.skipped.entry(reason).or_insert(0) += 1;
    }
}

/// Decide whether `site` must be qualified.
///
/// `class` is the class at the caret. Checks run in a fixed order and the
/// first failing one names the reason.
pub fn classify_site(
    tree: &SyntaxTree,
    site: &ReferenceSite,
    member: &MemberDescriptor,
    class: &ClassScope,
    options: &InsertThisOptions,
) -> Verdict {
    use SkipReason::*;

    if site.file != member.file {
        return Verdict::Skip(OtherFile);
    }
    if site.target != member.key() {
        return Verdict::Skip(ForeignMember);
    }
    if !tree.is_current(site.revision) {
        return Verdict::Skip(Stale);
    }
    if !tree.is_attached(site.node) {
        return Verdict::Skip(Detached);
    }
    if tree.kind(site.node).ok() != Some(NodeKind::ReferenceExpression) {
        return Verdict::Skip(NotAnExpression);
    }

    let same_class = match (&site.enclosing_class, options.class_boundary) {
        (None, _) => false,
        (Some(enclosing), ClassBoundary::Name) => {
            enclosing.name.is_some() && enclosing.name == class.name
        }
        (Some(enclosing), ClassBoundary::Declaration) => enclosing.node == class.node,
    };
    if !same_class {
        return Verdict::Skip(NestedClass);
    }

    if member.kind == MemberKind::Method {
        let enclosing_name = site.enclosing_class.as_ref().and_then(|c| c.name.as_deref());
        if site.text == "this"
            || site.text == "super"
            || Some(site.identifier.as_str()) == enclosing_name
        {
            return Verdict::Skip(ConstructorDelegation);
        }
    }

    let prefix = format!("{}{}", options.qualifier, options.separator);
    if site.qualified || site.text == options.qualifier || site.text.starts_with(&prefix) {
        return Verdict::Skip(AlreadyQualified);
    }

    if member.kind == MemberKind::Field && site.text != member.name {
        return Verdict::Skip(NameMismatch);
    }

    Verdict::Accept
}

/// Qualify every accepted reference to `member` in `tree`.
///
/// The tree is not touched when no site is accepted.
pub fn rewrite_references(
    tree: &mut SyntaxTree,
    index: &dyn ReferenceIndex,
    member: &MemberDescriptor,
    class: &ClassScope,
    options: &InsertThisOptions,
) -> Result<RewriteSummary, HostError> {
    let mut sites = index.find_all_references(tree, member)?;
    sites.sort_by_key(ReferenceSite::sort_key);

    let mut summary = RewriteSummary::default();
    let mut seen = HashSet::new();
    let mut accepted = Vec::new();
    for site in &sites {
        let verdict = if seen.insert(site.node) {
            classify_site(tree, site, member, class, options)
        } else {
            Verdict::Skip(SkipReason::Duplicate)
        };
        trace!(
            member = %member,
            node = %site.node,
            span = %site.span,
            text = %site.text,
            ?verdict,
            "classified reference"
        );
        match verdict {
            Verdict::Accept => accepted.push(site.node),
            Verdict::Skip(reason) => summary.skip(reason),
        }
    }

    let prefix = [
        (NodeKind::Other(OtherKind::Keyword), options.qualifier.as_str()),
        (NodeKind::Other(OtherKind::Punct), options.separator.as_str()),
    ];
    for node in accepted {
        tree.replace_prefixed(node, NodeKind::ReferenceExpression, &prefix)?;
        summary.rewritten += 1;
    }

    info!(
        member = %member,
        references = sites.len(),
        rewritten = summary.rewritten,
        "qualified member references"
    );
    Ok(summary)
}
