//! The "Insert This" command.
//!
//! [`insert_this`] qualifies every unqualified reference to an instance member
//! of the class at the caret:
//!
//! 1. Read the caret and the selected document from the editor
//! 2. Find the class strictly enclosing the caret; anonymous classes are skipped
//! 3. Collect the class's non-static fields, then its non-static methods
//! 4. Open one write transaction around the whole pass
//! 5. For each member: fetch, classify and rewrite its references, then
//!    commit the document if anything changed
//!
//! Unmet preconditions are not errors: they produce
//! [`InsertThisOutcome::Skipped`] and leave everything untouched. Any error
//! after the transaction opened rolls the document back.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use thisify_core::facts::MemberKind;
use thisify_core::host::{HostError, ProjectContext, SelectedFile};
use thisify_core::syntax::TreeError;
use thisify_core::transaction::WriteTransaction;
use tracing::{debug, info};

use crate::lookup::class_at_offset;
use crate::ops::collect::collect_instance_members;
use crate::ops::qualify::{rewrite_references, SkipReason};

/// Label of the write transaction opened by the command.
pub const INSERT_THIS_LABEL: &str = "Insert This";

// ============================================================================
// Options
// ============================================================================

/// How "the same class" is decided for a reference site.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassBoundary {
    /// The enclosing class has the same name as the class at the caret.
    #[default]
    Name,
    /// The enclosing class is the very declaration at the caret.
    Declaration,
}

impl std::str::FromStr for ClassBoundary {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(ClassBoundary::Name),
            "declaration" => Ok(ClassBoundary::Declaration),
            other => Err(format!(
                "unknown class boundary '{other}' (expected 'name' or 'declaration')"
            )),
        }
    }
}

/// Options for one run of the command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InsertThisOptions {
    /// Receiver inserted before each reference.
    pub qualifier: String,
    /// Token placed between the receiver and the reference.
    pub separator: String,
    /// Qualify field references.
    pub fields: bool,
    /// Qualify method references.
    pub methods: bool,
    pub class_boundary: ClassBoundary,
}

impl Default for InsertThisOptions {
    fn default() -> Self {
        InsertThisOptions {
            qualifier: "this".to_string(),
            separator: ".".to_string(),
            fields: true,
            methods: true,
            class_boundary: ClassBoundary::Name,
        }
    }
}

// ============================================================================
// Outcome
// ============================================================================

/// Precondition that stopped the command before it touched anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipCause {
    NoEditor,
    NoSelectedFile,
    NoClassAtCaret,
    AnonymousClass,
}

impl SkipCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipCause::NoEditor => "no_editor",
            SkipCause::NoSelectedFile => "no_selected_file",
            SkipCause::NoClassAtCaret => "no_class_at_caret",
            SkipCause::AnonymousClass => "anonymous_class",
        }
    }
}

impl fmt::Display for SkipCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rewrite count for one visited member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberReport {
    pub kind: MemberKind,
    pub name: String,
    pub rewritten: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InsertThisReport {
    pub class_name: String,
    /// Members in processing order.
    pub members: Vec<MemberReport>,
    pub rewritten: usize,
    pub skipped: BTreeMap<SkipReason, usize>,
}

impl InsertThisReport {
    fn new(class_name: String) -> Self {
        InsertThisReport {
            class_name,
            members: Vec::new(),
            rewritten: 0,
            skipped: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertThisOutcome {
    Skipped(SkipCause),
    Applied(InsertThisReport),
}

impl InsertThisOutcome {
    pub fn report(&self) -> Option<&InsertThisReport> {
        match self {
            InsertThisOutcome::Applied(report) => Some(report),
            InsertThisOutcome::Skipped(_) => None,
        }
    }

    /// Total references qualified; zero when skipped.
    pub fn rewritten(&self) -> usize {
        self.report().map_or(0, |r| r.rewritten)
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Errors that abort the command. The document is rolled back.
#[derive(Debug, Error)]
pub enum InsertThisError {
    #[error("syntax tree error: {0}")]
    Tree(#[from] TreeError),

    #[error(transparent)]
    Host(#[from] HostError),
}

// ============================================================================
// Command
// ============================================================================

/// Qualify references to the instance members of the class at the caret.
#[tracing::instrument(skip_all, fields(qualifier = %options.qualifier))]
pub fn insert_this(
    ctx: ProjectContext<'_>,
    options: &InsertThisOptions,
) -> Result<InsertThisOutcome, InsertThisError> {
    let ProjectContext {
        editor,
        index,
        transactions,
    } = ctx;

    let Some(caret) = editor.current_caret_offset() else {
        debug!("no editor");
        return Ok(InsertThisOutcome::Skipped(SkipCause::NoEditor));
    };
    let Some(SelectedFile { file, tree }) = editor.selected_file() else {
        debug!("no selected file");
        return Ok(InsertThisOutcome::Skipped(SkipCause::NoSelectedFile));
    };
    let Some(class) = class_at_offset(tree, caret)? else {
        debug!(caret, "caret is not inside a class");
        return Ok(InsertThisOutcome::Skipped(SkipCause::NoClassAtCaret));
    };
    let Some(class_name) = class.name.clone() else {
        debug!(caret, "caret is inside an anonymous class");
        return Ok(InsertThisOutcome::Skipped(SkipCause::AnonymousClass));
    };

    let members: Vec<_> = collect_instance_members(tree, file, &class)?
        .into_iter()
        .filter(|m| match m.kind {
            MemberKind::Field => options.fields,
            MemberKind::Method => options.methods,
        })
        .collect();

    let mut txn = WriteTransaction::begin(transactions, file, INSERT_THIS_LABEL, tree)?;
    let mut report = InsertThisReport::new(class_name);
    for member in &members {
        let summary = rewrite_references(txn.tree_mut(), index, member, &class, options)?;
        if summary.rewritten > 0 {
            txn.commit_document()?;
        }
        for (reason, count) in summary.skipped {
            *report.skipped.entry(reason).or_insert(0) += count;
        }
        report.rewritten += summary.rewritten;
        report.members.push(MemberReport {
            kind: member.kind,
            name: member.name.clone(),
            rewritten: summary.rewritten,
        });
    }
    txn.commit();

    info!(
        class = %report.class_name,
        members = report.members.len(),
        rewritten = report.rewritten,
        "insert this finished"
    );
    Ok(InsertThisOutcome::Applied(report))
}
