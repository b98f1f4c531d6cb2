//! Host collaborator traits.
//!
//! The qualification operation never reaches for ambient services. Everything
//! it needs from its environment is passed in through a [`ProjectContext`]:
//! - [`EditorContext`]: the caret and the selected document
//! - [`ReferenceIndex`]: declaration to usage lookup
//! - [`TransactionHost`]: exclusive, undoable write scopes and document commits

use thiserror::Error;

use crate::facts::{MemberDescriptor, ReferenceSite};
use crate::patch::FileId;
use crate::syntax::{SyntaxTree, TreeError};

/// Errors raised by host collaborators.
#[derive(Debug, Error)]
pub enum HostError {
    /// The host refused to open a write transaction.
    #[error("transaction '{label}' refused for {file}: {reason}")]
    TransactionRefused {
        file: FileId,
        label: String,
        reason: String,
    },

    /// The host could not accept a committed document.
    #[error("document commit failed for {file}: {reason}")]
    CommitFailed { file: FileId, reason: String },

    /// The reference index could not answer a query.
    #[error("reference index failed: {0}")]
    Index(String),

    /// Tree error raised while serving a query.
    #[error(transparent)]
    Tree(#[from] TreeError),
}

/// A document selected in the editor.
pub struct SelectedFile<'a> {
    pub file: FileId,
    pub tree: &'a mut SyntaxTree,
}

/// Editor state consulted once at entry.
pub trait EditorContext {
    /// Caret offset in the selected document, if there is an editor.
    fn current_caret_offset(&self) -> Option<usize>;

    /// The document the caret is in.
    fn selected_file(&mut self) -> Option<SelectedFile<'_>>;
}

/// Whole-project mapping from declarations to usages.
pub trait ReferenceIndex {
    /// Every reference to `member`, in no particular order.
    ///
    /// `tree` is the live tree of `member.file`. Results may include sites
    /// from other files; callers restrict them as needed.
    fn find_all_references(
        &self,
        tree: &SyntaxTree,
        member: &MemberDescriptor,
    ) -> Result<Vec<ReferenceSite>, HostError>;
}

/// How a write transaction ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionOutcome {
    Committed,
    RolledBack,
}

/// Exclusive write scopes and document commits.
///
/// Methods take `&self`; hosts that record state use interior mutability.
pub trait TransactionHost {
    /// Open an undoable write scope named `label` on `file`.
    fn acquire(&self, file: FileId, label: &str) -> Result<(), HostError>;

    /// Publish the current state of `tree` to the rest of the host.
    fn commit_document(&self, file: FileId, tree: &SyntaxTree) -> Result<(), HostError>;

    /// Close the write scope opened by [`acquire`](Self::acquire).
    fn release(&self, file: FileId, outcome: TransactionOutcome);
}

/// The services one invocation of the operation runs against.
pub struct ProjectContext<'a> {
    pub editor: &'a mut dyn EditorContext,
    pub index: &'a dyn ReferenceIndex,
    pub transactions: &'a dyn TransactionHost,
}

impl<'a> ProjectContext<'a> {
    pub fn new(
        editor: &'a mut dyn EditorContext,
        index: &'a dyn ReferenceIndex,
        transactions: &'a dyn TransactionHost,
    ) -> Self {
        ProjectContext {
            editor,
            index,
            transactions,
        }
    }
}
