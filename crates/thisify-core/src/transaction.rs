//! Scoped write transaction.
//!
//! A [`WriteTransaction`] brackets a whole rewrite pass on one document. It is
//! acquired from the [`TransactionHost`] on creation and released exactly once:
//! - [`WriteTransaction::commit`] releases it as committed
//! - dropping it without committing (early return, `?`, panic unwinding)
//!   restores the tree to the state it had when the transaction began and
//!   releases it as rolled back
//!
//! No partially rewritten document survives a failed pass.

use std::ops::Deref;

use tracing::{debug, warn};

use crate::host::{HostError, TransactionHost, TransactionOutcome};
use crate::patch::FileId;
use crate::syntax::SyntaxTree;

/// Exclusive, undoable write access to one document's tree.
pub struct WriteTransaction<'a> {
    host: &'a dyn TransactionHost,
    file: FileId,
    label: String,
    tree: &'a mut SyntaxTree,
    snapshot: Option<SyntaxTree>,
    commits: usize,
}

impl<'a> WriteTransaction<'a> {
    /// Acquire a write scope named `label` on `file`.
    pub fn begin(
        host: &'a dyn TransactionHost,
        file: FileId,
        label: impl Into<String>,
        tree: &'a mut SyntaxTree,
    ) -> Result<Self, HostError> {
        let label = label.into();
        host.acquire(file, &label)?;
        debug!(%file, label = %label, revision = tree.revision(), "write transaction opened");
        let snapshot = Some(tree.clone());
        Ok(WriteTransaction {
            host,
            file,
            label,
            tree,
            snapshot,
            commits: 0,
        })
    }

    pub fn file(&self) -> FileId {
        self.file
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Mutable access to the tree under the transaction.
    pub fn tree_mut(&mut self) -> &mut SyntaxTree {
        &mut *self.tree
    }

    /// Number of document commits published so far.
    pub fn commits(&self) -> usize {
        self.commits
    }

    /// Publish the current tree state to the host.
    pub fn commit_document(&mut self) -> Result<(), HostError> {
        self.host.commit_document(self.file, &*self.tree)?;
        self.commits += 1;
        Ok(())
    }

    /// End the transaction, keeping every mutation.
    pub fn commit(mut self) {
        self.snapshot = None;
        debug!(
            file = %self.file,
            label = %self.label,
            revision = self.tree.revision(),
            "write transaction committed"
        );
        self.host.release(self.file, TransactionOutcome::Committed);
    }
}

impl Deref for WriteTransaction<'_> {
    type Target = SyntaxTree;

    fn deref(&self) -> &SyntaxTree {
        &*self.tree
    }
}

impl Drop for WriteTransaction<'_> {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            warn!(
                file = %self.file,
                label = %self.label,
                discarded_revision = self.tree.revision(),
                "write transaction rolled back"
            );
            *self.tree = snapshot;
            if self.commits > 0 {
                // Republish so the host does not keep a rolled-back state.
                if let Err(err) = self.host.commit_document(self.file, &*self.tree) {
                    warn!(
                        file = %self.file,
                        error = %err,
                        "failed to republish rolled-back document"
                    );
                }
            }
            self.host.release(self.file, TransactionOutcome::RolledBack);
        }
    }
}
