//! In-memory editor host.
//!
//! [`EditorSession`] holds parsed documents, the selected document and the
//! caret; it is the [`EditorContext`] the CLI and the tests run the command
//! against. [`RecordingHost`] is a [`TransactionHost`] that records every
//! acquire, commit and release, and can be told to refuse or fail.

use std::cell::{Cell, RefCell};

use thisify_core::host::{
    EditorContext, HostError, SelectedFile, TransactionHost, TransactionOutcome,
};
use thisify_core::patch::FileId;
use thisify_core::syntax::{SyntaxTree, TreeError};
use thisify_core::text::position_to_byte_offset;
use tracing::{debug, info, warn};

use crate::parser::{parse_java, ParseDiagnostic};

// ============================================================================
// Editor session
// ============================================================================

/// One open document.
#[derive(Debug, Clone)]
pub struct Document {
    pub path: String,
    pub tree: SyntaxTree,
    pub diagnostics: Vec<ParseDiagnostic>,
}

/// Open documents plus the editor's selection.
#[derive(Debug, Default)]
pub struct EditorSession {
    documents: Vec<Document>,
    selected: Option<FileId>,
    caret: Option<usize>,
}

impl EditorSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `source` and open it as a new document.
    pub fn open(&mut self, path: impl Into<String>, source: &str) -> Result<FileId, TreeError> {
        let path = path.into();
        let parsed = parse_java(source)?;
        for diagnostic in &parsed.diagnostics {
            warn!(
                path = %path,
                span = %diagnostic.span,
                message = %diagnostic.message,
                "parse diagnostic"
            );
        }
        let file = FileId::new(self.documents.len() as u32);
        debug!(%file, path = %path, nodes = parsed.tree.node_count(), "opened document");
        self.documents.push(Document {
            path,
            tree: parsed.tree,
            diagnostics: parsed.diagnostics,
        });
        Ok(file)
    }

    /// Select `file` with the caret at byte `offset`.
    pub fn select(&mut self, file: FileId, offset: usize) {
        self.selected = Some(file);
        self.caret = Some(offset);
    }

    /// Select `file` with the caret at a 1-based line and column.
    ///
    /// Returns the caret's byte offset, or `None` for an unknown file.
    pub fn select_position(&mut self, file: FileId, line: u32, col: u32) -> Option<usize> {
        let text = self.document(file)?.tree.render();
        let offset = position_to_byte_offset(&text, line, col);
        self.select(file, offset);
        Some(offset)
    }

    /// Drop the caret, as when no editor is focused.
    pub fn clear_caret(&mut self) {
        self.caret = None;
    }

    /// Drop the document selection while keeping the caret.
    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn document(&self, file: FileId) -> Option<&Document> {
        self.documents.get(file.0 as usize)
    }

    pub fn tree(&self, file: FileId) -> Option<&SyntaxTree> {
        self.document(file).map(|doc| &doc.tree)
    }

    /// Current text of a document.
    pub fn text(&self, file: FileId) -> Option<String> {
        self.tree(file).map(SyntaxTree::render)
    }

    pub fn path(&self, file: FileId) -> Option<&str> {
        self.document(file).map(|doc| doc.path.as_str())
    }
}

impl EditorContext for EditorSession {
    fn current_caret_offset(&self) -> Option<usize> {
        self.caret
    }

    fn selected_file(&mut self) -> Option<SelectedFile<'_>> {
        let file = self.selected?;
        let doc = self.documents.get_mut(file.0 as usize)?;
        Some(SelectedFile {
            file,
            tree: &mut doc.tree,
        })
    }
}

// ============================================================================
// Recording transaction host
// ============================================================================

/// Something the command asked of the transaction host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    Acquired { file: FileId, label: String },
    Committed { file: FileId, text: String },
    Released { file: FileId, outcome: TransactionOutcome },
}

/// A [`TransactionHost`] that records what happens to it.
#[derive(Debug, Default)]
pub struct RecordingHost {
    events: RefCell<Vec<HostEvent>>,
    refuse: Option<String>,
    fail_commit_at: Option<usize>,
    commits: Cell<usize>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// A host that refuses every write transaction.
    pub fn refusing(reason: impl Into<String>) -> Self {
        RecordingHost {
            refuse: Some(reason.into()),
            ..Self::default()
        }
    }

    /// A host whose `n`-th document commit (1-based) fails.
    pub fn failing_commit(n: usize) -> Self {
        RecordingHost {
            fail_commit_at: Some(n),
            ..Self::default()
        }
    }

    pub fn events(&self) -> Vec<HostEvent> {
        self.events.borrow().clone()
    }

    /// Texts of successful document commits, in order.
    pub fn committed_texts(&self) -> Vec<String> {
        self.events
            .borrow()
            .iter()
            .filter_map(|event| match event {
                HostEvent::Committed { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// How the last transaction ended.
    pub fn last_outcome(&self) -> Option<TransactionOutcome> {
        self.events.borrow().iter().rev().find_map(|event| match event {
            HostEvent::Released { outcome, .. } => Some(*outcome),
            _ => None,
        })
    }
}

impl TransactionHost for RecordingHost {
    fn acquire(&self, file: FileId, label: &str) -> Result<(), HostError> {
        if let Some(reason) = &self.refuse {
            warn!(%file, label, reason = %reason, "write transaction refused");
            return Err(HostError::TransactionRefused {
                file,
                label: label.to_string(),
                reason: reason.clone(),
            });
        }
        debug!(%file, label, "write transaction acquired");
        self.events.borrow_mut().push(HostEvent::Acquired {
            file,
            label: label.to_string(),
        });
        Ok(())
    }

    fn commit_document(&self, file: FileId, tree: &SyntaxTree) -> Result<(), HostError> {
        let attempt = self.commits.get() + 1;
        self.commits.set(attempt);
        if self.fail_commit_at == Some(attempt) {
            return Err(HostError::CommitFailed {
                file,
                reason: format!("commit {attempt} rejected"),
            });
        }
        debug!(%file, revision = tree.revision(), "document committed");
        self.events.borrow_mut().push(HostEvent::Committed {
            file,
            text: tree.render(),
        });
        Ok(())
    }

    fn release(&self, file: FileId, outcome: TransactionOutcome) {
        info!(%file, ?outcome, "write transaction released");
        self.events
            .borrow_mut()
            .push(HostEvent::Released { file, outcome });
    }
}
