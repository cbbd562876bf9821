use crate::document::DocumentId;

/// What happened to a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentEventKind {
	/// A parse tree for the current content is ready.
	ParseComplete,
	/// The analyzer finished analyzing a version.
	AnalysisComplete,
	/// The sync state was disposed. No further events follow.
	Disposed,
}

/// Notification published on a document's event channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentEvent {
	/// Document the event belongs to.
	pub document: DocumentId,
	/// Event kind.
	pub kind: DocumentEventKind,
}
