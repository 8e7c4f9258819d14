// ============================================================================
// ActionTable Library
// ============================================================================
//
// Entity list views with inline row actions: an in-memory projection of
// persisted rows plus the controller, edit session and delete confirmation
// flow that keep it consistent with a backing store across edits, deletes
// and lossy display formatting.

pub mod controller;
pub mod core;
pub mod projection;
pub mod session;
pub mod store;

// Re-export main types for convenience
pub use controller::{ActionIntent, ActionKind, ActionTable, DeleteOutcome, PendingAction};
pub use core::{ActionError, EntityId, FieldKind, FieldSpec, Fields, Result, Value, ViewSchema};
pub use projection::{ELLIPSIS, EntityProjection, ProjectedRow, TRUNCATE_AT, format_value};
pub use session::{ConfirmResponse, DeleteConfirmation, DeleteState, EditSession, EditState};
pub use store::{
    EntityRecord, EntityStore, MemoryStore, OwnerFilter, StoreError, StoreResult,
};
