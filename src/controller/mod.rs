use crate::core::{ActionError, EntityId, Result, ViewSchema};
use crate::projection::EntityProjection;
use crate::session::{ConfirmResponse, DeleteConfirmation, EditSession};
use crate::store::{EntityStore, OwnerFilter};
use log::{debug, warn};
use std::collections::HashSet;
use std::sync::Arc;

/// The two inline row actions a list view offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Edit,
    Delete,
}

/// A user-triggered request against one row, captured at the moment the
/// control was activated: the row's current position plus the identity
/// resolved from its identity field. Never built from a cached load-time
/// position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionIntent {
    pub kind: ActionKind,
    pub entity_id: EntityId,
    pub position: usize,
}

/// The handler a dispatched intent resolves to.
#[derive(Debug)]
pub enum PendingAction {
    Edit(EditSession),
    Delete(DeleteConfirmation),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Removed,
    Declined,
}

/// Binds an [`EntityProjection`] to a persistence store and serializes all
/// mutation dispatch.
///
/// The controller is the projection's only mutator. Every mutation is
/// confirmed by the store (affected rows > 0) before it touches the
/// projection, and at most one action per row is in flight at a time.
///
/// # Examples
///
/// ```
/// use actiontable::{ActionKind, ActionTable, FieldSpec, MemoryStore, OwnerFilter, PendingAction, ViewSchema};
/// use std::sync::Arc;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let rt = tokio::runtime::Runtime::new()?;
/// rt.block_on(async {
///     let store = Arc::new(MemoryStore::new());
///     store.insert(None, [("name".to_string(), "Alice".into())].into()).await;
///
///     let schema = ViewSchema::new("id", vec![FieldSpec::plain("id"), FieldSpec::plain("name")]);
///     let mut table = ActionTable::new(schema, store);
///     table.reload(OwnerFilter::All).await?;
///     assert_eq!(table.projection().len(), 1);
///
///     let intent = table.intent_at(0, ActionKind::Edit)?;
///     let PendingAction::Edit(mut session) = table.dispatch(intent).await? else {
///         unreachable!();
///     };
///     session.set_input("name", "Alicia")?;
///     session.validate()?;
///     table.commit_edit(&mut session).await?;
///     assert_eq!(table.projection().row(0).unwrap().display("name"), Some("Alicia"));
///     Ok::<(), actiontable::ActionError>(())
/// })?;
/// # Ok(())
/// # }
/// ```
pub struct ActionTable<S: EntityStore> {
    store: Arc<S>,
    projection: EntityProjection,
    in_flight: HashSet<EntityId>,
}

impl<S: EntityStore> ActionTable<S> {
    pub fn new(schema: ViewSchema, store: Arc<S>) -> Self {
        Self {
            store,
            projection: EntityProjection::new(schema),
            in_flight: HashSet::new(),
        }
    }

    pub fn projection(&self) -> &EntityProjection {
        &self.projection
    }

    pub fn schema(&self) -> &ViewSchema {
        self.projection.schema()
    }

    /// Replace the projection from a fresh store snapshot. Returns the row
    /// count.
    pub async fn reload(&mut self, filter: OwnerFilter) -> Result<usize> {
        let snapshot = self.store.fetch_all(filter).await?;
        self.projection.load(snapshot);
        debug!("Loaded {} rows", self.projection.len());
        Ok(self.projection.len())
    }

    /// Resolve an action intent against the row currently at `position`.
    ///
    /// The identity is read from the row's identity field at this moment;
    /// a missing or unparseable identity fails with `MalformedIdentity`
    /// and leaves the projection untouched.
    pub fn intent_at(&self, position: usize, kind: ActionKind) -> Result<ActionIntent> {
        let row = self
            .projection
            .row(position)
            .ok_or(ActionError::RowNotFound(position))?;
        let identity_field = self.projection.schema().identity_field();
        let value = row
            .canonical_field(identity_field)
            .ok_or_else(|| ActionError::MalformedIdentity(format!("missing '{}'", identity_field)))?;
        let entity_id = EntityId::from_value(value)?;
        if entity_id != row.entity_id() {
            return Err(ActionError::MalformedIdentity(format!(
                "identity field reads {} but the row is entity {}",
                entity_id,
                row.entity_id()
            )));
        }
        Ok(ActionIntent {
            kind,
            entity_id,
            position,
        })
    }

    /// Route an intent to its handler: an edit session or a delete
    /// confirmation.
    pub async fn dispatch(&mut self, intent: ActionIntent) -> Result<PendingAction> {
        match intent.kind {
            ActionKind::Edit => Ok(PendingAction::Edit(self.begin_edit(intent).await?)),
            ActionKind::Delete => Ok(PendingAction::Delete(self.begin_delete(intent)?)),
        }
    }

    /// Open an edit session prefilled with fresh canonical values.
    ///
    /// The canonical fields are refetched by id so a lossy display value
    /// can never leak into the editor. If the refetch fails, the
    /// projection's retained canonical copy is used instead; if the entity
    /// is gone from the store, the edit cannot apply and is refused.
    pub async fn begin_edit(&mut self, intent: ActionIntent) -> Result<EditSession> {
        self.ensure_free(intent.entity_id)?;
        let position = self.resolve_position(intent.entity_id, intent.position)?;

        let canonical = match self.store.fetch_one(intent.entity_id).await {
            Ok(Some(record)) => record.fields,
            Ok(None) => return Err(ActionError::UpdateNotApplied),
            Err(e) => {
                warn!(
                    "Falling back to projected canonical values for entity {}: {}",
                    intent.entity_id, e
                );
                self.projection
                    .row(position)
                    .ok_or(ActionError::RowNotFound(position))?
                    .canonical()
                    .clone()
            }
        };

        self.in_flight.insert(intent.entity_id);
        Ok(EditSession::open(
            intent.entity_id,
            position,
            self.projection.schema().clone(),
            canonical,
        ))
    }

    /// Issue the session's single update call and, once the store confirms
    /// it, apply the new canonical fields to the projection.
    ///
    /// `UpdateNotApplied` and store failures leave the session open and the
    /// projection untouched; the caller may retry or cancel.
    pub async fn commit_edit(&mut self, session: &mut EditSession) -> Result<()> {
        let fields = session.validated_fields()?.clone();
        let entity_id = session.entity_id();

        let affected = self.store.update(entity_id, &fields).await?;
        if affected == 0 {
            return Err(ActionError::UpdateNotApplied);
        }

        match self.resolve_position(entity_id, session.position()) {
            Ok(position) => {
                if let Err(e) = self.projection.apply_update(position, entity_id, fields) {
                    session.reject();
                    self.in_flight.remove(&entity_id);
                    return Err(e);
                }
            }
            Err(_) => warn!("Updated entity {} is no longer in the projection", entity_id),
        }
        session.mark_committed();
        self.in_flight.remove(&entity_id);
        Ok(())
    }

    /// Discard an edit session. Never touches the projection or the store.
    pub fn cancel_edit(&mut self, session: &mut EditSession) {
        session.cancel();
        self.in_flight.remove(&session.entity_id());
    }

    /// Open a delete confirmation for one row. No store call happens until
    /// the confirmation is answered affirmatively.
    pub fn begin_delete(&mut self, intent: ActionIntent) -> Result<DeleteConfirmation> {
        self.ensure_free(intent.entity_id)?;
        let position = self.resolve_position(intent.entity_id, intent.position)?;
        self.in_flight.insert(intent.entity_id);
        Ok(DeleteConfirmation::open(intent.entity_id, position))
    }

    /// Answer a pending delete confirmation.
    ///
    /// Anything but `Yes` declines with zero side effects. On `Yes` the
    /// controller issues exactly one delete call and removes the row only
    /// if the store reports at least one affected row. A store failure
    /// leaves the confirmation pending and resumable.
    pub async fn resolve_delete(
        &mut self,
        confirmation: &mut DeleteConfirmation,
        response: ConfirmResponse,
    ) -> Result<DeleteOutcome> {
        if !confirmation.is_pending() {
            return Err(ActionError::SessionState(format!(
                "Delete flow is {}",
                confirmation.state()
            )));
        }
        let entity_id = confirmation.entity_id();

        if !response.is_affirmative() {
            confirmation.decline();
            self.in_flight.remove(&entity_id);
            return Ok(DeleteOutcome::Declined);
        }

        confirmation.mark_deleting();
        let affected = match self.store.delete(entity_id).await {
            Ok(n) => n,
            Err(e) => {
                confirmation.reset_confirming();
                return Err(e.into());
            }
        };
        if affected == 0 {
            confirmation.mark_failed();
            self.in_flight.remove(&entity_id);
            return Err(ActionError::DeleteNotApplied);
        }

        match self.resolve_position(entity_id, confirmation.position()) {
            Ok(position) => {
                self.projection.remove_at(position, entity_id)?;
            }
            Err(_) => warn!("Deleted entity {} was not in the projection", entity_id),
        }
        confirmation.mark_removed();
        self.in_flight.remove(&entity_id);
        Ok(DeleteOutcome::Removed)
    }

    fn ensure_free(&self, entity_id: EntityId) -> Result<()> {
        if self.in_flight.contains(&entity_id) {
            return Err(ActionError::RowBusy(entity_id));
        }
        Ok(())
    }

    /// Re-validate a position hint against the identity it was captured
    /// with, falling back to an identity lookup when earlier removals have
    /// shifted the row.
    fn resolve_position(&self, entity_id: EntityId, hint: usize) -> Result<usize> {
        if let Some(row) = self.projection.row(hint)
            && row.entity_id() == entity_id
        {
            return Ok(hint);
        }
        match self.projection.position_of(entity_id) {
            Some(position) => {
                debug!(
                    "Entity {} moved from position {} to {}",
                    entity_id, hint, position
                );
                Ok(position)
            }
            None => Err(ActionError::RowNotFound(hint)),
        }
    }
}
