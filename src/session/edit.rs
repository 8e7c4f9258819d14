use crate::core::{ActionError, EntityId, FieldKind, Fields, Result, Value, ViewSchema};
use std::collections::BTreeMap;
use std::fmt;

/// Edit session lifecycle
///
/// State transitions:
/// ```text
/// Opened ──validate──> Validating ──commit──> Committed
///   │                      │  │
///   │                      │  └──(store refused / failed)──> Validating
///   └──────cancel──────────┴──cancel──> Cancelled
/// ```
/// `Rejected` is the terminal state for a session whose target row could
/// not be re-validated at apply time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditState {
    /// Prefilled with canonical values, accepting input.
    Opened,

    /// Input has been (re)checked; invalid numeric input keeps the
    /// session here.
    Validating,

    /// Exactly one update was issued and applied.
    Committed,

    /// The target row failed identity re-validation; no retry possible.
    Rejected,

    /// All edits discarded; no side effects on projection or store.
    Cancelled,
}

impl EditState {
    pub fn is_open(&self) -> bool {
        matches!(self, EditState::Opened | EditState::Validating)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_open()
    }
}

impl fmt::Display for EditState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EditState::Opened => "opened",
            EditState::Validating => "validating",
            EditState::Committed => "committed",
            EditState::Rejected => "rejected",
            EditState::Cancelled => "cancelled",
        };
        write!(f, "{}", name)
    }
}

/// A modal edit round trip over one row.
///
/// The session owns a private copy of the row's canonical fields plus raw
/// draft inputs; it never touches the projection itself. Committing goes
/// through the controller, which applies the result only after the store
/// confirms it.
#[derive(Debug)]
pub struct EditSession {
    entity_id: EntityId,
    position: usize,
    schema: ViewSchema,
    original: Fields,
    prefill: BTreeMap<String, String>,
    drafts: BTreeMap<String, String>,
    validated: Option<Fields>,
    state: EditState,
}

impl EditSession {
    pub(crate) fn open(
        entity_id: EntityId,
        position: usize,
        schema: ViewSchema,
        canonical: Fields,
    ) -> Self {
        let prefill: BTreeMap<String, String> = schema
            .editable_fields()
            .map(|spec| {
                let value = canonical.get(&spec.name).unwrap_or(&Value::Null);
                (spec.name.clone(), prefill_value(&spec.kind, value))
            })
            .collect();
        Self {
            entity_id,
            position,
            schema,
            original: canonical,
            drafts: prefill.clone(),
            prefill,
            validated: None,
            state: EditState::Opened,
        }
    }

    pub fn entity_id(&self) -> EntityId {
        self.entity_id
    }

    /// Position of the target row when the session opened. The controller
    /// re-resolves by identity before applying, so this may be stale.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn state(&self) -> EditState {
        self.state
    }

    /// The canonical fields the session was prefilled from.
    pub fn original(&self) -> &Fields {
        &self.original
    }

    /// Current raw input for one editable field.
    pub fn input(&self, field: &str) -> Option<&str> {
        self.drafts.get(field).map(String::as_str)
    }

    /// Replace the raw input for one editable field.
    pub fn set_input(&mut self, field: &str, raw: impl Into<String>) -> Result<()> {
        if self.state.is_terminal() {
            return Err(ActionError::SessionState(format!(
                "Session is {}",
                self.state
            )));
        }
        if !self.drafts.contains_key(field) {
            return Err(ActionError::SessionState(format!(
                "Field '{}' is not editable",
                field
            )));
        }
        self.drafts.insert(field.to_string(), raw.into());
        self.validated = None;
        Ok(())
    }

    /// Check all drafts and build the canonical fields a commit would send.
    ///
    /// Numeric drafts must parse as finite non-negative numbers; a failure
    /// keeps the session in `Validating` and reports the offending field.
    /// Unmodified drafts carry the original canonical value through
    /// unchanged, so a no-op commit sends exactly what was loaded.
    pub fn validate(&mut self) -> Result<()> {
        if self.state.is_terminal() {
            return Err(ActionError::SessionState(format!(
                "Session is {}",
                self.state
            )));
        }
        self.state = EditState::Validating;
        self.validated = None;

        let mut fields = self.original.clone();
        for spec in self.schema.editable_fields() {
            let Some(draft) = self.drafts.get(&spec.name) else {
                continue;
            };
            if Some(draft) == self.prefill.get(&spec.name) {
                continue;
            }
            match &spec.kind {
                FieldKind::Numeric { .. } => {
                    let number: f64 = draft
                        .trim()
                        .parse()
                        .map_err(|_| ActionError::InvalidNumericInput(spec.name.clone()))?;
                    if !number.is_finite() || number < 0.0 {
                        return Err(ActionError::InvalidNumericInput(spec.name.clone()));
                    }
                    fields.insert(spec.name.clone(), Value::Float(number));
                }
                FieldKind::FreeText | FieldKind::Plain => {
                    fields.insert(spec.name.clone(), Value::Text(draft.trim().to_string()));
                }
                FieldKind::Date => {}
            }
        }
        self.validated = Some(fields);
        Ok(())
    }

    /// The validated canonical fields, ready to send. Fails unless a
    /// successful `validate` ran since the last input change.
    pub fn validated_fields(&self) -> Result<&Fields> {
        match (&self.state, &self.validated) {
            (EditState::Validating, Some(fields)) => Ok(fields),
            _ => Err(ActionError::SessionState(format!(
                "Session is {} and not validated",
                self.state
            ))),
        }
    }

    pub(crate) fn cancel(&mut self) {
        if self.state.is_open() {
            self.state = EditState::Cancelled;
        }
    }

    pub(crate) fn mark_committed(&mut self) {
        self.state = EditState::Committed;
    }

    pub(crate) fn reject(&mut self) {
        self.state = EditState::Rejected;
    }
}

fn prefill_value(kind: &FieldKind, value: &Value) -> String {
    if value.is_null() {
        return String::new();
    }
    match kind {
        // plain numeric representation, never the display string with its
        // unit suffix
        FieldKind::Numeric { .. } => match value.as_f64() {
            Some(n) => n.to_string(),
            None => value.to_string(),
        },
        _ => value.to_string(),
    }
}
