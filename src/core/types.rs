use super::{ActionError, Result, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Canonical fields of one entity, keyed by field name.
pub type Fields = BTreeMap<String, Value>;

/// Stable identifier of a persisted entity.
///
/// Wraps the integer primary key handed out by the store. The id is
/// immutable for the lifetime of a row; positions shift, ids never do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub i64);

impl EntityId {
    /// Resolve an identity from a row's identity field value.
    ///
    /// Integer values pass through, text must parse as an integer id.
    /// Anything else fails with `MalformedIdentity` and must abort the
    /// action that triggered the resolution.
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Integer(i) => Ok(Self(*i)),
            Value::Text(s) => s
                .trim()
                .parse::<i64>()
                .map(Self)
                .map_err(|_| ActionError::MalformedIdentity(s.clone())),
            other => Err(ActionError::MalformedIdentity(other.to_string())),
        }
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl From<i64> for EntityId {
    fn from(i: i64) -> Self {
        Self(i)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a field renders and validates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// Fixed one-decimal rendering with a literal unit suffix
    /// (e.g. `2.5 hrs` for a suffix of `" hrs"`). Edits must parse as a
    /// non-negative finite number.
    Numeric { unit: String },

    /// Free text. Display truncates past 20 characters; the canonical
    /// value is unconstrained and stays authoritative.
    FreeText,

    /// Calendar date, rendered ISO (YYYY-MM-DD). Not editable.
    Date,

    /// Rendered via `Display`, passed through on edit.
    Plain,
}

impl FieldKind {
    pub fn is_editable(&self) -> bool {
        !matches!(self, Self::Date)
    }
}

/// One column of a list view.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub fn numeric(name: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Numeric { unit: unit.into() },
        }
    }

    pub fn free_text(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::FreeText,
        }
    }

    pub fn date(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Date,
        }
    }

    pub fn plain(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Plain,
        }
    }
}

/// The shape of one entity list view: which field carries the identity
/// and which fields are shown as columns.
#[derive(Debug, Clone)]
pub struct ViewSchema {
    identity_field: String,
    fields: Vec<FieldSpec>,
}

impl ViewSchema {
    pub fn new(identity_field: impl Into<String>, fields: Vec<FieldSpec>) -> Self {
        Self {
            identity_field: identity_field.into(),
            fields,
        }
    }

    pub fn identity_field(&self) -> &str {
        &self.identity_field
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|spec| spec.name == name)
    }

    /// Fields a session may draft edits for. The identity field is never
    /// editable even when listed as a column.
    pub fn editable_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields
            .iter()
            .filter(|spec| spec.kind.is_editable() && spec.name != self.identity_field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_from_integer() {
        assert_eq!(
            EntityId::from_value(&Value::Integer(7)).unwrap(),
            EntityId(7)
        );
    }

    #[test]
    fn test_identity_from_text() {
        assert_eq!(
            EntityId::from_value(&Value::Text(" 42 ".into())).unwrap(),
            EntityId(42)
        );
    }

    #[test]
    fn test_identity_malformed() {
        assert!(matches!(
            EntityId::from_value(&Value::Text("seven".into())),
            Err(ActionError::MalformedIdentity(_))
        ));
        assert!(matches!(
            EntityId::from_value(&Value::Null),
            Err(ActionError::MalformedIdentity(_))
        ));
        assert!(matches!(
            EntityId::from_value(&Value::Float(7.0)),
            Err(ActionError::MalformedIdentity(_))
        ));
    }

    #[test]
    fn test_editable_fields_skip_identity_and_date() {
        let schema = ViewSchema::new(
            "id",
            vec![
                FieldSpec::plain("id"),
                FieldSpec::date("date"),
                FieldSpec::numeric("reading", " hrs"),
                FieldSpec::free_text("remarks"),
            ],
        );
        let editable: Vec<&str> = schema
            .editable_fields()
            .map(|spec| spec.name.as_str())
            .collect();
        assert_eq!(editable, vec!["reading", "remarks"]);
    }
}
