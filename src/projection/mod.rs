use crate::core::{ActionError, EntityId, FieldKind, Fields, Result, Value, ViewSchema};
use crate::store::EntityRecord;
use std::collections::BTreeMap;

/// Free-text columns show at most this many characters of the canonical
/// value before the ellipsis marker.
pub const TRUNCATE_AT: usize = 20;
pub const ELLIPSIS: &str = "...";

/// One row of the live projection.
///
/// The entity id is fixed for the row's lifetime; the row's position is its
/// index in the projection sequence and shifts when earlier rows are
/// removed. Display strings are derived from the canonical fields and may
/// be lossy; the canonical fields stay authoritative.
#[derive(Debug, Clone)]
pub struct ProjectedRow {
    entity_id: EntityId,
    canonical: Fields,
    display: BTreeMap<String, String>,
}

impl ProjectedRow {
    pub fn entity_id(&self) -> EntityId {
        self.entity_id
    }

    pub fn canonical(&self) -> &Fields {
        &self.canonical
    }

    pub fn canonical_field(&self, name: &str) -> Option<&Value> {
        self.canonical.get(name)
    }

    pub fn display(&self, name: &str) -> Option<&str> {
        self.display.get(name).map(String::as_str)
    }

    pub fn display_fields(&self) -> &BTreeMap<String, String> {
        &self.display
    }
}

/// In-memory ordered view of persisted rows.
///
/// The projection is mutated only through `load`, `apply_update` and
/// `remove_at`, and only by its owning controller once the store has
/// confirmed the matching mutation. Position-based mutations re-validate
/// the row's identity first; identity lookups never go through positions.
#[derive(Debug)]
pub struct EntityProjection {
    schema: ViewSchema,
    rows: Vec<ProjectedRow>,
}

impl EntityProjection {
    pub fn new(schema: ViewSchema) -> Self {
        Self {
            schema,
            rows: Vec::new(),
        }
    }

    pub fn schema(&self) -> &ViewSchema {
        &self.schema
    }

    /// Replace the entire row sequence from a query snapshot. No row from a
    /// previous load survives.
    pub fn load(&mut self, snapshot: Vec<EntityRecord>) {
        let schema = &self.schema;
        self.rows = snapshot
            .into_iter()
            .map(|record| {
                let mut canonical = record.fields;
                // A snapshot may omit the identity column; the record id is
                // authoritative either way.
                canonical
                    .entry(schema.identity_field().to_string())
                    .or_insert(Value::Integer(record.id.as_i64()));
                ProjectedRow {
                    entity_id: record.id,
                    display: format_fields(schema, &canonical),
                    canonical,
                }
            })
            .collect();
    }

    pub fn rows(&self) -> &[ProjectedRow] {
        &self.rows
    }

    pub fn row(&self, position: usize) -> Option<&ProjectedRow> {
        self.rows.get(position)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Current position of an entity, by identity alone.
    pub fn position_of(&self, entity_id: EntityId) -> Option<usize> {
        self.rows
            .iter()
            .position(|row| row.entity_id == entity_id)
    }

    /// Overwrite the canonical fields of the row at `position` and
    /// recompute its display fields. The row must still carry `entity_id`.
    pub fn apply_update(
        &mut self,
        position: usize,
        entity_id: EntityId,
        canonical: Fields,
    ) -> Result<()> {
        self.check_identity(position, entity_id)?;
        let mut canonical = canonical;
        canonical
            .entry(self.schema.identity_field().to_string())
            .or_insert(Value::Integer(entity_id.as_i64()));
        let display = format_fields(&self.schema, &canonical);
        let row = &mut self.rows[position];
        row.canonical = canonical;
        row.display = display;
        Ok(())
    }

    /// Remove the row at `position`; every later row shifts down by one in
    /// the same step. The row must still carry `entity_id`.
    pub fn remove_at(&mut self, position: usize, entity_id: EntityId) -> Result<ProjectedRow> {
        self.check_identity(position, entity_id)?;
        Ok(self.rows.remove(position))
    }

    fn check_identity(&self, position: usize, expected: EntityId) -> Result<()> {
        let row = self
            .rows
            .get(position)
            .ok_or(ActionError::RowNotFound(position))?;
        if row.entity_id != expected {
            return Err(ActionError::IdentityMismatch {
                position,
                expected,
                found: row.entity_id,
            });
        }
        Ok(())
    }
}

/// Derive the display strings for one row. Pure and deterministic.
pub fn format_fields(schema: &ViewSchema, canonical: &Fields) -> BTreeMap<String, String> {
    schema
        .fields()
        .iter()
        .map(|spec| {
            let value = canonical.get(&spec.name).unwrap_or(&Value::Null);
            (spec.name.clone(), format_value(&spec.kind, value))
        })
        .collect()
}

/// Render one canonical value for display. Pure and deterministic.
pub fn format_value(kind: &FieldKind, value: &Value) -> String {
    if value.is_null() {
        return String::new();
    }
    match kind {
        FieldKind::Numeric { unit } => match value.as_f64() {
            Some(n) => format!("{:.1}{}", n, unit),
            None => value.to_string(),
        },
        FieldKind::FreeText => match value.as_str() {
            Some(s) => truncate(s),
            None => truncate(&value.to_string()),
        },
        FieldKind::Date | FieldKind::Plain => value.to_string(),
    }
}

fn truncate(text: &str) -> String {
    if text.chars().count() > TRUNCATE_AT {
        let mut shortened: String = text.chars().take(TRUNCATE_AT).collect();
        shortened.push_str(ELLIPSIS);
        shortened
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::FieldSpec;

    fn routine_schema() -> ViewSchema {
        ViewSchema::new(
            "id",
            vec![
                FieldSpec::plain("id"),
                FieldSpec::date("date"),
                FieldSpec::numeric("reading", " hrs"),
                FieldSpec::free_text("remarks"),
            ],
        )
    }

    fn record(id: i64, pairs: &[(&str, Value)]) -> EntityRecord {
        EntityRecord::new(
            id,
            pairs
                .iter()
                .map(|(name, value)| (name.to_string(), value.clone()))
                .collect(),
        )
    }

    #[test]
    fn test_numeric_formatting() {
        let kind = FieldKind::Numeric {
            unit: " hrs".into(),
        };
        assert_eq!(format_value(&kind, &Value::Float(2.5)), "2.5 hrs");
        assert_eq!(format_value(&kind, &Value::Float(2.0)), "2.0 hrs");
        assert_eq!(format_value(&kind, &Value::Integer(3)), "3.0 hrs");
        assert_eq!(format_value(&kind, &Value::Float(2.25)), "2.2 hrs");
    }

    #[test]
    fn test_null_renders_empty() {
        assert_eq!(format_value(&FieldKind::FreeText, &Value::Null), "");
        assert_eq!(
            format_value(&FieldKind::Numeric { unit: " hrs".into() }, &Value::Null),
            ""
        );
    }

    #[test]
    fn test_truncation_boundary() {
        let short = "a".repeat(20);
        assert_eq!(format_value(&FieldKind::FreeText, &short.clone().into()), short);

        let long = "a".repeat(21);
        let shown = format_value(&FieldKind::FreeText, &long.into());
        assert_eq!(shown.chars().count(), 23);
        assert!(shown.ends_with(ELLIPSIS));
        assert_eq!(shown, format!("{}...", "a".repeat(20)));
    }

    #[test]
    fn test_truncation_is_deterministic() {
        let text = Value::from("Went to the library today and studied");
        let once = format_value(&FieldKind::FreeText, &text);
        let twice = format_value(&FieldKind::FreeText, &text);
        assert_eq!(once, twice);
        assert_eq!(once.chars().count(), 23);
    }

    #[test]
    fn test_plain_passes_through_untruncated() {
        let long = "x".repeat(40);
        assert_eq!(
            format_value(&FieldKind::Plain, &long.clone().into()),
            long
        );
    }

    #[test]
    fn test_load_replaces_all_rows() {
        let mut projection = EntityProjection::new(routine_schema());
        projection.load(vec![record(1, &[("remarks", "old".into())])]);
        assert_eq!(projection.len(), 1);

        projection.load(vec![
            record(7, &[("remarks", "new".into())]),
            record(8, &[("remarks", "also new".into())]),
        ]);
        assert_eq!(projection.len(), 2);
        assert_eq!(projection.row(0).unwrap().entity_id(), EntityId(7));
        assert_eq!(projection.position_of(EntityId(1)), None);
    }

    #[test]
    fn test_load_fills_identity_field() {
        let mut projection = EntityProjection::new(routine_schema());
        projection.load(vec![record(5, &[("remarks", "no id column".into())])]);
        assert_eq!(
            projection.row(0).unwrap().canonical_field("id"),
            Some(&Value::Integer(5))
        );
    }

    #[test]
    fn test_apply_update_recomputes_display() {
        let mut projection = EntityProjection::new(routine_schema());
        projection.load(vec![record(1, &[("reading", 1.0.into())])]);

        let mut fields = projection.row(0).unwrap().canonical().clone();
        fields.insert("reading".into(), Value::Float(2.5));
        projection.apply_update(0, EntityId(1), fields).unwrap();

        let row = projection.row(0).unwrap();
        assert_eq!(row.canonical_field("reading"), Some(&Value::Float(2.5)));
        assert_eq!(row.display("reading"), Some("2.5 hrs"));
    }

    #[test]
    fn test_apply_update_rejects_wrong_identity() {
        let mut projection = EntityProjection::new(routine_schema());
        projection.load(vec![record(1, &[])]);

        let err = projection
            .apply_update(0, EntityId(2), Fields::new())
            .unwrap_err();
        assert!(matches!(err, ActionError::IdentityMismatch { .. }));
    }

    #[test]
    fn test_remove_at_shifts_later_rows() {
        let mut projection = EntityProjection::new(routine_schema());
        projection.load(vec![record(10, &[]), record(11, &[]), record(12, &[])]);

        let removed = projection.remove_at(1, EntityId(11)).unwrap();
        assert_eq!(removed.entity_id(), EntityId(11));
        assert_eq!(projection.len(), 2);
        assert_eq!(projection.row(0).unwrap().entity_id(), EntityId(10));
        assert_eq!(projection.row(1).unwrap().entity_id(), EntityId(12));
        assert_eq!(projection.position_of(EntityId(12)), Some(1));
    }

    #[test]
    fn test_remove_at_out_of_bounds() {
        let mut projection = EntityProjection::new(routine_schema());
        projection.load(vec![record(1, &[])]);
        assert!(matches!(
            projection.remove_at(5, EntityId(1)),
            Err(ActionError::RowNotFound(5))
        ));
    }
}
