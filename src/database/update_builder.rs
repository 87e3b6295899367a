use serde_json::{Map, Value};
use sqlx::postgres::PgArguments;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// Declared mapping from JSON field names to table columns for one
/// entity's partial update. Keeping the mapping in a single table per
/// entity is what prevents drift between update endpoints.
#[derive(Debug)]
pub struct UpdateSpec {
    pub table: &'static str,
    pub key_column: &'static str,
    pub fields: &'static [(&'static str, &'static str)],
}

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum UpdateError {
    #[error("No updatable fields provided")]
    NoFields,
    #[error("Unknown field: {0}")]
    UnknownField(String),
    #[error("Unsupported value for field: {0}")]
    UnsupportedValue(String),
}

/// Builds a parameterized `UPDATE ... SET ... WHERE key = $n RETURNING *`
/// from the subset of declared fields present in a request body.
#[derive(Debug)]
pub struct UpdateBuilder {
    spec: &'static UpdateSpec,
    columns: Vec<&'static str>,
    params: Vec<Value>,
}

impl UpdateBuilder {
    /// Accepts only fields declared in the mapping table; any other key
    /// in the payload is rejected. Scalar values only.
    pub fn from_payload(
        spec: &'static UpdateSpec,
        payload: &Map<String, Value>,
    ) -> Result<Self, UpdateError> {
        for key in payload.keys() {
            if !spec.fields.iter().any(|(field, _)| *field == key.as_str()) {
                return Err(UpdateError::UnknownField(key.clone()));
            }
        }

        let mut columns = Vec::new();
        let mut params = Vec::new();
        for (field, column) in spec.fields {
            if let Some(value) = payload.get(*field) {
                match value {
                    Value::Array(_) | Value::Object(_) => {
                        return Err(UpdateError::UnsupportedValue((*field).to_string()))
                    }
                    _ => {
                        columns.push(*column);
                        params.push(value.clone());
                    }
                }
            }
        }

        if columns.is_empty() {
            return Err(UpdateError::NoFields);
        }

        Ok(Self {
            spec,
            columns,
            params,
        })
    }

    /// SQL text with one positional parameter per set column and the row
    /// key as the final parameter.
    pub fn sql(&self) -> String {
        let sets: Vec<String> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, col)| format!("{} = ${}", col, i + 1))
            .collect();
        format!(
            "UPDATE {} SET {}, updated_at = CURRENT_TIMESTAMP WHERE {} = ${} RETURNING *",
            self.spec.table,
            sets.join(", "),
            self.spec.key_column,
            self.columns.len() + 1
        )
    }

    /// Run the update, returning the updated row or `None` when the key
    /// matched nothing.
    pub async fn fetch_optional<T>(
        &self,
        key: Uuid,
        pool: &PgPool,
    ) -> Result<Option<T>, sqlx::Error>
    where
        T: for<'r> FromRow<'r, sqlx::postgres::PgRow> + Send + Unpin,
    {
        let sql = self.sql();
        let mut q = sqlx::query_as::<_, T>(&sql);
        for p in &self.params {
            q = bind_param(q, p);
        }
        q.bind(key).fetch_optional(pool).await
    }
}

fn bind_param<'q, O>(
    q: sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>,
    v: &'q Value,
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>
where
    O: for<'r> FromRow<'r, sqlx::postgres::PgRow>,
{
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s),
        // Array/Object are rejected by from_payload
        _ => q,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    static BATCH_SPEC: UpdateSpec = UpdateSpec {
        table: "batches",
        key_column: "batch_id",
        fields: &[("batch_name", "batch_name"), ("is_active", "is_active")],
    };

    fn payload(v: Value) -> Map<String, Value> {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn builds_update_for_present_fields_only() {
        let builder =
            UpdateBuilder::from_payload(&BATCH_SPEC, &payload(json!({"batch_name": "B1"})))
                .unwrap();
        assert_eq!(
            builder.sql(),
            "UPDATE batches SET batch_name = $1, updated_at = CURRENT_TIMESTAMP \
             WHERE batch_id = $2 RETURNING *"
        );
    }

    #[test]
    fn orders_parameters_by_declared_table() {
        let builder = UpdateBuilder::from_payload(
            &BATCH_SPEC,
            &payload(json!({"is_active": false, "batch_name": "B1"})),
        )
        .unwrap();
        assert_eq!(
            builder.sql(),
            "UPDATE batches SET batch_name = $1, is_active = $2, updated_at = CURRENT_TIMESTAMP \
             WHERE batch_id = $3 RETURNING *"
        );
    }

    #[test]
    fn rejects_unknown_fields() {
        let err = UpdateBuilder::from_payload(&BATCH_SPEC, &payload(json!({"org_id": "x"})))
            .unwrap_err();
        assert_eq!(err, UpdateError::UnknownField("org_id".to_string()));
    }

    #[test]
    fn rejects_empty_payload() {
        let err = UpdateBuilder::from_payload(&BATCH_SPEC, &payload(json!({}))).unwrap_err();
        assert_eq!(err, UpdateError::NoFields);
    }

    #[test]
    fn rejects_nested_values() {
        let err = UpdateBuilder::from_payload(
            &BATCH_SPEC,
            &payload(json!({"batch_name": {"bad": true}})),
        )
        .unwrap_err();
        assert_eq!(err, UpdateError::UnsupportedValue("batch_name".to_string()));
    }
}
