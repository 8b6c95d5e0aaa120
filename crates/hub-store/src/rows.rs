//! CRUD over JSON rows.
//!
//! Every logical table lives in the shared `records` table. Filters are
//! translated into `json_extract` predicates; table and column names are
//! checked to be plain identifiers and JSON paths are bound as parameters.

use chrono::Utc;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter};
use serde_json::{Map, Value};
use uuid::Uuid;

use hub_shared::Filter;

use crate::database::Database;
use crate::error::{Result, StoreError};

impl Database {
    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// All rows of `table` matching every filter, in insertion order.
    pub fn select_rows(&self, table: &str, filters: &[Filter]) -> Result<Vec<Value>> {
        let Some((clause, args)) = build_where(table, filters)? else {
            return Ok(Vec::new());
        };

        let mut stmt = self
            .conn()
            .prepare(&format!("SELECT data FROM records WHERE {clause} ORDER BY rowid"))?;
        let rows = stmt.query_map(params_from_iter(args.iter()), |row| row.get::<_, String>(0))?;

        let mut out = Vec::new();
        for row in rows {
            out.push(serde_json::from_str(&row?)?);
        }
        Ok(out)
    }

    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a partial record. Assigns `id`, `created_at` and `updated_at`
    /// when the record does not carry them and returns the stored row.
    pub fn insert_row(&self, table: &str, record: Value) -> Result<Value> {
        check_identifier(table)?;
        let Value::Object(mut map) = record else {
            return Err(StoreError::InvalidRecord("record must be a JSON object".into()));
        };

        let id = match map.get("id") {
            None | Some(Value::Null) => Uuid::new_v4().to_string(),
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(other) => {
                return Err(StoreError::InvalidRecord(format!("id must be a non-empty string, got {other}")))
            }
        };
        let now = Utc::now().to_rfc3339();
        map.insert("id".into(), Value::String(id.clone()));
        map.entry("created_at").or_insert_with(|| Value::String(now.clone()));
        map.entry("updated_at").or_insert_with(|| Value::String(now.clone()));

        let created_at = text_column(&map, "created_at", &now);
        let updated_at = text_column(&map, "updated_at", &now);
        let row = Value::Object(map);

        self.conn().execute(
            "INSERT INTO records (tbl, id, data, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![table, id, serde_json::to_string(&row)?, created_at, updated_at],
        )?;

        tracing::debug!(table, id = %id, "row inserted");
        Ok(row)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Merge `patch` into every matching row. `id` is immutable and ignored
    /// in the patch; `updated_at` is stamped unless the patch sets it.
    ///
    /// Returns `(old, new)` images of every changed row.
    pub fn update_rows(&mut self, table: &str, filters: &[Filter], patch: Value) -> Result<Vec<(Value, Value)>> {
        let Value::Object(patch) = patch else {
            return Err(StoreError::InvalidRecord("patch must be a JSON object".into()));
        };
        let Some((clause, args)) = build_where(table, filters)? else {
            return Ok(Vec::new());
        };

        let now = Utc::now().to_rfc3339();
        let tx = self.conn_mut().transaction()?;
        let matched = select_for_write(&tx, &clause, &args)?;

        let mut changed = Vec::with_capacity(matched.len());
        for (id, old) in matched {
            let mut merged = match &old {
                Value::Object(obj) => obj.clone(),
                _ => Map::new(),
            };
            for (key, value) in &patch {
                if key != "id" {
                    merged.insert(key.clone(), value.clone());
                }
            }
            if !patch.contains_key("updated_at") {
                merged.insert("updated_at".into(), Value::String(now.clone()));
            }
            let updated_at = text_column(&merged, "updated_at", &now);
            let new = Value::Object(merged);

            tx.execute(
                "UPDATE records SET data = ?1, updated_at = ?2 WHERE tbl = ?3 AND id = ?4",
                params![serde_json::to_string(&new)?, updated_at, table, id],
            )?;
            changed.push((old, new));
        }
        tx.commit()?;

        tracing::debug!(table, rows = changed.len(), "rows updated");
        Ok(changed)
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Delete every matching row and return the removed rows.
    pub fn delete_rows(&mut self, table: &str, filters: &[Filter]) -> Result<Vec<Value>> {
        let Some((clause, args)) = build_where(table, filters)? else {
            return Ok(Vec::new());
        };

        let tx = self.conn_mut().transaction()?;
        let matched = select_for_write(&tx, &clause, &args)?;

        let mut removed = Vec::with_capacity(matched.len());
        for (id, old) in matched {
            tx.execute("DELETE FROM records WHERE tbl = ?1 AND id = ?2", params![table, id])?;
            removed.push(old);
        }
        tx.commit()?;

        tracing::debug!(table, rows = removed.len(), "rows deleted");
        Ok(removed)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn select_for_write(tx: &rusqlite::Transaction<'_>, clause: &str, args: &[SqlValue]) -> Result<Vec<(String, Value)>> {
    let mut stmt = tx.prepare(&format!("SELECT id, data FROM records WHERE {clause} ORDER BY rowid"))?;
    let rows = stmt.query_map(params_from_iter(args.iter()), |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut out = Vec::new();
    for row in rows {
        let (id, data) = row?;
        out.push((id, serde_json::from_str(&data)?));
    }
    Ok(out)
}

/// Build the `WHERE` clause for `table` and `filters`.
///
/// Returns `None` when no row can match (an empty `IN` list).
fn build_where(table: &str, filters: &[Filter]) -> Result<Option<(String, Vec<SqlValue>)>> {
    check_identifier(table)?;

    let mut clauses = vec!["tbl = ?1".to_string()];
    let mut args = vec![SqlValue::Text(table.to_string())];

    for filter in filters {
        check_identifier(filter.column())?;
        match filter {
            Filter::Eq(column, value) => {
                args.push(SqlValue::Text(format!("$.{column}")));
                let path = args.len();
                match to_sql(value)? {
                    SqlValue::Null => clauses.push(format!("json_extract(data, ?{path}) IS NULL")),
                    v => {
                        args.push(v);
                        clauses.push(format!("json_extract(data, ?{path}) = ?{}", args.len()));
                    }
                }
            }
            Filter::In(column, values) => {
                if values.is_empty() {
                    return Ok(None);
                }
                args.push(SqlValue::Text(format!("$.{column}")));
                let path = args.len();
                let mut slots = Vec::with_capacity(values.len());
                for value in values {
                    args.push(to_sql(value)?);
                    slots.push(format!("?{}", args.len()));
                }
                clauses.push(format!("json_extract(data, ?{path}) IN ({})", slots.join(", ")));
            }
        }
    }

    Ok(Some((clauses.join(" AND "), args)))
}

/// Map a JSON scalar to the value `json_extract` would produce for it.
fn to_sql(value: &Value) -> Result<SqlValue> {
    Ok(match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => {
            return Err(StoreError::InvalidRecord(format!(
                "filter values must be scalars, got {other}"
            )))
        }
    })
}

fn check_identifier(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name.len() <= 64
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidIdentifier(name.to_string()))
    }
}

fn text_column(map: &Map<String, Value>, key: &str, fallback: &str) -> String {
    map.get(key)
        .and_then(Value::as_str)
        .unwrap_or(fallback)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn insert_assigns_id_and_timestamps() {
        let db = db();
        let row = db
            .insert_row("scheduled_posts", json!({ "user_id": "u1", "content": "hi" }))
            .unwrap();

        assert!(Uuid::parse_str(row["id"].as_str().unwrap()).is_ok());
        assert!(row["created_at"].is_string());
        assert_eq!(row["created_at"], row["updated_at"]);
    }

    #[test]
    fn insert_keeps_supplied_id_and_rejects_duplicates() {
        let db = db();
        db.insert_row("profiles", json!({ "id": "p1", "username": "ana" }))
            .unwrap();
        assert!(db
            .insert_row("profiles", json!({ "id": "p1", "username": "bob" }))
            .is_err());
    }

    #[test]
    fn insert_rejects_non_objects() {
        let db = db();
        assert!(matches!(
            db.insert_row("profiles", json!(["not", "an", "object"])),
            Err(StoreError::InvalidRecord(_))
        ));
    }

    #[test]
    fn select_applies_every_filter() {
        let db = db();
        db.insert_row("followers", json!({ "influencer_id": "a", "status": "active" }))
            .unwrap();
        db.insert_row("followers", json!({ "influencer_id": "a", "status": "blocked" }))
            .unwrap();
        db.insert_row("followers", json!({ "influencer_id": "b", "status": "active" }))
            .unwrap();

        let rows = db
            .select_rows(
                "followers",
                &[Filter::eq("influencer_id", "a"), Filter::eq("status", "active")],
            )
            .unwrap();
        assert_eq!(rows.len(), 1);

        // Tables are isolated from one another.
        assert!(db
            .select_rows("scheduled_posts", &[Filter::eq("influencer_id", "a")])
            .unwrap()
            .is_empty());
    }

    #[test]
    fn select_supports_in_null_and_scalars() {
        let db = db();
        db.insert_row("profiles", json!({ "id": "p1", "score": 3, "vip": true }))
            .unwrap();
        db.insert_row("profiles", json!({ "id": "p2", "score": 4, "vip": false, "bio": null }))
            .unwrap();

        let picked = db
            .select_rows("profiles", &[Filter::any_of("id", ["p2", "p9"])])
            .unwrap();
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0]["id"], "p2");

        assert!(db
            .select_rows("profiles", &[Filter::any_of("id", Vec::<String>::new())])
            .unwrap()
            .is_empty());

        assert_eq!(db.select_rows("profiles", &[Filter::eq("score", 3)]).unwrap().len(), 1);
        assert_eq!(db.select_rows("profiles", &[Filter::eq("vip", true)]).unwrap().len(), 1);
        // Missing and explicit null both read as null.
        assert_eq!(db.select_rows("profiles", &[Filter::eq("bio", Value::Null)]).unwrap().len(), 2);
    }

    #[test]
    fn identifiers_are_checked() {
        let db = db();
        assert!(matches!(
            db.select_rows("posts; DROP TABLE records", &[]),
            Err(StoreError::InvalidIdentifier(_))
        ));
        assert!(matches!(
            db.select_rows("posts", &[Filter::eq("a.b", "x")]),
            Err(StoreError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn update_merges_patch_and_keeps_id() {
        let mut db = db();
        let row = db
            .insert_row(
                "scheduled_posts",
                json!({ "user_id": "u1", "content": "old", "updated_at": "2000-01-01T00:00:00+00:00" }),
            )
            .unwrap();
        let id = row["id"].as_str().unwrap().to_string();

        let changed = db
            .update_rows(
                "scheduled_posts",
                &[Filter::eq("id", id.as_str()), Filter::eq("user_id", "u1")],
                json!({ "content": "new", "id": "hijack" }),
            )
            .unwrap();

        assert_eq!(changed.len(), 1);
        let (old, new) = &changed[0];
        assert_eq!(old["content"], "old");
        assert_eq!(new["content"], "new");
        assert_eq!(new["id"], id.as_str());
        assert_ne!(new["updated_at"], "2000-01-01T00:00:00+00:00");
        assert_eq!(new["user_id"], "u1");
    }

    #[test]
    fn update_scoped_to_other_owner_touches_nothing() {
        let mut db = db();
        let row = db
            .insert_row("scheduled_posts", json!({ "user_id": "u1", "content": "x" }))
            .unwrap();
        let changed = db
            .update_rows(
                "scheduled_posts",
                &[Filter::eq("id", row["id"].clone()), Filter::eq("user_id", "u2")],
                json!({ "content": "stolen" }),
            )
            .unwrap();
        assert!(changed.is_empty());

        let stored = db.select_rows("scheduled_posts", &[]).unwrap();
        assert_eq!(stored[0]["content"], "x");
    }

    #[test]
    fn delete_returns_removed_rows() {
        let mut db = db();
        db.insert_row("followers", json!({ "influencer_id": "a", "follower_id": "b" }))
            .unwrap();
        db.insert_row("followers", json!({ "influencer_id": "a", "follower_id": "c" }))
            .unwrap();

        let removed = db
            .delete_rows(
                "followers",
                &[Filter::eq("influencer_id", "a"), Filter::eq("follower_id", "b")],
            )
            .unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0]["follower_id"], "b");
        assert_eq!(db.select_rows("followers", &[]).unwrap().len(), 1);

        assert!(db
            .delete_rows("followers", &[Filter::eq("follower_id", "zzz")])
            .unwrap()
            .is_empty());
    }
}
