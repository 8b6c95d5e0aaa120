//! Decoding raw feed payloads into typed mirror changes.

use serde::de::DeserializeOwned;
use serde_json::Value;

use hub_shared::{BackendError, ChangeKind, Record, RowChange};

use crate::mirror::Change;

/// Decode one row into a model.
pub fn decode_row<T: DeserializeOwned>(table: &str, row: Value) -> Result<T, BackendError> {
    serde_json::from_value(row).map_err(|e| BackendError::Malformed(format!("{table}: {e}")))
}

pub fn decode_rows<T: DeserializeOwned>(table: &str, rows: Vec<Value>) -> Result<Vec<T>, BackendError> {
    rows.into_iter().map(|row| decode_row(table, row)).collect()
}

/// Turn a feed payload into a typed [`Change`].
///
/// Deletes only need the old row's `id`, which is all some feeds send.
pub fn decode_change<T>(raw: RowChange) -> Result<Change<T>, BackendError>
where
    T: DeserializeOwned + Record,
{
    let RowChange { table, kind, old, new } = raw;
    match kind {
        ChangeKind::Insert | ChangeKind::Update => {
            let row = new.ok_or_else(|| BackendError::Malformed(format!("{table}: change without new row")))?;
            let item = decode_row(&table, row)?;
            Ok(if kind == ChangeKind::Insert {
                Change::Inserted(item)
            } else {
                Change::Updated(item)
            })
        }
        ChangeKind::Delete => old
            .as_ref()
            .and_then(|row| row.get("id"))
            .and_then(Value::as_str)
            .map(|id| Change::Deleted(id.to_string()))
            .ok_or_else(|| BackendError::Malformed(format!("{table}: delete without old id"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hub_shared::models::FollowerRelation;
    use serde_json::json;

    fn relation(id: &str) -> Value {
        json!({
            "id": id,
            "influencer_id": "me",
            "follower_id": "fan",
            "status": "active",
            "created_at": "2026-10-19T08:00:00Z"
        })
    }

    #[test]
    fn inserts_and_updates_carry_the_new_row() {
        let change: Change<FollowerRelation> =
            decode_change(RowChange::inserted("followers", relation("r1"))).unwrap();
        assert!(matches!(change, Change::Inserted(ref r) if r.id == "r1"));

        let change: Change<FollowerRelation> =
            decode_change(RowChange::updated("followers", relation("r1"), relation("r1"))).unwrap();
        assert!(matches!(change, Change::Updated(_)));
    }

    #[test]
    fn deletes_need_only_the_old_id() {
        let change: Change<FollowerRelation> =
            decode_change(RowChange::deleted("followers", json!({ "id": "r9" }))).unwrap();
        assert_eq!(change, Change::Deleted("r9".into()));
    }

    #[test]
    fn malformed_payloads_are_reported() {
        let bad = RowChange::inserted("followers", json!({ "id": "r1" }));
        assert!(matches!(
            decode_change::<FollowerRelation>(bad),
            Err(BackendError::Malformed(_))
        ));

        let no_id = RowChange::deleted("followers", json!({}));
        assert!(decode_change::<FollowerRelation>(no_id).is_err());
    }
}
