//! v002 -- Expression indexes on the owner columns every view filters by.

use rusqlite::Connection;

const UP_SQL: &str = r#"
CREATE INDEX IF NOT EXISTS idx_records_user_id
    ON records(tbl, json_extract(data, '$.user_id'));

CREATE INDEX IF NOT EXISTS idx_records_influencer_id
    ON records(tbl, json_extract(data, '$.influencer_id'));

CREATE INDEX IF NOT EXISTS idx_records_follower_id
    ON records(tbl, json_extract(data, '$.follower_id'));
"#;

pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
