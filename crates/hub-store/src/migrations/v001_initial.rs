//! v001 -- Initial schema creation.
//!
//! Every logical table (`scheduled_posts`, `followers`, `profiles`,
//! `social_accounts`, ...) shares one physical `records` table. Rows are
//! stored as JSON objects and filtered with `json_extract`.

use rusqlite::Connection;

const UP_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS records (
    tbl        TEXT NOT NULL,               -- logical table name
    id         TEXT NOT NULL,               -- UUID v4 unless supplied
    data       TEXT NOT NULL,               -- JSON object, includes id
    created_at TEXT NOT NULL,               -- RFC-3339
    updated_at TEXT NOT NULL,

    PRIMARY KEY (tbl, id)
);

CREATE INDEX IF NOT EXISTS idx_records_tbl_created
    ON records(tbl, created_at);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
