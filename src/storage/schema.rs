//! Database schema and migrations.

use anyhow::Result;
use rusqlite::Connection;

/// Run all pending migrations.
pub fn migrate(conn: &Connection) -> Result<()> {
    // AUTOINCREMENT keeps fault ids monotonic even after rows are removed by hand
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS faults (
            fault_id INTEGER PRIMARY KEY AUTOINCREMENT,
            fault_type TEXT NOT NULL,
            mean_error REAL NOT NULL,
            max_error REAL NOT NULL,
            affected_sensor TEXT NOT NULL,
            severity TEXT NOT NULL,
            detected_at TEXT NOT NULL,
            solution TEXT NOT NULL DEFAULT 'Pending analysis',
            remarks TEXT NOT NULL DEFAULT ''
        );

        CREATE INDEX IF NOT EXISTS idx_faults_sensor ON faults(affected_sensor);

        INSERT OR IGNORE INTO schema_version (version) VALUES (1);",
    )?;

    Ok(())
}
