//! Persistence seam for fault records.

use crate::faults::{FaultError, FaultRecord, NewFault};
use rusqlite::{params, Connection, Row};

const SELECT_COLUMNS: &str = "SELECT fault_id, fault_type, mean_error, max_error, affected_sensor,
        severity, detected_at, solution, remarks FROM faults";

/// Anything that can list and append fault records.
///
/// `scan` must yield records in insertion order; the matcher relies on it for
/// first-match-wins.
pub trait FaultStore {
    fn scan(&self) -> Result<Vec<FaultRecord>, FaultError>;

    /// Candidates for a given sensor. Stores with an index should override this.
    fn scan_sensor(&self, sensor: &str) -> Result<Vec<FaultRecord>, FaultError> {
        Ok(self
            .scan()?
            .into_iter()
            .filter(|r| r.affected_sensor == sensor)
            .collect())
    }

    /// Append a record and return its new `fault_id`.
    fn insert(&self, fault: &NewFault) -> Result<i64, FaultError>;
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<FaultRecord> {
    Ok(FaultRecord {
        fault_id: row.get(0)?,
        fault_type: row.get(1)?,
        mean_error: row.get(2)?,
        max_error: row.get(3)?,
        affected_sensor: row.get(4)?,
        severity: row.get(5)?,
        detected_at: row.get(6)?,
        solution: row.get(7)?,
        remarks: row.get(8)?,
    })
}

impl FaultStore for Connection {
    fn scan(&self) -> Result<Vec<FaultRecord>, FaultError> {
        let mut stmt = self.prepare(&format!("{} ORDER BY fault_id ASC", SELECT_COLUMNS))?;
        let rows = stmt
            .query_map([], row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn scan_sensor(&self, sensor: &str) -> Result<Vec<FaultRecord>, FaultError> {
        let mut stmt = self.prepare(&format!(
            "{} WHERE affected_sensor = ?1 ORDER BY fault_id ASC",
            SELECT_COLUMNS
        ))?;
        let rows = stmt
            .query_map(params![sensor], row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn insert(&self, fault: &NewFault) -> Result<i64, FaultError> {
        self.execute(
            "INSERT INTO faults
             (fault_type, mean_error, max_error, affected_sensor, severity, detected_at, solution, remarks)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                fault.fault_type,
                fault.mean_error,
                fault.max_error,
                fault.affected_sensor,
                fault.severity,
                fault.detected_at,
                fault.solution,
                fault.remarks
            ],
        )?;
        Ok(self.last_insert_rowid())
    }
}

/// Most recent faults first.
pub fn list_recent(conn: &Connection, limit: usize) -> Result<Vec<FaultRecord>, FaultError> {
    let mut stmt = conn.prepare(&format!("{} ORDER BY fault_id DESC LIMIT ?1", SELECT_COLUMNS))?;
    let rows = stmt
        .query_map(params![i64::try_from(limit).unwrap_or(i64::MAX)], row_to_record)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
