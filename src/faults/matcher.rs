use crate::faults::store::{self, FaultStore};
use crate::faults::{
    is_duplicate, now_timestamp, FaultError, FaultRecord, FaultSignature, KnownFault, NewFault,
    Outcome, DEFAULT_REMARKS, DEFAULT_SOLUTION,
};
use crate::storage::Pool;
use rusqlite::TransactionBehavior;
use tracing::{debug, info};

/// First stored fault that is a near-duplicate of `signature`, in insertion order.
pub fn find_similar<S: FaultStore + ?Sized>(
    store: &S,
    signature: &FaultSignature,
) -> Result<Option<FaultRecord>, FaultError> {
    signature.validate()?;
    let candidates = store.scan_sensor(&signature.affected_sensor)?;
    Ok(candidates.into_iter().find(|r| is_duplicate(r, signature)))
}

/// Return the stored remediation for a known fault, or append a new record.
pub fn resolve_in<S: FaultStore + ?Sized>(
    store: &S,
    signature: &FaultSignature,
    solution_if_new: &str,
    remarks_if_new: &str,
    detected_at: &str,
) -> Result<Outcome, FaultError> {
    if let Some(existing) = find_similar(store, signature)? {
        debug!(
            fault_id = existing.fault_id,
            sensor = %signature.affected_sensor,
            "matched known fault"
        );
        return Ok(KnownFault::from(existing).into());
    }

    let fault = NewFault::from_signature(signature, solution_if_new, remarks_if_new, detected_at);
    let fault_id = store.insert(&fault)?;
    info!(
        fault_id,
        sensor = %signature.affected_sensor,
        fault_type = %signature.fault_type,
        mean_error = signature.mean_error,
        max_error = signature.max_error,
        "logged new fault"
    );
    Ok(Outcome::Logged { fault_id })
}

/// Text written into fresh records when the caller supplies none.
#[derive(Debug, Clone)]
pub struct FaultDefaults {
    pub solution: String,
    pub remarks: String,
}

impl Default for FaultDefaults {
    fn default() -> Self {
        Self {
            solution: DEFAULT_SOLUTION.to_string(),
            remarks: DEFAULT_REMARKS.to_string(),
        }
    }
}

/// Pool-backed matcher/logger. Each call checks out its own connection and returns it
/// on every exit path.
#[derive(Clone)]
pub struct FaultLogger {
    pool: Pool,
    defaults: FaultDefaults,
}

impl FaultLogger {
    pub fn new(pool: Pool) -> Self {
        Self::with_defaults(pool, FaultDefaults::default())
    }

    pub fn with_defaults(pool: Pool, defaults: FaultDefaults) -> Self {
        Self { pool, defaults }
    }

    pub fn defaults(&self) -> &FaultDefaults {
        &self.defaults
    }

    pub fn resolve_fault(&self, signature: &FaultSignature) -> Result<Outcome, FaultError> {
        let FaultDefaults { solution, remarks } = &self.defaults;
        self.resolve_fault_with(signature, solution, remarks)
    }

    /// Lookup and insert run in one immediate transaction, so two concurrent resolvers
    /// cannot both miss and both insert.
    pub fn resolve_fault_with(
        &self,
        signature: &FaultSignature,
        solution_if_new: &str,
        remarks_if_new: &str,
    ) -> Result<Outcome, FaultError> {
        signature.validate()?;

        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let outcome = resolve_in(
            &*tx,
            signature,
            solution_if_new,
            remarks_if_new,
            &now_timestamp(),
        )?;
        tx.commit()?;
        Ok(outcome)
    }

    /// Read-only lookup.
    pub fn find_similar(&self, signature: &FaultSignature) -> Result<Option<KnownFault>, FaultError> {
        signature.validate()?;
        let conn = self.pool.get()?;
        Ok(find_similar(&*conn, signature)?.map(KnownFault::from))
    }

    /// Insert unconditionally, with a supplied remediation. Used to seed known fixes.
    pub fn record_fault(
        &self,
        signature: &FaultSignature,
        solution: &str,
        remarks: &str,
    ) -> Result<i64, FaultError> {
        signature.validate()?;
        let conn = self.pool.get()?;
        let fault = NewFault::from_signature(signature, solution, remarks, &now_timestamp());
        let fault_id = conn.insert(&fault)?;
        info!(fault_id, sensor = %signature.affected_sensor, "recorded fault");
        Ok(fault_id)
    }

    pub fn list_recent(&self, limit: usize) -> Result<Vec<FaultRecord>, FaultError> {
        let conn = self.pool.get()?;
        store::list_recent(&conn, limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{open_memory_pool, schema};
    use rusqlite::Connection;

    fn signature(mean_error: f64, max_error: f64, sensor: &str) -> FaultSignature {
        FaultSignature {
            fault_type: "Pressure Drop".into(),
            mean_error,
            max_error,
            affected_sensor: sensor.into(),
            severity: "High".into(),
        }
    }

    fn count(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM faults", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_resolve_in_logs_then_knows() {
        let conn = Connection::open_in_memory().unwrap();
        schema::migrate(&conn).unwrap();
        let sig = signature(0.05, 0.12, "P7");

        let first = resolve_in(&conn, &sig, "Pending analysis", "auto", "2024-01-01 00:00:00")
            .unwrap();
        assert!(matches!(first, Outcome::Logged { .. }));

        let second = resolve_in(&conn, &sig, "ignored", "ignored", "2024-01-01 00:00:01")
            .unwrap();
        assert_eq!(
            second,
            Outcome::Known {
                fault_type: "Pressure Drop".into(),
                severity: "High".into(),
                solution: "Pending analysis".into(),
            }
        );
        assert_eq!(count(&conn), 1);
    }

    #[test]
    fn test_first_match_wins() {
        let conn = Connection::open_in_memory().unwrap();
        schema::migrate(&conn).unwrap();
        let first = NewFault::from_signature(&signature(0.050, 0.10, "P1"), "first", "", "t");
        let second = NewFault::from_signature(&signature(0.052, 0.10, "P1"), "second", "", "t");
        conn.insert(&first).unwrap();
        conn.insert(&second).unwrap();

        let found = find_similar(&conn, &signature(0.051, 0.10, "P1"))
            .unwrap()
            .unwrap();
        assert_eq!(found.solution, "first");
    }

    #[test]
    fn test_logger_uses_defaults() {
        let logger = FaultLogger::new(open_memory_pool().unwrap());
        let outcome = logger.resolve_fault(&signature(0.05, 0.12, "P7")).unwrap();
        let fault_id = match outcome {
            Outcome::Logged { fault_id } => fault_id,
            other => panic!("expected LOGGED, got {:?}", other),
        };

        let recent = logger.list_recent(10).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].fault_id, fault_id);
        assert_eq!(recent[0].solution, DEFAULT_SOLUTION);
        assert_eq!(recent[0].remarks, DEFAULT_REMARKS);
    }

    #[test]
    fn test_validation_error_writes_nothing() {
        let logger = FaultLogger::new(open_memory_pool().unwrap());
        let err = logger.resolve_fault(&signature(0.05, 0.12, "")).unwrap_err();
        assert!(matches!(err, FaultError::Validation(_)));
        assert!(logger.list_recent(10).unwrap().is_empty());

        // A failed call does not poison later ones
        assert!(logger.resolve_fault(&signature(0.05, 0.12, "P7")).is_ok());
    }

    #[test]
    fn test_failed_insert_rolls_back_and_reports_store_error() {
        let pool = open_memory_pool().unwrap();
        let logger = FaultLogger::new(pool.clone());
        logger.resolve_fault(&signature(0.30, 0.50, "P2")).unwrap();
        {
            let conn = pool.get().unwrap();
            conn.execute_batch(
                "CREATE TRIGGER faults_reject BEFORE INSERT ON faults
                 BEGIN SELECT RAISE(ABORT, 'store offline'); END;",
            )
            .unwrap();
        }

        let err = logger.resolve_fault(&signature(0.05, 0.12, "P7")).unwrap_err();
        assert!(matches!(err, FaultError::StoreUnavailable(_)));
        assert_eq!(count(&pool.get().unwrap()), 1);

        // Matches are still answered while inserts fail
        assert!(matches!(
            logger.resolve_fault(&signature(0.30, 0.50, "P2")),
            Ok(Outcome::Known { .. })
        ));

        pool.get()
            .unwrap()
            .execute_batch("DROP TRIGGER faults_reject;")
            .unwrap();
        assert!(matches!(
            logger.resolve_fault(&signature(0.05, 0.12, "P7")),
            Ok(Outcome::Logged { .. })
        ));
        assert_eq!(count(&pool.get().unwrap()), 2);
    }

    #[test]
    fn test_record_fault_stores_supplied_solution() {
        let logger = FaultLogger::new(open_memory_pool().unwrap());
        logger
            .record_fault(&signature(0.052, 0.13, "P12"), "Replace valve", "seeded")
            .unwrap();
        let known = logger
            .find_similar(&signature(0.055, 0.14, "P12"))
            .unwrap()
            .unwrap();
        assert_eq!(known.solution, "Replace valve");
        assert!(logger
            .find_similar(&signature(0.055, 0.14, "P99"))
            .unwrap()
            .is_none());
    }
}
