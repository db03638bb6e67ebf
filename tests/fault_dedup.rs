//! End-to-end fault deduplication against an on-disk database.

use hydrovigil::detect::{Confidence, Decision, Scorer, SensorMatrix, Thresholds};
use hydrovigil::faults::{FaultLogger, FaultSignature, Outcome};
use hydrovigil::storage::open_pool;
use std::sync::Arc;

fn logger(dir: &tempfile::TempDir) -> FaultLogger {
    let path = dir.path().join("faults.db");
    FaultLogger::new(open_pool(path.to_str().unwrap()).unwrap())
}

fn signature(mean_error: f64, max_error: f64, sensor: &str) -> FaultSignature {
    FaultSignature {
        fault_type: "Pressure Drop".to_string(),
        mean_error,
        max_error,
        affected_sensor: sensor.to_string(),
        severity: "High".to_string(),
    }
}

#[test]
fn test_zero_window_scores_normal() {
    let scorer = Scorer::new(Thresholds::new(1.5, 3.0).unwrap());
    let m = SensorMatrix::new(vec![vec![0.0, 0.0, 0.0]]).unwrap();
    let result = scorer.score(&m);
    assert_eq!(result.final_decision, Decision::Normal);
    assert_eq!(result.risk_score, 0);
    assert_eq!(result.confidence, Confidence::Low);
}

#[test]
fn test_empty_store_logs_new_fault() {
    let dir = tempfile::tempdir().unwrap();
    let logger = logger(&dir);

    let outcome = logger.resolve_fault(&signature(0.05, 0.12, "P7")).unwrap();
    let Outcome::Logged { fault_id } = outcome else {
        panic!("expected LOGGED, got {:?}", outcome);
    };

    let stored = logger.list_recent(1).unwrap();
    assert_eq!(stored[0].fault_id, fault_id);
    assert_eq!(stored[0].solution, "Pending analysis");
}

#[test]
fn test_known_fault_returns_stored_solution() {
    let dir = tempfile::tempdir().unwrap();
    let logger = logger(&dir);
    logger
        .record_fault(&signature(0.052, 0.13, "P12"), "Replace valve", "Occurred during peak demand")
        .unwrap();

    let outcome = logger.resolve_fault(&signature(0.055, 0.14, "P12")).unwrap();
    assert_eq!(
        outcome,
        Outcome::Known {
            fault_type: "Pressure Drop".to_string(),
            severity: "High".to_string(),
            solution: "Replace valve".to_string(),
        }
    );
    assert_eq!(logger.list_recent(10).unwrap().len(), 1);
}

#[test]
fn test_sensor_mismatch_logs_new_fault() {
    let dir = tempfile::tempdir().unwrap();
    let logger = logger(&dir);
    logger
        .record_fault(&signature(0.052, 0.13, "P12"), "Replace valve", "")
        .unwrap();

    let outcome = logger.resolve_fault(&signature(0.055, 0.14, "P99")).unwrap();
    assert!(matches!(outcome, Outcome::Logged { .. }));
    assert_eq!(logger.list_recent(10).unwrap().len(), 2);
}

#[test]
fn test_repeated_known_lookups_write_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let logger = logger(&dir);
    logger
        .record_fault(&signature(0.052, 0.13, "P12"), "Replace valve", "")
        .unwrap();

    for _ in 0..3 {
        let outcome = logger.resolve_fault(&signature(0.055, 0.14, "P12")).unwrap();
        assert!(matches!(outcome, Outcome::Known { .. }));
    }
    assert_eq!(logger.list_recent(10).unwrap().len(), 1);
}

#[test]
fn test_faults_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    logger(&dir)
        .resolve_fault(&signature(0.05, 0.12, "P7"))
        .unwrap();

    let reopened = logger(&dir);
    let outcome = reopened.resolve_fault(&signature(0.05, 0.12, "P7")).unwrap();
    assert!(matches!(outcome, Outcome::Known { .. }));
}

#[test]
fn test_concurrent_resolvers_insert_once() {
    let dir = tempfile::tempdir().unwrap();
    let logger = Arc::new(logger(&dir));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let logger = Arc::clone(&logger);
            std::thread::spawn(move || logger.resolve_fault(&signature(0.05, 0.12, "P7")).unwrap())
        })
        .collect();

    let outcomes: Vec<Outcome> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let logged = outcomes
        .iter()
        .filter(|o| matches!(o, Outcome::Logged { .. }))
        .count();

    assert_eq!(logged, 1);
    assert_eq!(logger.list_recent(10).unwrap().len(), 1);
}
