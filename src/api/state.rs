use crate::faults::FaultLogger;
use crate::pipeline::Analyzer;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub analyzer: Arc<Analyzer>,
    pub faults: FaultLogger,
    pub list_limit: usize,
}
