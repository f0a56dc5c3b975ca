//! Service layer - pure control-plane logic.

pub mod complexity;
pub mod concurrency;
pub mod gate;
pub mod retry;
pub mod scheduler;

pub use complexity::{complexity_weight, criticality_score, KEYWORD_TABLE_VERSION};
pub use concurrency::{AdmissionState, ResourcePlanner};
pub use gate::ConvergenceGate;
pub use scheduler::SchedulerState;
