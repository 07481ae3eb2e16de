pub mod engine;
pub mod reconcile;

pub use engine::{BatchSummary, DownloadOrchestrator, OrchestratorSettings, SessionState};
pub use reconcile::{reconcile, trust_spreadsheet};
