use crate::config::Config;
use crate::db::PolicyStore;
use crate::providers::ProviderRegistry;
use crate::services::{DownloadRunner, RunRegistry};
use std::sync::Arc;
use std::time::SystemTime;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: Arc<ProviderRegistry>,
    pub runner: DownloadRunner,
    pub runs: RunRegistry,
    pub store: Arc<dyn PolicyStore>,
    pub start_time: SystemTime,
}
