use crate::browser::{create_webdriver_client, BrowserSession, Navigator};
use crate::config::{CompanyConfig, Config};
use crate::db::PolicyStore;
use crate::downloads::{FileTransferWatcher, WatcherTiming};
use crate::models::Policy;
use crate::orchestrator::{BatchSummary, DownloadOrchestrator, OrchestratorSettings};
use crate::providers::ProviderRegistry;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinSet;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("Compañía desconocida: {0}")]
    UnknownCompany(String),

    #[error("Compañía {0} sin credenciales configuradas")]
    InactiveCompany(String),

    #[error("No se pudo iniciar el navegador: {0}")]
    WebDriver(String),

    #[error("Error de archivo: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub company: String,
    pub summary: BatchSummary,
    pub policies: Vec<Policy>,
}

/// Runs batches of policies, one browser session per company.
///
/// A company's temp download directory belongs to one session at a time,
/// so overlapping runs for the same company wait for each other.
#[derive(Clone)]
pub struct DownloadRunner {
    config: Arc<Config>,
    registry: Arc<ProviderRegistry>,
    store: Arc<dyn PolicyStore>,
    sessions: Arc<HashMap<String, Arc<Mutex<()>>>>,
}

impl DownloadRunner {
    pub fn new(config: Arc<Config>, registry: Arc<ProviderRegistry>, store: Arc<dyn PolicyStore>) -> Self {
        let sessions = config
            .companies
            .iter()
            .map(|c| (c.name.to_uppercase(), Arc::new(Mutex::new(()))))
            .collect();
        Self {
            config,
            registry,
            store,
            sessions: Arc::new(sessions),
        }
    }

    /// Lock guarding the company's browser session and temp directory.
    pub fn session_lock(&self, company: &str) -> Option<Arc<Mutex<()>>> {
        self.sessions.get(&company.trim().to_uppercase()).cloned()
    }

    fn active_company(&self, company: &str) -> Result<CompanyConfig, RunnerError> {
        let company_config = self
            .registry
            .company(company)
            .ok_or_else(|| RunnerError::UnknownCompany(company.to_string()))?;
        if !company_config.has_credentials() {
            return Err(RunnerError::InactiveCompany(company_config.name.clone()));
        }
        Ok(company_config.clone())
    }

    fn settings_for(&self, company: &CompanyConfig) -> OrchestratorSettings {
        OrchestratorSettings {
            login_url: company.login_url.clone(),
            search_url: company.search_url.clone(),
            logout_url: company.logout_url.clone(),
            session_lifetime: company.session_lifetime(),
            download_root: self.config.download_folder.clone(),
            download_timeout: self.config.download_timeout(),
            download_attempts: self.config.download_attempts,
        }
    }

    /// Opens a session for `company`, processes the batch and closes the
    /// browser whatever happened inside.
    pub async fn run_company(&self, company: &str, mut policies: Vec<Policy>) -> Result<BatchReport, RunnerError> {
        let company_config = self.active_company(company)?;
        let name = company_config.name.clone();

        let lock = self
            .session_lock(&name)
            .ok_or_else(|| RunnerError::UnknownCompany(name.clone()))?;
        let _session = match lock.clone().try_lock_owned() {
            Ok(guard) => guard,
            Err(_) => {
                tracing::info!("⏳ {} ya tiene una corrida en curso, esperando turno", name);
                lock.lock_owned().await
            }
        };

        let tmp_dir = self.config.company_tmp_folder(&name);
        tokio::fs::create_dir_all(&tmp_dir).await?;
        tokio::fs::create_dir_all(&self.config.download_folder).await?;

        for policy in policies.iter_mut() {
            policy.company = name.clone();
        }

        tracing::info!("🌐 Abriendo navegador para {} ({} pólizas)", name, policies.len());
        let client = create_webdriver_client(&self.config, &tmp_dir)
            .await
            .map_err(|e| RunnerError::WebDriver(e.to_string()))?;
        let browser = BrowserSession::new(client, self.config.element_timeout());

        let Some(adapter) = self.registry.adapter_for(&name, browser.clone()) else {
            if let Err(e) = browser.close().await {
                tracing::warn!("⚠️ No se pudo cerrar el navegador: {}", e);
            }
            return Err(RunnerError::UnknownCompany(name));
        };

        let navigator: Arc<dyn Navigator> = Arc::new(browser.clone());
        let watcher = FileTransferWatcher::new(&name, tmp_dir, WatcherTiming::from_config(&self.config));
        let mut orchestrator = DownloadOrchestrator::new(
            adapter,
            navigator,
            self.store.clone(),
            watcher,
            self.settings_for(&company_config),
        );

        let summary = orchestrator.process_policies(&mut policies).await;
        drop(orchestrator);

        if let Err(e) = browser.close().await {
            tracing::warn!("⚠️ No se pudo cerrar el navegador de {}: {}", name, e);
        }

        Ok(BatchReport {
            company: name,
            summary,
            policies,
        })
    }

    /// Runs every company's batch concurrently. Each company has its own
    /// session and temp directory, so nothing is shared between tasks.
    pub async fn run_all(
        &self,
        batches: HashMap<String, Vec<Policy>>,
    ) -> Vec<(String, Result<BatchReport, RunnerError>)> {
        tracing::info!("🚀 Lanzando descargas para {} compañías", batches.len());

        let mut join_set = JoinSet::new();
        for (company, policies) in batches {
            let runner = self.clone();
            join_set.spawn(async move {
                let result = runner.run_company(&company, policies).await;
                if let Err(e) = &result {
                    tracing::error!("❌ {} - {}", company, e);
                }
                (company, result)
            });
        }

        let mut results = Vec::new();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(e) => tracing::error!("❌ Falló la tarea de descarga: {}", e),
            }
        }

        let failed = results.iter().filter(|(_, r)| r.is_err()).count();
        tracing::info!("📊 Resultado: {} compañías ok, {} con error", results.len() - failed, failed);
        results
    }
}
