use crate::browser::Navigator;
use crate::db::PolicyStore;
use crate::downloads::{FileTransferWatcher, FixedName};
use crate::errors::PolicyError;
use crate::models::{
    Policy, ValidationData, VehicleStatus, MERCOSUR_FILENAME, OBS_EXPIRED, OBS_LOGIN_EXPIRED,
    OBS_NOT_AUTOMOBILE, SOA_FILENAME,
};
use crate::providers::CompanyAdapter;
use crate::services::pdf::is_valid_pdf;
use crate::utils::format_portal_date;
use chrono::{Local, NaiveDate};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub login_url: String,
    pub search_url: String,
    pub logout_url: Option<String>,
    pub session_lifetime: Duration,
    pub download_root: PathBuf,
    pub download_timeout: Duration,
    pub download_attempts: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    LoggedOut,
    LoggingIn,
    LoggedIn,
    ProcessingPolicy,
    LoggingOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PolicyOutcome {
    Downloaded,
    Partial,
    Failed,
    Skipped,
}

/// Per batch counters, reported by the runner and the HTTP API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub downloaded: usize,
    pub partial: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl BatchSummary {
    fn record(&mut self, outcome: PolicyOutcome) {
        match outcome {
            PolicyOutcome::Downloaded => self.downloaded += 1,
            PolicyOutcome::Partial => self.partial += 1,
            PolicyOutcome::Failed => self.failed += 1,
            PolicyOutcome::Skipped => self.skipped += 1,
        }
    }
}

/// Drives one company session through a batch of policies.
///
/// The session is strictly sequential: one policy, one endorsement and one
/// vehicle at a time. Login happens lazily on the first policy that needs
/// the portal and logout is always attempted when the batch ends.
pub struct DownloadOrchestrator {
    adapter: Arc<dyn CompanyAdapter>,
    navigator: Arc<dyn Navigator>,
    store: Arc<dyn PolicyStore>,
    watcher: FileTransferWatcher,
    settings: OrchestratorSettings,
    state: SessionState,
    logged_in_at: Option<Instant>,
}

impl DownloadOrchestrator {
    pub fn new(
        adapter: Arc<dyn CompanyAdapter>,
        navigator: Arc<dyn Navigator>,
        store: Arc<dyn PolicyStore>,
        watcher: FileTransferWatcher,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            adapter,
            navigator,
            store,
            watcher,
            settings,
            state: SessionState::LoggedOut,
            logged_in_at: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    fn company(&self) -> &str {
        self.adapter.name()
    }

    pub async fn login(&mut self) -> Result<(), PolicyError> {
        let company = self.company().to_string();
        tracing::info!("🔐 Iniciando sesión en {}", company);
        self.state = SessionState::LoggingIn;

        let result = async {
            self.navigator
                .navigate(&self.settings.login_url)
                .await
                .map_err(|e| PolicyError::company(&company, format!("No se pudo abrir el login: {}", e)))?;
            self.adapter.wait_login_page().await?;
            self.adapter.do_login().await?;
            self.adapter.wait_login_confirmation().await
        }
        .await;

        match result {
            Ok(()) => {
                self.state = SessionState::LoggedIn;
                self.logged_in_at = Some(Instant::now());
                Ok(())
            }
            Err(e) => {
                // A half-open session still gets a logout attempt
                self.state = SessionState::LoggedIn;
                Err(e.scoped(&company, "Login"))
            }
        }
    }

    pub async fn logout(&mut self) {
        if self.state == SessionState::LoggedOut {
            return;
        }
        self.state = SessionState::LoggingOut;

        let result = match &self.settings.logout_url {
            Some(url) => self.navigator.navigate(url).await.map_err(PolicyError::from),
            None => self.adapter.do_logout().await,
        };
        match result {
            Ok(()) => tracing::info!("👋 Sesión cerrada en {}", self.company()),
            Err(e) => tracing::error!("❌ Falló el logout de {}: {}", self.company(), e),
        }

        self.state = SessionState::LoggedOut;
        self.logged_in_at = None;
    }

    fn session_expired(&self) -> bool {
        self.logged_in_at
            .map(|at| at.elapsed() >= self.settings.session_lifetime)
            .unwrap_or(false)
    }

    /// Processes the batch in input order, persisting every policy after
    /// its attempt. Never fails: problems end up in each policy's `obs`.
    pub async fn process_policies(&mut self, policies: &mut [Policy]) -> BatchSummary {
        let mut summary = BatchSummary::default();
        let mut abort_reason: Option<String> = None;
        let today = Local::now().date_naive();

        tracing::info!("🚀 {}: procesando {} pólizas", self.company(), policies.len());

        for policy in policies.iter_mut() {
            let outcome = self.process_policy(policy, today, &mut abort_reason).await;
            summary.record(outcome);

            if let Err(e) = self.store.save_policy(policy).await {
                tracing::error!("❌ No se pudo guardar la póliza {}: {}", policy.number, e);
            }
        }

        self.logout().await;

        tracing::info!(
            "🏁 {}: {} descargadas, {} parciales, {} con error, {} omitidas",
            self.company(),
            summary.downloaded,
            summary.partial,
            summary.failed,
            summary.skipped
        );
        summary
    }

    async fn process_policy(
        &mut self,
        policy: &mut Policy,
        today: NaiveDate,
        abort_reason: &mut Option<String>,
    ) -> PolicyOutcome {
        policy.obs.clear();
        policy.unlisted_vehicles.clear();

        self.load_stored_state(policy).await;
        self.refresh_file_validity(policy);

        let expired = policy.is_expired(today);
        if policy.downloaded && !expired {
            tracing::info!("⏭️ Póliza {} ya descargada", policy.number);
            return PolicyOutcome::Skipped;
        }
        if policy.cancelled {
            tracing::info!("⏭️ Póliza {} cancelada", policy.number);
            policy.downloaded = true;
            return PolicyOutcome::Skipped;
        }
        if expired {
            tracing::info!(
                "📅 Póliza {} vencida el {}",
                policy.number,
                format_portal_date(policy.expiration_date)
            );
            policy.obs = OBS_EXPIRED.to_string();
            return PolicyOutcome::Skipped;
        }
        if !policy.contains_cars {
            tracing::info!("🚫 Póliza {} no es de automóvil", policy.number);
            policy.obs = OBS_NOT_AUTOMOBILE.to_string();
            return PolicyOutcome::Skipped;
        }

        if let Some(reason) = abort_reason.as_ref() {
            policy.obs = reason.clone();
            return PolicyOutcome::Failed;
        }

        if self.logged_in_at.is_none() {
            if let Err(e) = self.login().await {
                tracing::error!("❌ {}", e);
                let reason = e.reason();
                policy.obs = reason.clone();
                *abort_reason = Some(reason);
                return PolicyOutcome::Failed;
            }
        }

        if self.session_expired() {
            tracing::warn!("⌛ Sesión de {} expirada, se abandona el lote", self.company());
            policy.obs = OBS_LOGIN_EXPIRED.to_string();
            *abort_reason = Some(OBS_LOGIN_EXPIRED.to_string());
            return PolicyOutcome::Failed;
        }

        self.state = SessionState::ProcessingPolicy;
        let result = self.download_policy(policy).await;
        self.state = SessionState::LoggedIn;

        match result {
            Ok(()) if policy.downloaded => PolicyOutcome::Downloaded,
            Ok(()) => PolicyOutcome::Partial,
            Err(e) => {
                tracing::error!("❌ Póliza {}: {}", policy.number, e);
                policy.obs = e.reason();
                PolicyOutcome::Failed
            }
        }
    }

    /// A policy stored as cancelled stays cancelled while its expiration
    /// date is not newer than the stored one.
    async fn load_stored_state(&self, policy: &mut Policy) {
        match self.store.get_policy_with_cars(&policy.company, &policy.number).await {
            Ok(Some(stored)) if stored.cancelled && stored.expiration_date >= policy.expiration_date => {
                policy.cancelled = true;
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("⚠️ No se pudo leer la póliza {} guardada: {}", policy.number, e),
        }
    }

    /// Recomputes `files_are_valid` from disk and fills the paths of the
    /// vehicles whose files are already there.
    fn refresh_file_validity(&self, policy: &mut Policy) {
        let root = self.settings.download_root.as_path();
        let company = self.company();
        let folders: Vec<PathBuf> = policy
            .vehicles
            .iter()
            .map(|v| policy.vehicle_folder(root, company, &v.license_plate))
            .collect();
        let soa_only = policy.soa_only;

        for (vehicle, folder) in policy.vehicles.iter_mut().zip(folders) {
            let soa_valid = is_valid_pdf(&folder, SOA_FILENAME);
            let mercosur_valid = soa_only || is_valid_pdf(&folder, MERCOSUR_FILENAME);
            vehicle.files_are_valid = soa_valid && mercosur_valid;
            if vehicle.files_are_valid {
                vehicle.soa = Some(folder.join(SOA_FILENAME));
                if !soa_only {
                    vehicle.mercosur = Some(folder.join(MERCOSUR_FILENAME));
                }
            }
        }

        if !policy.vehicles.is_empty() && policy.vehicles.iter().all(|v| v.files_are_valid) {
            policy.downloaded = true;
        }
    }

    /// Searches the policy and walks its endorsements from the newest one
    /// until every vehicle is settled or the lines run out.
    pub async fn download_policy(&self, policy: &mut Policy) -> Result<(), PolicyError> {
        let company = self.company().to_string();
        self.search_for_policy(policy).await?;

        let count = self
            .adapter
            .get_endorsements_count()
            .await
            .map_err(|e| e.scoped(&company, "No se pudo contar los endosos"))?;
        tracing::info!(
            "📑 Póliza {}: {} endosos, {} vehículos",
            policy.number,
            count,
            policy.vehicles.len()
        );

        for line in 0..count {
            let validation = self
                .adapter
                .validate_policy(policy, line)
                .await
                .map_err(|e| e.scoped(&company, "Falló la validación de la póliza"))?;

            if validation.valid {
                tracing::info!("📥 Póliza {} endoso {}", policy.number, line);
                policy.obs.clear();
                self.download_policy_files(policy, &validation).await?;
            } else if let Some(observation) = validation.observation {
                policy.obs = observation;
            }

            if policy.all_vehicles_settled() {
                break;
            }
            if line + 1 < count {
                self.search_for_policy(policy).await?;
            }
        }

        policy.finalize();
        for vehicle in &policy.vehicles {
            if let Some(reason) = vehicle.status.as_ref().and_then(VehicleStatus::reason) {
                tracing::info!("🚗 Póliza {} vehículo {}: {}", policy.number, vehicle.license_plate, reason);
            }
        }
        Ok(())
    }

    async fn search_for_policy(&self, policy: &Policy) -> Result<(), PolicyError> {
        let company = self.company();
        let result = async {
            self.navigator.navigate(&self.settings.search_url).await?;
            let input = self.adapter.find_policy_input().await?;
            self.navigator.replace_text(&input, &policy.number).await?;
            self.adapter.search_policy().await
        }
        .await;
        result.map_err(|e| e.scoped(company, "Falló la búsqueda de la póliza"))
    }

    /// Reconciles the portal fleet and downloads every vehicle left pending.
    /// Vehicle failures are recorded on the vehicle; only environmental
    /// errors abort the policy.
    pub async fn download_policy_files(
        &self,
        policy: &mut Policy,
        validation: &ValidationData,
    ) -> Result<(), PolicyError> {
        let company = self.company().to_string();
        let portal = self
            .adapter
            .get_vehicles_data()
            .await
            .map_err(|e| e.scoped(&company, "No se pudo leer los vehículos"))?;

        let unlisted = self.adapter.reconcile_vehicles(&portal, &mut policy.vehicles);
        for vehicle in unlisted {
            tracing::warn!("❓ Vehículo {} en {} no figura en la planilla", vehicle.plate, company);
            if !policy.unlisted_vehicles.contains(&vehicle) {
                policy.unlisted_vehicles.push(vehicle);
            }
        }

        for index in 0..policy.vehicles.len() {
            if !policy.vehicles[index].is_pending() {
                continue;
            }
            match self.download_vehicle(policy, index, validation).await {
                Ok(()) => {}
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    let vehicle = &mut policy.vehicles[index];
                    tracing::error!("❌ Vehículo {}: {}", vehicle.license_plate, e);
                    vehicle.status = Some(VehicleStatus::Error(e.reason()));
                }
            }
        }
        Ok(())
    }

    async fn download_vehicle(
        &self,
        policy: &mut Policy,
        index: usize,
        validation: &ValidationData,
    ) -> Result<(), PolicyError> {
        self.adapter.prepare_vehicle_download().await?;
        let vehicle = policy.vehicles[index].clone();
        self.adapter.go_to_vehicle_download_page(&vehicle, validation).await?;

        let result = self.execute_download_starters(policy, index).await;

        if let Err(e) = self.adapter.prepare_next_vehicle_search().await {
            tracing::warn!("⚠️ No se pudo volver a la flota: {}", e);
        }
        result
    }

    /// SOA is mandatory; Mercosur is optional and its absence only warns.
    pub async fn execute_download_starters(&self, policy: &mut Policy, index: usize) -> Result<(), PolicyError> {
        let plate = policy.vehicles[index].license_plate.clone();
        let folder = policy.vehicle_folder(&self.settings.download_root, self.company(), &plate);

        let soa_starter = self.adapter.soa_download_starter(policy).await?;
        let soa = self
            .watcher
            .download_file_from_starter(
                soa_starter.as_ref(),
                &FixedName::new(&folder, SOA_FILENAME),
                self.settings.download_timeout,
                self.settings.download_attempts,
            )
            .await?;

        let mut mercosur = None;
        if !policy.soa_only {
            match self.download_mercosur(policy, &folder).await {
                Ok(path) => mercosur = Some(path),
                Err(e) if e.is_soft_download_failure() => {
                    tracing::warn!("⚠️ Vehículo {} sin certificado Mercosur: {}", plate, e);
                }
                Err(e) => return Err(e),
            }
        }

        let vehicle = &mut policy.vehicles[index];
        vehicle.soa = Some(soa);
        vehicle.mercosur = mercosur;
        vehicle.status = Some(VehicleStatus::Ok);
        tracing::info!("✅ Vehículo {} descargado", plate);
        Ok(())
    }

    async fn download_mercosur(&self, policy: &Policy, folder: &Path) -> Result<PathBuf, PolicyError> {
        let starter = self.adapter.mercosur_download_starter(policy).await?;
        self.watcher
            .download_file_from_starter(
                starter.as_ref(),
                &FixedName::new(folder, MERCOSUR_FILENAME),
                self.settings.download_timeout,
                self.settings.download_attempts,
            )
            .await
    }
}
