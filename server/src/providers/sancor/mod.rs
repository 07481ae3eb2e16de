mod endorsement;
mod selectors;

pub use endorsement::{select_valid_row, HistoricalRow};

use crate::browser::{BrowserError, BrowserSession, Locator};
use crate::config::CompanyConfig;
use crate::downloads::{ClickDownloadStarter, DownloadStarter};
use crate::errors::PolicyError;
use crate::models::{Policy, PortalVehicle, ValidationData, Vehicle};
use crate::orchestrator::reconcile::trust_spreadsheet;
use crate::providers::base::{company_error, CompanyAdapter};
use crate::utils::{mask_sensitive, parse_portal_date};
use async_trait::async_trait;
use selectors::SancorSelectors;
use std::time::Duration;

const NAME: &str = "SANCOR";
const SEARCH_RESULT_TIMEOUT: Duration = Duration::from_secs(10);
const LOGIN_MESSAGE_TIMEOUT: Duration = Duration::from_secs(5);

/// SANCOR: Auth0 login, a single current policy view whose vehicle list
/// is not reliable, and a movement history to pick the policy in force.
pub struct SancorAdapter {
    browser: BrowserSession,
    config: CompanyConfig,
}

impl SancorAdapter {
    pub fn new(browser: BrowserSession, config: CompanyConfig) -> Self {
        Self { browser, config }
    }

    async fn click_first_result(&self) -> Result<(), BrowserError> {
        let rows = self
            .browser
            .wait_for_element(&Locator::class(SancorSelectors::RESULT_ROWS_CLASS), Some(SEARCH_RESULT_TIMEOUT))
            .await?;
        let label = self
            .browser
            .find_in(&rows, &Locator::class(SancorSelectors::RESULT_LABEL_CLASS))
            .await?;
        self.browser.click_element(&label).await
    }

    /// Reads the history table and the portal's own date, then clicks the
    /// row in force.
    async fn open_valid_row(&self) -> Result<(), PolicyError> {
        let fail = || company_error(NAME, "No se pudo leer el historial de la póliza");

        let table = self
            .browser
            .wait_for_element(&Locator::id(SancorSelectors::HISTORY_TABLE_ID), None)
            .await
            .map_err(fail())?;
        let rows = self
            .browser
            .find_all_in(&table, &Locator::tag("tr"))
            .await
            .map_err(fail())?;

        let movement_date = self
            .browser
            .wait_for_element(&Locator::id(SancorSelectors::MOVEMENT_DATE_ID), None)
            .await
            .map_err(fail())?
            .prop("value")
            .await
            .map_err(|e| fail()(e.into()))?
            .unwrap_or_default();
        let today = parse_portal_date(&movement_date)
            .map_err(|e| PolicyError::company(NAME, format!("Fecha de movimiento ilegible: {}", e)))?;

        let mut history = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut cells = Vec::new();
            for cell in self.browser.find_all_in(row, &Locator::tag("td")).await.unwrap_or_default() {
                cells.push(cell.text().await.unwrap_or_default());
            }
            history.push(HistoricalRow::from_cells(&cells));
        }

        let index = select_valid_row(&history, today).ok_or_else(|| {
            PolicyError::company(NAME, "No se encuentra una póliza vigente")
        })?;
        let row = &rows[index];
        tracing::info!(
            "📋 SANCOR póliza vigente: {} desde {}",
            history[index].movement_type,
            history[index].valid_from
        );
        self.browser.click_element(row).await.map_err(fail())?;
        Ok(())
    }

    fn starter(&self, id: &str) -> Box<dyn DownloadStarter> {
        Box::new(ClickDownloadStarter::new(self.browser.clone(), Locator::id(id)))
    }
}

#[async_trait]
impl CompanyAdapter for SancorAdapter {
    fn name(&self) -> &str {
        NAME
    }

    async fn wait_login_page(&self) -> Result<(), PolicyError> {
        for css in [SancorSelectors::USERNAME, SancorSelectors::PASSWORD] {
            self.browser
                .wait_for_element(&Locator::css(css), None)
                .await
                .map_err(company_error(NAME, "La página de login no cargó"))?;
        }
        Ok(())
    }

    async fn do_login(&self) -> Result<(), PolicyError> {
        tracing::info!("👤 SANCOR usuario: {}", mask_sensitive(&self.config.username));
        let fail = || company_error(NAME, "Falló el ingreso de credenciales");

        self.browser
            .send_keys(&Locator::css(SancorSelectors::USERNAME), &self.config.username)
            .await
            .map_err(fail())?;
        self.browser
            .send_keys(&Locator::css(SancorSelectors::PASSWORD), &self.config.password)
            .await
            .map_err(fail())?;
        self.browser
            .click(&Locator::class(SancorSelectors::LOGIN_BUTTON_CLASS))
            .await
            .map_err(fail())?;
        Ok(())
    }

    async fn wait_login_confirmation(&self) -> Result<(), PolicyError> {
        let err = match self
            .browser
            .wait_for_element(&Locator::xpath(SancorSelectors::LOGIN_OK), None)
            .await
        {
            Ok(_) => {
                tracing::info!("✅ Login en SANCOR exitoso");
                return Ok(());
            }
            Err(e) => e,
        };

        // Auth0 shows credential problems in an animated banner
        let mut message = err.to_string();
        if let Ok(banner) = self
            .browser
            .wait_for_element(&Locator::css(SancorSelectors::LOGIN_MESSAGE), Some(LOGIN_MESSAGE_TIMEOUT))
            .await
        {
            let text = banner.text().await.unwrap_or_default();
            let lower = text.to_lowercase();
            if lower.contains("usuario") || lower.contains("cuenta") {
                message = text;
            }
        }
        Err(PolicyError::company(NAME, format!("Error Login SANCOR: {}", message.trim())))
    }

    async fn find_policy_input(&self) -> Result<Locator, PolicyError> {
        let input = Locator::id(SancorSelectors::POLICY_INPUT_ID);
        self.browser
            .wait_for_element(&input, None)
            .await
            .map_err(company_error(NAME, "No se encontró el campo de póliza"))?;
        Ok(input)
    }

    async fn search_policy(&self) -> Result<(), PolicyError> {
        tracing::info!("🔎 Buscando póliza en SANCOR");
        self.browser
            .click(&Locator::id(SancorSelectors::SEARCH_BUTTON_ID))
            .await
            .map_err(company_error(NAME, "Falló la búsqueda de póliza"))?;

        if self.click_first_result().await.is_ok() {
            return Ok(());
        }

        let portal_message = match self
            .browser
            .find(&Locator::class(SancorSelectors::NO_RESULTS_CLASS))
            .await
        {
            Ok(element) => element.text().await.unwrap_or_default(),
            Err(_) => "No hay resultados".to_string(),
        };
        Err(PolicyError::company(
            NAME,
            format!(
                "SANCOR informa: {}. Revise que los datos sean correctos",
                portal_message.trim()
            ),
        ))
    }

    async fn get_endorsements_count(&self) -> Result<usize, PolicyError> {
        Ok(1)
    }

    async fn validate_policy(&self, _policy: &Policy, _line: usize) -> Result<ValidationData, PolicyError> {
        Ok(ValidationData::valid(None))
    }

    async fn get_vehicles_data(&self) -> Result<Vec<PortalVehicle>, PolicyError> {
        Ok(vec![PortalVehicle::default()])
    }

    fn reconcile_vehicles(&self, _portal: &[PortalVehicle], vehicles: &mut [Vehicle]) -> Vec<PortalVehicle> {
        trust_spreadsheet(vehicles);
        Vec::new()
    }

    async fn go_to_vehicle_download_page(
        &self,
        vehicle: &Vehicle,
        _validation: &ValidationData,
    ) -> Result<(), PolicyError> {
        tracing::info!("🚗 SANCOR vehículo {}", vehicle.license_plate);
        self.open_valid_row().await
    }

    async fn soa_download_starter(&self, _policy: &Policy) -> Result<Box<dyn DownloadStarter>, PolicyError> {
        Ok(self.starter(SancorSelectors::SOA_ID))
    }

    async fn mercosur_download_starter(&self, _policy: &Policy) -> Result<Box<dyn DownloadStarter>, PolicyError> {
        Ok(self.starter(SancorSelectors::MERCOSUR_ID))
    }
}
