mod parser;
mod selectors;

use crate::browser::{BrowserSession, Locator};
use crate::config::CompanyConfig;
use crate::downloads::{ClickDownloadStarter, DownloadStarter, ErrorProbe};
use crate::errors::PolicyError;
use crate::models::{Policy, PortalVehicle, ValidationData, Vehicle};
use crate::providers::base::{company_error, CompanyAdapter};
use crate::utils::mask_sensitive;
use async_trait::async_trait;
use selectors::BseSelectors;
use std::collections::HashMap;
use std::time::Duration;

const NAME: &str = "BSE";
const DOWNLOAD_ERROR_TIMEOUT: Duration = Duration::from_secs(5);
const LOGIN_MESSAGE_TIMEOUT: Duration = Duration::from_secs(5);
const CHECKBOX_REFRESH_TIMEOUT: Duration = Duration::from_secs(5);

/// BSE: one always-current endorsement, a details panel with the vehicle
/// data and a print panel with certificate checkboxes.
pub struct BseAdapter {
    browser: BrowserSession,
    config: CompanyConfig,
}

impl BseAdapter {
    pub fn new(browser: BrowserSession, config: CompanyConfig) -> Self {
        Self { browser, config }
    }

    async fn policy_status(&self) -> Result<String, PolicyError> {
        let row = self
            .browser
            .wait_for_element(&Locator::css(BseSelectors::POLICY_ROW), None)
            .await
            .map_err(company_error(NAME, "No se pudo leer el estado de la póliza"))?;
        let cell = self
            .browser
            .find_in(&row, &Locator::xpath(BseSelectors::POLICY_ROW_STATUS))
            .await
            .map_err(company_error(NAME, "No se pudo leer el estado de la póliza"))?;
        let status = cell.text().await.map_err(crate::browser::BrowserError::from)?;
        tracing::debug!("BSE estado de póliza: {}", status.trim());
        Ok(status.trim().to_string())
    }

    /// Leaves only the certificate at `index` selected.
    async fn select_certificate(&self, index: usize) -> Result<(), PolicyError> {
        let mut states: Vec<(Locator, bool)> = (0..BseSelectors::CERTIFICATE_COUNT)
            .filter(|i| *i != index)
            .map(|i| (BseSelectors::certificate_checkbox(i), false))
            .collect();
        states.push((BseSelectors::certificate_checkbox(index), true));
        self.browser
            .set_checkboxes_in_order(&states, CHECKBOX_REFRESH_TIMEOUT)
            .await
            .map_err(company_error(NAME, "No se pudo seleccionar el certificado"))?;
        Ok(())
    }

    fn download_starter(&self) -> Box<dyn DownloadStarter> {
        Box::new(
            ClickDownloadStarter::new(self.browser.clone(), BseSelectors::download_button()).with_error_probe(
                ErrorProbe::new(NAME, Locator::tag(BseSelectors::DOWNLOAD_ERROR_TAG), DOWNLOAD_ERROR_TIMEOUT),
            ),
        )
    }
}

#[async_trait]
impl CompanyAdapter for BseAdapter {
    fn name(&self) -> &str {
        NAME
    }

    async fn wait_login_page(&self) -> Result<(), PolicyError> {
        for id in [BseSelectors::USERNAME_ID, BseSelectors::PASSWORD_ID] {
            self.browser
                .wait_for_element(&Locator::id(id), None)
                .await
                .map_err(company_error(NAME, "La página de login no cargó"))?;
        }
        Ok(())
    }

    async fn do_login(&self) -> Result<(), PolicyError> {
        tracing::info!("👤 BSE usuario: {}", mask_sensitive(&self.config.username));
        let fail = || company_error(NAME, "Falló el ingreso de credenciales");

        self.browser
            .send_keys(&Locator::id(BseSelectors::USERNAME_ID), &self.config.username)
            .await
            .map_err(fail())?;
        self.browser
            .send_keys(&Locator::id(BseSelectors::PASSWORD_ID), &self.config.password)
            .await
            .map_err(fail())?;
        self.browser
            .click(&Locator::id(BseSelectors::LOGIN_BUTTON_ID))
            .await
            .map_err(fail())?;
        Ok(())
    }

    async fn wait_login_confirmation(&self) -> Result<(), PolicyError> {
        if self
            .browser
            .wait_for_element(&Locator::class(BseSelectors::LOGIN_OK_CLASS), None)
            .await
            .is_ok()
        {
            tracing::info!("✅ Login en BSE exitoso");
            return Ok(());
        }

        let message_locator = Locator::class(BseSelectors::LOGIN_MESSAGE_CLASS);
        let message = match self
            .browser
            .wait_for_element(&message_locator, Some(LOGIN_MESSAGE_TIMEOUT))
            .await
        {
            Ok(element) => element.text().await.unwrap_or_default(),
            Err(e) => e.to_string(),
        };
        Err(PolicyError::company(NAME, format!("Error Login BSE: {}", message.trim())))
    }

    async fn find_policy_input(&self) -> Result<Locator, PolicyError> {
        self.browser
            .wait_for_clickable(&BseSelectors::search_button(), None)
            .await
            .map_err(company_error(NAME, "No apareció el botón Buscar"))?;
        let input = BseSelectors::policy_number_input();
        self.browser
            .wait_for_element(&input, None)
            .await
            .map_err(company_error(NAME, "No se encontró el campo de póliza"))?;
        Ok(input)
    }

    async fn search_policy(&self) -> Result<(), PolicyError> {
        tracing::info!("🔎 Buscando póliza en BSE");
        let search = BseSelectors::search_button();
        self.browser
            .click(&search)
            .await
            .map_err(company_error(NAME, "Falló la búsqueda de póliza"))?;
        self.browser
            .wait_for_clickable(&search, None)
            .await
            .map_err(company_error(NAME, "Falló la búsqueda de póliza"))?;
        Ok(())
    }

    async fn get_endorsements_count(&self) -> Result<usize, PolicyError> {
        Ok(1)
    }

    async fn validate_policy(&self, policy: &Policy, _line: usize) -> Result<ValidationData, PolicyError> {
        let status = self.policy_status().await?;
        if let Some(observation) = parser::blocking_status(&status) {
            tracing::info!("📋 Póliza {} en estado {}", policy.number, status);
            return Ok(ValidationData::invalid(observation));
        }

        self.browser
            .click(&BseSelectors::expand_details())
            .await
            .map_err(company_error(NAME, "No se pudo abrir el detalle de la póliza"))?;
        Ok(ValidationData::valid(None))
    }

    async fn get_vehicles_data(&self) -> Result<Vec<PortalVehicle>, PolicyError> {
        let column = self
            .browser
            .wait_for_element(&Locator::css(BseSelectors::DETAILS_COLUMN), None)
            .await
            .map_err(company_error(NAME, "No se encontró el detalle del vehículo"))?;

        let mut details = HashMap::new();
        for item in self
            .browser
            .find_all_in(&column, &Locator::css(BseSelectors::DETAILS_ITEM))
            .await?
        {
            // Items without a label/value pair are layout wrappers
            let label = match self.browser.find_in(&item, &Locator::css(BseSelectors::DETAILS_LABEL)).await {
                Ok(label) => label.text().await.unwrap_or_default(),
                Err(_) => continue,
            };
            let value = match self.browser.find_in(&item, &Locator::css(BseSelectors::DETAILS_VALUE)).await {
                Ok(value) => value.text().await.unwrap_or_default(),
                Err(_) => continue,
            };
            details.insert(label.trim().to_string(), value.trim().to_string());
        }

        Ok(vec![parser::vehicle_from_details(&details)])
    }

    /// Unchecks the extra documents offered next to the certificates.
    async fn prepare_vehicle_download(&self) -> Result<(), PolicyError> {
        let states: Vec<(Locator, bool)> = BseSelectors::other_doc_checkboxes()
            .into_iter()
            .map(|locator| (locator, false))
            .collect();
        self.browser
            .set_checkboxes_in_order(&states, CHECKBOX_REFRESH_TIMEOUT)
            .await?;
        Ok(())
    }

    async fn go_to_vehicle_download_page(
        &self,
        vehicle: &Vehicle,
        _validation: &ValidationData,
    ) -> Result<(), PolicyError> {
        tracing::info!("🚗 BSE procesando vehículo {}", vehicle.license_plate);
        self.browser
            .wait_for_element(&BseSelectors::download_button(), None)
            .await
            .map_err(company_error(NAME, "No apareció el panel de impresión"))?;
        Ok(())
    }

    async fn soa_download_starter(&self, _policy: &Policy) -> Result<Box<dyn DownloadStarter>, PolicyError> {
        self.select_certificate(0).await?;
        Ok(self.download_starter())
    }

    async fn mercosur_download_starter(&self, _policy: &Policy) -> Result<Box<dyn DownloadStarter>, PolicyError> {
        self.select_certificate(1).await?;
        Ok(self.download_starter())
    }
}
