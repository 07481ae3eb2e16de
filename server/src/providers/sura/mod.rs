mod parser;
mod selectors;

use crate::browser::{BrowserSession, Locator};
use crate::config::CompanyConfig;
use crate::downloads::{ClickDownloadStarter, DownloadStarter, ErrorProbe};
use crate::errors::PolicyError;
use crate::models::{Policy, PortalVehicle, ValidationData, Vehicle, OBS_NOT_AUTOMOBILE};
use crate::providers::base::{company_error, CompanyAdapter};
use crate::utils::mask_sensitive;
use async_trait::async_trait;
use selectors::SuraSelectors;
use std::time::Duration;

const NAME: &str = "SURA";
const DOWNLOAD_ERROR_TIMEOUT: Duration = Duration::from_secs(5);

/// SURA: searchable multi-endorsement grid, fleet grid with per-row state,
/// vehicle pages reached through the portal's own redirect script.
pub struct SuraAdapter {
    browser: BrowserSession,
    config: CompanyConfig,
}

impl SuraAdapter {
    pub fn new(browser: BrowserSession, config: CompanyConfig) -> Self {
        Self { browser, config }
    }

    async fn wait_overlay_invisibility(&self) -> Result<(), PolicyError> {
        self.browser
            .wait_for_invisibility(&Locator::css(SuraSelectors::OVERLAY), self.browser.default_timeout())
            .await
            .map_err(company_error(NAME, "El bloqueo de pantalla no desapareció"))?;
        Ok(())
    }

    fn starter(&self, link_xpath: &str) -> Box<dyn DownloadStarter> {
        Box::new(
            ClickDownloadStarter::new(self.browser.clone(), Locator::xpath(link_xpath)).with_error_probe(
                ErrorProbe::new(NAME, Locator::tag(SuraSelectors::DOWNLOAD_ERROR_TAG), DOWNLOAD_ERROR_TIMEOUT),
            ),
        )
    }
}

#[async_trait]
impl CompanyAdapter for SuraAdapter {
    fn name(&self) -> &str {
        NAME
    }

    async fn wait_login_page(&self) -> Result<(), PolicyError> {
        for id in [SuraSelectors::USERNAME_ID, SuraSelectors::PASSWORD_ID] {
            self.browser
                .wait_for_element(&Locator::id(id), None)
                .await
                .map_err(company_error(NAME, "La página de login no cargó"))?;
        }
        Ok(())
    }

    async fn do_login(&self) -> Result<(), PolicyError> {
        tracing::info!("👤 SURA usuario: {}", mask_sensitive(&self.config.username));
        let fail = || company_error(NAME, "Falló el ingreso de credenciales");

        self.browser
            .send_keys(&Locator::id(SuraSelectors::USERNAME_ID), &self.config.username)
            .await
            .map_err(fail())?;
        self.browser
            .send_keys(&Locator::id(SuraSelectors::PASSWORD_ID), &self.config.password)
            .await
            .map_err(fail())?;
        self.browser
            .click(&Locator::id(SuraSelectors::LOGIN_BUTTON_ID))
            .await
            .map_err(fail())?;
        Ok(())
    }

    async fn wait_login_confirmation(&self) -> Result<(), PolicyError> {
        self.browser
            .wait_for_element(&Locator::css(SuraSelectors::LOGIN_OK), None)
            .await
            .map_err(company_error(NAME, "Error Login SURA"))?;
        tracing::info!("✅ Login en SURA exitoso");
        Ok(())
    }

    async fn find_policy_input(&self) -> Result<Locator, PolicyError> {
        self.wait_overlay_invisibility().await?;
        let input = Locator::id(SuraSelectors::POLICY_INPUT_ID);
        self.browser
            .wait_for_element(&input, None)
            .await
            .map_err(company_error(NAME, "No se encontró el campo de póliza"))?;
        Ok(input)
    }

    async fn search_policy(&self) -> Result<(), PolicyError> {
        tracing::info!("🔎 Buscando póliza en SURA");
        self.browser
            .click(&Locator::id(SuraSelectors::SEARCH_BUTTON_ID))
            .await
            .map_err(company_error(NAME, "Falló la búsqueda de póliza"))?;
        self.wait_overlay_invisibility().await
    }

    async fn get_endorsements_count(&self) -> Result<usize, PolicyError> {
        Ok(self
            .browser
            .table_row_count(&Locator::css(SuraSelectors::ENDORSEMENT_ROWS))
            .await?)
    }

    /// Selects the endorsement row, checks it is an automobile policy and
    /// opens the fleet tab.
    async fn validate_policy(&self, policy: &Policy, line: usize) -> Result<ValidationData, PolicyError> {
        let fail = || company_error(NAME, "Falló la selección del endoso");

        let row = self
            .browser
            .wait_for_clickable(&SuraSelectors::endorsement_row(line), None)
            .await
            .map_err(fail())?;

        let branch_cell = self
            .browser
            .find_in(&row, &Locator::css(SuraSelectors::BRANCH_CELL))
            .await
            .map_err(fail())?;
        let branch = branch_cell
            .prop("textContent")
            .await
            .map_err(|e| fail()(e.into()))?
            .unwrap_or_default();
        if branch.trim() != parser::AUTOMOBILE_BRANCH {
            tracing::info!("📋 Póliza {} ramo {}: no es automóvil", policy.number, branch.trim());
            return Ok(ValidationData::invalid(OBS_NOT_AUTOMOBILE));
        }

        let id_cell = self
            .browser
            .find_in(&row, &Locator::css(SuraSelectors::ENDORSEMENT_ID_CELL))
            .await
            .map_err(fail())?;
        let endorsement_id = id_cell
            .prop("textContent")
            .await
            .map_err(|e| fail()(e.into()))?
            .unwrap_or_default()
            .trim()
            .to_string();

        self.browser.click_element(&row).await.map_err(fail())?;
        tracing::debug!("SURA endoso {} seleccionado, id_pv {}", line, endorsement_id);
        self.wait_overlay_invisibility().await?;

        self.browser
            .click(&Locator::css(SuraSelectors::ITEMS_TAB))
            .await
            .map_err(company_error(NAME, "No se pudo abrir la pestaña de ítems"))?;

        Ok(ValidationData::valid(Some(endorsement_id)))
    }

    async fn get_vehicles_data(&self) -> Result<Vec<PortalVehicle>, PolicyError> {
        let rows = Locator::css(SuraSelectors::FLEET_ROWS);
        self.browser
            .wait_for_element(&rows, None)
            .await
            .map_err(company_error(NAME, "No se encontraron vehículos en el endoso"))?;
        let count = self.browser.table_row_count(&rows).await?;
        if count == 0 {
            return Err(PolicyError::company(NAME, "No se encontraron vehículos en el endoso"));
        }
        tracing::info!("🚗 SURA {} vehículos en el endoso", count);

        let data = self
            .browser
            .extract_table_data(&Locator::id(SuraSelectors::FLEET_TABLE_ID), &parser::FLEET_COLUMNS)
            .await
            .map_err(company_error(NAME, "No se pudo leer la flota"))?;
        Ok(parser::vehicles_from_fleet_rows(&data))
    }

    async fn go_to_vehicle_download_page(
        &self,
        vehicle: &Vehicle,
        validation: &ValidationData,
    ) -> Result<(), PolicyError> {
        let endorsement_id = validation.endorsement_id.as_deref().unwrap_or_default();
        let vehicle_id = vehicle.portal_row_id.as_deref().unwrap_or_default();
        if !parser::is_numeric_id(endorsement_id) || !parser::is_numeric_id(vehicle_id) {
            return Err(PolicyError::company(
                NAME,
                format!(
                    "Identificadores inválidos para el vehículo {} (endoso '{}', ítem '{}')",
                    vehicle.license_plate, endorsement_id, vehicle_id
                ),
            ));
        }

        tracing::info!("🚗 SURA vehículo {} (ítem {})", vehicle.license_plate, vehicle_id);
        self.browser
            .execute(&SuraSelectors::vehicle_detail_script(endorsement_id, vehicle_id), vec![])
            .await
            .map_err(company_error(NAME, "No se pudo abrir el detalle del vehículo"))?;
        Ok(())
    }

    async fn prepare_next_vehicle_search(&self) -> Result<(), PolicyError> {
        self.browser.back().await?;
        if let Err(e) = self
            .browser
            .wait_for_clickable(&Locator::css(SuraSelectors::FLEET_EXPORT_BUTTON), None)
            .await
        {
            tracing::debug!("SURA botón de exportar flota no disponible: {}", e);
        }
        Ok(())
    }

    async fn soa_download_starter(&self, _policy: &Policy) -> Result<Box<dyn DownloadStarter>, PolicyError> {
        Ok(self.starter(SuraSelectors::SOA_LINK))
    }

    async fn mercosur_download_starter(&self, _policy: &Policy) -> Result<Box<dyn DownloadStarter>, PolicyError> {
        Ok(self.starter(SuraSelectors::MERCOSUR_LINK))
    }
}
