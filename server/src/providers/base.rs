use crate::browser::{BrowserError, Locator};
use crate::downloads::DownloadStarter;
use crate::errors::PolicyError;
use crate::models::{Policy, PortalVehicle, ValidationData, Vehicle};
use crate::orchestrator::reconcile::reconcile;
use async_trait::async_trait;

/// Insurer specific steps the orchestrator drives. Adapters read and
/// mutate only what they are handed and never persist anything.
#[async_trait]
pub trait CompanyAdapter: Send + Sync {
    /// Company code, also the folder name under the download root.
    fn name(&self) -> &str;

    /// Login form is loaded and ready for input.
    async fn wait_login_page(&self) -> Result<(), PolicyError>;

    async fn do_login(&self) -> Result<(), PolicyError>;

    /// Fails with the portal's own message when credentials were refused.
    async fn wait_login_confirmation(&self) -> Result<(), PolicyError>;

    /// Used only when the company has no logout URL.
    async fn do_logout(&self) -> Result<(), PolicyError> {
        tracing::warn!("⚠️ {} no tiene logout propio", self.name());
        Ok(())
    }

    /// Input where the policy number is typed, once it is ready.
    async fn find_policy_input(&self) -> Result<Locator, PolicyError>;

    async fn search_policy(&self) -> Result<(), PolicyError>;

    /// Endorsement lines for the searched policy, newest first.
    async fn get_endorsements_count(&self) -> Result<usize, PolicyError>;

    async fn validate_policy(&self, policy: &Policy, line: usize) -> Result<ValidationData, PolicyError>;

    /// Current portal view of the fleet. Plates may be placeholders.
    async fn get_vehicles_data(&self) -> Result<Vec<PortalVehicle>, PolicyError>;

    /// Assigns statuses to the policy vehicles. Returns unclaimed portal vehicles.
    fn reconcile_vehicles(&self, portal: &[PortalVehicle], vehicles: &mut [Vehicle]) -> Vec<PortalVehicle> {
        reconcile(portal, vehicles)
    }

    /// Page cleanup before each vehicle download.
    async fn prepare_vehicle_download(&self) -> Result<(), PolicyError> {
        Ok(())
    }

    async fn go_to_vehicle_download_page(
        &self,
        vehicle: &Vehicle,
        validation: &ValidationData,
    ) -> Result<(), PolicyError>;

    /// Restores the fleet view after a vehicle was handled.
    async fn prepare_next_vehicle_search(&self) -> Result<(), PolicyError> {
        Ok(())
    }

    async fn soa_download_starter(&self, policy: &Policy) -> Result<Box<dyn DownloadStarter>, PolicyError>;

    async fn mercosur_download_starter(&self, policy: &Policy) -> Result<Box<dyn DownloadStarter>, PolicyError>;
}

/// `map_err` helper turning a browser failure into a company-scoped error.
pub(crate) fn company_error(
    company: &'static str,
    context: &'static str,
) -> impl FnOnce(BrowserError) -> PolicyError {
    move |e| PolicyError::company(company, format!("{}: {}", context, e))
}
