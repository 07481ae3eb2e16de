use crate::browser::BrowserSession;
use crate::config::{CompanyConfig, Config};
use crate::http::{CompaniesResponse, CompanyInfo};
use crate::providers::base::CompanyAdapter;
use crate::providers::bse::BseAdapter;
use crate::providers::sancor::SancorAdapter;
use crate::providers::sura::SuraAdapter;
use std::sync::Arc;

/// Known companies and their configuration. Adapters are built per run
/// because each one is bound to its own browser session.
pub struct ProviderRegistry {
    companies: Vec<CompanyConfig>,
}

impl ProviderRegistry {
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            companies: config.companies.clone(),
        }
    }

    pub fn company(&self, name: &str) -> Option<&CompanyConfig> {
        self.companies.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn adapter_for(&self, name: &str, browser: BrowserSession) -> Option<Arc<dyn CompanyAdapter>> {
        let config = self.company(name)?.clone();
        let adapter: Arc<dyn CompanyAdapter> = match config.name.as_str() {
            "BSE" => Arc::new(BseAdapter::new(browser, config)),
            "SURA" => Arc::new(SuraAdapter::new(browser, config)),
            "SANCOR" => Arc::new(SancorAdapter::new(browser, config)),
            _ => return None,
        };
        Some(adapter)
    }

    pub fn get_companies_info(&self) -> CompaniesResponse {
        let companies: Vec<CompanyInfo> = self
            .companies
            .iter()
            .map(|c| CompanyInfo {
                name: c.name.clone(),
                active: c.has_credentials(),
                reason: (!c.has_credentials())
                    .then(|| "Credenciales o URL de login no configuradas".to_string()),
                session_minutes: c.session_minutes,
            })
            .collect();

        let active_count = companies.iter().filter(|c| c.active).count();

        CompaniesResponse {
            total: companies.len(),
            active_count,
            companies,
        }
    }
}
