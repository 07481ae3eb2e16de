use crate::browser::{BrowserSession, Locator};
use crate::errors::PolicyError;
use async_trait::async_trait;
use std::time::Duration;

/// Triggers one specific file download on the page the browser is showing.
#[async_trait]
pub trait DownloadStarter: Send + Sync {
    async fn start_download(&self) -> Result<(), PolicyError>;

    /// Fails when the portal answers with its "file not available" page
    /// instead of a download.
    async fn verify_download_in_progress(&self, _target: &str) -> Result<(), PolicyError> {
        Ok(())
    }
}

/// Element whose appearance right after starting means the portal refused the file.
#[derive(Debug, Clone)]
pub struct ErrorProbe {
    pub company: String,
    pub locator: Locator,
    pub timeout: Duration,
}

impl ErrorProbe {
    pub fn new(company: impl Into<String>, locator: Locator, timeout: Duration) -> Self {
        Self {
            company: company.into(),
            locator,
            timeout,
        }
    }

    async fn check(&self, browser: &BrowserSession, target: &str) -> Result<(), PolicyError> {
        if !browser.is_present(&self.locator, self.timeout).await {
            return Ok(());
        }
        let message = browser.text(&self.locator).await.unwrap_or_default();
        tracing::error!("❌ Error de descarga {}: {}", self.company, message);
        Err(PolicyError::FileUnavailable {
            company: self.company.clone(),
            target: target.to_string(),
        })
    }
}

pub struct ClickDownloadStarter {
    browser: BrowserSession,
    locator: Locator,
    error_probe: Option<ErrorProbe>,
}

impl ClickDownloadStarter {
    pub fn new(browser: BrowserSession, locator: Locator) -> Self {
        Self {
            browser,
            locator,
            error_probe: None,
        }
    }

    pub fn with_error_probe(mut self, probe: ErrorProbe) -> Self {
        self.error_probe = Some(probe);
        self
    }
}

#[async_trait]
impl DownloadStarter for ClickDownloadStarter {
    async fn start_download(&self) -> Result<(), PolicyError> {
        tracing::debug!("⬇️ Click de descarga en {}", self.locator);
        self.browser.click(&self.locator).await?;
        Ok(())
    }

    async fn verify_download_in_progress(&self, target: &str) -> Result<(), PolicyError> {
        match &self.error_probe {
            Some(probe) => probe.check(&self.browser, target).await,
            None => Ok(()),
        }
    }
}

pub struct ScriptDownloadStarter {
    browser: BrowserSession,
    script: String,
    error_probe: Option<ErrorProbe>,
}

impl ScriptDownloadStarter {
    pub fn new(browser: BrowserSession, script: impl Into<String>) -> Self {
        Self {
            browser,
            script: script.into(),
            error_probe: None,
        }
    }

    pub fn with_error_probe(mut self, probe: ErrorProbe) -> Self {
        self.error_probe = Some(probe);
        self
    }
}

#[async_trait]
impl DownloadStarter for ScriptDownloadStarter {
    async fn start_download(&self) -> Result<(), PolicyError> {
        tracing::debug!("⬇️ Script de descarga: {}", self.script);
        self.browser.execute(&self.script, vec![]).await?;
        Ok(())
    }

    async fn verify_download_in_progress(&self, target: &str) -> Result<(), PolicyError> {
        match &self.error_probe {
            Some(probe) => probe.check(&self.browser, target).await,
            None => Ok(()),
        }
    }
}
