use fantoccini::error::{CmdError, ErrorStatus};
use thiserror::Error;

/// Transient failures of a single browser primitive.
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Elemento no encontrado: {0}")]
    ElementNotFound(String),

    #[error("Elemento no interactuable: {0}")]
    NotInteractable(String),

    #[error("Tiempo de espera agotado: {0}")]
    Timeout(String),

    #[error("Elemento obsoleto en el DOM")]
    StaleElement,

    #[error("Error de script: {0}")]
    Script(String),

    #[error("Error de WebDriver: {0}")]
    WebDriver(String),
}

impl BrowserError {
    /// Worth repeating the same primitive once the page settles.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            BrowserError::StaleElement | BrowserError::NotInteractable(_) | BrowserError::ElementNotFound(_)
        )
    }
}

impl From<CmdError> for BrowserError {
    fn from(err: CmdError) -> Self {
        if err.is_no_such_element() {
            return BrowserError::ElementNotFound(err.to_string());
        }

        match &err {
            CmdError::WaitTimeout => BrowserError::Timeout(err.to_string()),
            CmdError::Standard(wd) => match wd.error {
                ErrorStatus::StaleElementReference => BrowserError::StaleElement,
                ErrorStatus::ElementNotInteractable | ErrorStatus::ElementClickIntercepted => {
                    BrowserError::NotInteractable(err.to_string())
                }
                ErrorStatus::Timeout | ErrorStatus::ScriptTimeout => {
                    BrowserError::Timeout(err.to_string())
                }
                ErrorStatus::JavascriptError => BrowserError::Script(err.to_string()),
                _ => BrowserError::WebDriver(err.to_string()),
            },
            _ => BrowserError::WebDriver(err.to_string()),
        }
    }
}
