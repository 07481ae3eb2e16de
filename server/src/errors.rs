use crate::browser::BrowserError;
use std::path::PathBuf;
use thiserror::Error;

/// Failures raised while driving an insurer portal.
///
/// `Company` aborts the current policy and is recorded as its observation.
/// `DownloadExhausted` and `FileUnavailable` are company-scoped too, but the
/// orchestrator treats them as a soft failure for the optional Mercosur card.
/// `FolderNotFound` and `Io` are environmental and escape vehicle-level handling.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("Error en compañía {company} debido a: {reason}.")]
    Company { company: String, reason: String },

    #[error("Máxima cantidad de intentos superada para descargar: {target}. Empresa: {company}")]
    DownloadExhausted { company: String, target: String },

    #[error("Archivo {target} no disponible para descargar en {company}")]
    FileUnavailable { company: String, target: String },

    #[error("Error del navegador: {0}")]
    Browser(#[from] BrowserError),

    #[error("Carpeta no encontrada: {}", .0.display())]
    FolderNotFound(PathBuf),

    #[error("Error de archivo: {0}")]
    Io(#[from] std::io::Error),
}

impl PolicyError {
    pub fn company(company: impl Into<String>, reason: impl Into<String>) -> Self {
        PolicyError::Company {
            company: company.into(),
            reason: reason.into(),
        }
    }

    /// Human readable reason stored in `obs` / vehicle status.
    pub fn reason(&self) -> String {
        match self {
            PolicyError::Company { reason, .. } => reason.clone(),
            other => other.to_string(),
        }
    }

    /// Conditions that mean "the optional file is not there" rather than a broken vehicle.
    pub fn is_soft_download_failure(&self) -> bool {
        matches!(
            self,
            PolicyError::DownloadExhausted { .. } | PolicyError::FileUnavailable { .. }
        )
    }

    /// Environmental failures that must abort the whole policy.
    pub fn is_fatal(&self) -> bool {
        matches!(self, PolicyError::FolderNotFound(_) | PolicyError::Io(_))
    }

    /// Wraps any error into a company-scoped one, keeping company errors as they are.
    pub fn scoped(self, company: &str, context: &str) -> Self {
        match self {
            e @ PolicyError::Company { .. } => e,
            other => PolicyError::company(company, format!("{}: {}", context, other)),
        }
    }
}
