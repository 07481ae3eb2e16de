use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Plates the portals show when the real plate is unknown.
pub const PLACEHOLDER_PLATES: [&str; 3] = ["NOFIGURA", "0KM", ""];

pub fn is_placeholder_plate(plate: &str) -> bool {
    let plate = plate.trim().to_uppercase();
    PLACEHOLDER_PLATES.contains(&plate.as_str())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NotFoundOnWeb,
    ExcludedFromFleet,
    AlreadyDownloaded,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SkipReason::NotFoundOnWeb => "No en la web",
            SkipReason::ExcludedFromFleet => "Excluido de la flota",
            SkipReason::AlreadyDownloaded => "Descarga ya realizada",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason")]
pub enum VehicleStatus {
    Pending,
    Ok,
    Skipped(SkipReason),
    Error(String),
}

impl VehicleStatus {
    pub fn reason(&self) -> Option<String> {
        match self {
            VehicleStatus::Skipped(reason) => Some(reason.to_string()),
            VehicleStatus::Error(reason) => Some(reason.clone()),
            _ => None,
        }
    }
}

/// One vehicle of a policy as known from the spreadsheet, plus the
/// transient state of the current processing pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub license_plate: String,
    pub brand: String,
    pub model: String,
    pub year: Option<i32>,
    pub soa: Option<PathBuf>,
    pub mercosur: Option<PathBuf>,
    #[serde(skip)]
    pub files_are_valid: bool,
    pub status: Option<VehicleStatus>,
    #[serde(skip)]
    pub portal_row_id: Option<String>,
}

impl Vehicle {
    pub fn new(license_plate: impl Into<String>, brand: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            license_plate: license_plate.into(),
            brand: brand.into(),
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == Some(VehicleStatus::Ok)
    }

    pub fn is_pending(&self) -> bool {
        self.status == Some(VehicleStatus::Pending)
    }

    pub fn is_skipped_for(&self, reason: SkipReason) -> bool {
        self.status == Some(VehicleStatus::Skipped(reason))
    }

    /// Ok, or its files were already on disk from a previous run.
    pub fn is_done(&self) -> bool {
        self.is_ok() || self.is_skipped_for(SkipReason::AlreadyDownloaded)
    }
}

/// A vehicle row as the insurer portal currently shows it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortalVehicle {
    pub plate: String,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub row_id: Option<String>,
    pub excluded: bool,
}

impl PortalVehicle {
    pub fn with_plate(plate: impl Into<String>) -> Self {
        Self {
            plate: plate.into(),
            ..Default::default()
        }
    }
}
