use super::{PortalVehicle, SkipReason, Vehicle, VehicleStatus};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub company: String,
    pub number: String,
    pub year: i32,
    pub expiration_date: NaiveDate,
    pub vehicles: Vec<Vehicle>,
    pub contains_cars: bool,
    pub soa_only: bool,
    pub cancelled: bool,
    pub downloaded: bool,
    pub obs: String,
    /// Portal vehicles that no spreadsheet vehicle claimed during the last pass.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unlisted_vehicles: Vec<PortalVehicle>,
}

impl Policy {
    pub fn new(
        company: impl Into<String>,
        number: impl Into<String>,
        expiration_date: NaiveDate,
        vehicles: Vec<Vehicle>,
    ) -> Self {
        Self {
            company: company.into(),
            number: number.into(),
            year: expiration_date.year(),
            expiration_date,
            vehicles,
            contains_cars: true,
            soa_only: false,
            cancelled: false,
            downloaded: false,
            obs: String::new(),
            unlisted_vehicles: Vec::new(),
        }
    }

    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expiration_date < today
    }

    /// `{root}/{company}/{number}/{year}[/{plate}]`
    pub fn vehicle_folder(&self, root: &Path, company: &str, license_plate: &str) -> PathBuf {
        let folder = root
            .join(company)
            .join(&self.number)
            .join(self.year.to_string());
        let plate = license_plate.trim();
        if plate.is_empty() {
            folder
        } else {
            folder.join(plate)
        }
    }

    /// Every vehicle has a terminal, explainable outcome for this endorsement
    /// search; older endorsements would not change anything.
    pub fn all_vehicles_settled(&self) -> bool {
        self.vehicles.iter().all(|v| match &v.status {
            Some(VehicleStatus::Ok) | Some(VehicleStatus::Skipped(_)) => true,
            _ => false,
        })
    }

    /// Applies the end-of-search rules: unassigned vehicles were never seen on
    /// the portal, a policy whose every vehicle is missing is cancelled, and the
    /// policy is downloaded when cancelled or when every vehicle is done.
    pub fn finalize(&mut self) {
        for vehicle in &mut self.vehicles {
            if vehicle.status.is_none() {
                vehicle.status = Some(VehicleStatus::Skipped(SkipReason::NotFoundOnWeb));
            }
        }

        self.cancelled = !self.vehicles.is_empty()
            && self
                .vehicles
                .iter()
                .all(|v| v.is_skipped_for(SkipReason::NotFoundOnWeb));

        self.downloaded = self.cancelled
            || (!self.vehicles.is_empty() && self.vehicles.iter().all(Vehicle::is_done));
    }

    pub fn vehicle_by_plate(&self, license_plate: &str) -> Option<&Vehicle> {
        self.vehicles
            .iter()
            .find(|v| v.license_plate.trim() == license_plate.trim())
    }
}

/// Outcome of checking one endorsement line on the portal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationData {
    pub valid: bool,
    /// Portal id needed later to reach vehicle pages (SURA `id_pv`).
    pub endorsement_id: Option<String>,
    pub observation: Option<String>,
}

impl ValidationData {
    pub fn valid(endorsement_id: Option<String>) -> Self {
        Self {
            valid: true,
            endorsement_id,
            observation: None,
        }
    }

    pub fn invalid(observation: impl Into<String>) -> Self {
        Self {
            valid: false,
            endorsement_id: None,
            observation: Some(observation.into()),
        }
    }
}
