use crate::models::{Policy, Vehicle};
use crate::utils::parse_portal_date;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleInput {
    #[serde(default)]
    pub license_plate: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub year: Option<i32>,
}

/// A policy row as delivered by the spreadsheet ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyInput {
    #[serde(default)]
    pub company: Option<String>,
    pub number: String,
    /// `dd/mm/yyyy`
    pub expiration_date: String,
    #[serde(default)]
    pub vehicles: Vec<VehicleInput>,
    #[serde(default = "default_true")]
    pub contains_cars: bool,
    #[serde(default)]
    pub soa_only: bool,
    #[serde(default)]
    pub cancelled: bool,
}

fn default_true() -> bool {
    true
}

impl PolicyInput {
    /// Builds the policy for `company`. A row naming another company is rejected.
    pub fn into_policy(self, company: &str) -> Result<Policy, String> {
        let number = self.number.trim().to_string();
        if number.is_empty() {
            return Err("número de póliza vacío".to_string());
        }
        if let Some(row_company) = self.company.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            if !row_company.eq_ignore_ascii_case(company.trim()) {
                return Err(format!(
                    "póliza {}: es de {} pero se pidió en el lote de {}",
                    number,
                    row_company,
                    company.trim().to_uppercase()
                ));
            }
        }
        let expiration_date = parse_portal_date(&self.expiration_date)
            .map_err(|e| format!("póliza {}: {}", number, e))?;

        let vehicles = self
            .vehicles
            .into_iter()
            .map(|v| Vehicle {
                year: v.year,
                ..Vehicle::new(v.license_plate.trim(), v.brand, v.model)
            })
            .collect();

        let mut policy = Policy::new(company.trim().to_uppercase(), number, expiration_date, vehicles);
        policy.contains_cars = self.contains_cars;
        policy.soa_only = self.soa_only;
        policy.cancelled = self.cancelled;
        Ok(policy)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyDownloadRequest {
    pub policies: Vec<PolicyInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadRequest {
    /// Company name → its policies.
    pub batches: HashMap<String, Vec<PolicyInput>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunAccepted {
    pub run_id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FilesQuery {
    #[serde(default)]
    pub plate: Option<String>,
    #[serde(default)]
    pub mercosur: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub ok: bool,
    pub version: String,
    pub uptime_seconds: u64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyInfo {
    pub name: String,
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub session_minutes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompaniesResponse {
    pub companies: Vec<CompanyInfo>,
    pub total: usize,
    pub active_count: usize,
}
