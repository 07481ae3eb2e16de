use crate::models::{Policy, Vehicle};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PolicyRow {
    pub company: String,
    pub policy_number: String,
    pub year: i32,
    pub expiration_date: NaiveDate,
    pub downloaded: bool,
    pub cancelled: bool,
    pub contains_cars: bool,
    pub soa_only: bool,
    pub obs: String,
    pub timestamp: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CarRow {
    pub company: String,
    pub policy_number: String,
    pub license_plate: String,
    pub brand: String,
    pub model: String,
    pub year: Option<i32>,
    pub soa_file_path: Option<String>,
    pub mercosur_file_path: Option<String>,
    pub timestamp: NaiveDateTime,
}

impl CarRow {
    pub fn into_vehicle(self) -> Vehicle {
        Vehicle {
            license_plate: self.license_plate,
            brand: self.brand,
            model: self.model,
            year: self.year,
            soa: self.soa_file_path.filter(|p| !p.is_empty()).map(PathBuf::from),
            mercosur: self.mercosur_file_path.filter(|p| !p.is_empty()).map(PathBuf::from),
            ..Default::default()
        }
    }
}

impl PolicyRow {
    pub fn into_policy(self, cars: Vec<CarRow>) -> Policy {
        Policy {
            company: self.company,
            number: self.policy_number,
            year: self.year,
            expiration_date: self.expiration_date,
            vehicles: cars.into_iter().map(CarRow::into_vehicle).collect(),
            contains_cars: self.contains_cars,
            soa_only: self.soa_only,
            cancelled: self.cancelled,
            downloaded: self.downloaded,
            obs: self.obs,
            unlisted_vehicles: Vec::new(),
        }
    }
}
