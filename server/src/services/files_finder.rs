use crate::db::PolicyStore;
use crate::models::{Policy, Vehicle};
use chrono::NaiveDate;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "camelCase")]
pub enum FilesLookup {
    #[serde(rename_all = "camelCase")]
    Found {
        soa: PathBuf,
        mercosur: Option<PathBuf>,
    },
    Unavailable {
        message: String,
    },
}

impl FilesLookup {
    fn unavailable(message: impl Into<String>) -> Self {
        FilesLookup::Unavailable {
            message: message.into(),
        }
    }
}

fn with_reason(base: String, obs: &str) -> String {
    if obs.trim().is_empty() {
        format!("{}.", base)
    } else {
        format!("{}. Motivo: {}", base, obs.trim())
    }
}

fn file_paths(policy: &Policy, vehicle: &Vehicle) -> FilesLookup {
    match &vehicle.soa {
        Some(soa) => FilesLookup::Found {
            soa: soa.clone(),
            mercosur: vehicle.mercosur.clone(),
        },
        None => {
            let plate = vehicle.license_plate.trim();
            let plate_part = if plate.is_empty() {
                String::new()
            } else {
                format!(" matrícula {}", plate)
            };
            FilesLookup::unavailable(format!(
                "Problema inesperado al obtener el SOA de la póliza {} de {}{}. Consulte por asistencia técnica.",
                policy.number, policy.company, plate_part
            ))
        }
    }
}

/// Looks up the stored certificate paths for a policy (and plate), or the
/// reason they cannot be handed out.
pub async fn find_files(
    store: &dyn PolicyStore,
    company: &str,
    policy_number: &str,
    license_plate: Option<&str>,
    wants_mercosur: bool,
    today: NaiveDate,
) -> Result<FilesLookup, sqlx::Error> {
    let company = company.trim().to_uppercase();
    let Some(policy) = store.get_policy_with_cars(&company, policy_number).await? else {
        return Ok(FilesLookup::unavailable(format!(
            "Póliza {} inexistente en {}",
            policy_number, company
        )));
    };

    if !policy.downloaded {
        return Ok(FilesLookup::unavailable(with_reason(
            format!("Póliza {} de {}. No se pudo descargar los archivos", policy_number, company),
            &policy.obs,
        )));
    }

    if policy.is_expired(today) {
        return Ok(FilesLookup::unavailable(format!(
            "Póliza {} de {} está vencida",
            policy_number, company
        )));
    }

    if policy.cancelled {
        return Ok(FilesLookup::unavailable(with_reason(
            format!("Póliza {} fue cancelada o no figura en el sistema de {}", policy_number, company),
            &policy.obs,
        )));
    }

    if !policy.contains_cars {
        return Ok(FilesLookup::unavailable(format!(
            "Póliza {} de {} no corresponde a un automóvil",
            policy_number, company
        )));
    }

    if policy.soa_only && wants_mercosur {
        return Ok(FilesLookup::unavailable(format!(
            "Póliza {} de {} no tiene Certificado Mercosur",
            policy_number, company
        )));
    }

    let plate = license_plate.map(str::trim).filter(|p| !p.is_empty());
    if let Some(plate) = plate {
        return Ok(match policy.vehicle_by_plate(plate) {
            Some(vehicle) => file_paths(&policy, vehicle),
            None => FilesLookup::unavailable(format!(
                "Póliza {} de {} no contiene un vehículo con matrícula {}",
                policy_number, company, plate
            )),
        });
    }

    match policy.vehicles.as_slice() {
        [vehicle] => Ok(file_paths(&policy, vehicle)),
        [] => Ok(FilesLookup::unavailable(format!(
            "Póliza {} de {} no tiene vehículos registrados",
            policy_number, company
        ))),
        vehicles => {
            let plates: Vec<&str> = vehicles.iter().map(|v| v.license_plate.as_str()).collect();
            Ok(FilesLookup::unavailable(format!(
                "Póliza {} de {} contiene más de un vehículo ({}). Especificar la matrícula",
                policy_number,
                company,
                plates.join(", ")
            )))
        }
    }
}
