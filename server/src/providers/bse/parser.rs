use crate::models::PortalVehicle;
use std::collections::HashMap;

/// Builds the single policy vehicle from the details panel label/value pairs.
/// A missing plate becomes empty so reconciliation treats it as a placeholder.
pub fn vehicle_from_details(details: &HashMap<String, String>) -> PortalVehicle {
    let value = |key: &str| {
        details
            .get(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    PortalVehicle {
        plate: value("Matrícula").unwrap_or_default(),
        brand: value("Marca"),
        model: value("Modelo"),
        row_id: None,
        excluded: false,
    }
}

/// Row states that make the policy unusable.
pub fn blocking_status(status: &str) -> Option<&'static str> {
    match status.trim().to_uppercase().as_str() {
        "ANULADA" => Some(crate::models::OBS_VOIDED),
        "VENCIDA" => Some(crate::models::OBS_EXPIRED),
        _ => None,
    }
}
