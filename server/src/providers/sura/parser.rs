use crate::models::PortalVehicle;
use std::collections::HashMap;

pub const PLATE_COLUMN: &str = "Matrícula";
pub const STATE_COLUMN: &str = "Estado";
pub const NUMBER_COLUMN: &str = "Nro.";
pub const FLEET_COLUMNS: [&str; 3] = [PLATE_COLUMN, STATE_COLUMN, NUMBER_COLUMN];

/// Automobile branch code in the endorsement grid.
pub const AUTOMOBILE_BRANCH: &str = "11";

const EXCLUDED_STATE: &str = "Excluido";

pub fn vehicles_from_fleet_rows(rows: &[HashMap<String, String>]) -> Vec<PortalVehicle> {
    rows.iter()
        .map(|row| {
            let cell = |column: &str| row.get(column).map(|v| v.trim().to_string()).unwrap_or_default();
            let number = cell(NUMBER_COLUMN);
            PortalVehicle {
                plate: cell(PLATE_COLUMN),
                brand: None,
                model: None,
                row_id: Some(number).filter(|n| !n.is_empty()),
                excluded: cell(STATE_COLUMN).eq_ignore_ascii_case(EXCLUDED_STATE),
            }
        })
        .collect()
}

/// Ids are pasted into a script call, so only plain numbers are accepted.
pub fn is_numeric_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_digit())
}
