use crate::models::{is_placeholder_plate, PortalVehicle, SkipReason, Vehicle, VehicleStatus};

/// Matches the spreadsheet vehicles against what the portal shows and
/// assigns each one a status. Returns the portal vehicles nobody claimed.
///
/// Vehicles already done in an earlier endorsement keep their status but
/// still claim their portal row. A vehicle that failed or was excluded on a
/// newer endorsement keeps that status when an older one does not list it.
pub fn reconcile(portal: &[PortalVehicle], vehicles: &mut [Vehicle]) -> Vec<PortalVehicle> {
    let mut portal: Vec<PortalVehicle> = portal.to_vec();

    if portal.len() == 1 && vehicles.len() == 1 {
        adopt_single_vehicle_plate(&mut portal[0], &mut vehicles[0]);
    }

    let mut claimed = vec![false; portal.len()];

    for vehicle in vehicles.iter_mut() {
        let plate = vehicle.license_plate.trim().to_string();
        vehicle.license_plate = plate.clone();

        let found = (0..portal.len()).find(|&i| !claimed[i] && portal[i].plate.trim() == plate);

        if vehicle.is_done() {
            if let Some(index) = found {
                claimed[index] = true;
            }
            continue;
        }

        let Some(index) = found else {
            // Only a vehicle no endorsement has shown yet is missing from the web
            if matches!(vehicle.status, None | Some(VehicleStatus::Pending)) {
                vehicle.status = Some(VehicleStatus::Skipped(SkipReason::NotFoundOnWeb));
            }
            continue;
        };
        claimed[index] = true;
        let page_vehicle = &portal[index];

        vehicle.status = Some(if page_vehicle.excluded {
            tracing::warn!("🚫 Vehículo {} excluido de la flota", plate);
            VehicleStatus::Skipped(SkipReason::ExcludedFromFleet)
        } else if vehicle.files_are_valid {
            tracing::warn!("⏭️ Vehículo {} ya descargado", plate);
            VehicleStatus::Skipped(SkipReason::AlreadyDownloaded)
        } else {
            vehicle.portal_row_id = page_vehicle.row_id.clone();
            VehicleStatus::Pending
        });
    }

    portal
        .into_iter()
        .zip(claimed)
        .filter(|(_, was_claimed)| !was_claimed)
        .map(|(p, _)| p)
        .collect()
}

/// Variant for portals whose vehicle listing cannot be trusted: every
/// spreadsheet vehicle is assumed present.
pub fn trust_spreadsheet(vehicles: &mut [Vehicle]) {
    for vehicle in vehicles.iter_mut() {
        vehicle.license_plate = vehicle.license_plate.trim().to_string();
        if vehicle.is_done() {
            continue;
        }
        vehicle.status = Some(if vehicle.files_are_valid {
            VehicleStatus::Skipped(SkipReason::AlreadyDownloaded)
        } else {
            VehicleStatus::Pending
        });
    }
}

/// One vehicle on each side: same car whatever the plates say.
fn adopt_single_vehicle_plate(page: &mut PortalVehicle, vehicle: &mut Vehicle) {
    let sheet_plate = vehicle.license_plate.trim();
    if is_placeholder_plate(&page.plate) && !sheet_plate.is_empty() {
        page.plate = sheet_plate.to_string();
    } else if sheet_plate.is_empty() {
        vehicle.license_plate = page.plate.trim().to_string();
    } else {
        page.plate = sheet_plate.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet(plates: &[&str]) -> Vec<Vehicle> {
        plates.iter().map(|p| Vehicle::new(*p, "", "")).collect()
    }

    #[test]
    fn test_single_placeholder_takes_sheet_plate() {
        let mut vehicles = sheet(&["ABC123"]);
        let unlisted = reconcile(&[PortalVehicle::with_plate("NOFIGURA")], &mut vehicles);
        assert_eq!(vehicles[0].license_plate, "ABC123");
        assert!(vehicles[0].is_pending());
        assert!(unlisted.is_empty());
    }

    #[test]
    fn test_single_empty_sheet_plate_takes_portal_plate() {
        let mut vehicles = sheet(&[""]);
        reconcile(&[PortalVehicle::with_plate("0KM")], &mut vehicles);
        assert_eq!(vehicles[0].license_plate, "0KM");
        assert!(vehicles[0].is_pending());
    }

    #[test]
    fn test_single_vehicle_different_real_plates_are_same_car() {
        let mut vehicles = sheet(&["SBA1234"]);
        let unlisted = reconcile(&[PortalVehicle::with_plate("SBA1235")], &mut vehicles);
        assert_eq!(vehicles[0].license_plate, "SBA1234");
        assert!(vehicles[0].is_pending());
        assert!(unlisted.is_empty());
    }

    #[test]
    fn test_general_case_statuses() {
        let mut vehicles = sheet(&["AAA1111", "BBB2222", "CCC3333", " DDD4444 "]);
        vehicles[2].files_are_valid = true;
        let portal = vec![
            PortalVehicle {
                plate: "AAA1111".to_string(),
                row_id: Some("1".to_string()),
                ..Default::default()
            },
            PortalVehicle {
                plate: "BBB2222".to_string(),
                excluded: true,
                ..Default::default()
            },
            PortalVehicle::with_plate("CCC3333"),
            PortalVehicle::with_plate("DDD4444"),
            PortalVehicle::with_plate("EEE5555"),
        ];

        let unlisted = reconcile(&portal, &mut vehicles);

        assert!(vehicles[0].is_pending());
        assert_eq!(vehicles[0].portal_row_id.as_deref(), Some("1"));
        assert!(vehicles[1].is_skipped_for(SkipReason::ExcludedFromFleet));
        assert!(vehicles[2].is_skipped_for(SkipReason::AlreadyDownloaded));
        assert_eq!(vehicles[3].license_plate, "DDD4444");
        assert!(vehicles[3].is_pending());
        assert_eq!(unlisted, vec![PortalVehicle::with_plate("EEE5555")]);
    }

    #[test]
    fn test_missing_vehicle_is_not_found() {
        let mut vehicles = sheet(&["AAA1111", "ZZZ9999"]);
        reconcile(
            &[PortalVehicle::with_plate("AAA1111"), PortalVehicle::with_plate("BBB2222")],
            &mut vehicles,
        );
        assert!(vehicles[1].is_skipped_for(SkipReason::NotFoundOnWeb));
    }

    #[test]
    fn test_duplicate_sheet_plates_claim_distinct_rows() {
        let mut vehicles = sheet(&["AAA1111", "AAA1111"]);
        let portal = vec![
            PortalVehicle {
                plate: "AAA1111".to_string(),
                row_id: Some("7".to_string()),
                ..Default::default()
            },
            PortalVehicle::with_plate("BBB2222"),
        ];
        reconcile(&portal, &mut vehicles);
        assert!(vehicles[0].is_pending());
        assert!(vehicles[1].is_skipped_for(SkipReason::NotFoundOnWeb));
    }

    #[test]
    fn test_done_vehicle_keeps_status() {
        let mut vehicles = sheet(&["AAA1111", "BBB2222"]);
        vehicles[0].status = Some(VehicleStatus::Ok);
        let unlisted = reconcile(
            &[PortalVehicle::with_plate("AAA1111"), PortalVehicle::with_plate("BBB2222")],
            &mut vehicles,
        );
        assert!(vehicles[0].is_ok());
        assert!(vehicles[1].is_pending());
        assert!(unlisted.is_empty());
    }

    #[test]
    fn test_older_endorsement_keeps_failed_and_excluded_vehicles() {
        let mut vehicles = sheet(&["AAA1111", "BBB2222", "CCC3333"]);
        vehicles[0].status = Some(VehicleStatus::Error("SOA no llegó".to_string()));
        vehicles[1].status = Some(VehicleStatus::Skipped(SkipReason::ExcludedFromFleet));
        vehicles[2].status = Some(VehicleStatus::Pending);

        let unlisted = reconcile(
            &[PortalVehicle::with_plate("OLD0001"), PortalVehicle::with_plate("OLD0002")],
            &mut vehicles,
        );

        assert_eq!(vehicles[0].status, Some(VehicleStatus::Error("SOA no llegó".to_string())));
        assert!(vehicles[1].is_skipped_for(SkipReason::ExcludedFromFleet));
        assert!(vehicles[2].is_skipped_for(SkipReason::NotFoundOnWeb));
        assert_eq!(unlisted.len(), 2);
    }

    #[test]
    fn test_failed_vehicle_listed_again_is_retried() {
        let mut vehicles = sheet(&["AAA1111", "BBB2222"]);
        vehicles[0].status = Some(VehicleStatus::Error("SOA no llegó".to_string()));
        reconcile(
            &[PortalVehicle::with_plate("AAA1111"), PortalVehicle::with_plate("BBB2222")],
            &mut vehicles,
        );
        assert!(vehicles[0].is_pending());
    }

    #[test]
    fn test_trust_spreadsheet() {
        let mut vehicles = sheet(&["AAA1111", "BBB2222"]);
        vehicles[1].files_are_valid = true;
        trust_spreadsheet(&mut vehicles);
        assert!(vehicles[0].is_pending());
        assert!(vehicles[1].is_skipped_for(SkipReason::AlreadyDownloaded));
    }
}
