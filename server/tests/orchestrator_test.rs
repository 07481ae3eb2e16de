use async_trait::async_trait;
use chrono::NaiveDate;
use lopdf::{dictionary, Document, Object, Stream};
use poliza_server::browser::{BrowserError, Locator, Navigator};
use poliza_server::db::PolicyStore;
use poliza_server::downloads::{DownloadStarter, FileTransferWatcher, WatcherTiming};
use poliza_server::errors::PolicyError;
use poliza_server::models::{
    Policy, PortalVehicle, SkipReason, ValidationData, Vehicle, VehicleStatus, MERCOSUR_FILENAME,
    OBS_LOGIN_EXPIRED, OBS_NOT_AUTOMOBILE, SOA_FILENAME,
};
use poliza_server::orchestrator::{DownloadOrchestrator, OrchestratorSettings, SessionState};
use poliza_server::providers::CompanyAdapter;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

const COMPANY: &str = "SURA";
const LOGIN_URL: &str = "https://portal.test/login";
const SEARCH_URL: &str = "https://portal.test/buscar";
const LOGOUT_URL: &str = "https://portal.test/salir";

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

#[derive(Default)]
struct FakeNavigator {
    visited: Mutex<Vec<String>>,
    typed: Mutex<Vec<String>>,
}

impl FakeNavigator {
    fn visits_to(&self, url: &str) -> usize {
        self.visited.lock().unwrap().iter().filter(|u| *u == url).count()
    }
}

#[async_trait]
impl Navigator for FakeNavigator {
    async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        self.visited.lock().unwrap().push(url.to_string());
        Ok(())
    }

    async fn replace_text(&self, _locator: &Locator, text: &str) -> Result<(), BrowserError> {
        self.typed.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

#[derive(Default)]
struct MemoryStore {
    policies: Mutex<HashMap<(String, String), Policy>>,
}

impl MemoryStore {
    fn stored(&self, number: &str) -> Option<Policy> {
        self.policies
            .lock()
            .unwrap()
            .get(&(COMPANY.to_string(), number.to_string()))
            .cloned()
    }
}

#[async_trait]
impl PolicyStore for MemoryStore {
    async fn get_policy_with_cars(&self, company: &str, number: &str) -> Result<Option<Policy>, sqlx::Error> {
        Ok(self
            .policies
            .lock()
            .unwrap()
            .get(&(company.to_string(), number.to_string()))
            .cloned())
    }

    async fn save_policy(&self, policy: &Policy) -> Result<(), sqlx::Error> {
        self.policies
            .lock()
            .unwrap()
            .insert((policy.company.clone(), policy.number.clone()), policy.clone());
        Ok(())
    }
}

/// How a fake starter behaves once triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delivery {
    File,
    Never,
    Unavailable,
}

struct FakeStarter {
    tmp_dir: PathBuf,
    delivery: Delivery,
    starts: Arc<AtomicUsize>,
}

#[async_trait]
impl DownloadStarter for FakeStarter {
    async fn start_download(&self) -> Result<(), PolicyError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        if self.delivery == Delivery::File {
            tokio::fs::write(self.tmp_dir.join("certificado.pdf"), b"%PDF-1.4 portal").await?;
        }
        Ok(())
    }

    async fn verify_download_in_progress(&self, target: &str) -> Result<(), PolicyError> {
        if self.delivery == Delivery::Unavailable {
            return Err(PolicyError::FileUnavailable {
                company: COMPANY.to_string(),
                target: target.to_string(),
            });
        }
        Ok(())
    }
}

struct FakeAdapter {
    tmp_dir: PathBuf,
    login_error: Option<String>,
    endorsements: Vec<ValidationData>,
    fleet: Vec<PortalVehicle>,
    /// Fleet shown by specific endorsement lines; others show `fleet`.
    line_fleets: HashMap<usize, Vec<PortalVehicle>>,
    current_line: AtomicUsize,
    soa: Delivery,
    mercosur: Delivery,
    searches: AtomicUsize,
    logins: AtomicUsize,
    soa_requests: AtomicUsize,
    mercosur_requests: AtomicUsize,
    soa_starts: Arc<AtomicUsize>,
    mercosur_starts: Arc<AtomicUsize>,
    visited_vehicles: Mutex<Vec<String>>,
}

impl FakeAdapter {
    fn new(tmp_dir: &Path, fleet: Vec<PortalVehicle>) -> Self {
        Self {
            tmp_dir: tmp_dir.to_path_buf(),
            login_error: None,
            endorsements: vec![ValidationData::valid(Some("77".to_string()))],
            fleet,
            line_fleets: HashMap::new(),
            current_line: AtomicUsize::new(0),
            soa: Delivery::File,
            mercosur: Delivery::File,
            searches: AtomicUsize::new(0),
            logins: AtomicUsize::new(0),
            soa_requests: AtomicUsize::new(0),
            mercosur_requests: AtomicUsize::new(0),
            soa_starts: Arc::new(AtomicUsize::new(0)),
            mercosur_starts: Arc::new(AtomicUsize::new(0)),
            visited_vehicles: Mutex::new(Vec::new()),
        }
    }

    fn starter(&self, delivery: Delivery, starts: &Arc<AtomicUsize>) -> Box<dyn DownloadStarter> {
        Box::new(FakeStarter {
            tmp_dir: self.tmp_dir.clone(),
            delivery,
            starts: starts.clone(),
        })
    }
}

#[async_trait]
impl CompanyAdapter for FakeAdapter {
    fn name(&self) -> &str {
        COMPANY
    }

    async fn wait_login_page(&self) -> Result<(), PolicyError> {
        Ok(())
    }

    async fn do_login(&self) -> Result<(), PolicyError> {
        self.logins.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn wait_login_confirmation(&self) -> Result<(), PolicyError> {
        match &self.login_error {
            Some(reason) => Err(PolicyError::company(COMPANY, reason.clone())),
            None => Ok(()),
        }
    }

    async fn find_policy_input(&self) -> Result<Locator, PolicyError> {
        Ok(Locator::id("nroPoliza"))
    }

    async fn search_policy(&self) -> Result<(), PolicyError> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get_endorsements_count(&self) -> Result<usize, PolicyError> {
        Ok(self.endorsements.len())
    }

    async fn validate_policy(&self, _policy: &Policy, line: usize) -> Result<ValidationData, PolicyError> {
        self.current_line.store(line, Ordering::SeqCst);
        Ok(self.endorsements[line].clone())
    }

    async fn get_vehicles_data(&self) -> Result<Vec<PortalVehicle>, PolicyError> {
        let line = self.current_line.load(Ordering::SeqCst);
        Ok(self.line_fleets.get(&line).unwrap_or(&self.fleet).clone())
    }

    async fn go_to_vehicle_download_page(
        &self,
        vehicle: &Vehicle,
        _validation: &ValidationData,
    ) -> Result<(), PolicyError> {
        self.visited_vehicles
            .lock()
            .unwrap()
            .push(vehicle.license_plate.clone());
        Ok(())
    }

    async fn soa_download_starter(&self, _policy: &Policy) -> Result<Box<dyn DownloadStarter>, PolicyError> {
        self.soa_requests.fetch_add(1, Ordering::SeqCst);
        Ok(self.starter(self.soa, &self.soa_starts))
    }

    async fn mercosur_download_starter(&self, _policy: &Policy) -> Result<Box<dyn DownloadStarter>, PolicyError> {
        self.mercosur_requests.fetch_add(1, Ordering::SeqCst);
        Ok(self.starter(self.mercosur, &self.mercosur_starts))
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

struct Harness {
    _dir: TempDir,
    root: PathBuf,
    tmp: PathBuf,
    navigator: Arc<FakeNavigator>,
    store: Arc<MemoryStore>,
}

impl Harness {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("polizas");
        let tmp = dir.path().join("tmp");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::create_dir_all(&tmp).unwrap();
        Self {
            _dir: dir,
            root,
            tmp,
            navigator: Arc::new(FakeNavigator::default()),
            store: Arc::new(MemoryStore::default()),
        }
    }

    fn orchestrator(&self, adapter: Arc<FakeAdapter>) -> DownloadOrchestrator {
        self.orchestrator_with_lifetime(adapter, Duration::from_secs(1800))
    }

    fn orchestrator_with_lifetime(&self, adapter: Arc<FakeAdapter>, lifetime: Duration) -> DownloadOrchestrator {
        let timing = WatcherTiming {
            poll_interval: Duration::from_millis(10),
            settle_delay: Duration::ZERO,
            start_grace: Duration::from_millis(50),
        };
        DownloadOrchestrator::new(
            adapter,
            self.navigator.clone(),
            self.store.clone(),
            FileTransferWatcher::new(COMPANY, &self.tmp, timing),
            OrchestratorSettings {
                login_url: LOGIN_URL.to_string(),
                search_url: SEARCH_URL.to_string(),
                logout_url: Some(LOGOUT_URL.to_string()),
                session_lifetime: lifetime,
                download_root: self.root.clone(),
                download_timeout: Duration::from_millis(150),
                download_attempts: 2,
            },
        )
    }

    fn vehicle_folder(&self, number: &str, plate: &str) -> PathBuf {
        self.root.join(COMPANY).join(number).join("2099").join(plate)
    }
}

fn policy(number: &str, plates: &[&str]) -> Policy {
    Policy::new(
        COMPANY,
        number,
        NaiveDate::from_ymd_opt(2099, 12, 31).unwrap(),
        plates.iter().map(|p| Vehicle::new(*p, "FIAT", "UNO")).collect(),
    )
}

fn portal(plates: &[&str]) -> Vec<PortalVehicle> {
    plates
        .iter()
        .enumerate()
        .map(|(i, p)| PortalVehicle {
            plate: p.to_string(),
            row_id: Some((i + 1).to_string()),
            ..Default::default()
        })
        .collect()
}

fn write_valid_pdf(folder: &Path, filename: &str) {
    let mut doc = Document::with_version("1.4");
    let content_id = doc.add_object(Stream::new(dictionary! {}, b"BT ET".to_vec()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        "Contents" => content_id,
    });
    let pages_id = doc.add_object(dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
    });
    if let Ok(Object::Dictionary(dict)) = doc.get_object_mut(page_id) {
        dict.set("Parent", pages_id);
    }
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    std::fs::create_dir_all(folder).unwrap();
    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    std::fs::write(folder.join(filename), buf).unwrap();
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_full_download_of_one_vehicle() {
    let h = Harness::new();
    let adapter = Arc::new(FakeAdapter::new(&h.tmp, portal(&["SBA1234"])));
    let mut orchestrator = h.orchestrator(adapter.clone());
    let mut policies = vec![policy("2121199", &["SBA1234"])];

    let summary = orchestrator.process_policies(&mut policies).await;

    let p = &policies[0];
    assert_eq!(summary.downloaded, 1);
    assert!(p.downloaded);
    assert!(!p.cancelled);
    assert!(p.obs.is_empty());

    let folder = h.vehicle_folder("2121199", "SBA1234");
    let vehicle = &p.vehicles[0];
    assert_eq!(vehicle.status, Some(VehicleStatus::Ok));
    assert_eq!(vehicle.soa.as_deref(), Some(folder.join(SOA_FILENAME).as_path()));
    assert_eq!(vehicle.mercosur.as_deref(), Some(folder.join(MERCOSUR_FILENAME).as_path()));
    assert!(folder.join(SOA_FILENAME).is_file());
    assert!(folder.join(MERCOSUR_FILENAME).is_file());

    assert_eq!(adapter.logins.load(Ordering::SeqCst), 1);
    assert_eq!(h.navigator.visits_to(LOGIN_URL), 1);
    assert_eq!(h.navigator.visits_to(LOGOUT_URL), 1);
    assert_eq!(h.navigator.typed.lock().unwrap().as_slice(), ["2121199"]);
    assert_eq!(orchestrator.state(), SessionState::LoggedOut);
    assert!(h.store.stored("2121199").unwrap().downloaded);
}

#[tokio::test]
async fn test_not_automobile_never_touches_portal() {
    let h = Harness::new();
    let adapter = Arc::new(FakeAdapter::new(&h.tmp, portal(&["SBA1234"])));
    let mut orchestrator = h.orchestrator(adapter.clone());
    let mut p = policy("1257719", &["SBA1234"]);
    p.contains_cars = false;
    let mut policies = vec![p];

    let summary = orchestrator.process_policies(&mut policies).await;

    assert_eq!(summary.skipped, 1);
    assert_eq!(policies[0].obs, OBS_NOT_AUTOMOBILE);
    assert!(!policies[0].downloaded);
    assert_eq!(adapter.searches.load(Ordering::SeqCst), 0);
    assert!(h.navigator.visited.lock().unwrap().is_empty());
    assert_eq!(h.store.stored("1257719").unwrap().obs, OBS_NOT_AUTOMOBILE);
}

#[tokio::test]
async fn test_soa_only_never_requests_mercosur() {
    let h = Harness::new();
    let adapter = Arc::new(FakeAdapter::new(&h.tmp, portal(&["SBA1234"])));
    let mut orchestrator = h.orchestrator(adapter.clone());
    let mut p = policy("1941009", &["SBA1234"]);
    p.soa_only = true;
    let mut policies = vec![p];

    orchestrator.process_policies(&mut policies).await;

    let vehicle = &policies[0].vehicles[0];
    assert_eq!(vehicle.status, Some(VehicleStatus::Ok));
    assert!(vehicle.soa.is_some());
    assert!(vehicle.mercosur.is_none());
    assert_eq!(adapter.mercosur_requests.load(Ordering::SeqCst), 0);
    assert!(policies[0].downloaded);
}

#[tokio::test]
async fn test_mercosur_timeout_is_soft() {
    let h = Harness::new();
    let mut adapter = FakeAdapter::new(&h.tmp, portal(&["SBA1234"]));
    adapter.mercosur = Delivery::Never;
    let adapter = Arc::new(adapter);
    let mut orchestrator = h.orchestrator(adapter.clone());
    let mut policies = vec![policy("3000001", &["SBA1234"])];

    orchestrator.process_policies(&mut policies).await;

    let vehicle = &policies[0].vehicles[0];
    assert_eq!(vehicle.status, Some(VehicleStatus::Ok));
    assert!(vehicle.soa.is_some());
    assert!(vehicle.mercosur.is_none());
    assert_eq!(adapter.mercosur_starts.load(Ordering::SeqCst), 2);
    assert!(policies[0].downloaded);
}

#[tokio::test]
async fn test_mercosur_unavailable_is_soft() {
    let h = Harness::new();
    let mut adapter = FakeAdapter::new(&h.tmp, portal(&["SBA1234"]));
    adapter.mercosur = Delivery::Unavailable;
    let adapter = Arc::new(adapter);
    let mut orchestrator = h.orchestrator(adapter.clone());
    let mut policies = vec![policy("3000002", &["SBA1234"])];

    orchestrator.process_policies(&mut policies).await;

    assert_eq!(policies[0].vehicles[0].status, Some(VehicleStatus::Ok));
    assert_eq!(adapter.mercosur_starts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_soa_timeout_is_vehicle_error() {
    let h = Harness::new();
    let mut adapter = FakeAdapter::new(&h.tmp, portal(&["SBA1234", "SBB5678"]));
    adapter.soa = Delivery::Never;
    let adapter = Arc::new(adapter);
    let mut orchestrator = h.orchestrator(adapter.clone());
    let mut policies = vec![policy("3000003", &["SBA1234", "SBB5678"])];

    let summary = orchestrator.process_policies(&mut policies).await;

    let p = &policies[0];
    assert_eq!(summary.partial, 1);
    assert!(!p.downloaded);
    assert!(!p.cancelled);
    for vehicle in &p.vehicles {
        match &vehicle.status {
            Some(VehicleStatus::Error(reason)) => assert!(reason.contains(SOA_FILENAME)),
            other => panic!("unexpected status {:?}", other),
        }
    }
    // Both vehicles were tried, two starts each
    assert_eq!(adapter.soa_starts.load(Ordering::SeqCst), 4);
    assert_eq!(adapter.mercosur_requests.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_files_already_on_disk_are_not_downloaded_again() {
    let h = Harness::new();
    let done = h.vehicle_folder("4000001", "AAA1111");
    write_valid_pdf(&done, SOA_FILENAME);
    write_valid_pdf(&done, MERCOSUR_FILENAME);

    let adapter = Arc::new(FakeAdapter::new(&h.tmp, portal(&["AAA1111", "BBB2222"])));
    let mut orchestrator = h.orchestrator(adapter.clone());
    let mut policies = vec![policy("4000001", &["AAA1111", "BBB2222"])];

    orchestrator.process_policies(&mut policies).await;

    let p = &policies[0];
    assert_eq!(
        p.vehicles[0].status,
        Some(VehicleStatus::Skipped(SkipReason::AlreadyDownloaded))
    );
    assert_eq!(p.vehicles[1].status, Some(VehicleStatus::Ok));
    assert_eq!(adapter.soa_requests.load(Ordering::SeqCst), 1);
    assert_eq!(adapter.visited_vehicles.lock().unwrap().as_slice(), ["BBB2222"]);
    assert!(p.downloaded);
}

#[tokio::test]
async fn test_fully_downloaded_policy_skips_login() {
    let h = Harness::new();
    let folder = h.vehicle_folder("4000002", "AAA1111");
    write_valid_pdf(&folder, SOA_FILENAME);
    write_valid_pdf(&folder, MERCOSUR_FILENAME);

    let adapter = Arc::new(FakeAdapter::new(&h.tmp, portal(&["AAA1111"])));
    let mut orchestrator = h.orchestrator(adapter.clone());
    let mut policies = vec![policy("4000002", &["AAA1111"])];

    let summary = orchestrator.process_policies(&mut policies).await;

    assert_eq!(summary.skipped, 1);
    assert!(policies[0].downloaded);
    assert_eq!(policies[0].vehicles[0].soa.as_deref(), Some(folder.join(SOA_FILENAME).as_path()));
    assert_eq!(adapter.logins.load(Ordering::SeqCst), 0);
    assert_eq!(h.navigator.visits_to(LOGOUT_URL), 0);
}

#[tokio::test]
async fn test_empty_sheet_plate_takes_portal_plate() {
    let h = Harness::new();
    let adapter = Arc::new(FakeAdapter::new(&h.tmp, portal(&["0KM"])));
    let mut orchestrator = h.orchestrator(adapter.clone());
    let mut policies = vec![policy("5000001", &[""])];

    orchestrator.process_policies(&mut policies).await;

    let vehicle = &policies[0].vehicles[0];
    assert_eq!(vehicle.license_plate, "0KM");
    assert_eq!(vehicle.status, Some(VehicleStatus::Ok));
    assert!(h.vehicle_folder("5000001", "0KM").join(SOA_FILENAME).is_file());
}

#[tokio::test]
async fn test_placeholder_portal_plate_takes_sheet_plate() {
    let h = Harness::new();
    let adapter = Arc::new(FakeAdapter::new(&h.tmp, portal(&["NOFIGURA"])));
    let mut orchestrator = h.orchestrator(adapter.clone());
    let mut policies = vec![policy("5000002", &["ABC123"])];

    orchestrator.process_policies(&mut policies).await;

    assert_eq!(policies[0].vehicles[0].license_plate, "ABC123");
    assert_eq!(adapter.visited_vehicles.lock().unwrap().as_slice(), ["ABC123"]);
}

#[tokio::test]
async fn test_policy_without_any_vehicle_on_portal_is_cancelled() {
    let h = Harness::new();
    let adapter = Arc::new(FakeAdapter::new(&h.tmp, portal(&["XXX0001", "XXX0002"])));
    let mut orchestrator = h.orchestrator(adapter.clone());
    let mut policies = vec![policy("6000001", &["AAA1111", "BBB2222"])];

    orchestrator.process_policies(&mut policies).await;

    let p = &policies[0];
    assert!(p.cancelled);
    assert!(p.downloaded);
    assert!(p
        .vehicles
        .iter()
        .all(|v| v.status == Some(VehicleStatus::Skipped(SkipReason::NotFoundOnWeb))));
    assert_eq!(p.unlisted_vehicles.len(), 2);
    assert_eq!(adapter.soa_requests.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_stored_cancellation_is_kept() {
    let h = Harness::new();
    let mut stored = policy("6000002", &["AAA1111"]);
    stored.cancelled = true;
    h.store.save_policy(&stored).await.unwrap();

    let adapter = Arc::new(FakeAdapter::new(&h.tmp, portal(&["AAA1111"])));
    let mut orchestrator = h.orchestrator(adapter.clone());
    let mut policies = vec![policy("6000002", &["AAA1111"])];

    let summary = orchestrator.process_policies(&mut policies).await;

    assert_eq!(summary.skipped, 1);
    assert!(policies[0].cancelled);
    assert!(policies[0].downloaded);
    assert_eq!(adapter.logins.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_invalid_endorsement_moves_to_older_line() {
    let h = Harness::new();
    let mut adapter = FakeAdapter::new(&h.tmp, portal(&["SBA1234"]));
    adapter.endorsements = vec![
        ValidationData::invalid(OBS_NOT_AUTOMOBILE),
        ValidationData::valid(Some("12".to_string())),
    ];
    let adapter = Arc::new(adapter);
    let mut orchestrator = h.orchestrator(adapter.clone());
    let mut policies = vec![policy("7000001", &["SBA1234"])];

    orchestrator.process_policies(&mut policies).await;

    assert_eq!(adapter.searches.load(Ordering::SeqCst), 2);
    assert_eq!(h.navigator.visits_to(SEARCH_URL), 2);
    assert_eq!(policies[0].vehicles[0].status, Some(VehicleStatus::Ok));
    assert!(policies[0].downloaded);
}

#[tokio::test]
async fn test_settled_vehicles_stop_endorsement_walk() {
    let h = Harness::new();
    let mut adapter = FakeAdapter::new(&h.tmp, portal(&["SBA1234"]));
    adapter.endorsements = vec![
        ValidationData::valid(Some("3".to_string())),
        ValidationData::valid(Some("2".to_string())),
        ValidationData::valid(Some("1".to_string())),
    ];
    let adapter = Arc::new(adapter);
    let mut orchestrator = h.orchestrator(adapter.clone());
    let mut policies = vec![policy("7000002", &["SBA1234"])];

    orchestrator.process_policies(&mut policies).await;

    assert_eq!(adapter.searches.load(Ordering::SeqCst), 1);
    assert_eq!(adapter.soa_requests.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_failed_vehicles_survive_older_endorsement_with_other_fleet() {
    let h = Harness::new();
    let mut adapter = FakeAdapter::new(&h.tmp, portal(&["SBA1234", "SBA5678"]));
    adapter.soa = Delivery::Never;
    adapter.endorsements = vec![
        ValidationData::valid(Some("2".to_string())),
        ValidationData::valid(Some("1".to_string())),
    ];
    adapter.line_fleets.insert(1, portal(&["OLD0001", "OLD0002"]));
    let adapter = Arc::new(adapter);
    let mut orchestrator = h.orchestrator(adapter.clone());
    let mut policies = vec![policy("7000003", &["SBA1234", "SBA5678"])];

    let summary = orchestrator.process_policies(&mut policies).await;

    let p = &policies[0];
    assert_eq!(adapter.searches.load(Ordering::SeqCst), 2);
    assert_eq!(adapter.soa_starts.load(Ordering::SeqCst), 4);
    assert!(p
        .vehicles
        .iter()
        .all(|v| matches!(v.status, Some(VehicleStatus::Error(_)))));
    assert!(!p.cancelled);
    assert!(!p.downloaded);
    assert_eq!(p.unlisted_vehicles.len(), 2);
    assert_eq!(summary.partial, 1);

    let stored = h.store.stored("7000003").unwrap();
    assert!(!stored.cancelled);
    assert!(!stored.downloaded);
}

#[tokio::test]
async fn test_login_failure_is_recorded_on_remaining_policies() {
    let h = Harness::new();
    let mut adapter = FakeAdapter::new(&h.tmp, portal(&["SBA1234"]));
    adapter.login_error = Some("Usuario o contraseña incorrectos".to_string());
    let adapter = Arc::new(adapter);
    let mut orchestrator = h.orchestrator(adapter.clone());
    let mut expired = policy("8000000", &["SBA1234"]);
    expired.expiration_date = NaiveDate::from_ymd_opt(2001, 1, 1).unwrap();
    let mut policies = vec![policy("8000001", &["SBA1234"]), expired, policy("8000002", &["SBA1234"])];

    let summary = orchestrator.process_policies(&mut policies).await;

    assert_eq!(summary.failed, 2);
    assert_eq!(summary.skipped, 1);
    assert_eq!(adapter.logins.load(Ordering::SeqCst), 1);
    assert_eq!(adapter.searches.load(Ordering::SeqCst), 0);
    assert_eq!(policies[0].obs, "Usuario o contraseña incorrectos");
    assert_eq!(policies[1].obs, "Vencida");
    assert_eq!(policies[2].obs, "Usuario o contraseña incorrectos");
    assert_eq!(h.navigator.visits_to(LOGOUT_URL), 1);
}

#[tokio::test]
async fn test_expired_session_abandons_batch() {
    let h = Harness::new();
    let adapter = Arc::new(FakeAdapter::new(&h.tmp, portal(&["SBA1234"])));
    let mut orchestrator = h.orchestrator_with_lifetime(adapter.clone(), Duration::ZERO);
    let mut policies = vec![policy("9000001", &["SBA1234"]), policy("9000002", &["SBA1234"])];

    let summary = orchestrator.process_policies(&mut policies).await;

    assert_eq!(summary.failed, 2);
    assert!(policies.iter().all(|p| p.obs == OBS_LOGIN_EXPIRED));
    assert_eq!(adapter.logins.load(Ordering::SeqCst), 1);
    assert_eq!(adapter.searches.load(Ordering::SeqCst), 0);
    assert_eq!(h.store.stored("9000002").unwrap().obs, OBS_LOGIN_EXPIRED);
}

#[tokio::test]
async fn test_missing_tmp_folder_aborts_policy() {
    let h = Harness::new();
    std::fs::remove_dir_all(&h.tmp).unwrap();
    let adapter = Arc::new(FakeAdapter::new(&h.tmp, portal(&["SBA1234"])));
    let mut orchestrator = h.orchestrator(adapter.clone());
    let mut policies = vec![policy("9100001", &["SBA1234"])];

    let summary = orchestrator.process_policies(&mut policies).await;

    assert_eq!(summary.failed, 1);
    assert!(policies[0].obs.starts_with("Carpeta no encontrada"));
    assert!(!policies[0].downloaded);
}
