pub mod download_runner;
pub mod files_finder;
pub mod pdf;
pub mod run_registry;

pub use download_runner::{BatchReport, DownloadRunner, RunnerError};
pub use files_finder::{find_files, FilesLookup};
pub use run_registry::{CompanyOutcome, RunRegistry, RunStatus};
