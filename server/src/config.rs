use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Companies with a portal adapter. Each one reads its own `{NAME}_*` variables.
pub const COMPANY_NAMES: [&str; 3] = ["BSE", "SURA", "SANCOR"];

#[derive(Debug, Clone)]
pub struct CompanyConfig {
    pub name: String,
    pub login_url: String,
    pub search_url: String,
    pub logout_url: Option<String>,
    pub username: String,
    pub password: String,
    pub session_minutes: u64,
}

impl CompanyConfig {
    pub fn from_env(name: &str) -> Self {
        let var = |suffix: &str| env::var(format!("{}_{}", name, suffix)).unwrap_or_default();

        CompanyConfig {
            name: name.to_string(),
            login_url: var("LOGIN_URL"),
            search_url: var("SEARCH_URL"),
            logout_url: Some(var("LOGOUT_URL")).filter(|s| !s.is_empty()),
            username: var("USER"),
            password: var("PASSWORD"),
            session_minutes: env::var(format!("{}_SESSION_MINUTES", name))
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
        }
    }

    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty() && !self.login_url.is_empty()
    }

    pub fn session_lifetime(&self) -> Duration {
        Duration::from_secs(self.session_minutes * 60)
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub http_addr: String,
    pub log_level: String,

    // Browser
    pub webdriver_url: String,
    pub headless: bool,
    pub user_agent: String,

    // Folders
    pub download_folder: PathBuf,
    pub tmp_download_folder: PathBuf,

    // Timeouts
    pub element_timeout_ms: u64,
    pub download_timeout_secs: u64,
    pub download_attempts: u32,
    pub download_poll_ms: u64,
    pub download_settle_ms: u64,
    pub download_start_grace_secs: u64,

    // Database
    pub database_url: String,

    pub companies: Vec<CompanyConfig>,
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();

        let download_folder = PathBuf::from(
            env::var("DOWNLOAD_FOLDER").unwrap_or_else(|_| "./data/polizas".to_string()),
        );
        let tmp_download_folder = PathBuf::from(
            env::var("TMP_DOWNLOAD_FOLDER").unwrap_or_else(|_| "./data/tmp".to_string()),
        );
        if download_folder == tmp_download_folder {
            return Err("DOWNLOAD_FOLDER y TMP_DOWNLOAD_FOLDER deben ser carpetas distintas".into());
        }

        Ok(Config {
            http_addr: env::var("HTTP_ADDR").unwrap_or_else(|_| "0.0.0.0:8099".to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),

            webdriver_url: env::var("WEBDRIVER_URL")
                .unwrap_or_else(|_| "http://localhost:4444".to_string()),
            headless: env::var("HEADLESS")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .unwrap_or(true),
            user_agent: env::var("USER_AGENT").unwrap_or_else(|_| {
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36".to_string()
            }),

            download_folder,
            tmp_download_folder,

            element_timeout_ms: parse_env("ELEMENT_TIMEOUT_MS", 20_000),
            download_timeout_secs: parse_env("DOWNLOAD_TIMEOUT_SECS", 120),
            download_attempts: parse_env("DOWNLOAD_ATTEMPTS", 2),
            download_poll_ms: parse_env("DOWNLOAD_POLL_MS", 3_000),
            download_settle_ms: parse_env("DOWNLOAD_SETTLE_MS", 2_000),
            download_start_grace_secs: parse_env("DOWNLOAD_START_GRACE_SECS", 10),

            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://polizas.db?mode=rwc".to_string()),

            companies: COMPANY_NAMES.iter().map(|name| CompanyConfig::from_env(name)).collect(),
        })
    }

    pub fn company(&self, name: &str) -> Option<&CompanyConfig> {
        self.companies.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn element_timeout(&self) -> Duration {
        Duration::from_millis(self.element_timeout_ms)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    /// Temp download directory owned by one company's browser session.
    pub fn company_tmp_folder(&self, company: &str) -> PathBuf {
        self.tmp_download_folder.join(company)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
