use crate::config::Config;
use fantoccini::{Client, ClientBuilder};
use serde_json::json;
use std::path::Path;

/// Opens a Chrome WebDriver session whose downloads land in `download_dir`.
pub async fn create_webdriver_client(
    config: &Config,
    download_dir: &Path,
) -> Result<Client, fantoccini::error::NewSessionError> {
    let mut caps = serde_json::Map::new();
    let mut chrome_opts = serde_json::Map::new();

    let mut args = vec![
        "--disable-blink-features=AutomationControlled".to_string(),
        "--no-sandbox".to_string(),
        "--disable-dev-shm-usage".to_string(),
        "--disable-gpu".to_string(),
        "--window-size=1920,1080".to_string(),
        "--lang=es-UY".to_string(),
        "--disable-infobars".to_string(),
        format!("--user-agent={}", config.user_agent),
    ];

    if config.headless {
        args.push("--headless=new".to_string());
    }

    chrome_opts.insert("args".to_string(), json!(args));
    chrome_opts.insert("excludeSwitches".to_string(), json!(["enable-automation"]));

    // Silent PDF downloads into the company temp folder
    let absolute_dir = std::path::absolute(download_dir)
        .unwrap_or_else(|_| download_dir.to_path_buf());
    let mut prefs = serde_json::Map::new();
    prefs.insert("credentials_enable_service".to_string(), json!(false));
    prefs.insert("profile.password_manager_enabled".to_string(), json!(false));
    prefs.insert(
        "download.default_directory".to_string(),
        json!(absolute_dir.to_string_lossy()),
    );
    prefs.insert("download.prompt_for_download".to_string(), json!(false));
    prefs.insert("download.directory_upgrade".to_string(), json!(true));
    prefs.insert("plugins.always_open_pdf_externally".to_string(), json!(true));
    chrome_opts.insert("prefs".to_string(), json!(prefs));

    caps.insert("goog:chromeOptions".to_string(), json!(chrome_opts));
    caps.insert("browserName".to_string(), json!("chrome"));
    caps.insert("acceptInsecureCerts".to_string(), json!(true));

    tracing::info!(
        "🧭 Creando sesión WebDriver en {} (descargas: {})",
        config.webdriver_url,
        absolute_dir.display()
    );

    let client = ClientBuilder::native()
        .capabilities(caps)
        .connect(&config.webdriver_url)
        .await?;

    tracing::info!("✅ Sesión WebDriver creada");

    Ok(client)
}
