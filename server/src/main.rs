use poliza_server::config::Config;
use poliza_server::db::{create_pool, run_migrations, PolicyStore, SqlitePolicyStore};
use poliza_server::http::{create_router, AppState};
use poliza_server::providers::ProviderRegistry;
use poliza_server::services::{DownloadRunner, RunRegistry};
use std::sync::Arc;
use std::time::SystemTime;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    match dotenvy::dotenv() {
        Ok(path) => eprintln!("✅ .env cargado desde: {:?}", path),
        Err(e) => eprintln!("⚠️  .env no encontrado: {}", e),
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,poliza_server=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("🚀 Iniciando servidor de pólizas...");

    let config = Arc::new(Config::from_env()?);
    tracing::info!("✅ Configuración cargada");
    tracing::info!("   HTTP Addr: {}", config.http_addr);
    tracing::info!("   WebDriver URL: {}", config.webdriver_url);
    tracing::info!("   Headless: {}", config.headless);
    tracing::info!("   Descargas: {}", config.download_folder.display());
    tracing::info!("   Temporales: {}", config.tmp_download_folder.display());

    tracing::info!("📊 Conectando a la base: {}", config.database_url);
    let db_pool = create_pool(&config.database_url).await?;
    run_migrations(&db_pool).await?;
    tracing::info!("✅ Migraciones aplicadas");

    let registry = Arc::new(ProviderRegistry::new(config.clone()));
    let companies = registry.get_companies_info();
    tracing::info!(
        "✅ {} compañías registradas, {} activas",
        companies.total,
        companies.active_count
    );
    for company in &companies.companies {
        let status = if company.active { "✅" } else { "⏸️" };
        let reason = company
            .reason
            .as_ref()
            .map(|r| format!(" ({})", r))
            .unwrap_or_default();
        tracing::info!("   {} {}{}", status, company.name, reason);
    }

    let store: Arc<dyn PolicyStore> = Arc::new(SqlitePolicyStore::new(db_pool));
    let runner = DownloadRunner::new(config.clone(), registry.clone(), store.clone());

    let state = AppState {
        config: config.clone(),
        registry,
        runner,
        runs: RunRegistry::default(),
        store,
        start_time: SystemTime::now(),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state).layer(cors);

    let listener = tokio::net::TcpListener::bind(&config.http_addr).await?;
    tracing::info!("🌐 Servidor escuchando: http://{}", config.http_addr);
    tracing::info!("📋 Endpoints:");
    tracing::info!("   GET  /health");
    tracing::info!("   GET  /api/v1/companies");
    tracing::info!("   POST /api/v1/downloads");
    tracing::info!("   POST /api/v1/downloads/:company");
    tracing::info!("   GET  /api/v1/downloads/:run_id");
    tracing::info!("   GET  /api/v1/policies/:company/:number/files");

    axum::serve(listener, app).await?;

    Ok(())
}
