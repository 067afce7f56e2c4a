use sqlx::postgres::PgPoolOptions;
use std::net::TcpListener;
use std::sync::Arc;
use vidtube::assets::HttpAssetStore;
use vidtube::configuration::{get_configuration, Settings, StoreBackend};
use vidtube::session::SessionCoordinator;
use vidtube::startup::run;
use vidtube::store::{CredentialStore, InMemoryCredentialStore, PgCredentialStore};
use vidtube::telemetry::init_telemetry;

async fn build_store(configuration: &Settings) -> std::io::Result<Arc<dyn CredentialStore>> {
    match configuration.store.backend {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory credential store; data is lost on restart");
            Ok(Arc::new(InMemoryCredentialStore::new()))
        }
        StoreBackend::Postgres => {
            tracing::info!("Attempting to connect to database");
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .acquire_timeout(configuration.store.timeout())
                .connect(&configuration.database.connection_string())
                .await
                .map_err(|e| {
                    tracing::error!("Failed to create connection pool: {}", e);
                    std::io::Error::new(
                        std::io::ErrorKind::ConnectionRefused,
                        "Database connection error",
                    )
                })?;

            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .map_err(|e| {
                    tracing::error!("Failed to run migrations: {}", e);
                    std::io::Error::new(std::io::ErrorKind::Other, "Migration error")
                })?;

            tracing::info!("Database connection pool created successfully");
            Ok(Arc::new(PgCredentialStore::new(pool)))
        }
    }
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_telemetry();

    tracing::info!("Starting application");

    let configuration = match get_configuration() {
        Ok(config) => {
            tracing::info!("Configuration loaded successfully");
            config
        }
        Err(e) => {
            tracing::error!("Failed to read configuration: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Configuration error",
            ));
        }
    };

    let store = build_store(&configuration).await?;

    tokio::fs::create_dir_all(&configuration.assets.upload_dir)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create upload directory: {}", e);
            e
        })?;

    let assets = HttpAssetStore::from_settings(&configuration.assets).map_err(|e| {
        tracing::error!("Failed to build asset client: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "Asset client error")
    })?;

    let coordinator = SessionCoordinator::new(store, Arc::new(assets), &configuration);

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    let server = run(listener, coordinator, configuration.application.environment)?;
    server.await
}
