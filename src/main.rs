use anyhow::Result;
use docket::config::AppConfig;
use docket::lifecycle::Services;
use docket::server::ServerBuilder;
use docket::storage::Store;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.filter.as_str().into()),
        )
        .init();

    tracing::info!(
        backend = ?config.storage.backend,
        address = %config.server.address(),
        "starting docketd"
    );

    let store = Store::connect(&config.storage).await?;
    let services = Services::new(store, &config);

    ServerBuilder::new()
        .with_services(services)
        .serve(&config.server.address())
        .await
}
