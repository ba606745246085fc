use cryptkeep::{CryptkeepError, CryptkeepServerBuilder, ServerConfig};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), CryptkeepError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = ServerConfig::load_or_default();
    info!(
        addr = %config.addr,
        map = %config.map_path.display(),
        "cryptkeep starting"
    );

    let server = CryptkeepServerBuilder::from_config(config).build().await?;
    info!(addr = %server.local_addr()?, "listening");

    server
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
}
