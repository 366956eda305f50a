use dotenv::dotenv;
use tracing::info;
use tracing_subscriber::EnvFilter;

use warbler::{config::settings::Settings, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let settings = Settings::from_env()?;

    let default_filter = if settings.debug {
        "warbler=debug,tower_http=debug"
    } else {
        "warbler=info,tower_http=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    info!(environment = ?settings.environment, "starting warbler");

    let state = AppState::new(settings.clone()).await?;
    let app = warbler::router(state);

    info!("Server running on http://localhost:{}", settings.port);

    let listener = tokio::net::TcpListener::bind(settings.addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
