use crate::api::{self, AppState};
use crate::components::google_calendar::TokenManager;
use crate::components::{notifications, GoogleCalendarGateway};
use crate::config::Config;
use crate::error::{AppResult, Error};
use crate::shutdown;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Initialize logging with environment-based configuration
pub fn init_logging() -> miette::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")),
        )
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| Error::Other(format!("Failed to set up logging: {}", e)))?;

    Ok(())
}

/// Load the application config
pub fn load_config() -> miette::Result<Config> {
    match Config::load() {
        Ok(config) => Ok(config),
        Err(e) => {
            error!("Failed to load configuration: {:?}", e);
            Err(e.into())
        }
    }
}

/// Wire the Google gateway, the token manager and the optional notifier
pub fn build_state(config: &Config) -> AppResult<AppState> {
    let client = reqwest::Client::new();

    let tokens = TokenManager::new(config, client.clone())?;
    info!(
        "Using calendar '{}' with tokens from {}",
        config.calendar_id,
        config.token_file.display()
    );

    let calendar = GoogleCalendarGateway::new(
        client.clone(),
        config.api_base_url.clone(),
        config.calendar_id.clone(),
        Arc::new(tokens),
    );
    let notifier = notifications::from_config(&config.notifications, client);

    Ok(AppState::new(Arc::new(calendar)).with_notifier(notifier))
}

/// Bind the listener and serve until shutdown
pub async fn start_server(config: Config) -> miette::Result<()> {
    let state = build_state(&config)?;
    let app = api::router(state);

    let addr = config.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(Error::from)?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown::shutdown_signal())
        .await
        .map_err(Error::from)?;

    info!("Server stopped");
    Ok(())
}
