//! Main entry point for the Telegram Gateway

use anyhow::Context;
use std::sync::Arc;
use tg_gateway::{
    api,
    auth::{LoginService, PendingLoginStore},
    config::{LoggingConfig, Settings},
    telegram::{self, grammers::GrammersConnector, ClientSlot, Connector, TelegramError},
    AppState,
};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format.eq_ignore_ascii_case("json") {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().pretty()).init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let settings = Settings::load()?;
    init_tracing(&settings.logging);
    settings.validate()?;

    info!("Starting Telegram Gateway");
    info!(
        "Loaded configuration: server={}:{}",
        settings.server.host, settings.server.port
    );

    let settings = Arc::new(settings);

    let connector: Arc<dyn Connector> = Arc::new(GrammersConnector::new(
        settings.telegram.api_id,
        settings.telegram.api_hash.clone(),
    ));

    // Connect the shared client, if the account already has a session
    let slot = Arc::new(ClientSlot::new());
    let session_file = settings.telegram.account_session_file();
    match telegram::connect_account(connector.as_ref(), &session_file).await {
        Ok(Some(client)) => {
            slot.attach(client);
        }
        Ok(None) => {}
        Err(TelegramError::FloodWait { seconds }) => {
            anyhow::bail!(
                "Telegram requires waiting {} seconds before connecting; try again later",
                seconds
            );
        }
        Err(e) => {
            return Err(anyhow::Error::new(e).context("Failed to connect the Telegram client"));
        }
    }

    // Pending login storage
    let store = PendingLoginStore::connect(&settings.telegram.login_db)
        .await
        .with_context(|| format!("Failed to open {}", settings.telegram.login_db))?;
    let login = Arc::new(LoginService::new(
        store,
        connector.clone(),
        settings.telegram.clone(),
    ));

    let app_state = Arc::new(AppState {
        settings: settings.clone(),
        telegram: slot.clone(),
        connector,
        login,
    });

    let app = api::routes::create_router(app_state);

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(client) = slot.take() {
        client.disconnect().await;
    }

    info!("Telegram Gateway stopped");
    Ok(())
}
