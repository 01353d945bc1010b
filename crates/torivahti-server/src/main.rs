mod api;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::api::{build_app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = torivahti_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    std::fs::create_dir_all(config.images_dir())?;

    let items = Arc::new(torivahti_store::ItemStore::open(config.products_path())?);
    let settings = Arc::new(torivahti_store::SettingsStore::open(
        config.settings_path(),
    )?);
    let client = torivahti_scraper::ToriClient::new()?;
    let valuer = torivahti_valuer::Valuer::new()?;
    let bot = Arc::new(torivahti_bot::Bot::new(
        items,
        settings,
        client,
        valuer,
        Arc::new(torivahti_valuer::GiveawayPromptBuilder),
        config.images_dir(),
    ));

    // Best-effort session bootstrap; failure is logged, not fatal.
    bot.login_if_configured().await;
    bot.start().await;

    let app = build_app(
        AppState {
            bot: Arc::clone(&bot),
        },
        &config.images_dir(),
    );

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "torivahti listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    bot.stop().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
