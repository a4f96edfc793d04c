mod config;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use orderhub_api::fetch::CatalogFetcher;
use orderhub_api::notify::{Mailer, Notifier, run_mailer};
use orderhub_api::{AppState, AppStateInner};
use orderhub_db::Database;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "orderhub=debug,tower_http=debug".into()),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    let db = Database::open(&config.db_path)?;

    // Background mailer; stops once the last notifier is dropped
    let mailer = match &config.smtp {
        Some(smtp) => {
            info!("Sending email through {}:{}", smtp.host, smtp.port);
            Mailer::smtp(smtp)?
        }
        None => {
            warn!("ORDERHUB_SMTP_HOST not set, emails will only be logged");
            Mailer::Log
        }
    };
    let (notifier, mail_rx) = Notifier::channel();
    let mailer_task = tokio::spawn(run_mailer(mailer, mail_rx));

    let state: AppState = Arc::new(AppStateInner {
        db,
        jwt_secret: config.jwt_secret,
        notifier,
        fetcher: CatalogFetcher::new(Duration::from_secs(config.import_timeout_secs))?,
        reset_token_ttl_hours: config.reset_token_ttl_hours,
    });

    let app = orderhub_api::router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("orderhub listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The router (and its notifier) is gone; let queued mail drain
    if let Err(e) = mailer_task.await {
        error!("Mailer task failed: {}", e);
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
