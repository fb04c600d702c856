//! # Rusty-Reviews Binary
//!
//! The entry point that assembles the application based on compile-time features.

use std::sync::Arc;

use anyhow::Context;
use chrono::Duration;
use rr_api::AppState;
use rr_config::{LogSettings, Settings};
use rr_core::accounts::AccountService;
use secrecy::ExposeSecret;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[cfg(feature = "db-sqlite")]
use rr_db_sqlite::SqliteRepo;

#[cfg(feature = "auth-simple")]
use rr_auth_simple::SimpleAuthProvider;

#[cfg(feature = "mail-local")]
use rr_mail_local::LocalOutboxMailer;

#[cfg(not(all(feature = "db-sqlite", feature = "auth-simple", feature = "mail-local")))]
compile_error!("rusty-reviews needs a storage, an auth and a mail plugin enabled");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("loading settings")?;
    init_tracing(&settings.log);

    // 1. Storage
    let repo = Arc::new(
        SqliteRepo::connect(&settings.database.url, settings.database.max_connections)
            .await
            .context("opening database")?,
    );

    // 2. Codes and tokens
    let auth = Arc::new(SimpleAuthProvider::new(
        settings.auth.secret.expose_secret(),
        Duration::seconds(settings.auth.token_ttl_secs),
        Duration::seconds(settings.auth.code_ttl_secs),
    )?);

    // 3. Outbound mail
    let mailer = Arc::new(LocalOutboxMailer::new(settings.mail.outbox_dir.clone()));

    let accounts = AccountService::new(repo.clone(), auth, mailer, settings.mail.from.clone());
    let state = AppState::new(accounts, repo.clone(), repo);
    let app = rr_api::router(state);

    let listener = TcpListener::bind(settings.bind_address())
        .await
        .with_context(|| format!("binding {}", settings.bind_address()))?;
    info!(addr = %listener.local_addr()?, "rusty-reviews listening");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    info!("rusty-reviews stopped");
    Ok(())
}

/// `RUST_LOG` wins over the configured filter.
fn init_tracing(log: &LogSettings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.filter));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if log.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
