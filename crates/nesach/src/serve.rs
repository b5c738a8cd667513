// SPDX-FileCopyrightText: 2026 Nesach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `nesach serve` command implementation.
//!
//! Wires storage, the fulfillment dispatcher, and the mail transport into
//! the HTTP server and runs until interrupted.

use std::path::PathBuf;
use std::sync::Arc;

use nesach_config::model::NesachConfig;
use nesach_core::NesachError;
use nesach_dispatch::{Dispatcher, FulfillmentClient};
use nesach_email::{Mailer, NoopMailer, SmtpMailer};
use nesach_server::{start_server, AppState, AuthConfig, BindConfig};
use nesach_store::Database;
use tracing::info;

/// Runs the `nesach serve` command.
pub async fn run_serve(config: NesachConfig) -> Result<(), NesachError> {
    init_tracing(&config.server.log_level);

    info!("starting nesach serve");

    let db = Database::open(&config.storage.database_path).await?;
    info!(path = %config.storage.database_path, "database ready");

    let client = FulfillmentClient::new(&config.fulfillment)?;
    let dispatcher = Dispatcher::new(client, db.clone());

    let mailer: Arc<dyn Mailer> = if config.email.enabled {
        info!(host = %config.email.smtp_host, "SMTP mail enabled");
        Arc::new(SmtpMailer::new(&config.email)?)
    } else {
        info!("email disabled, notifications will be logged only");
        Arc::new(NoopMailer)
    };

    let state = AppState {
        db: db.clone(),
        dispatcher,
        mailer,
        auth: AuthConfig {
            api_token: config.server.api_token.clone(),
            admin_token: config.server.admin_token.clone(),
        },
        documents_dir: PathBuf::from(&config.storage.documents_dir),
        checkout_base_url: config.payment.checkout_base_url.clone(),
        webhook_secret: config.payment.webhook_secret.clone(),
    };

    let bind = BindConfig {
        host: config.server.host.clone(),
        port: config.server.port,
    };

    tokio::select! {
        result = start_server(&bind, state) => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("interrupt received, shutting down");
        }
    }

    db.close().await?;
    info!("nesach serve shutdown complete");
    Ok(())
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("nesach={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
