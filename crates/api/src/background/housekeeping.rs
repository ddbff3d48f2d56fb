//! Periodic removal of dead sessions and lapsed role grants.
//!
//! Expired and revoked sessions are deleted, and temporary role grants whose
//! `expires_at` has passed are removed. Reads already ignore both, so the
//! sweep only keeps the tables small.

use std::time::Duration;

use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use gatekeeper_db::repositories::{SessionRepo, UserRepo};

/// Run the housekeeping loop every `interval` until `cancel` is triggered.
pub async fn run(pool: PgPool, interval: Duration, cancel: CancellationToken) {
    tracing::info!(interval_secs = interval.as_secs(), "Housekeeping job started");

    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Housekeeping job stopping");
                break;
            }
            _ = ticker.tick() => {
                sweep(&pool).await;
            }
        }
    }
}

/// One pass. Failures are logged and retried on the next tick.
pub async fn sweep(pool: &PgPool) {
    match SessionRepo::cleanup_expired(pool).await {
        Ok(0) => tracing::debug!("Housekeeping: no dead sessions"),
        Ok(deleted) => tracing::info!(deleted, "Housekeeping: removed dead sessions"),
        Err(e) => tracing::error!(error = %e, "Housekeeping: session cleanup failed"),
    }

    match UserRepo::remove_expired_grants(pool).await {
        Ok(0) => tracing::debug!("Housekeeping: no lapsed role grants"),
        Ok(removed) => tracing::info!(removed, "Housekeeping: removed lapsed role grants"),
        Err(e) => tracing::error!(error = %e, "Housekeeping: grant cleanup failed"),
    }
}
