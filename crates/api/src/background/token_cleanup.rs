//! Periodic purge of stale auth rows.
//!
//! Deletes expired or revoked refresh sessions and expired or consumed
//! verification and reset tokens on a fixed interval.

use std::time::Duration;

use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use vitashop_db::repositories::{SessionRepo, UserTokenRepo};

/// Run one cleanup pass, returning `(sessions, tokens)` deleted.
pub async fn cleanup_once(pool: &PgPool) -> Result<(u64, u64), sqlx::Error> {
    let sessions = SessionRepo::cleanup_expired(pool).await?;
    let tokens = UserTokenRepo::cleanup_expired(pool).await?;
    Ok((sessions, tokens))
}

/// Run the cleanup loop every `interval` until `cancel` is triggered.
pub async fn run(pool: PgPool, interval: Duration, cancel: CancellationToken) {
    tracing::info!(interval_secs = interval.as_secs(), "Token cleanup job started");

    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Token cleanup job stopping");
                break;
            }
            _ = ticker.tick() => {
                match cleanup_once(&pool).await {
                    Ok((0, 0)) => tracing::debug!("Token cleanup: nothing to purge"),
                    Ok((sessions, tokens)) => {
                        tracing::info!(sessions, tokens, "Token cleanup: purged stale rows");
                    }
                    Err(e) => tracing::error!(error = %e, "Token cleanup failed"),
                }
            }
        }
    }
}
