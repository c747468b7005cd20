//! Forum actions and the `?action=<name>;sa=<sub>` dispatcher.

pub mod alerts;
pub mod attachments;
pub mod auth;
pub mod boards;
pub mod dispatch;
pub mod error;
pub mod lang;
pub mod move_topic;
pub mod notify;
pub mod post;
pub mod search;
pub mod session;

use axum::{
    Router,
    routing::{get, post},
};
use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::{error, warn};

pub use auth::{AppState, AppStateInner};
pub use error::ActionError;

/// Routes served by the forum. Layers (CORS, tracing) are added by the binary.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(dispatch::dispatch).post(dispatch::dispatch))
        .route("/index.php", get(dispatch::dispatch).post(dispatch::dispatch))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .with_state(state)
}

/// Runs blocking database work off the async runtime.
pub(crate) async fn run_blocking<F, T>(f: F) -> Result<T, ActionError>
where
    F: FnOnce() -> Result<T, ActionError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ActionError::Internal(anyhow::anyhow!("blocking task failed: {}", e))
    })?
}

/// SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without timezone.
pub(crate) fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc()))
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}': {}", raw, e);
            DateTime::default()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_timestamps_parse_as_utc() {
        let ts = parse_timestamp("2026-03-01 12:30:00");
        assert_eq!(ts.to_rfc3339(), "2026-03-01T12:30:00+00:00");
        assert_eq!(parse_timestamp("garbage"), DateTime::<Utc>::default());
    }
}
