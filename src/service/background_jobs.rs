// service/background_jobs.rs
use std::sync::Arc;

use chrono::Utc;
use tokio::time::{interval, Duration};

use crate::{db::verificationdb::VerificationExt, AppState};

/// Deletes expired and consumed phone codes every hour.
pub async fn start_otp_cleanup_job(app_state: Arc<AppState>) {
    let mut interval = interval(Duration::from_secs(3600));

    loop {
        interval.tick().await;

        tracing::info!("Running OTP cleanup job at {}", Utc::now());

        match app_state.db_client.cleanup_expired_otps().await {
            Ok(removed) => tracing::info!("OTP cleanup job completed: {} codes removed", removed),
            Err(e) => tracing::error!("OTP cleanup job failed: {}", e),
        }

        let pruned = app_state.live.prune().await;
        if pruned > 0 {
            tracing::debug!("Pruned {} idle live topics", pruned);
        }
    }
}
