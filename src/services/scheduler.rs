// src/services/scheduler.rs
use log::{error, info, warn};
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};

use super::rankings::RankingsService;

// sec min hour day-of-month month day-of-week (UTC)
pub const MONTHLY_WARMUP_SCHEDULE: &str = "0 0 6 1 * *";

#[derive(Debug, Clone, PartialEq)]
pub enum WarmupOutcome {
    AlreadyCached,
    Fetched,
    /// Upstream failed and only an earlier month's snapshot is available.
    FellBack(String),
    Failed,
}

/// Loads the new month's rankings ahead of the first request.
pub async fn warm_rankings(service: &RankingsService) -> WarmupOutcome {
    let month = service.current_month();
    match service.get_rankings(false).await {
        Ok(response) if response.month != month => {
            warn!(
                "Rankings for {} unavailable; fell back to snapshot from {}",
                month, response.month
            );
            WarmupOutcome::FellBack(response.month)
        }
        Ok(response) if response.cached => {
            info!("Rankings for {} already cached (stale: {})", month, response.stale);
            WarmupOutcome::AlreadyCached
        }
        Ok(_) => {
            info!("Rankings for {} fetched and stored", month);
            WarmupOutcome::Fetched
        }
        Err(e) => {
            error!("Monthly rankings warm-up for {} failed: {}", month, e);
            WarmupOutcome::Failed
        }
    }
}

pub async fn start_monthly_warmup(service: Arc<RankingsService>) -> anyhow::Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    let job = Job::new_async(MONTHLY_WARMUP_SCHEDULE, move |_uuid, _scheduler| {
        let service = service.clone();
        Box::pin(async move {
            warm_rankings(&service).await;
        })
    })?;
    scheduler.add(job).await?;
    scheduler.start().await?;

    info!("Monthly rankings warm-up scheduled ({})", MONTHLY_WARMUP_SCHEDULE);
    Ok(scheduler)
}
