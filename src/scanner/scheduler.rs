use chrono::{DateTime, Local, Timelike};
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::Scanner;
use crate::catalog::settings;
use crate::config::SchedulerConfig;

/// Decides whether the nightly scan should start now.
pub fn is_scan_due(
    now: DateTime<Local>,
    enabled: bool,
    schedule_hour: i64,
    last_scan_at: Option<DateTime<Local>>,
    running: bool,
) -> bool {
    if !enabled || running {
        return false;
    }
    if i64::from(now.hour()) != schedule_hour {
        return false;
    }
    match last_scan_at {
        Some(last) => last.date_naive() != now.date_naive(),
        None => true,
    }
}

fn parse_last_scan(raw: &str) -> Option<DateTime<Local>> {
    DateTime::parse_from_rfc3339(raw.trim()).ok().map(|dt| dt.with_timezone(&Local))
}

async fn tick(scanner: &Scanner, cfg: &SchedulerConfig) {
    let pool = scanner.pool();
    let enabled = settings::get_bool(pool, settings::AUTO_SCAN_ENABLED, cfg.enabled).await;
    let hour = settings::get_int(pool, settings::SCAN_SCHEDULE_HOUR, i64::from(cfg.schedule_hour)).await;
    let last = settings::get_string(pool, settings::LAST_SCAN_AT, "").await;

    if is_scan_due(Local::now(), enabled, hour, parse_last_scan(&last), scanner.is_running()) {
        info!("Starting scheduled scan (hour {})", hour);
        scanner.trigger_scan();
    }
}

/// Spawns the scheduler loop. It ends when `cancel` fires.
pub fn spawn(scanner: Scanner, cfg: SchedulerConfig, cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs(cfg.tick_secs.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Scheduler stopped");
                    break;
                }
                _ = ticker.tick() => tick(&scanner, &cfg).await,
            }
        }
    })
}
