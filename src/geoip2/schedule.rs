//! Cron-driven database refresh / 基于cron的数据库刷新

use super::{GeoIpClient, GeoIpError, GeoIpResult};
use chrono::{DateTime, Utc};
use cron::Schedule;
use std::str::FromStr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Periodic `update_db` runner / 周期性执行`update_db`
#[derive(Debug, Clone)]
pub struct RefreshScheduler {
    schedule: Schedule,
}

impl RefreshScheduler {
    /// Parse a six or seven field cron expression / 解析六或七字段的cron表达式
    pub fn new(expression: &str) -> GeoIpResult<Self> {
        let schedule = Schedule::from_str(expression)
            .map_err(|e| GeoIpError::Schedule(format!("{}: {}", expression, e)))?;
        Ok(Self { schedule })
    }

    /// Next fire time after `now` / `now`之后的下一次触发时间
    pub fn next_after(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(&now).next()
    }

    /// Run refreshes until `token` is cancelled / 持续刷新直到令牌被取消
    pub fn spawn(self, client: Arc<GeoIpClient>, token: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let Some(next) = self.next_after(Utc::now()) else {
                    info!("Refresh schedule has no further fire times");
                    break;
                };
                let wait = (next - Utc::now()).to_std().unwrap_or_default();
                info!("Next database refresh at {}", next);

                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(wait) => {
                        if let Err(e) = client.update_db().await {
                            error!("Scheduled database refresh failed: {}", e);
                        }
                    }
                }
            }
            info!("Refresh scheduler stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone, Timelike, Weekday};

    #[test]
    fn test_weekly_schedule() {
        // Test default weekly schedule / 测试默认每周计划
        let scheduler = RefreshScheduler::new(crate::geoip2::DEFAULT_UPDATE_SCHEDULE).unwrap();
        // Monday 2024-01-01 00:00 UTC
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let next = scheduler.next_after(now).unwrap();
        assert_eq!(next.weekday(), Weekday::Wed);
        assert_eq!((next.hour(), next.minute(), next.second()), (2, 30, 0));
        assert_eq!(next.day(), 3);
    }

    #[test]
    fn test_invalid_expression() {
        assert!(matches!(
            RefreshScheduler::new("every tuesday"),
            Err(GeoIpError::Schedule(_))
        ));
    }

    #[tokio::test]
    async fn test_spawn_stops_on_cancel() {
        // Test cancellation / 测试取消
        let client = Arc::new(GeoIpClient::new(Default::default()).unwrap());
        let scheduler = RefreshScheduler::new("0 0 0 1 1 * 2099").unwrap();
        let token = CancellationToken::new();
        let handle = scheduler.spawn(client, token.clone());
        token.cancel();
        tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
