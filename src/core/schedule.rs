use crate::core::{Clock, StatusSink};
use chrono::{DateTime, Local};
use std::time::Duration;

const TICK: Duration = Duration::from_secs(1);

/// 排程閘門：在指定時間之前每秒更新倒數，不接受取消
pub struct ScheduledStartGate<'a> {
    clock: &'a dyn Clock,
    status: &'a dyn StatusSink,
}

impl<'a> ScheduledStartGate<'a> {
    pub fn new(clock: &'a dyn Clock, status: &'a dyn StatusSink) -> Self {
        Self { clock, status }
    }

    /// Returns how many one-second ticks were spent waiting.
    pub async fn wait(&self, scheduled_instant: Option<DateTime<Local>>) -> u64 {
        let Some(start_at) = scheduled_instant else {
            return 0;
        };

        let mut ticks = 0;
        loop {
            let now = self.clock.now();
            if now >= start_at {
                break;
            }

            let message = format!(
                "Starting in {}... Please don't touch anything in the meantime!",
                format_remaining(start_at - now)
            );
            self.status.set_status(&message).await;

            self.clock.sleep(TICK).await;
            ticks += 1;
        }

        if ticks > 0 {
            tracing::info!("⏰ Scheduled start reached after {} tick(s)", ticks);
        }
        ticks
    }
}

/// `HH:MM:SS`, hours are not wrapped at 24.
pub fn format_remaining(remaining: chrono::Duration) -> String {
    let total = remaining.num_seconds().max(0);
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_support::{FakeClock, RecordingStatus};

    #[tokio::test]
    async fn test_no_schedule_never_polls() {
        let clock = FakeClock::new(Local::now());
        let status = RecordingStatus::new();

        let ticks = ScheduledStartGate::new(&clock, &status).wait(None).await;

        assert_eq!(ticks, 0);
        assert!(clock.sleeps().is_empty());
        assert!(status.messages().is_empty());
    }

    #[tokio::test]
    async fn test_past_instant_never_polls() {
        let now = Local::now();
        let clock = FakeClock::new(now);
        let status = RecordingStatus::new();

        let ticks = ScheduledStartGate::new(&clock, &status)
            .wait(Some(now - chrono::Duration::minutes(5)))
            .await;

        assert_eq!(ticks, 0);
        assert!(clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_counts_down_each_second() {
        let now = Local::now();
        let clock = FakeClock::new(now);
        let status = RecordingStatus::new();

        let ticks = ScheduledStartGate::new(&clock, &status)
            .wait(Some(now + chrono::Duration::seconds(3)))
            .await;

        assert_eq!(ticks, 3);
        assert_eq!(clock.sleeps(), vec![TICK; 3]);
        assert_eq!(
            status.messages()[0],
            "Starting in 00:00:03... Please don't touch anything in the meantime!"
        );
        assert!(status.messages()[2].starts_with("Starting in 00:00:01"));
    }

    #[test]
    fn test_format_remaining() {
        assert_eq!(format_remaining(chrono::Duration::seconds(59)), "00:00:59");
        assert_eq!(format_remaining(chrono::Duration::seconds(3_725)), "01:02:05");
        assert_eq!(format_remaining(chrono::Duration::hours(30)), "30:00:00");
    }
}
