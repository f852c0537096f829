use crate::domain::interval_math::clamp_hours;
use chrono::{Duration, Local, NaiveDate, NaiveDateTime, Timelike, Utc};
use chrono_tz::Tz;
use std::sync::Arc;

pub const DEFAULT_MARKER_OFFSET_PX: f64 = 22.0;
const TICK_MINUTES: u32 = 15;

pub type NowProvider = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

/// Wall clock in the configured zone, or the host zone when none is set.
pub fn system_now_provider(timezone: Option<Tz>) -> NowProvider {
    match timezone {
        Some(timezone) => Arc::new(move || Utc::now().with_timezone(&timezone).naive_local()),
        None => Arc::new(|| Local::now().naive_local()),
    }
}

/// Marker offset on the grid for `now`, or `None` when `date` is not today.
pub fn position_at(
    date: NaiveDate,
    now: NaiveDateTime,
    hour_height_px: f64,
    offset_px: f64,
) -> Option<f64> {
    if now.date() != date {
        return None;
    }
    let hours = clamp_hours(f64::from(now.hour()) + f64::from(now.minute()) / 60.0);
    Some(hours * hour_height_px - offset_px)
}

/// Next quarter-hour boundary strictly after `now`, with seconds zeroed.
pub fn next_tick_after(now: NaiveDateTime) -> NaiveDateTime {
    let truncated = now
        - Duration::seconds(i64::from(now.second()))
        - Duration::nanoseconds(i64::from(now.nanosecond()));
    let minutes_to_boundary = TICK_MINUTES - now.minute() % TICK_MINUTES;
    truncated + Duration::minutes(i64::from(minutes_to_boundary))
}

#[derive(Clone)]
pub struct TimeMarker {
    hour_height_px: f64,
    offset_px: f64,
    now_provider: NowProvider,
}

impl TimeMarker {
    pub fn new(hour_height_px: f64, offset_px: f64) -> Self {
        Self {
            hour_height_px,
            offset_px,
            now_provider: system_now_provider(None),
        }
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    pub fn now(&self) -> NaiveDateTime {
        (self.now_provider)()
    }

    pub fn today(&self) -> NaiveDate {
        self.now().date()
    }

    pub fn position_for_now(&self, date: NaiveDate) -> Option<f64> {
        position_at(date, self.now(), self.hour_height_px, self.offset_px)
    }

    pub fn delay_until_next_tick(&self) -> std::time::Duration {
        let now = self.now();
        (next_tick_after(now) - now)
            .to_std()
            .unwrap_or(std::time::Duration::ZERO)
    }
}
