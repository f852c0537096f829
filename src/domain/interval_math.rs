//! Pure geometry for the 24h time axis.
//!
//! Every check here reports rejection as `None` instead of an error: during a
//! drag most candidate positions near the day boundaries are momentarily
//! invalid, and the caller simply keeps the last valid position.

pub const HOURS_PER_DAY: f64 = 24.0;
pub const MIN_DURATION_HOURS: f64 = 0.25;
const QUARTERS_PER_HOUR: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeRange {
    pub start: f64,
    pub end: f64,
}

impl TimeRange {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

pub fn to_pixel_y(time_hours: f64, hour_height_px: f64) -> i32 {
    (time_hours * hour_height_px).round() as i32
}

pub fn to_time_hours(pixel_y: f64, hour_height_px: f64) -> f64 {
    pixel_y / hour_height_px
}

pub fn snap_quarter_hour(time_hours: f64) -> f64 {
    (time_hours * QUARTERS_PER_HOUR).round() / QUARTERS_PER_HOUR
}

pub fn clamp_hours(time_hours: f64) -> f64 {
    time_hours.clamp(0.0, HOURS_PER_DAY)
}

/// New start for a top-edge resize, if it keeps the minimum duration.
pub fn resize_top(original: TimeRange, new_time: f64) -> Option<f64> {
    (0.0 <= new_time && new_time < original.end - MIN_DURATION_HOURS).then_some(new_time)
}

/// New end for a bottom-edge resize, if it keeps the minimum duration.
pub fn resize_bottom(original: TimeRange, new_time: f64) -> Option<f64> {
    (original.start + MIN_DURATION_HOURS < new_time && new_time <= HOURS_PER_DAY)
        .then_some(new_time)
}

/// Shifts the whole range; moves that leave the day are rejected, never clamped.
pub fn translate(original: TimeRange, delta_hours: f64) -> Option<TimeRange> {
    let moved = TimeRange::new(original.start + delta_hours, original.end + delta_hours);
    (moved.start >= 0.0 && moved.end <= HOURS_PER_DAY).then_some(moved)
}
