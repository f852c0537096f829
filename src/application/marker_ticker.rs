use crate::application::error::PlannerError;
use crate::domain::time_marker::TimeMarker;
use chrono::NaiveDate;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::sleep;

/// Owned quarter-hour timer for the "now" marker.
///
/// Emits the marker position right away and again at every quarter-hour
/// boundary. Once `date` is no longer today it emits `None` and stops.
/// Cancelling or dropping the handle stops the timer.
pub struct MarkerTicker {
    date: NaiveDate,
    task: JoinHandle<()>,
}

impl MarkerTicker {
    pub fn spawn<F>(
        marker: TimeMarker,
        date: NaiveDate,
        mut on_tick: F,
    ) -> Result<Self, PlannerError>
    where
        F: FnMut(Option<f64>) + Send + 'static,
    {
        let handle = Handle::try_current()
            .map_err(|error| PlannerError::Runtime(format!("marker ticker: {error}")))?;
        let task = handle.spawn(async move {
            loop {
                let position = marker.position_for_now(date);
                on_tick(position);
                if position.is_none() {
                    log::debug!("event=marker_ticker_stopped date={date} reason=not_today");
                    break;
                }
                sleep(marker.delay_until_next_tick()).await;
            }
        });
        log::debug!("event=marker_ticker_started date={date}");
        Ok(Self { date, task })
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn cancel(&self) {
        self.task.abort();
    }
}

impl Drop for MarkerTicker {
    fn drop(&mut self) {
        self.task.abort();
    }
}
