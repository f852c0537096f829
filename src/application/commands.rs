use crate::application::bootstrap::{BootstrapResult, bootstrap_workspace};
use crate::application::error::PlannerError;
use crate::application::marker_ticker::MarkerTicker;
use crate::application::priorities::PriorityList;
use crate::application::save_queue::SaveQueue;
use crate::application::schedule_store::ScheduleStore;
use crate::domain::interaction::{
    HitTarget, InteractionController, PointerFeedback, Released, SessionStart, TaskVisualUpdate,
};
use crate::domain::models::{PriorityTask, Task, TaskInput, date_key, parse_date_key};
use crate::domain::time_marker::{NowProvider, TimeMarker, system_now_provider};
use crate::infrastructure::config::{PlannerConfig, SaveMode};
use crate::infrastructure::document_store::{DocumentSection, JsonFileDocumentStore};
use crate::infrastructure::error::PersistenceError;
use chrono::{Duration, NaiveDate};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

pub struct PlannerState {
    config_dir: PathBuf,
    data_path: PathBuf,
    config: PlannerConfig,
    marker: TimeMarker,
    save_queue: Option<SaveQueue>,
    runtime: Mutex<RuntimeState>,
}

impl PlannerState {
    /// Bootstraps `workspace_root` and opens today's date.
    ///
    /// With `saveMode: background` this must run inside a tokio runtime.
    pub fn new(workspace_root: PathBuf) -> Result<Self, PlannerError> {
        Self::from_bootstrap(bootstrap_workspace(&workspace_root)?)
    }

    /// Opens today's date on an already bootstrapped workspace.
    pub fn from_bootstrap(bootstrap: BootstrapResult) -> Result<Self, PlannerError> {
        let config = bootstrap.config;
        let port = Arc::new(JsonFileDocumentStore::new(&bootstrap.data_path));

        let marker = TimeMarker::new(config.layout.hour_height_px, config.layout.marker_offset_px)
            .with_now_provider(system_now_provider(config.timezone));
        let save_queue = match config.save_mode {
            SaveMode::Inline => None,
            SaveMode::Background => {
                Some(SaveQueue::spawn(Arc::clone(&port), config.retry.clone())?)
            }
        };
        let runtime = RuntimeState {
            current_date: marker.today(),
            schedules: ScheduleStore::new(Arc::clone(&port)),
            priorities: PriorityList::new(port),
            controller: InteractionController::new(config.layout.geometry()),
        };

        log::info!(
            "event=planner_open root={} data={} save_mode={:?}",
            bootstrap.workspace_root.display(),
            bootstrap.data_path.display(),
            config.save_mode
        );
        Ok(Self {
            config_dir: bootstrap.config_dir,
            data_path: bootstrap.data_path,
            config,
            marker,
            save_queue,
            runtime: Mutex::new(runtime),
        })
    }

    /// Replaces the wall clock and moves the current date to its today.
    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.marker = self.marker.with_now_provider(now_provider);
        let today = self.marker.today();
        if let Ok(runtime) = self.runtime.get_mut() {
            runtime.current_date = today;
        }
        self
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    pub fn command_error(&self, command: &str, error: &PlannerError) -> String {
        self.log_error(command, &error.to_string());
        error.to_string()
    }

    pub fn log_info(&self, command: &str, message: &str) {
        log::info!(target: "dayblock::commands", "command={command} {message}");
    }

    pub fn log_error(&self, command: &str, message: &str) {
        log::error!(target: "dayblock::commands", "command={command} {message}");
    }

    /// Writes out queued background saves and stops the save worker. Hosts
    /// call this before tearing down their runtime; with inline saving there
    /// is nothing to drain.
    pub async fn shutdown(self) -> Result<(), PlannerError> {
        if let Some(queue) = self.save_queue {
            queue.shutdown().await?;
            log::info!("event=planner_shutdown save_queue=drained");
        }
        Ok(())
    }

    /// Starts the "now" marker timer for the current date.
    pub fn spawn_marker_ticker<F>(&self, on_tick: F) -> Result<MarkerTicker, PlannerError>
    where
        F: FnMut(Option<f64>) + Send + 'static,
    {
        let date = lock_runtime(self)?.current_date;
        MarkerTicker::spawn(self.marker.clone(), date, on_tick)
    }

    fn persist_tasks(
        &self,
        runtime: &RuntimeState,
        date: NaiveDate,
    ) -> Result<(), PersistenceError> {
        match &self.save_queue {
            Some(queue) => queue.enqueue(
                date_key(date),
                DocumentSection::Tasks(runtime.schedules.records(date)),
            ),
            None => runtime.schedules.save(date),
        }
    }

    fn persist_priorities(
        &self,
        runtime: &RuntimeState,
        date: NaiveDate,
    ) -> Result<(), PersistenceError> {
        match &self.save_queue {
            Some(queue) => queue.enqueue(date_key(date), runtime.priorities.section(date)),
            None => runtime.priorities.save(date),
        }
    }
}

struct RuntimeState {
    current_date: NaiveDate,
    schedules: ScheduleStore<JsonFileDocumentStore>,
    priorities: PriorityList<JsonFileDocumentStore>,
    controller: InteractionController,
}

/// End of a drag or resize. The release always reaches the view; a failed
/// save is reported next to it and the change stays in memory until the
/// next successful save.
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseOutcome {
    pub released: Released,
    pub save_error: Option<String>,
}

/// Everything the view needs to redraw after switching dates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayView {
    pub date: String,
    pub tasks: Vec<Task>,
    pub visuals: Vec<TaskVisualUpdate>,
    pub top_tasks: Vec<PriorityTask>,
    pub marker_y: Option<f64>,
}

pub fn current_date_impl(state: &PlannerState) -> Result<String, PlannerError> {
    Ok(date_key(lock_runtime(state)?.current_date))
}

pub fn create_task_impl(
    state: &PlannerState,
    name: String,
    start: f64,
    end: f64,
) -> Result<Task, PlannerError> {
    let input = TaskInput::new(name, start, end);
    let mut runtime = lock_runtime(state)?;
    let date = runtime.current_date;
    let task = runtime.schedules.add_task(date, &input)?;
    state.persist_tasks(&runtime, date)?;
    drop(runtime);

    state.log_info(
        "create_task",
        &format!("created task_id={} date={}", task.id, date_key(date)),
    );
    Ok(task)
}

pub fn update_task_impl(
    state: &PlannerState,
    task_id: String,
    name: String,
    start: f64,
    end: f64,
) -> Result<Task, PlannerError> {
    let task_id = required_task_id(&task_id)?;
    let input = TaskInput::new(name, start, end);
    let mut runtime = lock_runtime(state)?;
    let date = runtime.current_date;
    let task = runtime.schedules.update_task(date, task_id, &input)?;
    state.persist_tasks(&runtime, date)?;
    drop(runtime);

    state.log_info("update_task", &format!("updated task_id={task_id}"));
    Ok(task)
}

pub fn delete_task_impl(state: &PlannerState, task_id: String) -> Result<bool, PlannerError> {
    let task_id = required_task_id(&task_id)?;
    let mut guard = lock_runtime(state)?;
    let runtime = &mut *guard;
    let date = runtime.current_date;

    if runtime.schedules.remove_task(date, task_id)?.is_none() {
        return Ok(false);
    }
    if runtime
        .controller
        .session()
        .is_some_and(|session| session.active_task_id == task_id)
    {
        let _ = runtime.controller.on_pointer_cancel(runtime.schedules.load(date)?);
    }
    state.persist_tasks(runtime, date)?;
    drop(guard);

    state.log_info("delete_task", &format!("deleted task_id={task_id}"));
    Ok(true)
}

/// Tasks of `date`, or of the current date when none is given.
pub fn list_time_blocks_impl(
    state: &PlannerState,
    date: Option<String>,
) -> Result<Vec<Task>, PlannerError> {
    let mut runtime = lock_runtime(state)?;
    let date = match date {
        Some(value) => parse_date_input(&value)?,
        None => runtime.current_date,
    };
    Ok(runtime.schedules.load(date)?.tasks().to_vec())
}

pub fn task_visuals_impl(state: &PlannerState) -> Result<Vec<TaskVisualUpdate>, PlannerError> {
    let mut guard = lock_runtime(state)?;
    let runtime = &mut *guard;
    let schedule = runtime.schedules.load(runtime.current_date)?;
    Ok(runtime.controller.visuals(schedule))
}

pub fn pointer_down_impl(
    state: &PlannerState,
    pointer_y: f64,
    task_id: Option<String>,
) -> Result<SessionStart, PlannerError> {
    let hit = HitTarget::from_task_id(task_id.as_deref());
    let mut guard = lock_runtime(state)?;
    let runtime = &mut *guard;
    let schedule = runtime.schedules.load(runtime.current_date)?;
    Ok(runtime.controller.on_pointer_down(schedule, pointer_y, &hit))
}

pub fn pointer_move_impl(
    state: &PlannerState,
    pointer_y: f64,
    hover_task_id: Option<String>,
) -> Result<PointerFeedback, PlannerError> {
    let hover = HitTarget::from_task_id(hover_task_id.as_deref());
    let mut guard = lock_runtime(state)?;
    let runtime = &mut *guard;
    let schedule = runtime.schedules.schedule_mut(runtime.current_date)?;
    Ok(runtime.controller.on_pointer_move(schedule, pointer_y, &hover))
}

/// Ends the drag or resize and saves the current date.
pub fn pointer_release_impl(
    state: &PlannerState,
    pointer_y: f64,
) -> Result<Option<ReleaseOutcome>, PlannerError> {
    let mut guard = lock_runtime(state)?;
    let runtime = &mut *guard;
    let date = runtime.current_date;
    let schedule = runtime.schedules.load(date)?;
    let Some(released) = runtime.controller.on_pointer_release(schedule, pointer_y) else {
        return Ok(None);
    };
    let outcome = save_released(state, runtime, date, "pointer_release", released);
    drop(guard);
    Ok(Some(outcome))
}

/// Resolves a session whose release never arrived, as if it had been released.
pub fn pointer_cancel_impl(state: &PlannerState) -> Result<Option<ReleaseOutcome>, PlannerError> {
    let mut guard = lock_runtime(state)?;
    let outcome = resolve_session(state, &mut guard, "pointer_cancel")?;
    drop(guard);
    Ok(outcome)
}

pub fn change_date_impl(state: &PlannerState, date: String) -> Result<DayView, PlannerError> {
    let date = parse_date_input(&date)?;
    let mut guard = lock_runtime(state)?;
    let view = switch_date(state, &mut guard, date)?;
    drop(guard);

    state.log_info("change_date", &format!("date={}", view.date));
    Ok(view)
}

pub fn shift_date_impl(state: &PlannerState, days: i64) -> Result<DayView, PlannerError> {
    let mut guard = lock_runtime(state)?;
    let target = Duration::try_days(days)
        .and_then(|delta| guard.current_date.checked_add_signed(delta))
        .ok_or_else(|| PlannerError::InvalidInput(format!("date shift out of range: {days}")))?;
    let view = switch_date(state, &mut guard, target)?;
    drop(guard);

    state.log_info("shift_date", &format!("days={days} date={}", view.date));
    Ok(view)
}

pub fn go_to_today_impl(state: &PlannerState) -> Result<DayView, PlannerError> {
    let today = state.marker.today();
    let mut guard = lock_runtime(state)?;
    let view = switch_date(state, &mut guard, today)?;
    drop(guard);

    state.log_info("go_to_today", &format!("date={}", view.date));
    Ok(view)
}

pub fn list_top_tasks_impl(state: &PlannerState) -> Result<Vec<PriorityTask>, PlannerError> {
    let mut runtime = lock_runtime(state)?;
    let date = runtime.current_date;
    Ok(runtime.priorities.load(date)?.to_vec())
}

pub fn toggle_top_task_impl(
    state: &PlannerState,
    index: usize,
) -> Result<PriorityTask, PlannerError> {
    let mut runtime = lock_runtime(state)?;
    let date = runtime.current_date;
    let item = runtime.priorities.toggle(date, index)?;
    state.persist_priorities(&runtime, date)?;
    drop(runtime);

    state.log_info(
        "toggle_top_task",
        &format!("index={index} completed={}", item.completed),
    );
    Ok(item)
}

pub fn edit_top_task_impl(
    state: &PlannerState,
    index: usize,
    text: String,
) -> Result<PriorityTask, PlannerError> {
    let mut runtime = lock_runtime(state)?;
    let date = runtime.current_date;
    let item = runtime.priorities.edit(date, index, &text)?;
    state.persist_priorities(&runtime, date)?;
    drop(runtime);

    state.log_info("edit_top_task", &format!("index={index}"));
    Ok(item)
}

/// Marker offset for the current date; `None` unless it is today.
pub fn time_marker_impl(state: &PlannerState) -> Result<Option<f64>, PlannerError> {
    let date = lock_runtime(state)?.current_date;
    Ok(state.marker.position_for_now(date))
}

/// Waits for queued background saves; a no-op with inline saving.
pub async fn flush_saves_impl(state: &PlannerState) -> Result<(), PlannerError> {
    if let Some(queue) = &state.save_queue {
        queue.flush().await?;
    }
    Ok(())
}

fn lock_runtime(state: &PlannerState) -> Result<MutexGuard<'_, RuntimeState>, PlannerError> {
    state.runtime.lock().map_err(|error| {
        PlannerError::Persistence(PersistenceError::LockPoisoned(format!(
            "runtime lock poisoned: {error}"
        )))
    })
}

fn resolve_session(
    state: &PlannerState,
    runtime: &mut RuntimeState,
    command: &str,
) -> Result<Option<ReleaseOutcome>, PlannerError> {
    let date = runtime.current_date;
    let schedule = runtime.schedules.load(date)?;
    let Some(released) = runtime.controller.on_pointer_cancel(schedule) else {
        return Ok(None);
    };
    Ok(Some(save_released(state, runtime, date, command, released)))
}

/// The session is already over here, so a failed save must not swallow the
/// release.
fn save_released(
    state: &PlannerState,
    runtime: &RuntimeState,
    date: NaiveDate,
    command: &str,
    released: Released,
) -> ReleaseOutcome {
    let save_error = match state.persist_tasks(runtime, date) {
        Ok(()) => {
            state.log_info(
                command,
                &format!("saved task_id={} date={}", released.task_id, date_key(date)),
            );
            None
        }
        Err(error) => {
            state.log_error(
                command,
                &format!("save failed task_id={} error={error}", released.task_id),
            );
            Some(error.to_string())
        }
    };
    ReleaseOutcome {
        released,
        save_error,
    }
}

fn switch_date(
    state: &PlannerState,
    runtime: &mut RuntimeState,
    date: NaiveDate,
) -> Result<DayView, PlannerError> {
    resolve_session(state, runtime, "switch_date")?;
    runtime.current_date = date;

    let top_tasks = runtime.priorities.load(date)?.to_vec();
    let schedule = runtime.schedules.load(date)?;
    Ok(DayView {
        date: date_key(date),
        tasks: schedule.tasks().to_vec(),
        visuals: runtime.controller.visuals(schedule),
        top_tasks,
        marker_y: state.marker.position_for_now(date),
    })
}

fn required_task_id(task_id: &str) -> Result<&str, PlannerError> {
    let task_id = task_id.trim();
    if task_id.is_empty() {
        return Err(PlannerError::InvalidInput(
            "task_id must not be empty".to_string(),
        ));
    }
    Ok(task_id)
}

fn parse_date_input(value: &str) -> Result<NaiveDate, PlannerError> {
    parse_date_key(value)
        .ok_or_else(|| PlannerError::InvalidInput(format!("date must be YYYY-MM-DD: {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::interaction::{PointerZone, TaskStyle};
    use crate::infrastructure::document_store::{DayDocument, DocumentStore};
    use chrono::NaiveDateTime;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static NEXT_TEMP_WORKSPACE: AtomicUsize = AtomicUsize::new(0);

    struct TempWorkspace {
        path: PathBuf,
    }

    impl TempWorkspace {
        fn new() -> Self {
            let sequence = NEXT_TEMP_WORKSPACE.fetch_add(1, Ordering::Relaxed);
            let path = std::env::temp_dir().join(format!(
                "dayblock-command-tests-{}-{}",
                std::process::id(),
                sequence
            ));
            fs::create_dir_all(&path).expect("create temp workspace");
            Self { path }
        }

        fn planner_state(&self) -> PlannerState {
            PlannerState::new(self.path.clone())
                .expect("initialize planner state")
                .with_now_provider(fixed_clock("2024-01-15 10:30:00"))
        }

        fn stored(&self, date: &str) -> Option<DayDocument> {
            JsonFileDocumentStore::new(self.path.join("state").join("tasks.json"))
                .read(date)
                .expect("read data file")
        }
    }

    impl Drop for TempWorkspace {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.path);
        }
    }

    fn fixed_clock(value: &str) -> NowProvider {
        let now = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S").expect("valid time");
        Arc::new(move || now)
    }

    #[test]
    fn create_task_rejects_invalid_input() {
        let workspace = TempWorkspace::new();
        let state = workspace.planner_state();

        assert!(matches!(
            create_task_impl(&state, "   ".to_string(), 9.0, 10.0),
            Err(PlannerError::Validation(_))
        ));
        assert!(matches!(
            create_task_impl(&state, "Nap".to_string(), 13.0, 13.1),
            Err(PlannerError::Validation(_))
        ));
        assert!(workspace.stored("2024-01-15").is_none());
    }

    #[test]
    fn create_update_delete_persist_immediately() {
        let workspace = TempWorkspace::new();
        let state = workspace.planner_state();

        let created = create_task_impl(&state, "Standup".to_string(), 9.0, 9.5).expect("create");
        let stored = workspace.stored("2024-01-15").expect("document");
        assert_eq!(stored.tasks.len(), 1);
        assert_eq!(stored.tasks[0].name, "Standup");

        let updated = update_task_impl(&state, created.id.clone(), "Sync".to_string(), 9.0, 10.0)
            .expect("update");
        assert_eq!(updated.id, created.id);
        assert_eq!(workspace.stored("2024-01-15").expect("document").tasks[0].end_time, 10.0);

        assert!(delete_task_impl(&state, created.id.clone()).expect("delete"));
        assert!(!delete_task_impl(&state, created.id).expect("delete again"));
        assert!(workspace.stored("2024-01-15").expect("document").tasks.is_empty());
    }

    #[test]
    fn update_of_unknown_task_is_reported() {
        let workspace = TempWorkspace::new();
        let state = workspace.planner_state();

        let result = update_task_impl(&state, "blk-missing".to_string(), "X".to_string(), 1.0, 2.0);
        assert!(matches!(result, Err(PlannerError::TaskNotFound(_))));
        assert!(matches!(
            update_task_impl(&state, " ".to_string(), "X".to_string(), 1.0, 2.0),
            Err(PlannerError::InvalidInput(_))
        ));
    }

    #[test]
    fn drag_persists_only_on_release() {
        let workspace = TempWorkspace::new();
        let state = workspace.planner_state();
        let task = create_task_impl(&state, "Focus".to_string(), 9.0, 11.0).expect("create");

        let start = pointer_down_impl(&state, 300.0, Some(task.id.clone())).expect("down");
        assert!(matches!(start, SessionStart::Started { .. }));

        let feedback = pointer_move_impl(&state, 364.0, Some(task.id.clone())).expect("move");
        let update = feedback.update.expect("moved");
        assert_eq!((update.pixel_top, update.pixel_bottom), (352, 416));
        assert_eq!(
            workspace.stored("2024-01-15").expect("document").tasks[0].start_time,
            9.0
        );

        let outcome = pointer_release_impl(&state, 364.0)
            .expect("release")
            .expect("session ended");
        assert_eq!(outcome.released.task_id, task.id);
        assert_eq!(outcome.save_error, None);
        let stored = workspace.stored("2024-01-15").expect("document");
        assert_eq!((stored.tasks[0].start_time, stored.tasks[0].end_time), (11.0, 13.0));

        assert_eq!(pointer_release_impl(&state, 364.0).expect("idle release"), None);
    }

    #[test]
    fn second_pointer_down_is_busy() {
        let workspace = TempWorkspace::new();
        let state = workspace.planner_state();
        let first = create_task_impl(&state, "A".to_string(), 9.0, 10.0).expect("create");
        let second = create_task_impl(&state, "B".to_string(), 14.0, 15.0).expect("create");

        pointer_down_impl(&state, 300.0, Some(first.id)).expect("down");
        let busy = pointer_down_impl(&state, 464.0, Some(second.id)).expect("second down");
        assert_eq!(busy, SessionStart::Busy);
        assert_eq!(
            pointer_down_impl(&state, 10.0, None).expect("background"),
            SessionStart::Busy
        );
    }

    #[test]
    fn hover_reports_resize_cursor_when_idle() {
        let workspace = TempWorkspace::new();
        let state = workspace.planner_state();
        let task = create_task_impl(&state, "Focus".to_string(), 9.0, 11.0).expect("create");

        let feedback = pointer_move_impl(&state, 351.0, Some(task.id)).expect("hover");
        assert_eq!(feedback.update, None);
        assert_eq!(feedback.cursor.zone, PointerZone::BottomEdge);
        assert!(feedback.cursor.is_resize());
    }

    #[test]
    fn changing_date_resolves_active_session_and_loads_new_day() {
        let workspace = TempWorkspace::new();
        let state = workspace.planner_state();
        let task = create_task_impl(&state, "Focus".to_string(), 9.0, 11.0).expect("create");

        pointer_down_impl(&state, 352.0, Some(task.id.clone())).expect("down on bottom edge");
        pointer_move_impl(&state, 400.0, Some(task.id.clone())).expect("resize");

        let view = change_date_impl(&state, "2024-01-16".to_string()).expect("change date");
        assert_eq!(view.date, "2024-01-16");
        assert!(view.tasks.is_empty());
        assert_eq!(view.top_tasks.len(), 3);
        assert_eq!(view.marker_y, None);

        let stored = workspace.stored("2024-01-15").expect("document");
        assert_eq!(stored.tasks[0].end_time, 12.5);
        assert_eq!(pointer_release_impl(&state, 400.0).expect("release"), None);

        let back = shift_date_impl(&state, -1).expect("shift back");
        assert_eq!(back.date, "2024-01-15");
        assert_eq!(back.visuals.len(), 1);
        assert_eq!(back.visuals[0].style, TaskStyle::Normal);
        assert_eq!(back.marker_y, Some(10.5 * 32.0 - 22.0));
    }

    #[test]
    fn go_to_today_returns_to_clock_date() {
        let workspace = TempWorkspace::new();
        let state = workspace.planner_state();

        change_date_impl(&state, "2023-12-31".to_string()).expect("change date");
        assert_eq!(time_marker_impl(&state).expect("marker"), None);

        let view = go_to_today_impl(&state).expect("today");
        assert_eq!(view.date, "2024-01-15");
        assert_eq!(current_date_impl(&state).expect("current"), "2024-01-15");
        assert_eq!(time_marker_impl(&state).expect("marker"), Some(314.0));

        assert!(matches!(
            change_date_impl(&state, "15/01/2024".to_string()),
            Err(PlannerError::InvalidInput(_))
        ));
    }

    #[test]
    fn top_tasks_are_seeded_toggled_and_edited() {
        let workspace = TempWorkspace::new();
        let state = workspace.planner_state();

        let items = list_top_tasks_impl(&state).expect("list");
        assert_eq!(items[2].text, "Click to add priority task 3");

        let toggled = toggle_top_task_impl(&state, 0).expect("toggle");
        assert!(toggled.completed);
        edit_top_task_impl(&state, 0, "Ship the release".to_string()).expect("edit");
        assert!(edit_top_task_impl(&state, 0, " ".to_string()).is_err());
        assert!(toggle_top_task_impl(&state, 7).is_err());

        let stored = workspace.stored("2024-01-15").expect("document");
        assert_eq!(stored.top_tasks[0].text, "Ship the release");
        assert!(stored.top_tasks[0].completed);
    }

    #[test]
    fn command_error_returns_message() {
        let workspace = TempWorkspace::new();
        let state = workspace.planner_state();

        let message = state.command_error(
            "update_task",
            &PlannerError::TaskNotFound("blk-1".to_string()),
        );
        assert_eq!(message, "task not found: blk-1");
    }

    #[test]
    fn list_time_blocks_reads_other_dates_without_switching() {
        let workspace = TempWorkspace::new();
        let state = workspace.planner_state();
        create_task_impl(&state, "Review".to_string(), 16.0, 17.0).expect("create");
        change_date_impl(&state, "2024-01-20".to_string()).expect("change date");

        let listed = list_time_blocks_impl(&state, Some("2024-01-15".to_string())).expect("list");
        assert_eq!(listed.len(), 1);
        assert!(list_time_blocks_impl(&state, None).expect("list current").is_empty());
        assert_eq!(current_date_impl(&state).expect("current"), "2024-01-20");
    }

    #[tokio::test]
    async fn background_mode_writes_after_flush() {
        let workspace = TempWorkspace::new();
        fs::create_dir_all(workspace.path.join("config")).expect("config dir");
        fs::write(
            workspace.path.join("config").join("persistence.json"),
            r#"{
                "schema": 1,
                "saveMode": "background",
                "retry": {"maxAttempts": 2, "baseDelayMs": 1}
            }"#,
        )
        .expect("write persistence config");
        let state = workspace.planner_state();
        assert_eq!(state.config().save_mode, SaveMode::Background);

        create_task_impl(&state, "Deep work".to_string(), 8.0, 10.0).expect("create");
        flush_saves_impl(&state).await.expect("flush");

        let stored = workspace.stored("2024-01-15").expect("document");
        assert_eq!(stored.tasks[0].name, "Deep work");
    }

    #[test]
    fn failed_save_still_hands_back_the_release() {
        let workspace = TempWorkspace::new();
        let state = workspace.planner_state();
        let task = create_task_impl(&state, "Focus".to_string(), 9.0, 11.0).expect("create");
        let blocked_temp = workspace.path.join("state").join("tasks.json.tmp");
        fs::create_dir_all(&blocked_temp).expect("block temp file");

        pointer_down_impl(&state, 300.0, Some(task.id.clone())).expect("down");
        pointer_move_impl(&state, 364.0, Some(task.id.clone())).expect("move");
        let outcome = pointer_release_impl(&state, 364.0)
            .expect("release is not an error")
            .expect("session ended");

        assert!(outcome.save_error.is_some());
        assert_eq!(outcome.released.task_id, task.id);
        let update = outcome.released.update.expect("style restore");
        assert_eq!(update.style, TaskStyle::Hovered);
        assert_eq!(outcome.released.cursor.zone, PointerZone::Body);

        let listed = list_time_blocks_impl(&state, None).expect("list");
        assert_eq!((listed[0].start, listed[0].end), (11.0, 13.0));
        assert_eq!(
            workspace.stored("2024-01-15").expect("document").tasks[0].start_time,
            9.0
        );

        fs::remove_dir_all(&blocked_temp).expect("unblock temp file");
        pointer_down_impl(&state, 364.0, Some(task.id.clone())).expect("idle again");
        let retry = pointer_release_impl(&state, 364.0)
            .expect("release")
            .expect("session ended");
        assert_eq!(retry.save_error, None);
        assert_eq!(
            workspace.stored("2024-01-15").expect("document").tasks[0].start_time,
            11.0
        );
    }

    #[test]
    fn cancelled_session_reports_failed_save() {
        let workspace = TempWorkspace::new();
        let state = workspace.planner_state();
        let task = create_task_impl(&state, "Focus".to_string(), 9.0, 11.0).expect("create");
        fs::create_dir_all(workspace.path.join("state").join("tasks.json.tmp"))
            .expect("block temp file");

        pointer_down_impl(&state, 300.0, Some(task.id.clone())).expect("down");
        pointer_move_impl(&state, 364.0, Some(task.id.clone())).expect("move");
        let outcome = pointer_cancel_impl(&state)
            .expect("cancel is not an error")
            .expect("session ended");

        assert_eq!(outcome.released.task_id, task.id);
        assert!(outcome.save_error.is_some());
        assert_eq!(pointer_cancel_impl(&state).expect("idle cancel"), None);
    }

    #[test]
    fn invalid_stored_blocks_are_not_loaded() {
        let workspace = TempWorkspace::new();
        fs::create_dir_all(workspace.path.join("state")).expect("state dir");
        fs::write(
            workspace.path.join("state").join("tasks.json"),
            r#"{"2024-01-15": {"tasks": [
                {"name": "", "start_time": 22, "end_time": 26},
                {"name": "Rev", "start_time": 10, "end_time": 9},
                {"name": "Standup", "start_time": 9, "end_time": 9.5}
            ]}}"#,
        )
        .expect("write data file");
        let state = workspace.planner_state();

        let listed = list_time_blocks_impl(&state, None).expect("list");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "Standup");
        assert!(
            listed
                .iter()
                .all(|task| task.start >= 0.0 && task.end <= 24.0 && task.end - task.start >= 0.25)
        );
    }

    #[tokio::test]
    async fn shutdown_drains_background_saves() {
        let workspace = TempWorkspace::new();
        fs::create_dir_all(workspace.path.join("config")).expect("config dir");
        fs::write(
            workspace.path.join("config").join("persistence.json"),
            r#"{"schema": 1, "saveMode": "background"}"#,
        )
        .expect("write persistence config");
        let state = workspace.planner_state();

        create_task_impl(&state, "Review".to_string(), 14.0, 15.0).expect("create");
        toggle_top_task_impl(&state, 0).expect("toggle");
        state.shutdown().await.expect("shutdown");

        let stored = workspace.stored("2024-01-15").expect("document");
        assert_eq!(stored.tasks[0].name, "Review");
        assert!(stored.top_tasks[0].completed);
    }

    #[test]
    fn from_bootstrap_reuses_loaded_config() {
        let workspace = TempWorkspace::new();
        let bootstrap = bootstrap_workspace(&workspace.path).expect("bootstrap");
        let data_path = bootstrap.data_path.clone();

        let state = PlannerState::from_bootstrap(bootstrap).expect("open from bootstrap");

        assert_eq!(state.data_path(), data_path.as_path());
        assert_eq!(state.config(), &PlannerConfig::default());
    }
}
