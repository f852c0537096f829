//! Daily planner core: per-date time blocks with drag and resize on a 24h
//! grid, a three-item priority list, and a "now" marker, persisted to one
//! JSON file keyed by date.
//!
//! Hosts drive everything through [`PlannerState`] and the `*_impl` command
//! functions; rendering and hit testing stay on the host side.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::commands::{
    DayView, PlannerState, ReleaseOutcome, change_date_impl, create_task_impl,
    current_date_impl, delete_task_impl, edit_top_task_impl, flush_saves_impl,
    go_to_today_impl, list_time_blocks_impl, list_top_tasks_impl, pointer_cancel_impl,
    pointer_down_impl, pointer_move_impl, pointer_release_impl, shift_date_impl,
    task_visuals_impl, time_marker_impl, toggle_top_task_impl, update_task_impl,
};
pub use application::error::PlannerError;
pub use domain::interaction::{
    CursorHint, PointerFeedback, PointerZone, Released, SessionStart, TaskStyle, TaskVisualUpdate,
};
pub use domain::models::{PriorityTask, Task, TaskInput, ValidationError, ValidationReason};

use application::bootstrap::bootstrap_workspace;
use infrastructure::logging::init_logging;
use std::path::PathBuf;

/// Bootstraps the workspace, starts file logging at the configured level and
/// opens the planner on today's date.
pub fn open_planner(workspace_root: impl Into<PathBuf>) -> Result<PlannerState, PlannerError> {
    let workspace_root = workspace_root.into();
    let bootstrap = bootstrap_workspace(&workspace_root)?;
    init_logging(&bootstrap.config.log_level, &bootstrap.logs_dir)?;
    PlannerState::from_bootstrap(bootstrap)
}
