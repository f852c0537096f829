use chrono::NaiveDateTime;
use dayblock::domain::time_marker::NowProvider;
use dayblock::{
    PlannerState, SessionStart, Task, create_task_impl, list_time_blocks_impl, pointer_down_impl,
    pointer_move_impl, pointer_release_impl, time_marker_impl,
};
use std::path::Path;
use std::sync::Arc;

fn clock(value: &str) -> NowProvider {
    let now = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S").expect("valid time");
    Arc::new(move || now)
}

fn open(root: &Path) -> PlannerState {
    PlannerState::new(root.to_path_buf())
        .expect("open planner")
        .with_now_provider(clock("2024-01-15 08:00:00"))
}

fn span(task: &Task) -> (f64, f64) {
    (task.start, task.end)
}

fn only_task(state: &PlannerState) -> Task {
    let tasks = list_time_blocks_impl(state, None).expect("list tasks");
    assert_eq!(tasks.len(), 1);
    tasks[0].clone()
}

#[test]
fn dragged_block_is_saved_and_reloaded() {
    let root = tempfile::tempdir().expect("temp dir");
    let state = open(root.path());
    let task = create_task_impl(&state, "Planning".to_string(), 9.0, 10.0).expect("create");

    let start = pointer_down_impl(&state, 304.0, Some(task.id.clone())).expect("down");
    assert!(matches!(start, SessionStart::Started { .. }));
    pointer_move_impl(&state, 368.0, Some(task.id.clone())).expect("move");
    pointer_release_impl(&state, 368.0).expect("release");
    assert_eq!(span(&only_task(&state)), (11.0, 12.0));

    drop(state);
    let reopened = open(root.path());
    let reloaded = only_task(&reopened);
    assert_eq!(reloaded.name, "Planning");
    assert_eq!(span(&reloaded), (11.0, 12.0));
}

#[test]
fn drag_past_midnight_is_rejected() {
    let root = tempfile::tempdir().expect("temp dir");
    let state = open(root.path());
    let task = create_task_impl(&state, "Wind down".to_string(), 23.0, 23.75).expect("create");

    pointer_down_impl(&state, 748.0, Some(task.id.clone())).expect("down");
    let feedback = pointer_move_impl(&state, 780.0, Some(task.id.clone())).expect("move");
    assert_eq!(feedback.update, None);
    pointer_release_impl(&state, 780.0).expect("release");

    assert_eq!(span(&only_task(&state)), (23.0, 23.75));
    assert_eq!(span(&only_task(&open(root.path()))), (23.0, 23.75));
}

#[test]
fn shrinking_below_quarter_hour_is_rejected() {
    let root = tempfile::tempdir().expect("temp dir");
    let state = open(root.path());
    let task = create_task_impl(&state, "Inbox".to_string(), 8.0, 8.25).expect("create");

    pointer_down_impl(&state, 264.0, Some(task.id.clone())).expect("down on bottom edge");
    let feedback = pointer_move_impl(&state, 258.0, Some(task.id.clone())).expect("move");
    assert_eq!(feedback.update, None);
    pointer_release_impl(&state, 258.0).expect("release");

    assert_eq!(span(&only_task(&state)), (8.0, 8.25));
}

#[test]
fn standup_added_to_empty_day_is_listed_once() {
    let root = tempfile::tempdir().expect("temp dir");
    let state = open(root.path());

    create_task_impl(&state, "Standup".to_string(), 9.0, 9.5).expect("create");

    let listed = list_time_blocks_impl(&state, Some("2024-01-15".to_string())).expect("list");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "Standup");
    assert_eq!(span(&listed[0]), (9.0, 9.5));

    let raw = std::fs::read_to_string(root.path().join("state").join("tasks.json"))
        .expect("read data file");
    let document: serde_json::Value = serde_json::from_str(&raw).expect("valid json");
    assert_eq!(
        document["2024-01-15"]["tasks"],
        serde_json::json!([{"name": "Standup", "start_time": 9.0, "end_time": 9.5}])
    );
}

#[test]
fn marker_is_hidden_for_other_days() {
    let root = tempfile::tempdir().expect("temp dir");
    let state = open(root.path());
    assert_eq!(time_marker_impl(&state).expect("marker"), Some(8.0 * 32.0 - 22.0));

    let day_before = PlannerState::new(root.path().to_path_buf())
        .expect("open planner")
        .with_now_provider(clock("2024-01-14 08:00:00"));
    dayblock::change_date_impl(&day_before, "2024-01-15".to_string()).expect("change date");
    assert_eq!(time_marker_impl(&day_before).expect("marker"), None);
}
