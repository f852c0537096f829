//! Drag/resize state machine for time blocks.
//!
//! The controller never draws anything and never touches cursors. Each event
//! returns what the view should apply: `TaskVisualUpdate`s for bars that moved
//! or changed style, and a `CursorHint` for the pointer affordance.
//!
//! Edge zones are measured against the task's last rendered rectangle, so a
//! hover right after a move classifies against the moved position.

use crate::domain::interval_math::{
    TimeRange, resize_bottom, resize_top, snap_quarter_hour, to_pixel_y, to_time_hours, translate,
};
use crate::domain::models::Task;
use crate::domain::schedule::Schedule;
use serde::Serialize;

pub const DEFAULT_HOUR_HEIGHT_PX: f64 = 32.0;
pub const DEFAULT_EDGE_ZONE_PX: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridGeometry {
    pub hour_height_px: f64,
    pub edge_zone_px: f64,
}

impl Default for GridGeometry {
    fn default() -> Self {
        Self {
            hour_height_px: DEFAULT_HOUR_HEIGHT_PX,
            edge_zone_px: DEFAULT_EDGE_ZONE_PX,
        }
    }
}

impl GridGeometry {
    pub fn pixel_span(&self, range: TimeRange) -> (i32, i32) {
        (
            to_pixel_y(range.start, self.hour_height_px),
            to_pixel_y(range.end, self.hour_height_px),
        )
    }

    /// Top edge is tested before bottom, and both before the body.
    pub fn classify(&self, range: TimeRange, pointer_y: f64) -> PointerZone {
        let (top, bottom) = self.pixel_span(range);
        let (top, bottom) = (f64::from(top), f64::from(bottom));
        let edge = self.edge_zone_px;

        if pointer_y < top - edge || pointer_y > bottom + edge {
            PointerZone::Outside
        } else if pointer_y - top <= edge {
            PointerZone::TopEdge
        } else if bottom - pointer_y <= edge {
            PointerZone::BottomEdge
        } else {
            PointerZone::Body
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeEdge {
    Top,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerZone {
    TopEdge,
    BottomEdge,
    Body,
    Outside,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CursorHint {
    pub zone: PointerZone,
}

impl CursorHint {
    pub fn new(zone: PointerZone) -> Self {
        Self { zone }
    }

    pub fn is_resize(&self) -> bool {
        matches!(self.zone, PointerZone::TopEdge | PointerZone::BottomEdge)
    }

    fn for_mode(mode: InteractionMode) -> Self {
        match mode {
            InteractionMode::Drag => Self::new(PointerZone::Body),
            InteractionMode::Resize(ResizeEdge::Top) => Self::new(PointerZone::TopEdge),
            InteractionMode::Resize(ResizeEdge::Bottom) => Self::new(PointerZone::BottomEdge),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStyle {
    Normal,
    Hovered,
    Active,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskVisualUpdate {
    pub id: String,
    pub pixel_top: i32,
    pub pixel_bottom: i32,
    pub style: TaskStyle,
}

/// What the view's hit test resolved a pointer coordinate to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HitTarget {
    Task(String),
    Background,
}

impl HitTarget {
    pub fn from_task_id(task_id: Option<&str>) -> Self {
        match task_id.map(str::trim).filter(|value| !value.is_empty()) {
            Some(task_id) => Self::Task(task_id.to_string()),
            None => Self::Background,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionMode {
    Drag,
    Resize(ResizeEdge),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionState {
    Idle,
    Dragging,
    Resizing(ResizeEdge),
}

#[derive(Debug, Clone, PartialEq)]
pub struct InteractionSession {
    pub mode: InteractionMode,
    pub active_task_id: String,
    pub pointer_start_y: f64,
    pub original: TimeRange,
    pub pointer_offset: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionStart {
    Started {
        update: TaskVisualUpdate,
        cursor: CursorHint,
    },
    /// Another session is still active; it was left untouched.
    Busy,
    /// The pointer did not land on a task.
    Missed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointerFeedback {
    pub update: Option<TaskVisualUpdate>,
    pub cursor: CursorHint,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Released {
    pub task_id: String,
    pub update: Option<TaskVisualUpdate>,
    pub cursor: CursorHint,
}

#[derive(Debug, Clone, Default)]
pub struct InteractionController {
    geometry: GridGeometry,
    session: Option<InteractionSession>,
}

impl InteractionController {
    pub fn new(geometry: GridGeometry) -> Self {
        Self {
            geometry,
            session: None,
        }
    }

    pub fn geometry(&self) -> GridGeometry {
        self.geometry
    }

    pub fn session(&self) -> Option<&InteractionSession> {
        self.session.as_ref()
    }

    pub fn state(&self) -> InteractionState {
        match self.session.as_ref().map(|session| session.mode) {
            None => InteractionState::Idle,
            Some(InteractionMode::Drag) => InteractionState::Dragging,
            Some(InteractionMode::Resize(edge)) => InteractionState::Resizing(edge),
        }
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn on_pointer_down(
        &mut self,
        schedule: &Schedule,
        pointer_y: f64,
        hit: &HitTarget,
    ) -> SessionStart {
        if let Some(active) = &self.session {
            log::debug!(
                "event=pointer_down_rejected reason=session_active task_id={}",
                active.active_task_id
            );
            return SessionStart::Busy;
        }
        let HitTarget::Task(task_id) = hit else {
            return SessionStart::Missed;
        };
        let Some(task) = schedule.get(task_id) else {
            return SessionStart::Missed;
        };

        let range = task.range();
        let mode = match self.geometry.classify(range, pointer_y) {
            PointerZone::Outside => return SessionStart::Missed,
            PointerZone::TopEdge => InteractionMode::Resize(ResizeEdge::Top),
            PointerZone::BottomEdge => InteractionMode::Resize(ResizeEdge::Bottom),
            PointerZone::Body => InteractionMode::Drag,
        };
        let pointer_offset = match mode {
            InteractionMode::Drag => {
                pointer_y - f64::from(to_pixel_y(range.start, self.geometry.hour_height_px))
            }
            InteractionMode::Resize(_) => 0.0,
        };

        log::debug!(
            "event=session_start task_id={} mode={:?} start={} end={}",
            task.id,
            mode,
            range.start,
            range.end
        );
        self.session = Some(InteractionSession {
            mode,
            active_task_id: task.id.clone(),
            pointer_start_y: pointer_y,
            original: range,
            pointer_offset,
        });

        SessionStart::Started {
            update: self.visual(task, TaskStyle::Active),
            cursor: CursorHint::for_mode(mode),
        }
    }

    /// Moves the active task, or only classifies the hover when idle.
    pub fn on_pointer_move(
        &mut self,
        schedule: &mut Schedule,
        pointer_y: f64,
        hover: &HitTarget,
    ) -> PointerFeedback {
        let Some(session) = self.session.clone() else {
            return PointerFeedback {
                update: None,
                cursor: self.hover(schedule, pointer_y, hover),
            };
        };

        let geometry = self.geometry;
        let Some(task) = schedule.get_mut(&session.active_task_id) else {
            log::warn!(
                "event=session_reset reason=task_missing task_id={}",
                session.active_task_id
            );
            self.session = None;
            return PointerFeedback {
                update: None,
                cursor: CursorHint::new(PointerZone::Outside),
            };
        };

        let candidate = candidate_range(geometry, &session, pointer_y);
        let update = match candidate {
            Some(range) if range != task.range() => {
                task.set_range(range);
                Some(visual_for(geometry, task, TaskStyle::Active))
            }
            _ => None,
        };

        PointerFeedback {
            update,
            cursor: CursorHint::for_mode(session.mode),
        }
    }

    /// Ends the session; the caller persists the schedule for the date.
    pub fn on_pointer_release(&mut self, schedule: &Schedule, pointer_y: f64) -> Option<Released> {
        let session = self.session.take()?;
        let task = schedule.get(&session.active_task_id);
        let zone = task
            .map(|task| self.geometry.classify(task.range(), pointer_y))
            .unwrap_or(PointerZone::Outside);
        let style = if zone == PointerZone::Outside {
            TaskStyle::Normal
        } else {
            TaskStyle::Hovered
        };

        log::debug!(
            "event=session_release task_id={} moved={}",
            session.active_task_id,
            task.is_some_and(|task| task.range() != session.original)
        );
        Some(Released {
            update: task.map(|task| self.visual(task, style)),
            task_id: session.active_task_id,
            cursor: CursorHint::new(zone),
        })
    }

    /// Resolves a session whose release event never arrived.
    pub fn on_pointer_cancel(&mut self, schedule: &Schedule) -> Option<Released> {
        let session = self.session.take()?;
        log::debug!("event=session_cancel task_id={}", session.active_task_id);
        Some(Released {
            update: schedule
                .get(&session.active_task_id)
                .map(|task| self.visual(task, TaskStyle::Normal)),
            task_id: session.active_task_id,
            cursor: CursorHint::new(PointerZone::Outside),
        })
    }

    pub fn hover(&self, schedule: &Schedule, pointer_y: f64, hover: &HitTarget) -> CursorHint {
        let zone = match hover {
            HitTarget::Task(task_id) => schedule
                .get(task_id)
                .map(|task| self.geometry.classify(task.range(), pointer_y))
                .unwrap_or(PointerZone::Outside),
            HitTarget::Background => PointerZone::Outside,
        };
        CursorHint::new(zone)
    }

    /// Full redraw set for a schedule.
    pub fn visuals(&self, schedule: &Schedule) -> Vec<TaskVisualUpdate> {
        let active_id = self
            .session
            .as_ref()
            .map(|session| session.active_task_id.as_str());
        schedule
            .tasks()
            .iter()
            .map(|task| {
                let style = if Some(task.id.as_str()) == active_id {
                    TaskStyle::Active
                } else {
                    TaskStyle::Normal
                };
                self.visual(task, style)
            })
            .collect()
    }

    fn visual(&self, task: &Task, style: TaskStyle) -> TaskVisualUpdate {
        visual_for(self.geometry, task, style)
    }
}

fn visual_for(geometry: GridGeometry, task: &Task, style: TaskStyle) -> TaskVisualUpdate {
    let (pixel_top, pixel_bottom) = geometry.pixel_span(task.range());
    TaskVisualUpdate {
        id: task.id.clone(),
        pixel_top,
        pixel_bottom,
        style,
    }
}

fn candidate_range(
    geometry: GridGeometry,
    session: &InteractionSession,
    pointer_y: f64,
) -> Option<TimeRange> {
    let original = session.original;
    match session.mode {
        InteractionMode::Drag => {
            let pointer_time =
                to_time_hours(pointer_y - session.pointer_offset, geometry.hour_height_px);
            let delta = snap_quarter_hour(pointer_time - original.start);
            translate(original, delta)
        }
        InteractionMode::Resize(ResizeEdge::Top) => {
            let new_time = snap_quarter_hour(to_time_hours(pointer_y, geometry.hour_height_px));
            resize_top(original, new_time).map(|start| TimeRange::new(start, original.end))
        }
        InteractionMode::Resize(ResizeEdge::Bottom) => {
            let new_time = snap_quarter_hour(to_time_hours(pointer_y, geometry.hour_height_px));
            resize_bottom(original, new_time).map(|end| TimeRange::new(original.start, end))
        }
    }
}
