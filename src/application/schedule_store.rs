use crate::application::error::PlannerError;
use crate::domain::models::{Task, TaskInput, TimeBlockRecord, date_key};
use crate::domain::schedule::Schedule;
use crate::infrastructure::document_store::{DocumentSection, DocumentStore};
use crate::infrastructure::error::PersistenceError;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

/// Per-date schedules, read lazily from the document store.
///
/// Mutations only touch memory. Callers decide when to `save`, which lets a
/// drag update the same task on every frame and write once on release.
pub struct ScheduleStore<S>
where
    S: DocumentStore,
{
    port: Arc<S>,
    schedules: HashMap<NaiveDate, Schedule>,
}

impl<S> ScheduleStore<S>
where
    S: DocumentStore,
{
    pub fn new(port: Arc<S>) -> Self {
        Self {
            port,
            schedules: HashMap::new(),
        }
    }

    pub fn load(&mut self, date: NaiveDate) -> Result<&Schedule, PersistenceError> {
        self.schedule_mut(date).map(|schedule| &*schedule)
    }

    pub fn schedule_mut(&mut self, date: NaiveDate) -> Result<&mut Schedule, PersistenceError> {
        match self.schedules.entry(date) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let key = date_key(date);
                let schedule = self
                    .port
                    .read(&key)?
                    .map(|document| Schedule::from_records(&document.tasks))
                    .unwrap_or_default();
                log::debug!(
                    "event=schedule_loaded date={key} tasks={}",
                    schedule.len()
                );
                Ok(entry.insert(schedule))
            }
        }
    }

    /// Stored form of the cached schedule; empty when the date was never loaded.
    pub fn records(&self, date: NaiveDate) -> Vec<TimeBlockRecord> {
        self.schedules
            .get(&date)
            .map(Schedule::records)
            .unwrap_or_default()
    }

    pub fn save(&self, date: NaiveDate) -> Result<(), PersistenceError> {
        let key = date_key(date);
        let records = self.records(date);
        let count = records.len();
        self.port.write(&key, &DocumentSection::Tasks(records))?;
        log::info!("event=schedule_saved date={key} tasks={count}");
        Ok(())
    }

    pub fn add_task(&mut self, date: NaiveDate, input: &TaskInput) -> Result<Task, PlannerError> {
        let task = Task::from_input(input)?;
        let schedule = self.schedule_mut(date)?;
        schedule.push(task.clone());
        Ok(task)
    }

    pub fn update_task(
        &mut self,
        date: NaiveDate,
        task_id: &str,
        input: &TaskInput,
    ) -> Result<Task, PlannerError> {
        let valid = input.validate()?;
        let schedule = self.schedule_mut(date)?;
        let Some(task) = schedule.get_mut(task_id) else {
            return Err(PlannerError::TaskNotFound(task_id.to_string()));
        };
        task.name = valid.name;
        task.set_range(valid.range);
        Ok(task.clone())
    }

    pub fn remove_task(
        &mut self,
        date: NaiveDate,
        task_id: &str,
    ) -> Result<Option<Task>, PersistenceError> {
        Ok(self.schedule_mut(date)?.remove(task_id))
    }
}
