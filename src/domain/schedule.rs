use crate::domain::models::{Task, TimeBlockRecord};

/// Time blocks of one date, kept in creation order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schedule {
    tasks: Vec<Task>,
}

impl Schedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a schedule from stored records, skipping any that would
    /// break the task invariants.
    pub fn from_records(records: &[TimeBlockRecord]) -> Self {
        let tasks = records
            .iter()
            .filter_map(|record| match Task::try_from_record(record) {
                Ok(task) => Some(task),
                Err(error) => {
                    log::warn!(
                        "event=stored_task_skipped name={:?} start={} end={} reason={error}",
                        record.name,
                        record.start_time,
                        record.end_time
                    );
                    None
                }
            })
            .collect();
        Self { tasks }
    }

    pub fn records(&self) -> Vec<TimeBlockRecord> {
        self.tasks.iter().map(Task::to_record).collect()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, task_id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == task_id)
    }

    pub fn get_mut(&mut self, task_id: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|task| task.id == task_id)
    }

    pub fn push(&mut self, task: Task) {
        self.tasks.push(task);
    }

    pub fn remove(&mut self, task_id: &str) -> Option<Task> {
        let index = self.tasks.iter().position(|task| task.id == task_id)?;
        Some(self.tasks.remove(index))
    }

    /// Compares task content (name, start, end) ignoring ids and order.
    pub fn same_tasks(&self, other: &Schedule) -> bool {
        if self.len() != other.len() {
            return false;
        }
        let mut left = self.records();
        let mut right = other.records();
        let by_content = |a: &TimeBlockRecord, b: &TimeBlockRecord| {
            a.start_time
                .total_cmp(&b.start_time)
                .then(a.end_time.total_cmp(&b.end_time))
                .then_with(|| a.name.cmp(&b.name))
        };
        left.sort_by(by_content);
        right.sort_by(by_content);
        left == right
    }
}
