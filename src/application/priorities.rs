use crate::application::error::PlannerError;
use crate::domain::models::{PriorityTask, ValidationReason, date_key};
use crate::infrastructure::document_store::{DocumentSection, DocumentStore};
use crate::infrastructure::error::PersistenceError;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;

pub const PRIORITY_SLOTS: usize = 3;
const LABEL_MAX_CHARS: usize = 29;
const ELLIPSIS: &str = "...";

fn placeholders() -> Vec<PriorityTask> {
    (1..=PRIORITY_SLOTS)
        .map(|slot| PriorityTask::new(format!("Click to add priority task {slot}")))
        .collect()
}

/// Text shown in the narrow priority row; longer text is cut and ends in `...`.
pub fn display_label(text: &str) -> String {
    if text.chars().count() <= LABEL_MAX_CHARS {
        return text.to_string();
    }
    let kept: String = text
        .chars()
        .take(LABEL_MAX_CHARS - ELLIPSIS.len())
        .collect();
    format!("{kept}{ELLIPSIS}")
}

/// The per-date "top priorities" list.
pub struct PriorityList<S>
where
    S: DocumentStore,
{
    port: Arc<S>,
    lists: HashMap<NaiveDate, Vec<PriorityTask>>,
}

impl<S> PriorityList<S>
where
    S: DocumentStore,
{
    pub fn new(port: Arc<S>) -> Self {
        Self {
            port,
            lists: HashMap::new(),
        }
    }

    /// Reads the date's priorities. A date without any gets the placeholder
    /// items, which are written back right away.
    pub fn load(&mut self, date: NaiveDate) -> Result<&[PriorityTask], PersistenceError> {
        if !self.lists.contains_key(&date) {
            let key = date_key(date);
            let stored = self
                .port
                .read(&key)?
                .map(|document| document.top_tasks)
                .unwrap_or_default();
            let items = if stored.is_empty() {
                let seeded = placeholders();
                self.port
                    .write(&key, &DocumentSection::TopTasks(seeded.clone()))?;
                log::info!("event=priorities_seeded date={key}");
                seeded
            } else {
                stored
            };
            self.lists.insert(date, items);
        }
        Ok(self.lists.get(&date).map(Vec::as_slice).unwrap_or_default())
    }

    pub fn toggle(&mut self, date: NaiveDate, index: usize) -> Result<PriorityTask, PlannerError> {
        let item = self.item_mut(date, index)?;
        item.completed = !item.completed;
        Ok(item.clone())
    }

    pub fn edit(
        &mut self,
        date: NaiveDate,
        index: usize,
        text: &str,
    ) -> Result<PriorityTask, PlannerError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(PlannerError::Validation(
                ValidationReason::EmptyPriorityText.into(),
            ));
        }
        let item = self.item_mut(date, index)?;
        item.text = text.to_string();
        Ok(item.clone())
    }

    /// Section snapshot for persisting; empty when the date was never loaded.
    pub fn section(&self, date: NaiveDate) -> DocumentSection {
        DocumentSection::TopTasks(self.lists.get(&date).cloned().unwrap_or_default())
    }

    pub fn save(&self, date: NaiveDate) -> Result<(), PersistenceError> {
        self.port.write(&date_key(date), &self.section(date))
    }

    fn item_mut(
        &mut self,
        date: NaiveDate,
        index: usize,
    ) -> Result<&mut PriorityTask, PlannerError> {
        self.load(date)?;
        self.lists
            .get_mut(&date)
            .and_then(|items| items.get_mut(index))
            .ok_or_else(|| {
                PlannerError::Validation(ValidationReason::PriorityIndexOutOfRange.into())
            })
    }
}
