use crate::domain::models::{PriorityTask, TimeBlockRecord};
use crate::infrastructure::error::PersistenceError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

const TOP_TASKS_KEY: &str = "top_tasks";
const TASKS_KEY: &str = "tasks";
const JSON_INDENT: &[u8] = b"    ";

/// Everything stored for one date.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DayDocument {
    #[serde(default)]
    pub top_tasks: Vec<PriorityTask>,
    #[serde(default)]
    pub tasks: Vec<TimeBlockRecord>,
}

impl DayDocument {
    fn from_value(date_key: &str, value: &Value) -> Self {
        Self {
            top_tasks: section_from_value(date_key, value, TOP_TASKS_KEY),
            tasks: section_from_value(date_key, value, TASKS_KEY),
        }
    }

    fn apply(&mut self, section: &DocumentSection) {
        match section {
            DocumentSection::TopTasks(top_tasks) => self.top_tasks = top_tasks.clone(),
            DocumentSection::Tasks(tasks) => self.tasks = tasks.clone(),
        }
    }
}

/// One section of a day document; writing it leaves the other section alone.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentSection {
    TopTasks(Vec<PriorityTask>),
    Tasks(Vec<TimeBlockRecord>),
}

impl DocumentSection {
    pub fn key(&self) -> &'static str {
        match self {
            Self::TopTasks(_) => TOP_TASKS_KEY,
            Self::Tasks(_) => TASKS_KEY,
        }
    }

    fn to_value(&self) -> Result<Value, PersistenceError> {
        let value = match self {
            Self::TopTasks(top_tasks) => serde_json::to_value(top_tasks)?,
            Self::Tasks(tasks) => serde_json::to_value(tasks)?,
        };
        Ok(value)
    }
}

/// Date-keyed document storage. Keys are `YYYY-MM-DD`.
pub trait DocumentStore: Send + Sync {
    fn read(&self, date_key: &str) -> Result<Option<DayDocument>, PersistenceError>;
    fn write(&self, date_key: &str, section: &DocumentSection) -> Result<(), PersistenceError>;
}

/// All dates in one JSON file, replaced atomically on every write.
#[derive(Debug)]
pub struct JsonFileDocumentStore {
    path: PathBuf,
    write_guard: Mutex<()>,
}

enum FileState {
    Missing,
    Parsed,
    Corrupt,
}

impl JsonFileDocumentStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_guard: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        sibling_path(&self.path, "tmp")
    }

    fn corrupt_path(&self) -> PathBuf {
        sibling_path(&self.path, "corrupt")
    }

    fn read_all(&self) -> Result<(Map<String, Value>, FileState), PersistenceError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                return Ok((Map::new(), FileState::Missing));
            }
            Err(error) => return Err(error.into()),
        };
        if raw.trim().is_empty() {
            return Ok((Map::new(), FileState::Missing));
        }

        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => Ok((map, FileState::Parsed)),
            Ok(_) => {
                log::warn!(
                    "event=document_corrupt path={} reason=not_an_object",
                    self.path.display()
                );
                Ok((Map::new(), FileState::Corrupt))
            }
            Err(error) => {
                log::warn!(
                    "event=document_corrupt path={} reason={error}",
                    self.path.display()
                );
                Ok((Map::new(), FileState::Corrupt))
            }
        }
    }

    fn write_all(&self, map: &Map<String, Value>) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut buffer = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(JSON_INDENT);
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
        map.serialize(&mut serializer)?;
        buffer.push(b'\n');

        let temp_path = self.temp_path();
        fs::write(&temp_path, &buffer)?;
        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}

impl DocumentStore for JsonFileDocumentStore {
    fn read(&self, date_key: &str) -> Result<Option<DayDocument>, PersistenceError> {
        let (map, _) = self.read_all()?;
        Ok(map
            .get(date_key)
            .map(|value| DayDocument::from_value(date_key, value)))
    }

    fn write(&self, date_key: &str, section: &DocumentSection) -> Result<(), PersistenceError> {
        let _guard = self
            .write_guard
            .lock()
            .map_err(|error| PersistenceError::LockPoisoned(format!("document store: {error}")))?;

        let (mut map, state) = self.read_all()?;
        if matches!(state, FileState::Corrupt) {
            let corrupt_path = self.corrupt_path();
            fs::rename(&self.path, &corrupt_path)?;
            log::warn!(
                "event=document_moved_aside from={} to={}",
                self.path.display(),
                corrupt_path.display()
            );
        }

        let day = map
            .entry(date_key.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !day.is_object() {
            *day = Value::Object(Map::new());
        }
        if let Some(day) = day.as_object_mut() {
            day.insert(section.key().to_string(), section.to_value()?);
        }

        self.write_all(&map)?;
        log::debug!(
            "event=document_write date={date_key} section={}",
            section.key()
        );
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    documents: Mutex<HashMap<String, DayDocument>>,
    writes: AtomicUsize,
}

impl InMemoryDocumentStore {
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn read(&self, date_key: &str) -> Result<Option<DayDocument>, PersistenceError> {
        let documents = self
            .documents
            .lock()
            .map_err(|error| PersistenceError::LockPoisoned(format!("document store: {error}")))?;
        Ok(documents.get(date_key).cloned())
    }

    fn write(&self, date_key: &str, section: &DocumentSection) -> Result<(), PersistenceError> {
        let mut documents = self
            .documents
            .lock()
            .map_err(|error| PersistenceError::LockPoisoned(format!("document store: {error}")))?;
        documents
            .entry(date_key.to_string())
            .or_default()
            .apply(section);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

fn section_from_value<T>(date_key: &str, value: &Value, key: &str) -> Vec<T>
where
    T: for<'de> Deserialize<'de>,
{
    let Some(section) = value.get(key) else {
        return Vec::new();
    };
    match serde_json::from_value::<Vec<T>>(section.clone()) {
        Ok(items) => items,
        Err(error) => {
            log::warn!("event=section_corrupt date={date_key} section={key} reason={error}");
            Vec::new()
        }
    }
}
