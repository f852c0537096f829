use crate::domain::interaction::{DEFAULT_EDGE_ZONE_PX, DEFAULT_HOUR_HEIGHT_PX, GridGeometry};
use crate::domain::time_marker::DEFAULT_MARKER_OFFSET_PX;
use crate::infrastructure::error::PersistenceError;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

const APP_JSON: &str = "app.json";
const LAYOUT_JSON: &str = "layout.json";
const PERSISTENCE_JSON: &str = "persistence.json";
const DEFAULT_DATA_FILE: &str = "tasks.json";
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveMode {
    Inline,
    Background,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u8,
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 200,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutConfig {
    pub hour_height_px: f64,
    pub marker_offset_px: f64,
    pub edge_zone_px: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            hour_height_px: DEFAULT_HOUR_HEIGHT_PX,
            marker_offset_px: DEFAULT_MARKER_OFFSET_PX,
            edge_zone_px: DEFAULT_EDGE_ZONE_PX,
        }
    }
}

impl LayoutConfig {
    pub fn geometry(&self) -> GridGeometry {
        GridGeometry {
            hour_height_px: self.hour_height_px,
            edge_zone_px: self.edge_zone_px,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannerConfig {
    pub app_name: String,
    pub timezone: Option<Tz>,
    pub data_file: String,
    pub log_level: String,
    pub layout: LayoutConfig,
    pub save_mode: SaveMode,
    pub retry: RetryPolicy,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            app_name: "Day Planner".to_string(),
            timezone: None,
            data_file: DEFAULT_DATA_FILE.to_string(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            layout: LayoutConfig::default(),
            save_mode: SaveMode::Inline,
            retry: RetryPolicy::default(),
        }
    }
}

fn default_files() -> HashMap<&'static str, serde_json::Value> {
    HashMap::from([
        (
            APP_JSON,
            serde_json::json!({
                "schema": 1,
                "appName": "Day Planner",
                "timezone": null,
                "dataFile": DEFAULT_DATA_FILE,
                "logLevel": DEFAULT_LOG_LEVEL
            }),
        ),
        (
            LAYOUT_JSON,
            serde_json::json!({
                "schema": 1,
                "hourHeightPx": DEFAULT_HOUR_HEIGHT_PX,
                "markerOffsetPx": DEFAULT_MARKER_OFFSET_PX,
                "edgeZonePx": DEFAULT_EDGE_ZONE_PX
            }),
        ),
        (
            PERSISTENCE_JSON,
            serde_json::json!({
                "schema": 1,
                "saveMode": "inline",
                "retry": {
                    "maxAttempts": 3,
                    "baseDelayMs": 200
                }
            }),
        ),
    ])
}

pub fn ensure_default_configs(config_dir: &Path) -> Result<(), PersistenceError> {
    for (name, value) in default_files() {
        let path = config_dir.join(name);
        if !path.exists() {
            let formatted = serde_json::to_string_pretty(&value)?;
            fs::write(path, format!("{formatted}\n"))?;
        }
    }
    Ok(())
}

fn read_config(path: &Path) -> Result<serde_json::Value, PersistenceError> {
    let raw = fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| {
            PersistenceError::InvalidConfig(format!("missing schema in {}", path.display()))
        })?;
    if schema != 1 {
        return Err(PersistenceError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }
    Ok(parsed)
}

pub fn load_config(config_dir: &Path) -> Result<PlannerConfig, PersistenceError> {
    let app = read_config(&config_dir.join(APP_JSON))?;
    let layout = read_config(&config_dir.join(LAYOUT_JSON))?;
    let persistence = read_config(&config_dir.join(PERSISTENCE_JSON))?;
    let defaults = PlannerConfig::default();

    let config = PlannerConfig {
        app_name: optional_str(&app, "appName").unwrap_or(defaults.app_name),
        timezone: optional_str(&app, "timezone")
            .map(|name| parse_timezone(&name))
            .transpose()?,
        data_file: optional_str(&app, "dataFile").unwrap_or(defaults.data_file),
        log_level: optional_str(&app, "logLevel").unwrap_or(defaults.log_level),
        layout: LayoutConfig {
            hour_height_px: positive_f64(&layout, "hourHeightPx")?
                .unwrap_or(defaults.layout.hour_height_px),
            marker_offset_px: layout
                .get("markerOffsetPx")
                .and_then(serde_json::Value::as_f64)
                .unwrap_or(defaults.layout.marker_offset_px),
            edge_zone_px: positive_f64(&layout, "edgeZonePx")?
                .unwrap_or(defaults.layout.edge_zone_px),
        },
        save_mode: match optional_str(&persistence, "saveMode") {
            Some(mode) => parse_save_mode(&mode)?,
            None => defaults.save_mode,
        },
        retry: parse_retry(&persistence, defaults.retry),
    };
    Ok(config)
}

fn optional_str(value: &serde_json::Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
}

fn positive_f64(value: &serde_json::Value, key: &str) -> Result<Option<f64>, PersistenceError> {
    let Some(number) = value.get(key).and_then(serde_json::Value::as_f64) else {
        return Ok(None);
    };
    if !number.is_finite() || number <= 0.0 {
        return Err(PersistenceError::InvalidConfig(format!(
            "{key} must be a positive number"
        )));
    }
    Ok(Some(number))
}

fn parse_timezone(name: &str) -> Result<Tz, PersistenceError> {
    name.parse::<Tz>().map_err(|error| {
        PersistenceError::InvalidConfig(format!("invalid timezone {name}: {error}"))
    })
}

fn parse_save_mode(value: &str) -> Result<SaveMode, PersistenceError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "inline" => Ok(SaveMode::Inline),
        "background" => Ok(SaveMode::Background),
        other => Err(PersistenceError::InvalidConfig(format!(
            "unsupported saveMode: {other}"
        ))),
    }
}

fn parse_retry(persistence: &serde_json::Value, defaults: RetryPolicy) -> RetryPolicy {
    let Some(retry) = persistence.get("retry") else {
        return defaults;
    };
    RetryPolicy {
        max_attempts: retry
            .get("maxAttempts")
            .and_then(serde_json::Value::as_u64)
            .map(|value| value.clamp(1, u64::from(u8::MAX)) as u8)
            .unwrap_or(defaults.max_attempts),
        base_delay_ms: retry
            .get("baseDelayMs")
            .and_then(serde_json::Value::as_u64)
            .unwrap_or(defaults.base_delay_ms),
    }
}
