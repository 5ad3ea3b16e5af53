use crate::errors::{AppError, AppResult};
use crate::models::{Folder, ReportRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

const METADATA_FILE: &str = "reports.json";
const CSV_DIR: &str = "csv";

/// Backing store for report metadata and raw CSV bodies, keyed by folder then
/// report id. Writes are plain read-modify-write; the last writer wins.
pub trait ReportStore: Send + Sync {
    fn list_folders(&self) -> AppResult<Vec<Folder>>;
    fn list_reports(&self, folder_id: &str) -> AppResult<Vec<ReportRecord>>;
    fn set_active(&self, report_id: &str, active: bool) -> AppResult<ReportRecord>;
    fn add_tag(&self, report_id: &str, tag: &str) -> AppResult<ReportRecord>;
    fn remove_tag(&self, report_id: &str, tag: &str) -> AppResult<ReportRecord>;
    fn get_raw_csv(&self, report_id: &str) -> AppResult<String>;
    fn create_report(&self, folder_id: &str, name: &str, csv_text: &str) -> AppResult<ReportRecord>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct MetadataFile {
    #[serde(default)]
    folders: Vec<FolderEntry>,
}

// Reports stay as raw JSON so one malformed entry neither blocks the folder
// nor gets lost on write-back.
#[derive(Debug, Serialize, Deserialize)]
struct FolderEntry {
    id: String,
    name: String,
    #[serde(default)]
    reports: Vec<Value>,
}

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn metadata_path(&self) -> PathBuf {
        self.root.join(METADATA_FILE)
    }

    fn csv_path(&self, folder_id: &str, report_id: &str) -> PathBuf {
        self.root
            .join(CSV_DIR)
            .join(sanitize_component(folder_id))
            .join(format!("{}.csv", sanitize_component(report_id)))
    }

    fn read_metadata(&self) -> AppResult<MetadataFile> {
        let path = self.metadata_path();
        if !path.exists() {
            return Ok(MetadataFile::default());
        }
        let bytes = fs::read(&path).map_err(|error| AppError::Io(error.to_string()))?;
        serde_json::from_slice(&bytes)
            .map_err(|error| AppError::MalformedInput(format!("{}: {}", path.display(), error)))
    }

    fn write_metadata(&self, metadata: &MetadataFile) -> AppResult<()> {
        write_json_file(&self.metadata_path(), metadata)
            .map_err(|error| AppError::Persistence(error.to_string()))
    }

    fn folder_of(&self, metadata: &MetadataFile, report_id: &str) -> AppResult<String> {
        metadata
            .folders
            .iter()
            .find(|folder| folder.reports.iter().any(|report| report_id_of(report) == Some(report_id)))
            .map(|folder| folder.id.clone())
            .ok_or_else(|| AppError::NotFound(format!("Report {} not found", report_id)))
    }

    fn update_report<F>(&self, report_id: &str, mutate: F) -> AppResult<ReportRecord>
    where
        F: FnOnce(&mut ReportRecord),
    {
        let mut metadata = self.read_metadata()?;
        let slot = metadata
            .folders
            .iter_mut()
            .flat_map(|folder| folder.reports.iter_mut())
            .find(|report| report_id_of(report) == Some(report_id))
            .ok_or_else(|| AppError::NotFound(format!("Report {} not found", report_id)))?;

        let mut record = parse_record(slot)?;
        mutate(&mut record);

        let object = slot
            .as_object_mut()
            .ok_or_else(|| AppError::MalformedInput(format!("Report {} is not an object", report_id)))?;
        object.insert("isActive".to_string(), Value::Bool(record.is_active));
        object.insert("tags".to_string(), serde_json::to_value(&record.tags)?);

        self.write_metadata(&metadata)?;
        Ok(record)
    }
}

impl ReportStore for JsonFileStore {
    fn list_folders(&self) -> AppResult<Vec<Folder>> {
        let metadata = self.read_metadata()?;
        Ok(metadata
            .folders
            .into_iter()
            .map(|folder| Folder {
                id: folder.id,
                name: folder.name,
            })
            .collect())
    }

    fn list_reports(&self, folder_id: &str) -> AppResult<Vec<ReportRecord>> {
        let metadata = self.read_metadata()?;
        let folder = metadata
            .folders
            .into_iter()
            .find(|folder| folder.id == folder_id)
            .ok_or_else(|| AppError::NotFound(format!("Folder {} not found", folder_id)))?;

        let mut reports = Vec::with_capacity(folder.reports.len());
        for value in &folder.reports {
            match parse_record(value) {
                Ok(record) => reports.push(record),
                Err(error) => {
                    tracing::warn!(folder_id = %folder_id, error = %error, "skipping malformed report entry");
                }
            }
        }
        Ok(reports)
    }

    fn set_active(&self, report_id: &str, active: bool) -> AppResult<ReportRecord> {
        self.update_report(report_id, |record| record.is_active = active)
    }

    fn add_tag(&self, report_id: &str, tag: &str) -> AppResult<ReportRecord> {
        self.update_report(report_id, |record| {
            record.tags.insert(tag);
        })
    }

    fn remove_tag(&self, report_id: &str, tag: &str) -> AppResult<ReportRecord> {
        self.update_report(report_id, |record| {
            record.tags.remove(tag);
        })
    }

    fn get_raw_csv(&self, report_id: &str) -> AppResult<String> {
        let metadata = self.read_metadata()?;
        let folder_id = self.folder_of(&metadata, report_id)?;
        let path = self.csv_path(&folder_id, report_id);
        match fs::read_to_string(&path) {
            Ok(text) => Ok(text),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Err(AppError::NotFound(format!(
                "CSV for report {} not found at {}",
                report_id,
                path.display()
            ))),
            Err(error) => Err(AppError::Io(error.to_string())),
        }
    }

    fn create_report(&self, folder_id: &str, name: &str, csv_text: &str) -> AppResult<ReportRecord> {
        let folder_id = folder_id.trim();
        let name = name.trim();
        if folder_id.is_empty() {
            return Err(AppError::MalformedInput("Folder id cannot be empty".to_string()));
        }
        if name.is_empty() {
            return Err(AppError::MalformedInput("Report name cannot be empty".to_string()));
        }

        let now = Utc::now();
        let record = ReportRecord {
            id: new_report_id(now),
            name: name.to_string(),
            is_active: true,
            tags: Default::default(),
            date: now.to_rfc3339(),
        };

        let mut metadata = self.read_metadata()?;
        let csv_path = self.csv_path(folder_id, &record.id);
        if let Some(parent) = csv_path.parent() {
            fs::create_dir_all(parent).map_err(|error| AppError::Persistence(error.to_string()))?;
        }
        fs::write(&csv_path, csv_text).map_err(|error| AppError::Persistence(error.to_string()))?;

        let value = serde_json::to_value(&record)?;
        match metadata.folders.iter_mut().find(|folder| folder.id == folder_id) {
            Some(folder) => folder.reports.push(value),
            None => metadata.folders.push(FolderEntry {
                id: folder_id.to_string(),
                name: folder_id.to_string(),
                reports: vec![value],
            }),
        }
        if let Err(error) = self.write_metadata(&metadata) {
            if let Err(cleanup) = fs::remove_file(&csv_path) {
                tracing::warn!(path = %csv_path.display(), error = %cleanup, "orphaned csv not removed");
            }
            return Err(error);
        }

        tracing::info!(report_id = %record.id, folder_id = %folder_id, "report uploaded");
        Ok(record)
    }
}

fn report_id_of(value: &Value) -> Option<&str> {
    value.get("id").and_then(Value::as_str)
}

fn parse_record(value: &Value) -> AppResult<ReportRecord> {
    serde_json::from_value(value.clone()).map_err(|error| {
        let id = report_id_of(value).unwrap_or("<missing id>");
        AppError::MalformedInput(format!("report {}: {}", id, error))
    })
}

fn new_report_id(now: DateTime<Utc>) -> String {
    let short = Uuid::new_v4().simple().to_string();
    format!(
        "report_{}_{}_{}",
        now.format("%Y%m%d"),
        now.format("%H%M%S"),
        &short[..6]
    )
}

pub(crate) fn sanitize_component(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
            out.push(ch);
        } else {
            out.push('_');
        }
    }
    let cleaned = out.trim_matches('_').to_string();
    if cleaned.is_empty() {
        "item".to_string()
    } else {
        cleaned
    }
}

fn write_json_file<T: Serialize>(path: &Path, value: &T) -> AppResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|error| AppError::Io(error.to_string()))?;
    }
    let bytes = serde_json::to_vec_pretty(value)?;
    fs::write(path, bytes).map_err(|error| AppError::Io(error.to_string()))
}
