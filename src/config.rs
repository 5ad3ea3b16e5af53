use crate::errors::AppResult;
use crate::models::AppSettings;
use anyhow::Context;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

const SETTINGS_FILE: &str = "settings.json";

pub fn load_settings(app_data_dir: &Path) -> AppResult<AppSettings> {
    let path = app_data_dir.join(SETTINGS_FILE);
    if !path.exists() {
        return Ok(AppSettings::default());
    }
    Ok(read_settings(&path)?)
}

pub fn save_settings(app_data_dir: &Path, settings: &AppSettings) -> AppResult<()> {
    fs::create_dir_all(app_data_dir)?;
    let bytes = serde_json::to_vec_pretty(settings)?;
    fs::write(app_data_dir.join(SETTINGS_FILE), bytes)?;
    Ok(())
}

pub fn update_settings(app_data_dir: &Path, update: Value) -> AppResult<AppSettings> {
    let current = load_settings(app_data_dir)?;
    let mut merged = serde_json::to_value(current)?;
    merge_json(&mut merged, update);
    let settings: AppSettings = serde_json::from_value(merged)?;
    save_settings(app_data_dir, &settings)?;
    Ok(settings)
}

pub fn reports_root(app_data_dir: &Path, settings: &AppSettings) -> PathBuf {
    settings
        .reports_dir
        .as_deref()
        .map(PathBuf::from)
        .unwrap_or_else(|| app_data_dir.join("reports"))
}

pub fn export_dir(app_data_dir: &Path, settings: &AppSettings) -> PathBuf {
    settings
        .export_dir
        .as_deref()
        .map(PathBuf::from)
        .unwrap_or_else(|| app_data_dir.join("exports"))
}

fn read_settings(path: &Path) -> anyhow::Result<AppSettings> {
    let bytes = fs::read(path).with_context(|| format!("reading settings from {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("parsing settings in {}", path.display()))
}

fn merge_json(base: &mut Value, patch: Value) {
    match (base, patch) {
        (Value::Object(base_object), Value::Object(patch_object)) => {
            for (key, patch_value) in patch_object {
                match base_object.get_mut(&key) {
                    Some(base_value @ Value::Object(_)) if patch_value.is_object() => {
                        merge_json(base_value, patch_value);
                    }
                    _ => {
                        base_object.insert(key, patch_value);
                    }
                }
            }
        }
        (base_value, patch_value) => {
            *base_value = patch_value;
        }
    }
}
