use crate::config;
use crate::csv_adapter;
use crate::errors::{AppError, AppResult};
use crate::models::{
    AppSettings, ControlState, CsvControls, CsvTable, CsvView, ExportResponse, Folder, ReportRecord, ReportView,
    UploadReportPayload,
};
use crate::store::{sanitize_component, JsonFileStore, ReportStore};
use crate::view::{self, ControlAction, CsvAction};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct OpenReport {
    report_id: String,
    name: String,
    table: CsvTable,
}

#[derive(Debug, Default)]
struct DashboardState {
    folder_id: Option<String>,
    records: Vec<ReportRecord>,
    open_report: Option<OpenReport>,
}

/// Interaction handlers: user actions in, store calls and fresh views out.
pub struct Dashboard {
    store: RwLock<Arc<dyn ReportStore>>,
    settings: RwLock<AppSettings>,
    state: RwLock<DashboardState>,
    load_generation: AtomicU64,
    app_data_dir: PathBuf,
}

impl Dashboard {
    pub fn new(app_data_dir: PathBuf) -> AppResult<Arc<Self>> {
        std::fs::create_dir_all(&app_data_dir)?;
        let settings = config::load_settings(&app_data_dir)?;
        let store = JsonFileStore::new(config::reports_root(&app_data_dir, &settings));
        tracing::info!(root = %store.root().display(), "report store opened");
        Ok(Self::with_store(Arc::new(store), settings, app_data_dir))
    }

    pub fn with_store(store: Arc<dyn ReportStore>, settings: AppSettings, app_data_dir: PathBuf) -> Arc<Self> {
        Arc::new(Self {
            store: RwLock::new(store),
            settings: RwLock::new(settings),
            state: RwLock::new(DashboardState::default()),
            load_generation: AtomicU64::new(0),
            app_data_dir,
        })
    }

    async fn with_store_blocking<T, F>(&self, operation: F) -> AppResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn ReportStore) -> AppResult<T> + Send + 'static,
    {
        let store = Arc::clone(&*self.store.read().await);
        tokio::task::spawn_blocking(move || operation(store.as_ref()))
            .await
            .map_err(|error| AppError::Internal(format!("store task failed: {}", error)))?
    }

    // ─── Settings ───────────────────────────────────────────────────────────

    pub async fn get_settings(&self) -> AppSettings {
        self.settings.read().await.clone()
    }

    pub async fn update_settings(&self, update: serde_json::Value) -> AppResult<AppSettings> {
        let updated = config::update_settings(&self.app_data_dir, update)?;
        self.apply_runtime_settings(&updated).await;
        Ok(updated)
    }

    /// Swaps in the new settings. A changed reports root reopens the store and
    /// drops every snapshot taken from the old one.
    async fn apply_runtime_settings(&self, updated: &AppSettings) {
        let mut settings = self.settings.write().await;
        let previous_root = config::reports_root(&self.app_data_dir, &settings);
        let next_root = config::reports_root(&self.app_data_dir, updated);
        *settings = updated.clone();
        drop(settings);

        if previous_root == next_root {
            return;
        }
        *self.store.write().await = Arc::new(JsonFileStore::new(&next_root));
        self.load_generation.fetch_add(1, Ordering::SeqCst);
        *self.state.write().await = DashboardState::default();
        tracing::info!(root = %next_root.display(), "report store reopened");
    }

    pub async fn initial_controls(&self) -> ControlState {
        self.settings.read().await.initial_controls()
    }

    pub async fn initial_csv_controls(&self) -> CsvControls {
        self.settings.read().await.initial_csv_controls()
    }

    // ─── Folders and records ────────────────────────────────────────────────

    pub async fn list_folders(&self) -> Vec<Folder> {
        match self.with_store_blocking(|store| store.list_folders()).await {
            Ok(folders) => folders,
            Err(error) => {
                tracing::warn!(error = %error, "folder listing failed; showing none");
                Vec::new()
            }
        }
    }

    /// Loads a folder's records. A load that finishes after a newer selection
    /// is dropped and the newer snapshot is returned instead.
    pub async fn select_folder(&self, folder_id: &str) -> Vec<ReportRecord> {
        let generation = self.load_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let owned = folder_id.to_string();
        let records = match self.with_store_blocking(move |store| store.list_reports(&owned)).await {
            Ok(records) => records,
            Err(error) => {
                tracing::warn!(folder_id = %folder_id, error = %error, "report listing failed; showing none");
                Vec::new()
            }
        };

        let mut state = self.state.write().await;
        if self.load_generation.load(Ordering::SeqCst) != generation {
            tracing::debug!(folder_id = %folder_id, "discarding stale folder load");
            return state.records.clone();
        }
        state.folder_id = Some(folder_id.to_string());
        state.records = records.clone();
        state.open_report = None;
        records
    }

    pub async fn current_folder(&self) -> Option<String> {
        self.state.read().await.folder_id.clone()
    }

    pub async fn records(&self) -> Vec<ReportRecord> {
        self.state.read().await.records.clone()
    }

    /// Distinct tags across the loaded folder, for the tag filter.
    pub async fn tags(&self) -> Vec<String> {
        let state = self.state.read().await;
        state
            .records
            .iter()
            .flat_map(|record| record.tags.iter().map(ToString::to_string))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub async fn view(&self, controls: &ControlState) -> ReportView {
        let state = self.state.read().await;
        view::compute_view(&state.records, controls)
    }

    pub async fn apply_action(&self, controls: &ControlState, action: ControlAction) -> ControlState {
        let total_pages = self.view(controls).await.pagination.total_pages;
        controls.apply(action, total_pages)
    }

    // ─── Mutations ──────────────────────────────────────────────────────────

    pub async fn toggle_status(&self, report_id: &str) -> AppResult<ReportRecord> {
        let current = self.require_record(report_id).await?;
        let target = !current.is_active;
        let owned = report_id.to_string();
        let updated = self
            .with_store_blocking(move |store| store.set_active(&owned, target))
            .await
            .inspect_err(|error| {
                tracing::warn!(report_id = %report_id, error = %error, "status toggle not persisted");
            })?;
        self.replace_record(updated.clone()).await;
        Ok(updated)
    }

    pub async fn add_tag(&self, report_id: &str, tag: &str) -> AppResult<ReportRecord> {
        let tag = normalize_tag(tag)?;
        self.require_record(report_id).await?;
        let owned = report_id.to_string();
        let updated = self
            .with_store_blocking(move |store| store.add_tag(&owned, &tag))
            .await
            .inspect_err(|error| {
                tracing::warn!(report_id = %report_id, error = %error, "tag add not persisted");
            })?;
        self.replace_record(updated.clone()).await;
        Ok(updated)
    }

    pub async fn remove_tag(&self, report_id: &str, tag: &str) -> AppResult<ReportRecord> {
        let tag = normalize_tag(tag)?;
        self.require_record(report_id).await?;
        let owned = report_id.to_string();
        let updated = self
            .with_store_blocking(move |store| store.remove_tag(&owned, &tag))
            .await
            .inspect_err(|error| {
                tracing::warn!(report_id = %report_id, error = %error, "tag removal not persisted");
            })?;
        self.replace_record(updated.clone()).await;
        Ok(updated)
    }

    pub async fn upload_report(&self, payload: UploadReportPayload) -> AppResult<ReportRecord> {
        let folder_id = payload.folder_id.trim().to_string();
        let created = self
            .with_store_blocking(move |store| store.create_report(&payload.folder_id, &payload.name, &payload.csv_text))
            .await
            .inspect_err(|error| {
                tracing::warn!(folder_id = %folder_id, error = %error, "report upload not persisted");
            })?;

        let mut state = self.state.write().await;
        if state.folder_id.as_deref() == Some(folder_id.as_str()) {
            state.records.push(created.clone());
        }
        Ok(created)
    }

    // ─── Detail view ────────────────────────────────────────────────────────

    /// Fetches and parses a report's CSV. Inactive reports are refused before
    /// any fetch.
    pub async fn open_report(&self, report_id: &str) -> AppResult<CsvTable> {
        let record = self.require_record(report_id).await?;
        if !record.is_active {
            return Err(AppError::Inactive(format!(
                "Report '{}' is inactive; activate it to view its data",
                record.name
            )));
        }

        let owned = report_id.to_string();
        let raw = self.with_store_blocking(move |store| store.get_raw_csv(&owned)).await?;
        let table = csv_adapter::parse(&raw)?;

        let mut state = self.state.write().await;
        state.open_report = Some(OpenReport {
            report_id: record.id,
            name: record.name,
            table: table.clone(),
        });
        Ok(table)
    }

    pub async fn close_report(&self) {
        self.state.write().await.open_report = None;
    }

    pub async fn open_report_id(&self) -> Option<String> {
        let state = self.state.read().await;
        state.open_report.as_ref().map(|open| open.report_id.clone())
    }

    pub async fn csv_view(&self, controls: &CsvControls) -> AppResult<CsvView> {
        let state = self.state.read().await;
        let open = state.open_report.as_ref().ok_or_else(no_open_report)?;
        Ok(view::compute_csv_view(&open.table, controls))
    }

    pub async fn apply_csv_action(&self, controls: &CsvControls, action: CsvAction) -> AppResult<CsvControls> {
        let total_pages = self.csv_view(controls).await?.pagination.total_pages;
        Ok(controls.apply(action, total_pages))
    }

    /// Whole loaded table as text, regardless of the current filter.
    pub async fn export_csv(&self) -> AppResult<String> {
        let state = self.state.read().await;
        let open = state.open_report.as_ref().ok_or_else(no_open_report)?;
        csv_adapter::export(&open.table)
    }

    pub async fn export_csv_to_file(&self) -> AppResult<ExportResponse> {
        let (name, contents) = {
            let state = self.state.read().await;
            let open = state.open_report.as_ref().ok_or_else(no_open_report)?;
            (open.name.clone(), csv_adapter::export(&open.table)?)
        };

        let export_dir = {
            let settings = self.settings.read().await;
            config::export_dir(&self.app_data_dir, &settings)
        };
        std::fs::create_dir_all(&export_dir).map_err(|error| AppError::Io(error.to_string()))?;

        let output_path = export_dir.join(format!("{}.csv", sanitize_component(&name)));
        if !output_path.starts_with(&export_dir) {
            return Err(AppError::Io("Resolved export path escaped export directory".to_string()));
        }
        std::fs::write(&output_path, contents).map_err(|error| AppError::Io(error.to_string()))?;
        tracing::info!(path = %output_path.display(), "csv exported");

        Ok(ExportResponse {
            path: output_path.to_string_lossy().to_string(),
        })
    }

    // ─── Helpers ────────────────────────────────────────────────────────────

    async fn require_record(&self, report_id: &str) -> AppResult<ReportRecord> {
        let state = self.state.read().await;
        state
            .records
            .iter()
            .find(|record| record.id == report_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Report {} not found", report_id)))
    }

    async fn replace_record(&self, updated: ReportRecord) {
        let mut state = self.state.write().await;
        if let Some(slot) = state.records.iter_mut().find(|record| record.id == updated.id) {
            *slot = updated;
        }
    }
}

fn normalize_tag(tag: &str) -> AppResult<String> {
    let trimmed = tag.trim();
    if trimmed.is_empty() {
        return Err(AppError::MalformedInput("Tag cannot be empty".to_string()));
    }
    Ok(trimmed.to_string())
}

fn no_open_report() -> AppError {
    AppError::NotFound("No report is open".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PageNav, PageSize, SortField, TagSet, ViewRows};
    use std::sync::Mutex;
    use std::time::Duration;

    fn record(id: &str, name: &str, active: bool, date: &str) -> ReportRecord {
        ReportRecord {
            id: id.to_string(),
            name: name.to_string(),
            is_active: active,
            tags: TagSet::new(),
            date: date.to_string(),
        }
    }

    /// In-memory store with switchable write failures and per-folder delays.
    #[derive(Default)]
    struct MemoryStore {
        folders: Mutex<Vec<(Folder, Vec<ReportRecord>)>>,
        csv: Mutex<Vec<(String, String)>>,
        fail_writes: Mutex<bool>,
        delays_ms: Mutex<Vec<(String, u64)>>,
        csv_fetches: Mutex<usize>,
    }

    impl MemoryStore {
        fn seeded() -> Arc<Self> {
            let store = Self::default();
            store.folders.lock().expect("folders").extend([
                (
                    Folder {
                        id: "sales".to_string(),
                        name: "Sales".to_string(),
                    },
                    vec![
                        record("r1", "Q1 revenue", true, "2024-01-02"),
                        record("r2", "Q2 revenue", false, "2024-04-02"),
                    ],
                ),
                (
                    Folder {
                        id: "ops".to_string(),
                        name: "Ops".to_string(),
                    },
                    vec![record("o1", "Uptime", true, "2024-02-01")],
                ),
            ]);
            store
                .csv
                .lock()
                .expect("csv")
                .push(("r1".to_string(), "region,amount\nnorth,10\nsouth,9\neast,100\n".to_string()));
            Arc::new(store)
        }

        fn update<F: FnOnce(&mut ReportRecord)>(&self, report_id: &str, mutate: F) -> AppResult<ReportRecord> {
            if *self.fail_writes.lock().expect("flag") {
                return Err(AppError::Persistence("disk full".to_string()));
            }
            let mut folders = self.folders.lock().expect("folders");
            let record = folders
                .iter_mut()
                .flat_map(|(_, records)| records.iter_mut())
                .find(|record| record.id == report_id)
                .ok_or_else(|| AppError::NotFound(report_id.to_string()))?;
            mutate(record);
            Ok(record.clone())
        }
    }

    impl ReportStore for MemoryStore {
        fn list_folders(&self) -> AppResult<Vec<Folder>> {
            Ok(self
                .folders
                .lock()
                .expect("folders")
                .iter()
                .map(|(folder, _)| folder.clone())
                .collect())
        }

        fn list_reports(&self, folder_id: &str) -> AppResult<Vec<ReportRecord>> {
            let delay = self
                .delays_ms
                .lock()
                .expect("delays")
                .iter()
                .find(|(id, _)| id == folder_id)
                .map(|(_, ms)| *ms);
            if let Some(ms) = delay {
                std::thread::sleep(Duration::from_millis(ms));
            }
            self.folders
                .lock()
                .expect("folders")
                .iter()
                .find(|(folder, _)| folder.id == folder_id)
                .map(|(_, records)| records.clone())
                .ok_or_else(|| AppError::NotFound(folder_id.to_string()))
        }

        fn set_active(&self, report_id: &str, active: bool) -> AppResult<ReportRecord> {
            self.update(report_id, |record| record.is_active = active)
        }

        fn add_tag(&self, report_id: &str, tag: &str) -> AppResult<ReportRecord> {
            self.update(report_id, |record| {
                record.tags.insert(tag);
            })
        }

        fn remove_tag(&self, report_id: &str, tag: &str) -> AppResult<ReportRecord> {
            self.update(report_id, |record| {
                record.tags.remove(tag);
            })
        }

        fn get_raw_csv(&self, report_id: &str) -> AppResult<String> {
            *self.csv_fetches.lock().expect("fetches") += 1;
            self.csv
                .lock()
                .expect("csv")
                .iter()
                .find(|(id, _)| id == report_id)
                .map(|(_, text)| text.clone())
                .ok_or_else(|| AppError::NotFound(report_id.to_string()))
        }

        fn create_report(&self, folder_id: &str, name: &str, csv_text: &str) -> AppResult<ReportRecord> {
            if *self.fail_writes.lock().expect("flag") {
                return Err(AppError::Persistence("disk full".to_string()));
            }
            let created = record(&format!("new-{}", name), name, true, "2024-05-05");
            let mut folders = self.folders.lock().expect("folders");
            let (_, records) = folders
                .iter_mut()
                .find(|(folder, _)| folder.id == folder_id)
                .ok_or_else(|| AppError::NotFound(folder_id.to_string()))?;
            records.push(created.clone());
            self.csv.lock().expect("csv").push((created.id.clone(), csv_text.to_string()));
            Ok(created)
        }
    }

    fn dashboard(store: Arc<MemoryStore>) -> (tempfile::TempDir, Arc<Dashboard>) {
        let dir = tempfile::tempdir().expect("app data dir");
        let dashboard = Dashboard::with_store(store, AppSettings::default(), dir.path().to_path_buf());
        (dir, dashboard)
    }

    #[tokio::test]
    async fn select_folder_loads_records() {
        let (_dir, dashboard) = dashboard(MemoryStore::seeded());
        assert_eq!(dashboard.list_folders().await.len(), 2);
        let records = dashboard.select_folder("sales").await;
        assert_eq!(records.len(), 2);
        assert_eq!(dashboard.current_folder().await.as_deref(), Some("sales"));
    }

    #[tokio::test]
    async fn failed_load_degrades_to_empty() {
        let (_dir, dashboard) = dashboard(MemoryStore::seeded());
        assert!(dashboard.select_folder("missing").await.is_empty());
        assert!(dashboard.records().await.is_empty());
    }

    #[tokio::test]
    async fn stale_folder_load_is_discarded() {
        let store = MemoryStore::seeded();
        store.delays_ms.lock().expect("delays").push(("sales".to_string(), 300));
        let (_dir, dashboard) = dashboard(store);

        let slow = {
            let dashboard = Arc::clone(&dashboard);
            tokio::spawn(async move { dashboard.select_folder("sales").await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        let fast = dashboard.select_folder("ops").await;
        let from_slow = slow.await.expect("slow load task");

        assert_eq!(fast.len(), 1);
        assert_eq!(from_slow, fast);
        assert_eq!(dashboard.current_folder().await.as_deref(), Some("ops"));
    }

    #[tokio::test]
    async fn toggle_status_persists_then_updates_snapshot() {
        let (_dir, dashboard) = dashboard(MemoryStore::seeded());
        dashboard.select_folder("sales").await;
        let updated = dashboard.toggle_status("r2").await.expect("toggle");
        assert!(updated.is_active);
        assert!(dashboard.records().await.iter().all(|record| record.is_active));
    }

    #[tokio::test]
    async fn persistence_failure_leaves_snapshot_unchanged() {
        let store = MemoryStore::seeded();
        let (_dir, dashboard) = dashboard(Arc::clone(&store));
        dashboard.select_folder("sales").await;
        *store.fail_writes.lock().expect("flag") = true;

        let error = dashboard.toggle_status("r1").await.expect_err("write fails");
        assert!(matches!(error, AppError::Persistence(_)));
        let error = dashboard.add_tag("r1", "q1").await.expect_err("write fails");
        assert!(matches!(error, AppError::Persistence(_)));

        let records = dashboard.records().await;
        assert!(records[0].is_active);
        assert!(records[0].tags.is_empty());
    }

    #[tokio::test]
    async fn tags_add_remove_and_list() {
        let (_dir, dashboard) = dashboard(MemoryStore::seeded());
        dashboard.select_folder("sales").await;
        dashboard.add_tag("r1", " finance ").await.expect("add");
        dashboard.add_tag("r2", "archive").await.expect("add");
        dashboard.add_tag("r2", "finance").await.expect("add");
        assert_eq!(dashboard.tags().await, vec!["archive", "finance"]);

        dashboard.remove_tag("r2", "archive").await.expect("remove");
        assert_eq!(dashboard.tags().await, vec!["finance"]);
        assert!(matches!(dashboard.add_tag("r1", "  ").await, Err(AppError::MalformedInput(_))));
        assert!(matches!(dashboard.add_tag("zz", "x").await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn inactive_report_is_refused_before_fetch() {
        let store = MemoryStore::seeded();
        let (_dir, dashboard) = dashboard(Arc::clone(&store));
        dashboard.select_folder("sales").await;

        let error = dashboard.open_report("r2").await.expect_err("inactive");
        assert!(error.to_string().starts_with("REPORT_INACTIVE"));
        assert_eq!(*store.csv_fetches.lock().expect("fetches"), 0);
    }

    #[tokio::test]
    async fn open_report_drives_csv_view_and_export() {
        let (dir, dashboard) = dashboard(MemoryStore::seeded());
        dashboard.select_folder("sales").await;
        let table = dashboard.open_report("r1").await.expect("open");
        assert_eq!(table.rows.len(), 3);

        let controls = dashboard.initial_csv_controls().await;
        let controls = dashboard
            .apply_csv_action(&controls, CsvAction::ClickColumn(1))
            .await
            .expect("sort");
        let view = dashboard.csv_view(&controls).await.expect("csv view");
        let amounts: Vec<&str> = view.rows.iter().map(|row| row[1].as_str()).collect();
        assert_eq!(amounts, vec!["9", "10", "100"]);

        let filtered = CsvControls {
            filter_text: "north".to_string(),
            ..controls
        };
        assert_eq!(dashboard.csv_view(&filtered).await.expect("view").rows.len(), 1);
        assert_eq!(
            dashboard.export_csv().await.expect("export"),
            "region,amount\nnorth,10\nsouth,9\neast,100\n"
        );

        let exported = dashboard.export_csv_to_file().await.expect("export file");
        assert!(PathBuf::from(&exported.path).starts_with(dir.path().join("exports")));
        assert!(exported.path.ends_with("Q1_revenue.csv"));

        dashboard.close_report().await;
        assert!(matches!(dashboard.csv_view(&filtered).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn missing_csv_is_not_found() {
        let (_dir, dashboard) = dashboard(MemoryStore::seeded());
        dashboard.select_folder("ops").await;
        assert!(matches!(dashboard.open_report("o1").await, Err(AppError::NotFound(_))));
        assert_eq!(dashboard.open_report_id().await, None);
    }

    #[tokio::test]
    async fn actions_keep_page_in_range() {
        let (_dir, dashboard) = dashboard(MemoryStore::seeded());
        dashboard.select_folder("sales").await;
        let controls = ControlState {
            page_size: PageSize::limited(1),
            ..ControlState::default()
        };
        let last = dashboard
            .apply_action(&controls, ControlAction::Navigate(PageNav::Last))
            .await;
        assert_eq!(last.page, 2);
        let beyond = dashboard.apply_action(&last, ControlAction::Navigate(PageNav::Next)).await;
        assert_eq!(beyond.page, 2);

        let sorted = dashboard.apply_action(&beyond, ControlAction::ClickSort(SortField::Status)).await;
        let view = dashboard.view(&sorted).await;
        let ViewRows::Flat(rows) = view.rows else {
            panic!("expected flat rows");
        };
        assert_eq!(rows[0].id, "r1");
    }

    #[tokio::test]
    async fn upload_appends_to_current_folder() {
        let (_dir, dashboard) = dashboard(MemoryStore::seeded());
        dashboard.select_folder("sales").await;
        let created = dashboard
            .upload_report(UploadReportPayload {
                folder_id: "sales".to_string(),
                name: "Q3".to_string(),
                csv_text: "a\n1\n".to_string(),
            })
            .await
            .expect("upload");
        assert!(dashboard.records().await.contains(&created));
    }

    #[tokio::test]
    async fn failed_upload_leaves_folder_snapshot() {
        let store = MemoryStore::seeded();
        let (_dir, dashboard) = dashboard(Arc::clone(&store));
        dashboard.select_folder("sales").await;
        *store.fail_writes.lock().expect("flag") = true;

        let error = dashboard
            .upload_report(UploadReportPayload {
                folder_id: "sales".to_string(),
                name: "Q3".to_string(),
                csv_text: "a\n1\n".to_string(),
            })
            .await
            .expect_err("write failure");
        assert!(matches!(error, AppError::Persistence(_)));
        assert_eq!(dashboard.records().await.len(), 2);
    }

    #[tokio::test]
    async fn settings_update_changes_initial_controls() {
        let (_dir, dashboard) = dashboard(MemoryStore::seeded());
        assert_eq!(dashboard.initial_controls().await.page_size, PageSize::limited(10));
        dashboard
            .update_settings(serde_json::json!({"defaultPageSize": 25, "groupByDate": true}))
            .await
            .expect("update");
        let controls = dashboard.initial_controls().await;
        assert_eq!(controls.page_size, PageSize::limited(25));
        assert!(controls.group_by_date);
    }
}
