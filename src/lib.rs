pub mod config;
pub mod csv_adapter;
pub mod dashboard;
pub mod errors;
pub mod models;
pub mod store;
pub mod view;

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;

pub use crate::dashboard::Dashboard;
pub use crate::errors::{AppError, AppResult};
pub use crate::view::{compute_csv_view, compute_view};

static LOG_GUARD: std::sync::OnceLock<WorkerGuard> = std::sync::OnceLock::new();

pub fn init_tracing(app_data_dir: &Path) -> Result<(), String> {
    let log_dir = app_data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).map_err(|error| error.to_string())?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "dashboard.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .json()
        .with_writer(non_blocking)
        .try_init()
        .map_err(|error| error.to_string())
}

#[cfg(feature = "desktop")]
mod commands {
    use crate::dashboard::Dashboard;
    use crate::models::{
        AppSettings, BooleanResponse, ControlState, CsvControls, CsvTable, CsvView, ExportResponse, Folder,
        ReportRecord, ReportView, TagPayload, UploadReportPayload,
    };
    use crate::view::{ControlAction, CsvAction};
    use std::sync::Arc;

    #[derive(Clone)]
    pub struct AppState {
        pub dashboard: Arc<Dashboard>,
    }

    #[tauri::command]
    pub async fn folders_list(state: tauri::State<'_, AppState>) -> Result<Vec<Folder>, String> {
        Ok(state.dashboard.list_folders().await)
    }

    #[tauri::command]
    pub async fn folder_select(
        state: tauri::State<'_, AppState>,
        folder_id: String,
    ) -> Result<Vec<ReportRecord>, String> {
        Ok(state.dashboard.select_folder(&folder_id).await)
    }

    #[tauri::command]
    pub async fn report_view(state: tauri::State<'_, AppState>, controls: ControlState) -> Result<ReportView, String> {
        Ok(state.dashboard.view(&controls).await)
    }

    #[tauri::command]
    pub async fn controls_initial(state: tauri::State<'_, AppState>) -> Result<ControlState, String> {
        Ok(state.dashboard.initial_controls().await)
    }

    #[tauri::command]
    pub async fn controls_apply(
        state: tauri::State<'_, AppState>,
        controls: ControlState,
        action: ControlAction,
    ) -> Result<ControlState, String> {
        Ok(state.dashboard.apply_action(&controls, action).await)
    }

    #[tauri::command]
    pub async fn report_toggle_status(
        state: tauri::State<'_, AppState>,
        report_id: String,
    ) -> Result<ReportRecord, String> {
        state
            .dashboard
            .toggle_status(&report_id)
            .await
            .map_err(to_client_error)
    }

    #[tauri::command]
    pub async fn report_tag_add(state: tauri::State<'_, AppState>, payload: TagPayload) -> Result<ReportRecord, String> {
        state
            .dashboard
            .add_tag(&payload.report_id, &payload.tag)
            .await
            .map_err(to_client_error)
    }

    #[tauri::command]
    pub async fn report_tag_remove(
        state: tauri::State<'_, AppState>,
        payload: TagPayload,
    ) -> Result<ReportRecord, String> {
        state
            .dashboard
            .remove_tag(&payload.report_id, &payload.tag)
            .await
            .map_err(to_client_error)
    }

    #[tauri::command]
    pub async fn tags_list(state: tauri::State<'_, AppState>) -> Result<Vec<String>, String> {
        Ok(state.dashboard.tags().await)
    }

    #[tauri::command]
    pub async fn report_upload(
        state: tauri::State<'_, AppState>,
        payload: UploadReportPayload,
    ) -> Result<ReportRecord, String> {
        state.dashboard.upload_report(payload).await.map_err(to_client_error)
    }

    #[tauri::command]
    pub async fn report_open(state: tauri::State<'_, AppState>, report_id: String) -> Result<CsvTable, String> {
        state
            .dashboard
            .open_report(&report_id)
            .await
            .map_err(to_client_error)
    }

    #[tauri::command]
    pub async fn report_close(state: tauri::State<'_, AppState>) -> Result<BooleanResponse, String> {
        state.dashboard.close_report().await;
        Ok(BooleanResponse { success: true })
    }

    #[tauri::command]
    pub async fn report_csv_view(state: tauri::State<'_, AppState>, controls: CsvControls) -> Result<CsvView, String> {
        state.dashboard.csv_view(&controls).await.map_err(to_client_error)
    }

    #[tauri::command]
    pub async fn csv_controls_initial(state: tauri::State<'_, AppState>) -> Result<CsvControls, String> {
        Ok(state.dashboard.initial_csv_controls().await)
    }

    #[tauri::command]
    pub async fn csv_controls_apply(
        state: tauri::State<'_, AppState>,
        controls: CsvControls,
        action: CsvAction,
    ) -> Result<CsvControls, String> {
        state
            .dashboard
            .apply_csv_action(&controls, action)
            .await
            .map_err(to_client_error)
    }

    #[tauri::command]
    pub async fn report_csv_export(state: tauri::State<'_, AppState>) -> Result<String, String> {
        state.dashboard.export_csv().await.map_err(to_client_error)
    }

    #[tauri::command]
    pub async fn report_csv_export_file(state: tauri::State<'_, AppState>) -> Result<ExportResponse, String> {
        state
            .dashboard
            .export_csv_to_file()
            .await
            .map_err(to_client_error)
    }

    #[tauri::command]
    pub async fn get_settings(state: tauri::State<'_, AppState>) -> Result<AppSettings, String> {
        Ok(state.dashboard.get_settings().await)
    }

    #[tauri::command]
    pub async fn update_settings(
        state: tauri::State<'_, AppState>,
        settings: serde_json::Value,
    ) -> Result<AppSettings, String> {
        state
            .dashboard
            .update_settings(settings)
            .await
            .map_err(to_client_error)
    }

    fn to_client_error(error: impl std::fmt::Display) -> String {
        error.to_string()
    }
}

#[cfg(feature = "desktop")]
pub fn run() {
    use tauri::Manager;

    tauri::Builder::default()
        .setup(|app| {
            let app_data_dir = app.path().app_data_dir().map_err(|error| error.to_string())?;
            std::fs::create_dir_all(&app_data_dir).map_err(|error| error.to_string())?;
            init_tracing(&app_data_dir).map_err(|error| error.to_string())?;

            let dashboard = Dashboard::new(app_data_dir).map_err(|error| error.to_string())?;
            app.manage(commands::AppState { dashboard });
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            commands::folders_list,
            commands::folder_select,
            commands::report_view,
            commands::controls_initial,
            commands::controls_apply,
            commands::report_toggle_status,
            commands::report_tag_add,
            commands::report_tag_remove,
            commands::tags_list,
            commands::report_upload,
            commands::report_open,
            commands::report_close,
            commands::report_csv_view,
            commands::csv_controls_initial,
            commands::csv_controls_apply,
            commands::report_csv_export,
            commands::report_csv_export_file,
            commands::get_settings,
            commands::update_settings
        ])
        .run(tauri::generate_context!())
        .expect("failed to run tauri app");
}
