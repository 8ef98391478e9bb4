mod app;
mod auth;
mod backend;
mod event;
mod state;
mod theme;
mod upload;

use app::RagdeskApp;
use backend::BackendClient;
use eframe::egui;
use std::sync::mpsc;
use theme::Theme;

const DEFAULT_API_HOST: &str = "http://localhost:8000";

fn api_base_url() -> String {
    std::env::var("RAGDESK_API_HOST")
        .ok()
        .map(|value| value.trim().trim_end_matches('/').to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_API_HOST.to_string())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let (tx, rx) = mpsc::channel();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("ragdesk-runtime")
        .build()?;

    let base_url = api_base_url();
    log::info!("using backend at {base_url}");
    let backend = BackendClient::new(base_url, tx, runtime.handle().clone())?;

    let (state, warnings) = state::store::load();
    for warning in &warnings {
        log::warn!("{warning}");
    }
    let app = RagdeskApp::new(rx, backend, state, warnings, state::store::state_path());
    let _runtime = runtime;

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1180.0, 760.0])
            .with_min_inner_size([960.0, 600.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Ragdesk",
        native_options,
        Box::new(move |creation_context| {
            Theme::default().apply_visuals(&creation_context.egui_ctx);
            Ok(Box::new(app))
        }),
    )?;

    Ok(())
}
