mod app;
mod backend;
mod config;
mod event;
mod role;
mod session;
mod theme;
mod ui;
mod wallet;

use app::AgriApp;
use backend::rest::RestBackend;
use config::AppConfig;
use eframe::egui;
use log::info;
use session::coordinator::SessionCoordinator;
use std::sync::mpsc;
use std::sync::Arc;
use wallet::rpc::JsonRpcWallet;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::load()?;
    info!("backend: {}", config.backend_url);
    info!("wallet bridge: {}", config.wallet_rpc_url);

    let (tx, rx) = mpsc::channel();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("agrimarket-runtime")
        .build()?;

    let backend = RestBackend::new(
        &config.backend_url,
        config.backend_key.clone(),
        config.request_timeout(),
    )?;
    let wallet = JsonRpcWallet::new(
        config.wallet_rpc_url.clone(),
        config.request_timeout(),
        config.account_poll_interval(),
    )?;
    let coordinator =
        SessionCoordinator::new(Arc::new(wallet), Arc::new(backend.clone())).with_events(tx.clone());

    let app = AgriApp::new(
        rx,
        tx,
        coordinator,
        backend,
        runtime.handle().clone(),
        config.start_route()?,
    );
    let _runtime = runtime;

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1180.0, 780.0])
            .with_min_inner_size([900.0, 600.0]),
        ..Default::default()
    };

    eframe::run_native(
        "AgriMarket",
        native_options,
        Box::new(move |_creation_context| Ok(Box::new(app))),
    )?;

    Ok(())
}
