mod domain;
mod infrastructure;
mod presentation;

use crate::domain::models::SimulatorCommand;
use crate::domain::settings::SettingsService;
use crate::domain::value_store::ValueStore;
use crate::infrastructure::bluetooth::{self, PlatformRadio};
use crate::infrastructure::logging;
use crate::presentation::app::{AppChannels, SimulatorApp};
use eframe::egui;
use tokio::sync::mpsc;
use tracing::info;

fn main() -> anyhow::Result<()> {
    let settings = SettingsService::new()?;

    let logging_guard = logging::init_logger(&settings.get().log_settings)
        .map_err(|e| eprintln!("Failed to initialize logging: {}", e))
        .ok();

    info!("Starting XLE Simulator");

    let store = ValueStore::with_overrides(&settings.get().remembered_values());
    let radio = PlatformRadio::new();

    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let control =
        bluetooth::spawn_control_thread(radio.clone(), store.clone(), command_rx, event_tx)?;

    #[cfg(not(windows))]
    let central = Some(radio);
    #[cfg(windows)]
    let central = None;

    let channels = AppChannels {
        commands: command_tx.clone(),
        events: event_rx,
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([760.0, 820.0])
            .with_title("XLE Simulator"),
        ..Default::default()
    };

    let result = eframe::run_native(
        "XLE Simulator",
        options,
        Box::new(move |cc| {
            Ok(Box::new(SimulatorApp::new(
                cc,
                settings,
                &store,
                channels,
                central,
                logging_guard,
            )))
        }),
    );

    // The window may be gone without a close request (e.g. a GL failure)
    let _ = command_tx.send(SimulatorCommand::Shutdown);
    control
        .join()
        .map_err(|_| anyhow::anyhow!("Peripheral control thread panicked"))?;
    info!("XLE Simulator stopped");

    result.map_err(|e| anyhow::anyhow!("Window error: {}", e))
}
