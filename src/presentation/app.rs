use crate::domain::advertising::AdvertisingData;
use crate::domain::catalog::CharacteristicId;
use crate::domain::models::{
    AppEvent, MessageSeverity, PeripheralState, SimulatorCommand, StatusMessage, Tab,
};
use crate::domain::settings::SettingsService;
use crate::domain::value_store::ValueStore;
use crate::infrastructure::bluetooth::virtual_radio::VirtualRadio;
use crate::infrastructure::logging::LoggingGuard;
use crate::presentation::{tabs, theme};
use eframe::egui;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info};

/// Both ends of the link to the control thread
pub struct AppChannels {
    pub commands: mpsc::UnboundedSender<SimulatorCommand>,
    pub events: mpsc::UnboundedReceiver<AppEvent>,
}

pub struct SimulatorApp {
    // Services
    pub(crate) settings: Arc<Mutex<SettingsService>>,
    pub(crate) command_tx: mpsc::UnboundedSender<SimulatorCommand>,
    pub(crate) event_rx: mpsc::UnboundedReceiver<AppEvent>,

    // Peripheral state as last reported by the control thread
    pub(crate) peripheral_state: PeripheralState,
    pub(crate) status_text: String,
    pub(crate) status_message: Option<StatusMessage>,
    pub(crate) advertisement: Option<AdvertisingData>,
    pub(crate) rejection: Option<String>,

    // Form
    pub(crate) fields: BTreeMap<CharacteristicId, String>,
    pub(crate) committed: BTreeMap<CharacteristicId, String>,

    // Simulated central (virtual radio only)
    pub(crate) central: Option<VirtualRadio>,
    pub(crate) central_address_input: String,

    // UI State
    pub(crate) selected_tab: Tab,
    pub(crate) is_dark_mode: bool,
    pub(crate) shutdown_sent: bool,

    // Logging guard
    pub(crate) _logging_guard: Option<LoggingGuard>,
}

impl SimulatorApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        settings: SettingsService,
        store: &ValueStore,
        channels: AppChannels,
        central: Option<VirtualRadio>,
        logging_guard: Option<LoggingGuard>,
    ) -> Self {
        let is_dark_mode = settings.get().dark_mode;
        theme::configure_neubrutalism(&cc.egui_ctx, is_dark_mode);

        let fields: BTreeMap<_, _> = store.iter().map(|(id, text)| (id, text.to_string())).collect();

        Self {
            settings: Arc::new(Mutex::new(settings)),
            command_tx: channels.commands,
            event_rx: channels.events,
            peripheral_state: PeripheralState::Idle,
            status_text: "Disconnected".to_string(),
            status_message: None,
            advertisement: None,
            rejection: None,
            committed: fields.clone(),
            fields,
            central,
            central_address_input: "AA:BB:CC:DD:EE:FF".to_string(),
            selected_tab: Tab::Simulator,
            is_dark_mode,
            shutdown_sent: false,
            _logging_guard: logging_guard,
        }
    }

    /// Hand a field's text to the peripheral if it changed since the last
    /// commit
    pub(crate) fn commit_field(&mut self, id: CharacteristicId) {
        let Some(text) = self.fields.get(&id).cloned() else {
            return;
        };
        if self.committed.get(&id) == Some(&text) {
            return;
        }

        self.committed.insert(id, text.clone());
        if let Ok(mut settings) = self.settings.lock() {
            if let Err(e) = settings.remember_value(id, &text) {
                error!("Failed to remember {}: {}", id.label(), e);
            }
        }
        let _ = self
            .command_tx
            .send(SimulatorCommand::ValueChanged(id, text));
    }

    pub(crate) fn toggle_advertising(&mut self) {
        for id in CharacteristicId::ALL {
            self.commit_field(id);
        }
        let _ = self.command_tx.send(SimulatorCommand::ToggleAdvertising);
    }

    pub(crate) fn set_dark_mode(&mut self, ctx: &egui::Context, is_dark: bool) {
        self.is_dark_mode = is_dark;
        theme::configure_neubrutalism(ctx, is_dark);
        if let Ok(mut settings) = self.settings.lock() {
            settings.get_mut().dark_mode = is_dark;
            if let Err(e) = settings.save() {
                error!("Failed to save settings: {}", e);
            }
        }
    }

    fn process_events(&mut self) {
        while let Ok(event) = self.event_rx.try_recv() {
            match event {
                AppEvent::PeripheralState(state) => self.peripheral_state = state,
                AppEvent::StatusText(text) => self.status_text = text,
                AppEvent::Advertisement(advertisement) => self.advertisement = advertisement,
                AppEvent::StartRejected(message) => self.rejection = Some(message),
                AppEvent::LogMessage(msg) => self.status_message = Some(msg),
            }
        }
    }

    fn shutdown(&mut self) {
        if self.shutdown_sent {
            return;
        }
        self.shutdown_sent = true;
        info!("Window closing, releasing peripheral");

        for id in CharacteristicId::ALL {
            self.commit_field(id);
        }
        let _ = self.command_tx.send(SimulatorCommand::Shutdown);
        if let Ok(settings) = self.settings.lock() {
            if let Err(e) = settings.save() {
                error!("Failed to save settings: {}", e);
            }
        }
    }

    fn rejection_dialog(&mut self, ctx: &egui::Context) {
        let Some(message) = self.rejection.clone() else {
            return;
        };

        egui::Window::new("Invalid Serial Number")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
            .show(ctx, |ui| {
                ui.label(egui::RichText::new(&message).strong());
                ui.add_space(8.0);
                if ui.button("OK").clicked() {
                    self.rejection = None;
                }
            });
    }

    pub(crate) fn report(&mut self, message: impl Into<String>, severity: MessageSeverity) {
        self.status_message = Some(StatusMessage {
            message: message.into(),
            severity,
        });
    }
}

impl eframe::App for SimulatorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_events();

        if ctx.input(|i| i.viewport().close_requested()) {
            self.shutdown();
        }

        // Events arrive from another thread; poll for them
        ctx.request_repaint_after(Duration::from_millis(100));

        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.selectable_value(&mut self.selected_tab, Tab::Simulator, "Simulator");
                if self.central.is_some() {
                    ui.selectable_value(&mut self.selected_tab, Tab::Central, "Central");
                }
                ui.selectable_value(&mut self.selected_tab, Tab::Settings, "Settings");

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let switch_icon = if self.is_dark_mode {
                        "☀ Light"
                    } else {
                        "🌙 Dark"
                    };
                    if ui.button(switch_icon).clicked() {
                        self.set_dark_mode(ctx, !self.is_dark_mode);
                    }
                });
            });
        });

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            tabs::simulator::status_bar(self, ui);
        });

        let modal_open = self.rejection.is_some();
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_enabled_ui(!modal_open, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.set_max_width(720.0);
                        ui.add_space(20.0);

                        match self.selected_tab {
                            Tab::Simulator => tabs::simulator::render(self, ui),
                            Tab::Central => tabs::central::render(self, ui),
                            Tab::Settings => tabs::settings::render(self, ui),
                        }

                        ui.add_space(50.0);
                    });
                });
            });
        });

        self.rejection_dialog(ctx);
    }
}
