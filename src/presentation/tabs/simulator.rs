use crate::domain::catalog::ServiceKind;
use crate::presentation::app::SimulatorApp;
use crate::presentation::components::Components;
use crate::presentation::theme;
use eframe::egui;

pub fn render(app: &mut SimulatorApp, ui: &mut egui::Ui) {
    Components::heading(ui, "XLE Simulator");
    ui.add_space(20.0);

    ui_service_card(app, ui, ServiceKind::DeviceInformation);
    ui.add_space(15.0);

    ui_service_card(app, ui, ServiceKind::XleSetup);
    ui.add_space(15.0);

    ui_advertising_panel(app, ui);
}

fn ui_service_card(app: &mut SimulatorApp, ui: &mut egui::Ui, kind: ServiceKind) {
    Components::brutalist_card(ui, kind.title(), |ui| {
        egui::Grid::new(kind.title())
            .num_columns(2)
            .spacing([20.0, 8.0])
            .show(ui, |ui| {
                for &id in kind.characteristics() {
                    ui.label(format!("{}:", id.label()));
                    ui.vertical(|ui| {
                        let text = app.fields.entry(id).or_default();
                        let response = ui.add(egui::TextEdit::singleline(text));
                        // Enter also ends editing, so this covers both commits
                        if response.lost_focus() {
                            app.commit_field(id);
                        }
                        if kind == ServiceKind::XleSetup {
                            ui.label(
                                egui::RichText::new(id.identity().to_string())
                                    .monospace()
                                    .size(11.0),
                            );
                        }
                    });
                    ui.end_row();
                }
            });
    });
}

fn ui_advertising_panel(app: &mut SimulatorApp, ui: &mut egui::Ui) {
    Components::brutalist_card(ui, "Advertisement", |ui| {
        let (text, bg, fg) = theme::state_banner(app.peripheral_state);
        Components::status_banner(ui, text, bg, fg);
        ui.add_space(10.0);

        let label = if app.peripheral_state.is_running() {
            "Stop Advertisement"
        } else {
            "Start Advertisement"
        };
        if ui.button(label).clicked() {
            app.toggle_advertising();
        }

        if let Some(manufacturer) = app
            .advertisement
            .as_ref()
            .and_then(|a| a.manufacturer_data.as_ref())
        {
            ui.add_space(8.0);
            ui.horizontal(|ui| {
                ui.label(format!("Manufacturer {:#06x}:", manufacturer.company_id));
                Components::hex_label(ui, &manufacturer.data);
            });
        }

        if let Some(msg) = &app.status_message {
            ui.add_space(8.0);
            ui.label(
                egui::RichText::new(&msg.message)
                    .color(theme::severity_color(msg.severity))
                    .strong(),
            );
        }
    });
}

/// Bottom bar with the link status text
pub fn status_bar(app: &SimulatorApp, ui: &mut egui::Ui) {
    ui.horizontal(|ui| {
        ui.label(egui::RichText::new(&app.status_text).strong());
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            let (text, _, _) = theme::state_banner(app.peripheral_state);
            ui.label(text);
        });
    });
}
