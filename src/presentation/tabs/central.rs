use crate::domain::catalog::{CharacteristicId, ServiceKind};
use crate::domain::models::MessageSeverity;
use crate::presentation::app::SimulatorApp;
use crate::presentation::components::Components;
use eframe::egui;

pub fn render(app: &mut SimulatorApp, ui: &mut egui::Ui) {
    Components::heading(ui, "Virtual Central");
    ui.add_space(20.0);

    let Some(radio) = app.central.clone() else {
        ui.label("Central simulation is only available with the virtual radio.");
        return;
    };

    Components::brutalist_card(ui, "Link", |ui| {
        ui.horizontal(|ui| {
            ui.label("Address:");
            ui.text_edit_singleline(&mut app.central_address_input);
        });

        ui.horizontal(|ui| {
            match radio.central() {
                Some(address) => {
                    ui.label(format!("Attached: {}", address));
                    if ui.button("Disconnect").clicked() {
                        if let Err(e) = radio.disconnect_central() {
                            app.report(e.to_string(), MessageSeverity::Warning);
                        }
                    }
                }
                None => {
                    let address = app.central_address_input.trim().to_string();
                    let can_connect = radio.is_advertising() && !address.is_empty();
                    if ui
                        .add_enabled(can_connect, egui::Button::new("Connect"))
                        .clicked()
                    {
                        if let Err(e) = radio.connect_central(&address) {
                            app.report(e.to_string(), MessageSeverity::Warning);
                        }
                    }
                    if !radio.is_advertising() {
                        ui.label(egui::RichText::new("Start advertising first").italics());
                    }
                }
            }
        });
    });

    ui.add_space(10.0);

    Components::brutalist_card(ui, "On Air", |ui| match radio.advertisement() {
        Some(advertisement) => {
            ui.label(format!("Discoverability: {:?}", advertisement.discoverability));
            for uuid in &advertisement.service_uuids {
                ui.label(format!("Service: {}", uuid));
            }
            if let Some(md) = &advertisement.manufacturer_data {
                ui.horizontal(|ui| {
                    ui.label(format!("Manufacturer {:#06x}:", md.company_id));
                    Components::hex_label(ui, &md.data);
                });
            }
        }
        None => {
            ui.label("Not advertising");
        }
    });

    ui.add_space(10.0);

    let services = radio.air_view();
    Components::brutalist_card(ui, "GATT Database", |ui| {
        if services.is_empty() {
            ui.label("No services published");
            return;
        }

        for service in &services {
            let kind = ServiceKind::ALL
                .into_iter()
                .find(|k| k.identity() == service.identity);
            let title = match kind {
                Some(kind) => format!("{} ({})", kind.title(), service.identity),
                None => service.identity.to_string(),
            };
            Components::sub_heading(ui, &title);

            egui::Grid::new(service.identity.to_string())
                .num_columns(4)
                .spacing([20.0, 6.0])
                .striped(true)
                .show(ui, |ui| {
                    for characteristic in &service.characteristics {
                        let name = kind
                            .and_then(|k| CharacteristicId::find(k, characteristic.identity))
                            .map(|id| id.label().to_string())
                            .unwrap_or_else(|| characteristic.identity.to_string());
                        ui.label(name);
                        ui.label(
                            egui::RichText::new(format!(
                                "{:#04x}",
                                characteristic.properties.bits()
                            ))
                            .monospace(),
                        );
                        // Latin-1 decodes every byte
                        ui.label(
                            characteristic
                                .value
                                .iter()
                                .map(|&b| b as char)
                                .collect::<String>(),
                        );
                        Components::hex_label(ui, &characteristic.value);
                        ui.end_row();
                    }
                });
            ui.add_space(8.0);
        }
    });
}
