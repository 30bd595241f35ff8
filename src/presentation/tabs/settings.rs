use crate::domain::models::MessageSeverity;
use crate::presentation::app::SimulatorApp;
use crate::presentation::components::Components;
use eframe::egui;

pub fn render(app: &mut SimulatorApp, ui: &mut egui::Ui) {
    Components::heading(ui, "Settings");
    ui.add_space(20.0);

    let mut saved = None;

    if let Ok(mut settings) = app.settings.lock() {
        let settings_mut = settings.get_mut();

        Components::brutalist_card(ui, "Operator Values", |ui| {
            ui.checkbox(
                &mut settings_mut.remember_values,
                "Restore field values on next launch",
            );
            ui.horizontal(|ui| {
                ui.label(format!("{} values saved", settings_mut.values.len()));
                if ui.button("Forget Saved Values").clicked() {
                    settings_mut.values.clear();
                }
            });
        });

        ui.add_space(10.0);

        Components::brutalist_card(ui, "Logging & Debug", |ui| {
            ui.horizontal(|ui| {
                ui.label("Verbosity Level:");
                egui::ComboBox::from_id_salt("log_level")
                    .selected_text(&settings_mut.log_settings.level)
                    .show_ui(ui, |ui| {
                        for level in &["trace", "debug", "info", "warn", "error"] {
                            ui.selectable_value(
                                &mut settings_mut.log_settings.level,
                                level.to_string(),
                                *level,
                            );
                        }
                    });
            });

            ui.checkbox(
                &mut settings_mut.log_settings.console_logging_enabled,
                "Standard Console Logs",
            );
            ui.checkbox(
                &mut settings_mut.log_settings.file_logging_enabled,
                "Persistent File Logs",
            );

            if settings_mut.log_settings.file_logging_enabled {
                ui.indent("file_logs", |ui| {
                    ui.horizontal(|ui| {
                        ui.label("Save Path:");
                        ui.text_edit_singleline(&mut settings_mut.log_settings.log_dir);
                    });
                    ui.horizontal(|ui| {
                        ui.label("Rotation:");
                        egui::ComboBox::from_id_salt("log_rot")
                            .selected_text(&settings_mut.log_settings.rotation)
                            .show_ui(ui, |ui| {
                                for rot in &["daily", "hourly", "minutely", "never"] {
                                    ui.selectable_value(
                                        &mut settings_mut.log_settings.rotation,
                                        rot.to_string(),
                                        *rot,
                                    );
                                }
                            });
                    });
                });
            }

            ui.collapsing("Record Layout", |ui| {
                ui.checkbox(&mut settings_mut.log_settings.show_file_line, "File and line");
                ui.checkbox(&mut settings_mut.log_settings.show_thread_ids, "Thread ids");
                ui.checkbox(&mut settings_mut.log_settings.show_target, "Target module");
                ui.checkbox(&mut settings_mut.log_settings.ansi_colors, "ANSI colors");
            });

            ui.label(
                egui::RichText::new("Restart required for log changes.")
                    .italics()
                    .size(12.0),
            );
        });

        ui.add_space(10.0);

        if ui.button("Save Settings").clicked() {
            saved = Some(settings.save());
        }
    }

    match saved {
        Some(Ok(())) => app.report("Settings saved", MessageSeverity::Success),
        Some(Err(e)) => app.report(format!("Saving settings failed: {}", e), MessageSeverity::Error),
        None => {}
    }
}
