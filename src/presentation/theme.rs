use crate::domain::models::{MessageSeverity, PeripheralState};
use eframe::egui;

pub struct BrutalistPalette {
    pub bg: egui::Color32,
    pub fg: egui::Color32,
    pub stroke: egui::Color32,
    pub field_bg: egui::Color32,
    pub hover: egui::Color32,
    pub pressed: egui::Color32,
    pub selection: egui::Color32,
}

impl BrutalistPalette {
    pub fn new(is_dark: bool) -> Self {
        if is_dark {
            Self {
                bg: egui::Color32::from_rgb(25, 25, 25),
                fg: egui::Color32::WHITE,
                stroke: egui::Color32::WHITE,
                field_bg: egui::Color32::from_gray(30),
                hover: egui::Color32::from_rgb(255, 200, 0),
                pressed: egui::Color32::from_rgb(0, 255, 127),
                selection: egui::Color32::from_rgb(0, 255, 255),
            }
        } else {
            Self {
                bg: egui::Color32::from_rgb(245, 245, 245),
                fg: egui::Color32::BLACK,
                stroke: egui::Color32::BLACK,
                field_bg: egui::Color32::WHITE,
                hover: egui::Color32::from_rgb(255, 220, 0),
                pressed: egui::Color32::from_rgb(0, 255, 100),
                selection: egui::Color32::from_rgb(0, 200, 255),
            }
        }
    }
}

/// Banner text and colors (background, foreground) for a peripheral state
pub fn state_banner(state: PeripheralState) -> (&'static str, egui::Color32, egui::Color32) {
    match state {
        PeripheralState::Idle => (
            "IDLE",
            egui::Color32::from_gray(100),
            egui::Color32::WHITE,
        ),
        PeripheralState::Advertising => (
            "ADVERTISING",
            egui::Color32::from_rgb(255, 200, 0),
            egui::Color32::BLACK,
        ),
        PeripheralState::Connected => (
            "CONNECTED",
            egui::Color32::from_rgb(0, 200, 0),
            egui::Color32::BLACK,
        ),
    }
}

pub fn severity_color(severity: MessageSeverity) -> egui::Color32 {
    match severity {
        MessageSeverity::Info => egui::Color32::from_rgb(50, 50, 255),
        MessageSeverity::Success => egui::Color32::from_rgb(0, 150, 0),
        MessageSeverity::Warning => egui::Color32::from_rgb(200, 150, 0),
        MessageSeverity::Error => egui::Color32::from_rgb(255, 50, 50),
    }
}

fn square(widget: &mut egui::style::WidgetVisuals, stroke_width: f32, stroke: egui::Color32) {
    widget.bg_stroke = egui::Stroke::new(stroke_width, stroke);
    widget.rounding = egui::Rounding::ZERO;
}

pub fn configure_neubrutalism(ctx: &egui::Context, is_dark: bool) {
    let mut style = (*ctx.style()).clone();
    let palette = BrutalistPalette::new(is_dark);

    style
        .text_styles
        .iter_mut()
        .for_each(|(text_style, font_id)| {
            font_id.size = match text_style {
                egui::TextStyle::Heading => 26.0,
                egui::TextStyle::Body | egui::TextStyle::Button => 15.0,
                egui::TextStyle::Monospace => 13.0,
                _ => font_id.size,
            };
        });

    style.spacing.item_spacing = egui::vec2(10.0, 10.0);
    style.spacing.button_padding = egui::vec2(16.0, 10.0);
    style.spacing.text_edit_width = 320.0;

    let widgets = &mut style.visuals.widgets;
    square(&mut widgets.noninteractive, 2.0, palette.stroke);
    widgets.noninteractive.fg_stroke = egui::Stroke::new(1.0, palette.fg);
    widgets.noninteractive.bg_fill = palette.bg;

    square(&mut widgets.inactive, 2.0, palette.stroke);
    widgets.inactive.bg_fill = palette.field_bg;
    widgets.inactive.fg_stroke = egui::Stroke::new(1.0, palette.fg);

    square(&mut widgets.hovered, 2.5, palette.stroke);
    widgets.hovered.bg_fill = palette.hover;
    widgets.hovered.fg_stroke = egui::Stroke::new(1.0, egui::Color32::BLACK);
    widgets.hovered.expansion = 2.0;

    square(&mut widgets.active, 3.0, palette.stroke);
    widgets.active.bg_fill = palette.pressed;
    widgets.active.fg_stroke = egui::Stroke::new(1.0, egui::Color32::BLACK);

    style.visuals.extreme_bg_color = palette.field_bg;
    style.visuals.selection.stroke = egui::Stroke::new(1.0, palette.stroke);
    style.visuals.selection.bg_fill = palette.selection;

    style.visuals.window_rounding = egui::Rounding::ZERO;
    style.visuals.window_stroke = egui::Stroke::new(2.0, palette.stroke);
    style.visuals.window_shadow = egui::Shadow {
        offset: egui::vec2(8.0, 8.0),
        blur: 0.0,
        spread: 0.0,
        color: palette.stroke,
    };
    style.visuals.window_fill = palette.bg;
    style.visuals.panel_fill = palette.bg;
    style.visuals.override_text_color = Some(palette.fg);

    ctx.set_style(style);
}
