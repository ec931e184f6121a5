use eframe::egui;

use crate::state::{AppState, KeyAction};
use crate::ui::panels::report_failure;
use crate::ui::{panels, plot, windows};

/// Plot shortcuts, in the order they are checked.
const SHORTCUTS: [(egui::Key, char); 6] = [
    (egui::Key::Q, 'q'),
    (egui::Key::A, 'a'),
    (egui::Key::L, 'l'),
    (egui::Key::Z, 'z'),
    (egui::Key::E, 'e'),
    (egui::Key::H, 'h'),
];

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct LinefinderApp {
    pub state: AppState,
}

impl LinefinderApp {
    pub fn new(cc: &eframe::CreationContext<'_>, state: AppState) -> Self {
        // Black spectrum traces and markers need a light background.
        cc.egui_ctx.set_visuals(egui::Visuals::light());
        Self { state }
    }

    /// Dispatch at most one shortcut per frame to the state.
    fn handle_keys(&mut self, ctx: &egui::Context, cursor: Option<f64>) {
        if self.state.session.is_none() || ctx.wants_keyboard_input() || windows::any_open(&self.state) {
            return;
        }
        let pressed = ctx.input(|i| {
            SHORTCUTS
                .iter()
                .find(|(key, _)| i.key_pressed(*key))
                .map(|(_, c)| *c)
        });
        if let Some(action) = pressed.and_then(KeyAction::from_char) {
            report_failure(&mut self.state, "handle key", |s| s.handle_key(action, cursor));
        }
    }
}

impl eframe::App for LinefinderApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        let exit = egui::TopBottomPanel::top("top_bar")
            .show(ctx, |ui| panels::top_bar(ui, &mut self.state))
            .inner;

        // ---- Left side panel: input files ----
        egui::SidePanel::left("setup_panel")
            .default_width(260.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: spectrum ----
        let cursor = egui::CentralPanel::default()
            .show(ctx, |ui| plot::spectrum_plot(ui, &mut self.state))
            .inner;

        windows::show(ctx, &mut self.state);
        self.handle_keys(ctx, cursor);

        if ctx.input(|i| i.viewport().close_requested()) {
            report_failure(&mut self.state, "save log", AppState::save_log);
        }
        if exit {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }
    }
}
