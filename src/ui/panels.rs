use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::state::{AppState, KEY_HELP};

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar. Returns true when the user asked to exit.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) -> bool {
    let mut exit = false;
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Find Lines!").clicked() {
                find_lines(state);
                ui.close_menu();
            }
            if ui
                .add_enabled(state.session.is_some(), egui::Button::new("Save Log"))
                .clicked()
            {
                report_failure(state, "save log", |s| s.save_log());
                ui.close_menu();
            }
            ui.separator();
            if ui.button("Exit").clicked() {
                exit = true;
                ui.close_menu();
            }
        });

        ui.separator();

        if ui
            .selectable_label(state.config.tutorial, "Tutorial")
            .clicked()
        {
            state.toggle_tutorial();
        }

        if let Some(session) = &state.session {
            ui.separator();
            ui.label(format!(
                "{} lines of {} ions in {} systems",
                session.log.len(),
                session.log.ions().len(),
                session.log.redshifts().len()
            ));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::DARK_RED));
        }
    });
    exit
}

// ---------------------------------------------------------------------------
// Left side panel – input files, warnings and help
// ---------------------------------------------------------------------------

pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Input files");
    ui.separator();

    path_row(ui, "Spectrum", &mut state.spectrum_path, &["ascii", "txt", "dat"]);
    path_row(ui, "Line list", &mut state.line_list_path, &["lst", "txt"]);
    path_row(ui, "Log file", &mut state.log_path, &["log", "txt"]);

    ui.add_space(6.0);
    ui.vertical_centered(|ui: &mut Ui| {
        if ui.button(RichText::new("Find Lines!").strong()).clicked() {
            find_lines(state);
        }
    });

    if state.show_help {
        ui.separator();
        ui.strong("Keyboard");
        ui.monospace(KEY_HELP);
    }

    if !state.warnings.is_empty() {
        ui.separator();
        ui.horizontal(|ui: &mut Ui| {
            ui.strong("Warnings");
            if ui.small_button("Clear").clicked() {
                state.warnings.clear();
            }
        });
        ScrollArea::vertical()
            .auto_shrink([false, true])
            .max_height(240.0)
            .show(ui, |ui: &mut Ui| {
                for warning in state.warnings.iter().rev() {
                    ui.label(RichText::new(warning.to_string()).color(Color32::DARK_RED).small());
                }
            });
    }
}

fn path_row(ui: &mut Ui, label: &str, path: &mut String, extensions: &[&str]) {
    ui.label(label);
    ui.horizontal(|ui: &mut Ui| {
        ui.add(egui::TextEdit::singleline(path).desired_width(ui.available_width() - 60.0));
        if ui.button("Search").clicked() {
            if let Some(picked) = pick_file(label, extensions) {
                *path = picked;
            }
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

fn pick_file(title: &str, extensions: &[&str]) -> Option<String> {
    rfd::FileDialog::new()
        .set_title(format!("Select {}", title.to_lowercase()))
        .add_filter(title, extensions)
        .add_filter("All files", &["*"])
        .pick_file()
        .map(|path| path.display().to_string())
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

pub fn find_lines(state: &mut AppState) {
    report_failure(state, "load input files", |s| s.find_lines());
}

/// Run a fallible state action, surfacing any error in the status line.
pub fn report_failure(
    state: &mut AppState,
    what: &str,
    action: impl FnOnce(&mut AppState) -> anyhow::Result<()>,
) {
    if let Err(e) = action(state) {
        log::error!("Failed to {what}: {e:#}");
        state.status_message = Some(format!("Error: {e:#}"));
    }
}
