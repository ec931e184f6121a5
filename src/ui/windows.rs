use eframe::egui::{self, Context, Id, RichText, Ui};

use crate::color::{color32, colour_name};
use crate::data::logbook::{Colour, Redshift};
use crate::state::{AppState, BoundClick};
use crate::ui::panels::report_failure;
use crate::ui::plot;

const PANEL_SIZE: [f32; 2] = [260.0, 140.0];

/// True while any floating window wants the user's attention, so plot
/// shortcuts stay quiet.
pub fn any_open(state: &AppState) -> bool {
    state.system_view.is_some()
        || !state.editors.is_empty()
        || state.log_editor.is_some()
        || state.redshift_prompt.is_some()
        || state.line_prompt.is_some()
}

pub fn show(ctx: &Context, state: &mut AppState) {
    system_view(ctx, state);
    line_editor(ctx, state);
    log_editor(ctx, state);
    redshift_prompt(ctx, state);
    line_prompt(ctx, state);
}

// ---------------------------------------------------------------------------
// System view – velocity grid with selection boxes
// ---------------------------------------------------------------------------

fn system_view(ctx: &Context, state: &mut AppState) {
    let window = state.config.panel_window();
    let columns = state.config.grid_columns;
    let Some(view) = &mut state.system_view else {
        return;
    };

    let mut open = true;
    let mut save = false;
    egui::Window::new(format!("Velocity plots for z={}", view.redshift()))
        .id(Id::new("system_view"))
        .open(&mut open)
        .vscroll(true)
        .default_width(PANEL_SIZE[0] * columns as f32 + 40.0)
        .show(ctx, |ui: &mut Ui| {
            if view.panels.is_empty() {
                ui.label("The spectrum covers none of the listed lines at this redshift.");
            }
            egui::Grid::new("velocity_grid")
                .num_columns(columns)
                .spacing([12.0, 12.0])
                .show(ui, |ui: &mut Ui| {
                    for (i, panel) in view.panels.iter_mut().enumerate() {
                        ui.vertical(|ui: &mut Ui| {
                            plot::velocity_panel(ui, i, panel, window, PANEL_SIZE);
                            ui.checkbox(&mut panel.selected, "Add to log");
                        });
                        if (i + 1) % columns == 0 {
                            ui.end_row();
                        }
                    }
                });
            ui.separator();
            let n = view.panels.iter().filter(|p| p.selected).count();
            ui.horizontal(|ui: &mut Ui| {
                if ui.button(format!("Save to Log ({n})")).clicked() {
                    save = true;
                }
            });
        });

    if save {
        report_failure(state, "log selected lines", AppState::add_selected_lines);
    } else if !open {
        state.system_view = None;
    }
}

// ---------------------------------------------------------------------------
// Line editor – one logged line at a time
// ---------------------------------------------------------------------------

enum EditorAction {
    Commit,
    Discard,
}

fn line_editor(ctx: &Context, state: &mut AppState) {
    let palette = state.config.palette.clone();
    let queued = state.editors.len().saturating_sub(1);
    let Some(editor) = state.editors.first_mut() else {
        return;
    };

    let mut open = true;
    let mut action = None;
    egui::Window::new(editor.title())
        .id(Id::new("line_editor"))
        .open(&mut open)
        .default_width(560.0)
        .show(ctx, |ui: &mut Ui| {
            if let Some((primary, velocity)) = plot::editor_plot(ui, editor) {
                let button = if primary { BoundClick::Blue } else { BoundClick::Red };
                editor.click(button, velocity);
            }

            ui.horizontal(|ui: &mut Ui| {
                ui.checkbox(&mut editor.ok, "OK");
                ui.checkbox(&mut editor.blend, "Blend");
                ui.checkbox(&mut editor.upper_limit, "Upper Limit");
                ui.checkbox(&mut editor.lower_limit, "Lower Limit");
            });

            ui.horizontal(|ui: &mut Ui| {
                ui.label("vmin");
                ui.add(egui::TextEdit::singleline(&mut editor.vmin).desired_width(90.0));
                ui.label("vmax");
                ui.add(egui::TextEdit::singleline(&mut editor.vmax).desired_width(90.0));
                ui.separator();
                ui.label("Colour");
                egui::ComboBox::from_id_salt("editor_colour")
                    .selected_text(colour_text(editor.colour))
                    .show_ui(ui, |ui: &mut Ui| {
                        for colour in &palette {
                            ui.selectable_value(&mut editor.colour, *colour, colour_text(*colour));
                        }
                    });
            });

            ui.label("Notes");
            ui.add(egui::TextEdit::singleline(&mut editor.notes).desired_width(f32::INFINITY));

            ui.separator();
            ui.horizontal(|ui: &mut Ui| {
                if ui.button("Save").clicked() {
                    action = Some(EditorAction::Commit);
                }
                if ui.button("Cancel").clicked() {
                    action = Some(EditorAction::Discard);
                }
                if queued > 0 {
                    ui.label(format!("{queued} more waiting"));
                }
            });
        });

    if !open {
        action = Some(EditorAction::Discard);
    }
    match action {
        Some(EditorAction::Commit) => report_failure(state, "store line", AppState::commit_editor),
        Some(EditorAction::Discard) => state.discard_editor(),
        None => {}
    }
}

fn colour_text(colour: Colour) -> RichText {
    RichText::new(format!("{} ({})", colour.code(), colour_name(colour))).color(color32(colour))
}

// ---------------------------------------------------------------------------
// Log editor – pick redshift, ion and line
// ---------------------------------------------------------------------------

enum LogAction {
    Edit,
    RemoveLine,
    RemoveSystem,
    Quit,
}

fn log_editor(ctx: &Context, state: &mut AppState) {
    let Some(session) = &state.session else {
        return;
    };
    let Some(editor) = &mut state.log_editor else {
        return;
    };

    let log_is_empty = session.log.is_empty();
    let redshifts = session.log.sorted_redshifts();
    let ions: Vec<String> = editor
        .redshift
        .as_ref()
        .map(|z| session.log.ions_at(z).into_iter().map(String::from).collect())
        .unwrap_or_default();
    let short_ids: Vec<String> = match (&editor.redshift, &editor.ion) {
        (Some(z), Some(ion)) => session
            .log
            .short_ids_at(z, ion)
            .into_iter()
            .map(String::from)
            .collect(),
        _ => Vec::new(),
    };

    let mut open = true;
    let mut action = None;
    egui::Window::new("Edit Log")
        .id(Id::new("log_editor"))
        .open(&mut open)
        .resizable(false)
        .show(ctx, |ui: &mut Ui| {
            if log_is_empty {
                ui.label("The log is empty.");
            }
            egui::Grid::new("log_editor_grid")
                .num_columns(2)
                .show(ui, |ui: &mut Ui| {
                    ui.label("Redshift");
                    let mut chosen: Option<Redshift> = None;
                    egui::ComboBox::from_id_salt("log_redshift")
                        .selected_text(editor.redshift.as_ref().map(Redshift::as_str).unwrap_or("-"))
                        .show_ui(ui, |ui: &mut Ui| {
                            for z in &redshifts {
                                let selected = editor.redshift.as_ref() == Some(z);
                                if ui.selectable_label(selected, z.as_str()).clicked() {
                                    chosen = Some(z.clone());
                                }
                            }
                        });
                    if let Some(z) = chosen {
                        editor.select_redshift(z);
                    }
                    ui.end_row();

                    ui.label("Ion");
                    let mut chosen: Option<String> = None;
                    egui::ComboBox::from_id_salt("log_ion")
                        .selected_text(editor.ion.as_deref().unwrap_or("-"))
                        .show_ui(ui, |ui: &mut Ui| {
                            for ion in &ions {
                                let selected = editor.ion.as_ref() == Some(ion);
                                if ui.selectable_label(selected, ion).clicked() {
                                    chosen = Some(ion.clone());
                                }
                            }
                        });
                    if let Some(ion) = chosen {
                        editor.select_ion(ion);
                    }
                    ui.end_row();

                    ui.label("Line");
                    egui::ComboBox::from_id_salt("log_line")
                        .selected_text(editor.short_id.as_deref().unwrap_or("-"))
                        .show_ui(ui, |ui: &mut Ui| {
                            for id in &short_ids {
                                ui.selectable_value(&mut editor.short_id, Some(id.clone()), id);
                            }
                        });
                    ui.end_row();
                });

            ui.separator();
            let line_chosen = editor.key().is_some();
            let system_chosen = editor.redshift.is_some();
            ui.horizontal(|ui: &mut Ui| {
                if ui.add_enabled(line_chosen, egui::Button::new("Edit")).clicked() {
                    action = Some(LogAction::Edit);
                }
                if ui.add_enabled(line_chosen, egui::Button::new("Remove Line")).clicked() {
                    action = Some(LogAction::RemoveLine);
                }
                if ui.add_enabled(system_chosen, egui::Button::new("Remove System")).clicked() {
                    action = Some(LogAction::RemoveSystem);
                }
                if ui.button("Quit").clicked() {
                    action = Some(LogAction::Quit);
                }
            });
        });

    if !open {
        action = Some(LogAction::Quit);
    }
    match action {
        Some(LogAction::Edit) => state.edit_selected_line(),
        Some(LogAction::RemoveLine) => state.remove_selected_line(),
        Some(LogAction::RemoveSystem) => state.remove_selected_system(),
        Some(LogAction::Quit) => report_failure(state, "save log", AppState::close_log_editor),
        None => {}
    }
}

// ---------------------------------------------------------------------------
// Prompts
// ---------------------------------------------------------------------------

fn redshift_prompt(ctx: &Context, state: &mut AppState) {
    let Some(text) = &mut state.redshift_prompt else {
        return;
    };

    let mut open = true;
    let mut submit = false;
    egui::Window::new("Add system at redshift")
        .id(Id::new("redshift_prompt"))
        .open(&mut open)
        .collapsible(false)
        .resizable(false)
        .show(ctx, |ui: &mut Ui| {
            ui.label("Redshift");
            let response = ui.text_edit_singleline(text);
            response.request_focus();
            if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                submit = true;
            }
            if ui.button("OK").clicked() {
                submit = true;
            }
        });

    if submit {
        state.submit_redshift();
    } else if !open {
        state.redshift_prompt = None;
    }
}

fn line_prompt(ctx: &Context, state: &mut AppState) {
    let Some(session) = &state.session else {
        return;
    };
    let Some(prompt) = &mut state.line_prompt else {
        return;
    };

    let ions = session.line_list.ions().to_vec();
    let short_ids = prompt
        .ion
        .as_deref()
        .map(|ion| session.line_list.short_ids(ion).to_vec())
        .unwrap_or_default();

    let mut open = true;
    let mut submit = false;
    egui::Window::new(format!("Which line is at {:.2} Å?", prompt.wavelength))
        .id(Id::new("line_prompt"))
        .open(&mut open)
        .collapsible(false)
        .resizable(false)
        .show(ctx, |ui: &mut Ui| {
            ui.horizontal(|ui: &mut Ui| {
                ui.label("Ion");
                let before = prompt.ion.clone();
                egui::ComboBox::from_id_salt("prompt_ion")
                    .selected_text(prompt.ion.as_deref().unwrap_or("-"))
                    .show_ui(ui, |ui: &mut Ui| {
                        for ion in &ions {
                            ui.selectable_value(&mut prompt.ion, Some(ion.clone()), ion);
                        }
                    });
                if prompt.ion != before {
                    prompt.short_id = None;
                }

                ui.label("Line");
                egui::ComboBox::from_id_salt("prompt_line")
                    .selected_text(prompt.short_id.as_deref().unwrap_or("-"))
                    .show_ui(ui, |ui: &mut Ui| {
                        for id in &short_ids {
                            ui.selectable_value(&mut prompt.short_id, Some(id.clone()), id);
                        }
                    });
            });
            if ui.button("OK").clicked() {
                submit = true;
            }
        });

    if submit {
        state.submit_line_prompt();
    } else if !open {
        state.line_prompt = None;
    }
}
