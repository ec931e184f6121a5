use std::path::{Path, PathBuf};

use crate::config::SessionConfig;
use crate::data::linelist::{load_line_list, LineDefinition, LineList};
use crate::data::logbook::{
    Colour, Flags, LineKey, LineMarker, LogEntry, LogStore, Provenance, Redshift, SaveOutcome,
};
use crate::data::spectrum::{load_spectrum, Spectrum};
use crate::data::velocity::{
    observed_wavelength, redshift_from_wavelength, to_velocity, velocity_window, VelocityWindow,
};
use crate::error::Warning;

/// Most recent warnings kept for the side panel.
const WARNING_HISTORY: usize = 20;

pub const KEY_HELP: &str = "\
q - save the log and leave the spectrum view
a - add a system from a chosen line at the cursor
l - add a system from Lyman-alpha at the cursor
z - add a system at a typed redshift
e - edit the log
h - help";

// ---------------------------------------------------------------------------
// Session – the files being worked on
// ---------------------------------------------------------------------------

/// Everything loaded by "Find Lines".
pub struct Session {
    pub spectrum: Spectrum,
    pub line_list: LineList,
    pub log: LogStore,
    pub provenance: Provenance,
    pub log_path: PathBuf,
}

/// Keyboard shortcuts on the spectrum plot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    SaveAndClose,
    AddAtCursor,
    LymanAlphaAtCursor,
    PromptRedshift,
    EditLog,
    Help,
}

impl KeyAction {
    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            'q' => Some(KeyAction::SaveAndClose),
            'a' => Some(KeyAction::AddAtCursor),
            'l' => Some(KeyAction::LymanAlphaAtCursor),
            'z' => Some(KeyAction::PromptRedshift),
            'e' => Some(KeyAction::EditLog),
            'h' => Some(KeyAction::Help),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// System view – velocity panels for one redshift
// ---------------------------------------------------------------------------

/// A logged line drawn inside a velocity panel.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelMarker {
    pub velocity: f64,
    pub label: String,
    pub colour: Colour,
}

/// One covered line shown in velocity space, with its selection box.
#[derive(Debug, Clone)]
pub struct VelocityPanel {
    pub line: LineDefinition,
    pub window: VelocityWindow,
    pub markers: Vec<PanelMarker>,
    pub selected: bool,
}

impl VelocityPanel {
    pub fn title(&self) -> String {
        format!(
            "{} {}\nf={:.5}",
            self.line.ion, self.line.short_id, self.line.oscillator_strength
        )
    }
}

/// The velocity-panel grid for one candidate system.
#[derive(Debug, Clone)]
pub struct SystemView {
    pub z: f64,
    pub panels: Vec<VelocityPanel>,
}

impl SystemView {
    pub fn redshift(&self) -> Redshift {
        Redshift::from_value(self.z)
    }
}

// ---------------------------------------------------------------------------
// Line editor – flags, colour, notes and bounds for one logged line
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundClick {
    Blue,
    Red,
}

/// Pending edits to a single log entry. Nothing reaches the store until
/// [`AppState::commit_editor`].
#[derive(Debug, Clone)]
pub struct LineEditor {
    pub key: LineKey,
    pub ok: bool,
    pub blend: bool,
    pub upper_limit: bool,
    pub lower_limit: bool,
    pub colour: Colour,
    pub notes: String,
    pub vmin: String,
    pub vmax: String,
    pub window: VelocityWindow,
}

impl LineEditor {
    pub fn new(
        key: LineKey,
        entry: &LogEntry,
        z: f64,
        line: &LineDefinition,
        spectrum: &Spectrum,
        config: &SessionConfig,
    ) -> Self {
        let (ok, blend, upper_limit, lower_limit) = entry.flags.parts();
        let centre = observed_wavelength(line.rest_wavelength, z);
        let (vmin, vmax) = config.panel_window();
        LineEditor {
            key,
            ok,
            blend,
            upper_limit,
            lower_limit,
            colour: entry.colour,
            notes: entry.notes.clone(),
            vmin: entry.vmin.to_string(),
            vmax: entry.vmax.to_string(),
            window: velocity_window(centre, &spectrum.wavelength, &spectrum.flux, vmin, vmax),
        }
    }

    pub fn title(&self) -> String {
        format!(
            "Edit Log for z={} ({},{})",
            self.key.redshift, self.key.ion, self.key.short_id
        )
    }

    /// Left click sets the blue bound, right click the red one.
    pub fn click(&mut self, button: BoundClick, velocity: f64) {
        match button {
            BoundClick::Blue => self.vmin = velocity.to_string(),
            BoundClick::Red => self.vmax = velocity.to_string(),
        }
    }

    /// Bounds as currently typed, if both parse.
    pub fn bounds(&self) -> Option<(f64, f64)> {
        let vmin = self.vmin.trim().parse::<f64>().ok()?;
        let vmax = self.vmax.trim().parse::<f64>().ok()?;
        Some((vmin, vmax))
    }

    pub fn to_entry(&self) -> Result<LogEntry, Warning> {
        let vmin = self
            .vmin
            .trim()
            .parse::<f64>()
            .map_err(|_| Warning::InvalidVelocity(self.vmin.clone()))?;
        let vmax = self
            .vmax
            .trim()
            .parse::<f64>()
            .map_err(|_| Warning::InvalidVelocity(self.vmax.clone()))?;
        Ok(LogEntry {
            flags: Flags::from_parts(self.ok, self.blend, self.upper_limit, self.lower_limit),
            vmin,
            vmax,
            notes: self.notes.clone(),
            colour: self.colour,
        })
    }
}

// ---------------------------------------------------------------------------
// Log editor – redshift → ion → line selection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogEditor {
    pub redshift: Option<Redshift>,
    pub ion: Option<String>,
    pub short_id: Option<String>,
}

impl LogEditor {
    pub fn select_redshift(&mut self, z: Redshift) {
        self.redshift = Some(z);
        self.ion = None;
        self.short_id = None;
    }

    pub fn select_ion(&mut self, ion: String) {
        self.ion = Some(ion);
        self.short_id = None;
    }

    pub fn key(&self) -> Option<LineKey> {
        Some(LineKey::new(
            self.redshift.clone()?,
            self.ion.clone()?,
            self.short_id.clone()?,
        ))
    }
}

/// "a": pick a line, then read the redshift off the cursor position.
#[derive(Debug, Clone, PartialEq)]
pub struct LinePrompt {
    pub wavelength: f64,
    pub ion: Option<String>,
    pub short_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    pub config: SessionConfig,

    /// Paths as typed in the set-up panel.
    pub spectrum_path: String,
    pub line_list_path: String,
    pub log_path: String,

    /// Loaded files (None until "Find Lines").
    pub session: Option<Session>,

    /// Velocity panels for the system being inspected.
    pub system_view: Option<SystemView>,

    /// Line editors waiting to be shown, first one on screen.
    pub editors: Vec<LineEditor>,

    pub log_editor: Option<LogEditor>,
    pub redshift_prompt: Option<String>,
    pub line_prompt: Option<LinePrompt>,

    pub show_help: bool,

    /// Set when a new spectrum is loaded so the plot re-frames itself.
    pub reset_spectrum_view: bool,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,

    /// Recent warnings, newest last.
    pub warnings: Vec<Warning>,
}

impl AppState {
    pub fn new(config: SessionConfig, spectrum: &Path, line_list: &Path, log: &Path) -> Self {
        let mut state = Self {
            config,
            spectrum_path: spectrum.display().to_string(),
            line_list_path: line_list.display().to_string(),
            log_path: log.display().to_string(),
            session: None,
            system_view: None,
            editors: Vec::new(),
            log_editor: None,
            redshift_prompt: None,
            line_prompt: None,
            show_help: false,
            reset_spectrum_view: false,
            status_message: None,
            warnings: Vec::new(),
        };
        state.tutorial("Select input spectrum and line list, and name the output log file.");
        state
    }

    // -- messages --

    pub fn report(&mut self, warnings: impl IntoIterator<Item = Warning>) {
        for warning in warnings {
            self.status_message = Some(warning.to_string());
            self.warnings.push(warning);
        }
        if self.warnings.len() > WARNING_HISTORY {
            let excess = self.warnings.len() - WARNING_HISTORY;
            self.warnings.drain(..excess);
        }
    }

    fn tutorial(&mut self, message: &str) {
        if self.config.tutorial {
            self.status_message = Some(message.to_string());
        }
    }

    pub fn toggle_tutorial(&mut self) {
        self.config.tutorial = !self.config.tutorial;
        let state = if self.config.tutorial { "on" } else { "off" };
        self.status_message = Some(format!("Tutorial mode is now {state}."));
    }

    // -- session lifecycle --

    /// Load the log, line list and spectrum named in the set-up panel.
    pub fn find_lines(&mut self) -> anyhow::Result<()> {
        let log_path = PathBuf::from(self.log_path.trim());
        let line_list_path = PathBuf::from(self.line_list_path.trim());
        let spectrum_path = PathBuf::from(self.spectrum_path.trim());

        let (log, mut warnings) = LogStore::load(&log_path)?;
        let (line_list, list_warning) = load_line_list(&line_list_path)?;
        let (spectrum, spectrum_warning) = load_spectrum(&spectrum_path)?;
        warnings.extend(list_warning);
        warnings.extend(spectrum_warning);
        warnings.extend(log.unknown_lines(&line_list).into_iter().map(Warning::logged));

        if let Some(previous) = log.provenance() {
            if previous.spectrum != self.spectrum_path.trim() {
                log::info!(
                    "Log {} was made from spectrum {}",
                    log_path.display(),
                    previous.spectrum
                );
            }
        }

        self.session = Some(Session {
            spectrum,
            line_list,
            log,
            provenance: Provenance {
                line_list: self.line_list_path.trim().to_string(),
                spectrum: self.spectrum_path.trim().to_string(),
            },
            log_path,
        });
        self.system_view = None;
        self.editors.clear();
        self.log_editor = None;
        self.status_message = None;
        self.report(warnings);
        self.show_help = true;
        self.reset_spectrum_view = true;
        self.tutorial("Use mouse and keyboard on the plot. Press 'h' for the keyboard shortcuts.");
        Ok(())
    }

    /// Write the log to the configured path.
    pub fn save_log(&mut self) -> anyhow::Result<()> {
        let Some(session) = &self.session else {
            return Ok(());
        };
        match session.log.save(&session.log_path, &session.provenance)? {
            SaveOutcome::Written { path, records } => {
                self.status_message = Some(format!("Wrote {records} lines to {}", path.display()));
            }
            SaveOutcome::NoDestination => self.report([Warning::NoSaveDestination]),
        }
        Ok(())
    }

    /// "q": save and drop back to the set-up panel.
    pub fn close_session(&mut self) -> anyhow::Result<()> {
        self.save_log()?;
        self.session = None;
        self.system_view = None;
        self.editors.clear();
        self.log_editor = None;
        self.redshift_prompt = None;
        self.line_prompt = None;
        log::info!("Closed line finder session");
        Ok(())
    }

    // -- key dispatch --

    /// Run a keyboard shortcut. `cursor` is the wavelength under the pointer.
    pub fn handle_key(&mut self, action: KeyAction, cursor: Option<f64>) -> anyhow::Result<()> {
        log::debug!("Key action {action:?} at {cursor:?}");
        match action {
            KeyAction::SaveAndClose => self.close_session()?,
            KeyAction::Help => self.show_help = !self.show_help,
            KeyAction::EditLog => {
                self.tutorial("Use the drop-down menus to edit the log.");
                self.log_editor = Some(LogEditor::default());
            }
            KeyAction::PromptRedshift => self.redshift_prompt = Some(String::new()),
            KeyAction::LymanAlphaAtCursor => {
                let rest = self
                    .session
                    .as_ref()
                    .and_then(|s| s.line_list.lyman_alpha())
                    .map(|d| d.rest_wavelength);
                if let (Some(wavelength), Some(rest)) = (cursor, rest) {
                    self.open_system(redshift_from_wavelength(wavelength, rest));
                }
            }
            KeyAction::AddAtCursor => {
                if let Some(wavelength) = cursor {
                    self.tutorial("Choose which line sits at the cursor.");
                    self.line_prompt = Some(LinePrompt {
                        wavelength,
                        ion: None,
                        short_id: None,
                    });
                }
            }
        }
        Ok(())
    }

    /// Accept the redshift typed into the "z" prompt.
    pub fn submit_redshift(&mut self) {
        let Some(text) = self.redshift_prompt.take() else {
            return;
        };
        match text.trim().parse::<f64>() {
            Ok(z) if z.is_finite() => self.open_system(z),
            _ => {
                self.report([Warning::InvalidRedshift(text).logged()]);
                self.redshift_prompt = Some(String::new());
            }
        }
    }

    /// Accept the line chosen in the "a" prompt.
    pub fn submit_line_prompt(&mut self) {
        let Some(prompt) = self.line_prompt.take() else {
            return;
        };
        let Some(session) = &self.session else {
            return;
        };
        let ion = prompt.ion.clone().unwrap_or_default();
        let short_id = prompt.short_id.clone().unwrap_or_default();

        if !session.line_list.has_ion(&ion) {
            self.report([Warning::UnknownIon(ion).logged()]);
            self.line_prompt = Some(prompt);
            return;
        }
        let Some(def) = session.line_list.get(&ion, &short_id) else {
            self.report([Warning::UnknownLine { ion, short_id }.logged()]);
            self.line_prompt = Some(prompt);
            return;
        };
        let z = redshift_from_wavelength(prompt.wavelength, def.rest_wavelength);
        self.open_system(z);
    }

    // -- system view --

    /// Build velocity panels for every line the spectrum covers at `z`.
    pub fn open_system(&mut self, z: f64) {
        let Some(session) = &self.session else {
            return;
        };
        let (vmin, vmax) = self.config.panel_window();
        let logged = session.log.markers(&session.line_list);
        let mut warnings = Vec::new();

        let panels: Vec<VelocityPanel> = session
            .line_list
            .covered_lines(z, &session.spectrum)
            .into_iter()
            .map(|line| {
                let centre = observed_wavelength(line.rest_wavelength, z);
                let window = velocity_window(
                    centre,
                    &session.spectrum.wavelength,
                    &session.spectrum.flux,
                    vmin,
                    vmax,
                );
                if !window.covered {
                    warnings.push(
                        Warning::WindowNotCovered {
                            ion: line.ion.clone(),
                            short_id: line.short_id.clone(),
                            vmin,
                            vmax,
                        }
                        .logged(),
                    );
                }
                VelocityPanel {
                    line: line.clone(),
                    window,
                    markers: panel_markers(&logged, centre, vmin, vmax),
                    selected: false,
                }
            })
            .collect();

        log::info!("System z={z:.5}: {} lines covered", panels.len());
        self.system_view = Some(SystemView { z, panels });
        self.report(warnings);
        self.tutorial("Using the velocity profiles, select which lines belong to the system.");
    }

    /// Log every ticked panel at the view's redshift, save, and open an
    /// editor for each.
    pub fn add_selected_lines(&mut self) -> anyhow::Result<()> {
        let Some(view) = self.system_view.take() else {
            return Ok(());
        };
        let Some(session) = &mut self.session else {
            return Ok(());
        };
        let redshift = view.redshift();
        let bounds = self.config.default_line_bounds;

        for panel in view.panels.iter().filter(|p| p.selected) {
            let key = LineKey::new(redshift.clone(), &panel.line.ion, &panel.line.short_id);
            let entry = session.log.entry_or_default(&key, bounds);
            if !session.log.contains(&key) {
                session.log.upsert(key.clone(), entry.clone());
            }
            self.editors.push(LineEditor::new(
                key,
                &entry,
                view.z,
                &panel.line,
                &session.spectrum,
                &self.config,
            ));
        }
        if !self.editors.is_empty() {
            self.tutorial("Set flags, notes and bounds. Left/right click sets the velocity bounds.");
        }
        self.save_log()
    }

    // -- line editors --

    /// Store the first editor's values and close it.
    pub fn commit_editor(&mut self) -> anyhow::Result<()> {
        if self.editors.is_empty() {
            return Ok(());
        }
        let entry = match self.editors[0].to_entry() {
            Ok(entry) => entry,
            Err(warning) => {
                self.report([warning.logged()]);
                return Ok(());
            }
        };
        let editor = self.editors.remove(0);
        if let Some(session) = &mut self.session {
            session.log.upsert(editor.key, entry);
        }
        self.save_log()
    }

    /// Close the first editor without storing anything.
    pub fn discard_editor(&mut self) {
        if !self.editors.is_empty() {
            self.editors.remove(0);
        }
    }

    // -- log editor --

    pub fn edit_selected_line(&mut self) {
        let Some(key) = self.log_editor.as_ref().and_then(LogEditor::key) else {
            return;
        };
        let Some(session) = &self.session else {
            return;
        };
        let Some(line) = session.line_list.get(&key.ion, &key.short_id) else {
            self.report([Warning::UnknownLine {
                ion: key.ion,
                short_id: key.short_id,
            }
            .logged()]);
            return;
        };
        let Some(z) = key.redshift.value() else {
            self.report([Warning::MalformedRedshift(key.redshift.to_string()).logged()]);
            return;
        };
        let entry = session.log.entry_or_default(&key, self.config.default_line_bounds);
        let editor = LineEditor::new(key, &entry, z, line, &session.spectrum, &self.config);
        self.editors.push(editor);
    }

    pub fn remove_selected_line(&mut self) {
        let Some(key) = self.log_editor.as_ref().and_then(LogEditor::key) else {
            return;
        };
        if let Some(session) = &mut self.session {
            if session.log.remove_line(&key).is_some() {
                log::info!("Removed {key}");
            }
        }
        if let Some(editor) = &mut self.log_editor {
            editor.ion = None;
            editor.short_id = None;
        }
    }

    pub fn remove_selected_system(&mut self) {
        let Some(z) = self.log_editor.as_ref().and_then(|e| e.redshift.clone()) else {
            return;
        };
        if let Some(session) = &mut self.session {
            let n = session.log.remove_system(&z);
            log::info!("Removed system z={z} ({n} lines)");
        }
        self.log_editor = Some(LogEditor::default());
    }

    /// "Quit" in the log editor: close it and save.
    pub fn close_log_editor(&mut self) -> anyhow::Result<()> {
        self.log_editor = None;
        self.save_log()
    }

    // -- plotting helpers --

    /// Logged lines to overlay on the full spectrum.
    pub fn spectrum_markers(&self) -> Vec<LineMarker> {
        self.session
            .as_ref()
            .map(|s| s.log.markers(&s.line_list))
            .unwrap_or_default()
    }
}

/// Logged lines that fall inside a panel centred on `centre`.
fn panel_markers(logged: &[LineMarker], centre: f64, vmin: f64, vmax: f64) -> Vec<PanelMarker> {
    logged
        .iter()
        .filter_map(|marker| {
            let velocity = to_velocity(marker.wavelength, centre);
            (velocity > vmin && velocity < vmax).then(|| PanelMarker {
                velocity,
                label: marker.label(),
                colour: marker.colour,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const LINE_LIST: &str = "\
1215.6701 HI 1215 0.4164
1025.7223 HI 1025 0.07912
1548.204 CIV 1548 0.1899
1550.781 CIV 1550 0.09475
";

    /// Flat spectrum, 1000–2000 Å at 0.1 Å.
    fn write_inputs(dir: &Path) -> AppState {
        let spectrum: String = (0..=10_000)
            .map(|i| format!("{:.1} 1.0\n", 1000.0 + 0.1 * i as f64))
            .collect();
        std::fs::write(dir.join("spec.ascii"), spectrum).unwrap();
        std::fs::write(dir.join("lines.lst"), LINE_LIST).unwrap();
        AppState::new(
            SessionConfig::default(),
            &dir.join("spec.ascii"),
            &dir.join("lines.lst"),
            &dir.join("out.log"),
        )
    }

    fn store_of(state: &AppState) -> &LogStore {
        &state.session.as_ref().unwrap().log
    }

    #[test]
    fn key_mapping() {
        assert_eq!(KeyAction::from_char('q'), Some(KeyAction::SaveAndClose));
        assert_eq!(KeyAction::from_char('L'), Some(KeyAction::LymanAlphaAtCursor));
        assert_eq!(KeyAction::from_char('x'), None);
    }

    #[test]
    fn find_lines_with_missing_files_degrades_to_warnings() {
        let dir = TempDir::new().unwrap();
        let mut state = AppState::new(
            SessionConfig::default(),
            &dir.path().join("a"),
            &dir.path().join("b"),
            &dir.path().join("c"),
        );
        state.find_lines().unwrap();
        let session = state.session.as_ref().unwrap();
        assert_eq!(session.spectrum.len(), 100);
        assert_eq!(session.line_list.line_count(), 1);
        assert!(session.log.is_empty());
        assert_eq!(state.warnings.len(), 2);
    }

    #[test]
    fn lyman_alpha_key_opens_system_at_cursor() {
        let dir = TempDir::new().unwrap();
        let mut state = write_inputs(dir.path());
        state.find_lines().unwrap();

        // Lya at z = 0.2 lands on 1458.80 Å.
        state
            .handle_key(KeyAction::LymanAlphaAtCursor, Some(1215.6701 * 1.2))
            .unwrap();
        let view = state.system_view.as_ref().unwrap();
        assert_eq!(view.redshift().as_str(), "0.20000");
        let lines: Vec<_> = view
            .panels
            .iter()
            .map(|p| (p.line.ion.as_str(), p.line.short_id.as_str()))
            .collect();
        // CIV at z=0.2 is ~1858 Å; Lyb ~1231 Å; all inside 1000–2000 Å.
        assert_eq!(lines, [("CIV", "1548"), ("CIV", "1550"), ("HI", "1025"), ("HI", "1215")]);
        assert!(view.panels.iter().all(|p| p.window.covered));
    }

    #[test]
    fn selecting_lines_logs_saves_and_queues_editors() {
        let dir = TempDir::new().unwrap();
        let mut state = write_inputs(dir.path());
        state.find_lines().unwrap();
        state.open_system(0.2);

        let view = state.system_view.as_mut().unwrap();
        for panel in &mut view.panels {
            panel.selected = panel.line.ion == "CIV";
        }
        state.add_selected_lines().unwrap();

        assert!(state.system_view.is_none());
        assert_eq!(state.editors.len(), 2);
        assert_eq!(store_of(&state).len(), 2);
        let (saved, _) = LogStore::load(&dir.path().join("out.log")).unwrap();
        assert_eq!(saved.len(), 2);

        let editor = &mut state.editors[0];
        assert_eq!(editor.key.short_id, "1548");
        assert_eq!(editor.bounds(), Some((-50.0, 50.0)));
        editor.ok = true;
        editor.blend = true;
        editor.notes = "clean".into();
        editor.colour = Colour::Blue;
        editor.click(BoundClick::Blue, -75.0);
        editor.click(BoundClick::Red, 60.0);
        state.commit_editor().unwrap();

        assert_eq!(state.editors.len(), 1);
        let key = LineKey::new(Redshift::from_value(0.2), "CIV", "1548");
        let stored = store_of(&state).get(&key).unwrap();
        assert_eq!(stored.flags.bits(), 3);
        assert_eq!((stored.vmin, stored.vmax), (-75.0, 60.0));
        assert_eq!(stored.colour, Colour::Blue);

        state.discard_editor();
        assert!(state.editors.is_empty());
        let untouched = LineKey::new(Redshift::from_value(0.2), "CIV", "1550");
        assert_eq!(store_of(&state).get(&untouched), Some(&LogEntry::default()));
    }

    #[test]
    fn invalid_bounds_keep_the_editor_open() {
        let dir = TempDir::new().unwrap();
        let mut state = write_inputs(dir.path());
        state.find_lines().unwrap();
        state.open_system(0.0);
        state.system_view.as_mut().unwrap().panels[0].selected = true;
        state.add_selected_lines().unwrap();

        state.editors[0].vmin = "fast".into();
        state.commit_editor().unwrap();
        assert_eq!(state.editors.len(), 1);
        assert_eq!(
            state.warnings.last(),
            Some(&Warning::InvalidVelocity("fast".into()))
        );
    }

    #[test]
    fn panels_mark_other_logged_systems() {
        let dir = TempDir::new().unwrap();
        let mut state = write_inputs(dir.path());
        state.find_lines().unwrap();
        let session = state.session.as_mut().unwrap();
        // CIV 1548 at z=0.2 sits at 1857.845 Å; centre Lya 100 km/s redward of it.
        session.log.upsert(
            LineKey::new(Redshift::from_value(0.2), "CIV", "1548"),
            LogEntry::default(),
        );

        let lya_z = 1548.204 * 1.2 * (1.0 + 100.0 / 2.998e5) / 1215.6701 - 1.0;
        state.open_system(lya_z);
        let view = state.system_view.as_ref().unwrap();
        let lya = view
            .panels
            .iter()
            .find(|p| p.line.short_id == "1215")
            .unwrap();
        assert_eq!(lya.markers.len(), 1);
        assert!((lya.markers[0].velocity + 100.0).abs() < 1.0);
        assert_eq!(lya.markers[0].label, "z=0.20000\nCIV 1548");
    }

    #[test]
    fn redshift_prompt_rejects_garbage() {
        let dir = TempDir::new().unwrap();
        let mut state = write_inputs(dir.path());
        state.find_lines().unwrap();

        state.handle_key(KeyAction::PromptRedshift, None).unwrap();
        state.redshift_prompt = Some("abc".into());
        state.submit_redshift();
        assert!(state.system_view.is_none());
        assert_eq!(state.redshift_prompt.as_deref(), Some(""));

        state.redshift_prompt = Some("0.1".into());
        state.submit_redshift();
        assert_eq!(state.system_view.as_ref().unwrap().redshift().as_str(), "0.10000");
    }

    #[test]
    fn line_prompt_validates_selection() {
        let dir = TempDir::new().unwrap();
        let mut state = write_inputs(dir.path());
        state.find_lines().unwrap();

        state.handle_key(KeyAction::AddAtCursor, Some(1548.204 * 1.3)).unwrap();
        state.line_prompt.as_mut().unwrap().ion = Some("OVI".into());
        state.submit_line_prompt();
        assert_eq!(state.warnings.last(), Some(&Warning::UnknownIon("OVI".into())));
        assert!(state.line_prompt.is_some());

        let prompt = state.line_prompt.as_mut().unwrap();
        prompt.ion = Some("CIV".into());
        prompt.short_id = Some("1548".into());
        state.submit_line_prompt();
        assert_eq!(state.system_view.as_ref().unwrap().redshift().as_str(), "0.30000");
    }

    #[test]
    fn log_editor_removes_lines_and_systems() {
        let dir = TempDir::new().unwrap();
        let mut state = write_inputs(dir.path());
        state.find_lines().unwrap();
        {
            let log = &mut state.session.as_mut().unwrap().log;
            for (z, ion, id) in [(0.0, "HI", "1215"), (0.0, "CIV", "1548"), (0.5, "HI", "1215")] {
                log.upsert(LineKey::new(Redshift::from_value(z), ion, id), LogEntry::default());
            }
        }

        state.handle_key(KeyAction::EditLog, None).unwrap();
        let editor = state.log_editor.as_mut().unwrap();
        editor.select_redshift(Redshift::from_value(0.0));
        editor.select_ion("CIV".into());
        editor.short_id = Some("1548".into());
        state.edit_selected_line();
        assert_eq!(state.editors.len(), 1);

        state.remove_selected_line();
        assert_eq!(store_of(&state).len(), 2);
        assert!(store_of(&state).short_ids("CIV").is_empty());

        state.remove_selected_system();
        assert_eq!(store_of(&state).len(), 1);
        assert_eq!(store_of(&state).ions(), ["HI"]);
        assert_eq!(state.log_editor, Some(LogEditor::default()));

        state.close_log_editor().unwrap();
        let (saved, _) = LogStore::load(&dir.path().join("out.log")).unwrap();
        assert_eq!(saved.redshifts(), [Redshift::from_value(0.5)]);
    }

    #[test]
    fn quit_saves_and_closes() {
        let dir = TempDir::new().unwrap();
        let mut state = write_inputs(dir.path());
        state.find_lines().unwrap();
        state.session.as_mut().unwrap().log.upsert(
            LineKey::new(Redshift::from_value(0.1), "HI", "1215"),
            LogEntry::default(),
        );
        state.handle_key(KeyAction::SaveAndClose, None).unwrap();
        assert!(state.session.is_none());
        assert!(dir.path().join("out.log").is_file());
    }

    #[test]
    fn empty_log_path_warns_on_save() {
        let dir = TempDir::new().unwrap();
        let mut state = write_inputs(dir.path());
        state.log_path = "  ".into();
        state.find_lines().unwrap();
        state.save_log().unwrap();
        assert_eq!(state.warnings.last(), Some(&Warning::NoSaveDestination));
    }
}
