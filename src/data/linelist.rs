use std::collections::BTreeMap;
use std::path::Path;

use super::spectrum::{parse_f64, Spectrum};
use super::velocity::observed_wavelength;
use crate::error::{LinefinderError, Result, Warning};

pub const LYMAN_ALPHA_ION: &str = "HI";
pub const LYMAN_ALPHA_ID: &str = "1215";
pub const LYMAN_ALPHA_WAVELENGTH: f64 = 1215.6701;
pub const LYMAN_ALPHA_F: f64 = 0.41640;

// ---------------------------------------------------------------------------
// LineDefinition – one transition from the line list
// ---------------------------------------------------------------------------

/// A spectral line that can be identified.
#[derive(Debug, Clone, PartialEq)]
pub struct LineDefinition {
    /// Species, e.g. `HI`, `CIV`.
    pub ion: String,
    /// Short wavelength identifier, e.g. `1215`.
    pub short_id: String,
    /// Rest wavelength in Å.
    pub rest_wavelength: f64,
    /// Oscillator strength; shown in panel titles only.
    pub oscillator_strength: f64,
}

impl LineDefinition {
    pub fn lyman_alpha() -> Self {
        LineDefinition {
            ion: LYMAN_ALPHA_ION.to_string(),
            short_id: LYMAN_ALPHA_ID.to_string(),
            rest_wavelength: LYMAN_ALPHA_WAVELENGTH,
            oscillator_strength: LYMAN_ALPHA_F,
        }
    }
}

// ---------------------------------------------------------------------------
// LineList – definitions keyed by (ion, short_id)
// ---------------------------------------------------------------------------

/// The loaded line list. Ions and short ids keep the order they were first
/// seen in the file.
#[derive(Debug, Clone, Default)]
pub struct LineList {
    definitions: BTreeMap<(String, String), LineDefinition>,
    ions: Vec<String>,
    short_ids: BTreeMap<String, Vec<String>>,
}

impl LineList {
    /// Build a list from definitions. Lyman-alpha is added when missing.
    pub fn from_definitions(definitions: impl IntoIterator<Item = LineDefinition>) -> Self {
        let mut list = LineList::default();
        for def in definitions {
            list.insert(def);
        }
        if !list.contains(LYMAN_ALPHA_ION, LYMAN_ALPHA_ID) {
            list.insert(LineDefinition::lyman_alpha());
        }
        list
    }

    fn insert(&mut self, def: LineDefinition) {
        if !self.ions.contains(&def.ion) {
            self.ions.push(def.ion.clone());
        }
        let ids = self.short_ids.entry(def.ion.clone()).or_default();
        if !ids.contains(&def.short_id) {
            ids.push(def.short_id.clone());
        }
        self.definitions
            .insert((def.ion.clone(), def.short_id.clone()), def);
    }

    pub fn get(&self, ion: &str, short_id: &str) -> Option<&LineDefinition> {
        self.definitions.get(&(ion.to_string(), short_id.to_string()))
    }

    pub fn contains(&self, ion: &str, short_id: &str) -> bool {
        self.get(ion, short_id).is_some()
    }

    pub fn has_ion(&self, ion: &str) -> bool {
        self.short_ids.contains_key(ion)
    }

    pub fn ions(&self) -> &[String] {
        &self.ions
    }

    pub fn short_ids(&self, ion: &str) -> &[String] {
        self.short_ids.get(ion).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of (ion, short id) definitions, Lyman-alpha included.
    pub fn line_count(&self) -> usize {
        self.definitions.len()
    }

    pub fn lyman_alpha(&self) -> Option<&LineDefinition> {
        self.get(LYMAN_ALPHA_ION, LYMAN_ALPHA_ID)
    }

    /// Lines whose redshifted wavelength falls inside the spectrum, ordered by
    /// ion then short id.
    pub fn covered_lines(&self, z: f64, spectrum: &Spectrum) -> Vec<&LineDefinition> {
        // BTreeMap iteration is already (ion, short_id) ordered.
        self.definitions
            .values()
            .filter(|def| spectrum.covers(observed_wavelength(def.rest_wavelength, z)))
            .collect()
    }
}

/// Load a line list.
///
/// Each non-comment line is `REST_WAVELENGTH ION SHORT_ID OSCILLATOR_STRENGTH`.
/// A missing file gives a list holding only Lyman-alpha, plus a warning.
pub fn load_line_list(path: &Path) -> Result<(LineList, Option<Warning>)> {
    if !path.is_file() {
        let warning = Warning::MissingFile {
            kind: "line list",
            path: path.to_path_buf(),
        }
        .logged();
        return Ok((LineList::from_definitions([]), Some(warning)));
    }

    let text = std::fs::read_to_string(path).map_err(|source| LinefinderError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let definitions = parse_line_list(&text).map_err(|(line, message)| LinefinderError::Parse {
        path: path.to_path_buf(),
        line,
        message,
    })?;

    let list = LineList::from_definitions(definitions);
    log::info!(
        "Loaded {} lines of {} ions from {}",
        list.line_count(),
        list.ions().len(),
        path.display()
    );
    Ok((list, None))
}

fn parse_line_list(text: &str) -> std::result::Result<Vec<LineDefinition>, (usize, String)> {
    let mut out = Vec::new();
    for (i, raw) in text.lines().enumerate() {
        let line_no = i + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 4 {
            return Err((
                line_no,
                "expected REST_WAVELENGTH ION SHORT_ID OSCILLATOR_STRENGTH".into(),
            ));
        }
        let rest_wavelength = parse_f64(fields[0])
            .filter(|w| *w > 0.0)
            .ok_or_else(|| (line_no, format!("invalid rest wavelength '{}'", fields[0])))?;
        let oscillator_strength = parse_f64(fields[3])
            .filter(|f| *f >= 0.0)
            .ok_or_else(|| (line_no, format!("invalid oscillator strength '{}'", fields[3])))?;

        out.push(LineDefinition {
            ion: fields[1].to_string(),
            short_id: fields[2].to_string(),
            rest_wavelength,
            oscillator_strength,
        });
    }
    Ok(out)
}
