use std::path::Path;

use crate::error::{LinefinderError, Result, Warning};

/// Number of samples in the placeholder returned for a missing spectrum.
pub const PLACEHOLDER_LEN: usize = 100;

// ---------------------------------------------------------------------------
// Spectrum – wavelength/flux pairs from an ASCII file
// ---------------------------------------------------------------------------

/// A 1-D spectrum.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Spectrum {
    /// Wavelength axis (Å).
    pub wavelength: Vec<f64>,
    /// Flux – same length as `wavelength`.
    pub flux: Vec<f64>,
}

impl Spectrum {
    /// All-zero stand-in used when the spectrum file does not exist.
    pub fn placeholder() -> Self {
        Spectrum {
            wavelength: vec![0.0; PLACEHOLDER_LEN],
            flux: vec![0.0; PLACEHOLDER_LEN],
        }
    }

    pub fn len(&self) -> usize {
        self.wavelength.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wavelength.is_empty()
    }

    /// `(min, max)` of the wavelength axis, `None` when empty.
    pub fn wavelength_range(&self) -> Option<(f64, f64)> {
        if self.is_empty() {
            return None;
        }
        let lo = self.wavelength.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = self.wavelength.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Some((lo, hi))
    }

    /// Whether `wavelength` lies strictly inside the covered range.
    pub fn covers(&self, wavelength: f64) -> bool {
        self.wavelength_range()
            .is_some_and(|(lo, hi)| wavelength > lo && wavelength < hi)
    }

    /// Flux percentile (0–100) by nearest rank, used for display limits.
    pub fn flux_percentile(&self, pct: f64) -> Option<f64> {
        let mut sorted: Vec<f64> = self.flux.iter().copied().filter(|f| f.is_finite()).collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(f64::total_cmp);
        let rank = (pct.clamp(0.0, 100.0) / 100.0 * (sorted.len() - 1) as f64).round() as usize;
        Some(sorted[rank])
    }
}

/// Load a spectrum file.
///
/// Each non-comment line is `WAVELENGTH FLUX [ignored...]`, whitespace
/// separated; lines starting with `#` are skipped. Every data line must have
/// the same number of columns. A missing file yields
/// [`Spectrum::placeholder`] and a warning.
pub fn load_spectrum(path: &Path) -> Result<(Spectrum, Option<Warning>)> {
    if !path.is_file() {
        let warning = Warning::MissingFile {
            kind: "spectrum",
            path: path.to_path_buf(),
        }
        .logged();
        return Ok((Spectrum::placeholder(), Some(warning)));
    }

    let text = std::fs::read_to_string(path).map_err(|source| LinefinderError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let spectrum = parse_spectrum(&text).map_err(|(line, message)| LinefinderError::Parse {
        path: path.to_path_buf(),
        line,
        message,
    })?;
    log::info!("Loaded {} spectral samples from {}", spectrum.len(), path.display());
    Ok((spectrum, None))
}

fn parse_spectrum(text: &str) -> std::result::Result<Spectrum, (usize, String)> {
    let mut spectrum = Spectrum::default();
    let mut columns: Option<usize> = None;

    for (i, raw) in text.lines().enumerate() {
        let line_no = i + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();

        match columns {
            None if fields.len() < 2 => {
                return Err((line_no, "expected at least WAVELENGTH and FLUX".into()));
            }
            None => columns = Some(fields.len()),
            Some(n) if n != fields.len() => {
                return Err((line_no, format!("expected {n} columns, found {}", fields.len())));
            }
            Some(_) => {}
        }

        let wavelength = parse_f64(fields[0]).ok_or_else(|| (line_no, format!("'{}' is not a number", fields[0])))?;
        let flux = parse_f64(fields[1]).ok_or_else(|| (line_no, format!("'{}' is not a number", fields[1])))?;
        spectrum.wavelength.push(wavelength);
        spectrum.flux.push(flux);
    }

    Ok(spectrum)
}

/// Parse a float the way the ASCII readers expect: `nan`/`inf` included.
pub(crate) fn parse_f64(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok()
}
