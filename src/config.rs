use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::logbook::{Colour, DEFAULT_LINE_BOUNDS};

// ---------------------------------------------------------------------------
// Session configuration
// ---------------------------------------------------------------------------

/// Settings that live for one application session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Show help messages for each step.
    pub tutorial: bool,
    /// Colours offered in the line editor.
    pub palette: Vec<Colour>,
    /// Half-width (km/s) of each velocity panel.
    pub panel_half_width: f64,
    /// Bounds given to a newly selected line.
    pub default_line_bounds: (f64, f64),
    /// Columns in the velocity panel grid.
    pub grid_columns: usize,
    /// Percentiles used to clip the flux axis of the spectrum plot.
    pub flux_percentiles: (f64, f64),
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tutorial: false,
            palette: Colour::ALL.to_vec(),
            panel_half_width: 1000.0,
            default_line_bounds: DEFAULT_LINE_BOUNDS,
            grid_columns: 3,
            flux_percentiles: (2.5, 97.5),
        }
    }
}

impl SessionConfig {
    /// Read a JSON config. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let mut config: SessionConfig =
            serde_json::from_str(&text).context("parsing config JSON")?;
        if config.palette.is_empty() {
            config.palette = Colour::ALL.to_vec();
        }
        config.grid_columns = config.grid_columns.max(1);
        Ok(config)
    }

    /// `(vmin, vmax)` of a velocity panel.
    pub fn panel_window(&self) -> (f64, f64) {
        (-self.panel_half_width, self.panel_half_width)
    }
}
