/// Speed of light in km/s.
pub const SPEED_OF_LIGHT: f64 = 2.998e5;

// ---------------------------------------------------------------------------
// VelocityWindow – a spectrum slice in the rest frame of one line
// ---------------------------------------------------------------------------

/// Result of [`velocity_window`].
#[derive(Debug, Clone, PartialEq)]
pub struct VelocityWindow {
    /// Velocity axis in km/s.
    pub velocity: Vec<f64>,
    /// Flux matching `velocity` element for element.
    pub flux: Vec<f64>,
    /// `false` when the spectrum does not span the requested window. In that
    /// case `velocity` is the full converted axis and `flux` is all zeros.
    pub covered: bool,
}

/// Velocity of `wavelength` relative to `reference`, in km/s.
pub fn to_velocity(wavelength: f64, reference: f64) -> f64 {
    (wavelength - reference) / reference * SPEED_OF_LIGHT
}

/// Wavelength at which a line of rest wavelength `rest` is seen at redshift `z`.
pub fn observed_wavelength(rest: f64, z: f64) -> f64 {
    rest * (1.0 + z)
}

/// Redshift that places a line of rest wavelength `rest` at `observed`.
pub fn redshift_from_wavelength(observed: f64, rest: f64) -> f64 {
    observed / rest - 1.0
}

/// Convert a wavelength-calibrated spectrum into the velocity frame of `line`
/// and cut it down to `[vmin, vmax]`.
///
/// The slice starts at the first sample with `v > vmin` and ends at the last
/// sample with `v < vmax`. If the spectrum does not extend past both bounds
/// the whole converted axis is returned with zero flux and `covered == false`.
pub fn velocity_window(
    line: f64,
    wavelengths: &[f64],
    flux: &[f64],
    vmin: f64,
    vmax: f64,
) -> VelocityWindow {
    let velocity: Vec<f64> = wavelengths.iter().map(|&w| to_velocity(w, line)).collect();

    let lowest = velocity.iter().copied().fold(f64::INFINITY, f64::min);
    let highest = velocity.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    if lowest < vmin && highest > vmax {
        let start = velocity.iter().position(|&v| v > vmin);
        let end = velocity.iter().rposition(|&v| v < vmax);
        if let (Some(start), Some(end)) = (start, end) {
            if start <= end && end < flux.len() {
                return VelocityWindow {
                    velocity: velocity[start..=end].to_vec(),
                    flux: flux[start..=end].to_vec(),
                    covered: true,
                };
            }
        }
    }

    let n = velocity.len();
    VelocityWindow {
        velocity,
        flux: vec![0.0; n],
        covered: false,
    }
}
