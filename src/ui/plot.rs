use eframe::egui::{Align2, Color32, RichText, Ui};
use egui_plot::{Line, LineStyle, Plot, PlotBounds, PlotPoint, PlotPoints, PlotUi, Text, VLine};

use crate::color::{color32, label_color32};
use crate::data::logbook::Colour;
use crate::state::{AppState, LineEditor, PanelMarker, VelocityPanel};

// ---------------------------------------------------------------------------
// Full spectrum (central panel)
// ---------------------------------------------------------------------------

/// Render the full spectrum with logged lines overlaid. Returns the
/// wavelength under the pointer, if any.
pub fn spectrum_plot(ui: &mut Ui, state: &mut AppState) -> Option<f64> {
    let Some(session) = &state.session else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Choose the input files and press \"Find Lines!\"");
        });
        return None;
    };

    let markers = state.spectrum_markers();
    let points = step_points(&session.spectrum.wavelength, &session.spectrum.flux);
    let (p_lo, p_hi) = state.config.flux_percentiles;
    let flux_range = session
        .spectrum
        .flux_percentile(p_lo)
        .zip(session.spectrum.flux_percentile(p_hi));
    let wavelength_range = session.spectrum.wavelength_range();
    let reset = std::mem::take(&mut state.reset_spectrum_view);

    let response = Plot::new("spectrum_plot")
        .x_axis_label("Wavelength (Å)")
        .y_axis_label("Flux")
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            if reset {
                if let (Some((x0, x1)), Some((y0, y1))) = (wavelength_range, flux_range) {
                    plot_ui.set_plot_bounds(PlotBounds::from_min_max([x0, y0], [x1, y1]));
                }
            }

            plot_ui.line(Line::new(PlotPoints::from(points)).color(Color32::BLACK).width(1.0));

            let top = plot_ui.plot_bounds().max()[1];
            for marker in &markers {
                vertical_marker(plot_ui, marker.wavelength, top, &marker.label(), marker.colour, LineStyle::dotted_dense());
            }

            plot_ui.pointer_coordinate().map(|p| p.x)
        });

    response.inner
}

// ---------------------------------------------------------------------------
// Velocity panels
// ---------------------------------------------------------------------------

/// One small velocity-space plot in the system grid.
pub fn velocity_panel(ui: &mut Ui, id: usize, panel: &VelocityPanel, window: (f64, f64), size: [f32; 2]) {
    ui.label(RichText::new(panel.title()).strong());
    Plot::new(("velocity_panel", id))
        .width(size[0])
        .height(size[1])
        .include_x(window.0)
        .include_x(window.1)
        .allow_scroll(false)
        .show_axes([true, true])
        .show(ui, |plot_ui| {
            let points = step_points(&panel.window.velocity, &panel.window.flux);
            plot_ui.line(Line::new(PlotPoints::from(points)).color(Color32::BLACK).width(1.0));

            let top = plot_ui.plot_bounds().max()[1];
            for PanelMarker { velocity, label, colour } in &panel.markers {
                vertical_marker(plot_ui, *velocity, top, label, *colour, LineStyle::dashed_loose());
            }
        });
}

/// Velocity profile in a line editor. Left click sets the blue bound, right
/// click the red one; returns `(button_is_primary, velocity)` for a click.
pub fn editor_plot(ui: &mut Ui, editor: &LineEditor) -> Option<(bool, f64)> {
    let bounds = editor.bounds();
    let response = Plot::new(("line_editor", editor.key.to_string()))
        .height(320.0)
        .x_axis_label("Relative velocity (km/s)")
        .y_axis_label("Relative intensity")
        .allow_drag(false)
        .allow_boxed_zoom(false)
        .show(ui, |plot_ui| {
            let points = step_points(&editor.window.velocity, &editor.window.flux);
            plot_ui.line(Line::new(PlotPoints::from(points)).color(Color32::BLACK).width(1.0));
            if let Some((vmin, vmax)) = bounds {
                for v in [vmin, vmax] {
                    plot_ui.vline(VLine::new(v).color(Color32::RED).style(LineStyle::dashed_dense()));
                }
            }
            plot_ui.pointer_coordinate()
        });

    let velocity = response.inner?.x;
    if response.response.clicked() {
        Some((true, velocity))
    } else if response.response.secondary_clicked() {
        Some((false, velocity))
    } else {
        None
    }
}

fn vertical_marker(plot_ui: &mut PlotUi, x: f64, top: f64, label: &str, colour: Colour, style: LineStyle) {
    plot_ui.vline(VLine::new(x).color(color32(colour)).width(2.0).style(style));
    plot_ui.text(
        Text::new(PlotPoint::new(x, top), RichText::new(label).color(label_color32(colour)).small())
            .anchor(Align2::LEFT_TOP),
    );
}

/// Points for a histogram-style trace: each sample's value holds from the
/// previous sample up to its own position.
pub fn step_points(x: &[f64], y: &[f64]) -> Vec<[f64; 2]> {
    let n = x.len().min(y.len());
    let mut out = Vec::with_capacity(2 * n);
    for i in 0..n {
        if i > 0 {
            out.push([x[i - 1], y[i]]);
        }
        out.push([x[i], y[i]]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_rise_at_previous_sample() {
        let pts = step_points(&[0.0, 1.0, 2.0], &[5.0, 6.0, 7.0]);
        assert_eq!(
            pts,
            vec![[0.0, 5.0], [0.0, 6.0], [1.0, 6.0], [1.0, 7.0], [2.0, 7.0]]
        );
    }

    #[test]
    fn steps_tolerate_empty_and_ragged_input() {
        assert!(step_points(&[], &[]).is_empty());
        assert_eq!(step_points(&[1.0, 2.0], &[3.0]), vec![[1.0, 3.0]]);
    }
}
