use eframe::egui::Color32;
use palette::{named, Hsl, IntoColor, Srgb};

use crate::data::logbook::Colour;

// ---------------------------------------------------------------------------
// Colour → Color32
// ---------------------------------------------------------------------------

/// Screen colour of a log colour.
pub fn color32(colour: Colour) -> Color32 {
    let rgb: Srgb<u8> = match colour {
        Colour::Red => named::RED,
        Colour::Black => named::BLACK,
        Colour::Blue => named::BLUE,
        Colour::Cyan => named::DARKCYAN,
        Colour::Magenta => named::DARKMAGENTA,
        Colour::Green => named::GREEN,
    };
    Color32::from_rgb(rgb.red, rgb.green, rgb.blue)
}

/// A darker shade, used for marker labels so they stay readable over the
/// dashed line of the same colour.
pub fn label_color32(colour: Colour) -> Color32 {
    let base = color32(colour);
    let rgb: Srgb = Srgb::new(base.r(), base.g(), base.b()).into_format();
    let mut hsl: Hsl = rgb.into_color();
    hsl.lightness *= 0.8;
    let rgb: Srgb = hsl.into_color();
    let rgb: Srgb<u8> = rgb.into_format();
    Color32::from_rgb(rgb.red, rgb.green, rgb.blue)
}

/// Human name shown next to the single-letter code.
pub fn colour_name(colour: Colour) -> &'static str {
    match colour {
        Colour::Red => "red",
        Colour::Black => "black",
        Colour::Blue => "blue",
        Colour::Cyan => "cyan",
        Colour::Magenta => "magenta",
        Colour::Green => "green",
    }
}
