use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

// ---------------------------------------------------------------------------
// Series colours
// ---------------------------------------------------------------------------

/// Colour of a lone series.
pub const SINGLE_SERIES: Color32 = Color32::LIGHT_BLUE;

/// `n` visually distinct colours from evenly spaced hues, starting at
/// `hue_offset` degrees so neighbouring plots do not look identical.
pub fn series_colors(n: usize, hue_offset: f32) -> Vec<Color32> {
    match n {
        0 => Vec::new(),
        1 => vec![SINGLE_SERIES],
        _ => (0..n)
            .map(|i| {
                let hue = (hue_offset + (i as f32 / n as f32) * 360.0).rem_euclid(360.0);
                let rgb: Srgb = Hsl::new(hue, 0.75, 0.55).into_color();
                Color32::from_rgb(
                    (rgb.red * 255.0).round() as u8,
                    (rgb.green * 255.0).round() as u8,
                    (rgb.blue * 255.0).round() as u8,
                )
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colors_are_distinct() {
        let colors = series_colors(12, 30.0);
        assert_eq!(colors.len(), 12);
        for (i, a) in colors.iter().enumerate() {
            for b in &colors[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert_eq!(series_colors(1, 0.0), vec![SINGLE_SERIES]);
        assert!(series_colors(0, 0.0).is_empty());
    }
}
