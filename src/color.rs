use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

/// Histogram bars and the density line.
pub const DISTRIBUTION_FILL: Color32 = Color32::from_rgb(46, 139, 87);
pub const DENSITY_LINE: Color32 = Color32::from_rgb(20, 90, 50);

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// `n` visually distinct colours with evenly spaced hues, starting at orange.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = 30.0 + (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            Color32::from_rgb(
                (rgb.red * 255.0).round() as u8,
                (rgb.green * 255.0).round() as u8,
                (rgb.blue * 255.0).round() as u8,
            )
        })
        .collect()
}

/// One colour per group label, in the order given.
pub fn group_colors<'a>(labels: impl ExactSizeIterator<Item = &'a str>) -> Vec<(&'a str, Color32)> {
    let palette = generate_palette(labels.len());
    labels.zip(palette).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_is_distinct() {
        let colors = generate_palette(10);
        assert_eq!(colors.len(), 10);
        for (i, a) in colors.iter().enumerate() {
            assert!(colors[i + 1..].iter().all(|b| b != a));
        }
        assert!(generate_palette(0).is_empty());
    }

    #[test]
    fn test_group_colors_follow_label_order() {
        let labels = ["Toyota", "Honda"];
        let colors = group_colors(labels.iter().copied());
        assert_eq!(colors[0].0, "Toyota");
        assert_eq!(colors[1].0, "Honda");
        assert_eq!(colors[0].1, generate_palette(2)[0]);
    }
}
