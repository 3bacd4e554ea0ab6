use eframe::egui;

use crate::data::parser::{Column, YAxis};

/// Series colours, assigned in creation order.
pub const COLOR_PALETTE: [[u8; 4]; 14] = [
    [255, 85, 85, 255],  // Light red
    [85, 85, 255, 255],  // Light blue
    [85, 255, 85, 255],  // Light green
    [255, 255, 85, 255], // Light yellow
    [255, 85, 255, 255], // Light magenta
    [85, 255, 255, 255], // Light cyan
    [255, 175, 175, 255], // Pink
    [128, 128, 128, 255], // Gray
    [192, 0, 0, 255],    // Dark red
    [0, 0, 192, 255],    // Dark blue
    [0, 192, 0, 255],    // Dark green
    [192, 192, 0, 255],  // Dark yellow
    [192, 0, 192, 255],  // Dark magenta
    [0, 192, 192, 255],  // Dark cyan
];

pub fn color_for_index(index: usize) -> [u8; 4] {
    COLOR_PALETTE[index % COLOR_PALETTE.len()]
}

/// Points of one bound column, in the coordinate space of their axes.
///
/// Only the consumer thread touches a series; log toggles rewrite `x`/`y`
/// in place.
#[derive(Debug, Clone)]
pub struct Series {
    pub label: String,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub color: [u8; 4],
    pub axis: YAxis,
    pub visible: bool,
    /// Set once X goes backwards; drawn as points from then on.
    pub scatter: bool,
    /// Line width for this series (pixels).
    pub line_width: f32,
}

impl Series {
    pub fn new(label: String, axis: YAxis, color: [u8; 4]) -> Self {
        Self {
            label,
            x: Vec::new(),
            y: Vec::new(),
            color,
            axis,
            visible: true,
            scatter: false,
            line_width: 1.5,
        }
    }

    pub fn for_column(column: &Column, color: [u8; 4]) -> Self {
        Self::new(column.name.clone(), column.axis, color)
    }

    /// Append one point. A decreasing X switches the series to scatter.
    pub fn push(&mut self, x: f64, y: f64) {
        if !self.scatter {
            if let Some(&last) = self.x.last() {
                if x < last {
                    tracing::debug!("{}: X went backwards, drawing as points", self.label);
                    self.scatter = true;
                }
            }
        }
        self.x.push(x);
        self.y.push(y);
    }

    pub fn color32(&self) -> egui::Color32 {
        egui::Color32::from_rgba_unmultiplied(self.color[0], self.color[1], self.color[2], self.color[3])
    }

    pub fn point_count(&self) -> usize {
        self.x.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decreasing_x_switches_to_scatter_for_good() {
        let mut s = Series::new("a".into(), YAxis::Y1, color_for_index(0));
        s.push(0.0, 1.0);
        s.push(1.0, 1.0);
        assert!(!s.scatter);
        s.push(0.5, 1.0);
        assert!(s.scatter);
        s.push(2.0, 1.0);
        assert!(s.scatter);
        assert_eq!(s.point_count(), 4);
    }

    #[test]
    fn nan_x_does_not_trigger_scatter() {
        let mut s = Series::new("a".into(), YAxis::Y1, color_for_index(0));
        s.push(1.0, 1.0);
        s.push(f64::NAN, 2.0);
        assert!(!s.scatter);
    }

    #[test]
    fn palette_cycles() {
        assert_eq!(color_for_index(0), color_for_index(COLOR_PALETTE.len()));
        assert_ne!(color_for_index(0), color_for_index(1));
    }
}
