use image::Rgba;
use nalgebra as na;
use na::{vector, Vector3};

use crate::graphics::{GraphicsContext, Line};

/// Debug gizmo: X, Y and Z as red, green and blue arrows from the origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Axes {
    pub colors: [Rgba<u8>; 3],
}

impl Default for Axes {
    fn default() -> Self {
        return Self {
            colors: [
                Rgba([255, 0, 0, 255]),
                Rgba([0, 255, 0, 255]),
                Rgba([0, 0, 255, 255]),
            ],
        };
    }
}

impl Axes {
    /// Three shafts of `length`, each with a two-line arrow head `arrow_length` long and
    /// `arrow_width` wide at its base.
    pub fn lines(&self, length: f32, arrow_length: f32, arrow_width: f32) -> Vec<Line> {
        let axes = [Vector3::x(), Vector3::y(), Vector3::z()];
        // Direction the arrow head opens along, for each axis.
        let spreads = [Vector3::y(), Vector3::x(), Vector3::x()];

        let mut lines = Vec::with_capacity(9);
        for i in 0..3 {
            let tip = axes[i] * length;
            let base = axes[i] * (length - arrow_length);
            let color = self.colors[i];
            lines.push(Line {
                from: vector![0.0, 0.0, 0.0],
                to: tip,
                color,
            });
            for side in [-1.0, 1.0] {
                lines.push(Line {
                    from: tip,
                    to: base + spreads[i] * (arrow_width * side),
                    color,
                });
            }
        }
        return lines;
    }

    /// Draws under the model matrix last applied to the program in use.
    pub fn draw_axes(&self, gfx: &mut dyn GraphicsContext, length: f32, arrow_length: f32, arrow_width: f32) {
        debug_assert!(gfx.current_program().is_some(), "axes drawn with no program in use");
        gfx.draw_lines(&self.lines(length, arrow_length, arrow_width));
    }
}
