//! Drawing surface used by the drawing test. The serialized format is a json document with
//! strokes (`lines`), each holding the `points` it passes through:
//!
//! ```json
//! {"lines":[{"points":[{"x":1.0,"y":2.0}],"brushColor":"#000000","brushRadius":2.0}],"width":400,"height":300}
//! ```

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Abstracts the surface the user draws on during a drawing test.
#[cfg_attr(test, mockall::automock)]
pub trait DrawingCanvas {
    /// Removes every stroke.
    fn clear(&mut self);

    /// Serializes the current strokes. Capturing can fail, in which case the drawing is
    /// considered absent.
    fn serialized_content(&mut self) -> Result<String>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CanvasData {
    #[serde(default)]
    lines: Vec<Stroke>,
    #[serde(default)]
    width: u32,
    #[serde(default)]
    height: u32,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Stroke {
    #[serde(default)]
    points: Vec<Point>,
    #[serde(default = "default_brush_color")]
    brush_color: String,
    #[serde(default = "default_brush_radius")]
    brush_radius: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct Point {
    x: f32,
    y: f32,
}

fn default_brush_color() -> String {
    "#000000".into()
}

fn default_brush_radius() -> f32 {
    2.
}

/// Checks whether a serialized drawing contains at least one stroke with a point in it.
/// Unparseable content counts as an empty drawing.
pub fn has_strokes(serialized: &str) -> bool {
    serde_json::from_str::<CanvasData>(serialized)
        .map(|data| data.lines.iter().any(|stroke| !stroke.points.is_empty()))
        .unwrap_or(false)
}

const CELL_WIDTH: f32 = 8.;
const CELL_HEIGHT: f32 = 16.;
const TEXT_CANVAS_WIDTH: u32 = 400;
const TEXT_CANVAS_HEIGHT: u32 = 300;

/// Canvas for terminals. Every typed line becomes a stroke going through its visible characters.
#[derive(Debug, Default)]
pub struct TextCanvas {
    rows: Vec<String>,
}

impl TextCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draw_line(&mut self, line: &str) {
        self.rows.push(line.to_owned());
    }

    fn to_data(&self) -> CanvasData {
        let lines = self
            .rows
            .iter()
            .enumerate()
            .map(|(row, text)| Stroke {
                points: text
                    .chars()
                    .enumerate()
                    .filter(|(_, c)| !c.is_whitespace())
                    .map(|(column, _)| Point {
                        x: column as f32 * CELL_WIDTH,
                        y: row as f32 * CELL_HEIGHT,
                    })
                    .collect(),
                brush_color: default_brush_color(),
                brush_radius: default_brush_radius(),
            })
            .collect();

        CanvasData {
            lines,
            width: TEXT_CANVAS_WIDTH,
            height: TEXT_CANVAS_HEIGHT,
        }
    }
}

impl DrawingCanvas for TextCanvas {
    fn clear(&mut self) {
        self.rows.clear();
    }

    fn serialized_content(&mut self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_data())?)
    }
}
