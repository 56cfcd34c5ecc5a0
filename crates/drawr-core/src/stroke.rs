//! Stroke points and stroke styles.
//!
//! The serialized form matches the JSON shape exchanged with browser peers:
//! `{"x":..,"y":..,"drag":bool,"style":{..},"remote":bool,"pathStart":bool}`.

use kurbo::Point;
use peniko::Color;
use serde::{Deserialize, Serialize};

/// Default stroke colour.
pub const DEFAULT_COLOUR: &str = "#000000";

/// Default canvas background colour.
pub const BACKGROUND_COLOUR: &str = "#FFFFFF";

/// Drawing tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    #[default]
    Pen,
    /// Paints with the background colour.
    Eraser,
}

/// Named stroke widths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WidthPreset {
    Small,
    Normal,
    Large,
    Huge,
}

impl WidthPreset {
    /// Line width in pixels.
    pub fn pixels(self) -> f64 {
        match self {
            WidthPreset::Small => 2.0,
            WidthPreset::Normal => 5.0,
            WidthPreset::Large => 10.0,
            WidthPreset::Huge => 20.0,
        }
    }
}

/// Stroke width, either a preset name or an explicit pixel width.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StrokeWidth {
    Preset(WidthPreset),
    Pixels(f64),
}

impl StrokeWidth {
    /// Line width in pixels.
    pub fn pixels(self) -> f64 {
        match self {
            StrokeWidth::Preset(preset) => preset.pixels(),
            StrokeWidth::Pixels(px) if px.is_finite() && px > 0.0 => px,
            StrokeWidth::Pixels(_) => WidthPreset::Small.pixels(),
        }
    }
}

impl Default for StrokeWidth {
    fn default() -> Self {
        StrokeWidth::Preset(WidthPreset::Large)
    }
}

impl From<WidthPreset> for StrokeWidth {
    fn from(preset: WidthPreset) -> Self {
        StrokeWidth::Preset(preset)
    }
}

/// Visual style attached to every stroke point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokeStyle {
    /// CSS hex colour, e.g. `#1a2b3c`.
    pub colour: String,
    pub width: StrokeWidth,
    #[serde(rename = "type")]
    pub tool: Tool,
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            colour: DEFAULT_COLOUR.to_string(),
            width: StrokeWidth::default(),
            tool: Tool::Pen,
        }
    }
}

impl StrokeStyle {
    /// Merge a partial update into this style.
    ///
    /// Selecting the eraser forces the colour to `background`, overriding any
    /// colour carried by the same update.
    pub fn apply(&mut self, update: StyleUpdate, background: &str) {
        if let Some(colour) = update.colour {
            self.colour = colour;
        }
        if let Some(width) = update.width {
            self.width = width;
        }
        if let Some(tool) = update.tool {
            self.tool = tool;
        }
        if self.tool == Tool::Eraser {
            self.colour = background.to_string();
        }
    }

    /// Parsed stroke colour.
    pub fn color(&self) -> Color {
        parse_colour(&self.colour)
    }
}

/// Partial style update; `None` fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleUpdate {
    pub colour: Option<String>,
    pub width: Option<StrokeWidth>,
    #[serde(rename = "type")]
    pub tool: Option<Tool>,
}

impl StyleUpdate {
    pub fn colour(mut self, colour: impl Into<String>) -> Self {
        self.colour = Some(colour.into());
        self
    }

    pub fn width(mut self, width: impl Into<StrokeWidth>) -> Self {
        self.width = Some(width.into());
        self
    }

    pub fn tool(mut self, tool: Tool) -> Self {
        self.tool = Some(tool);
        self
    }
}

/// Where a stroke point was captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Origin {
    #[default]
    Local,
    Remote,
}

/// Serializes [`Origin`] as the `remote` boolean.
mod remote_flag {
    use super::Origin;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(origin: &Origin, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bool(*origin == Origin::Remote)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Origin, D::Error> {
        let remote = bool::deserialize(deserializer)?;
        Ok(if remote { Origin::Remote } else { Origin::Local })
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// One recorded pointer sample.
///
/// Coordinates are in logical units: canvas pixels divided by the scale in
/// effect when the point was captured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokePoint {
    pub x: f64,
    pub y: f64,
    /// `false` for the first point of a segment.
    #[serde(rename = "drag")]
    pub dragging: bool,
    pub style: StrokeStyle,
    #[serde(rename = "remote", with = "remote_flag", default)]
    pub origin: Origin,
    /// Set on the first point of an outbound batch.
    #[serde(rename = "pathStart", default, skip_serializing_if = "is_false")]
    pub is_segment_start: bool,
}

impl StrokePoint {
    /// Create a local point.
    pub fn new(x: f64, y: f64, dragging: bool, style: StrokeStyle) -> Self {
        Self {
            x,
            y,
            dragging,
            style,
            origin: Origin::Local,
            is_segment_start: false,
        }
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn is_local(&self) -> bool {
        self.origin == Origin::Local
    }

    pub fn is_remote(&self) -> bool {
        self.origin == Origin::Remote
    }

    /// Whether this point is drawn as a dot rather than joined to a predecessor.
    pub fn starts_segment(&self) -> bool {
        !self.dragging || self.is_segment_start
    }
}

/// Parse a CSS hex colour (`#rgb`, `#rrggbb` or `#rrggbbaa`).
///
/// Anything else falls back to black.
pub fn parse_colour(colour: &str) -> Color {
    colour
        .trim()
        .strip_prefix('#')
        .and_then(parse_hex)
        .unwrap_or(Color::BLACK)
}

fn parse_hex(hex: &str) -> Option<Color> {
    if !hex.is_ascii() {
        return None;
    }
    let channel = |from: usize, to: usize| u8::from_str_radix(&hex[from..to], 16).ok();
    match hex.len() {
        // #rgb -> #rrggbb
        3 => Some(Color::from_rgba8(
            channel(0, 1)? * 17,
            channel(1, 2)? * 17,
            channel(2, 3)? * 17,
            255,
        )),
        6 => Some(Color::from_rgba8(channel(0, 2)?, channel(2, 4)?, channel(4, 6)?, 255)),
        8 => Some(Color::from_rgba8(
            channel(0, 2)?,
            channel(2, 4)?,
            channel(4, 6)?,
            channel(6, 8)?,
        )),
        _ => None,
    }
}
