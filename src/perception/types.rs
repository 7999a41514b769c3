use serde::{Deserialize, Serialize};

/// An on-screen element with its bounding box reduced to a centre point and extents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiElement {
    pub text: String,
    pub resource_id: String,
    pub class_name: String,
    /// Midpoint of the bounding box.
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl UiElement {
    /// Text, then resource id, then class name; the first non-empty one wins.
    pub fn label(&self) -> &str {
        if !self.text.is_empty() {
            &self.text
        } else if !self.resource_id.is_empty() {
            &self.resource_id
        } else {
            &self.class_name
        }
    }
}

/// Pixel rectangle as written in a `bounds` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl Bounds {
    /// Floor of the midpoint. Summed in `i64`, the result always fits back into `i32`.
    pub fn center(&self) -> (i32, i32) {
        (midpoint(self.x1, self.x2), midpoint(self.y1, self.y2))
    }

    /// `None` when the extent does not fit in an `i32`.
    pub fn width(&self) -> Option<i32> {
        self.x2.checked_sub(self.x1)
    }

    pub fn height(&self) -> Option<i32> {
        self.y2.checked_sub(self.y1)
    }
}

fn midpoint(a: i32, b: i32) -> i32 {
    (i64::from(a) + i64::from(b)).div_euclid(2) as i32
}

/// Result of one observation of the device screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerceptionContext {
    pub elements: Vec<UiElement>,
    /// Compact summary sent to the planner; empty when the layout was unavailable.
    pub summary: String,
    pub source: PerceptionSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerceptionSource {
    LayoutDump,
    /// The fetch failed; the planner is told the UI state is unknown.
    Unavailable,
}
