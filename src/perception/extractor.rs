/// Layout tree → flat element list.
///
/// Walks every node below the `hierarchy` root in document order and keeps
/// the ones whose `bounds` attribute parses as `[x1,y1][x2,y2]`. Nodes with a
/// missing or malformed box are skipped, never emitted with made-up geometry.
use once_cell::sync::Lazy;
use regex::Regex;

use crate::perception::layout::{LayoutNode, LayoutTree};
use crate::perception::types::{Bounds, UiElement};

static BOUNDS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*\[\s*(-?\d+)\s*,\s*(-?\d+)\s*\]\s*\[\s*(-?\d+)\s*,\s*(-?\d+)\s*\]\s*$")
        .expect("bounds pattern is valid")
});

/// Parses `[x1,y1][x2,y2]`. Inverted boxes (x2 < x1 or y2 < y1) and boxes whose
/// extent does not fit in an `i32` are rejected.
pub fn parse_bounds(raw: &str) -> Option<Bounds> {
    let caps = BOUNDS_RE.captures(raw)?;
    let num = |i: usize| caps.get(i)?.as_str().parse::<i32>().ok();
    let bounds = Bounds {
        x1: num(1)?,
        y1: num(2)?,
        x2: num(3)?,
        y2: num(4)?,
    };
    if bounds.x2 < bounds.x1 || bounds.y2 < bounds.y1 {
        return None;
    }
    bounds.width()?;
    bounds.height()?;
    Some(bounds)
}

fn element_from_node(node: &LayoutNode) -> Option<UiElement> {
    let bounds = parse_bounds(node.attr("bounds")?)?;
    let (x, y) = bounds.center();
    let (width, height) = (bounds.width()?, bounds.height()?);
    Some(UiElement {
        text: node.attr("text").unwrap_or_default().to_string(),
        resource_id: node.attr("resource-id").unwrap_or_default().to_string(),
        class_name: node.attr("class").unwrap_or_default().to_string(),
        x,
        y,
        width,
        height,
    })
}

/// Lazily yields elements in document order.
pub fn elements(tree: Option<&LayoutTree>) -> impl Iterator<Item = UiElement> + '_ {
    tree.and_then(LayoutTree::hierarchy)
        .into_iter()
        .flat_map(LayoutNode::iter)
        .filter_map(element_from_node)
}

pub fn extract(tree: Option<&LayoutTree>) -> Vec<UiElement> {
    let out: Vec<UiElement> = elements(tree).collect();
    tracing::debug!(count = out.len(), "layout elements extracted");
    out
}
