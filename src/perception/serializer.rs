use crate::perception::types::UiElement;

/// Renders elements as `"<label> [<x>,<y>]"` entries joined by `", "`, in the given order.
pub fn serialize(elements: &[UiElement]) -> String {
    elements
        .iter()
        .map(|e| format!("{} [{},{}]", e.label(), e.x, e.y))
        .collect::<Vec<_>>()
        .join(", ")
}
