// `input text` takes a single shell argument, so spaces travel as `%s`.
pub const SPACE_ESCAPE: &str = "%s";

/// Replaces every literal space with [`SPACE_ESCAPE`]. Escaped text contains no
/// spaces, so a second pass leaves it unchanged.
pub fn escape_spaces(text: &str) -> String {
    text.replace(' ', SPACE_ESCAPE)
}
