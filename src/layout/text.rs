use crate::config::LayoutConfig;

/// Rendered width of a label box: the longest line at a fixed advance per
/// character, padded on both sides.
pub(super) fn label_width(label: &str, config: &LayoutConfig) -> f32 {
    let chars = label
        .lines()
        .map(|line| line.chars().count())
        .max()
        .unwrap_or(0);
    chars as f32 * config.char_width + 2.0 * config.node_padding
}
