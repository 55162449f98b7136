use crate::theme::Theme;
use anyhow::{Context, ensure};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutConfig {
    /// Horizontal advance of one label character.
    pub char_width: f32,
    /// Padding added on each side of a leaf label.
    pub node_padding: f32,
    /// Gap reserved on each side of a column.
    pub column_padding: f32,
    /// Margin between a scope box and the union of its children. Must be
    /// positive; `compute_layout` rejects anything else.
    pub scope_margin: f32,
    /// Extra gap per column skipped by the longest edge crossing a gap.
    pub skip_margin: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            char_width: 7.0,
            node_padding: 10.0,
            column_padding: 14.0,
            scope_margin: 8.0,
            skip_margin: 4.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub theme: Theme,
    pub layout: LayoutConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    layout: Option<LayoutConfigFile>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    font_family: Option<String>,
    direction: Option<String>,
    cluster_color: Option<String>,
    cluster_style: Option<String>,
    operation_shape: Option<String>,
    value_shape: Option<String>,
    collapsed_shape: Option<String>,
    scope_fill: Option<String>,
    leaf_fill: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LayoutConfigFile {
    char_width: Option<f32>,
    node_padding: Option<f32>,
    column_padding: Option<f32>,
    scope_margin: Option<f32>,
    skip_margin: Option<f32>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    parse_config(&contents).with_context(|| format!("invalid config {}", path.display()))
}

/// Parses a config document. Strict JSON is tried first, then JSON5 so
/// hand-written files may carry comments and trailing commas.
pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let parsed: ConfigFile = match serde_json::from_str(contents) {
        Ok(parsed) => parsed,
        Err(json_err) => json5::from_str(contents)
            .with_context(|| format!("not JSON ({json_err}) and not JSON5"))?,
    };

    let mut config = Config::default();
    match parsed.theme.as_deref() {
        None | Some("default") | Some("graphviz") => {}
        Some("compact") => config.theme = Theme::compact(),
        Some(other) => anyhow::bail!("unknown theme {other:?}"),
    }

    if let Some(vars) = parsed.theme_variables {
        let theme = &mut config.theme;
        if let Some(v) = vars.font_family {
            theme.font_family = v;
        }
        if let Some(v) = vars.direction {
            theme.direction = v;
        }
        if let Some(v) = vars.cluster_color {
            theme.cluster_color = v;
        }
        if let Some(v) = vars.cluster_style {
            theme.cluster_style = v;
        }
        if let Some(v) = vars.operation_shape {
            theme.operation_shape = v;
        }
        if let Some(v) = vars.value_shape {
            theme.value_shape = v;
        }
        if let Some(v) = vars.collapsed_shape {
            theme.collapsed_shape = v;
        }
        if let Some(v) = vars.scope_fill {
            theme.scope_fill = v;
        }
        if let Some(v) = vars.leaf_fill {
            theme.leaf_fill = v;
        }
    }

    if let Some(layout) = parsed.layout {
        let target = &mut config.layout;
        if let Some(v) = layout.char_width {
            target.char_width = v;
        }
        if let Some(v) = layout.node_padding {
            target.node_padding = v;
        }
        if let Some(v) = layout.column_padding {
            target.column_padding = v;
        }
        if let Some(v) = layout.scope_margin {
            target.scope_margin = v;
        }
        if let Some(v) = layout.skip_margin {
            target.skip_margin = v;
        }
    }

    let layout = &config.layout;
    for (name, value) in [
        ("charWidth", layout.char_width),
        ("nodePadding", layout.node_padding),
        ("columnPadding", layout.column_padding),
        ("skipMargin", layout.skip_margin),
    ] {
        ensure!(value.is_finite() && value >= 0.0, "layout.{name} must be a non-negative number");
    }
    ensure!(
        layout.scope_margin.is_finite() && layout.scope_margin > 0.0,
        "layout.scopeMargin must be positive"
    );

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_path_yields_defaults() {
        let config = load_config(None).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.theme.cluster_color, "blue");
    }

    #[test]
    fn overrides_apply_on_top_of_preset() {
        let config = parse_config(
            r#"{"theme": "compact", "themeVariables": {"clusterColor": "red"},
                "layout": {"charWidth": 8.5, "skipMargin": 0}}"#,
        )
        .unwrap();
        assert_eq!(config.theme.font_family, "Helvetica");
        assert_eq!(config.theme.cluster_color, "red");
        assert_eq!(config.layout.char_width, 8.5);
        assert_eq!(config.layout.skip_margin, 0.0);
        assert_eq!(config.layout.scope_margin, LayoutConfig::default().scope_margin);
    }

    #[test]
    fn accepts_json5() {
        let config = parse_config(
            "{\n  // wider labels\n  layout: { nodePadding: 12, },\n}",
        )
        .unwrap();
        assert_eq!(config.layout.node_padding, 12.0);
    }

    #[test]
    fn rejects_non_positive_scope_margin() {
        assert!(parse_config(r#"{"layout": {"scopeMargin": 0}}"#).is_err());
        assert!(parse_config(r#"{"theme": "neon"}"#).is_err());
    }
}
