/// Styling for the emitted Graphviz text. Purely presentational; nothing in
/// here affects the visible set or the computed coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    pub font_family: String,
    /// Graphviz `rankdir` of the dataflow diagram.
    pub direction: String,
    pub cluster_color: String,
    pub cluster_style: String,
    pub operation_shape: String,
    pub value_shape: String,
    pub collapsed_shape: String,
    pub scope_fill: String,
    pub leaf_fill: String,
}

impl Theme {
    pub fn graphviz_default() -> Self {
        Self {
            font_family: "Arial".to_string(),
            direction: "LR".to_string(),
            cluster_color: "blue".to_string(),
            cluster_style: "rounded".to_string(),
            operation_shape: "box".to_string(),
            value_shape: "ellipse".to_string(),
            collapsed_shape: "box".to_string(),
            scope_fill: "lightgrey".to_string(),
            leaf_fill: "lightblue".to_string(),
        }
    }

    pub fn compact() -> Self {
        Self {
            font_family: "Helvetica".to_string(),
            direction: "LR".to_string(),
            cluster_color: "gray40".to_string(),
            cluster_style: "rounded,dashed".to_string(),
            operation_shape: "box".to_string(),
            value_shape: "oval".to_string(),
            collapsed_shape: "box3d".to_string(),
            scope_fill: "gray90".to_string(),
            leaf_fill: "aliceblue".to_string(),
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::graphviz_default()
    }
}
