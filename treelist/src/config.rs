//! Presentation configuration.
//!
//! These parameters feed the row renderer only; none of them affect the
//! synchronization algorithm.

/// How rows are indented and decorated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeListConfig {
    /// Cells of indentation per depth level.
    pub indent_width: u16,
    /// Glyph shown before an expanded node with children.
    pub expanded_icon: String,
    /// Glyph shown before a collapsed node with children.
    pub collapsed_icon: String,
    /// Glyph shown before a leaf.
    pub leaf_icon: String,
    /// Whether the expansion affordance is shown at all.
    pub show_toggles: bool,
}

impl Default for TreeListConfig {
    fn default() -> Self {
        Self {
            indent_width: 2,
            expanded_icon: "▼ ".to_string(),
            collapsed_icon: "▶ ".to_string(),
            leaf_icon: "  ".to_string(),
            show_toggles: true,
        }
    }
}

impl TreeListConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn indent_width(mut self, width: u16) -> Self {
        self.indent_width = width;
        self
    }

    pub fn icons(
        mut self,
        expanded: impl Into<String>,
        collapsed: impl Into<String>,
        leaf: impl Into<String>,
    ) -> Self {
        self.expanded_icon = expanded.into();
        self.collapsed_icon = collapsed.into();
        self.leaf_icon = leaf.into();
        self
    }

    pub fn show_toggles(mut self, show: bool) -> Self {
        self.show_toggles = show;
        self
    }

    /// The glyph for a row, or `""` when affordances are hidden.
    pub fn toggle_icon(&self, has_children: bool, expanded: bool) -> &str {
        if !self.show_toggles {
            return "";
        }
        if !has_children {
            &self.leaf_icon
        } else if expanded {
            &self.expanded_icon
        } else {
            &self.collapsed_icon
        }
    }
}
