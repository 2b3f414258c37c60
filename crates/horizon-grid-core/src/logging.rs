//! Logging and debugging facilities for Horizon Grid.
//!
//! This module provides:
//! - Fixed `tracing` targets for every grid subsystem
//! - An outline formatter used to dump hierarchical data for debugging
//!
//! # Tracing Integration
//!
//! Horizon Grid uses the `tracing` crate for instrumentation. To see logs,
//! install a subscriber in the host application:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("horizon_grid::edit=debug,horizon_grid::reorder=debug")
//!     .init();
//! ```
//!
//! # Outline Formatting
//!
//! ```
//! use horizon_grid_core::logging::{OutlineWriter, TreeFormatOptions, TreeStyle};
//!
//! let mut writer = OutlineWriter::new(TreeFormatOptions {
//!     style: TreeStyle::Ascii,
//!     ..Default::default()
//! });
//! writer.line(0, true, "Website redesign");
//! writer.line(1, false, "Wireframes");
//! writer.line(1, true, "Copy review");
//! assert_eq!(
//!     writer.finish(),
//!     "Website redesign\n+-- Wireframes\n`-- Copy review\n"
//! );
//! ```

/// Span names used throughout Horizon Grid for tracing.
pub mod span_names {
    /// Gesture dispatch span.
    pub const DISPATCH: &str = "horizon_grid::dispatch";
}

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Signal/slot system target.
    pub const SIGNAL: &str = "horizon_grid_core::signal";
    /// Row tree mutations.
    pub const ROWS: &str = "horizon_grid::rows";
    /// Column registry mutations.
    pub const COLUMNS: &str = "horizon_grid::columns";
    /// View pipeline projections.
    pub const VIEW: &str = "horizon_grid::view";
    /// Edit session transitions.
    pub const EDIT: &str = "horizon_grid::edit";
    /// Drag-and-drop reordering.
    pub const REORDER: &str = "horizon_grid::reorder";
    /// Selection and bulk operations.
    pub const SELECTION: &str = "horizon_grid::selection";
    /// Column layout persistence.
    pub const LAYOUT: &str = "horizon_grid::layout";
    /// Controller-level gesture handling.
    pub const CONTROLLER: &str = "horizon_grid::controller";
}

/// Style options for outline visualization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TreeStyle {
    /// ASCII characters for tree branches.
    Ascii,
    /// Unicode box-drawing characters.
    #[default]
    Unicode,
    /// Compact single-line representation.
    Compact,
}

/// Configuration for outline output.
#[derive(Debug, Clone)]
pub struct TreeFormatOptions {
    /// The style of tree visualization.
    pub style: TreeStyle,
    /// Whether callers should append item IDs to each label.
    pub show_ids: bool,
    /// Maximum depth to emit (None for unlimited).
    pub max_depth: Option<usize>,
    /// Indent size for each level.
    pub indent_size: usize,
}

impl Default for TreeFormatOptions {
    fn default() -> Self {
        Self {
            style: TreeStyle::default(),
            show_ids: true,
            max_depth: None,
            indent_size: 2,
        }
    }
}

impl TreeFormatOptions {
    /// Create options for minimal output.
    pub fn minimal() -> Self {
        Self {
            show_ids: false,
            ..Default::default()
        }
    }
}

/// Accumulates an indented outline one line at a time.
///
/// Callers walk their hierarchy in pre-order and report each node's depth and
/// whether it is the last of its siblings.
#[derive(Debug, Clone)]
pub struct OutlineWriter {
    options: TreeFormatOptions,
    output: String,
}

impl OutlineWriter {
    /// Create a writer with the given options.
    pub fn new(options: TreeFormatOptions) -> Self {
        Self {
            options,
            output: String::new(),
        }
    }

    /// Returns the options this writer was created with.
    pub fn options(&self) -> &TreeFormatOptions {
        &self.options
    }

    /// Append one node. Nodes deeper than `max_depth` are skipped.
    pub fn line(&mut self, depth: usize, is_last: bool, label: &str) {
        if let Some(max) = self.options.max_depth
            && depth > max
        {
            return;
        }

        let prefix = self.build_prefix(depth, is_last);
        self.output.push_str(&prefix);
        self.output.push_str(if label.is_empty() { "(empty)" } else { label });
        self.output.push('\n');
    }

    /// Consume the writer and return the accumulated text.
    pub fn finish(self) -> String {
        self.output
    }

    /// Build the prefix string for a node.
    fn build_prefix(&self, depth: usize, is_last: bool) -> String {
        if depth == 0 {
            return String::new();
        }

        let (branch, corner, last) = match self.options.style {
            TreeStyle::Ascii => ("|", "+--", "`--"),
            TreeStyle::Unicode => (
                "\u{2502}",
                "\u{251c}\u{2500}\u{2500}",
                "\u{2514}\u{2500}\u{2500}",
            ),
            TreeStyle::Compact => ("", "-", "-"),
        };

        let mut prefix = String::new();

        for _ in 0..(depth - 1) {
            prefix.push_str(branch);
            for _ in 0..self.options.indent_size {
                prefix.push(' ');
            }
        }

        prefix.push_str(if is_last { last } else { corner });
        prefix.push(' ');
        prefix
    }
}
