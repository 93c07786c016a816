#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod render;
pub mod text_metrics;
pub mod theme;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{LabelConfig, LineAnchor, SortOrder};
pub use ir::{BaseItem, LabelInput, MarkType, SceneItem, SceneMark};
pub use layout::{
    Align, Anchor, Baseline, LabelError, LabelLayout, LabelOutput, LayoutStats,
    compute_label_layout, compute_label_layout_with,
};
