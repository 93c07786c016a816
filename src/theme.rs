use serde::{Deserialize, Serialize};

/// Colors and fallback font of the SVG preview. Layout itself never reads these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    /// Appended to each label's own family list.
    pub font_family: String,
    pub text_color: String,
    pub mark_color: String,
    pub mark_stroke: String,
    pub background: String,
}

impl Theme {
    pub fn classic() -> Self {
        Self {
            font_family: "sans-serif".to_string(),
            text_color: "#000000".to_string(),
            mark_color: "#4C78A8".to_string(),
            mark_stroke: "#4C78A8".to_string(),
            background: "#FFFFFF".to_string(),
        }
    }

    pub fn modern() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            text_color: "#1C2430".to_string(),
            mark_color: "#7A8AA6".to_string(),
            mark_stroke: "#3B4A66".to_string(),
            background: "#FFFFFF".to_string(),
        }
    }
}
