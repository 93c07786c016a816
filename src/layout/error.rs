use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LabelError {
    #[error("size of chart should be specified as an array of width and height (got {len} values)")]
    InvalidSize { len: usize },
    #[error("chart size must be finite and non-negative (got {width} x {height})")]
    NegativeSize { width: f32, height: f32 },
    #[error("unknown label anchor `{0}`")]
    UnknownAnchor(String),
    #[error("failed to rasterize marks: {0}")]
    Raster(String),
}

impl LabelError {
    pub(crate) fn missing_size() -> Self {
        Self::InvalidSize { len: 0 }
    }
}
