use std::path::PathBuf;

use thiserror::Error;

/// Failures inside the analysis and export layers.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("derived district column has {got} labels for {rows} rows")]
    ColumnLength { got: usize, rows: usize },

    #[error("reading boundary file {path}: {source}")]
    BoundaryIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing boundary file {path}: {source}")]
    BoundaryParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("boundary file {0} is not a FeatureCollection")]
    NotFeatureCollection(PathBuf),

    #[error("chart font could not be registered: {0}")]
    Font(String),

    #[error("drawing chart: {0}")]
    Draw(String),

    #[error("encoding PNG: {0}")]
    Encode(#[from] image::ImageError),
}
