//! Exports every on/off combination of the layers of an Inkscape SVG document as a raster image.
//!
//! Each image is named after its combination: one character per selected layer, `1` for shown and `0` for hidden, with the first
//! selected layer as the leftmost character.

pub mod combination;
pub mod document;
pub mod error;
pub mod export;
pub mod layer;
pub mod render;
pub mod visibility;

pub use combination::{Combination, Combinations, combinations};
pub use document::Document;
pub use error::{DocumentError, ExportError, RenderError};
pub use export::{ExportOptions, ExportProgress, ExportSummary, LayerExporter, RenderFailurePolicy, artifact_file_name, export_file};
pub use layer::{Layer, LayerSelection, locate_layers};
pub use render::{FileType, Rasterizer, RenderSettings, ResvgRasterizer};
pub use visibility::VisibilityMode;

/// How many layers are combined when the caller doesn't say.
pub const DEFAULT_LAYER_COUNT: usize = 6;

/// The most layers a single run may combine, which bounds a run to `2^16` images.
pub const MAX_LAYER_COUNT: usize = 16;
