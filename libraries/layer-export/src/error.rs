use crate::MAX_LAYER_COUNT;

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while turning source bytes into a [`Document`](crate::document::Document).
#[derive(Debug, Error)]
pub enum DocumentError {
	#[error("The document is not valid UTF-8")]
	Utf8(#[from] std::str::Utf8Error),
	#[error("The document is not well-formed XML: {0}")]
	Xml(#[from] roxmltree::Error),
}

/// Errors raised while rasterizing a single document.
#[derive(Debug, Error)]
pub enum RenderError {
	#[error("Invalid render settings: {0}")]
	InvalidSettings(String),
	#[error("The renderer could not load the document: {0}")]
	Svg(#[from] usvg::Error),
	#[error("The image reference {0:?} could not be resolved to a local file")]
	UnresolvedReference(String),
	#[error("A {width}x{height} canvas cannot be allocated")]
	InvalidCanvasSize { width: f32, height: f32 },
	#[error("Failed to encode the rendered image")]
	Encode(#[from] image::ImageError),
}

/// The error type of a combination export run.
///
/// Every variant except [`ExportError::Render`] under [`RenderFailurePolicy::Skip`](crate::export::RenderFailurePolicy::Skip) is fatal for the run.
#[derive(Debug, Error)]
pub enum ExportError {
	#[error(transparent)]
	Settings(RenderError),

	#[error("The filename prefix {0:?} may not contain path separators")]
	InvalidPrefix(String),

	#[error("The layer count must be between 1 and {max}, but {0} was requested", max = MAX_LAYER_COUNT)]
	InvalidLayerCount(usize),

	#[error("Exactly {expected} layer labels must be provided, but {provided} were given")]
	WrongLabelCount { expected: usize, provided: usize },

	#[error("Layers not found: {missing:?}\nAvailable layers: {available:?}")]
	MissingLayers { missing: Vec<String>, available: Vec<String> },

	#[error("The layer {0:?} was selected more than once")]
	DuplicateSelection(String),

	#[error("The layer label {label:?} matches {count} layers, so it cannot stand for a single bit")]
	AmbiguousLayer { label: String, count: usize },

	#[error("Only {found} layers were found in the document, but {required} are required")]
	InsufficientLayers { found: usize, required: usize },

	#[error("The layer {label:?} is missing from the copy of the document made for combination {combination}")]
	LayerVanished { label: String, combination: String },

	#[error("Failed to load the source document")]
	Document(#[from] DocumentError),

	#[error("Failed to render combination {combination}")]
	Render {
		combination: String,
		#[source]
		source: RenderError,
	},

	#[error("Failed to access {path:?}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
}

impl ExportError {
	pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
		let path = path.into();
		move |source| Self::Io { path, source }
	}

	/// Whether the error was detected while validating the configuration against the canonical source, before any rendering began.
	pub fn is_configuration_error(&self) -> bool {
		matches!(
			self,
			Self::Settings(_) | Self::InvalidPrefix(_) | Self::InvalidLayerCount(_) | Self::WrongLabelCount { .. } | Self::MissingLayers { .. } | Self::DuplicateSelection(_) | Self::AmbiguousLayer { .. } | Self::InsufficientLayers { .. }
		)
	}
}
