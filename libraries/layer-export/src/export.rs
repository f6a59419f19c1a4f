use crate::DEFAULT_LAYER_COUNT;
use crate::combination::{Combination, Combinations, combinations};
use crate::document::Document;
use crate::error::{ExportError, RenderError};
use crate::layer::{Layer, LayerSelection, locate_layers};
use crate::render::{FileType, Rasterizer, RenderSettings, ResvgRasterizer};
use crate::visibility::{VisibilityMode, apply_combination};

use std::fs;
use std::path::{Path, PathBuf};

/// What to do when a single combination fails to render. The same policy applies to every combination of a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RenderFailurePolicy {
	/// Stop the run at the first failure. Images written before it are kept.
	#[default]
	Abort,
	/// Log a warning, leave that image out and carry on with the next combination.
	Skip,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExportOptions {
	/// How many layers make up a combination, which is also the length of every bitstring.
	pub layer_count: usize,
	/// The labels of the layers to combine, most significant bit first. The first `layer_count` layers of the document are used when absent.
	pub layers: Option<Vec<String>>,
	/// Prepended to every bitstring to form the artifact filename.
	pub prefix: String,
	pub visibility_mode: VisibilityMode,
	pub on_render_failure: RenderFailurePolicy,
	pub render: RenderSettings,
}

impl Default for ExportOptions {
	fn default() -> Self {
		Self {
			layer_count: DEFAULT_LAYER_COUNT,
			layers: None,
			prefix: String::new(),
			visibility_mode: VisibilityMode::default(),
			on_render_failure: RenderFailurePolicy::default(),
			render: RenderSettings::default(),
		}
	}
}

impl ExportOptions {
	pub fn validate(&self) -> Result<(), ExportError> {
		self.render.validate().map_err(ExportError::Settings)?;

		if self.prefix.contains(['/', '\\']) {
			return Err(ExportError::InvalidPrefix(self.prefix.clone()));
		}

		Ok(())
	}
}

/// The filename of the image for `combination`: `<prefix><bitstring>.<extension>`.
pub fn artifact_file_name(prefix: &str, combination: Combination, file_type: FileType) -> String {
	format!("{prefix}{}.{}", combination.bitstring(), file_type.extension())
}

/// Reported after each combination has been handled.
#[derive(Clone, Debug, PartialEq)]
pub struct ExportProgress {
	/// How many combinations have been handled so far, including this one.
	pub completed: usize,
	pub total: usize,
	pub combination: Combination,
	pub path: PathBuf,
	/// Whether rendering failed and the image was left out.
	pub skipped: bool,
}

#[derive(Debug, Default)]
pub struct ExportSummary {
	pub written: Vec<PathBuf>,
	pub skipped: Vec<(Combination, RenderError)>,
}

/// Renders every combination of the selected layers of one source document.
///
/// The source bytes are kept as they were read and parsed again for every combination, so no change made for one combination can leak
/// into another.
pub struct LayerExporter<R = ResvgRasterizer> {
	source: Vec<u8>,
	layers: Vec<Layer>,
	selection: LayerSelection,
	options: ExportOptions,
	rasterizer: R,
}

impl<R: Rasterizer> LayerExporter<R> {
	/// Parses the canonical source once and resolves the layer selection against it.
	///
	/// Every configuration problem is reported here, before anything is rendered or written.
	pub fn new(source: impl Into<Vec<u8>>, options: ExportOptions, rasterizer: R) -> Result<Self, ExportError> {
		let source = source.into();
		options.validate()?;

		let document = Document::from_bytes(&source)?;
		let layers = locate_layers(&document);
		log::debug!("Found {} layers: {:?}", layers.len(), layers.iter().map(|layer| layer.label.as_str()).collect::<Vec<_>>());

		let selection = LayerSelection::resolve(&layers, options.layers.as_deref(), options.layer_count)?;
		log::info!("Selected layers (bit order, most significant first):");
		for (position, label) in selection.labels().iter().enumerate() {
			log::info!("  {position}: {label}");
		}

		Ok(Self {
			source,
			layers,
			selection,
			options,
			rasterizer,
		})
	}

	/// Every layer of the canonical source, in document order.
	pub fn layers(&self) -> &[Layer] {
		&self.layers
	}

	pub fn selection(&self) -> &LayerSelection {
		&self.selection
	}

	pub fn options(&self) -> &ExportOptions {
		&self.options
	}

	/// The combinations this exporter renders, in the order it renders them.
	pub fn combinations(&self) -> Combinations {
		combinations(self.selection.len())
	}

	pub fn artifact_path(&self, output_dir: &Path, combination: Combination) -> PathBuf {
		output_dir.join(artifact_file_name(&self.options.prefix, combination, self.options.render.file_type))
	}

	/// Renders one combination from a fresh parse of the canonical source.
	pub fn render_combination(&self, combination: Combination) -> Result<Vec<u8>, ExportError> {
		let mut document = Document::from_bytes(&self.source)?;
		apply_combination(&mut document, &self.selection, combination, self.options.visibility_mode)?;

		self.rasterizer.rasterize(&document, &self.options.render).map_err(|source| ExportError::Render {
			combination: combination.bitstring(),
			source,
		})
	}

	/// Renders all `2^N` combinations into `output_dir`, which is created if needed. Existing images are overwritten.
	pub fn export(&self, output_dir: &Path, mut progress: impl FnMut(&ExportProgress)) -> Result<ExportSummary, ExportError> {
		fs::create_dir_all(output_dir).map_err(ExportError::io(output_dir))?;

		let sequence = self.combinations();
		let total = sequence.len();
		let mut summary = ExportSummary::default();

		for (index, combination) in sequence.enumerate() {
			let path = self.artifact_path(output_dir, combination);

			let skipped = match self.render_combination(combination) {
				Ok(bytes) => {
					fs::write(&path, bytes).map_err(ExportError::io(&path))?;
					log::debug!("[{}/{total}] Wrote {path:?}", index + 1);
					summary.written.push(path.clone());
					false
				}
				Err(ExportError::Render { source, .. }) if self.options.on_render_failure == RenderFailurePolicy::Skip => {
					log::warn!("Skipping combination {combination}: {source}");
					summary.skipped.push((combination, source));
					true
				}
				Err(error) => return Err(error),
			};

			progress(&ExportProgress {
				completed: index + 1,
				total,
				combination,
				path,
				skipped,
			});
		}

		log::info!("Exported {} of {total} images to {output_dir:?}", summary.written.len());
		Ok(summary)
	}
}

/// Reads the document at `input` and exports every combination of its layers into `output_dir`.
///
/// Relative image references in the document are resolved against the directory it lives in.
pub fn export_file(input: &Path, output_dir: &Path, options: ExportOptions, progress: impl FnMut(&ExportProgress)) -> Result<ExportSummary, ExportError> {
	let source = fs::read(input).map_err(ExportError::io(input))?;

	let mut rasterizer = ResvgRasterizer::new();
	if let Some(directory) = input.parent() {
		rasterizer = rasterizer.with_resources_dir(directory);
	}

	LayerExporter::new(source, options, rasterizer)?.export(output_dir, progress)
}
