use clap::{ArgAction, Parser, ValueEnum};
use layer_export::{DEFAULT_LAYER_COUNT, ExportOptions, FileType, RenderFailurePolicy, RenderSettings, VisibilityMode};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
	/// PNG with a transparent background unless `--opaque` is given
	Png,
	/// JPEG, always composited over white
	Jpg,
	/// Uncompressed bitmap
	Bmp,
}

impl From<Format> for FileType {
	fn from(format: Format) -> Self {
		match format {
			Format::Png => FileType::Png,
			Format::Jpg => FileType::Jpg,
			Format::Bmp => FileType::Bmp,
		}
	}
}

#[derive(Debug, Parser)]
#[command(name = "layer-export", version)]
#[command(about = "Export every on/off combination of the layers of an Inkscape SVG document as raster images")]
pub struct Cli {
	/// The SVG document whose layers are combined
	pub input: PathBuf,

	/// Directory the images are written to, created if it doesn't exist
	pub output_dir: PathBuf,

	/// Labels of the layers to combine, leftmost bit first (defaults to the first layers of the document)
	#[arg(short, long, num_args = 1..)]
	pub layers: Option<Vec<String>>,

	/// Number of layers in each combination
	#[arg(short = 'n', long, default_value_t = DEFAULT_LAYER_COUNT)]
	pub count: usize,

	/// Resolution used for physical units in the document
	#[arg(long, default_value_t = 300.)]
	pub dpi: f32,

	/// Scale factor applied to the output size
	#[arg(long, default_value_t = 1.)]
	pub scale: f32,

	/// Prepended to every output filename
	#[arg(long, default_value = "")]
	pub prefix: String,

	/// Only set the `display` attribute of each layer instead of rewriting its style
	#[arg(long)]
	pub keep_style: bool,

	/// Output image format
	#[arg(short, long, value_enum, default_value_t = Format::Png)]
	pub format: Format,

	/// Fill the background with white
	#[arg(long)]
	pub opaque: bool,

	/// Keep going when a combination fails to render instead of stopping
	#[arg(long)]
	pub skip_failed: bool,

	/// Log more, can be repeated
	#[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
	pub verbose: u8,

	/// Only log warnings and errors, and hide the progress bar
	#[arg(short, long)]
	pub quiet: bool,
}

impl Cli {
	pub fn export_options(&self) -> ExportOptions {
		ExportOptions {
			layer_count: self.count,
			layers: self.layers.clone(),
			prefix: self.prefix.clone(),
			visibility_mode: if self.keep_style { VisibilityMode::Preserve } else { VisibilityMode::Canonicalize },
			on_render_failure: if self.skip_failed { RenderFailurePolicy::Skip } else { RenderFailurePolicy::Abort },
			render: RenderSettings {
				dpi: self.dpi,
				scale: self.scale,
				file_type: self.format.into(),
				transparent_background: !self.opaque,
			},
		}
	}

	pub fn log_level(&self) -> log::LevelFilter {
		match (self.quiet, self.verbose) {
			(true, _) => log::LevelFilter::Warn,
			(false, 0) => log::LevelFilter::Info,
			(false, 1) => log::LevelFilter::Debug,
			(false, _) => log::LevelFilter::Trace,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;

	#[test]
	fn defaults_match_the_library() {
		let cli = Cli::try_parse_from(["layer-export", "drawing.svg", "out"]).unwrap();

		assert_eq!(cli.export_options(), ExportOptions::default());
		assert_eq!(cli.log_level(), log::LevelFilter::Info);
	}

	#[test]
	fn flags_map_onto_options() {
		let cli = Cli::try_parse_from([
			"layer-export", "drawing.svg", "out", "--count", "2", "--dpi", "96", "--scale", "2", "--prefix", "frame_", "--keep-style", "--format", "jpg", "--skip-failed", "-vv", "--layers", "Sky", "Ground",
		])
		.unwrap();
		let options = cli.export_options();

		assert_eq!(options.layer_count, 2);
		assert_eq!(options.layers, Some(vec!["Sky".to_string(), "Ground".to_string()]));
		assert_eq!(options.prefix, "frame_");
		assert_eq!(options.visibility_mode, VisibilityMode::Preserve);
		assert_eq!(options.on_render_failure, RenderFailurePolicy::Skip);
		assert_eq!(options.render, RenderSettings { dpi: 96., scale: 2., file_type: FileType::Jpg, transparent_background: true });
		assert_eq!(cli.log_level(), log::LevelFilter::Trace);
	}

	#[test]
	fn quiet_and_verbose_conflict() {
		assert!(Cli::try_parse_from(["layer-export", "drawing.svg", "out", "-q", "-v"]).is_err());
	}
}
