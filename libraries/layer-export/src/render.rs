use crate::document::Document;
use crate::error::RenderError;

use resvg::tiny_skia;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FileType {
	#[default]
	Png,
	Jpg,
	Bmp,
}

impl FileType {
	pub fn extension(self) -> &'static str {
		match self {
			FileType::Png => "png",
			FileType::Jpg => "jpg",
			FileType::Bmp => "bmp",
		}
	}

	pub fn supports_transparency(self) -> bool {
		self != FileType::Jpg
	}

	fn image_format(self) -> image::ImageFormat {
		match self {
			FileType::Png => image::ImageFormat::Png,
			FileType::Jpg => image::ImageFormat::Jpeg,
			FileType::Bmp => image::ImageFormat::Bmp,
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct RenderSettings {
	/// Dots per inch, used to convert physical units such as `mm` or `in` in the document into pixels.
	pub dpi: f32,
	/// Multiplies the pixel size of the output.
	pub scale: f32,
	pub file_type: FileType,
	/// Formats without an alpha channel are always composited over white.
	pub transparent_background: bool,
}

impl Default for RenderSettings {
	fn default() -> Self {
		Self {
			dpi: 300.,
			scale: 1.,
			file_type: FileType::Png,
			transparent_background: true,
		}
	}
}

impl RenderSettings {
	pub fn validate(&self) -> Result<(), RenderError> {
		if !self.dpi.is_finite() || self.dpi <= 0. {
			return Err(RenderError::InvalidSettings(format!("the resolution must be a positive number of dots per inch, not {}", self.dpi)));
		}
		if !self.scale.is_finite() || self.scale <= 0. {
			return Err(RenderError::InvalidSettings(format!("the scale factor must be positive, not {}", self.scale)));
		}
		Ok(())
	}

	fn opaque_background(&self) -> bool {
		!self.transparent_background || !self.file_type.supports_transparency()
	}
}

/// Turns a fully prepared document into encoded raster image bytes.
///
/// Implementations must depend on nothing but the document and the settings, so every combination renders the same way no matter what
/// was rendered before it.
pub trait Rasterizer {
	fn rasterize(&self, document: &Document, settings: &RenderSettings) -> Result<Vec<u8>, RenderError>;
}

/// Renders with `usvg` and `resvg` and encodes with `image`.
#[derive(Clone)]
pub struct ResvgRasterizer {
	fontdb: Arc<usvg::fontdb::Database>,
	resources_dir: Option<PathBuf>,
}

impl Default for ResvgRasterizer {
	fn default() -> Self {
		Self::new()
	}
}

impl ResvgRasterizer {
	/// Creates a rasterizer with the system fonts loaded, which is done once here rather than for every render.
	pub fn new() -> Self {
		let mut fontdb = usvg::fontdb::Database::new();
		fontdb.load_system_fonts();
		log::debug!("Loaded {} font faces", fontdb.len());

		Self {
			fontdb: Arc::new(fontdb),
			resources_dir: None,
		}
	}

	/// The directory relative `<image>` references are resolved against, normally the directory of the source document.
	pub fn with_resources_dir(mut self, resources_dir: impl Into<PathBuf>) -> Self {
		self.resources_dir = Some(resources_dir.into());
		self
	}

	pub fn resources_dir(&self) -> Option<&Path> {
		self.resources_dir.as_deref()
	}
}

impl ResvgRasterizer {
	/// Loads images the way `usvg` does by default, but writes down every href it can't turn into an image.
	fn usvg_options<'a>(&self, settings: &RenderSettings, unresolved: &'a Mutex<Vec<String>>) -> usvg::Options<'a> {
		let resolve = usvg::ImageHrefResolver::default_string_resolver();

		usvg::Options {
			resources_dir: self.resources_dir.clone(),
			dpi: settings.dpi,
			fontdb: self.fontdb.clone(),
			image_href_resolver: usvg::ImageHrefResolver {
				resolve_data: usvg::ImageHrefResolver::default_data_resolver(),
				resolve_string: Box::new(move |href: &str, options: &usvg::Options| {
					let image = resolve(href, options);
					if image.is_none() {
						unresolved.lock().unwrap_or_else(PoisonError::into_inner).push(href.to_string());
					}
					image
				}),
			},
			..Default::default()
		}
	}
}

impl Rasterizer for ResvgRasterizer {
	fn rasterize(&self, document: &Document, settings: &RenderSettings) -> Result<Vec<u8>, RenderError> {
		settings.validate()?;

		let unresolved = Mutex::new(Vec::new());
		let tree = {
			let options = self.usvg_options(settings, &unresolved);
			usvg::Tree::from_str(&document.to_xml_string(), &options)?
		};
		if let Some(href) = unresolved.into_inner().unwrap_or_else(PoisonError::into_inner).into_iter().next() {
			return Err(RenderError::UnresolvedReference(href));
		}

		let size = tree.size();
		let (width, height) = (size.width() * settings.scale, size.height() * settings.scale);
		let mut pixmap = tiny_skia::Pixmap::new(width.round() as u32, height.round() as u32).ok_or(RenderError::InvalidCanvasSize { width, height })?;

		if settings.opaque_background() {
			pixmap.fill(tiny_skia::Color::WHITE);
		}

		let transform = tiny_skia::Transform::from_scale(pixmap.width() as f32 / size.width(), pixmap.height() as f32 / size.height());
		resvg::render(&tree, transform, &mut pixmap.as_mut());

		encode(&pixmap, settings.file_type)
	}
}

fn encode(pixmap: &tiny_skia::Pixmap, file_type: FileType) -> Result<Vec<u8>, RenderError> {
	let (width, height) = (pixmap.width(), pixmap.height());

	// tiny-skia stores premultiplied alpha, image expects straight alpha
	let data = pixmap
		.pixels()
		.iter()
		.flat_map(|pixel| {
			let color = pixel.demultiply();
			[color.red(), color.green(), color.blue(), color.alpha()]
		})
		.collect();
	let rgba = image::RgbaImage::from_raw(width, height, data).ok_or(RenderError::InvalidCanvasSize {
		width: width as f32,
		height: height as f32,
	})?;

	let image = match file_type.supports_transparency() {
		true => image::DynamicImage::ImageRgba8(rgba),
		false => image::DynamicImage::ImageRgb8(image::DynamicImage::ImageRgba8(rgba).to_rgb8()),
	};

	let mut bytes = Vec::new();
	image.write_to(&mut Cursor::new(&mut bytes), file_type.image_format())?;
	Ok(bytes)
}
