use crate::document::{Document, Element, ElementPath, INKSCAPE_NAMESPACE, SVG_NAMESPACE};
use crate::error::ExportError;
use crate::MAX_LAYER_COUNT;

/// An independently toggleable group of the source document, as marked by the authoring tool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Layer {
	/// The identity used to select the layer, see [`layer_identity`].
	pub label: String,
	pub path: ElementPath,
	/// The position among all layers of the document, in document order.
	pub index: usize,
}

/// Whether the element is an Inkscape layer: `<g inkscape:groupmode="layer">`.
pub fn is_layer(element: &Element) -> bool {
	element.is(Some(SVG_NAMESPACE), "g") && element.attribute(Some(INKSCAPE_NAMESPACE), "groupmode") == Some("layer")
}

/// The name an author gave the layer: its `inkscape:label`, or failing that its `id`. Empty values don't count.
fn explicit_name(element: &Element) -> Option<&str> {
	let label = element.attribute(Some(INKSCAPE_NAMESPACE), "label").filter(|label| !label.is_empty());
	label.or_else(|| element.attribute(None, "id").filter(|id| !id.is_empty()))
}

/// Resolves the identity of the layer at `path`: `inkscape:label`, then `id`, then a `Layer{index}` placeholder.
///
/// The placeholder uses the layer's position among all layers of the document and gains a `.{k}` suffix if another layer is already
/// explicitly called that, so it is unique within the document. Returns `None` if `path` doesn't lead to a layer.
pub fn layer_identity(document: &Document, path: &ElementPath) -> Option<String> {
	let element = document.element(path).filter(|element| is_layer(element))?;
	if let Some(name) = explicit_name(element) {
		return Some(name.to_string());
	}

	let layers = document.elements().filter(|(_, element)| is_layer(element)).collect::<Vec<_>>();
	let index = layers.iter().position(|(layer_path, _)| layer_path == path)?;
	let taken = |candidate: &str| layers.iter().any(|(_, element)| explicit_name(element) == Some(candidate));

	let placeholder = format!("Layer{index}");
	if !taken(placeholder.as_str()) {
		return Some(placeholder);
	}
	(1..).map(|suffix| format!("{placeholder}.{suffix}")).find(|candidate| !taken(candidate.as_str()))
}

/// Finds every layer of the document, in document order. Sublayers are included, right after their parent.
pub fn locate_layers(document: &Document) -> Vec<Layer> {
	document
		.elements()
		.filter(|(_, element)| is_layer(element))
		.enumerate()
		.filter_map(|(index, (path, _))| {
			let label = layer_identity(document, &path)?;
			Some(Layer { label, path, index })
		})
		.collect()
}

/// The ordered layers whose visibility makes up each combination. The first label is the most significant bit of every artifact name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LayerSelection {
	labels: Vec<String>,
}

impl LayerSelection {
	/// Chooses `count` layers out of the ones located in the canonical source.
	///
	/// With `explicit` labels, exactly `count` of them must be given and each must name exactly one layer.
	/// Without, the first `count` layers in document order are used.
	pub fn resolve(layers: &[Layer], explicit: Option<&[String]>, count: usize) -> Result<Self, ExportError> {
		if count == 0 || count > MAX_LAYER_COUNT {
			return Err(ExportError::InvalidLayerCount(count));
		}

		let labels = match explicit {
			Some(labels) => {
				if labels.len() != count {
					return Err(ExportError::WrongLabelCount {
						expected: count,
						provided: labels.len(),
					});
				}

				let missing = labels.iter().filter(|label| !layers.iter().any(|layer| &layer.label == *label)).cloned().collect::<Vec<_>>();
				if !missing.is_empty() {
					return Err(ExportError::MissingLayers {
						missing,
						available: layers.iter().map(|layer| layer.label.clone()).collect(),
					});
				}

				if let Some((_, label)) = labels.iter().enumerate().find(|(position, label)| labels[..*position].contains(*label)) {
					return Err(ExportError::DuplicateSelection(label.clone()));
				}

				labels.to_vec()
			}
			None => {
				if layers.len() < count {
					return Err(ExportError::InsufficientLayers { found: layers.len(), required: count });
				}
				layers[..count].iter().map(|layer| layer.label.clone()).collect()
			}
		};

		for label in &labels {
			let matching = layers.iter().filter(|layer| &layer.label == label).count();
			if matching > 1 {
				return Err(ExportError::AmbiguousLayer { label: label.clone(), count: matching });
			}
		}

		Ok(Self { labels })
	}

	/// The selected labels, most significant bit first.
	pub fn labels(&self) -> &[String] {
		&self.labels
	}

	pub fn len(&self) -> usize {
		self.labels.len()
	}

	pub fn is_empty(&self) -> bool {
		self.labels.is_empty()
	}

	/// Looks the selected layers up again in `document`, in selection order.
	///
	/// Returns the label that could not be found if the document doesn't contain every selected layer exactly once.
	pub fn locate_in(&self, document: &Document) -> Result<Vec<ElementPath>, String> {
		let layers = locate_layers(document);

		self.labels
			.iter()
			.map(|label| {
				let mut matches = layers.iter().filter(|layer| &layer.label == label);
				match (matches.next(), matches.next()) {
					(Some(layer), None) => Ok(layer.path.clone()),
					_ => Err(label.clone()),
				}
			})
			.collect()
	}
}
