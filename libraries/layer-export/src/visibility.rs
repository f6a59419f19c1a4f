use crate::combination::Combination;
use crate::document::{Document, Element};
use crate::error::ExportError;
use crate::layer::LayerSelection;

/// How a layer's visibility is written into the document.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VisibilityMode {
	/// Remove every `display` declaration from the inline style and the `display` attribute, then append a single `display` declaration.
	/// The layer ends up with exactly one source of truth for whether it renders.
	#[default]
	Canonicalize,
	/// Only set the `display` attribute and leave the inline style alone.
	///
	/// A `display` declaration in the style attribute still wins over the attribute when rendering, so a layer saved as hidden through
	/// its style stays hidden in this mode.
	Preserve,
}

fn display_value(visible: bool) -> &'static str {
	if visible { "inline" } else { "none" }
}

fn is_display_declaration(declaration: &str) -> bool {
	declaration.split_once(':').is_some_and(|(property, _)| property.trim().eq_ignore_ascii_case("display"))
}

/// Forces the element to be shown or hidden.
pub fn set_layer_visibility(element: &mut Element, visible: bool, mode: VisibilityMode) {
	let display = display_value(visible);

	match mode {
		VisibilityMode::Canonicalize => {
			let style = element.attribute(None, "style").unwrap_or_default();
			let mut declarations = style
				.split(';')
				.map(str::trim)
				.filter(|declaration| !declaration.is_empty() && !is_display_declaration(declaration))
				.map(str::to_string)
				.collect::<Vec<_>>();
			declarations.push(format!("display:{display}"));

			element.set_attribute("style", declarations.join(";"));
			element.remove_attribute("display");
		}
		VisibilityMode::Preserve => element.set_attribute("display", display),
	}
}

/// Whether the element renders as far as `display` goes: a `display` declaration in the style takes precedence over the attribute,
/// and an element with neither is shown.
pub fn layer_visibility(element: &Element) -> bool {
	let from_style = element
		.attribute(None, "style")
		.and_then(|style| style.split(';').filter(|declaration| is_display_declaration(declaration)).last())
		.and_then(|declaration| declaration.split_once(':'))
		.map(|(_, value)| value.trim().to_string());
	let display = from_style.or_else(|| element.attribute(None, "display").map(|value| value.trim().to_string()));

	display.is_none_or(|display| display != "none")
}

/// Writes the combination into a fresh copy of the document: the layer at position `i` of the selection is shown when bit `i` is set.
///
/// The selection is resolved again on this document first. A layer that can't be found is a [`ExportError::LayerVanished`] error,
/// which means the document doesn't match the canonical source the selection was made from.
pub fn apply_combination(document: &mut Document, selection: &LayerSelection, combination: Combination, mode: VisibilityMode) -> Result<(), ExportError> {
	let paths = selection.locate_in(document).map_err(|label| ExportError::LayerVanished {
		label,
		combination: combination.bitstring(),
	})?;

	for (position, (path, label)) in paths.iter().zip(selection.labels()).enumerate() {
		let element = document.element_mut(path).ok_or_else(|| ExportError::LayerVanished {
			label: label.clone(),
			combination: combination.bitstring(),
		})?;
		set_layer_visibility(element, combination.is_visible(position), mode);
	}

	Ok(())
}
