//! An owned, mutable XML tree for SVG documents.
//!
//! `roxmltree` (the parser `usvg` itself is built on) is read-only, so a parsed document is copied into
//! the [`Element`]/[`Node`] tree below, which can be edited in place and written back out as SVG text.
//! Namespace prefixes and declarations are kept, so the serialized text still carries the authoring
//! tool's metadata (for example `inkscape:label`).

use crate::error::DocumentError;

use std::fmt;

pub const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";
pub const INKSCAPE_NAMESPACE: &str = "http://www.inkscape.org/namespaces/inkscape";
pub const XLINK_NAMESPACE: &str = "http://www.w3.org/1999/xlink";
const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QualifiedName {
	/// The namespace URI the name belongs to, if any.
	pub namespace: Option<String>,
	/// The prefix used when writing the name. `None` means unprefixed.
	pub prefix: Option<String>,
	pub local: String,
}

impl QualifiedName {
	/// An unprefixed name outside of any namespace, as used by plain SVG attributes like `style` or `display`.
	pub fn local(local: impl Into<String>) -> Self {
		Self {
			namespace: None,
			prefix: None,
			local: local.into(),
		}
	}

	pub fn matches(&self, namespace: Option<&str>, local: &str) -> bool {
		self.namespace.as_deref() == namespace && self.local == local
	}
}

impl fmt::Display for QualifiedName {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.prefix {
			Some(prefix) => write!(f, "{prefix}:{}", self.local),
			None => f.write_str(&self.local),
		}
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attribute {
	pub name: QualifiedName,
	pub value: String,
}

/// An `xmlns` or `xmlns:prefix` declaration made on an element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NamespaceDeclaration {
	pub prefix: Option<String>,
	pub uri: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
	Element(Element),
	Text(String),
	Comment(String),
	ProcessingInstruction { target: String, value: Option<String> },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Element {
	pub name: QualifiedName,
	/// Namespace declarations made on this element (not the ones inherited from its ancestors).
	pub namespaces: Vec<NamespaceDeclaration>,
	pub attributes: Vec<Attribute>,
	pub children: Vec<Node>,
}

impl Element {
	pub fn is(&self, namespace: Option<&str>, local: &str) -> bool {
		self.name.matches(namespace, local)
	}

	pub fn attribute(&self, namespace: Option<&str>, local: &str) -> Option<&str> {
		self.attributes.iter().find(|attribute| attribute.name.matches(namespace, local)).map(|attribute| attribute.value.as_str())
	}

	/// Sets an attribute outside of any namespace, overwriting its value in place if it already exists.
	pub fn set_attribute(&mut self, local: &str, value: impl Into<String>) {
		let value = value.into();
		match self.attributes.iter_mut().find(|attribute| attribute.name.matches(None, local)) {
			Some(attribute) => attribute.value = value,
			None => self.attributes.push(Attribute { name: QualifiedName::local(local), value }),
		}
	}

	/// Removes an attribute outside of any namespace, returning its previous value.
	pub fn remove_attribute(&mut self, local: &str) -> Option<String> {
		let index = self.attributes.iter().position(|attribute| attribute.name.matches(None, local))?;
		Some(self.attributes.remove(index).value)
	}

	/// The element children, paired with their index in [`Element::children`].
	pub fn child_elements(&self) -> impl Iterator<Item = (usize, &Element)> {
		self.children.iter().enumerate().filter_map(|(index, node)| match node {
			Node::Element(element) => Some((index, element)),
			_ => None,
		})
	}
}

/// The position of an element in a [`Document`], as child indices walked down from the root element.
///
/// Parsing the same bytes always yields the same paths, which is what lets a layer found in the canonical source be looked up again in every fresh copy.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ElementPath(Vec<usize>);

impl ElementPath {
	pub fn root() -> Self {
		Self::default()
	}

	pub fn child(&self, index: usize) -> Self {
		let mut indices = self.0.clone();
		indices.push(index);
		Self(indices)
	}

	pub fn indices(&self) -> &[usize] {
		&self.0
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Document {
	/// Comments and processing instructions before the root element.
	pub prologue: Vec<Node>,
	pub root: Element,
	/// Comments and processing instructions after the root element.
	pub epilogue: Vec<Node>,
}

impl Document {
	pub fn from_bytes(bytes: &[u8]) -> Result<Self, DocumentError> {
		Self::parse(std::str::from_utf8(bytes)?)
	}

	pub fn parse(text: &str) -> Result<Self, DocumentError> {
		let options = roxmltree::ParsingOptions {
			allow_dtd: true,
			..Default::default()
		};
		let parsed = roxmltree::Document::parse_with_options(text, options)?;

		let mut prologue = Vec::new();
		let mut epilogue = Vec::new();
		let mut before_root = true;
		for node in parsed.root().children() {
			if node.is_element() {
				before_root = false;
			} else if let Some(converted) = convert_node(node, &[]) {
				match before_root {
					true => prologue.push(converted),
					false => epilogue.push(converted),
				}
			}
		}
		let root = convert_element(parsed.root_element(), &[]);

		Ok(Self { prologue, root, epilogue })
	}

	pub fn root(&self) -> &Element {
		&self.root
	}

	pub fn element(&self, path: &ElementPath) -> Option<&Element> {
		path.indices().iter().try_fold(&self.root, |element, &index| match element.children.get(index) {
			Some(Node::Element(child)) => Some(child),
			_ => None,
		})
	}

	pub fn element_mut(&mut self, path: &ElementPath) -> Option<&mut Element> {
		path.indices().iter().try_fold(&mut self.root, |element, &index| match element.children.get_mut(index) {
			Some(Node::Element(child)) => Some(child),
			_ => None,
		})
	}

	/// Every element of the document in pre-order (document order), starting with the root element.
	pub fn elements(&self) -> Elements<'_> {
		Elements {
			stack: vec![(ElementPath::root(), &self.root)],
		}
	}

	/// Serializes the document back into SVG text, starting with an XML declaration.
	pub fn to_xml_string(&self) -> String {
		self.to_string()
	}
}

impl fmt::Display for Document {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n")?;
		for node in &self.prologue {
			writeln!(f, "{node}")?;
		}
		write!(f, "{}", self.root)?;
		for node in &self.epilogue {
			write!(f, "\n{node}")?;
		}
		Ok(())
	}
}

impl fmt::Display for Node {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Node::Element(element) => write!(f, "{element}"),
			Node::Text(text) => write_escaped(f, text, false),
			Node::Comment(comment) => write!(f, "<!--{comment}-->"),
			Node::ProcessingInstruction { target, value: Some(value) } => write!(f, "<?{target} {value}?>"),
			Node::ProcessingInstruction { target, value: None } => write!(f, "<?{target}?>"),
		}
	}
}

impl fmt::Display for Element {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "<{}", self.name)?;

		for namespace in &self.namespaces {
			match &namespace.prefix {
				Some(prefix) => write!(f, " xmlns:{prefix}=\"")?,
				None => f.write_str(" xmlns=\"")?,
			}
			write_escaped(f, &namespace.uri, true)?;
			f.write_str("\"")?;
		}

		for attribute in &self.attributes {
			write!(f, " {}=\"", attribute.name)?;
			write_escaped(f, &attribute.value, true)?;
			f.write_str("\"")?;
		}

		if self.children.is_empty() {
			return f.write_str("/>");
		}

		f.write_str(">")?;
		for child in &self.children {
			write!(f, "{child}")?;
		}
		write!(f, "</{}>", self.name)
	}
}

pub struct Elements<'a> {
	stack: Vec<(ElementPath, &'a Element)>,
}

impl<'a> Iterator for Elements<'a> {
	type Item = (ElementPath, &'a Element);

	fn next(&mut self) -> Option<Self::Item> {
		let (path, element) = self.stack.pop()?;

		// Pushed in reverse so the first child is popped next
		let children = element.child_elements().collect::<Vec<_>>();
		self.stack.extend(children.into_iter().rev().map(|(index, child)| (path.child(index), child)));

		Some((path, element))
	}
}

fn write_escaped(f: &mut fmt::Formatter<'_>, text: &str, in_attribute: bool) -> fmt::Result {
	let mut last = 0;
	for (index, character) in text.char_indices() {
		let replacement = match character {
			'&' => "&amp;",
			'<' => "&lt;",
			'>' => "&gt;",
			'"' if in_attribute => "&quot;",
			'\n' if in_attribute => "&#10;",
			'\t' if in_attribute => "&#9;",
			_ => continue,
		};
		f.write_str(&text[last..index])?;
		f.write_str(replacement)?;
		last = index + character.len_utf8();
	}
	f.write_str(&text[last..])
}

fn convert_node(node: roxmltree::Node, inherited: &[NamespaceDeclaration]) -> Option<Node> {
	match node.node_type() {
		roxmltree::NodeType::Element => Some(Node::Element(convert_element(node, inherited))),
		roxmltree::NodeType::Text => node.text().map(|text| Node::Text(text.to_string())),
		roxmltree::NodeType::Comment => node.text().map(|text| Node::Comment(text.to_string())),
		roxmltree::NodeType::PI => node.pi().map(|pi| Node::ProcessingInstruction {
			target: pi.target.to_string(),
			value: pi.value.map(str::to_string),
		}),
		roxmltree::NodeType::Root => None,
	}
}

fn convert_element(node: roxmltree::Node, inherited: &[NamespaceDeclaration]) -> Element {
	let in_scope = node
		.namespaces()
		.filter(|namespace| namespace.uri() != XML_NAMESPACE)
		.map(|namespace| NamespaceDeclaration {
			prefix: namespace.name().map(str::to_string),
			uri: namespace.uri().to_string(),
		})
		.collect::<Vec<_>>();

	let mut namespaces = in_scope.iter().filter(|namespace| !inherited.contains(namespace)).cloned().collect::<Vec<_>>();

	let tag_name = node.tag_name();
	let prefix = tag_name.namespace().and_then(|uri| element_prefix(&in_scope, uri));

	// An element taken out of an inherited default namespace with `xmlns=""` has to keep saying so
	let inherits_default = inherited.iter().any(|namespace| namespace.prefix.is_none() && !namespace.uri.is_empty());
	let has_default = in_scope.iter().any(|namespace| namespace.prefix.is_none());
	if tag_name.namespace().is_none() && inherits_default && !has_default {
		namespaces.push(NamespaceDeclaration { prefix: None, uri: String::new() });
	}

	let attributes = node
		.attributes()
		.map(|attribute| Attribute {
			name: QualifiedName {
				namespace: attribute.namespace().map(str::to_string),
				prefix: attribute.namespace().and_then(|uri| attribute_prefix(&in_scope, uri)),
				local: attribute.name().to_string(),
			},
			value: attribute.value().to_string(),
		})
		.collect();

	let mut scope = in_scope;
	if tag_name.namespace().is_none() && !has_default {
		scope.push(NamespaceDeclaration { prefix: None, uri: String::new() });
	}
	let children = node.children().filter_map(|child| convert_node(child, &scope)).collect();

	Element {
		name: QualifiedName {
			namespace: tag_name.namespace().map(str::to_string),
			prefix,
			local: tag_name.name().to_string(),
		},
		namespaces,
		attributes,
		children,
	}
}

/// Elements prefer the default namespace when it matches, so `<svg:g>` is only written where the source had no default SVG namespace.
fn element_prefix(scope: &[NamespaceDeclaration], uri: &str) -> Option<String> {
	if scope.iter().any(|namespace| namespace.prefix.is_none() && namespace.uri == uri) {
		return None;
	}
	attribute_prefix(scope, uri)
}

/// Attributes are never in the default namespace, so only a real prefix will do.
fn attribute_prefix(scope: &[NamespaceDeclaration], uri: &str) -> Option<String> {
	if uri == XML_NAMESPACE {
		return Some("xml".to_string());
	}
	scope.iter().find(|namespace| namespace.uri == uri && namespace.prefix.is_some()).and_then(|namespace| namespace.prefix.clone())
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;

	const SOURCE: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<!-- Created with Inkscape -->
<svg xmlns="http://www.w3.org/2000/svg" xmlns:inkscape="http://www.inkscape.org/namespaces/inkscape" xmlns:xlink="http://www.w3.org/1999/xlink" width="10" height="10">
	<g inkscape:groupmode="layer" inkscape:label="Sky &amp; Sea" id="layer1" style="display:inline;opacity:0.5">
		<rect x="0" y="0" width="10" height="5" fill="#00f"/>
	</g>
	<g id="plain"><use xlink:href="#layer1" xml:space="preserve"/></g>
	<text>a &lt; b</text>
</svg>
"##;

	#[test]
	fn keeps_names_and_prefixes() {
		let document = Document::parse(SOURCE).unwrap();
		let root = document.root();

		assert!(root.is(Some(SVG_NAMESPACE), "svg"));
		assert_eq!(root.name.prefix, None);
		assert_eq!(root.namespaces.len(), 3);
		assert_eq!(document.prologue, vec![Node::Comment(" Created with Inkscape ".to_string())]);

		let (_, layer) = root.child_elements().next().unwrap();
		assert_eq!(layer.attribute(Some(INKSCAPE_NAMESPACE), "label"), Some("Sky & Sea"));
		assert_eq!(layer.attribute(None, "id"), Some("layer1"));

		let label = layer.attributes.iter().find(|attribute| attribute.name.local == "label").unwrap();
		assert_eq!(label.name.prefix.as_deref(), Some("inkscape"));
	}

	#[test]
	fn serialized_text_parses_back_to_the_same_tree() {
		let document = Document::parse(SOURCE).unwrap();
		let text = document.to_xml_string();

		assert!(text.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!-- Created with Inkscape -->\n<svg "));
		assert!(text.contains(r#"inkscape:label="Sky &amp; Sea""#));
		assert!(text.contains(r##"<use xlink:href="#layer1" xml:space="preserve"/>"##));
		assert!(text.contains("<text>a &lt; b</text>"));

		assert_eq!(Document::parse(&text).unwrap(), document);
	}

	#[test]
	fn prefixed_svg_elements_stay_prefixed() {
		let source = r#"<svg:svg xmlns:svg="http://www.w3.org/2000/svg"><svg:g id="a"/></svg:svg>"#;
		let document = Document::parse(source).unwrap();

		let text = document.to_xml_string();
		assert!(text.ends_with(r#"<svg:svg xmlns:svg="http://www.w3.org/2000/svg"><svg:g id="a"/></svg:svg>"#));
		assert!(document.root().child_elements().next().unwrap().1.is(Some(SVG_NAMESPACE), "g"));
	}

	#[test]
	fn attributes_keep_their_prefix_when_the_default_namespace_matches() {
		let source = r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:svg="http://www.w3.org/2000/svg"><g svg:class="a"/></svg>"#;
		let document = Document::parse(source).unwrap();

		let text = document.to_xml_string();
		assert!(text.contains(r#"<g svg:class="a"/>"#));

		let reparsed = Document::parse(&text).unwrap();
		let (_, group) = reparsed.root().child_elements().next().unwrap();
		assert_eq!(group.attribute(Some(SVG_NAMESPACE), "class"), Some("a"));
		assert_eq!(group.attribute(None, "class"), None);
	}

	#[test]
	fn elements_are_visited_in_document_order() {
		let document = Document::parse(SOURCE).unwrap();
		let names = document.elements().map(|(_, element)| element.name.local.clone()).collect::<Vec<_>>();

		assert_eq!(names, ["svg", "g", "rect", "g", "use", "text"]);
	}

	#[test]
	fn paths_address_the_same_element_mutably() {
		let mut document = Document::parse(SOURCE).unwrap();
		let (path, _) = document.elements().find(|(_, element)| element.is(Some(SVG_NAMESPACE), "rect")).unwrap();

		let rect = document.element_mut(&path).unwrap();
		rect.set_attribute("fill", "#f00");
		rect.set_attribute("display", "none");
		assert_eq!(rect.remove_attribute("display").as_deref(), Some("none"));
		assert_eq!(rect.remove_attribute("display"), None);

		let rect = document.element(&path).unwrap();
		assert_eq!(rect.attribute(None, "fill"), Some("#f00"));
		assert_eq!(rect.attributes.len(), 5);
	}

	#[test]
	fn paths_to_non_elements_resolve_to_nothing() {
		let document = Document::parse(SOURCE).unwrap();

		// Index 0 of the root's children is the whitespace before the first layer
		assert!(document.element(&ElementPath::root().child(0)).is_none());
		assert!(document.element(&ElementPath::root().child(99)).is_none());
	}

	#[test]
	fn rejects_malformed_input() {
		assert!(matches!(Document::parse("<svg><g></svg>"), Err(DocumentError::Xml(_))));
		assert!(matches!(Document::from_bytes(&[0x3c, 0xff, 0xfe]), Err(DocumentError::Utf8(_))));
	}
}
