//! roxmltree-backed parsing into the owned [`Element`] tree.
use roxmltree::NodeType;
pub use roxmltree::Error;

use crate::XmlError;
use crate::builder::{Attribute, Element, Node, escape_attribute};

const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";
const FRAGMENT_WRAPPER: &str = "soapfix-fragment";

/// Parses a complete document and returns its root element.
pub fn parse(xml: &str) -> Result<Element, XmlError> {
    let document = roxmltree::Document::parse(xml)?;
    Element::try_from(document.root_element())
}

/// Parses a sequence of sibling elements that may use the given
/// `(prefix, uri)` bindings without declaring them.
///
/// Text and comments between the top-level elements are dropped.
pub fn parse_fragment<'b>(
    xml: &str,
    bindings: impl IntoIterator<Item = (&'b str, &'b str)>,
) -> Result<Vec<Element>, XmlError> {
    let mut wrapped = format!("<{FRAGMENT_WRAPPER}");
    for (prefix, uri) in bindings {
        if prefix.is_empty() {
            wrapped.push_str(&format!(" xmlns=\"{}\"", escape_attribute(uri)));
        } else {
            wrapped.push_str(&format!(" xmlns:{prefix}=\"{}\"", escape_attribute(uri)));
        }
    }
    wrapped.push('>');
    wrapped.push_str(xml);
    wrapped.push_str(&format!("</{FRAGMENT_WRAPPER}>"));

    let document = roxmltree::Document::parse(&wrapped)?;
    document
        .root_element()
        .children()
        .filter(roxmltree::Node::is_element)
        .map(Element::try_from)
        .collect()
}

impl<'a, 'input: 'a> TryFrom<roxmltree::Node<'a, 'input>> for Element {
    type Error = XmlError;

    fn try_from(node: roxmltree::Node<'a, 'input>) -> Result<Self, Self::Error> {
        if !node.is_element() {
            return Err(XmlError::InvalidNodeType {
                expected: NodeType::Element,
                found: node.node_type(),
            });
        }

        let tag_name = node.tag_name();
        let namespace = tag_name.namespace();
        let prefix = namespace.and_then(|uri| element_prefix(node, uri));

        let mut element = Element::new(tag_name.name())
            .set_namespace_optional(namespace)
            .with_prefix_optional(prefix);

        for (alias, uri) in declared_here(node) {
            element.declare_namespace(alias, uri);
        }

        for attribute in node.attributes() {
            let parsed = match attribute.namespace() {
                Some(uri) => {
                    let prefix = attribute_prefix(node, uri).unwrap_or_default();
                    Attribute::new_with_namespace(attribute.name(), attribute.value(), Some(uri))
                        .with_prefix(prefix)
                }
                None => Attribute::new(attribute.name(), attribute.value()),
            };
            element = element.add_attribute(parsed);
        }

        let has_element_children = node.children().any(|child| child.is_element());
        for child in node.children() {
            match child.node_type() {
                NodeType::Element => element.push_node(Node::Element(Element::try_from(child)?)),
                NodeType::Text => {
                    let text = child.text().unwrap_or_default();
                    // Indentation between elements is not content.
                    if has_element_children && text.trim().is_empty() {
                        continue;
                    }
                    element.push_node(Node::Text(text.to_owned()));
                }
                NodeType::Comment => {
                    element.push_node(Node::Comment(child.text().unwrap_or_default().to_owned()));
                }
                NodeType::Root | NodeType::PI => {}
            }
        }

        Ok(element)
    }
}

/// Namespaces in scope on `node` that its parent element does not already
/// have with the same binding.
fn declared_here<'a, 'input>(
    node: roxmltree::Node<'a, 'input>,
) -> Vec<(Option<&'a str>, &'a str)> {
    let inherited: Vec<(Option<&str>, &str)> = node
        .parent_element()
        .map(|parent| parent.namespaces().map(|ns| (ns.name(), ns.uri())).collect())
        .unwrap_or_default();

    node.namespaces()
        .map(|ns| (ns.name(), ns.uri()))
        .filter(|(alias, uri)| *alias != Some("xml") && *uri != XML_NAMESPACE)
        .filter(|binding| !inherited.contains(binding))
        .collect()
}

fn element_prefix(node: roxmltree::Node<'_, '_>, uri: &str) -> Option<String> {
    if uri == XML_NAMESPACE {
        return Some("xml".to_owned());
    }
    node.namespaces()
        .find(|ns| ns.uri() == uri)
        .and_then(|ns| ns.name())
        .map(str::to_owned)
}

fn attribute_prefix(node: roxmltree::Node<'_, '_>, uri: &str) -> Option<String> {
    if uri == XML_NAMESPACE {
        return Some("xml".to_owned());
    }
    node.namespaces()
        .find_map(|ns| ns.name().filter(|_| ns.uri() == uri))
        .map(str::to_owned)
}
