use std::borrow::Cow;

use crate::builder::{Attribute, Namespace, NamespaceDeclaration};

/// A child of an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    Comment(String),
}

impl Node {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Node::Element(element) => Some(element),
            _ => None,
        }
    }
}

/// Represents an owned, mutable XML element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// The local name of the element.
    name: String,
    /// The prefix the element is written with.
    prefix: Option<String>,
    /// The namespace the element belongs to.
    namespace: Option<Namespace>,
    /// `xmlns` declarations written on this element, in order.
    declarations: Vec<NamespaceDeclaration>,
    /// The attributes of the element.
    attributes: Vec<Attribute>,
    /// Child elements, text and comments.
    children: Vec<Node>,
}

impl Element {
    /// Creates a new element with the given local name.
    ///
    /// # Example
    ///
    /// ```
    /// use soapfix_xml::builder::Element;
    /// let element = Element::new("root");
    /// assert_eq!(element.name(), "root");
    /// ```
    pub fn new(name: impl Into<String>) -> Self {
        Element {
            name: name.into(),
            prefix: None,
            namespace: None,
            declarations: Vec::new(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Sets the namespace of the element and returns a modified `Element`.
    ///
    /// # Example
    ///
    /// ```
    /// use soapfix_xml::builder::{Element, Namespace};
    /// let element = Element::new("Body")
    ///     .set_namespace(Namespace::new("http://schemas.xmlsoap.org/soap/envelope/"))
    ///     .with_prefix("SOAP-ENV");
    /// assert_eq!(element.qualified_name(), "SOAP-ENV:Body");
    /// ```
    pub fn set_namespace(mut self, namespace: impl Into<Namespace>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn set_namespace_optional(mut self, namespace: Option<impl Into<Namespace>>) -> Self {
        self.namespace = namespace.map(Into::into);
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn with_prefix_optional(mut self, prefix: Option<impl Into<String>>) -> Self {
        self.prefix = prefix.map(Into::into);
        self
    }

    /// Adds an `xmlns` declaration and returns a modified `Element`.
    pub fn add_namespace_declaration(mut self, url: &str, alias: Option<&str>) -> Self {
        self.declare_namespace(alias, url);
        self
    }

    /// Declares `alias` (or the default namespace) on this element.
    ///
    /// Re-declaring an alias that is already declared here replaces its URI
    /// in place.
    pub fn declare_namespace(&mut self, alias: Option<&str>, url: &str) {
        if let Some(existing) = self
            .declarations
            .iter_mut()
            .find(|decl| decl.alias.as_deref() == alias)
        {
            existing.namespace = Namespace::new(url);
        } else {
            self.declarations.push(NamespaceDeclaration::new(alias, url));
        }
    }

    /// Adds an attribute to the element and returns a modified `Element`.
    pub fn add_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Adds a child element and returns a modified `Element`.
    ///
    /// # Example
    ///
    /// ```
    /// use soapfix_xml::builder::Element;
    /// let element = Element::new("root").add_child(Element::new("child"));
    /// assert_eq!(element.child_elements().count(), 1);
    /// ```
    pub fn add_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    pub fn add_children(mut self, children: Vec<Element>) -> Self {
        self.children
            .extend(children.into_iter().map(Node::Element));
        self
    }

    /// Replaces the content of the element with a single text node.
    pub fn set_text(mut self, text: impl Into<String>) -> Self {
        self.with_text(text);
        self
    }

    /// Replaces the content of the element with a single text node.
    ///
    /// An empty string leaves the element without children.
    pub fn with_text(&mut self, text: impl Into<String>) -> &mut Self {
        let text = text.into();
        self.children.clear();
        if !text.is_empty() {
            self.children.push(Node::Text(text));
        }
        self
    }

    pub fn push_node(&mut self, node: Node) {
        self.children.push(node);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_ref().map(|ns| ns.url.as_str())
    }

    /// `prefix:name`, or the bare name for unprefixed elements.
    pub fn qualified_name(&self) -> Cow<'_, str> {
        match &self.prefix {
            Some(prefix) => Cow::Owned(format!("{prefix}:{}", self.name)),
            None => Cow::Borrowed(&self.name),
        }
    }

    /// True when the element has the given local name and namespace.
    pub fn is(&self, name: &str, namespace: Option<&str>) -> bool {
        self.name == name && self.namespace() == namespace
    }

    pub fn namespace_declarations(&self) -> &[NamespaceDeclaration] {
        &self.declarations
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut Vec<Attribute> {
        &mut self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.namespace().is_none() && attr.name() == name)
            .map(Attribute::value)
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut Vec<Node> {
        &mut self.children
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    pub fn find_child(&self, name: &str, namespace: Option<&str>) -> Option<&Element> {
        self.child_elements().find(|child| child.is(name, namespace))
    }

    pub fn find_child_mut(&mut self, name: &str, namespace: Option<&str>) -> Option<&mut Element> {
        self.children
            .iter_mut()
            .filter_map(Node::as_element_mut)
            .find(|child| child.is(name, namespace))
    }

    /// Concatenation of every descendant text node, in document order.
    pub fn text(&self) -> String {
        let mut text = String::new();
        self.collect_text(&mut text);
        text
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                Node::Text(value) => out.push_str(value),
                Node::Element(element) => element.collect_text(out),
                Node::Comment(_) => {}
            }
        }
    }
}
