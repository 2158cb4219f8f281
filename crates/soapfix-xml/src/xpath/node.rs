//! Addressing of nodes inside an owned [`Element`] tree.
//!
//! The tree is evaluated as the only child of a virtual document root, so
//! an absolute path such as `/ns:Body/ns:Field` starts at the element the
//! expression was evaluated against.
use crate::builder::{Attribute, Element, Node};
use crate::xpath::XPathError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Hop {
    Attribute(usize),
    Child(usize),
}

/// Position of a node as the hops taken from the virtual root.
///
/// The derived ordering is document order: a node sorts before its
/// descendants, attributes sort before children.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct NodeId(Vec<Hop>);

impl NodeId {
    pub fn root() -> Self {
        NodeId(Vec::new())
    }

    /// The element the expression is evaluated against.
    pub fn context() -> Self {
        NodeId(vec![Hop::Child(0)])
    }

    pub fn hops(&self) -> &[Hop] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn parent(&self) -> Option<NodeId> {
        let (_, rest) = self.0.split_last()?;
        Some(NodeId(rest.to_vec()))
    }

    pub(crate) fn last_hop(&self) -> Option<Hop> {
        self.0.last().copied()
    }

    pub(crate) fn push(&self, hop: Hop) -> NodeId {
        let mut hops = self.0.clone();
        hops.push(hop);
        NodeId(hops)
    }
}

#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Root(&'a Element),
    Element(&'a Element),
    Attribute(&'a Attribute),
    Text(&'a str),
    Comment(&'a str),
}

impl<'a> NodeRef<'a> {
    pub fn as_element(self) -> Option<&'a Element> {
        match self {
            NodeRef::Element(element) => Some(element),
            _ => None,
        }
    }

    /// XPath string-value of the node.
    pub fn string_value(self) -> String {
        match self {
            NodeRef::Root(element) | NodeRef::Element(element) => element.text(),
            NodeRef::Attribute(attribute) => attribute.value().to_owned(),
            NodeRef::Text(text) | NodeRef::Comment(text) => text.to_owned(),
        }
    }

    pub fn local_name(self) -> &'a str {
        match self {
            NodeRef::Element(element) => element.name(),
            NodeRef::Attribute(attribute) => attribute.name(),
            _ => "",
        }
    }

    pub fn namespace_uri(self) -> &'a str {
        match self {
            NodeRef::Element(element) => element.namespace().unwrap_or_default(),
            NodeRef::Attribute(attribute) => attribute.namespace().unwrap_or_default(),
            _ => "",
        }
    }

    pub fn qualified_name(self) -> String {
        match self {
            NodeRef::Element(element) => element.qualified_name().into_owned(),
            NodeRef::Attribute(attribute) => attribute.qualified_name(),
            _ => String::new(),
        }
    }
}

pub fn resolve<'a>(root: &'a Element, id: &NodeId) -> Option<NodeRef<'a>> {
    let Some((first, rest)) = id.hops().split_first() else {
        return Some(NodeRef::Root(root));
    };
    if *first != Hop::Child(0) {
        return None;
    }

    let mut current = NodeRef::Element(root);
    for hop in rest {
        let element = current.as_element()?;
        current = match *hop {
            Hop::Attribute(index) => NodeRef::Attribute(element.attributes().get(index)?),
            Hop::Child(index) => match element.children().get(index)? {
                Node::Element(child) => NodeRef::Element(child),
                Node::Text(text) => NodeRef::Text(text),
                Node::Comment(comment) => NodeRef::Comment(comment),
            },
        };
    }
    Some(current)
}

/// String-value of the addressed node, empty when it no longer exists.
pub fn string_value(root: &Element, id: &NodeId) -> String {
    resolve(root, id).map(NodeRef::string_value).unwrap_or_default()
}

/// Replaces the value of the addressed node.
///
/// Elements get their content replaced by a single text node, attributes,
/// text and comments get their value replaced. The virtual root cannot be
/// assigned.
pub fn assign(root: &mut Element, id: &NodeId, value: &str) -> Result<(), XPathError> {
    let Some((first, rest)) = id.hops().split_first() else {
        return Err(XPathError::ReadOnlyNode);
    };
    if *first != Hop::Child(0) {
        return Err(XPathError::NoMatch);
    }

    let mut element = root;
    let mut hops = rest.iter().peekable();
    while let Some(hop) = hops.next() {
        let last = hops.peek().is_none();
        match *hop {
            Hop::Attribute(index) if last => {
                let attribute = element
                    .attributes_mut()
                    .get_mut(index)
                    .ok_or(XPathError::NoMatch)?;
                attribute.set_value(value);
                return Ok(());
            }
            Hop::Attribute(_) => return Err(XPathError::NoMatch),
            Hop::Child(index) => {
                let child = element
                    .children_mut()
                    .get_mut(index)
                    .ok_or(XPathError::NoMatch)?;
                match child {
                    Node::Element(inner) => element = inner,
                    Node::Text(text) | Node::Comment(text) if last => {
                        value.clone_into(text);
                        return Ok(());
                    }
                    Node::Text(_) | Node::Comment(_) => return Err(XPathError::NoMatch),
                }
            }
        }
    }

    element.with_text(value);
    Ok(())
}

/// Children of `id` in document order, attributes excluded.
pub(crate) fn children(root: &Element, id: &NodeId) -> Vec<NodeId> {
    match resolve(root, id) {
        Some(NodeRef::Root(_)) => vec![NodeId::context()],
        Some(NodeRef::Element(element)) => (0..element.children().len())
            .map(|index| id.push(Hop::Child(index)))
            .collect(),
        _ => Vec::new(),
    }
}

pub(crate) fn attributes(root: &Element, id: &NodeId) -> Vec<NodeId> {
    match resolve(root, id) {
        Some(NodeRef::Element(element)) => (0..element.attributes().len())
            .map(|index| id.push(Hop::Attribute(index)))
            .collect(),
        _ => Vec::new(),
    }
}

pub(crate) fn descendants(root: &Element, id: &NodeId, out: &mut Vec<NodeId>) {
    for child in children(root, id) {
        out.push(child.clone());
        descendants(root, &child, out);
    }
}

/// Ancestors from the parent outwards.
pub(crate) fn ancestors(id: &NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut current = id.parent();
    while let Some(node) = current {
        current = node.parent();
        out.push(node);
    }
    out
}

/// Siblings after `id` in document order, or before it nearest first.
pub(crate) fn siblings(root: &Element, id: &NodeId, following: bool) -> Vec<NodeId> {
    let (Some(Hop::Child(index)), Some(parent)) = (id.last_hop(), id.parent()) else {
        return Vec::new();
    };
    let all = children(root, &parent);
    if following {
        all.into_iter().skip(index + 1).collect()
    } else {
        all.into_iter().take(index).rev().collect()
    }
}
