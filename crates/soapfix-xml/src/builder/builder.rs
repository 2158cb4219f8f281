use std::io::Write;

use crate::builder::{Declaration, Element, Node, XmlBuilderError, escape_attribute, escape_text};

const XML_PREFIX: &str = "xml";

type Binding = (Option<String>, String);

/// Serializes an element tree, optionally with an XML declaration and
/// indentation.
///
/// Namespace declarations required by the tree but not declared inside it are
/// written on the element that first needs them, so a subtree detached from
/// its document still renders as well-formed, namespace-correct XML.
pub struct Builder<'a> {
    /// The XML declaration.
    declaration: Option<Declaration<'a>>,
    /// The root element of the XML document.
    element: &'a Element,
    /// Indentation unit; `None` writes everything on one line.
    indent: Option<&'a str>,
}

impl<'a> Builder<'a> {
    /// Creates a compact writer for `element`.
    ///
    /// # Example
    ///
    /// ```
    /// use soapfix_xml::builder::{Builder, Declaration, Element};
    /// let element = Element::new("root").set_text("content");
    /// let builder = Builder::new(Some(Declaration::new("1.0", "UTF-8")), &element);
    /// assert_eq!(
    ///     builder.to_xml_string().unwrap(),
    ///     r#"<?xml version="1.0" encoding="UTF-8"?><root>content</root>"#
    /// );
    /// ```
    pub fn new(declaration: Option<Declaration<'a>>, element: &'a Element) -> Self {
        Builder {
            declaration,
            element,
            indent: None,
        }
    }

    /// Pretty prints element-only content using `indent` per nesting level.
    pub fn with_indent(mut self, indent: &'a str) -> Self {
        self.indent = Some(indent);
        self
    }

    pub fn write_to<W: Write>(&self, mut w: W) -> Result<(), XmlBuilderError> {
        if let Some(decl) = &self.declaration {
            decl.write(&mut w)?;
            if self.indent.is_some() {
                w.write_all(b"\n")?;
            }
        }
        let mut scope = Vec::new();
        self.write_element(&mut w, self.element, 0, &mut scope)
    }

    pub fn to_xml_string(&self) -> Result<String, XmlBuilderError> {
        let mut buf = Vec::new();
        self.write_to(&mut buf)?;
        Ok(String::from_utf8(buf)?)
    }

    fn write_element<W: Write>(
        &self,
        w: &mut W,
        element: &Element,
        depth: usize,
        scope: &mut Vec<Binding>,
    ) -> Result<(), XmlBuilderError> {
        let mark = scope.len();

        let mut declarations: Vec<Binding> = element
            .namespace_declarations()
            .iter()
            .map(|decl| (decl.alias.clone(), decl.namespace.url.clone()))
            .collect();
        scope.extend(declarations.iter().cloned());

        match element.namespace() {
            Some(url) => {
                if lookup(scope, element.prefix()) != Some(url) {
                    bind(scope, &mut declarations, element.prefix(), url);
                }
            }
            None => {
                if element.prefix().is_none() && lookup(scope, None).is_some_and(|url| !url.is_empty()) {
                    bind(scope, &mut declarations, None, "");
                }
            }
        }

        let mut attributes = Vec::with_capacity(element.attributes().len());
        for attribute in element.attributes() {
            let name = match (attribute.namespace(), attribute.prefix()) {
                (None, _) => attribute.name().to_owned(),
                (Some(_), Some(XML_PREFIX)) => attribute.qualified_name(),
                (Some(url), prefix) => {
                    let alias = match prefix {
                        Some(prefix) if lookup(scope, Some(prefix)) == Some(url) => prefix.to_owned(),
                        Some(prefix) if lookup(scope, Some(prefix)).is_none() => {
                            bind(scope, &mut declarations, Some(prefix), url);
                            prefix.to_owned()
                        }
                        _ => match alias_for(scope, url) {
                            Some(alias) => alias,
                            None => {
                                let alias = fresh_alias(scope);
                                bind(scope, &mut declarations, Some(alias.as_str()), url);
                                alias
                            }
                        },
                    };
                    format!("{alias}:{}", attribute.name())
                }
            };
            attributes.push((name, attribute.value()));
        }

        let name = element.qualified_name();
        write!(w, "<{name}")?;
        for (alias, url) in &declarations {
            match alias {
                Some(alias) => write!(w, " xmlns:{alias}=\"{}\"", escape_attribute(url))?,
                None => write!(w, " xmlns=\"{}\"", escape_attribute(url))?,
            }
        }
        for (name, value) in &attributes {
            write!(w, " {name}=\"{}\"", escape_attribute(value))?;
        }

        let children = element.children();
        if children.is_empty() {
            w.write_all(b"/>")?;
        } else {
            w.write_all(b">")?;
            match self.indent {
                Some(indent) if is_element_only(children) => {
                    for child in children {
                        if matches!(child, Node::Text(_)) {
                            continue;
                        }
                        w.write_all(b"\n")?;
                        write_indent(w, indent, depth + 1)?;
                        self.write_node(w, child, depth + 1, scope)?;
                    }
                    w.write_all(b"\n")?;
                    write_indent(w, indent, depth)?;
                }
                _ => {
                    for child in children {
                        self.write_node(w, child, depth + 1, scope)?;
                    }
                }
            }
            write!(w, "</{name}>")?;
        }

        scope.truncate(mark);
        Ok(())
    }

    fn write_node<W: Write>(
        &self,
        w: &mut W,
        node: &Node,
        depth: usize,
        scope: &mut Vec<Binding>,
    ) -> Result<(), XmlBuilderError> {
        match node {
            Node::Element(element) => self.write_element(w, element, depth, scope),
            Node::Text(text) => Ok(w.write_all(escape_text(text).as_bytes())?),
            Node::Comment(comment) => Ok(write!(w, "<!--{comment}-->")?),
        }
    }
}

/// Element children only, apart from whitespace used for indentation.
fn is_element_only(children: &[Node]) -> bool {
    children.iter().any(|child| matches!(child, Node::Element(_)))
        && children
            .iter()
            .all(|child| !matches!(child, Node::Text(text) if !text.trim().is_empty()))
}

fn write_indent<W: Write>(w: &mut W, indent: &str, depth: usize) -> std::io::Result<()> {
    for _ in 0..depth {
        w.write_all(indent.as_bytes())?;
    }
    Ok(())
}

fn lookup<'s>(scope: &'s [Binding], alias: Option<&str>) -> Option<&'s str> {
    if alias == Some(XML_PREFIX) {
        return Some("http://www.w3.org/XML/1998/namespace");
    }
    scope
        .iter()
        .rev()
        .find(|(bound, _)| bound.as_deref() == alias)
        .map(|(_, url)| url.as_str())
}

fn alias_for(scope: &[Binding], url: &str) -> Option<String> {
    scope
        .iter()
        .rev()
        .filter_map(|(alias, bound)| alias.as_deref().filter(|_| bound == url))
        .find(|alias| lookup(scope, Some(*alias)) == Some(url))
        .map(str::to_owned)
}

fn fresh_alias(scope: &[Binding]) -> String {
    (0..)
        .map(|n| format!("ns{n}"))
        .find(|alias| lookup(scope, Some(alias.as_str())).is_none())
        .unwrap_or_default()
}

fn bind(scope: &mut Vec<Binding>, declarations: &mut Vec<Binding>, alias: Option<&str>, url: &str) {
    let binding = (alias.map(str::to_owned), url.to_owned());
    scope.push(binding.clone());
    declarations.push(binding);
}
