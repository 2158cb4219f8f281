//! XPath reads and writes with prefixes resolved through the registry.
use soapfix_xml::builder::Element;
use soapfix_xml::xpath::{Value, XPath, XPathError, assign, string_value};

use crate::NamespaceRegistry;

/// Evaluates namespace-aware XPath against an element.
///
/// The registry is borrowed, not copied, so every call sees the bindings as
/// they are at that moment.
#[derive(Debug, Clone, Copy)]
pub struct XPathAccessor<'r> {
    registry: &'r NamespaceRegistry,
}

impl<'r> XPathAccessor<'r> {
    pub fn new(registry: &'r NamespaceRegistry) -> Self {
        XPathAccessor { registry }
    }

    /// String value of the first node `path` selects below `element`.
    ///
    /// `None` means the expression selected no node. Expressions that do not
    /// produce a node-set return their string value.
    pub fn read(&self, path: &str, element: &Element) -> Result<Option<String>, XPathError> {
        let xpath = XPath::compile(path)?;
        let value = match xpath.evaluate(element, self.registry)? {
            Value::NodeSet(nodes) => nodes.first().map(|id| string_value(element, id)),
            other => Some(other.to_xpath_string(element)),
        };
        tracing::debug!(path, ?value, "read XPath value");
        Ok(value)
    }

    /// Assigns `value` to the first node `path` selects below `element`.
    pub fn write(&self, path: &str, value: &str, element: &mut Element) -> Result<(), XPathError> {
        let xpath = XPath::compile(path)?;
        let nodes = xpath.select(element, self.registry)?;
        let Some(target) = nodes.first() else {
            return Err(XPathError::NoMatch);
        };
        if nodes.len() > 1 {
            tracing::debug!(
                path,
                matches = nodes.len(),
                "XPath selected several nodes, assigning the first"
            );
        }
        assign(element, target, value)?;
        tracing::debug!(path, value, "wrote XPath value");
        Ok(())
    }
}
