use soapfix_xml::builder::{Builder, Element};

use crate::SoapError;

/// Renders element subtrees as indented XML without a declaration.
#[derive(Debug, Clone)]
pub struct PrettyPrinter {
    indent: String,
}

impl Default for PrettyPrinter {
    fn default() -> Self {
        PrettyPrinter::new("  ")
    }
}

impl PrettyPrinter {
    pub fn new(indent: impl Into<String>) -> Self {
        PrettyPrinter {
            indent: indent.into(),
        }
    }

    pub fn render(&self, element: &Element) -> Result<String, SoapError> {
        Ok(Builder::new(None, element)
            .with_indent(&self.indent)
            .to_xml_string()?)
    }

    /// Renders each child element of `parent`, joined by newlines.
    pub fn render_children(&self, parent: &Element) -> Result<String, SoapError> {
        let rendered = parent
            .child_elements()
            .map(|child| self.render(child))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rendered.join("\n"))
    }
}
