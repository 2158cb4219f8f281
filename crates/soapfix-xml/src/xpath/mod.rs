//! A read/write XPath 1.0 subset over the owned [`Element`] tree.
//!
//! Expressions are compiled once with [`XPath::compile`] and evaluated with
//! a [`NamespaceResolver`] that supplies the prefix bindings. Every prefix
//! the expression uses is resolved before evaluation starts; an unbound
//! prefix fails the evaluation instead of silently matching nothing.
//!
//! ```
//! use std::collections::HashMap;
//! use soapfix_xml::parser::parse;
//! use soapfix_xml::xpath::XPath;
//!
//! let body = parse(r#"<b:Body xmlns:b="urn:b"><b:Id>42</b:Id></b:Body>"#).unwrap();
//! let bindings = HashMap::from([("ns".to_owned(), "urn:b".to_owned())]);
//! let value = XPath::compile("/ns:Body/ns:Id").unwrap().evaluate(&body, &bindings).unwrap();
//! assert_eq!(value.to_xpath_string(&body), "42");
//! ```
pub mod ast;
mod eval;
mod functions;
mod lexer;
mod node;
mod parser;

use std::collections::HashMap;

pub use self::node::{Hop, NodeId, NodeRef, assign, resolve, string_value};

use crate::builder::Element;
use crate::xpath::ast::Expr;
use crate::xpath::eval::{Context, Evaluator};

const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum XPathError {
    #[error("XPath syntax error at position {position}: {message}")]
    Syntax { position: usize, message: String },

    #[error("namespace prefix '{0}' is not bound")]
    UnboundPrefix(String),

    #[error("unknown XPath function '{0}'")]
    UnknownFunction(String),

    #[error("wrong number of arguments ({found}) for function '{function}'")]
    ArgumentCount { function: String, found: usize },

    #[error("expression does not evaluate to a node-set")]
    NotANodeSet,

    #[error("expression did not select any node")]
    NoMatch,

    #[error("the document root cannot be assigned a value")]
    ReadOnlyNode,
}

impl XPathError {
    pub(crate) fn syntax(position: usize, message: impl Into<String>) -> Self {
        XPathError::Syntax {
            position,
            message: message.into(),
        }
    }
}

/// Supplies the URI bound to a namespace prefix.
pub trait NamespaceResolver {
    fn resolve_prefix(&self, prefix: &str) -> Option<String>;
}

impl<T: NamespaceResolver + ?Sized> NamespaceResolver for &T {
    fn resolve_prefix(&self, prefix: &str) -> Option<String> {
        (**self).resolve_prefix(prefix)
    }
}

impl NamespaceResolver for HashMap<String, String> {
    fn resolve_prefix(&self, prefix: &str) -> Option<String> {
        self.get(prefix).cloned()
    }
}

/// The result of evaluating an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Nodes in document order, without duplicates.
    NodeSet(Vec<NodeId>),
    String(String),
    Number(f64),
    Boolean(bool),
}

impl Value {
    /// XPath `string()` conversion.
    pub fn to_xpath_string(&self, root: &Element) -> String {
        match self {
            Value::NodeSet(nodes) => nodes
                .first()
                .map(|id| string_value(root, id))
                .unwrap_or_default(),
            _ => self.atom_string(),
        }
    }

    /// XPath `number()` conversion.
    pub fn to_number(&self, root: &Element) -> f64 {
        match self {
            Value::NodeSet(_) => parse_number(&self.to_xpath_string(root)),
            _ => self.atom_number(),
        }
    }

    /// XPath `boolean()` conversion.
    pub fn to_boolean(&self) -> bool {
        match self {
            Value::NodeSet(nodes) => !nodes.is_empty(),
            Value::String(value) => !value.is_empty(),
            Value::Number(value) => *value != 0.0 && !value.is_nan(),
            Value::Boolean(value) => *value,
        }
    }

    pub(crate) fn atom_string(&self) -> String {
        match self {
            Value::NodeSet(_) => String::new(),
            Value::String(value) => value.clone(),
            Value::Number(value) => format_number(*value),
            Value::Boolean(value) => value.to_string(),
        }
    }

    pub(crate) fn atom_number(&self) -> f64 {
        match self {
            Value::NodeSet(_) => f64::NAN,
            Value::String(value) => parse_number(value),
            Value::Number(value) => *value,
            Value::Boolean(value) => f64::from(u8::from(*value)),
        }
    }
}

/// A compiled expression.
#[derive(Debug, Clone, PartialEq)]
pub struct XPath {
    source: String,
    expr: Expr,
}

impl XPath {
    pub fn compile(source: &str) -> Result<Self, XPathError> {
        let expr = parser::parse(source)?;
        Ok(XPath {
            source: source.to_owned(),
            expr,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Distinct namespace prefixes the expression refers to.
    pub fn prefixes(&self) -> Vec<&str> {
        let mut prefixes = Vec::new();
        self.expr.collect_prefixes(&mut prefixes);
        let mut seen = Vec::with_capacity(prefixes.len());
        for prefix in prefixes {
            if !seen.contains(&prefix) {
                seen.push(prefix);
            }
        }
        seen
    }

    /// Evaluates the expression with `root` as the context node.
    pub fn evaluate(
        &self,
        root: &Element,
        resolver: &impl NamespaceResolver,
    ) -> Result<Value, XPathError> {
        let namespaces = self.bind_prefixes(resolver)?;
        let evaluator = Evaluator {
            root,
            namespaces: &namespaces,
        };
        let value = evaluator.eval(&self.expr, &Context::start())?;
        tracing::trace!(xpath = %self.source, ?value, "evaluated XPath expression");
        Ok(value)
    }

    /// Evaluates the expression and requires a node-set.
    pub fn select(
        &self,
        root: &Element,
        resolver: &impl NamespaceResolver,
    ) -> Result<Vec<NodeId>, XPathError> {
        match self.evaluate(root, resolver)? {
            Value::NodeSet(nodes) => Ok(nodes),
            _ => Err(XPathError::NotANodeSet),
        }
    }

    fn bind_prefixes(
        &self,
        resolver: &impl NamespaceResolver,
    ) -> Result<HashMap<String, String>, XPathError> {
        let mut namespaces = HashMap::new();
        for prefix in self.prefixes() {
            let uri = match resolver.resolve_prefix(prefix) {
                Some(uri) => uri,
                None if prefix == "xml" => XML_NAMESPACE.to_owned(),
                None => return Err(XPathError::UnboundPrefix(prefix.to_owned())),
            };
            namespaces.insert(prefix.to_owned(), uri);
        }
        Ok(namespaces)
    }
}

fn format_number(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_owned()
    } else if value.is_infinite() {
        if value > 0.0 { "Infinity" } else { "-Infinity" }.to_owned()
    } else if value.fract() == 0.0 && value.abs() < 1e15 {
        #[allow(clippy::cast_possible_truncation)]
        let integer = value as i64;
        integer.to_string()
    } else {
        value.to_string()
    }
}

/// XPath `Number` production: optional minus, digits with at most one dot.
fn parse_number(text: &str) -> f64 {
    let trimmed = text.trim();
    let digits = trimmed.strip_prefix('-').unwrap_or(trimmed);
    let valid = digits.chars().any(|c| c.is_ascii_digit())
        && digits.chars().all(|c| c.is_ascii_digit() || c == '.')
        && digits.matches('.').count() <= 1;
    if valid {
        trimmed.parse().unwrap_or(f64::NAN)
    } else {
        f64::NAN
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    const BODY: &str = r#"<SOAP-ENV:Body xmlns:SOAP-ENV="http://schemas.xmlsoap.org/soap/envelope/" xmlns:m="urn:orders">
  <m:Order m:status="open" priority="2">
    <m:Id>42</m:Id>
    <m:Line qty="3">widget</m:Line>
    <m:Line qty="4">gadget</m:Line>
    <!-- audit -->
  </m:Order>
</SOAP-ENV:Body>"#;

    fn bindings() -> HashMap<String, String> {
        HashMap::from([
            ("env".to_owned(), "http://schemas.xmlsoap.org/soap/envelope/".to_owned()),
            ("o".to_owned(), "urn:orders".to_owned()),
        ])
    }

    fn eval_string(expression: &str) -> String {
        let body = parse(BODY).unwrap();
        XPath::compile(expression)
            .unwrap()
            .evaluate(&body, &bindings())
            .unwrap()
            .to_xpath_string(&body)
    }

    #[test]
    fn test_absolute_path_starts_at_context_element() {
        assert_eq!(eval_string("/env:Body/o:Order/o:Id"), "42");
        assert_eq!(eval_string("o:Order/o:Id"), "42");
        assert_eq!(eval_string("//o:Line[2]"), "gadget");
    }

    #[test]
    fn test_binding_uses_uri_not_document_prefix() {
        // The document says `m`, the expression says `o`.
        assert_eq!(eval_string("//o:Order/@o:status"), "open");

        // A bound prefix with another URI selects nothing.
        let body = parse(BODY).unwrap();
        let mut namespaces = bindings();
        namespaces.insert("m".to_owned(), "urn:invoices".to_owned());
        let value = XPath::compile("//m:Order").unwrap().evaluate(&body, &namespaces).unwrap();
        assert_eq!(value.to_xpath_string(&body), "");
    }

    #[test]
    fn test_unbound_prefix_is_an_error() {
        let body = parse(BODY).unwrap();
        let result = XPath::compile("//m:Order").unwrap().evaluate(&body, &bindings());
        assert_eq!(result, Err(XPathError::UnboundPrefix("m".to_owned())));
    }

    #[test]
    fn test_predicates_and_functions() {
        assert_eq!(eval_string("//o:Line[@qty > 3]"), "gadget");
        assert_eq!(eval_string("count(//o:Line)"), "2");
        assert_eq!(eval_string("sum(//o:Line/@qty)"), "7");
        assert_eq!(eval_string("//o:Line[last()]"), "gadget");
        assert_eq!(eval_string("concat(//o:Id, '-', //o:Line[1])"), "42-widget");
        assert_eq!(eval_string("local-name(//o:Order/*[2])"), "Line");
        assert_eq!(eval_string("name(//o:Order)"), "m:Order");
        assert_eq!(eval_string("namespace-uri(//o:Id)"), "urn:orders");
        assert_eq!(eval_string("substring('12345', 2, 3)"), "234");
        assert_eq!(eval_string("substring-after('a=b', '=')"), "b");
        assert_eq!(eval_string("normalize-space('  a   b ')"), "a b");
        assert_eq!(eval_string("string-length(//o:Line[1])"), "6");
        assert_eq!(eval_string("translate('abc', 'ab', 'A')"), "Ac");
        assert_eq!(eval_string("//o:Order/comment()"), " audit ");
    }

    #[test]
    fn test_axes() {
        assert_eq!(eval_string("//o:Line[1]/following-sibling::o:Line"), "gadget");
        assert_eq!(eval_string("//o:Line[2]/preceding-sibling::*[1]"), "widget");
        assert_eq!(eval_string("local-name(//o:Id/..)"), "Order");
        assert_eq!(eval_string("local-name(//o:Id/ancestor::*[last()])"), "Body");
        assert_eq!(eval_string("//o:Order/@priority"), "2");
    }

    #[test]
    fn test_non_node_set_results() {
        let body = parse(BODY).unwrap();
        let value = |expression: &str| {
            XPath::compile(expression)
                .unwrap()
                .evaluate(&body, &bindings())
                .unwrap()
        };

        assert_eq!(value("1 + 2 * 3"), Value::Number(7.0));
        assert_eq!(value("//o:Id = 42"), Value::Boolean(true));
        assert_eq!(value("//o:Line = 'gadget'"), Value::Boolean(true));
        assert_eq!(value("//o:Line != 'gadget'"), Value::Boolean(true));
        assert_eq!(value("not(//o:Missing)"), Value::Boolean(true));
        assert_eq!(value("7 mod 3").to_xpath_string(&body), "1");
        assert_eq!(value("1 div 0").to_xpath_string(&body), "Infinity");
        assert_eq!(value("number('x')").to_xpath_string(&body), "NaN");
        assert_eq!(value("2.5 * 1").to_xpath_string(&body), "2.5");
    }

    #[test]
    fn test_select_requires_node_set() {
        let body = parse(BODY).unwrap();
        let xpath = XPath::compile("count(//o:Line)").unwrap();
        assert_eq!(xpath.select(&body, &bindings()), Err(XPathError::NotANodeSet));
    }

    #[test]
    fn test_union_is_in_document_order() {
        let body = parse(BODY).unwrap();
        let nodes = XPath::compile("//o:Line | //o:Id")
            .unwrap()
            .select(&body, &bindings())
            .unwrap();
        let texts: Vec<String> = nodes.iter().map(|id| string_value(&body, id)).collect();
        assert_eq!(texts, vec!["42", "widget", "gadget"]);
    }

    #[test]
    fn test_assign_through_selected_nodes() {
        let mut body = parse(BODY).unwrap();
        let resolver = bindings();

        let id = XPath::compile("//o:Id").unwrap().select(&body, &resolver).unwrap()[0].clone();
        assign(&mut body, &id, "43").unwrap();
        let qty = XPath::compile("//o:Line[2]/@qty").unwrap().select(&body, &resolver).unwrap()[0].clone();
        assign(&mut body, &qty, "9").unwrap();

        let read = |expression: &str| {
            XPath::compile(expression)
                .unwrap()
                .evaluate(&body, &resolver)
                .unwrap()
                .to_xpath_string(&body)
        };
        assert_eq!(read("//o:Id"), "43");
        assert_eq!(read("//o:Line[2]/@qty"), "9");
    }

    #[test]
    fn test_unknown_function_and_arity() {
        let body = parse(BODY).unwrap();
        assert_eq!(
            XPath::compile("frobnicate()").unwrap().evaluate(&body, &bindings()),
            Err(XPathError::UnknownFunction("frobnicate".to_owned()))
        );
        assert!(matches!(
            XPath::compile("count()").unwrap().evaluate(&body, &bindings()),
            Err(XPathError::ArgumentCount { .. })
        ));
    }

    #[test]
    fn test_prefixes_are_distinct() {
        let xpath = XPath::compile("/a:x/b:y[a:z]/c:*").unwrap();
        assert_eq!(xpath.prefixes(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_number_formatting() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(0.25), "0.25");
        assert!(parse_number(" 12.5 ").eq(&12.5));
        assert!(parse_number("1e3").is_nan());
        assert!(parse_number("+1").is_nan());
    }
}
