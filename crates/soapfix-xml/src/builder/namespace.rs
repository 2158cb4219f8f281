use core::fmt;

/// A namespace URI attached to an element or attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    pub url: String,
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.url.fmt(f)
    }
}

impl Namespace {
    /// Creates a new namespace for the given URI.
    ///
    /// # Example
    ///
    /// ```
    /// use soapfix_xml::builder::Namespace;
    /// let namespace = Namespace::new("http://example.com");
    /// assert_eq!(namespace.url, "http://example.com");
    /// ```
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl From<&str> for Namespace {
    fn from(url: &str) -> Self {
        Self::new(url)
    }
}

impl From<String> for Namespace {
    fn from(url: String) -> Self {
        Self { url }
    }
}

/// An `xmlns` / `xmlns:alias` declaration written on an element.
///
/// `alias == None` declares the default namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceDeclaration {
    pub alias: Option<String>,
    pub namespace: Namespace,
}

impl NamespaceDeclaration {
    pub fn new(alias: Option<&str>, url: impl Into<Namespace>) -> Self {
        Self {
            alias: alias.map(str::to_owned),
            namespace: url.into(),
        }
    }

    /// Checks that `xmlns:alias="url"` (or `xmlns="url"`) is a legal
    /// declaration.
    ///
    /// ```
    /// use soapfix_xml::builder::{DeclarationError, NamespaceDeclaration};
    /// assert!(NamespaceDeclaration::check(Some("m"), "urn:orders").is_ok());
    /// assert_eq!(
    ///     NamespaceDeclaration::check(Some("xmlns"), "urn:orders"),
    ///     Err(DeclarationError::ReservedPrefix("xmlns".to_owned()))
    /// );
    /// ```
    pub fn check(alias: Option<&str>, url: &str) -> Result<(), DeclarationError> {
        if url == XML_NAMESPACE || url == XMLNS_NAMESPACE {
            return Err(DeclarationError::ReservedNamespace(url.to_owned()));
        }
        let Some(alias) = alias else {
            return Ok(());
        };
        if alias == "xml" || alias == "xmlns" {
            return Err(DeclarationError::ReservedPrefix(alias.to_owned()));
        }
        if !is_ncname(alias) {
            return Err(DeclarationError::InvalidPrefix(alias.to_owned()));
        }
        if url.is_empty() {
            return Err(DeclarationError::EmptyNamespace(alias.to_owned()));
        }
        Ok(())
    }
}

const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";
const XMLNS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeclarationError {
    #[error("'{0}' is not a valid namespace prefix")]
    InvalidPrefix(String),

    #[error("prefix '{0}' is reserved")]
    ReservedPrefix(String),

    #[error("namespace '{0}' cannot be declared")]
    ReservedNamespace(String),

    #[error("prefix '{0}' cannot be bound to an empty namespace")]
    EmptyNamespace(String),
}

/// A non-empty XML name without colons.
pub fn is_ncname(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(is_name_start) && chars.all(is_name_char)
}

pub(crate) fn is_name_start(c: char) -> bool {
    c == '_' || c.is_alphabetic()
}

pub(crate) fn is_name_char(c: char) -> bool {
    is_name_start(c) || c.is_numeric() || c == '-' || c == '.' || c == '\u{B7}'
}
