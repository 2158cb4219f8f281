use crate::builder::Namespace;

/// Represents an XML attribute with a name and value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// The local name of the attribute.
    name: String,
    /// The prefix the attribute was written with, if any.
    prefix: Option<String>,
    /// The value of the attribute.
    value: String,

    namespace: Option<Namespace>,
}

impl Attribute {
    /// Creates a new instance of `Attribute`.
    ///
    /// # Example
    ///
    /// ```
    /// use soapfix_xml::builder::Attribute;
    /// let attribute = Attribute::new("name", "value");
    /// assert_eq!(attribute.value(), "value");
    /// ```
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prefix: None,
            value: value.into(),
            namespace: None,
        }
    }

    pub fn new_with_namespace(
        name: impl Into<String>,
        value: impl Into<String>,
        namespace: Option<impl Into<Namespace>>,
    ) -> Self {
        Self {
            name: name.into(),
            prefix: None,
            value: value.into(),
            namespace: namespace.map(Into::into),
        }
    }

    pub fn set_namespace(mut self, namespace: impl Into<Namespace>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
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

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = value.into();
    }

    /// `prefix:name`, or the bare name for unprefixed attributes.
    pub fn qualified_name(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}:{}", self.name),
            None => self.name.clone(),
        }
    }
}
