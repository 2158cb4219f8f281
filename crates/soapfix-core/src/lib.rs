pub mod accessor;
pub mod headers;
pub mod message;
pub mod printer;
pub mod registry;
pub mod session;
pub mod transport;

pub use accessor::XPathAccessor;
pub use headers::{MimeHeader, MimeHeaders};
pub use message::{SoapMessage, SoapVersion};
pub use printer::PrettyPrinter;
pub use registry::NamespaceRegistry;
pub use session::{SessionConfig, SessionState, SoapSession};
pub use transport::{Transport, TransportError};

#[derive(Debug, thiserror::Error)]
pub enum SoapError {
    #[error("XPath error: {0}")]
    XPath(#[from] soapfix_xml::xpath::XPathError),

    #[error("XML error: {0}")]
    Xml(#[from] soapfix_xml::XmlError),

    #[error("invalid namespace binding: {0}")]
    Namespace(#[from] soapfix_xml::builder::DeclarationError),

    #[error("message has no SOAP body")]
    MissingBody,

    #[error("not a SOAP envelope: {0}")]
    NotAnEnvelope(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<soapfix_xml::builder::XmlBuilderError> for SoapError {
    fn from(error: soapfix_xml::builder::XmlBuilderError) -> Self {
        SoapError::Xml(error.into())
    }
}
