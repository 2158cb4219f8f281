use std::fmt;

use soapfix_xml::builder::{Builder, Declaration, Element};

use crate::{MimeHeaders, SoapError};

pub const SOAP11_ENVELOPE_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
pub const SOAP12_ENVELOPE_NS: &str = "http://www.w3.org/2003/05/soap-envelope";

const ENVELOPE: &str = "Envelope";
const HEADER: &str = "Header";
const BODY: &str = "Body";
const FAULT: &str = "Fault";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SoapVersion {
    #[default]
    V11,
    V12,
}

impl SoapVersion {
    pub fn envelope_namespace(self) -> &'static str {
        match self {
            SoapVersion::V11 => SOAP11_ENVELOPE_NS,
            SoapVersion::V12 => SOAP12_ENVELOPE_NS,
        }
    }

    /// Prefix used for the envelope elements of messages built locally.
    pub fn prefix(self) -> &'static str {
        match self {
            SoapVersion::V11 => "SOAP-ENV",
            SoapVersion::V12 => "env",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            SoapVersion::V11 => "text/xml; charset=utf-8",
            SoapVersion::V12 => "application/soap+xml; charset=utf-8",
        }
    }

    pub fn from_namespace(uri: &str) -> Option<Self> {
        match uri {
            SOAP11_ENVELOPE_NS => Some(SoapVersion::V11),
            SOAP12_ENVELOPE_NS => Some(SoapVersion::V12),
            _ => None,
        }
    }
}

impl fmt::Display for SoapVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SoapVersion::V11 => write!(f, "1.1"),
            SoapVersion::V12 => write!(f, "1.2"),
        }
    }
}

/// A SOAP envelope together with its MIME headers.
#[derive(Debug, Clone, PartialEq)]
pub struct SoapMessage {
    version: SoapVersion,
    headers: MimeHeaders,
    envelope: Element,
}

impl SoapMessage {
    /// An envelope with an empty `Header` and `Body` and no MIME headers.
    pub fn new(version: SoapVersion) -> Self {
        let namespace = version.envelope_namespace();
        let prefix = version.prefix();
        let part = |name: &str| {
            Element::new(name)
                .set_namespace(namespace)
                .with_prefix(prefix)
        };

        let envelope = part(ENVELOPE)
            .add_namespace_declaration(namespace, Some(prefix))
            .add_child(part(HEADER))
            .add_child(part(BODY));

        SoapMessage {
            version,
            headers: MimeHeaders::new(),
            envelope,
        }
    }

    /// Parses a serialized envelope; the SOAP version follows its namespace.
    pub fn parse(xml: &str, headers: MimeHeaders) -> Result<Self, SoapError> {
        let envelope = soapfix_xml::parser::parse(xml)?;
        Self::from_envelope(envelope, headers)
    }

    pub fn from_envelope(envelope: Element, headers: MimeHeaders) -> Result<Self, SoapError> {
        let version = envelope
            .namespace()
            .and_then(SoapVersion::from_namespace)
            .filter(|_| envelope.name() == ENVELOPE)
            .ok_or_else(|| {
                SoapError::NotAnEnvelope(format!(
                    "root element is '{}' in namespace '{}'",
                    envelope.name(),
                    envelope.namespace().unwrap_or_default()
                ))
            })?;

        Ok(SoapMessage {
            version,
            headers,
            envelope,
        })
    }

    pub fn version(&self) -> SoapVersion {
        self.version
    }

    pub fn headers(&self) -> &MimeHeaders {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut MimeHeaders {
        &mut self.headers
    }

    pub fn set_headers(&mut self, headers: MimeHeaders) {
        self.headers = headers;
    }

    pub fn envelope(&self) -> &Element {
        &self.envelope
    }

    pub fn header(&self) -> Option<&Element> {
        self.envelope
            .find_child(HEADER, Some(self.version.envelope_namespace()))
    }

    pub fn body(&self) -> Option<&Element> {
        self.envelope
            .find_child(BODY, Some(self.version.envelope_namespace()))
    }

    pub fn body_mut(&mut self) -> Option<&mut Element> {
        let namespace = self.version.envelope_namespace();
        self.envelope.find_child_mut(BODY, Some(namespace))
    }

    /// The `Fault` child of the body, if any.
    pub fn fault(&self) -> Option<&Element> {
        self.body()?
            .find_child(FAULT, Some(self.version.envelope_namespace()))
    }

    /// True when the message has no body or the body carries a fault.
    pub fn has_fault(&self) -> bool {
        self.body().is_none() || self.fault().is_some()
    }

    /// The whole envelope with an XML declaration, as sent on the wire.
    pub fn to_xml_string(&self) -> Result<String, SoapError> {
        Ok(Builder::new(Some(Declaration::default()), &self.envelope).to_xml_string()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_message_layout() {
        let message = SoapMessage::new(SoapVersion::V11);

        assert_eq!(
            message.to_xml_string().unwrap(),
            concat!(
                r#"<?xml version="1.0" encoding="UTF-8"?>"#,
                r#"<SOAP-ENV:Envelope xmlns:SOAP-ENV="http://schemas.xmlsoap.org/soap/envelope/">"#,
                "<SOAP-ENV:Header/><SOAP-ENV:Body/></SOAP-ENV:Envelope>"
            )
        );
        assert!(message.headers().is_empty());
        assert!(!message.has_fault());
    }

    #[test]
    fn test_soap12_message() {
        let message = SoapMessage::new(SoapVersion::V12);

        assert_eq!(message.envelope().qualified_name(), "env:Envelope");
        assert_eq!(message.body().unwrap().namespace(), Some(SOAP12_ENVELOPE_NS));
        assert_eq!(message.version().content_type(), "application/soap+xml; charset=utf-8");
    }

    #[test]
    fn test_parse_detects_version_and_fault() {
        let xml = r#"<env:Envelope xmlns:env="http://www.w3.org/2003/05/soap-envelope">
            <env:Body><env:Fault><env:Code><env:Value>env:Sender</env:Value></env:Code></env:Fault></env:Body>
        </env:Envelope>"#;
        let message = SoapMessage::parse(xml, MimeHeaders::new()).unwrap();

        assert_eq!(message.version(), SoapVersion::V12);
        assert!(message.header().is_none());
        assert!(message.fault().is_some());
        assert!(message.has_fault());
    }

    #[test]
    fn test_fault_in_other_namespace_is_not_a_soap_fault() {
        let xml = r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
            <s:Body><Fault/></s:Body>
        </s:Envelope>"#;
        let message = SoapMessage::parse(xml, MimeHeaders::new()).unwrap();

        assert!(!message.has_fault());
    }

    #[test]
    fn test_missing_body_counts_as_fault() {
        let xml = r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"><s:Header/></s:Envelope>"#;
        let message = SoapMessage::parse(xml, MimeHeaders::new()).unwrap();

        assert!(message.body().is_none());
        assert!(message.has_fault());
    }

    #[test]
    fn test_parse_rejects_non_envelope() {
        let result = SoapMessage::parse("<Envelope/>", MimeHeaders::new());
        assert!(matches!(result, Err(SoapError::NotAnEnvelope(_))));

        let result = SoapMessage::parse("not xml", MimeHeaders::new());
        assert!(matches!(result, Err(SoapError::Xml(_))));
    }
}
