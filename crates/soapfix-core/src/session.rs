use soapfix_xml::builder::{NamespaceDeclaration, Node};
use tracing::{debug, error, info, instrument, warn};

use crate::{
    MimeHeaders, NamespaceRegistry, PrettyPrinter, SoapError, SoapMessage, SoapVersion, Transport,
    XPathAccessor,
};

#[derive(Debug, Clone, typed_builder::TypedBuilder)]
pub struct SessionConfig {
    /// SOAP version of the requests the session builds.
    #[builder(default)]
    pub version: SoapVersion,

    /// Indentation unit used by `request_as_text` and `response_as_text`.
    #[builder(default = "  ".to_owned(), setter(into))]
    pub indent: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig::builder().build()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// Nothing has been received since construction or the last failed send.
    NoResponseYet,
    HasResponse(SoapMessage),
}

/// One outstanding SOAP request and the most recent response.
///
/// The request is always present and mutable; the response is read-only and
/// replaced wholesale by every send.
pub struct SoapSession<T> {
    config: SessionConfig,
    registry: NamespaceRegistry,
    printer: PrettyPrinter,
    request: SoapMessage,
    state: SessionState,
    transport: T,
}

impl<T: Transport> SoapSession<T> {
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, SessionConfig::default())
    }

    pub fn with_config(transport: T, config: SessionConfig) -> Self {
        let mut session = SoapSession {
            printer: PrettyPrinter::new(config.indent.clone()),
            request: SoapMessage::new(config.version),
            config,
            registry: NamespaceRegistry::new(),
            state: SessionState::NoResponseYet,
            transport,
        };
        session.initialize();
        session
    }

    /// Replaces the request with an empty one.
    ///
    /// Every registered namespace is declared on the new body. The last
    /// response is left untouched.
    pub fn initialize(&mut self) {
        self.prepare_request(MimeHeaders::new());
    }

    fn prepare_request(&mut self, headers: MimeHeaders) {
        let mut request = SoapMessage::new(self.config.version);
        if let Some(body) = request.body_mut() {
            for (prefix, uri) in self.registry.all_bindings() {
                body.declare_namespace(alias(prefix), uri);
            }
        }
        request.set_headers(headers);
        self.request = request;
    }

    pub fn set_header(&mut self, name: &str, value: &str) {
        self.request.headers_mut().set(name, value);
    }

    pub fn add_header(&mut self, name: &str, value: &str) {
        self.request.headers_mut().add(name, value);
    }

    pub fn reset_headers(&mut self) {
        self.request.headers_mut().clear();
    }

    /// Request headers as `[name] = [value]` lines.
    pub fn headers_as_text(&self) -> String {
        self.request.headers().to_text()
    }

    /// Headers the transport attached to the last response.
    pub fn response_headers_as_text(&self) -> Option<String> {
        self.response().map(|response| response.headers().to_text())
    }

    /// Declares `prefix` on the request body and registers it for XPath.
    ///
    /// Both values are trimmed. Prefixes that cannot be written as an
    /// `xmlns:` declaration are rejected before anything is registered.
    pub fn add_namespace(&mut self, prefix: &str, uri: &str) -> Result<(), SoapError> {
        let prefix = prefix.trim();
        let uri = uri.trim();
        NamespaceDeclaration::check(alias(prefix), uri)?;
        self.request
            .body_mut()
            .ok_or(SoapError::MissingBody)?
            .declare_namespace(alias(prefix), uri);
        self.registry.add_namespace_prefix(prefix, uri);
        debug!(prefix, uri, "namespace added");
        Ok(())
    }

    /// Forgets every registered prefix.
    ///
    /// Declarations already written on the current request body stay.
    pub fn reset_namespaces(&mut self) {
        self.registry.clear();
    }

    /// Replaces the request body content with the given XML elements.
    ///
    /// Registered prefixes may be used without declaring them.
    pub fn set_request_body(&mut self, xml: &str) -> Result<(), SoapError> {
        let elements = soapfix_xml::parser::parse_fragment(xml, self.registry.all_bindings())?;
        let body = self.request.body_mut().ok_or(SoapError::MissingBody)?;
        let children = body.children_mut();
        children.clear();
        children.extend(elements.into_iter().map(Node::Element));
        Ok(())
    }

    /// Value addressed by `path` in the response body.
    ///
    /// `None` when there is no response, no body, or no matching node.
    pub fn get_xpath_value(&self, path: &str) -> Result<Option<String>, SoapError> {
        let Some(body) = self.response().and_then(SoapMessage::body) else {
            return Ok(None);
        };
        Ok(XPathAccessor::new(&self.registry).read(path, body)?)
    }

    pub fn value_at_xpath_equals(&self, path: &str, expected: &str) -> Result<bool, SoapError> {
        Ok(self.get_xpath_value(path)?.as_deref() == Some(expected))
    }

    /// Assigns `value` to the first node `path` selects in the request body.
    pub fn set_xpath_value(&mut self, path: &str, value: &str) -> Result<bool, SoapError> {
        let body = self.request.body_mut().ok_or(SoapError::MissingBody)?;
        XPathAccessor::new(&self.registry).write(path, value, body)?;
        Ok(true)
    }

    pub fn request_as_text(&self) -> Result<Option<String>, SoapError> {
        self.message_as_text(&self.request).map(Some)
    }

    pub fn response_as_text(&self) -> Result<Option<String>, SoapError> {
        self.response()
            .map(|response| self.message_as_text(response))
            .transpose()
    }

    fn message_as_text(&self, message: &SoapMessage) -> Result<String, SoapError> {
        match message.body() {
            Some(body) => self.printer.render_children(body),
            None => Ok(String::new()),
        }
    }

    /// True unless a response with a fault-free body is present.
    pub fn has_fault(&self) -> bool {
        self.response().is_none_or(SoapMessage::has_fault)
    }

    /// Sends the request and starts a fresh one carrying the same headers.
    ///
    /// Transport failures are logged and reported as `false`.
    #[instrument(name = "session.send", level = "info", skip(self))]
    pub fn send(&mut self, endpoint: &str) -> bool {
        self.state = SessionState::NoResponseYet;
        self.log_message("request", &self.request);

        match self.transport.call(&self.request, endpoint) {
            Ok(response) => {
                self.log_message("response", &response);
                info!(fault = response.has_fault(), "response received");
                self.state = SessionState::HasResponse(response);
            }
            Err(error) => {
                error!(%error, "send failed");
            }
        }

        let headers = self.request.headers().clone();
        self.prepare_request(headers);

        matches!(self.state, SessionState::HasResponse(_))
    }

    fn log_message(&self, kind: &str, message: &SoapMessage) {
        match self.message_as_text(message) {
            Ok(text) => debug!(kind, body = %text, "SOAP message"),
            Err(error) => warn!(kind, %error, "SOAP message could not be rendered"),
        }
    }

    pub fn request(&self) -> &SoapMessage {
        &self.request
    }

    pub fn response(&self) -> Option<&SoapMessage> {
        match &self.state {
            SessionState::HasResponse(response) => Some(response),
            SessionState::NoResponseYet => None,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn registry(&self) -> &NamespaceRegistry {
        &self.registry
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

/// An empty prefix declares the default namespace.
fn alias(prefix: &str) -> Option<&str> {
    Some(prefix).filter(|prefix| !prefix.is_empty())
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::TransportError;

    /// Replies with a fixed outcome and records every request it sees.
    struct Recorder {
        reply: Option<&'static str>,
        seen: RefCell<Vec<(String, MimeHeaders)>>,
    }

    impl Recorder {
        fn replying(reply: Option<&'static str>) -> Self {
            Recorder {
                reply,
                seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl Transport for Recorder {
        fn call(&self, request: &SoapMessage, endpoint: &str) -> Result<SoapMessage, TransportError> {
            self.seen
                .borrow_mut()
                .push((endpoint.to_owned(), request.headers().clone()));
            match self.reply {
                Some(xml) => Ok(SoapMessage::parse(xml, MimeHeaders::new())
                    .map_err(TransportError::MalformedReply)?),
                None => Err(TransportError::Connection {
                    endpoint: endpoint.to_owned(),
                    message: "refused".to_owned(),
                }),
            }
        }
    }

    const OK: &str = r#"<SOAP-ENV:Envelope xmlns:SOAP-ENV="http://schemas.xmlsoap.org/soap/envelope/"><SOAP-ENV:Body><m:Result xmlns:m="urn:orders">ok</m:Result></SOAP-ENV:Body></SOAP-ENV:Envelope>"#;

    #[test]
    fn test_initial_state() {
        let session = SoapSession::new(Recorder::replying(None));

        assert_eq!(session.state(), &SessionState::NoResponseYet);
        assert!(session.has_fault());
        assert_eq!(session.response_as_text().unwrap(), None);
        assert_eq!(session.request_as_text().unwrap().as_deref(), Some(""));
        assert_eq!(session.get_xpath_value("//x").unwrap(), None);
        assert!(!session.value_at_xpath_equals("//x", "").unwrap());
    }

    #[test]
    fn test_add_namespace_trims_and_declares_on_body() {
        let mut session = SoapSession::new(Recorder::replying(None));
        session.add_namespace("  m ", " urn:orders\t").unwrap();

        assert_eq!(session.registry().namespace_uri("m"), Some("urn:orders"));
        let declarations = session.request().body().unwrap().namespace_declarations();
        assert_eq!(declarations.len(), 1);
        assert_eq!(declarations[0].alias.as_deref(), Some("m"));
        assert_eq!(declarations[0].namespace.url, "urn:orders");
    }

    #[test]
    fn test_add_namespace_rejects_unwritable_bindings() {
        use soapfix_xml::builder::DeclarationError;

        let mut session = SoapSession::new(Recorder::replying(None));

        assert!(matches!(
            session.add_namespace("xmlns", "urn:x"),
            Err(SoapError::Namespace(DeclarationError::ReservedPrefix(_)))
        ));
        assert!(matches!(
            session.add_namespace("xml", "urn:x"),
            Err(SoapError::Namespace(DeclarationError::ReservedPrefix(_)))
        ));
        assert!(matches!(
            session.add_namespace("a b", "urn:y"),
            Err(SoapError::Namespace(DeclarationError::InvalidPrefix(_)))
        ));
        assert!(matches!(
            session.add_namespace("m", "  "),
            Err(SoapError::Namespace(DeclarationError::EmptyNamespace(_)))
        ));

        // Nothing leaked into the registry or onto the body.
        assert!(session.registry().is_empty());
        assert!(session.request().body().unwrap().namespace_declarations().is_empty());

        session.add_namespace("", "urn:default").unwrap();
        let xml = session.request().to_xml_string().unwrap();
        assert!(xml.contains(r#"xmlns="urn:default""#), "{xml}");
        assert!(SoapMessage::parse(&xml, MimeHeaders::new()).is_ok());
    }

    #[test]
    fn test_reset_namespaces_keeps_body_declarations() {
        let mut session = SoapSession::new(Recorder::replying(None));
        session.add_namespace("m", "urn:orders").unwrap();
        session.reset_namespaces();

        assert_eq!(session.registry().namespace_uri("m"), None);
        assert_eq!(session.request().body().unwrap().namespace_declarations().len(), 1);

        session.initialize();
        assert!(session.request().body().unwrap().namespace_declarations().is_empty());
    }

    #[test]
    fn test_send_carries_headers_and_namespaces_forward() {
        let mut session = SoapSession::new(Recorder::replying(Some(OK)));
        session.add_namespace("m", "urn:orders").unwrap();
        session.set_header("SOAPAction", "urn:orders/Get");
        session.set_request_body("<m:Get><m:Id>1</m:Id></m:Get>").unwrap();

        assert!(session.send("http://localhost/orders"));

        assert_eq!(session.headers_as_text(), "[SOAPAction] = [urn:orders/Get]");
        assert_eq!(session.request_as_text().unwrap().as_deref(), Some(""));
        assert_eq!(session.request().body().unwrap().namespace_declarations().len(), 1);
        assert_eq!(session.get_xpath_value("//m:Result").unwrap().as_deref(), Some("ok"));
        assert!(!session.has_fault());

        let seen = session.transport().seen.borrow();
        assert_eq!(seen[0].0, "http://localhost/orders");
        assert_eq!(seen[0].1.get("soapaction"), Some("urn:orders/Get"));
    }

    #[test]
    #[tracing_test::traced_test]
    fn test_failed_send_clears_previous_response() {
        let mut session = SoapSession::new(Recorder::replying(Some(OK)));
        assert!(session.send("http://localhost/orders"));
        assert!(session.response().is_some());

        session.transport = Recorder::replying(None);
        assert!(!session.send("http://localhost/orders"));

        assert_eq!(session.state(), &SessionState::NoResponseYet);
        assert!(session.has_fault());
        assert!(logs_contain("send failed"));
    }

    #[test]
    fn test_set_request_body_rejects_unknown_prefix() {
        let mut session = SoapSession::new(Recorder::replying(None));
        let result = session.set_request_body("<x:Unknown/>");
        assert!(matches!(result, Err(SoapError::Xml(_))));
    }

    #[test]
    fn test_soap12_config() {
        let config = SessionConfig::builder()
            .version(SoapVersion::V12)
            .indent("\t")
            .build();
        let session = SoapSession::with_config(Recorder::replying(None), config);

        assert_eq!(session.request().version(), SoapVersion::V12);
        assert_eq!(session.request().envelope().qualified_name(), "env:Envelope");
    }
}
