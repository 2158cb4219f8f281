//! End-to-end session scenarios against stub transports.

use std::cell::RefCell;
use std::fs;

use soapfix_core::transport::message_from_reply;
use soapfix_core::{MimeHeaders, SoapMessage, SoapSession, Transport, TransportError};

const ORDERS_NS: &str = "urn:example:orders";
const ERRORS_NS: &str = "urn:example:errors";
const ENDPOINT: &str = "http://localhost:8080/orders";

/// Replies with the contents of a resource file and the given HTTP status.
struct FileReply {
    status: u16,
    path: &'static str,
}

impl Transport for FileReply {
    fn call(&self, _request: &SoapMessage, _endpoint: &str) -> Result<SoapMessage, TransportError> {
        let body = fs::read_to_string(self.path)?;
        let headers: MimeHeaders = [("Content-Type", "text/xml; charset=utf-8")]
            .into_iter()
            .collect();
        message_from_reply(self.status, headers, &body)
    }
}

/// Fails every call as if the server could not be reached.
struct Unreachable;

impl Transport for Unreachable {
    fn call(&self, _request: &SoapMessage, endpoint: &str) -> Result<SoapMessage, TransportError> {
        Err(TransportError::Connection {
            endpoint: endpoint.to_owned(),
            message: "connection refused".to_owned(),
        })
    }
}

/// Echoes the request envelope back and keeps the serialized requests.
#[derive(Default)]
struct Echo {
    sent: RefCell<Vec<String>>,
}

impl Transport for Echo {
    fn call(&self, request: &SoapMessage, _endpoint: &str) -> Result<SoapMessage, TransportError> {
        let xml = request
            .to_xml_string()
            .map_err(TransportError::InvalidRequest)?;
        self.sent.borrow_mut().push(xml.clone());
        message_from_reply(200, request.headers().clone(), &xml)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[tracing_test::traced_test]
    fn test_fault_response_is_a_successful_send() {
        let mut session = SoapSession::new(FileReply {
            status: 500,
            path: "tests/resources/order_fault.xml",
        });
        session.add_namespace("soap", "http://schemas.xmlsoap.org/soap/envelope/").unwrap();
        session.add_namespace("err", ERRORS_NS).unwrap();

        assert!(session.send(ENDPOINT));
        assert!(session.has_fault());
        assert_eq!(
            session.get_xpath_value("//err:ErrorCode").unwrap().as_deref(),
            Some("ORD-404")
        );
        assert!(session.value_at_xpath_equals("/soap:Body/soap:Fault/faultcode", "soap:Client").unwrap());
        assert_eq!(
            session.response_headers_as_text().as_deref(),
            Some("[Content-Type] = [text/xml; charset=utf-8]")
        );
    }

    #[test]
    #[tracing_test::traced_test]
    fn test_connection_error() {
        let mut session = SoapSession::new(Unreachable);

        assert!(!session.send(ENDPOINT));
        assert!(session.has_fault());
        assert_eq!(session.response_as_text().unwrap(), None);
        assert!(logs_contain("connection refused"));
    }

    #[test]
    #[tracing_test::traced_test]
    fn test_failed_send_still_rearms_the_request() {
        let mut session = SoapSession::new(Unreachable);
        session.add_namespace("ns", ORDERS_NS).unwrap();
        session.add_header("Auth", "token1");
        session.add_header("X-Tag", "a");
        session.set_request_body("<ns:GetOrder><ns:Id>7</ns:Id></ns:GetOrder>").unwrap();

        assert!(!session.send(ENDPOINT));
        assert!(session.has_fault());

        assert_eq!(session.headers_as_text(), "[Auth] = [token1]\n[X-Tag] = [a]");
        assert_eq!(session.request_as_text().unwrap().as_deref(), Some(""));

        session.set_header("Auth", "token2");
        session.set_request_body("<ns:GetOrder><ns:Id>7</ns:Id></ns:GetOrder>").unwrap();
        assert!(session.set_xpath_value("//ns:Id", "8").unwrap());
        assert_eq!(session.headers_as_text(), "[Auth] = [token2]\n[X-Tag] = [a]");
        assert!(session
            .request_as_text()
            .unwrap()
            .unwrap()
            .contains("<ns:Id>8</ns:Id>"));
        assert!(logs_contain("send failed"));
    }

    #[test]
    fn test_non_fault_response_values() {
        let mut session = SoapSession::new(FileReply {
            status: 200,
            path: "tests/resources/order_echo.xml",
        });
        session.add_namespace("o", ORDERS_NS).unwrap();

        assert!(session.send(ENDPOINT));
        assert!(!session.has_fault());
        assert!(session.value_at_xpath_equals("//o:Order/o:Status", "SHIPPED").unwrap());
        assert!(!session.value_at_xpath_equals("//o:Order/o:Status", "shipped").unwrap());
        assert_eq!(session.get_xpath_value("//o:Note").unwrap().as_deref(), Some(""));
        assert_eq!(session.get_xpath_value("//o:Missing").unwrap(), None);
        assert_eq!(session.get_xpath_value("//o:Order/@id").unwrap().as_deref(), Some("42"));
        assert!(session.get_xpath_value("//o:Order[").is_err());

        let text = session.response_as_text().unwrap().unwrap();
        assert!(text.starts_with(r#"<o:GetOrderResponse xmlns:o="urn:example:orders">"#));
        assert!(text.contains("<o:Status>SHIPPED</o:Status>"));
    }

    #[test]
    fn test_set_value_round_trip_through_echo() {
        let mut session = SoapSession::new(Echo::default());
        session.add_namespace("soap", "http://schemas.xmlsoap.org/soap/envelope/").unwrap();
        session.add_namespace("ns", ORDERS_NS).unwrap();
        session.set_request_body("<ns:GetOrder><ns:Field/></ns:GetOrder>").unwrap();

        assert!(session.set_xpath_value("/soap:Body/ns:GetOrder/ns:Field", "42").unwrap());
        let request = session.request_as_text().unwrap().unwrap();
        assert!(request.contains("<ns:Field>42</ns:Field>"), "{request}");

        assert!(session.send(ENDPOINT));
        assert!(session.value_at_xpath_equals("//ns:Field", "42").unwrap());

        let sent = session.transport().sent.borrow();
        assert!(sent[0].starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(sent[0].contains(r#"xmlns:ns="urn:example:orders""#));
    }

    #[test]
    fn test_request_is_rearmed_after_send() {
        let mut session = SoapSession::new(Echo::default());
        session.add_namespace("ns", ORDERS_NS).unwrap();
        session.set_header("X-Run", "1");
        session.add_header("X-Tag", "a");
        session.add_header("X-Tag", "b");
        session.set_request_body("<ns:Ping><ns:Seq>1</ns:Seq></ns:Ping>").unwrap();

        assert!(session.send(ENDPOINT));

        // The next request starts empty but keeps headers and declarations.
        assert_eq!(session.request_as_text().unwrap().as_deref(), Some(""));
        assert_eq!(
            session.headers_as_text(),
            "[X-Run] = [1]\n[X-Tag] = [a]\n[X-Tag] = [b]"
        );
        assert!(matches!(
            session.set_xpath_value("//ns:Seq", "2"),
            Err(soapfix_core::SoapError::XPath(_))
        ));

        session.set_request_body("<ns:Ping><ns:Seq>1</ns:Seq></ns:Ping>").unwrap();
        assert!(session.set_xpath_value("//ns:Seq", "2").unwrap());
        session.set_header("X-Run", "2");
        assert!(session.send(ENDPOINT));

        assert!(session.value_at_xpath_equals("//ns:Seq", "2").unwrap());
        assert_eq!(
            session.response().unwrap().headers().get("x-run"),
            Some("2")
        );

        session.reset_headers();
        assert_eq!(session.headers_as_text(), "");
    }

    #[test]
    fn test_response_headers_are_not_carried_into_request() {
        let mut session = SoapSession::new(FileReply {
            status: 200,
            path: "tests/resources/order_echo.xml",
        });

        assert!(session.send(ENDPOINT));
        assert_eq!(session.headers_as_text(), "");
    }
}
