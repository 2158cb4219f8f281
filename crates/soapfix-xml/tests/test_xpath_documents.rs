//! XPath reads and writes against complete SOAP documents.

use std::collections::HashMap;
use std::fs;

use soapfix_xml::builder::Builder;
use soapfix_xml::parser::parse;
use soapfix_xml::xpath::{XPath, XPathError, assign};

const ENVELOPE_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";

fn bindings() -> HashMap<String, String> {
    HashMap::from([
        ("soap".to_owned(), ENVELOPE_NS.to_owned()),
        ("ord".to_owned(), "urn:example:orders".to_owned()),
        ("err".to_owned(), "urn:example:errors".to_owned()),
    ])
}

fn read(path: &str) -> String {
    fs::read_to_string(path).expect("Failed to read resource file")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[tracing_test::traced_test]
    fn test_fault_detail_is_reachable_from_body() {
        let envelope = parse(&read("tests/resources/fault_response.xml")).unwrap();
        let body = envelope.find_child("Body", Some(ENVELOPE_NS)).unwrap();

        let code = XPath::compile("//err:ErrorCode")
            .unwrap()
            .evaluate(body, &bindings())
            .unwrap();
        assert_eq!(code.to_xpath_string(body), "E-4711");

        let message = XPath::compile("/soap:Body/soap:Fault/detail/err:OrderFault/err:Message")
            .unwrap()
            .evaluate(body, &bindings())
            .unwrap();
        assert_eq!(message.to_xpath_string(body), "Unknown order <42>");

        let has_fault = XPath::compile("boolean(soap:Fault)")
            .unwrap()
            .evaluate(body, &bindings())
            .unwrap();
        assert!(has_fault.to_boolean());
    }

    #[test]
    fn test_order_totals() {
        let envelope = parse(&read("tests/resources/order_response.xml")).unwrap();
        let body = envelope.find_child("Body", Some(ENVELOPE_NS)).unwrap();

        let eval = |expression: &str| {
            XPath::compile(expression)
                .unwrap()
                .evaluate(body, &bindings())
                .unwrap()
                .to_xpath_string(body)
        };

        assert_eq!(eval("//ord:Order/@id"), "42");
        assert_eq!(eval("//ord:Customer"), "ACME & Sons");
        assert_eq!(eval("count(//ord:Line)"), "3");
        assert_eq!(eval("sum(//ord:Line/@qty)"), "8");
        assert_eq!(eval("//ord:Line[@sku='B-7']"), "4.00");
        assert_eq!(eval("//ord:Line[@qty > 1][last()]/@sku"), "C-3");
        assert_eq!(eval("//ord:Line[. < 2]/@sku"), "C-3");
    }

    #[test]
    fn test_write_then_serialize() {
        let mut envelope = parse(&read("tests/resources/order_response.xml")).unwrap();
        let resolver = bindings();

        for (expression, value) in [
            ("//ord:Customer", "Initech"),
            ("//ord:Order/@currency", "USD"),
            ("//ord:Line[2]/text()", "5.00"),
        ] {
            let targets = XPath::compile(expression)
                .unwrap()
                .select(&envelope, &resolver)
                .unwrap();
            assign(&mut envelope, &targets[0], value).unwrap();
        }

        let body = envelope.find_child("Body", Some(ENVELOPE_NS)).unwrap();
        let response = body.child_elements().next().unwrap();
        let xml = Builder::new(None, response)
            .with_indent("  ")
            .to_xml_string()
            .unwrap();

        assert!(xml.starts_with(r#"<o:GetOrderResponse xmlns:o="urn:example:orders">"#));
        assert!(xml.contains(r#"<o:Order id="42" currency="USD">"#));
        assert!(xml.contains("<o:Customer>Initech</o:Customer>"));
        assert!(xml.contains(r#"<o:Line sku="B-7" qty="1">5.00</o:Line>"#));
    }

    #[test]
    fn test_missing_binding_is_reported() {
        let envelope = parse(&read("tests/resources/order_response.xml")).unwrap();

        let result = XPath::compile("//o:Order")
            .unwrap()
            .evaluate(&envelope, &HashMap::<String, String>::new());
        assert_eq!(result, Err(XPathError::UnboundPrefix("o".to_owned())));
    }
}
