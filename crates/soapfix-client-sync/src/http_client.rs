use std::sync::Arc;
use std::time::Duration;

use soapfix_core::transport::message_from_reply;
use soapfix_core::{MimeHeaders, SoapMessage, Transport, TransportError};
use tracing::{debug, error, info, instrument};

#[derive(Debug, Clone, typed_builder::TypedBuilder)]
pub struct TransportConfig {
    #[builder(default = Duration::from_secs(30))]
    pub connect_timeout: Duration,
    #[builder(default = Duration::from_secs(60))]
    pub read_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig::builder().build()
    }
}

/// Blocking SOAP-over-HTTP transport.
///
/// One agent is built up front and reused for every call.
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new(config: &TransportConfig) -> Result<Self, native_tls::Error> {
        let tls = native_tls::TlsConnector::new()?;
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(config.connect_timeout)
            .timeout_read(config.read_timeout)
            .tls_connector(Arc::new(tls))
            .build();
        Ok(UreqTransport { agent })
    }
}

impl Transport for UreqTransport {
    #[instrument(name = "http_client.call", level = "info", skip(self, request), fields(url = %endpoint), err)]
    fn call(&self, request: &SoapMessage, endpoint: &str) -> Result<SoapMessage, TransportError> {
        let body = request
            .to_xml_string()
            .map_err(TransportError::InvalidRequest)?;

        let mut ureq_request = self.agent.post(endpoint);
        for (name, value) in combined_headers(request.headers()) {
            ureq_request = ureq_request.set(&name, &value);
        }
        if !request.headers().contains("Content-Type") {
            ureq_request = ureq_request.set("Content-Type", request.version().content_type());
        }

        debug!(
            headers_count = request.headers().len(),
            body_length = body.len(),
            "request configured"
        );

        let response = match ureq_request.send_string(&body) {
            Ok(response) => response,
            Err(ureq::Error::Status(status, response)) => {
                // SOAP faults arrive as HTTP 500 with an envelope.
                debug!(status, "received status response");
                response
            }
            Err(ureq::Error::Transport(transport)) => {
                error!(error = %transport, "request failed");
                return Err(TransportError::Connection {
                    endpoint: endpoint.to_owned(),
                    message: transport.to_string(),
                });
            }
        };

        let status = response.status();
        let headers: MimeHeaders = response
            .headers_names()
            .iter()
            .filter_map(|name| {
                response
                    .header(name)
                    .map(|value| (name.clone(), value.to_owned()))
            })
            .collect();
        let text = response.into_string().map_err(|e| {
            error!(error = %e, "failed to read response body");
            e
        })?;

        info!(status, response_body_length = text.len(), "response received");
        message_from_reply(status, headers, &text)
    }
}

/// Collapses repeated header names into one comma separated value, keeping
/// the position and spelling of the first occurrence.
fn combined_headers(headers: &MimeHeaders) -> Vec<(String, String)> {
    let mut combined: Vec<(String, String)> = Vec::new();
    for header in headers.iter() {
        match combined
            .iter_mut()
            .find(|(name, _)| name.eq_ignore_ascii_case(&header.name))
        {
            Some((_, value)) => {
                value.push_str(", ");
                value.push_str(&header.value);
            }
            None => combined.push((header.name.clone(), header.value.clone())),
        }
    }
    combined
}
