use crate::{MimeHeaders, SoapError, SoapMessage};

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("connection to {endpoint} failed: {message}")]
    Connection { endpoint: String, message: String },

    #[error("HTTP status {code} without a SOAP envelope")]
    Status { code: u16, body: String },

    #[error("empty reply from server")]
    EmptyReply,

    #[error("malformed reply: {0}")]
    MalformedReply(#[source] SoapError),

    #[error("request could not be serialized: {0}")]
    InvalidRequest(#[source] SoapError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Delivers a request envelope to an endpoint and returns the reply.
///
/// The session owns one transport for its whole lifetime and calls it once
/// per send.
pub trait Transport {
    fn call(&self, request: &SoapMessage, endpoint: &str) -> Result<SoapMessage, TransportError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn call(&self, request: &SoapMessage, endpoint: &str) -> Result<SoapMessage, TransportError> {
        (**self).call(request, endpoint)
    }
}

/// Turns a raw HTTP reply into a response message.
///
/// Any status whose body is a SOAP envelope is a response, which is how
/// servers deliver faults with HTTP 500. Other non-success statuses, empty
/// bodies and bodies that are not envelopes are errors.
pub fn message_from_reply(
    status: u16,
    headers: MimeHeaders,
    body: &str,
) -> Result<SoapMessage, TransportError> {
    let success = (200..300).contains(&status);

    if body.trim().is_empty() {
        return Err(if success {
            TransportError::EmptyReply
        } else {
            TransportError::Status {
                code: status,
                body: String::new(),
            }
        });
    }

    match SoapMessage::parse(body, headers) {
        Ok(message) => {
            if !success {
                tracing::debug!(status, "non-success status carried a SOAP envelope");
            }
            Ok(message)
        }
        Err(error) if success => Err(TransportError::MalformedReply(error)),
        Err(error) => {
            tracing::debug!(status, %error, "non-success status without a SOAP envelope");
            Err(TransportError::Status {
                code: status,
                body: body.to_owned(),
            })
        }
    }
}
