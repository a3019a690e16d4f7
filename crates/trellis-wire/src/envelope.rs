//! Transport envelopes exchanged between client and server.
//!
//! Bodies travel as wire text; the envelopes themselves are serde structs so
//! a transport can frame them however it likes (the socket transport uses one
//! JSON line per envelope).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::codec::CONTENT_TYPE;

/// Header naming the body's media type.
pub const CONTENT_TYPE_HEADER: &str = "content-type";

/// Status of a successful response with a body.
pub const STATUS_OK: u16 = 200;

/// Status of a successful response without a body.
pub const STATUS_NO_CONTENT: u16 = 204;

/// Request verb.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Method {
    /// Read without side effects.
    Get,
    /// Invoke or create.
    Post,
    /// Replace.
    Put,
    /// Remove.
    Delete,
}

/// A request addressed to a resource URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    /// Verb.
    pub method: Method,
    /// Absolute or root-relative URL; may already carry a query string.
    pub url: String,
    /// Additional query parameters, in order.
    #[serde(default)]
    pub params: Vec<(String, String)>,
    /// Request headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Wire-text body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl Request {
    /// Creates a request without parameters or body.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            params: Vec::new(),
            headers: BTreeMap::new(),
            body: None,
        }
    }

    /// Appends a query parameter.
    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    /// Attaches a wire-text body and marks its media type.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.headers
            .insert(CONTENT_TYPE_HEADER.to_owned(), CONTENT_TYPE.to_owned());
        self.body = Some(body.into());
        self
    }

    /// First value of a query parameter added through [`Request::with_param`].
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// A response to a [`Request`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// HTTP-style status code.
    pub status: u16,
    /// Response headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Wire-text body; empty for 204.
    #[serde(default)]
    pub body: String,
}

impl Response {
    /// A response carrying wire text.
    pub fn with_status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: BTreeMap::from([(CONTENT_TYPE_HEADER.to_owned(), CONTENT_TYPE.to_owned())]),
            body: body.into(),
        }
    }

    /// A 200 response carrying wire text.
    pub fn ok(body: impl Into<String>) -> Self {
        Self::with_status(STATUS_OK, body)
    }

    /// A 204 response.
    #[must_use]
    pub fn no_content() -> Self {
        Self {
            status: STATUS_NO_CONTENT,
            headers: BTreeMap::new(),
            body: String::new(),
        }
    }

    /// Returns `true` for 2xx statuses.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_frame_as_json() {
        let request = Request::new(Method::Post, "/jobs/new").with_body("{}");
        let line = serde_json::to_string(&request).expect("serialise");
        assert!(line.contains(r#""method":"POST""#));
        let back: Request = serde_json::from_str(&line).expect("deserialise");
        assert_eq!(back, request);
    }

    #[test]
    fn minimal_requests_deserialise() {
        let request: Request =
            serde_json::from_str(r#"{"method":"GET","url":"/echo"}"#).expect("deserialise");
        assert_eq!(request, Request::new(Method::Get, "/echo"));
    }

    #[test]
    fn methods_parse_case_insensitively() {
        assert_eq!("delete".parse::<Method>().expect("parse"), Method::Delete);
        assert_eq!(Method::Put.to_string(), "PUT");
    }

    #[test]
    fn no_content_is_success_without_body() {
        let response = Response::no_content();
        assert!(response.is_success());
        assert!(response.body.is_empty());
    }
}
