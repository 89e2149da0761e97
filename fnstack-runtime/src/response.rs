//! Structured response builder handed to functions

use serde_json::Value;
use std::collections::BTreeMap;

/// Explicit status, headers and body for a function's reply.
///
/// Unset fields keep their defaults: status 200, no headers, no body.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    status_code: u16,
    headers: BTreeMap<String, String>,
    body: Option<Value>,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    pub fn new() -> Self {
        Self {
            status_code: 200,
            headers: BTreeMap::new(),
            body: None,
        }
    }

    pub fn set_status_code(&mut self, status_code: u16) -> &mut Self {
        self.status_code = status_code;
        self
    }

    pub fn set_body(&mut self, body: impl Into<Value>) -> &mut Self {
        self.body = Some(body.into());
        self
    }

    /// Replace all headers
    pub fn set_headers<I, K, V>(&mut self, headers: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers = headers
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        self
    }

    pub fn append_header(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let response = Response::new();
        assert_eq!(response.status_code(), 200);
        assert!(response.headers().is_empty());
        assert!(response.body().is_none());
    }

    #[test]
    fn test_setters_chain() {
        let mut response = Response::new();
        response
            .set_status_code(418)
            .set_body(json!({ "data": "Something" }))
            .set_headers([("Content-Type", "application/json")]);

        assert_eq!(response.status_code(), 418);
        assert_eq!(response.body(), Some(&json!({ "data": "Something" })));
        assert_eq!(
            response.headers().get("Content-Type").map(String::as_str),
            Some("application/json")
        );
    }

    #[test]
    fn test_set_headers_replaces() {
        let mut response = Response::new();
        response
            .append_header("X-One", "1")
            .set_headers([("X-Two", "2")]);

        assert_eq!(response.headers().len(), 1);
        assert!(response.headers().contains_key("X-Two"));
    }

    #[test]
    fn test_append_header() {
        let mut response = Response::new();
        response.append_header("X-One", "1").append_header("X-Two", "2");
        assert_eq!(response.headers().len(), 2);
    }

    #[test]
    fn test_fields_independent() {
        let mut response = Response::new();
        response.set_body("plain");
        assert_eq!(response.status_code(), 200);
        assert!(response.headers().is_empty());
        assert_eq!(response.body(), Some(&json!("plain")));
    }
}
