//! Response dispatch
//!
//! Turns whatever a function handed back into HTTP response mutations.
//! The rules are checked in order and the first match wins:
//!
//! 1. structured response: its status, its headers, its body as-is
//! 2. markup document of a known kind: 200, `text/xml`, serialized document
//! 3. text: 200, sent verbatim
//! 4. anything else: 200, sent for JSON serialization
//!
//! Failures always become a 500 carrying the error's trace. Nothing here logs.

use crate::result::InvocationResult;
use crate::twiml::{DocumentKinds, XML_MEDIA_TYPE};
use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

/// Body handed to the transport
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Empty,
    Text(String),
    Json(Value),
}

impl From<Option<&Value>> for Payload {
    fn from(body: Option<&Value>) -> Self {
        match body {
            None => Payload::Empty,
            Some(Value::String(text)) => Payload::Text(text.clone()),
            Some(value) => Payload::Json(value.clone()),
        }
    }
}

/// Outbound HTTP response operations used by the dispatcher
pub trait ResponseSink {
    fn status(&mut self, code: u16);
    fn set(&mut self, headers: &BTreeMap<String, String>);
    fn content_type(&mut self, media_type: &str);
    fn send(&mut self, payload: Payload);
}

/// Dispatcher with a configurable set of recognized markup kinds
#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    kinds: DocumentKinds,
}

impl Dispatcher {
    pub fn new(kinds: DocumentKinds) -> Self {
        Self { kinds }
    }

    pub fn kinds(&self) -> &DocumentKinds {
        &self.kinds
    }

    pub fn handle_success<S: ResponseSink + ?Sized>(&self, value: InvocationResult, sink: &mut S) {
        match value {
            InvocationResult::Structured(response) => {
                sink.status(response.status_code());
                if !response.headers().is_empty() {
                    sink.set(response.headers());
                }
                sink.send(Payload::from(response.body()));
            }
            InvocationResult::Markup(document) if self.kinds.contains(document.kind()) => {
                sink.status(200);
                sink.content_type(XML_MEDIA_TYPE);
                sink.send(Payload::Text(document.to_string()));
            }
            InvocationResult::Text(text) => {
                sink.status(200);
                sink.send(Payload::Text(text));
            }
            // Unknown markup kinds fall through like any other value.
            InvocationResult::Markup(document) => {
                sink.status(200);
                sink.send(Payload::Text(document.to_string()));
            }
            InvocationResult::Value(value) => {
                sink.status(200);
                sink.send(Payload::Json(value));
            }
        }
    }

    pub fn handle_error<S: ResponseSink + ?Sized>(&self, error: &anyhow::Error, sink: &mut S) {
        sink.status(500);
        sink.send(Payload::Text(format!("{:?}", error)));
    }
}

/// Dispatch a success value using the default markup kinds
pub fn handle_success<S: ResponseSink + ?Sized>(value: InvocationResult, sink: &mut S) {
    Dispatcher::default().handle_success(value, sink);
}

/// Dispatch a failure: status 500 with the error's trace as body
pub fn handle_error<S: ResponseSink + ?Sized>(error: &anyhow::Error, sink: &mut S) {
    Dispatcher::default().handle_error(error, sink);
}

/// Response sink backed by axum's response types
#[derive(Debug)]
pub struct HttpResponse {
    status: u16,
    headers: HeaderMap,
    content_type: Option<String>,
    payload: Payload,
}

impl Default for HttpResponse {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpResponse {
    pub fn new() -> Self {
        Self {
            status: 200,
            headers: HeaderMap::new(),
            content_type: None,
            payload: Payload::Empty,
        }
    }

    pub fn status_code(&self) -> u16 {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }
}

impl ResponseSink for HttpResponse {
    fn status(&mut self, code: u16) {
        self.status = code;
    }

    fn set(&mut self, headers: &BTreeMap<String, String>) {
        for (key, value) in headers {
            match (
                HeaderName::from_bytes(key.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    self.headers.insert(name, value);
                }
                _ => warn!(header = %key, "Dropping invalid response header"),
            }
        }
    }

    fn content_type(&mut self, media_type: &str) {
        self.content_type = Some(media_type.to_string());
    }

    fn send(&mut self, payload: Payload) {
        self.payload = payload;
    }
}

impl IntoResponse for HttpResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or_else(|_| {
            warn!(status = self.status, "Invalid status code, responding with 500");
            StatusCode::INTERNAL_SERVER_ERROR
        });

        let (default_type, body) = match self.payload {
            Payload::Empty => (None, Body::empty()),
            Payload::Text(text) => (Some("text/html; charset=utf-8"), Body::from(text)),
            Payload::Json(value) => (
                Some("application/json; charset=utf-8"),
                Body::from(serde_json::to_vec(&value).unwrap_or_default()),
            ),
        };

        let mut headers = self.headers;
        let content_type = self
            .content_type
            .and_then(|ct| HeaderValue::from_str(&ct).ok());
        match content_type {
            Some(value) => {
                headers.insert(header::CONTENT_TYPE, value);
            }
            None => {
                if let Some(default_type) = default_type {
                    if !headers.contains_key(header::CONTENT_TYPE) {
                        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(default_type));
                    }
                }
            }
        }

        let mut response = Response::new(body);
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        response
    }
}
