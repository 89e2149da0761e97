//! Event construction from inbound HTTP requests
//!
//! The event handed to a function is the union of the query parameters and
//! the request body. Body values win when both carry the same key.

use serde::Serialize;
use serde_json::{Map, Value};
use std::ops::Deref;

/// Flat key/value payload passed to an invoked function.
///
/// Read-only once constructed; it derefs to the underlying map for lookups.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Event(Map<String, Value>);

impl Event {
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Look up a string value by key
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl Deref for Event {
    type Target = Map<String, Value>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl PartialEq<Value> for Event {
    fn eq(&self, other: &Value) -> bool {
        other.as_object().is_some_and(|map| map == &self.0)
    }
}

/// The two key/value sources of an inbound request. Either may be absent.
#[derive(Debug, Clone, Default)]
pub struct InboundRequest {
    pub query: Option<Map<String, Value>>,
    pub body: Option<Map<String, Value>>,
}

impl InboundRequest {
    pub fn new(query: Option<Map<String, Value>>, body: Option<Map<String, Value>>) -> Self {
        Self { query, body }
    }

    /// Build the request sources from raw HTTP parts.
    ///
    /// JSON object bodies and form-encoded bodies are understood. Any other
    /// body, including malformed JSON, is treated as empty.
    pub fn from_parts(query_string: Option<&str>, content_type: Option<&str>, body: &[u8]) -> Self {
        let query = query_string
            .filter(|q| !q.is_empty())
            .map(|q| parse_form(q.as_bytes()));

        let body = if body.is_empty() {
            None
        } else {
            match media_type(content_type).as_deref() {
                Some("application/x-www-form-urlencoded") => Some(parse_form(body)),
                Some(mime) if mime == "application/json" || mime.ends_with("+json") => {
                    match serde_json::from_slice::<Value>(body) {
                        Ok(Value::Object(map)) => Some(map),
                        _ => None,
                    }
                }
                _ => None,
            }
        };

        Self { query, body }
    }
}

/// Merge query and body into an event. Body entries overwrite query entries.
pub fn construct_event(request: &InboundRequest) -> Event {
    let mut event = Map::new();
    for source in [&request.query, &request.body].into_iter().flatten() {
        for (key, value) in source {
            event.insert(key.clone(), value.clone());
        }
    }
    Event(event)
}

// Repeated keys keep the last occurrence.
fn parse_form(input: &[u8]) -> Map<String, Value> {
    form_urlencoded::parse(input)
        .map(|(key, value)| (key.into_owned(), Value::String(value.into_owned())))
        .collect()
}

fn media_type(content_type: Option<&str>) -> Option<String> {
    content_type
        .and_then(|ct| ct.split(';').next())
        .map(|mime| mime.trim().to_ascii_lowercase())
        .filter(|mime| !mime.is_empty())
}
