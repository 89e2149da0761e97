//! Values a function can hand back through its callback

use crate::response::Response;
use crate::twiml::MarkupDocument;
use serde_json::Value;
use std::sync::Arc;

/// The closed set of result shapes the dispatcher understands
#[derive(Debug, Clone)]
pub enum InvocationResult {
    /// Sent verbatim
    Text(String),
    /// XML document such as a `VoiceResponse`
    Markup(Arc<dyn MarkupDocument>),
    /// Explicit status, headers and body
    Structured(Response),
    /// Anything else, JSON-encoded by the transport
    Value(Value),
}

impl InvocationResult {
    pub fn markup<T: MarkupDocument + 'static>(document: T) -> Self {
        Self::Markup(Arc::new(document))
    }
}

impl From<String> for InvocationResult {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for InvocationResult {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Response> for InvocationResult {
    fn from(response: Response) -> Self {
        Self::Structured(response)
    }
}

// A JSON string is still a string.
impl From<Value> for InvocationResult {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => Self::Text(text),
            other => Self::Value(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_string_becomes_text() {
        assert!(matches!(InvocationResult::from(json!("Yay")), InvocationResult::Text(t) if t == "Yay"));
        assert!(matches!(InvocationResult::from(json!([1, 2])), InvocationResult::Value(_)));
    }

    #[test]
    fn test_response_becomes_structured() {
        let mut response = Response::new();
        response.set_status_code(201);
        assert!(matches!(
            InvocationResult::from(response),
            InvocationResult::Structured(r) if r.status_code() == 201
        ));
    }
}
