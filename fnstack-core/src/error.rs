//! Runtime error types and formatting

use serde::Serialize;
use thiserror::Error;

/// Error codes surfaced by the fnstack HTTP layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    FunctionNotFound,
    AssetNotFound,
    PayloadTooLarge,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FunctionNotFound => "FunctionNotFound",
            Self::AssetNotFound => "AssetNotFound",
            Self::PayloadTooLarge => "PayloadTooLarge",
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            Self::FunctionNotFound | Self::AssetNotFound => 404,
            Self::PayloadTooLarge => 413,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error reported by the runtime outside of a function's own failure path
#[derive(Debug, Error)]
#[error("{code}: {message}")]
pub struct RuntimeError {
    pub code: ErrorCode,
    pub message: String,
    pub resource: Option<String>,
    pub request_id: String,
}

impl RuntimeError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            resource: None,
            request_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }

    pub fn http_status(&self) -> u16 {
        self.code.http_status()
    }

    /// Format as a JSON error body
    pub fn to_json(&self) -> String {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct JsonError<'a> {
            code: &'static str,
            message: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            resource: Option<&'a str>,
            request_id: &'a str,
        }

        let error = JsonError {
            code: self.code.as_str(),
            message: &self.message,
            resource: self.resource.as_deref(),
            request_id: &self.request_id,
        };

        serde_json::to_string(&error).unwrap_or_else(|_| {
            format!(r#"{{"code":"{}","message":"{}"}}"#, self.code.as_str(), self.message)
        })
    }
}
