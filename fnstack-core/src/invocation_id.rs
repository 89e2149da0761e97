//! Invocation ID generation

use uuid::Uuid;

/// Identifier attached to every function invocation for log correlation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationId(String);

impl InvocationId {
    /// Generate a new invocation ID
    pub fn new() -> Self {
        Self(Uuid::new_v4().simple().to_string().to_uppercase())
    }

    /// Create an invocation ID with a specific value (for testing)
    pub fn with_id(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for InvocationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for InvocationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_id_generation() {
        let id1 = InvocationId::new();
        let id2 = InvocationId::new();

        assert_ne!(id1, id2);
        assert_eq!(id1.as_str().len(), 32);
        assert!(id1
            .as_str()
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn test_invocation_id_with_id() {
        let id = InvocationId::with_id("test-id-123");
        assert_eq!(id.to_string(), "test-id-123");
    }
}
