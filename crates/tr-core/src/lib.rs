//! Shared primitives used across Trellis crates.

/// Result alias used across the workspace.
pub type TrellisResult<T> = Result<T, TrellisError>;

/// Workspace error type.
///
/// `code` is a dotted identifier scoped by the crate that raised it
/// (`dom.node_not_found`, `css.selector_unsupported`, ...); `message` carries
/// the human readable detail.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct TrellisError {
    pub code: &'static str,
    pub message: String,
}

impl TrellisError {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Returns true when the error code lives under `namespace` (e.g. `"dom"`).
    pub fn is_in(&self, namespace: &str) -> bool {
        self.code
            .split_once('.')
            .is_some_and(|(prefix, _)| prefix == namespace)
    }
}

#[cfg(test)]
mod tests {
    use super::TrellisError;

    #[test]
    fn displays_code_and_message() {
        let error = TrellisError::new("dom.node_not_found", "node 42 is not part of this document");
        assert_eq!(
            error.to_string(),
            "dom.node_not_found: node 42 is not part of this document"
        );
    }

    #[test]
    fn matches_code_namespace() {
        let error = TrellisError::new("css.selector_empty", "selector text is empty");
        assert!(error.is_in("css"));
        assert!(!error.is_in("dom"));
        assert!(!TrellisError::new("plain", "no namespace").is_in("plain"));
    }
}
