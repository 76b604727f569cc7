//! Error types shared across backends.

use thiserror::Error;

// ============================================================================
// Signature Errors
// ============================================================================

/// Errors raised while parsing a `Ret|P0|P1...` signature descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    /// The descriptor text was empty.
    #[error("empty signature descriptor")]
    Empty,

    /// A component between separators was empty.
    #[error("empty kind at position {index} in signature '{signature}'")]
    EmptyKind { signature: String, index: usize },

    /// `void` was used as a parameter kind.
    #[error("'void' is only valid as a return kind (position {index} in '{signature}')")]
    VoidParameter { signature: String, index: usize },
}

// ============================================================================
// Host Errors
// ============================================================================

/// A managed-side error that was pending after a host call and has been cleared.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("pending host exception{}", describe(.message))]
pub struct PendingException {
    /// Description reported by the host, when it provides one.
    pub message: Option<String>,
}

fn describe(message: &Option<String>) -> String {
    match message {
        Some(text) => format!(": {text}"),
        None => String::new(),
    }
}

impl PendingException {
    /// A pending exception the host did not describe.
    pub fn opaque() -> Self {
        Self { message: None }
    }

    /// A pending exception with a host-supplied description.
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
        }
    }
}
