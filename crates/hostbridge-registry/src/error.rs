//! Error types for registration, binding, loading and callbacks.

use hostbridge_core::{PendingException, SignatureError};
use thiserror::Error;

use crate::binder::NativeKind;

// ============================================================================
// Registration
// ============================================================================

/// Errors raised while populating the export table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// A module's classpath was already set to a different value.
    #[error("classpath for module '{module}' is already '{existing}', ignoring '{rejected}'")]
    ClasspathRedefinition {
        module: String,
        existing: String,
        rejected: String,
    },
}

// ============================================================================
// Binding
// ============================================================================

/// Failure to bind a single export. Never stops the rest of the module.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    /// The export's descriptor could not be parsed.
    #[error("malformed signature: {0}")]
    Signature(#[from] SignatureError),

    /// A kind spelling has no host type code.
    #[error("unknown kind '{kind}' in signature '{signature}'")]
    UnknownKind { kind: String, signature: String },

    /// The host has no registration call for this native kind.
    #[error("host cannot register '{name}' as a {kind:?} native")]
    UnsupportedKind { name: String, kind: NativeKind },

    /// The host refused the registration.
    #[error("host rejected native '{name}' with status {status}")]
    Rejected { name: String, status: i32 },

    /// The host left an error pending after the registration call.
    #[error("host error while binding: {0}")]
    PendingException(#[from] PendingException),
}

impl BindError {
    pub fn unknown_kind(kind: impl Into<String>, signature: impl Into<String>) -> Self {
        BindError::UnknownKind {
            kind: kind.into(),
            signature: signature.into(),
        }
    }
}

// ============================================================================
// Loading
// ============================================================================

/// Fatal load-time failures. Any of these aborts the whole load.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// Neither an explicit registration nor the default table names a classpath.
    #[error("no classpath known for module '{module}'")]
    NoClasspath { module: String },

    /// The interop module's class could not be found.
    #[error("interop module '{module}' not found at classpath '{classpath}'")]
    InteropModuleMissing { module: String, classpath: String },

    /// The callback dispatcher method could not be resolved.
    #[error("callback dispatcher {method}{descriptor} not found on '{classpath}'")]
    DispatcherUnresolved {
        classpath: String,
        method: String,
        descriptor: String,
    },

    /// The host environment could not be obtained.
    #[error("host environment unavailable")]
    EnvironmentUnavailable,
}

// ============================================================================
// Callbacks
// ============================================================================

/// Errors from calling back into managed code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallbackError {
    /// No process-wide callback sink has been installed.
    #[error("callback dispatcher not installed")]
    NotInstalled,

    /// A callback sink was already installed.
    #[error("callback dispatcher already installed")]
    AlreadyInstalled,

    /// No host environment could be attached to the current thread.
    #[error("no host environment attached to the current thread")]
    NotAttached,

    /// The argument buffer does not fit the dispatcher's length parameter.
    #[error("callback argument buffer of {len} bytes is too large")]
    BufferTooLarge { len: usize },

    /// The managed dispatcher threw.
    #[error("managed callback failed: {0}")]
    Managed(#[from] PendingException),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redefinition_names_both_classpaths() {
        let err = RegistrationError::ClasspathRedefinition {
            module: "M".into(),
            existing: "a/B".into(),
            rejected: "c/D".into(),
        };
        let text = err.to_string();
        assert!(text.contains("a/B"));
        assert!(text.contains("c/D"));
    }

    #[test]
    fn bind_error_from_signature() {
        let err: BindError = SignatureError::Empty.into();
        assert!(matches!(err, BindError::Signature(SignatureError::Empty)));
        assert!(err.to_string().contains("malformed"));
    }

    #[test]
    fn dispatcher_error_display() {
        let err = LoadError::DispatcherUnresolved {
            classpath: "x/Y".into(),
            method: "callCallbackFromNative".into(),
            descriptor: "(I[BI)I".into(),
        };
        assert_eq!(
            err.to_string(),
            "callback dispatcher callCallbackFromNative(I[BI)I not found on 'x/Y'"
        );
    }
}
