use hostbridge_core::{PendingException, SignatureError};
use hostbridge_registry::{BindError, CallbackError, LoadError, RegistrationError};
use thiserror::Error;

/// Any failure surfaced by the interop layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    Signature(#[from] SignatureError),

    #[error(transparent)]
    Registration(#[from] RegistrationError),

    #[error(transparent)]
    Bind(#[from] BindError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Callback(#[from] CallbackError),

    #[error(transparent)]
    Host(#[from] PendingException),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_keep_their_messages() {
        let error: Error = LoadError::EnvironmentUnavailable.into();
        assert_eq!(error.to_string(), "host environment unavailable");
        assert!(matches!(error, Error::Load(LoadError::EnvironmentUnavailable)));

        let error: Error = PendingException::with_message("boom").into();
        assert!(error.to_string().contains("boom"));
    }
}
