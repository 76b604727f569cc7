//! Polling for host errors left pending by a host call.
//!
//! JNI-style hosts report failures by leaving an exception pending on the
//! environment instead of returning an error. Every exception-capable host
//! call is followed by [`drain`], which clears the pending error before any
//! further handle is touched and turns it into a `Result`.

use crate::error::PendingException;

/// Host environments that can leave an error pending.
pub trait HostErrors {
    /// Return and clear the pending error, if any.
    fn take_pending(&self) -> Option<PendingException>;
}

/// Clear any pending host error, logging where it was observed.
pub fn drain<H: HostErrors + ?Sized>(host: &H, site: &str) -> Result<(), PendingException> {
    match host.take_pending() {
        Some(error) => {
            tracing::debug!(site, %error, "cleared pending host exception");
            Err(error)
        }
        None => Ok(()),
    }
}
