//! The managed callback dispatcher resolved at load.
//!
//! Native code calls managed code through a single static method,
//! `int callCallbackFromNative(int kind, byte[] args, int length)`, found on
//! the interop module's class. The dispatcher is just that (class, method)
//! pair; every call supplies the host environment to call it with.

use hostbridge_core::PendingException;

use crate::error::CallbackError;

/// Host side of a dispatcher call.
pub trait CallbackHost {
    type Class: Copy;
    type Method: Copy;

    /// Call the static dispatcher method with a copy of `args`, returning its
    /// result. A managed exception is cleared and returned as an error.
    fn call_dispatcher(
        &self,
        class: Self::Class,
        method: Self::Method,
        kind: i32,
        args: &[u8],
    ) -> Result<i32, PendingException>;
}

/// Resolved dispatcher handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallbackDispatcher<C, M> {
    class: C,
    method: M,
}

impl<C: Copy, M: Copy> CallbackDispatcher<C, M> {
    pub fn new(class: C, method: M) -> Self {
        Self { class, method }
    }

    pub fn class(&self) -> C {
        self.class
    }

    pub fn method(&self) -> M {
        self.method
    }

    /// Call the dispatcher and wait for its result.
    pub fn call_sync<H>(&self, host: &H, kind: i32, args: &[u8]) -> Result<i32, CallbackError>
    where
        H: CallbackHost<Class = C, Method = M> + ?Sized,
    {
        if i32::try_from(args.len()).is_err() {
            return Err(CallbackError::BufferTooLarge { len: args.len() });
        }
        let result = host.call_dispatcher(self.class, self.method, kind, args)?;
        Ok(result)
    }

    /// Deliver a callback whose result nobody waits for.
    ///
    /// Failures are logged and returned; the managed result is discarded.
    pub fn post_async<H>(&self, host: &H, kind: i32, args: &[u8]) -> Result<(), CallbackError>
    where
        H: CallbackHost<Class = C, Method = M> + ?Sized,
    {
        self.call_sync(host, kind, args).map(drop).inspect_err(|error| {
            tracing::warn!(kind, %error, "async callback failed");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder {
        calls: RefCell<Vec<(u8, u8, i32, Vec<u8>)>>,
        fail: bool,
    }

    impl CallbackHost for Recorder {
        type Class = u8;
        type Method = u8;

        fn call_dispatcher(&self, class: u8, method: u8, kind: i32, args: &[u8]) -> Result<i32, PendingException> {
            self.calls.borrow_mut().push((class, method, kind, args.to_vec()));
            if self.fail {
                Err(PendingException::with_message("thrown"))
            } else {
                Ok(kind * 10)
            }
        }
    }

    #[test]
    fn sync_call_returns_managed_result() {
        let host = Recorder::default();
        let dispatcher = CallbackDispatcher::new(1, 2);
        assert_eq!(dispatcher.call_sync(&host, 4, &[1, 2]).unwrap(), 40);
        assert_eq!(host.calls.borrow()[0], (1, 2, 4, vec![1, 2]));
    }

    #[test]
    fn async_call_discards_result() {
        let host = Recorder::default();
        let dispatcher = CallbackDispatcher::new(1, 2);
        assert!(dispatcher.post_async(&host, 7, &[0; 12]).is_ok());
        let calls = host.calls.borrow();
        assert_eq!(calls[0].2, 7);
        assert_eq!(calls[0].3.len(), 12);
    }

    #[test]
    fn managed_exception_becomes_error() {
        let host = Recorder {
            fail: true,
            ..Recorder::default()
        };
        let dispatcher = CallbackDispatcher::new(1, 2);
        assert!(matches!(
            dispatcher.call_sync(&host, 1, &[]),
            Err(CallbackError::Managed(_))
        ));
        assert!(dispatcher.post_async(&host, 1, &[]).is_err());
    }
}
