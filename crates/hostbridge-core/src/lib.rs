//! Canonical value model shared by every hostbridge backend.
//!
//! This crate knows nothing about a particular managed runtime. It defines:
//!
//! - the canonical native kinds ([`types`], [`InteropString`], [`InteropBuffer`],
//!   [`InteropNumber`], [`Length`]),
//! - the conversion traits a backend implements for each kind ([`convert`]),
//! - the generic call invokers that turn an implementation function into a
//!   host-callable body ([`trampoline`]),
//! - signature descriptors ([`Signature`]) and pending host error polling ([`pending`]).
//!
//! Backends (`hostbridge-backends`) supply the host handles and the ABI shells.

pub mod buffer;
pub mod convert;
pub mod error;
pub mod length;
pub mod number;
pub mod pending;
pub mod signature;
pub mod string;
pub mod trampoline;
pub mod types;

pub use buffer::{InteropBuffer, ReturnBuffer};
pub use convert::{Backend, DirectFromHost, DirectToHost, FromHost, HostRef, ToHost};
pub use error::{PendingException, SignatureError};
pub use length::{Length, LengthKind, LengthUnit};
pub use number::{InteropNumber, NumberTag};
pub use pending::HostErrors;
pub use signature::Signature;
pub use string::InteropString;
pub use trampoline::{Invoke, InvokeDirect, InvokeWithContext};
pub use types::*;
