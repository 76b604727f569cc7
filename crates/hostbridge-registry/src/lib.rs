//! Export tables, the native-module binder and the callback dispatcher.
//!
//! # Lifecycle
//!
//! ```text
//!  registrars ──► ExportsBuilder ──build()──► Exports (immutable)
//!                                               │
//!                         backend loader ──► binder::load(host, &exports, &config)
//!                                               │
//!                          ┌────────────────────┴────────────────────┐
//!                          ▼                                         ▼
//!                   bound natives                          CallbackDispatcher
//!                 (per module class)                  (callCallbackFromNative)
//! ```
//!
//! Everything here is backend-neutral. A backend provides a [`BindingHost`]
//! for class lookup and native registration, and a [`CallbackHost`] for
//! invoking the managed dispatcher method.

pub mod binder;
pub mod callbacks;
pub mod classpath;
pub mod config;
pub mod descriptor;
pub mod dispatcher;
pub mod error;
pub mod exports;

pub use binder::{BindingHost, LoadReport, LoadState, ModuleReport, NativeKind, NativeMethod, load};
pub use callbacks::{AttachHost, AttachedDispatcher, CallbackSink};
pub use classpath::{ClasspathTable, INTEROP_NATIVE_MODULE};
pub use config::LoaderConfig;
pub use descriptor::DescriptorStyle;
pub use dispatcher::{CallbackDispatcher, CallbackHost};
pub use error::{BindError, CallbackError, LoadError, RegistrationError};
pub use exports::{ExportFlags, ExportRecord, Exports, ExportsBuilder, NativeEntry, Registrar};
