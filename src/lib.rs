//! Native interop between managed host runtimes and Rust implementations.
//!
//! `hostbridge` lets one set of native functions be exported to several
//! managed runtimes at once: JNI, ArkTS (ETS and ANI), JavaScriptCore and
//! WebAssembly. Every export is written once against the canonical kinds in
//! [`core`] and declared per backend with the backend's `*_exports!` macro,
//! which emits the host-ABI shell and a registrar. At load time the backend
//! binds the registrars' [`Exports`](registry::Exports) and resolves the
//! managed callback dispatcher.
//!
//! ```ignore
//! use hostbridge::prelude::*;
//!
//! fn answer() -> KInt {
//!     42
//! }
//!
//! hostbridge::jni_exports! {
//!     env: MyEnv,
//!     module: TestNativeModule,
//!     registrar: register_test,
//!     exports: {
//!         fn GetAnswer() -> KInt = answer;
//!     }
//! }
//!
//! hostbridge::jni_on_load!(vm: MyVm, registrars: [register_test]);
//! ```

pub use hostbridge_backends as backends;
pub use hostbridge_core as core;
pub use hostbridge_registry as registry;

pub use hostbridge_backends::{HostVm, Loaded};

#[cfg(feature = "ani")]
pub use hostbridge_backends::{ani, ani_exports, ani_on_load};
#[cfg(feature = "ets")]
pub use hostbridge_backends::{ets, ets_exports, ets_on_load};
#[cfg(feature = "jni")]
pub use hostbridge_backends::{jni, jni_exports, jni_on_load};
#[cfg(feature = "jsc")]
pub use hostbridge_backends::{jsc, jsc_exports, jsc_init_exports};
#[cfg(feature = "wasm")]
pub use hostbridge_backends::{wasm, wasm_exports};
#[cfg(feature = "sim")]
pub use hostbridge_backends::sim;

mod error;

pub use error::{Error, Result};

pub mod prelude {
    pub use hostbridge_core::types::*;
    pub use hostbridge_core::{
        FromHost, InteropBuffer, InteropNumber, InteropString, Length, LengthKind, LengthUnit, ReturnBuffer,
        Signature, ToHost,
    };
    pub use hostbridge_registry::callbacks::{self, CallbackSink};
    pub use hostbridge_registry::{
        CallbackDispatcher, ExportFlags, Exports, ExportsBuilder, LoadReport, LoadState, LoaderConfig, Registrar,
    };

    pub use crate::{Error, HostVm, Loaded, Result};
}
