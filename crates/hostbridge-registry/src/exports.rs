//! The export table: module name → ordered export records.
//!
//! Records are added through [`ExportsBuilder`] before load, usually by the
//! registrar functions the `*_exports!` macros generate. [`ExportsBuilder::build`]
//! freezes the table into [`Exports`], which the binder only ever reads.
//!
//! # Usage
//!
//! ```ignore
//! let mut builder = ExportsBuilder::new();
//! builder.register(register_interop_module);
//! builder.set_classpath("InteropNativeModule", "my/app/InteropNativeModule")?;
//! let exports = builder.build();
//! ```

use std::ffi::c_void;
use std::fmt;

use bitflags::bitflags;
use rustc_hash::FxHashMap;

use hostbridge_core::{Signature, SignatureError};

use crate::error::RegistrationError;

bitflags! {
    /// Calling-convention variant of an export.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ExportFlags: u32 {
        /// The implementation receives the caller's VM context first.
        const CONTEXT = 1 << 0;
        /// The trampoline takes no host environment at all.
        const DIRECT = 1 << 1;
    }
}

/// Address of a trampoline, as handed to the host's registration API.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeEntry(*const c_void);

// SAFETY: a code address is immutable and valid on every thread.
unsafe impl Send for NativeEntry {}
// SAFETY: see above.
unsafe impl Sync for NativeEntry {}

impl NativeEntry {
    pub fn new(ptr: *const c_void) -> Self {
        Self(ptr)
    }

    pub fn as_ptr(self) -> *const c_void {
        self.0
    }
}

impl fmt::Debug for NativeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeEntry({:p})", self.0)
    }
}

/// One exported native function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRecord {
    name: String,
    signature: String,
    entry: NativeEntry,
    flags: ExportFlags,
}

impl ExportRecord {
    pub fn new(
        name: impl Into<String>,
        signature: impl Into<String>,
        entry: NativeEntry,
        flags: ExportFlags,
    ) -> Self {
        Self {
            name: name.into(),
            signature: signature.into(),
            entry,
            flags,
        }
    }

    /// Exported name, as the managed side declares it.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw `Ret|P0|...` descriptor text.
    pub fn signature_text(&self) -> &str {
        &self.signature
    }

    /// Parsed descriptor. Parsing is deferred so one malformed record only
    /// fails its own binding.
    pub fn signature(&self) -> Result<Signature, SignatureError> {
        Signature::parse(&self.signature)
    }

    pub fn entry(&self) -> NativeEntry {
        self.entry
    }

    pub fn flags(&self) -> ExportFlags {
        self.flags
    }
}

/// A function that adds one module's exports to a builder.
pub type Registrar = fn(&mut ExportsBuilder);

// ============================================================================
// Builder
// ============================================================================

/// Mutable export table used before load.
#[derive(Debug, Default)]
pub struct ExportsBuilder {
    /// Module names in first-registration order
    order: Vec<String>,
    /// Records per module, in registration order
    methods: FxHashMap<String, Vec<ExportRecord>>,
    /// Explicit classpaths, first caller wins
    classpaths: FxHashMap<String, String>,
}

impl ExportsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run a registrar against this builder.
    pub fn register(&mut self, registrar: Registrar) -> &mut Self {
        registrar(self);
        self
    }

    /// Append an export record. Duplicates are not filtered.
    pub fn add_method(
        &mut self,
        module: &str,
        name: &str,
        signature: &str,
        entry: NativeEntry,
        flags: ExportFlags,
    ) -> &mut Self {
        self.add_record(module, ExportRecord::new(name, signature, entry, flags))
    }

    pub fn add_record(&mut self, module: &str, record: ExportRecord) -> &mut Self {
        tracing::trace!(module, name = record.name(), signature = record.signature_text(), "export added");
        match self.methods.get_mut(module) {
            Some(records) => records.push(record),
            None => {
                self.order.push(module.to_string());
                self.methods.insert(module.to_string(), vec![record]);
            }
        }
        self
    }

    /// Set the classpath used to find `module`'s class.
    ///
    /// The first call wins. Repeating the same value is accepted; a different
    /// value is logged and rejected.
    pub fn set_classpath(&mut self, module: &str, classpath: &str) -> Result<(), RegistrationError> {
        match self.classpaths.get(module) {
            Some(existing) if existing == classpath => Ok(()),
            Some(existing) => {
                tracing::warn!(
                    module,
                    existing = existing.as_str(),
                    rejected = classpath,
                    "classpath redefinition ignored"
                );
                Err(RegistrationError::ClasspathRedefinition {
                    module: module.to_string(),
                    existing: existing.clone(),
                    rejected: classpath.to_string(),
                })
            }
            None => {
                self.classpaths.insert(module.to_string(), classpath.to_string());
                Ok(())
            }
        }
    }

    pub fn classpath(&self, module: &str) -> Option<&str> {
        self.classpaths.get(module).map(String::as_str)
    }

    pub fn build(self) -> Exports {
        Exports {
            order: self.order,
            methods: self.methods,
            classpaths: self.classpaths,
        }
    }
}

// ============================================================================
// Frozen table
// ============================================================================

/// Immutable export table read by the binder.
pub struct Exports {
    order: Vec<String>,
    methods: FxHashMap<String, Vec<ExportRecord>>,
    classpaths: FxHashMap<String, String>,
}

impl fmt::Debug for Exports {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Exports")
            .field("modules", &self.order)
            .field("records", &format!("<{} records>", self.record_count()))
            .field("classpaths", &self.classpaths)
            .finish()
    }
}

impl Exports {
    /// Build a table from registrars in order.
    pub fn from_registrars(registrars: &[Registrar]) -> Self {
        let mut builder = ExportsBuilder::new();
        for registrar in registrars {
            builder.register(*registrar);
        }
        builder.build()
    }

    /// Modules with at least one export, in first-registration order.
    pub fn modules(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn methods(&self, module: &str) -> &[ExportRecord] {
        self.methods.get(module).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn find(&self, module: &str, name: &str) -> Option<&ExportRecord> {
        self.methods(module).iter().find(|record| record.name() == name)
    }

    /// Explicitly registered classpath for `module`.
    pub fn classpath(&self, module: &str) -> Option<&str> {
        self.classpaths.get(module).map(String::as_str)
    }

    pub fn record_count(&self) -> usize {
        self.methods.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
