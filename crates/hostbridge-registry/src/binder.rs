//! Load-time binding of export records to host classes.
//!
//! [`load`] runs once per VM attachment:
//!
//! 1. resolve the interop module's class (fatal if missing),
//! 2. resolve the callback dispatcher on it (fatal if missing),
//! 3. bind the interop module's exports,
//! 4. bind every other module in name order; a module whose class is missing
//!    is skipped, and a record that fails to bind only fails itself.
//!
//! Pending host errors are drained after every class lookup, method lookup
//! and registration so no error leaks into the next host call.

use hostbridge_core::pending::{self, HostErrors};

use crate::classpath::default_for;
use crate::config::LoaderConfig;
use crate::descriptor::DescriptorStyle;
use crate::dispatcher::CallbackDispatcher;
use crate::error::{BindError, LoadError};
use crate::exports::{ExportFlags, ExportRecord, Exports, NativeEntry};

/// How the host should treat a bound native.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeKind {
    /// Full native frame; required for exports that receive the VM context.
    Normal,
    /// Lightweight native frame; no managed allocation expected.
    Fast,
    /// No environment at all.
    Critical,
}

impl NativeKind {
    pub fn from_flags(flags: ExportFlags) -> Self {
        if flags.contains(ExportFlags::DIRECT) {
            NativeKind::Critical
        } else if flags.contains(ExportFlags::CONTEXT) {
            NativeKind::Normal
        } else {
            NativeKind::Fast
        }
    }
}

/// One registration request handed to the host.
#[derive(Debug, Clone, Copy)]
pub struct NativeMethod<'a> {
    pub name: &'a str,
    pub descriptor: &'a str,
    pub entry: NativeEntry,
    pub kind: NativeKind,
}

/// Host operations the binder needs.
pub trait BindingHost: HostErrors {
    type Class: Copy;
    type Method: Copy;

    const STYLE: DescriptorStyle;

    /// Built-in module → classpath table.
    const DEFAULT_CLASSPATHS: &'static [(&'static str, &'static str)];

    fn find_class(&self, classpath: &str) -> Option<Self::Class>;

    /// Promote a class handle so it outlives the current frame.
    fn retain_class(&self, class: Self::Class) -> Self::Class {
        class
    }

    fn find_static_method(&self, class: Self::Class, name: &str, descriptor: &str) -> Option<Self::Method>;

    /// Whether the host can register a native of this kind with a matching
    /// calling convention.
    fn supports_kind(&self, kind: NativeKind) -> bool {
        let _ = kind;
        true
    }

    /// Register one native; `Err` carries the host status code.
    fn bind_native(&self, class: Self::Class, method: &NativeMethod<'_>) -> Result<(), i32>;
}

/// Binding progress of a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Unloaded,
    ModulesResolving,
    ClassResolved,
    ClassMissing,
    MethodsBinding,
    Bound,
    InteropModuleMissing,
    DispatcherUnresolved,
}

/// Outcome for one module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleReport {
    pub module: String,
    pub classpath: String,
    pub state: LoadState,
    pub bound: Vec<String>,
    pub failed: Vec<(String, BindError)>,
}

impl ModuleReport {
    fn new(module: &str, classpath: &str) -> Self {
        Self {
            module: module.to_string(),
            classpath: classpath.to_string(),
            state: LoadState::ModulesResolving,
            bound: Vec::new(),
            failed: Vec::new(),
        }
    }
}

/// Result of a successful load.
#[derive(Debug, Clone)]
pub struct LoadReport<C, M> {
    pub modules: Vec<ModuleReport>,
    pub dispatcher: CallbackDispatcher<C, M>,
}

impl<C, M> LoadReport<C, M> {
    pub fn module(&self, name: &str) -> Option<&ModuleReport> {
        self.modules.iter().find(|report| report.module == name)
    }

    pub fn bound_count(&self) -> usize {
        self.modules.iter().map(|report| report.bound.len()).sum()
    }

    pub fn failed_count(&self) -> usize {
        self.modules.iter().map(|report| report.failed.len()).sum()
    }
}

impl LoadError {
    /// Terminal state this failure leaves the load in.
    pub fn state(&self) -> LoadState {
        match self {
            LoadError::InteropModuleMissing { .. } | LoadError::NoClasspath { .. } => {
                LoadState::InteropModuleMissing
            }
            LoadError::DispatcherUnresolved { .. } => LoadState::DispatcherUnresolved,
            LoadError::EnvironmentUnavailable => LoadState::Unloaded,
        }
    }
}

/// Resolve a module's classpath: explicit registration, then configuration,
/// then the host's defaults.
pub fn resolve_classpath<'a, H: BindingHost>(
    exports: &'a Exports,
    config: &'a LoaderConfig,
    module: &str,
) -> Option<&'a str> {
    exports
        .classpath(module)
        .or_else(|| config.classpaths.get(module))
        .or_else(|| default_for(H::DEFAULT_CLASSPATHS, module))
}

/// Bind every export and resolve the callback dispatcher.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn load<H: BindingHost>(
    host: &H,
    exports: &Exports,
    config: &LoaderConfig,
) -> Result<LoadReport<H::Class, H::Method>, LoadError> {
    let interop = config.interop_module.as_str();
    tracing::debug!(modules = exports.record_count(), interop, "binding native modules");

    let interop_classpath = resolve_classpath::<H>(exports, config, interop).ok_or_else(|| {
        tracing::error!(module = interop, "no classpath for interop module");
        LoadError::NoClasspath {
            module: interop.to_string(),
        }
    })?;

    let interop_class = find_class(host, interop_classpath).ok_or_else(|| {
        tracing::error!(module = interop, classpath = interop_classpath, "interop module class not found");
        LoadError::InteropModuleMissing {
            module: interop.to_string(),
            classpath: interop_classpath.to_string(),
        }
    })?;
    let interop_class = host.retain_class(interop_class);

    let descriptor = config
        .dispatcher_descriptor
        .as_deref()
        .unwrap_or_else(|| H::STYLE.dispatcher_descriptor());
    let method = host.find_static_method(interop_class, &config.dispatcher_method, descriptor);
    let method = match (method, pending::drain(host, "dispatcher lookup")) {
        (Some(method), Ok(())) => method,
        _ => {
            tracing::error!(
                classpath = interop_classpath,
                method = config.dispatcher_method.as_str(),
                descriptor,
                "callback dispatcher not found"
            );
            return Err(LoadError::DispatcherUnresolved {
                classpath: interop_classpath.to_string(),
                method: config.dispatcher_method.clone(),
                descriptor: descriptor.to_string(),
            });
        }
    };
    let dispatcher = CallbackDispatcher::new(interop_class, method);

    // Every classpath is resolved before anything binds.
    let mut others = Vec::new();
    for module in exports.modules().filter(|module| *module != interop) {
        let classpath = resolve_classpath::<H>(exports, config, module).ok_or_else(|| {
            tracing::error!(module, "no classpath for module");
            LoadError::NoClasspath {
                module: module.to_string(),
            }
        })?;
        others.push((module, classpath));
    }
    others.sort_unstable();

    let mut modules = Vec::new();
    let mut report = ModuleReport::new(interop, interop_classpath);
    report.state = LoadState::ClassResolved;
    bind_module(host, interop_class, exports.methods(interop), &mut report);
    modules.push(report);

    for (module, classpath) in others {
        let mut report = ModuleReport::new(module, classpath);

        match find_class(host, classpath) {
            Some(class) => {
                report.state = LoadState::ClassResolved;
                bind_module(host, class, exports.methods(module), &mut report);
            }
            None => {
                tracing::warn!(module, classpath, "module class not found, skipping");
                report.state = LoadState::ClassMissing;
            }
        }
        modules.push(report);
    }

    tracing::debug!(
        bound = modules.iter().map(|m| m.bound.len()).sum::<usize>(),
        failed = modules.iter().map(|m| m.failed.len()).sum::<usize>(),
        "native modules bound"
    );
    Ok(LoadReport { modules, dispatcher })
}

fn find_class<H: BindingHost>(host: &H, classpath: &str) -> Option<H::Class> {
    let class = host.find_class(classpath);
    match pending::drain(host, "class lookup") {
        Ok(()) => class,
        Err(_) => None,
    }
}

#[cfg_attr(feature = "profiling", profiling::function)]
fn bind_module<H: BindingHost>(host: &H, class: H::Class, records: &[ExportRecord], report: &mut ModuleReport) {
    report.state = LoadState::MethodsBinding;
    for record in records {
        match bind_record(host, class, record) {
            Ok(()) => report.bound.push(record.name().to_string()),
            Err(error) => {
                tracing::warn!(
                    module = report.module.as_str(),
                    name = record.name(),
                    signature = record.signature_text(),
                    %error,
                    "failed to bind native"
                );
                report.failed.push((record.name().to_string(), error));
            }
        }
    }
    report.state = LoadState::Bound;
}

fn bind_record<H: BindingHost>(host: &H, class: H::Class, record: &ExportRecord) -> Result<(), BindError> {
    let signature = record.signature()?;
    let descriptor = H::STYLE.method_descriptor(&signature)?;
    let method = NativeMethod {
        name: record.name(),
        descriptor: &descriptor,
        entry: record.entry(),
        kind: NativeKind::from_flags(record.flags()),
    };
    if !host.supports_kind(method.kind) {
        return Err(BindError::UnsupportedKind {
            name: record.name().to_string(),
            kind: method.kind,
        });
    }
    let status = host.bind_native(class, &method);
    pending::drain(host, "native registration")?;
    status.map_err(|status| BindError::Rejected {
        name: record.name().to_string(),
        status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exports::ExportsBuilder;
    use hostbridge_core::PendingException;
    use std::cell::RefCell;
    use std::ffi::c_void;

    /// Host with a fixed set of classes; records every bind request.
    #[derive(Default)]
    struct FakeHost {
        classes: Vec<&'static str>,
        has_dispatcher: bool,
        reject: Vec<&'static str>,
        bound: RefCell<Vec<(u32, String, String, NativeKind)>>,
        pending: RefCell<Option<PendingException>>,
        throw_on_bind: Vec<&'static str>,
        unsupported: Vec<NativeKind>,
    }

    impl HostErrors for FakeHost {
        fn take_pending(&self) -> Option<PendingException> {
            self.pending.borrow_mut().take()
        }
    }

    impl BindingHost for FakeHost {
        type Class = u32;
        type Method = u32;

        const STYLE: DescriptorStyle = DescriptorStyle::Jni;
        const DEFAULT_CLASSPATHS: &'static [(&'static str, &'static str)] =
            &[("InteropNativeModule", "test/Interop"), ("Other", "test/Other")];

        fn find_class(&self, classpath: &str) -> Option<u32> {
            self.classes.iter().position(|c| *c == classpath).map(|i| i as u32)
        }

        fn find_static_method(&self, _class: u32, name: &str, descriptor: &str) -> Option<u32> {
            (self.has_dispatcher && name == "callCallbackFromNative" && descriptor == "(I[BI)I").then_some(99)
        }

        fn supports_kind(&self, kind: NativeKind) -> bool {
            !self.unsupported.contains(&kind)
        }

        fn bind_native(&self, class: u32, method: &NativeMethod<'_>) -> Result<(), i32> {
            if self.throw_on_bind.iter().any(|n| *n == method.name) {
                *self.pending.borrow_mut() = Some(PendingException::with_message("NoSuchMethodError"));
                return Err(-1);
            }
            if self.reject.iter().any(|n| *n == method.name) {
                return Err(-2);
            }
            self.bound.borrow_mut().push((
                class,
                method.name.to_string(),
                method.descriptor.to_string(),
                method.kind,
            ));
            Ok(())
        }
    }

    fn entry() -> NativeEntry {
        NativeEntry::new(0x1000 as *const c_void)
    }

    fn healthy_host() -> FakeHost {
        FakeHost {
            classes: vec!["test/Interop", "test/Other"],
            has_dispatcher: true,
            ..FakeHost::default()
        }
    }

    fn sample_exports() -> Exports {
        let mut builder = ExportsBuilder::new();
        builder
            .add_method("Other", "_Answer", "KInt", entry(), ExportFlags::empty())
            .add_method("InteropNativeModule", "_Echo", "KInt|KInt", entry(), ExportFlags::CONTEXT)
            .add_method("InteropNativeModule", "_Raw", "KInt|KInt", entry(), ExportFlags::DIRECT);
        builder.build()
    }

    #[test]
    fn binds_interop_module_first() {
        let host = healthy_host();
        let report = load(&host, &sample_exports(), &LoaderConfig::default()).unwrap();
        let bound = host.bound.borrow();
        let names: Vec<_> = bound.iter().map(|b| b.1.as_str()).collect();
        assert_eq!(names, vec!["_Echo", "_Raw", "_Answer"]);
        assert_eq!(bound[0].2, "(I)I");
        assert_eq!(bound[0].3, NativeKind::Normal);
        assert_eq!(bound[1].3, NativeKind::Critical);
        assert_eq!(bound[2].3, NativeKind::Fast);
        assert_eq!(report.bound_count(), 3);
        assert_eq!(report.dispatcher.method(), 99);
        assert_eq!(report.module("Other").unwrap().state, LoadState::Bound);
    }

    #[test]
    fn missing_interop_class_is_fatal() {
        let host = FakeHost {
            classes: vec!["test/Other"],
            has_dispatcher: true,
            ..FakeHost::default()
        };
        let err = load(&host, &sample_exports(), &LoaderConfig::default()).unwrap_err();
        assert!(matches!(err, LoadError::InteropModuleMissing { .. }));
        assert!(host.bound.borrow().is_empty());
    }

    #[test]
    fn missing_dispatcher_is_fatal() {
        let host = FakeHost {
            has_dispatcher: false,
            ..healthy_host()
        };
        let err = load(&host, &sample_exports(), &LoaderConfig::default()).unwrap_err();
        assert!(matches!(err, LoadError::DispatcherUnresolved { .. }));
        assert_eq!(err.state(), LoadState::DispatcherUnresolved);
        assert!(host.bound.borrow().is_empty());
    }

    #[test]
    fn missing_class_skips_module() {
        let host = FakeHost {
            classes: vec!["test/Interop"],
            ..healthy_host()
        };
        let report = load(&host, &sample_exports(), &LoaderConfig::default()).unwrap();
        assert_eq!(report.module("Other").unwrap().state, LoadState::ClassMissing);
        assert_eq!(report.bound_count(), 2);
    }

    #[test]
    fn bad_records_fail_alone() {
        let mut builder = ExportsBuilder::new();
        builder
            .add_method("Other", "_A", "KInt", entry(), ExportFlags::empty())
            .add_method("Other", "_B", "KInt||", entry(), ExportFlags::empty())
            .add_method("Other", "_C", "KInt|KWhatever", entry(), ExportFlags::empty())
            .add_method("Other", "_D", "KInt", entry(), ExportFlags::empty())
            .add_method("Other", "_E", "KInt", entry(), ExportFlags::empty())
            .add_method("Other", "_F", "void", entry(), ExportFlags::empty());
        let host = FakeHost {
            reject: vec!["_D"],
            throw_on_bind: vec!["_E"],
            ..healthy_host()
        };
        let report = load(&host, &builder.build(), &LoaderConfig::default()).unwrap();
        let other = report.module("Other").unwrap();
        assert_eq!(other.bound, vec!["_A", "_F"]);
        let failures: Vec<_> = other.failed.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(failures, vec!["_B", "_C", "_D", "_E"]);
        assert!(matches!(other.failed[0].1, BindError::Signature(_)));
        assert!(matches!(other.failed[1].1, BindError::UnknownKind { .. }));
        assert!(matches!(other.failed[2].1, BindError::Rejected { status: -2, .. }));
        assert!(matches!(other.failed[3].1, BindError::PendingException(_)));
        assert!(host.pending.borrow().is_none());
    }

    #[test]
    fn unsupported_kinds_are_never_registered() {
        let host = FakeHost {
            unsupported: vec![NativeKind::Critical],
            ..healthy_host()
        };
        let report = load(&host, &sample_exports(), &LoaderConfig::default()).unwrap();
        let names: Vec<_> = host.bound.borrow().iter().map(|b| b.1.clone()).collect();
        assert_eq!(names, vec!["_Echo", "_Answer"]);
        let interop = report.module("InteropNativeModule").unwrap();
        assert_eq!(
            interop.failed,
            vec![(
                "_Raw".to_string(),
                BindError::UnsupportedKind {
                    name: "_Raw".into(),
                    kind: NativeKind::Critical,
                }
            )]
        );
    }

    #[test]
    fn explicit_classpath_beats_defaults() {
        let mut builder = ExportsBuilder::new();
        builder.add_method("Other", "_A", "KInt", entry(), ExportFlags::empty());
        builder.set_classpath("InteropNativeModule", "wrong/Interop").unwrap();
        let host = healthy_host();
        let err = load(&host, &builder.build(), &LoaderConfig::default()).unwrap_err();
        assert_eq!(
            err,
            LoadError::InteropModuleMissing {
                module: "InteropNativeModule".into(),
                classpath: "wrong/Interop".into(),
            }
        );
        assert!(host.bound.borrow().is_empty());
    }

    #[test]
    fn unknown_module_without_classpath_is_fatal() {
        let mut builder = ExportsBuilder::new();
        builder.add_method("Nowhere", "_A", "KInt", entry(), ExportFlags::empty());
        let host = healthy_host();
        let err = load(&host, &builder.build(), &LoaderConfig::default()).unwrap_err();
        assert_eq!(err, LoadError::NoClasspath { module: "Nowhere".into() });
        assert!(host.bound.borrow().is_empty());
    }

    #[test]
    fn config_classpath_used_before_defaults() {
        let mut builder = ExportsBuilder::new();
        builder.add_method("Nowhere", "_A", "KInt", entry(), ExportFlags::empty());
        let config = LoaderConfig::default().with_classpath("Nowhere", "test/Other");
        let report = load(&healthy_host(), &builder.build(), &config).unwrap();
        assert_eq!(report.module("Nowhere").unwrap().classpath, "test/Other");
        assert_eq!(report.bound_count(), 1);
    }

    #[test]
    fn kind_from_flags() {
        assert_eq!(NativeKind::from_flags(ExportFlags::empty()), NativeKind::Fast);
        assert_eq!(NativeKind::from_flags(ExportFlags::CONTEXT), NativeKind::Normal);
        assert_eq!(
            NativeKind::from_flags(ExportFlags::CONTEXT | ExportFlags::DIRECT),
            NativeKind::Critical
        );
    }
}
