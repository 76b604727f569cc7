//! Loader configuration shared by every backend.

use crate::classpath::{ClasspathTable, INTEROP_NATIVE_MODULE};

/// Name of the managed static method native code calls back through.
pub const DISPATCHER_METHOD: &str = "callCallbackFromNative";

/// Settings consumed by [`binder::load`](crate::binder::load).
///
/// Classpath resolution order for a module is: explicit registration on the
/// export table, then [`LoaderConfig::classpaths`], then the backend's
/// built-in defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Module hosting the dispatcher; its class must resolve.
    pub interop_module: String,
    /// Dispatcher method name on the interop module's class.
    pub dispatcher_method: String,
    /// Dispatcher descriptor; `None` uses the backend's default.
    pub dispatcher_descriptor: Option<String>,
    /// Classpaths consulted after explicit registrations.
    pub classpaths: ClasspathTable,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            interop_module: INTEROP_NATIVE_MODULE.to_string(),
            dispatcher_method: DISPATCHER_METHOD.to_string(),
            dispatcher_descriptor: None,
            classpaths: ClasspathTable::new(),
        }
    }
}

impl LoaderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_interop_module(mut self, module: impl Into<String>) -> Self {
        self.interop_module = module.into();
        self
    }

    pub fn with_dispatcher(mut self, method: impl Into<String>, descriptor: impl Into<String>) -> Self {
        self.dispatcher_method = method.into();
        self.dispatcher_descriptor = Some(descriptor.into());
        self
    }

    pub fn with_classpath(mut self, module: &str, classpath: &str) -> Self {
        self.classpaths.insert(module, classpath);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = LoaderConfig::default();
        assert_eq!(config.interop_module, "InteropNativeModule");
        assert_eq!(config.dispatcher_method, "callCallbackFromNative");
        assert!(config.dispatcher_descriptor.is_none());
        assert!(config.classpaths.is_empty());
    }

    #[test]
    fn builder_methods() {
        let config = LoaderConfig::new()
            .with_interop_module("Core")
            .with_dispatcher("dispatch", "(I[BI)I")
            .with_classpath("Core", "app/Core");
        assert_eq!(config.interop_module, "Core");
        assert_eq!(config.dispatcher_descriptor.as_deref(), Some("(I[BI)I"));
        assert_eq!(config.classpaths.get("Core"), Some("app/Core"));
    }
}
