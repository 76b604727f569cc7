//! Well-known module names and classpath lookup tables.

use rustc_hash::FxHashMap;

/// Module whose class hosts the callback dispatcher. Binding it is mandatory.
pub const INTEROP_NATIVE_MODULE: &str = "InteropNativeModule";
pub const TEST_NATIVE_MODULE: &str = "TestNativeModule";
pub const ARKUI_NATIVE_MODULE: &str = "ArkUINativeModule";
pub const ARKUI_GENERATED_NATIVE_MODULE: &str = "ArkUIGeneratedNativeModule";

/// Module name → classpath.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClasspathTable {
    entries: FxHashMap<String, String>,
}

impl ClasspathTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        let mut table = Self::new();
        for (module, classpath) in pairs {
            table.insert(module, classpath);
        }
        table
    }

    /// Insert or replace the classpath for `module`.
    pub fn insert(&mut self, module: &str, classpath: &str) -> &mut Self {
        self.entries.insert(module.to_string(), classpath.to_string());
        self
    }

    pub fn get(&self, module: &str) -> Option<&str> {
        self.entries.get(module).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Look up `module` in a backend's static default table.
pub fn default_for<'a>(defaults: &'a [(&'a str, &'a str)], module: &str) -> Option<&'a str> {
    defaults
        .iter()
        .find(|(name, _)| *name == module)
        .map(|(_, classpath)| *classpath)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULTS: &[(&str, &str)] = &[
        (INTEROP_NATIVE_MODULE, "a/Interop"),
        (TEST_NATIVE_MODULE, "a/Test"),
    ];

    #[test]
    fn default_lookup() {
        assert_eq!(default_for(DEFAULTS, INTEROP_NATIVE_MODULE), Some("a/Interop"));
        assert_eq!(default_for(DEFAULTS, "Other"), None);
    }

    #[test]
    fn table_insert_replaces() {
        let mut table = ClasspathTable::from_pairs(&[("M", "x/M")]);
        table.insert("M", "y/M");
        assert_eq!(table.get("M"), Some("y/M"));
        assert_eq!(table.len(), 1);
    }
}
