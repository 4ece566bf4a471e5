//! Explicit plugin registration.
//!
//! A `PluginSet` maps symbol names to template values (plain data or
//! callables). The renderer only ever sees an already-built set; building it
//! is the job of a plugin host.

use minijinja::Value;
use std::collections::BTreeMap;
use tracing::warn;

/// Returns true if `name` is public, i.e. does not start with an underscore.
pub fn is_public_symbol(name: &str) -> bool {
    !name.starts_with('_')
}

/// Registry of plugin-provided template symbols.
#[derive(Debug, Clone, Default)]
pub struct PluginSet {
    symbols: BTreeMap<String, Value>,
    loaded: Vec<String>,
}

impl PluginSet {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one symbol, returning the value it replaced.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.symbols.insert(name.into(), value)
    }

    /// Registers the public symbols of one plugin and records it as loaded.
    ///
    /// Private names are skipped. A name already provided by an earlier
    /// plugin is replaced, with a warning.
    pub fn register_plugin<I>(&mut self, plugin: impl Into<String>, symbols: I) -> usize
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let plugin = plugin.into();
        let mut registered = 0;

        for (name, value) in symbols {
            if !is_public_symbol(&name) {
                continue;
            }
            if self.symbols.insert(name.clone(), value).is_some() {
                warn!("Plugin {plugin} replaces previously registered symbol '{name}'");
            }
            registered += 1;
        }

        self.loaded.push(plugin);
        registered
    }

    /// Looks up a registered symbol.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.symbols.get(name)
    }

    /// All registered symbols, ordered by name.
    pub fn symbols(&self) -> &BTreeMap<String, Value> {
        &self.symbols
    }

    /// Names of the plugins registered so far, in registration order.
    pub fn loaded_plugins(&self) -> &[String] {
        &self.loaded
    }

    /// Returns true if no symbols are registered.
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}
