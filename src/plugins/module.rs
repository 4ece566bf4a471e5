//! Template macro modules.
//!
//! A module is a template file whose top level defines macros and values.
//! Loading evaluates it in an isolated environment and harvests its exports.
//!
//! Exported macros run in that isolated environment too, so they only see
//! their own module and the plain values passed to them. A macro from the
//! calling template, including the `caller` of a `{% call %}` block, cannot
//! be used inside a plugin macro and fails with `InvalidOperation`.

use super::PluginLoadError;
use crate::template::template_environment;
use minijinja::value::{Rest, ValueKind};
use minijinja::{Error, ErrorKind, Value};
use std::path::Path;
use std::sync::Arc;

/// A loaded plugin module and the symbols it exports.
#[derive(Debug, Clone)]
pub struct PluginModule {
    name: String,
    symbols: Vec<(String, Value)>,
}

impl PluginModule {
    /// Reads and evaluates the module at `path`. Its name is the file name.
    pub fn load(path: &Path) -> Result<Self, PluginLoadError> {
        let source = std::fs::read_to_string(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::from_source(name, source)
    }

    /// Evaluates module source and collects its exported symbols.
    ///
    /// Macros become callables; plain values are copied. Exports that
    /// evaluate to undefined are dropped.
    pub fn from_source(
        name: impl Into<String>,
        source: impl Into<String>,
    ) -> Result<Self, PluginLoadError> {
        let source: Arc<str> = Arc::from(source.into());
        let env = template_environment();
        let template = env.template_from_str(&source)?;
        let state = template.eval_to_state(())?;

        let exports: Vec<String> = state.exports().into_iter().map(String::from).collect();
        let mut symbols = Vec::with_capacity(exports.len());

        for export in exports {
            let Some(value) = state.lookup(&export) else {
                continue;
            };
            if value.is_undefined() {
                continue;
            }
            // Macros are bound to the state that defined them, so they are
            // re-evaluated from source on every call.
            let value = if is_macro(&value) {
                macro_binding(Arc::clone(&source), export.clone())
            } else {
                value
            };
            symbols.push((export, value));
        }

        Ok(Self {
            name: name.into(),
            symbols,
        })
    }

    /// The module's name, as reported in `loaded_plugins`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The exported symbols, private names included.
    pub fn symbols(&self) -> &[(String, Value)] {
        &self.symbols
    }

    /// Consumes the module, returning its name and symbols.
    pub fn into_parts(self) -> (String, Vec<(String, Value)>) {
        (self.name, self.symbols)
    }
}

fn is_macro(value: &Value) -> bool {
    value.as_object().is_some()
        && (value.kind() == ValueKind::Plain || value.to_string().starts_with("<macro "))
}

fn macro_binding(source: Arc<str>, name: String) -> Value {
    Value::from_function(move |args: Rest<Value>| call_macro(&source, &name, &args))
}

/// Returns true if `value` is a macro or a keyword-argument map holding one.
fn carries_macro(value: &Value) -> bool {
    if is_macro(value) {
        return true;
    }
    if value.kind() != ValueKind::Map {
        return false;
    }
    value.try_iter().is_ok_and(|mut keys| {
        keys.any(|key| value.get_item(&key).is_ok_and(|item| is_macro(&item)))
    })
}

fn call_macro(source: &str, name: &str, args: &[Value]) -> Result<Value, Error> {
    let env = template_environment();
    let template = env.template_from_str(source)?;
    let state = template.eval_to_state(())?;
    let callee = state.lookup(name).ok_or_else(|| {
        Error::new(
            ErrorKind::UnknownFunction,
            format!("plugin macro '{name}' is not defined"),
        )
    })?;
    callee.call(&state, args).map_err(|err| {
        if args.iter().any(carries_macro) {
            Error::new(
                ErrorKind::InvalidOperation,
                format!(
                    "plugin macro '{name}' cannot use macros or call blocks from the calling template"
                ),
            )
            .with_source(err)
        } else {
            err
        }
    })
}
