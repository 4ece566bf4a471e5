//! Plugin host for the render adapter.
//!
//! Turns the request's `plugin_paths` into a [`PluginSet`] before rendering.
//! Entries are template macro modules, directories of them, or native
//! `builtin:<name>` plugins. Loading problems are warnings; they never abort
//! the render.

mod builtin;
mod module;

pub use builtin::BUILTIN_PLUGINS;
pub use module::PluginModule;

use crate::template::PluginSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Prefix selecting a native plugin.
pub const BUILTIN_PREFIX: &str = "builtin:";

/// File extensions recognised as template macro modules.
pub const MODULE_EXTENSIONS: &[&str] = &["j2", "jinja", "jinja2"];

/// Stem of a directory's package initializer, which is never loaded.
const PACKAGE_INIT_STEM: &str = "__init__";

/// Reasons a single plugin module could not be loaded.
#[derive(Error, Debug)]
pub enum PluginLoadError {
    #[error("failed to read module: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to evaluate module: {0}")]
    Template(#[from] minijinja::Error),
}

/// Resolves plugin entries and loads them into a [`PluginSet`].
#[derive(Debug, Clone)]
pub struct PluginHost {
    base_dir: PathBuf,
}

impl PluginHost {
    /// Creates a host resolving relative entries against `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Directory relative entries are resolved against.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Resolves `entry` to a filesystem path.
    pub fn resolve(&self, entry: &str) -> PathBuf {
        let path = Path::new(entry);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Loads every entry in order. Later plugins replace symbols of earlier ones.
    pub fn load(&self, entries: &[String]) -> PluginSet {
        let mut plugins = PluginSet::new();
        for entry in entries {
            self.load_entry(entry, &mut plugins);
        }
        debug!(
            "Loaded {} plugins providing {} symbols",
            plugins.loaded_plugins().len(),
            plugins.symbols().len()
        );
        plugins
    }

    fn load_entry(&self, entry: &str, plugins: &mut PluginSet) {
        if let Some(name) = entry.strip_prefix(BUILTIN_PREFIX) {
            match builtin::lookup(name) {
                Some(symbols) => {
                    plugins.register_plugin(entry, symbols);
                }
                None => warn!("Unknown builtin plugin '{name}', skipping"),
            }
            return;
        }

        let path = self.resolve(entry);
        if path.is_dir() {
            match module_files(&path) {
                Ok(files) => {
                    for file in files {
                        load_module(&file, plugins);
                    }
                }
                Err(e) => warn!("Failed to list plugin directory {}: {e}", path.display()),
            }
        } else if path.is_file() {
            load_module(&path, plugins);
        } else {
            warn!("Plugin path not found: {}", path.display());
        }
    }
}

impl Default for PluginHost {
    fn default() -> Self {
        Self::new(".")
    }
}

fn load_module(path: &Path, plugins: &mut PluginSet) {
    match PluginModule::load(path) {
        Ok(module) => {
            let (name, symbols) = module.into_parts();
            let registered = plugins.register_plugin(name, symbols);
            debug!("Loaded {} symbols from {}", registered, path.display());
        }
        Err(e) => warn!("Failed to load plugin {}: {e}", path.display()),
    }
}

/// Returns true if `path` names a loadable template module.
fn is_module_file(path: &Path) -> bool {
    let has_module_extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| MODULE_EXTENSIONS.contains(&ext));
    let is_package_init = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .is_some_and(|stem| stem == PACKAGE_INIT_STEM);
    has_module_extension && !is_package_init && path.is_file()
}

/// Top-level module files of `dir`, in file-name order.
fn module_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if is_module_file(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
