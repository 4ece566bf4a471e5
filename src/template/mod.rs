//! Template rendering and the render adapter's response document.
//!
//! Rendering uses strict-undefined semantics: referencing an unset variable
//! is an error, never empty output. Python-style methods such as
//! `m.items()` or `s.upper()` are available. Plugins arrive as an
//! already-built [`PluginSet`]; nothing here touches the filesystem.

mod registry;

pub use registry::{is_public_symbol, PluginSet};

use crate::config::TemplateRequest;
use crate::error::{BridgeError, Result};
use minijinja::{Environment, ErrorKind, UndefinedBehavior, Value};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Creates the template environment shared by rendering and plugin loading.
pub fn template_environment<'source>() -> Environment<'source> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.set_unknown_method_callback(minijinja_contrib::pycompat::unknown_method_callback);
    env
}

/// Renders request templates against plugin symbols and explicit variables.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateRenderer;

impl TemplateRenderer {
    /// Creates a new renderer.
    pub fn new() -> Self {
        Self
    }

    /// Renders the request's template.
    ///
    /// Explicit variables override plugin symbols of the same name.
    pub fn render(&self, request: &TemplateRequest, plugins: &PluginSet) -> Result<String> {
        let env = template_environment();

        let mut context: BTreeMap<String, Value> = plugins.symbols().clone();
        for (name, value) in &request.variables {
            if context
                .insert(name.clone(), Value::from_serialize(value))
                .is_some()
            {
                debug!("Variable '{name}' overrides a plugin symbol");
            }
        }

        let template = env
            .template_from_str(&request.template)
            .map_err(template_error)?;
        template.render(&context).map_err(template_error)
    }
}

/// Maps a template engine error into the adapter's error taxonomy.
fn template_error(err: minijinja::Error) -> BridgeError {
    let message = err.to_string();
    match err.kind() {
        ErrorKind::SyntaxError => BridgeError::template_syntax(message, err.line()),
        ErrorKind::UndefinedError | ErrorKind::UnknownFunction => BridgeError::undefined(message),
        kind => BridgeError::template(format!("{kind:?}"), message),
    }
}

/// Response document written by the render adapter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rendered: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loaded_plugins: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

impl TemplateResponse {
    /// Builds a success response.
    pub fn success(rendered: String, loaded_plugins: Vec<String>) -> Self {
        Self {
            success: true,
            rendered: Some(rendered),
            loaded_plugins: Some(loaded_plugins),
            error: None,
            error_type: None,
            line: None,
        }
    }

    /// Builds a failure response from a template error.
    pub fn failure(error: &BridgeError) -> Self {
        Self {
            success: false,
            rendered: None,
            loaded_plugins: None,
            error: Some(error.to_string()),
            error_type: Some(error.error_type().to_string()),
            line: error.line(),
        }
    }
}

/// Renders a request with the given plugins and builds its response document.
pub fn render_template(request: &TemplateRequest, plugins: &PluginSet) -> TemplateResponse {
    match TemplateRenderer::new().render(request, plugins) {
        Ok(rendered) => TemplateResponse::success(rendered, plugins.loaded_plugins().to_vec()),
        Err(e) => {
            warn!("{}: {}", e.category(), e);
            TemplateResponse::failure(&e)
        }
    }
}
