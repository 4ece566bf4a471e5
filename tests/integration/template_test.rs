//! Template rendering integration tests.
//!
//! Drives the plugin host and renderer together over temporary plugin
//! directories.

use impyla_bridge::config::TemplateRequest;
use impyla_bridge::plugins::PluginHost;
use impyla_bridge::template::{render_template, PluginSet};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const SQL_HELPERS: &str = r#"
{% set default_schema = "analytics" %}
{% set _private_note = "not exported" %}
{% macro in_clause(column, values) -%}
{{ column }} IN ({% for v in values %}'{{ v }}'{% if not loop.last %}, {% endif %}{% endfor %})
{%- endmacro %}
{% macro table(name) %}{{ default_schema }}.{{ name }}{% endmacro %}
"#;

fn write_plugin(dir: &Path, name: &str, contents: &str) {
    fs::write(dir.join(name), contents).unwrap();
}

fn request(template: &str, variables: serde_json::Value, plugin_paths: &[&str]) -> TemplateRequest {
    let mut request = TemplateRequest::new(template);
    request.variables = serde_json::from_value(variables).unwrap();
    request.plugin_paths = plugin_paths.iter().map(|p| p.to_string()).collect();
    request
}

fn render_in(dir: &Path, request: &TemplateRequest) -> serde_json::Value {
    let plugins = PluginHost::new(dir).load(&request.plugin_paths);
    serde_json::to_value(render_template(request, &plugins)).unwrap()
}

#[test]
fn test_render_without_plugins() {
    let request = request("{{ a }}-{{ b }}", json!({"a": "X", "b": 2}), &[]);
    let response = render_template(&request, &PluginSet::new());

    assert_eq!(
        serde_json::to_value(response).unwrap(),
        json!({"success": true, "rendered": "X-2", "loaded_plugins": []})
    );
}

#[test]
fn test_render_with_macro_directory() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("macros")).unwrap();
    write_plugin(&dir.path().join("macros"), "sql_helpers.j2", SQL_HELPERS);

    let request = request(
        "SELECT * FROM {{ table('events') }} WHERE {{ in_clause('kind', kinds) }}",
        json!({"kinds": ["click", "view"]}),
        &["macros"],
    );

    assert_eq!(
        render_in(dir.path(), &request),
        json!({
            "success": true,
            "rendered": "SELECT * FROM analytics.events WHERE kind IN ('click', 'view')",
            "loaded_plugins": ["sql_helpers.j2"]
        })
    );
}

#[test]
fn test_private_plugin_symbols_are_undefined() {
    let dir = TempDir::new().unwrap();
    write_plugin(dir.path(), "sql_helpers.j2", SQL_HELPERS);

    let request = request("{{ _private_note }}", json!({}), &["sql_helpers.j2"]);
    let response = render_in(dir.path(), &request);

    assert_eq!(response["success"], json!(false));
    assert_eq!(response["error_type"], json!("UndefinedError"));
}

#[test]
fn test_explicit_variables_win_over_plugins() {
    let dir = TempDir::new().unwrap();
    write_plugin(dir.path(), "sql_helpers.j2", SQL_HELPERS);

    let request = request(
        "{{ default_schema }}",
        json!({"default_schema": "staging"}),
        &["sql_helpers.j2"],
    );
    assert_eq!(render_in(dir.path(), &request)["rendered"], json!("staging"));
}

#[test]
fn test_broken_and_missing_plugins_do_not_fail_render() {
    let dir = TempDir::new().unwrap();
    write_plugin(dir.path(), "broken.j2", "{% macro oops( %}");

    let request = request(
        "SELECT {{ n }}",
        json!({"n": 1}),
        &["broken.j2", "missing_dir"],
    );
    assert_eq!(
        render_in(dir.path(), &request),
        json!({"success": true, "rendered": "SELECT 1", "loaded_plugins": []})
    );
}

#[test]
fn test_absolute_plugin_path_ignores_base_dir() {
    let plugin_dir = TempDir::new().unwrap();
    write_plugin(plugin_dir.path(), "consts.jinja", "{% set limit = 50 %}");
    let other_dir = TempDir::new().unwrap();

    let absolute = plugin_dir.path().join("consts.jinja");
    let request = request(
        "LIMIT {{ limit }}",
        json!({}),
        &[absolute.to_str().unwrap()],
    );
    assert_eq!(
        render_in(other_dir.path(), &request)["rendered"],
        json!("LIMIT 50")
    );
}

#[test]
fn test_builtin_date_utils() {
    let request = request(
        "WHERE region IN ({{ format_list(regions) }}) AND d >= '{{ first_of_month() }}'",
        json!({"regions": ["eu", "us"]}),
        &["builtin:date_utils"],
    );
    let response = render_in(Path::new("."), &request);

    assert_eq!(response["success"], json!(true));
    assert_eq!(response["loaded_plugins"], json!(["builtin:date_utils"]));
    let rendered = response["rendered"].as_str().unwrap();
    assert!(rendered.starts_with("WHERE region IN ('eu', 'us') AND d >= '"));
    assert!(rendered.ends_with("-01'"));
}

#[test]
fn test_syntax_error_response() {
    let request = request("SELECT *\nFROM {{ table", json!({}), &[]);
    let response = render_in(Path::new("."), &request);

    assert_eq!(response["success"], json!(false));
    assert_eq!(response["error_type"], json!("TemplateSyntaxError"));
    assert_eq!(response["line"], json!(2));
    assert!(response.get("rendered").is_none());
}

#[test]
fn test_demo_macro_module() {
    let request = request(
        "SELECT * FROM {{ table('events') }} WHERE {{ in_clause('kind', ['a']) }} {{ limit() }}",
        json!({}),
        &["demos/macros"],
    );
    let response = render_in(Path::new(env!("CARGO_MANIFEST_DIR")), &request);

    assert_eq!(
        response,
        json!({
            "success": true,
            "rendered": "SELECT * FROM analytics.events WHERE kind IN ('a') LIMIT 1000",
            "loaded_plugins": ["sql_helpers.j2"]
        })
    );
}
