//! Template engine
//!
//! HTML rendering with Tera.
//! - Default templates are compiled into the binary from `templates/`
//! - An override directory can replace any of them by relative name
//! - Rendering failures fall back to the 500 page, then to plain HTML

use anyhow::{Context, Result};
use rust_embed::RustEmbed;
use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fs;
use std::path::Path;
use tera::{Context as TeraContext, Tera};

mod error;

pub use error::TemplateError;

/// Template rendered when another template fails
pub const SERVER_ERROR_TEMPLATE: &str = "errors/500.html";

/// Templates shipped with the binary
#[derive(RustEmbed)]
#[folder = "templates/"]
#[include = "*.html"]
struct DefaultTemplates;

/// Renders pages from the embedded templates and optional overrides
pub struct TemplateEngine {
    tera: Tera,
}

impl TemplateEngine {
    /// Load the embedded templates, then any `.html` files under
    /// `override_dir`, which win over embedded ones of the same name.
    pub fn new(override_dir: Option<&Path>) -> Result<Self> {
        let mut templates = BTreeMap::new();
        collect_embedded(&mut templates)?;

        if let Some(dir) = override_dir {
            if dir.exists() {
                let before = templates.len();
                collect_templates_from_dir(dir, dir, &mut templates)?;
                tracing::info!(
                    path = %dir.display(),
                    added = templates.len() - before,
                    "Loaded template overrides"
                );
            } else {
                tracing::warn!(path = %dir.display(), "Template override directory not found, using defaults");
            }
        }

        let mut tera = Tera::default();
        tera.add_raw_templates(templates)
            .map_err(|e| TemplateError::Tera(error_chain(&e)))?;

        Ok(Self { tera })
    }

    /// Render a template
    pub fn render(&self, template: &str, context: &TeraContext) -> Result<String> {
        self.tera.render(template, context).map_err(|e| {
            TemplateError::Tera(format!("Failed to render '{}': {}", template, error_chain(&e))).into()
        })
    }

    /// Render a template, falling back to the 500 page and finally to a
    /// minimal HTML page. Never fails.
    pub fn render_with_fallback(&self, template: &str, context: &TeraContext) -> String {
        match self.render(template, context) {
            Ok(html) => html,
            Err(e) => {
                tracing::error!("Failed to render template '{}': {}", template, e);

                match self.render(SERVER_ERROR_TEMPLATE, context) {
                    Ok(html) => html,
                    Err(error_template_err) => {
                        tracing::error!(
                            "Failed to render error template: {}, returning plain error page",
                            error_template_err
                        );
                        simple_error_page()
                    }
                }
            }
        }
    }

    /// Whether a template with this name is loaded
    pub fn has_template(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|n| n == name)
    }
}

fn collect_embedded(templates: &mut BTreeMap<String, String>) -> Result<()> {
    for name in DefaultTemplates::iter() {
        let Some(file) = DefaultTemplates::get(&name) else {
            continue;
        };
        let content = String::from_utf8(file.data.into_owned())
            .map_err(|_| TemplateError::Encoding(name.to_string()))?;
        templates.insert(name.replace('\\', "/"), content);
    }
    Ok(())
}

/// Collect `.html` files below `current_path`, named relative to `base_path`
fn collect_templates_from_dir(
    base_path: &Path,
    current_path: &Path,
    templates: &mut BTreeMap<String, String>,
) -> Result<()> {
    for entry in fs::read_dir(current_path)
        .with_context(|| format!("Failed to read template directory: {:?}", current_path))?
    {
        let path = entry?.path();

        if path.is_dir() {
            collect_templates_from_dir(base_path, &path, templates)?;
        } else if path.extension().is_some_and(|ext| ext == "html") {
            let Ok(relative_path) = path.strip_prefix(base_path) else {
                continue;
            };
            let template_name = relative_path.to_string_lossy().replace('\\', "/");
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read template: {:?}", path))?;
            templates.insert(template_name, content);
        }
    }
    Ok(())
}

fn error_chain(e: &tera::Error) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(s) = source {
        message.push_str(&format!("\n  Caused by: {}", s));
        source = s.source();
    }
    message
}

fn simple_error_page() -> String {
    r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="UTF-8"><title>Server Error</title></head>
<body>
    <h1>Server Error</h1>
    <p>Something went wrong while rendering this page.</p>
</body>
</html>"#
        .to_string()
}
