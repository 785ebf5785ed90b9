//! Response-rendering collaborator.
//!
//! Rendering is treated as a blocking operation: handlers always call the
//! [`Renderer`] through the bridge.

use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use serde_json::{json, Value};
use thiserror::Error;

/// Names of the pages the handlers render.
pub const TEMPLATES: &[&str] = &["index", "hello", "entries", "entry", "waiting"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("unknown template '{0}'")]
    UnknownTemplate(String),

    #[error("failed to encode page: {0}")]
    Encode(String),
}

/// A rendered response body plus its content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    pub content_type: &'static str,
    pub body: String,
}

impl IntoResponse for RenderedPage {
    fn into_response(self) -> Response {
        ([(CONTENT_TYPE, self.content_type)], self.body).into_response()
    }
}

/// Turns a template name and a context mapping into a response body.
///
/// Implementations may block.
pub trait Renderer: Send + Sync + 'static {
    fn render(&self, template: &str, context: Value) -> Result<RenderedPage, RenderError>;
}

/// Emits `{"template": name, "context": context}` for every known template.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer;

impl Renderer for JsonRenderer {
    fn render(&self, template: &str, context: Value) -> Result<RenderedPage, RenderError> {
        if !TEMPLATES.contains(&template) {
            return Err(RenderError::UnknownTemplate(template.to_string()));
        }
        let body = serde_json::to_string(&json!({ "template": template, "context": context }))
            .map_err(|e| RenderError::Encode(e.to_string()))?;
        Ok(RenderedPage { content_type: "application/json", body })
    }
}
