//! offload-web: axum request handlers composing the offload-core
//! primitives with a record store and a renderer.
//!
//! Handlers never touch the store or the renderer directly: both are
//! blocking collaborators and every call goes through
//! [`offload_core::Bridge`].

pub mod config;
pub mod dispatch;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod render;
pub mod server;
pub mod state;

pub use config::WebConfig;
pub use dispatch::MethodTable;
pub use error::AppError;
pub use extract::{ApiPath, ApiQuery};
pub use render::{JsonRenderer, RenderError, RenderedPage, Renderer};
pub use server::{router, serve};
pub use state::{open_store, AppState, Defaults};
