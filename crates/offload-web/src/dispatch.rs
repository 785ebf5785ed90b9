//! Verb-to-handler dispatch for resource routes.
//!
//! A [`MethodTable`] maps HTTP methods to async handlers. `HEAD` falls back
//! to the `GET` handler, `OPTIONS` answers with the `Allow` header, and any
//! other unregistered verb is rejected with
//! [`AppError::MethodNotAllowed`].

use std::future::Future;
use std::sync::Arc;

use axum::http::header::ALLOW;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use futures::future::BoxFuture;

use crate::error::AppError;

pub type VerbFuture = BoxFuture<'static, Result<Response, AppError>>;

type VerbHandler<C> = Arc<dyn Fn(C) -> VerbFuture + Send + Sync>;

/// Method → handler table. `C` is the per-request context handed to the
/// handler.
pub struct MethodTable<C> {
    handlers: Vec<(Method, VerbHandler<C>)>,
}

impl<C: Send + 'static> MethodTable<C> {
    pub fn new() -> Self {
        Self { handlers: Vec::new() }
    }

    /// Register `handler` for `method`, replacing any earlier registration.
    pub fn on<F, Fut>(mut self, method: Method, handler: F) -> Self
    where
        F: Fn(C) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response, AppError>> + Send + 'static,
    {
        let handler: VerbHandler<C> = Arc::new(move |ctx: C| -> VerbFuture { Box::pin(handler(ctx)) });
        self.handlers.retain(|(m, _)| *m != method);
        self.handlers.push((method, handler));
        self
    }

    /// Methods this table answers, in registration order.
    pub fn allowed(&self) -> Vec<Method> {
        let mut out: Vec<Method> = self.handlers.iter().map(|(m, _)| m.clone()).collect();
        if self.lookup(&Method::GET).is_some() && !out.contains(&Method::HEAD) {
            out.push(Method::HEAD);
        }
        if !out.contains(&Method::OPTIONS) {
            out.push(Method::OPTIONS);
        }
        out
    }

    /// Value of the `Allow` header, e.g. `"GET, HEAD, OPTIONS"`.
    pub fn allow_header(&self) -> String {
        self.allowed()
            .iter()
            .map(Method::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub async fn dispatch(&self, method: &Method, ctx: C) -> Result<Response, AppError> {
        if let Some(handler) = self.lookup(method) {
            return handler(ctx).await;
        }
        if *method == Method::HEAD {
            if let Some(get) = self.lookup(&Method::GET) {
                return get(ctx).await;
            }
        }
        if *method == Method::OPTIONS {
            return Ok((StatusCode::OK, [(ALLOW, self.allow_header())]).into_response());
        }
        Err(AppError::MethodNotAllowed {
            method: method.clone(),
            allow: self.allow_header(),
        })
    }

    fn lookup(&self, method: &Method) -> Option<&VerbHandler<C>> {
        self.handlers.iter().find(|(m, _)| m == method).map(|(_, h)| h)
    }
}

impl<C: Send + 'static> Default for MethodTable<C> {
    fn default() -> Self {
        Self::new()
    }
}
