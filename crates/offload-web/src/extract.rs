//! Request extractors whose rejections render as [`AppError`].
//!
//! axum's own `Query` and `Path` reject with a plain-text body. These
//! wrappers route the rejection through `AppError` so clients always get
//! the JSON error shape.

use axum::extract::FromRequestParts;

use crate::error::AppError;

/// Query-string extractor. A malformed parameter is a 400.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

/// Path-segment extractor. A segment that does not parse is a 400.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);
